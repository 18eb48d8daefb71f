use std::fs;
use std::path::Path;

use crate::error::LoadError;
use crate::memory::{Memory, MEMORY_MAX};

/// Summary of a loaded image.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Image {
    /// Address of the first word.
    pub origin: u16,
    /// Words written to memory.
    pub len: usize,
    /// Words dropped for running past the end of memory.
    pub truncated: usize,
}

/// Parse an image: a big-endian origin word followed by big-endian data words.
///
/// Returns the origin and data in host order.
pub fn parse(bytes: &[u8]) -> Result<(u16, Vec<u16>), LoadError> {
    if bytes.len() < 2 {
        return Err(LoadError::MissingOrigin);
    }
    if bytes.len() % 2 != 0 {
        return Err(LoadError::Unaligned { len: bytes.len() });
    }
    let mut words = bytes
        .chunks_exact(2)
        .map(|word| u16::from_be_bytes([word[0], word[1]]));
    let origin = words.next().ok_or(LoadError::MissingOrigin)?;
    Ok((origin, words.collect()))
}

/// Overlay an image onto `mem`. Later images win where they overlap earlier ones.
///
/// The image is fully validated before anything is written.
pub fn load_bytes(bytes: &[u8], mem: &mut Memory) -> Result<Image, LoadError> {
    let (origin, words) = parse(bytes)?;
    let len = mem.write_block(origin, &words);
    let truncated = words.len() - len;
    if truncated > 0 {
        tracing::warn!(
            origin,
            truncated,
            "image runs past 0x{:04x}, dropping trailing words",
            MEMORY_MAX - 1
        );
    }
    tracing::debug!(origin, len, "loaded image");
    Ok(Image {
        origin,
        len,
        truncated,
    })
}

/// Read an image file. Nothing is loaded into memory.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Read an image file and overlay it onto `mem`.
pub fn load_file(path: impl AsRef<Path>, mem: &mut Memory) -> Result<Image, LoadError> {
    let bytes = read_file(path)?;
    load_bytes(&bytes, mem)
}
