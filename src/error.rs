use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::decode::IllegalInstr;

/// Fatal condition raised while executing. The machine cannot continue after any of these.
#[derive(Debug, Error, Diagnostic)]
pub enum VmError {
    #[error("Illegal opcode 0x{opcode:X} ({instr}) at address 0x{addr:04x}")]
    #[diagnostic(
        code(vm::illegal_opcode),
        help("RTI and the reserved opcode 0xD cannot be executed; the image may be corrupt or PC ran into data")
    )]
    IllegalOpcode {
        opcode: u8,
        instr: IllegalInstr,
        addr: u16,
    },

    #[error("Unknown trap vector 0x{vector:02X} at address 0x{addr:04x}")]
    #[diagnostic(
        code(vm::unknown_trap),
        help("available trap vectors are GETC (x20), OUT (x21), PUTS (x22), IN (x23), PUTSP (x24) and HALT (x25)")
    )]
    UnknownTrap { vector: u8, addr: u16 },

    #[error("Device failure: {0}")]
    #[diagnostic(
        code(vm::io),
        help("input may have ended while the program was waiting for a character")
    )]
    Io(#[from] io::Error),
}

impl VmError {
    /// Build the error for an instruction that failed to decode at `addr`.
    pub fn illegal(instr: IllegalInstr, addr: u16) -> Self {
        match instr {
            IllegalInstr::UnknownTrap(vector) => VmError::UnknownTrap { vector, addr },
            _ => VmError::IllegalOpcode {
                opcode: instr.opcode(),
                instr,
                addr,
            },
        }
    }
}

/// Failure to load a program image. Memory is left untouched.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Failed to open image {}", .path.display())]
    #[diagnostic(code(load::open))]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Image has no origin word")]
    #[diagnostic(
        code(load::missing_origin),
        help("an image starts with a big-endian 16-bit origin address")
    )]
    MissingOrigin,

    #[error("Image is not aligned to 16 bits ({len} bytes)")]
    #[diagnostic(
        code(load::unaligned),
        help("images are a sequence of big-endian 16-bit words")
    )]
    Unaligned { len: usize },
}
