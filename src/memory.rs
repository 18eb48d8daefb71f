use std::fmt;

use crate::device::Device;

/// LC3 can address 128KB of memory.
pub const MEMORY_MAX: usize = 0x10000;

/// Keyboard status register. Bit 15 is set while a character is ready.
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register. Holds the character latched by the last status read.
pub const KBDR: u16 = 0xFE02;

const KBSR_READY: u16 = 1 << 15;

/// System memory: 65536 16-bit cells.
pub struct Memory {
    /// Boxed, as 128KB is too much to move around on the stack.
    cells: Box<[u16; MEMORY_MAX]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        // `vec!` allocates directly on the heap
        let cells: Box<[u16; MEMORY_MAX]> = vec![0u16; MEMORY_MAX]
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| unreachable!("slice has exactly MEMORY_MAX cells"));
        Memory { cells }
    }

    /// Read a cell, as seen by the running program.
    ///
    /// Reading [`KBSR`] polls `device`: if a character is ready it is latched into [`KBDR`]
    /// and the ready bit is set, otherwise the status register is cleared.
    pub fn read<D: Device + ?Sized>(&mut self, addr: u16, device: &mut D) -> std::io::Result<u16> {
        if addr == KBSR {
            if device.input_available()? {
                let ch = device.read_char()?;
                self.cells[KBSR as usize] = KBSR_READY;
                self.cells[KBDR as usize] = ch as u16;
            } else {
                self.cells[KBSR as usize] = 0;
            }
        }
        Ok(self.cells[addr as usize])
    }

    /// Read a cell with no device side effects.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    /// Store a value. Every address is writable, including device registers.
    #[inline]
    pub fn write(&mut self, addr: u16, val: u16) {
        self.cells[addr as usize] = val;
    }

    /// Copy `words` into memory starting at `orig`.
    ///
    /// Returns the amount of words written; anything past the end of memory is dropped.
    pub fn write_block(&mut self, orig: u16, words: &[u16]) -> usize {
        let start = orig as usize;
        let len = words.len().min(MEMORY_MAX - start);
        self.cells[start..start + len].copy_from_slice(&words[..len]);
        len
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.cells.iter().filter(|cell| **cell != 0).count();
        f.debug_struct("Memory").field("nonzero_cells", &used).finish()
    }
}
