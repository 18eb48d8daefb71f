use std::fmt;

use crate::device::Device;
use crate::error::VmError;
use crate::registers::Register;
use crate::runtime::{Machine, Status};

/// Entries of the fixed trap vector table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrapVector {
    /// Read one character into `R0`, without echo.
    Getc = 0x20,
    /// Write the low byte of `R0`.
    Out = 0x21,
    /// Write a string of one character per word, starting at `R0`.
    Puts = 0x22,
    /// Read one character into `R0`, with echo.
    In = 0x23,
    /// Write a string of two characters per word, starting at `R0`.
    Putsp = 0x24,
    Halt = 0x25,
}

impl TryFrom<u8> for TrapVector {
    type Error = u8;
    fn try_from(vector: u8) -> Result<Self, Self::Error> {
        let vector = match vector {
            0x20 => TrapVector::Getc,
            0x21 => TrapVector::Out,
            0x22 => TrapVector::Puts,
            0x23 => TrapVector::In,
            0x24 => TrapVector::Putsp,
            0x25 => TrapVector::Halt,
            _ => return Err(vector),
        };
        Ok(vector)
    }
}

impl fmt::Display for TrapVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrapVector::Getc => "GETC",
            TrapVector::Out => "OUT",
            TrapVector::Puts => "PUTS",
            TrapVector::In => "IN",
            TrapVector::Putsp => "PUTSP",
            TrapVector::Halt => "HALT",
        };
        f.write_str(name)
    }
}

impl<D: Device> Machine<D> {
    /// Run a trap routine. `R7` already holds the return address.
    pub(crate) fn trap(&mut self, vector: TrapVector) -> Result<Status, VmError> {
        tracing::debug!(%vector, r0 = self.reg.get(Register::R0), "trap");
        match vector {
            TrapVector::Getc => {
                let ch = self.device.read_char()?;
                self.reg.set_with_flags(Register::R0, ch as u16);
            }
            TrapVector::Out => {
                let ch = (self.reg.get(Register::R0) & 0xFF) as u8;
                self.device.write_char(ch)?;
                self.device.flush()?;
            }
            TrapVector::Puts => {
                let mut addr = self.reg.get(Register::R0);
                loop {
                    let word = self.mem.peek(addr);
                    if word == 0 {
                        break;
                    }
                    self.device.write_char((word & 0xFF) as u8)?;
                    addr = addr.wrapping_add(1);
                }
                self.device.flush()?;
            }
            TrapVector::In => {
                let ch = self.device.read_char()?;
                self.device.write_char(ch)?;
                self.device.flush()?;
                self.reg.set_with_flags(Register::R0, ch as u16);
            }
            TrapVector::Putsp => {
                let mut addr = self.reg.get(Register::R0);
                loop {
                    let word = self.mem.peek(addr);
                    if word == 0 {
                        break;
                    }
                    // Low byte first, high byte only if set
                    self.device.write_char((word & 0xFF) as u8)?;
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        self.device.write_char(high)?;
                    }
                    addr = addr.wrapping_add(1);
                }
                self.device.flush()?;
            }
            TrapVector::Halt => {
                self.device.flush()?;
                tracing::info!(pc = self.reg.pc(), "halted");
                return Ok(Status::Halted);
            }
        }
        Ok(Status::Running)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vector_table() {
        for vector in 0x20..=0x25u8 {
            let trap = TrapVector::try_from(vector).unwrap();
            assert_eq!(trap as u8, vector);
        }
        assert_eq!(TrapVector::try_from(0x1f), Err(0x1f));
        assert_eq!(TrapVector::try_from(0x26), Err(0x26));
        assert_eq!(TrapVector::Putsp.to_string(), "PUTSP");
    }
}
