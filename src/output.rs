use std::io::{self, Write};

use crate::decode::decode;
use crate::memory::Memory;
use crate::registers::{Register, Registers};

/// Print the register file.
///
/// `minimal` output is plain `NAME value` lines, suited for blackbox tests.
pub fn print_registers(out: &mut impl Write, regs: &Registers, minimal: bool) -> io::Result<()> {
    if minimal {
        for reg in Register::ALL {
            writeln!(out, "{} {}", reg, regs.get(reg))?;
        }
        writeln!(out, "PC {}", regs.pc())?;
        writeln!(out, "CC {}", regs.cond())?;
        return Ok(());
    }

    writeln!(out, "\x1b[2m┌────────────────────────────────────┐\x1b[0m")?;
    writeln!(
        out,
        "\x1b[2m│        \x1b[3mhex     int    uint    char\x1b[0m\x1b[2m │\x1b[0m"
    )?;
    for reg in Register::ALL {
        write!(out, "\x1b[2m│\x1b[0m \x1b[1m{}\x1b[0m  ", reg)?;
        print_integer(out, regs.get(reg))?;
        writeln!(out, " \x1b[2m│\x1b[0m")?;
    }
    write!(out, "\x1b[2m│\x1b[0m \x1b[1mPC\x1b[0m  0x{:04x}", regs.pc())?;
    write!(out, "                ")?;
    write!(out, " \x1b[1mCC\x1b[0m  {}", regs.cond())?;
    writeln!(out, " \x1b[2m│\x1b[0m")?;
    writeln!(out, "\x1b[2m└────────────────────────────────────┘\x1b[0m")?;
    Ok(())
}

fn print_integer(out: &mut impl Write, value: u16) -> io::Result<()> {
    write!(out, "0x{:04x}  ", value)?;
    write!(out, "{:-6}  ", value as i16)?;
    write!(out, "{:-6}  ", value)?;
    print_char_display(out, value)
}

fn print_char_display(out: &mut impl Write, value: u16) -> io::Result<()> {
    // Print 3 characters
    match value {
        // ASCII control characters which are arbitrarily considered significant
        0x00 => write!(out, "NUL"),
        0x08 => write!(out, "BS "),
        0x09 => write!(out, "HT "),
        0x0a => write!(out, "LF "),
        0x0b => write!(out, "VT "),
        0x0c => write!(out, "FF "),
        0x0d => write!(out, "CR "),
        0x1b => write!(out, "ESC"),
        0x7f => write!(out, "DEL"),

        // Space
        0x20 => write!(out, "[_]"),

        // Printable ASCII characters
        0x21..=0x7e => write!(out, " {} ", value as u8 as char),

        // Any ASCII character not already matched (unimportant control characters)
        0x00..=0x7f => write!(out, "\x1b[2m───\x1b[0m"),
        // Any non-ASCII character
        0x0080.. => write!(out, "\x1b[2m┄┄┄\x1b[0m"),
    }
}

/// List `count` words of memory from `start` as instructions.
///
/// Words that do not decode are shown as `.FILL`.
pub fn print_listing(out: &mut impl Write, mem: &Memory, start: u16, count: usize) -> io::Result<()> {
    for i in 0..count {
        let addr = start.wrapping_add(i as u16);
        let word = mem.peek(addr);
        match decode(word) {
            Ok(instr) => writeln!(out, "x{addr:04X}  x{word:04X}  {instr}")?,
            Err(_) => writeln!(out, "x{addr:04X}  x{word:04X}  .FILL x{word:04X}")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn minimal_registers() {
        let mut regs = Registers::new();
        regs.set_with_flags(Register::R2, 0xffff);
        let out = render(|buf| print_registers(buf, &regs, true));
        let expected = "R0 0\nR1 0\nR2 65535\nR3 0\nR4 0\nR5 0\nR6 0\nR7 0\nPC 12288\nCC NEG\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn full_registers_shows_chars() {
        let mut regs = Registers::new();
        regs.set(Register::R0, b'A' as u16);
        let out = render(|buf| print_registers(buf, &regs, false));
        assert!(out.contains("0x0041"));
        assert!(out.contains(" A "));
        assert!(out.contains("0x3000"));
    }

    #[test]
    fn listing() {
        let mut mem = Memory::new();
        mem.write_block(0x3000, &[0xe002, 0xf022, 0xd000, 0xf025]);
        let out = render(|buf| print_listing(buf, &mem, 0x3000, 4));
        let expected = "\
x3000  xE002  LEA R0, #2
x3001  xF022  PUTS
x3002  xD000  .FILL xD000
x3003  xF025  HALT
";
        assert_eq!(out, expected);
    }
}
