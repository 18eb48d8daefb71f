use std::fmt;

use crate::registers::Register;
use crate::trap::TrapVector;

/// Sign-extend the low `bits` bits of `val` to 16 bits.
///
/// Bits above `bits` in the input are ignored, so a whole instruction word may be passed.
#[inline]
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < 16);
    // Sign bit
    let sign = val & (1u16 << (bits - 1));
    // Bits lower than sign bit
    let magnitude = val & ((1u16 << bits) - 1);
    // Positive input: all bits unset; 0x0000
    // Negative input: sign bit and above will be set, lower bits will be reset
    //      Eg. bits=14 -> 0xE000
    let sign_extension = (!sign).wrapping_add(1); // sign * -1
    magnitude | sign_extension
}

/// Second operand of `ADD` and `AND`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    Reg(Register),
    /// Already sign-extended
    Imm(u16),
}

/// Destination of `JSR`/`JSRR`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JsrTarget {
    /// `JSR`: PC-relative, already sign-extended
    Offset(u16),
    /// `JSRR`: absolute address held in a register
    Reg(Register),
}

/// A decoded instruction. All offsets are sign-extended to 16 bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instr {
    Br { nzp: u16, offset: u16 },
    Add { dest: Register, src: Register, operand: Operand },
    Ld { dest: Register, offset: u16 },
    St { src: Register, offset: u16 },
    Jsr { target: JsrTarget },
    And { dest: Register, src: Register, operand: Operand },
    Ldr { dest: Register, base: Register, offset: u16 },
    Str { src: Register, base: Register, offset: u16 },
    Not { dest: Register, src: Register },
    Ldi { dest: Register, offset: u16 },
    Sti { src: Register, offset: u16 },
    Jmp { base: Register },
    Lea { dest: Register, offset: u16 },
    Trap { vector: TrapVector },
}

/// Instruction word that has no valid meaning.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IllegalInstr {
    /// `RTI` (0x8): there is no supervisor mode to return to.
    Rti,
    /// Reserved opcode (0xD).
    Reserved,
    /// `TRAP` with a vector outside the trap table.
    UnknownTrap(u8),
}

impl IllegalInstr {
    pub fn opcode(self) -> u8 {
        match self {
            IllegalInstr::Rti => 0x8,
            IllegalInstr::Reserved => 0xD,
            IllegalInstr::UnknownTrap(_) => 0xF,
        }
    }
}

/// Decode a single instruction word.
pub fn decode(instr: u16) -> Result<Instr, IllegalInstr> {
    use Register as R;

    let dest = R::from_field(instr, 9);
    let src = R::from_field(instr, 6);
    let operand = || {
        // Check if imm
        if instr & 0b100000 == 0 {
            Operand::Reg(R::from_field(instr, 0))
        } else {
            Operand::Imm(sign_extend(instr, 5))
        }
    };
    let pc_offset9 = sign_extend(instr, 9);
    let offset6 = sign_extend(instr, 6);

    let decoded = match instr >> 12 {
        0x0 => Instr::Br {
            nzp: (instr >> 9) & 0b111,
            offset: pc_offset9,
        },
        0x1 => Instr::Add {
            dest,
            src,
            operand: operand(),
        },
        0x2 => Instr::Ld {
            dest,
            offset: pc_offset9,
        },
        0x3 => Instr::St {
            src: dest,
            offset: pc_offset9,
        },
        0x4 => {
            let target = if instr & 0x800 == 0 {
                JsrTarget::Reg(src)
            } else {
                JsrTarget::Offset(sign_extend(instr, 11))
            };
            Instr::Jsr { target }
        }
        0x5 => Instr::And {
            dest,
            src,
            operand: operand(),
        },
        0x6 => Instr::Ldr {
            dest,
            base: src,
            offset: offset6,
        },
        0x7 => Instr::Str {
            src: dest,
            base: src,
            offset: offset6,
        },
        0x8 => return Err(IllegalInstr::Rti),
        0x9 => Instr::Not { dest, src },
        0xA => Instr::Ldi {
            dest,
            offset: pc_offset9,
        },
        0xB => Instr::Sti {
            src: dest,
            offset: pc_offset9,
        },
        0xC => Instr::Jmp { base: src },
        0xD => return Err(IllegalInstr::Reserved),
        0xE => Instr::Lea {
            dest,
            offset: pc_offset9,
        },
        0xF => {
            let vector = (instr & 0xFF) as u8;
            let vector = TrapVector::try_from(vector).map_err(IllegalInstr::UnknownTrap)?;
            Instr::Trap { vector }
        }
        _ => unreachable!("opcode is 4 bits"),
    };
    Ok(decoded)
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{reg}"),
            Operand::Imm(imm) => write!(f, "#{}", *imm as i16),
        }
    }
}

/// Assembly-like rendering. PC-relative offsets are shown as signed decimals.
impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let offs = |offset: &u16| *offset as i16;
        match self {
            Instr::Br { nzp, offset } => {
                f.write_str("BR")?;
                for (bit, name) in [(0b100, 'n'), (0b010, 'z'), (0b001, 'p')] {
                    if nzp & bit != 0 {
                        write!(f, "{name}")?;
                    }
                }
                write!(f, " #{}", offs(offset))
            }
            Instr::Add { dest, src, operand } => write!(f, "ADD {dest}, {src}, {operand}"),
            Instr::And { dest, src, operand } => write!(f, "AND {dest}, {src}, {operand}"),
            Instr::Not { dest, src } => write!(f, "NOT {dest}, {src}"),
            Instr::Ld { dest, offset } => write!(f, "LD {dest}, #{}", offs(offset)),
            Instr::Ldi { dest, offset } => write!(f, "LDI {dest}, #{}", offs(offset)),
            Instr::Lea { dest, offset } => write!(f, "LEA {dest}, #{}", offs(offset)),
            Instr::St { src, offset } => write!(f, "ST {src}, #{}", offs(offset)),
            Instr::Sti { src, offset } => write!(f, "STI {src}, #{}", offs(offset)),
            Instr::Ldr { dest, base, offset } => {
                write!(f, "LDR {dest}, {base}, #{}", offs(offset))
            }
            Instr::Str { src, base, offset } => {
                write!(f, "STR {src}, {base}, #{}", offs(offset))
            }
            // `RET` is `JMP R7`
            Instr::Jmp { base: Register::R7 } => f.write_str("RET"),
            Instr::Jmp { base } => write!(f, "JMP {base}"),
            Instr::Jsr {
                target: JsrTarget::Offset(offset),
            } => write!(f, "JSR #{}", offs(offset)),
            Instr::Jsr {
                target: JsrTarget::Reg(base),
            } => write!(f, "JSRR {base}"),
            Instr::Trap { vector } => write!(f, "{vector}"),
        }
    }
}

impl fmt::Display for IllegalInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllegalInstr::Rti => f.write_str("RTI"),
            IllegalInstr::Reserved => f.write_str("reserved opcode 0xD"),
            IllegalInstr::UnknownTrap(vector) => write!(f, "TRAP x{vector:02X}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registers::Register::*;

    #[test]
    fn s_ext() {
        #[rustfmt::skip]
        let cases: &[(_, &[_])] = &[
            // (input, [bits...])
            //           15      14      13      12      11      10      9       8       7       6       5       4       3       2       1
            (0x0000, &[0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000]),
            (0x0001, &[0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0xffff]),
            (0x00ff, &[0x00ff, 0x00ff, 0x00ff, 0x00ff, 0x00ff, 0x00ff, 0x00ff, 0xffff, 0xffff]),
            (0x0100, &[0x0100, 0x0100, 0x0100, 0x0100, 0x0100, 0x0100, 0xff00, 0x0000, 0x0000]),
            (0x01ff, &[0x01ff, 0x01ff, 0x01ff, 0x01ff, 0x01ff, 0x01ff, 0xffff, 0xffff, 0xffff]),
            (0x0400, &[0x0400, 0x0400, 0x0400, 0x0400, 0xfc00, 0x0000, 0x0000, 0x0000, 0x0000]),
            (0x07ff, &[0x07ff, 0x07ff, 0x07ff, 0x07ff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff]),
            (0x1000, &[0x1000, 0x1000, 0xf000, 0x0000, 0x0000]),
            (0x7fff, &[0xffff, 0xffff, 0xffff, 0xffff, 0xffff]),
            (0xfffe, &[0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0xfffe, 0x0000]),
            (0xffff, &[0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff]),
        ];

        for (input, expecteds) in cases {
            for (i, expected) in expecteds.iter().enumerate() {
                let bits = 15 - i as u32;
                let actual = sign_extend(*input, bits);
                assert_eq!(
                    actual, *expected,
                    "sign_extend(0x{input:04x}, {bits}) == 0x{actual:04x}"
                );
            }
        }
    }

    #[test]
    fn s_ext_negative_fields() {
        for bits in [5u32, 6, 9, 11] {
            let sign = 1u16 << (bits - 1);
            let high = !((1u16 << bits) - 1);
            for x in sign..(1u16 << bits) {
                let ext = sign_extend(x, bits);
                assert_eq!(ext & high, high, "sign_extend(0x{x:04x}, {bits})");
                assert_eq!(ext & !high, x);
            }
        }
        assert_eq!(sign_extend(0b11111, 5), 0xffff);
    }

    #[test]
    fn decode_add() {
        // ADD R0, R0, #-3
        assert_eq!(
            decode(0x1000 | 0b0_000_1_11101).unwrap(),
            Instr::Add {
                dest: R0,
                src: R0,
                operand: Operand::Imm(0xfffd)
            }
        );
        // ADD R1, R2, R3
        assert_eq!(
            decode(0x1283).unwrap(),
            Instr::Add {
                dest: R1,
                src: R2,
                operand: Operand::Reg(R3)
            }
        );
    }

    #[test]
    fn decode_jsr_forms() {
        assert_eq!(
            decode(0x4fff).unwrap(),
            Instr::Jsr {
                target: JsrTarget::Offset(0xffff)
            }
        );
        assert_eq!(
            decode(0x4080).unwrap(),
            Instr::Jsr {
                target: JsrTarget::Reg(R2)
            }
        );
    }

    #[test]
    fn decode_memory_forms() {
        assert_eq!(
            decode(0x2c01).unwrap(),
            Instr::Ld {
                dest: R6,
                offset: 1
            }
        );
        assert_eq!(
            decode(0xb7ff).unwrap(),
            Instr::Sti {
                src: R3,
                offset: 0xffff
            }
        );
        assert_eq!(
            decode(0x7a7e).unwrap(),
            Instr::Str {
                src: R5,
                base: R1,
                offset: 0xfffe
            }
        );
    }

    #[test]
    fn decode_illegal() {
        assert_eq!(decode(0x8000), Err(IllegalInstr::Rti));
        assert_eq!(decode(0xd123), Err(IllegalInstr::Reserved));
        assert_eq!(decode(0xf026), Err(IllegalInstr::UnknownTrap(0x26)));
        assert_eq!(decode(0xf000), Err(IllegalInstr::UnknownTrap(0x00)));
        assert_eq!(IllegalInstr::UnknownTrap(0x26).opcode(), 0xf);
    }

    #[test]
    fn every_word_decodes_or_is_illegal() {
        for word in 0..=u16::MAX {
            let legal = decode(word).is_ok();
            let opcode = word >> 12;
            let expected = match opcode {
                0x8 | 0xD => false,
                0xF => (0x20..=0x25).contains(&(word & 0xff)),
                _ => true,
            };
            assert_eq!(legal, expected, "word 0x{word:04x}");
        }
    }

    #[test]
    fn disassembly() {
        let cases = [
            (0x1000 | 0b0_000_1_11101, "ADD R0, R0, #-3"),
            (0x5283, "AND R1, R2, R3"),
            (0x0e02, "BRnzp #2"),
            (0x05fe, "BRz #-2"),
            (0x967f, "NOT R3, R1"),
            (0xc1c0, "RET"),
            (0xc080, "JMP R2"),
            (0x4801, "JSR #1"),
            (0x4080, "JSRR R2"),
            (0xe3fd, "LEA R1, #-3"),
            (0x6a7e, "LDR R5, R1, #-2"),
            (0xf025, "HALT"),
        ];
        for (word, expected) in cases {
            assert_eq!(decode(word).unwrap().to_string(), expected, "0x{word:04x}");
        }
    }
}
