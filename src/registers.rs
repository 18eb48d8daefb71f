use std::cmp::Ordering;
use std::fmt;

/// Address of the first instruction when no image specifies an origin.
pub const PC_START: u16 = 0x3000;

/// Represents the general purpose registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    /// Receives the return address on `JSR`/`JSRR` and `TRAP`.
    R7,
}

impl Register {
    pub const ALL: [Register; 8] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
    ];

    /// Register selected by the 3-bit field starting at bit `shift` of `instr`.
    #[inline]
    pub fn from_field(instr: u16, shift: u32) -> Self {
        Self::ALL[((instr >> shift) & 0b111) as usize]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

/// Condition code, summarizing the sign of the last register write.
///
/// Discriminants match the `n`, `z`, `p` bits of a `BR` instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flag {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
}

impl Flag {
    /// Flag describing `val` as a two's complement 16-bit integer.
    #[inline]
    pub fn of(val: u16) -> Self {
        match (val as i16).cmp(&0) {
            Ordering::Less => Flag::N,
            Ordering::Equal => Flag::Z,
            Ordering::Greater => Flag::P,
        }
    }

    #[inline]
    pub fn bits(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flag::N => "NEG",
            Flag::Z => "ZRO",
            Flag::P => "POS",
        };
        f.write_str(name)
    }
}

/// Register file: 8 general purpose registers, program counter and condition code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registers {
    gpr: [u16; 8],
    /// Address of the next instruction to fetch
    pc: u16,
    cond: Flag,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            gpr: [0; 8],
            pc: PC_START,
            // Exactly one flag is always set
            cond: Flag::Z,
        }
    }

    #[inline]
    pub fn get(&self, reg: Register) -> u16 {
        self.gpr[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: Register, val: u16) {
        self.gpr[reg.index()] = val;
    }

    /// Recompute the condition code from the value currently held in `reg`.
    #[inline]
    pub fn update_flags(&mut self, reg: Register) {
        self.cond = Flag::of(self.get(reg));
    }

    /// Store `val` into `reg` and update the condition code from it.
    #[inline]
    pub fn set_with_flags(&mut self, reg: Register, val: u16) {
        self.set(reg, val);
        self.update_flags(reg);
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline]
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    #[inline]
    pub fn cond(&self) -> Flag {
        self.cond
    }

    pub fn gprs(&self) -> &[u16; 8] {
        &self.gpr
    }
}
