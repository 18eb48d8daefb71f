// Machine
mod decode;
pub use decode::{decode, sign_extend, IllegalInstr, Instr, JsrTarget, Operand};
mod memory;
pub use memory::{Memory, KBDR, KBSR, MEMORY_MAX};
mod registers;
pub use registers::{Flag, Register, Registers, PC_START};
mod runtime;
pub use runtime::{Machine, Status, TICK_INTERVAL};
mod trap;
pub use trap::TrapVector;

// Outside world
mod device;
pub use device::{Device, ScriptedDevice};
pub mod loader;
pub use loader::Image;
pub mod term;
pub mod output;

mod error;
pub use error::{LoadError, VmError};

pub mod env;
