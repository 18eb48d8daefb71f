use crate::decode::{decode, Instr, JsrTarget, Operand};
use crate::device::Device;
use crate::error::{LoadError, VmError};
use crate::loader::{self, Image};
use crate::memory::Memory;
use crate::registers::{Register, Registers};

/// Instructions executed between calls to [`Device::tick`] in [`Machine::run`].
pub const TICK_INTERVAL: u32 = 4096;

/// Execution state of a [`Machine`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Status {
    #[default]
    Running,
    /// Reached via `TRAP HALT`.
    Halted,
    /// Reached via an illegal instruction or a device failure.
    Fatal,
}

/// Represents complete program state during runtime.
///
/// Each machine owns its memory, registers and device; nothing is shared between instances.
pub struct Machine<D> {
    pub(crate) mem: Memory,
    pub(crate) reg: Registers,
    pub(crate) device: D,
    status: Status,
    /// Whether an image has set the start address yet.
    has_origin: bool,
}

impl<D: Device> Machine<D> {
    pub fn new(device: D) -> Self {
        Machine {
            mem: Memory::new(),
            reg: Registers::new(),
            device,
            status: Status::Running,
            has_origin: false,
        }
    }

    /// Start from already populated memory, with the first fetch at `pc`.
    pub fn with_memory(device: D, mem: Memory, pc: u16) -> Self {
        let mut machine = Self::new(device);
        machine.mem = mem;
        machine.reg.set_pc(pc);
        machine.has_origin = true;
        machine
    }

    /// Overlay an image onto memory. The first image loaded also sets the start address.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<Image, LoadError> {
        let image = loader::load_bytes(bytes, &mut self.mem)?;
        if !self.has_origin {
            self.reg.set_pc(image.origin);
            self.has_origin = true;
        }
        Ok(image)
    }

    /// Run until `HALT` or a fatal condition.
    ///
    /// The device is ticked every [`TICK_INTERVAL`] instructions, so it can stop a program that
    /// never touches it.
    pub fn run(&mut self) -> Result<Status, VmError> {
        let mut count: u32 = 0;
        loop {
            match self.step()? {
                Status::Running => (),
                status => return Ok(status),
            }
            count += 1;
            if count == TICK_INTERVAL {
                count = 0;
                if let Err(err) = self.device.tick() {
                    tracing::error!(pc = self.reg.pc(), "{err}");
                    self.status = Status::Fatal;
                    return Err(err.into());
                }
            }
        }
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// Does nothing once the machine has stopped.
    pub fn step(&mut self) -> Result<Status, VmError> {
        if self.status != Status::Running {
            return Ok(self.status);
        }
        match self.try_step() {
            Ok(status) => {
                self.status = status;
                Ok(status)
            }
            Err(err) => {
                tracing::error!(pc = self.reg.pc(), "{err}");
                self.status = Status::Fatal;
                Err(err)
            }
        }
    }

    fn try_step(&mut self) -> Result<Status, VmError> {
        let addr = self.reg.pc();
        let word = self.mem.read(addr, &mut self.device)?;
        // PC incremented before instruction is performed
        self.reg.set_pc(addr.wrapping_add(1));
        let instr = decode(word).map_err(|instr| VmError::illegal(instr, addr))?;
        tracing::trace!(addr, word, "{instr}");
        self.execute(instr)
    }

    fn execute(&mut self, instr: Instr) -> Result<Status, VmError> {
        let pc = self.reg.pc();
        match instr {
            Instr::Add { dest, src, operand } => {
                let res = self.reg.get(src).wrapping_add(self.operand(operand));
                self.reg.set_with_flags(dest, res);
            }
            Instr::And { dest, src, operand } => {
                let res = self.reg.get(src) & self.operand(operand);
                self.reg.set_with_flags(dest, res);
            }
            Instr::Not { dest, src } => {
                let res = !self.reg.get(src);
                self.reg.set_with_flags(dest, res);
            }
            Instr::Br { nzp, offset } => {
                if self.reg.cond().bits() & nzp != 0 {
                    self.reg.set_pc(pc.wrapping_add(offset));
                }
            }
            Instr::Jmp { base } => {
                self.reg.set_pc(self.reg.get(base));
            }
            Instr::Jsr { target } => {
                // R7 is written first, so `JSRR R7` lands on the return address
                self.reg.set(Register::R7, pc);
                let dest = match target {
                    JsrTarget::Offset(offset) => pc.wrapping_add(offset),
                    JsrTarget::Reg(base) => self.reg.get(base),
                };
                self.reg.set_pc(dest);
            }
            Instr::Ld { dest, offset } => {
                let val = self.read(pc.wrapping_add(offset))?;
                self.reg.set_with_flags(dest, val);
            }
            Instr::Ldi { dest, offset } => {
                let ptr = self.read(pc.wrapping_add(offset))?;
                let val = self.read(ptr)?;
                self.reg.set_with_flags(dest, val);
            }
            Instr::Ldr { dest, base, offset } => {
                let ptr = self.reg.get(base).wrapping_add(offset);
                let val = self.read(ptr)?;
                self.reg.set_with_flags(dest, val);
            }
            Instr::Lea { dest, offset } => {
                self.reg.set_with_flags(dest, pc.wrapping_add(offset));
            }
            Instr::St { src, offset } => {
                self.mem.write(pc.wrapping_add(offset), self.reg.get(src));
            }
            Instr::Sti { src, offset } => {
                let ptr = self.read(pc.wrapping_add(offset))?;
                self.mem.write(ptr, self.reg.get(src));
            }
            Instr::Str { src, base, offset } => {
                let ptr = self.reg.get(base).wrapping_add(offset);
                self.mem.write(ptr, self.reg.get(src));
            }
            Instr::Trap { vector } => {
                self.reg.set(Register::R7, pc);
                return self.trap(vector);
            }
        }
        Ok(Status::Running)
    }

    #[inline]
    fn operand(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Reg(reg) => self.reg.get(reg),
            Operand::Imm(imm) => imm,
        }
    }

    #[inline]
    fn read(&mut self, addr: u16) -> Result<u16, VmError> {
        Ok(self.mem.read(addr, &mut self.device)?)
    }
}

impl<D> Machine<D> {
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn registers(&self) -> &Registers {
        &self.reg
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.reg
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }
}
