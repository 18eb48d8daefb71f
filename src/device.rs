use std::collections::VecDeque;
use std::io;

/// Character device attached to the machine.
///
/// The interpreter only ever talks to the outside world through this trait, so any host
/// (terminal, pipe, test script) can be plugged in.
pub trait Device {
    /// Non-blocking poll: is a character ready to be read?
    ///
    /// Used by reads of the keyboard status register.
    fn input_available(&mut self) -> io::Result<bool>;

    /// Block until a character is available and return it.
    ///
    /// At end of input this must return an [`io::ErrorKind::UnexpectedEof`] error.
    fn read_char(&mut self) -> io::Result<u8>;

    fn write_char(&mut self, ch: u8) -> io::Result<()>;

    /// Called after a trap routine finishes writing.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Called periodically while the machine runs, whether or not the program does any I/O.
    ///
    /// An error stops the machine, which is how a host interrupts a program stuck in a loop.
    fn tick(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<D: Device + ?Sized> Device for &mut D {
    fn input_available(&mut self) -> io::Result<bool> {
        (**self).input_available()
    }
    fn read_char(&mut self) -> io::Result<u8> {
        (**self).read_char()
    }
    fn write_char(&mut self, ch: u8) -> io::Result<()> {
        (**self).write_char(ch)
    }
    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
    fn tick(&mut self) -> io::Result<()> {
        (**self).tick()
    }
}

/// Deterministic device with scripted input, capturing all output.
#[derive(Debug, Default, Clone)]
pub struct ScriptedDevice {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ScriptedDevice {
    pub fn new(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Queue more input, after anything not yet consumed.
    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output interpreted as (lossy) UTF-8.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }
}

impl Device for ScriptedDevice {
    fn input_available(&mut self) -> io::Result<bool> {
        Ok(!self.input.is_empty())
    }

    fn read_char(&mut self) -> io::Result<u8> {
        self.input.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "scripted input exhausted")
        })
    }

    fn write_char(&mut self, ch: u8) -> io::Result<()> {
        self.output.push(ch);
        Ok(())
    }
}
