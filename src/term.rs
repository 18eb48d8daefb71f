use std::collections::VecDeque;
use std::io::{self, IsTerminal, Read, Stdout, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEvent},
    terminal,
};

use crate::device::Device;

/// Similar to [`crossterm::event::KeyCode`] but only contains relevant information.
#[derive(Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Tab,
    Escape,
    /// Ctrl+C
    Interrupt,
    Char(char),
}

/// Console attached to the real stdin/stdout.
///
/// With an interactive terminal, raw mode is held for as long as the console lives so that
/// keys can be polled one at a time. With piped input, a reader thread feeds bytes through a
/// channel so polling never blocks.
pub struct Console {
    input: Input,
    /// Bytes of a decoded key not yet handed to the machine.
    pending: VecDeque<u8>,
    out: Stdout,
    /// Last byte written, to avoid doubling up `\r`.
    last_out: u8,
}

enum Input {
    /// Only held to restore the terminal on drop.
    Terminal { _guard: RawMode },
    Piped(Receiver<io::Result<u8>>),
}

/// Raw mode guard. Restores the terminal when dropped.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        // Nothing left to report to if this fails
        let _ = terminal::disable_raw_mode();
    }
}

impl Console {
    /// Attach to stdin, entering raw mode if it is a terminal.
    pub fn new() -> io::Result<Self> {
        let input = if io::stdin().is_terminal() {
            Input::Terminal {
                _guard: RawMode::enable()?,
            }
        } else {
            Input::Piped(spawn_reader())
        };
        Ok(Console {
            input,
            pending: VecDeque::new(),
            out: io::stdout(),
            last_out: 0,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.input, Input::Terminal { .. })
    }

    fn push_key(&mut self, key: Key) -> io::Result<()> {
        match key {
            Key::Interrupt => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted by user"));
            }
            Key::Enter => self.pending.push_back(b'\n'),
            Key::Backspace => self.pending.push_back(0x08),
            Key::Tab => self.pending.push_back(b'\t'),
            Key::Escape => self.pending.push_back(0x1b),
            Key::Char(ch) => {
                // Multi-byte characters are handed over one byte at a time
                let mut bytes = [0u8; 4];
                self.pending.extend(ch.encode_utf8(&mut bytes).bytes());
            }
        }
        Ok(())
    }

    /// Decode every terminal event that is already waiting, stopping early once input is
    /// pending if `until_pending` is set.
    fn drain_events(&mut self, until_pending: bool) -> io::Result<()> {
        while !(until_pending && !self.pending.is_empty()) && event::poll(Duration::ZERO)? {
            if let Ok(key) = Key::try_from(event::read()?) {
                self.push_key(key)?;
            }
        }
        Ok(())
    }
}

impl Device for Console {
    fn input_available(&mut self) -> io::Result<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }
        if self.is_terminal() {
            self.drain_events(true)?;
        } else if let Input::Piped(rx) = &self.input {
            match rx.try_recv() {
                Ok(byte) => self.pending.push_back(byte?),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => (),
            }
        }
        Ok(!self.pending.is_empty())
    }

    fn read_char(&mut self) -> io::Result<u8> {
        // Output must be visible before blocking on input
        self.out.flush()?;
        while self.pending.is_empty() {
            if self.is_terminal() {
                if let Ok(key) = Key::try_from(event::read()?) {
                    self.push_key(key)?;
                }
            } else if let Input::Piped(rx) = &self.input {
                match rx.recv() {
                    Ok(byte) => self.pending.push_back(byte?),
                    Err(_) => {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "end of input",
                        ))
                    }
                }
            }
        }
        self.pending
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "end of input"))
    }

    fn write_char(&mut self, ch: u8) -> io::Result<()> {
        // Raw mode does not translate newlines
        if ch == b'\n' && self.last_out != b'\r' && self.is_terminal() {
            self.out.write_all(b"\r")?;
        }
        self.last_out = ch;
        self.out.write_all(&[ch])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Picks up Ctrl+C while the program never reads the keyboard. Other keys are kept for
    /// later reads.
    fn tick(&mut self) -> io::Result<()> {
        if self.is_terminal() {
            self.drain_events(false)?;
        }
        Ok(())
    }
}

/// Forward stdin bytes to a channel. The channel disconnects at end of input.
fn spawn_reader() -> Receiver<io::Result<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for byte in io::stdin().lock().bytes() {
            let failed = byte.is_err();
            if tx.send(byte).is_err() || failed {
                break;
            }
        }
    });
    rx
}

impl TryFrom<Event> for Key {
    type Error = ();
    fn try_from(event: Event) -> Result<Self, Self::Error> {
        if let Event::Key(event) = event {
            if let Ok(key) = event.try_into() {
                return Ok(key);
            }
        }
        Err(())
    }
}

impl TryFrom<KeyEvent> for Key {
    type Error = ();
    fn try_from(event: KeyEvent) -> Result<Self, Self::Error> {
        use event::{KeyCode, KeyEventKind, KeyModifiers as Mod};

        if matches!(event.kind, KeyEventKind::Release) {
            return Err(());
        }

        let key = match (event.modifiers, event.code) {
            (Mod::CONTROL, KeyCode::Char('c')) => Key::Interrupt,

            (_, KeyCode::Backspace) => Key::Backspace,
            (_, KeyCode::Tab) => Key::Tab,
            (_, KeyCode::Esc) => Key::Escape,
            (_, KeyCode::Enter) | (_, KeyCode::Char('\n')) => Key::Enter,

            // Normal character
            (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) => Key::Char(ch),

            _ => return Err(()),
        };

        Ok(key)
    }
}
