//! Commands typed on the host side of the serial link.
//!
//! Input is line oriented (CR, LF or CRLF). A lone Ctrl-C byte stops the
//! recorder immediately, without waiting for a line end.

use heapless::Vec;
use log::warn;

use crate::time::Timestamp;

/// Longest accepted line, terminator excluded. Longer lines are dropped.
pub const MAX_LINE: usize = 64;

const INTERRUPT: u8 = 0x03;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Ctrl-C: orderly shutdown
    Shutdown,
    /// `time YYYY-MM-DD HH:MM:SS`
    SetTime(Timestamp),
}

#[derive(Default)]
pub struct HostCommands {
    line: Vec<u8, MAX_LINE>,
    overflowed: bool,
}

impl HostCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one received byte, returning a command if it completed one.
    pub fn feed(&mut self, byte: u8) -> Option<Command> {
        match byte {
            INTERRUPT => {
                self.reset();
                Some(Command::Shutdown)
            },
            b'\r' | b'\n' => {
                let command = if self.overflowed {
                    warn!("Discarding host line longer than {MAX_LINE} bytes");
                    None
                } else {
                    parse(&self.line)
                };
                self.reset();
                command
            },
            _ => {
                if self.line.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            },
        }
    }

    /// Feed a received chunk, yielding the commands it completes in order.
    pub fn feed_all<'a>(&'a mut self, bytes: &'a [u8]) -> impl Iterator<Item = Command> + 'a {
        bytes.iter().filter_map(move |byte| self.feed(*byte))
    }

    fn reset(&mut self) {
        self.line.clear();
        self.overflowed = false;
    }
}

fn parse(line: &[u8]) -> Option<Command> {
    let Ok(line) = core::str::from_utf8(line) else {
        warn!("Ignoring host line that is not UTF-8");
        return None;
    };
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match line.split_once(' ') {
        Some(("time", rest)) => match rest.trim().parse::<Timestamp>() {
            Ok(timestamp) => Some(Command::SetTime(timestamp)),
            Err(err) => {
                warn!("Bad time command {line:?}: {err}");
                None
            },
        },
        _ => {
            warn!("Ignoring unknown host command {line:?}");
            None
        },
    }
}
