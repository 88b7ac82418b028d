//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::terminal::{Input, InputSource, TerminalMode};

/// A `Write` sink tests can inspect after handing a clone to the display.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().unwrap().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Counts how often the terminal mode is entered and restored.
#[derive(Clone, Default)]
pub struct CountingTerminal {
    entered: Arc<AtomicUsize>,
    restored: Arc<AtomicUsize>,
}

impl CountingTerminal {
    pub fn entries(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn restores(&self) -> usize {
        self.restored.load(Ordering::SeqCst)
    }
}

impl TerminalMode for CountingTerminal {
    fn enter(&self) -> io::Result<()> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn restore(&self) -> io::Result<()> {
        self.restored.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Plays back a fixed script of units, then either closes or idles forever.
pub struct ScriptedSource {
    script: VecDeque<u8>,
    idle_when_done: bool,
}

impl ScriptedSource {
    pub fn closing(script: &[u8]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            idle_when_done: false,
        }
    }

    pub fn idling(script: &[u8]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            idle_when_done: true,
        }
    }
}

impl InputSource for ScriptedSource {
    fn read_unit(&mut self, wait: Duration) -> io::Result<Input> {
        match self.script.pop_front() {
            Some(unit) => Ok(Input::Unit(unit)),
            None if self.idle_when_done => {
                std::thread::sleep(wait.min(Duration::from_millis(5)));
                Ok(Input::Idle)
            }
            None => Ok(Input::Closed),
        }
    }
}
