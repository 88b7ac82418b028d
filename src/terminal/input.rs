//! # Input Sources
//!
//! Capture pulls units from an `InputSource` one at a time. Two sources ship:
//!
//! - `ByteSource` wraps any `Read` and blocks until a byte or end of input.
//! - `KeySource` reads crossterm key events and turns each into the bytes a
//!   terminal would send, waiting at most the given duration per call.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::debug;

/// One poll of an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Unit(u8),
    /// Nothing arrived within the wait.
    Idle,
    /// The source is exhausted.
    Closed,
}

pub trait InputSource: Send {
    /// Block until a unit arrives, the wait elapses, or the source closes.
    /// Sources without a notion of waiting may block past `wait`.
    fn read_unit(&mut self, wait: Duration) -> io::Result<Input>;
}

// ============================================================================
// Byte Source
// ============================================================================

pub struct ByteSource<R> {
    reader: R,
}

impl<R: Read + Send> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read + Send> InputSource for ByteSource<R> {
    fn read_unit(&mut self, _wait: Duration) -> io::Result<Input> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(Input::Closed),
                Ok(_) => return Ok(Input::Unit(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

// ============================================================================
// Key Source (crossterm)
// ============================================================================

#[derive(Default)]
pub struct KeySource {
    pending: VecDeque<u8>,
}

impl KeySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSource for KeySource {
    fn read_unit(&mut self, wait: Duration) -> io::Result<Input> {
        if let Some(unit) = self.pending.pop_front() {
            return Ok(Input::Unit(unit));
        }
        if !event::poll(wait)? {
            return Ok(Input::Idle);
        }
        if let Event::Key(key_event) = event::read()? {
            if key_event.kind == KeyEventKind::Release {
                return Ok(Input::Idle);
            }
            debug!(
                "Key event: {:?} with modifiers {:?}",
                key_event.code, key_event.modifiers
            );
            if let Some(bytes) = key_event_to_bytes(key_event) {
                self.pending.extend(bytes);
            }
        }
        Ok(self.pending.pop_front().map_or(Input::Idle, Input::Unit))
    }
}

/// Convert a crossterm KeyEvent to the bytes a raw terminal would deliver.
pub fn key_event_to_bytes(event: KeyEvent) -> Option<Vec<u8>> {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    // Ctrl+A through Ctrl+Z map to 0x01-0x1A (Ctrl+K is the hard kill)
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char(c) if c.is_ascii_alphabetic() => {
                Some(vec![(c.to_ascii_lowercase() as u8) - b'a' + 1])
            }
            _ => None,
        };
    }

    match code {
        KeyCode::Char(c) => Some(c.to_string().into_bytes()),
        KeyCode::Enter => Some(vec![b'\r']),
        KeyCode::Tab => Some(vec![b'\t']),
        KeyCode::Backspace => Some(vec![0x7F]),
        KeyCode::Esc => Some(vec![0x1B]),
        _ => None,
    }
}
