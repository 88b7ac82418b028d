//! # Frames and Line Buffers
//!
//! A `Frame` is the fixed-capacity message that carries one line between
//! stages. Its logical content ends at the first zero byte (or at capacity),
//! and everything after that is always zero when a frame is handed off.
//!
//! `LineBuffer` is capture's accumulation buffer. It is bounded: pushing past
//! capacity reports `Overflow` instead of writing anywhere.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default frame capacity in bytes.
pub const DEFAULT_FRAME_CAPACITY: usize = 64;

// ============================================================================
// Frame
// ============================================================================

#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Box<[u8]>,
}

impl Frame {
    /// A zeroed frame of the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity].into_boxed_slice(),
        }
    }

    /// Builds a frame from `content`, zero-padded to `capacity`.
    /// Content longer than the capacity is cut off.
    pub fn from_content(content: &[u8], capacity: usize) -> Self {
        let mut frame = Self::new(capacity);
        let len = content.len().min(capacity);
        frame.bytes[..len].copy_from_slice(&content[..len]);
        frame
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Length of the logical content (bytes before the first zero).
    pub fn len(&self) -> usize {
        self.bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.bytes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The logical line carried by this frame.
    pub fn content(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// The whole buffer, padding included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True when every byte after the logical content is zero.
    pub fn is_zero_padded(&self) -> bool {
        self.bytes[self.len()..].iter().all(|&b| b == 0)
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    pub(crate) fn set(&mut self, index: usize, byte: u8) {
        self.bytes[index] = byte;
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame({:?}, cap={})",
            String::from_utf8_lossy(self.content()),
            self.capacity()
        )
    }
}

// ============================================================================
// Overflow Policy
// ============================================================================

/// What capture does with a line that outgrows the frame capacity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the first `capacity` units, drop the rest.
    #[default]
    Truncate,
    /// Discard the whole line when it is completed.
    Reject,
}

impl OverflowPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            OverflowPolicy::Truncate => "truncate",
            OverflowPolicy::Reject => "reject",
        }
    }
}

impl std::str::FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(OverflowPolicy::Truncate),
            "reject" => Ok(OverflowPolicy::Reject),
            other => Err(format!(
                "unknown overflow policy '{other}' (expected truncate or reject)"
            )),
        }
    }
}

// ============================================================================
// Line Buffer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Pushed,
    Overflow,
}

/// Outcome of completing a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Completed {
    /// The line fits (or was truncated) and is ready to send.
    Line(Frame),
    /// The line overflowed under `OverflowPolicy::Reject`.
    Rejected { dropped: usize },
}

/// Bounded accumulation buffer for the line being typed.
pub struct LineBuffer {
    frame: Frame,
    index: usize,
    dropped: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frame: Frame::new(capacity),
            index: 0,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.frame.capacity()
    }

    pub fn len(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    /// Units dropped because the buffer was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Appends a unit, or reports `Overflow` and leaves the buffer untouched.
    pub fn push(&mut self, unit: u8) -> Push {
        if self.index >= self.frame.capacity() {
            self.dropped += 1;
            return Push::Overflow;
        }
        self.frame.set(self.index, unit);
        self.index += 1;
        Push::Pushed
    }

    /// Hands off the accumulated line and resets the buffer with a fresh
    /// zeroed frame.
    pub fn complete(&mut self, policy: OverflowPolicy) -> Completed {
        let capacity = self.frame.capacity();
        let frame = std::mem::replace(&mut self.frame, Frame::new(capacity));
        let dropped = self.dropped;
        self.index = 0;
        self.dropped = 0;

        match policy {
            OverflowPolicy::Reject if dropped > 0 => Completed::Rejected { dropped },
            _ => Completed::Line(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_zeroed() {
        let frame = Frame::new(8);
        assert_eq!(frame.capacity(), 8);
        assert!(frame.is_empty());
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_content_stops_at_first_zero() {
        let frame = Frame::from_content(b"ab\0cd", 8);
        assert_eq!(frame.content(), b"ab");
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_full_frame_has_no_terminator() {
        let frame = Frame::from_content(b"abcd", 4);
        assert_eq!(frame.content(), b"abcd");
        assert!(frame.is_zero_padded());
    }

    #[test]
    fn test_from_content_cuts_at_capacity() {
        let frame = Frame::from_content(b"abcdef", 4);
        assert_eq!(frame.content(), b"abcd");
    }

    #[test]
    fn test_debug_shows_content() {
        let frame = Frame::from_content(b"caf", 64);
        assert_eq!(format!("{frame:?}"), "Frame(\"caf\", cap=64)");
    }

    #[test]
    fn test_line_buffer_emits_zero_padded_frame() {
        let mut buffer = LineBuffer::new(8);
        for &b in b"caf" {
            assert_eq!(buffer.push(b), Push::Pushed);
        }
        let Completed::Line(frame) = buffer.complete(OverflowPolicy::Truncate) else {
            panic!("expected a line");
        };
        assert_eq!(frame.content(), b"caf");
        assert_eq!(&frame.as_bytes()[3..], &[0u8; 5]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_line_buffer_reuses_clean_frame() {
        let mut buffer = LineBuffer::new(8);
        for &b in b"longer" {
            buffer.push(b);
        }
        buffer.complete(OverflowPolicy::Truncate);
        buffer.push(b'x');
        let Completed::Line(frame) = buffer.complete(OverflowPolicy::Truncate) else {
            panic!("expected a line");
        };
        assert_eq!(frame.content(), b"x");
        assert!(frame.is_zero_padded());
    }

    #[test]
    fn test_overflow_truncates() {
        let mut buffer = LineBuffer::new(3);
        for &b in b"abc" {
            assert_eq!(buffer.push(b), Push::Pushed);
        }
        assert_eq!(buffer.push(b'd'), Push::Overflow);
        assert_eq!(buffer.push(b'e'), Push::Overflow);
        assert_eq!(buffer.dropped(), 2);
        assert_eq!(
            buffer.complete(OverflowPolicy::Truncate),
            Completed::Line(Frame::from_content(b"abc", 3))
        );
        assert_eq!(buffer.dropped(), 0);
    }

    #[test]
    fn test_overflow_rejects_whole_line() {
        let mut buffer = LineBuffer::new(2);
        for &b in b"abc" {
            buffer.push(b);
        }
        assert_eq!(
            buffer.complete(OverflowPolicy::Reject),
            Completed::Rejected { dropped: 1 }
        );
        buffer.push(b'x');
        assert_eq!(
            buffer.complete(OverflowPolicy::Reject),
            Completed::Line(Frame::from_content(b"x", 2))
        );
    }

    #[test]
    fn test_overflow_policy_from_str() {
        assert_eq!("truncate".parse::<OverflowPolicy>(), Ok(OverflowPolicy::Truncate));
        assert_eq!(" Reject ".parse::<OverflowPolicy>(), Ok(OverflowPolicy::Reject));
        assert!("clamp".parse::<OverflowPolicy>().is_err());
    }
}
