//! # Marker Units
//!
//! The reserved bytes that drive control behaviour. The set is fixed:
//!
//! ```text
//! capture    'E'   line end       complete the current line
//!            'T'   soft stop      stop capturing
//!            0x0B  hard kill      abort every stage (Ctrl-K)
//! translate  'a'   rewrite        write 'z'
//!            'X'   erase          drop the previous output byte
//!            'K'   kill line      drop everything written so far
//! ```

pub const LINE_END: u8 = b'E';
pub const SOFT_STOP: u8 = b'T';
pub const HARD_KILL: u8 = 0x0B;

pub const REWRITE_FROM: u8 = b'a';
pub const REWRITE_TO: u8 = b'z';
pub const ERASE: u8 = b'X';
pub const KILL_LINE: u8 = b'K';

/// How capture treats an input unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureUnit {
    LineEnd,
    SoftStop,
    HardKill,
    /// Zero cannot live inside a zero-terminated frame.
    Nul,
    Text(u8),
}

impl CaptureUnit {
    pub fn classify(unit: u8) -> Self {
        match unit {
            LINE_END => CaptureUnit::LineEnd,
            SOFT_STOP => CaptureUnit::SoftStop,
            HARD_KILL => CaptureUnit::HardKill,
            0 => CaptureUnit::Nul,
            other => CaptureUnit::Text(other),
        }
    }
}

/// How translate treats a byte of a completed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditUnit {
    Write(u8),
    Erase,
    KillLine,
}

impl EditUnit {
    pub fn classify(byte: u8) -> Self {
        match byte {
            REWRITE_FROM => EditUnit::Write(REWRITE_TO),
            ERASE => EditUnit::Erase,
            KILL_LINE => EditUnit::KillLine,
            other => EditUnit::Write(other),
        }
    }
}
