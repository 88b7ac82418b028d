//! # Core Line Logic
//!
//! Everything here is synchronous and free of I/O: the frame type, the fixed
//! marker set, the translation policy and configuration. The concurrent
//! stages in [`crate::pipeline`] are built on top of it.
//!
//! ```text
//!   input ──► capture ──┬── raw echo ─────────────────────► output ──► display
//!                       │                                     ▲
//!                       └── line ──► translate ── translated ─┘
//! ```
//!
//! ## Modules
//!
//! - [`frame`]: `Frame` and the bounded `LineBuffer`
//! - [`marker`]: the reserved control bytes
//! - [`translate`]: the per-character rewrite of a completed line
//! - [`config`]: settings with defaults → file → env → CLI resolution

pub mod config;
pub mod frame;
pub mod marker;
pub mod translate;
