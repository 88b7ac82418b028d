//! # Terminal Boundary
//!
//! The external collaborators around the pipeline: putting the terminal into
//! unbuffered no-echo mode before the stages start and restoring it afterwards,
//! plus the input sources capture reads from.
//!
//! This is the only module that knows about crossterm.

pub mod input;

use log::{info, warn};
use std::io;
use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

pub use input::{ByteSource, Input, InputSource, KeySource};

/// Switches the terminal in and out of character-at-a-time mode.
pub trait TerminalMode: Send + Sync {
    fn enter(&self) -> io::Result<()>;
    fn restore(&self) -> io::Result<()>;
}

// ============================================================================
// Raw Terminal (crossterm)
// ============================================================================

/// Tracks whether raw mode is on, for the panic hook.
static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Raw mode via crossterm: no line buffering, no local echo.
pub struct RawTerminal;

impl TerminalMode for RawTerminal {
    fn enter(&self) -> io::Result<()> {
        install_panic_hook();
        enable_raw_mode()?;
        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);
        info!("Terminal raw mode enabled");
        Ok(())
    }

    fn restore(&self) -> io::Result<()> {
        RAW_MODE_ACTIVE.store(false, Ordering::SeqCst);
        disable_raw_mode()?;
        info!("Terminal raw mode disabled");
        Ok(())
    }
}

/// Leaves the terminal alone (stdin is a pipe, or `--no-raw`).
pub struct NoopTerminal;

impl TerminalMode for NoopTerminal {
    fn enter(&self) -> io::Result<()> {
        Ok(())
    }

    fn restore(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Restores the terminal before the panic message is printed.
fn install_panic_hook() {
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        if RAW_MODE_ACTIVE.swap(false, Ordering::SeqCst) {
            let _ = disable_raw_mode();
        }
        original_hook(panic_info);
    }));
}

// ============================================================================
// Mode Guard
// ============================================================================

struct GuardInner {
    mode: Box<dyn TerminalMode>,
    active: AtomicBool,
}

/// Shared handle on an entered terminal mode. Whichever path gets there first
/// (hard kill, orchestrator, or drop) restores it; every later call is a no-op.
#[derive(Clone)]
pub struct ModeGuard {
    inner: Arc<GuardInner>,
}

impl ModeGuard {
    /// Enter the mode and return a guard that restores it at most once.
    pub fn enter<M: TerminalMode + 'static>(mode: M) -> io::Result<Self> {
        mode.enter()?;
        Ok(Self {
            inner: Arc::new(GuardInner {
                mode: Box::new(mode),
                active: AtomicBool::new(true),
            }),
        })
    }

    /// Restores the terminal. Returns `Ok(false)` if it was already restored.
    pub fn restore(&self) -> io::Result<bool> {
        if self.inner.active.swap(false, Ordering::SeqCst) {
            self.inner.mode.restore()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }
}

impl Drop for GuardInner {
    fn drop(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.mode.restore() {
                warn!("Failed to restore terminal on drop: {}", e);
            }
        }
    }
}
