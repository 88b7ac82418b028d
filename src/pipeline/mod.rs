//! # Pipeline
//!
//! Wires the three stages together and owns the two ways of stopping them.
//!
//! ```text
//!             ┌──────────── echo (u8) ────────────┐
//!             │                                   ▼
//!  input ─► capture ── line (Frame) ─► translate ─► output ─► display
//!                                    translated (Frame)
//! ```
//!
//! Capture runs on the blocking pool; translate and output are async tasks that
//! only ever poll their inbound channels. Nothing supervises the stages: if
//! translate or output dies, the others keep going.
//!
//! ## Stopping
//!
//! - **Soft stop** (`'T'` or [`PipelineHandle::stop_capture`]): capture
//!   returns, the terminal is restored, and translate and output are left
//!   running. Their handles come back as [`Detached`]; they finish by
//!   themselves once whatever is in flight has drained, or the caller can
//!   abort them.
//! - **Hard kill** (Ctrl-K or [`PipelineHandle::abort_all`]): translate and
//!   output are aborted, the display is closed, the terminal is restored and
//!   capture ends. In-flight lines are lost.

pub mod capture;
pub mod channel;
pub mod output;
pub mod shutdown;
pub mod translate;

use std::fmt;
use std::io;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::{JoinError, JoinHandle};

use crate::core::config::ResolvedConfig;
use crate::core::frame::{Frame, OverflowPolicy};
use crate::terminal::{InputSource, ModeGuard};

use capture::{Capture, CaptureExit, CaptureSettings};
use channel::{ChannelError, bounded};
use output::{Display, run_output};
use shutdown::{KillSwitch, StopFlag};
use translate::run_translate;

/// How translate or output finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEnd {
    /// Inbound channels closed and emptied.
    Drained,
    /// Downstream is gone (display closed or receiver dropped).
    Halted,
    /// Writing to the display failed.
    Failed,
}

// ============================================================================
// Settings & Errors
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub frame_capacity: usize,
    pub echo_capacity: usize,
    pub line_capacity: usize,
    pub poll_interval: Duration,
    pub input_wait: Duration,
    pub send_retries: u32,
    pub overflow: OverflowPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ResolvedConfig::default())
    }
}

impl From<&ResolvedConfig> for PipelineSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            frame_capacity: config.frame_capacity,
            echo_capacity: config.echo_capacity,
            line_capacity: config.line_capacity,
            poll_interval: config.poll_interval,
            input_wait: config.input_wait,
            send_retries: config.send_retries,
            overflow: config.overflow,
        }
    }
}

#[derive(Debug)]
pub enum PipelineError {
    /// A channel or frame could not be created. Nothing was started.
    Channel(ChannelError),
    /// Reading input failed; capture stopped.
    Input(io::Error),
    /// The capture task panicked.
    Join(JoinError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Channel(e) => write!(f, "pipeline setup failed: {e}"),
            PipelineError::Input(e) => write!(f, "input error: {e}"),
            PipelineError::Join(e) => write!(f, "capture task failed: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Channel(e) => Some(e),
            PipelineError::Input(e) => Some(e),
            PipelineError::Join(e) => Some(e),
        }
    }
}

impl From<ChannelError> for PipelineError {
    fn from(e: ChannelError) -> Self {
        PipelineError::Channel(e)
    }
}

// ============================================================================
// Shutdown Report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SoftStop,
    StopRequested,
    HardKill,
    InputClosed,
}

impl From<CaptureExit> for StopReason {
    fn from(exit: CaptureExit) -> Self {
        match exit {
            CaptureExit::SoftStop => StopReason::SoftStop,
            CaptureExit::StopRequested => StopReason::StopRequested,
            CaptureExit::HardKill => StopReason::HardKill,
            CaptureExit::InputClosed => StopReason::InputClosed,
        }
    }
}

/// Translate and output, still running after capture has gone.
pub struct Detached {
    translate: JoinHandle<StageEnd>,
    output: JoinHandle<StageEnd>,
}

impl Detached {
    /// Waits for both stages to finish on their own.
    pub async fn drain(self) -> (Option<StageEnd>, Option<StageEnd>) {
        let translate = self.translate.await.ok();
        let output = self.output.await.ok();
        (translate, output)
    }

    pub fn abort(&self) {
        self.translate.abort();
        self.output.abort();
    }
}

pub struct Shutdown {
    pub reason: StopReason,
    /// Present for every reason except a hard kill.
    pub detached: Option<Detached>,
}

// ============================================================================
// Orchestration
// ============================================================================

pub struct PipelineHandle {
    capture: JoinHandle<io::Result<CaptureExit>>,
    translate: JoinHandle<StageEnd>,
    output: JoinHandle<StageEnd>,
    stop: StopFlag,
    kill: KillSwitch,
    terminal: ModeGuard,
}

/// Builds the channels and starts all three stages. Must be called from
/// within a tokio runtime. Channel creation failures abort before any stage
/// is spawned.
pub fn spawn<S>(
    settings: PipelineSettings,
    source: S,
    display: Display,
    terminal: ModeGuard,
) -> Result<PipelineHandle, PipelineError>
where
    S: InputSource + 'static,
{
    if settings.frame_capacity == 0 {
        return Err(ChannelError::ZeroCapacity("line frame").into());
    }
    let (echo_tx, echo_rx) = bounded::<u8>("raw-echo", settings.echo_capacity)?;
    let (line_tx, line_rx) = bounded::<Frame>("line", settings.line_capacity)?;
    let (translated_tx, translated_rx) =
        bounded::<Frame>("translated-line", settings.line_capacity)?;

    let output = tokio::spawn(run_output(
        echo_rx,
        translated_rx,
        display.clone(),
        settings.poll_interval,
    ));
    let translate = tokio::spawn(run_translate(
        line_rx,
        translated_tx,
        settings.poll_interval,
    ));

    let stop = StopFlag::new();
    let kill = KillSwitch::new(
        vec![
            ("translate", translate.abort_handle()),
            ("output", output.abort_handle()),
        ],
        display,
        terminal.clone(),
    );

    let capture = Capture::new(
        source,
        echo_tx,
        line_tx,
        CaptureSettings {
            frame_capacity: settings.frame_capacity,
            overflow: settings.overflow,
            send_retries: settings.send_retries,
            input_wait: settings.input_wait,
        },
        stop.clone(),
        kill.clone(),
    );
    let capture = tokio::task::spawn_blocking(move || capture.run());

    info!(
        "Pipeline started (frame={}B, echo={}, lines={}, overflow={})",
        settings.frame_capacity,
        settings.echo_capacity,
        settings.line_capacity,
        settings.overflow.label()
    );

    Ok(PipelineHandle {
        capture,
        translate,
        output,
        stop,
        kill,
        terminal,
    })
}

impl PipelineHandle {
    /// Soft stop: capture ends at its next read, nothing else is touched.
    pub fn stop_capture(&self) {
        info!("Stop capture requested");
        self.stop.request();
    }

    /// Hard kill from outside the capture stage.
    pub fn abort_all(&self) {
        if self.kill.fire() {
            info!("Abort requested: all stages cancelled");
        }
    }

    /// Waits for capture to return, restores the terminal and reports how the
    /// pipeline stopped. After a hard kill this returns without waiting for
    /// capture, which may still be parked in a blocking read; that read is
    /// left behind and capture ends at its next check of the kill switch.
    pub async fn wait(self) -> Result<Shutdown, PipelineError> {
        let PipelineHandle {
            mut capture,
            translate,
            output,
            kill,
            terminal,
            ..
        } = self;

        let exit = tokio::select! {
            biased;
            exit = &mut capture => exit,
            _ = kill.fired() => {
                info!("Hard kill: not waiting for capture to finish its read");
                Ok(Ok(CaptureExit::HardKill))
            }
        };
        restore_terminal(&terminal);

        let exit = match exit {
            Ok(Ok(exit)) => exit,
            Ok(Err(e)) => {
                error!("Capture stopped on input error: {}", e);
                return Err(PipelineError::Input(e));
            }
            Err(e) => {
                error!("Capture task failed: {}", e);
                return Err(PipelineError::Join(e));
            }
        };

        let reason = StopReason::from(exit);
        info!("Pipeline stopped: {:?}", reason);
        let detached = match reason {
            StopReason::HardKill => None,
            _ => Some(Detached { translate, output }),
        };
        Ok(Shutdown { reason, detached })
    }
}

fn restore_terminal(terminal: &ModeGuard) {
    match terminal.restore() {
        Ok(true) => info!("Terminal mode restored"),
        Ok(false) => {}
        Err(e) => warn!("Failed to restore terminal mode: {}", e),
    }
}

/// Starts the pipeline and waits for capture to stop.
pub async fn run<S>(
    settings: PipelineSettings,
    source: S,
    display: Display,
    terminal: ModeGuard,
) -> Result<Shutdown, PipelineError>
where
    S: InputSource + 'static,
{
    spawn(settings, source, display, terminal)?.wait().await
}
