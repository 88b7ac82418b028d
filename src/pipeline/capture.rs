//! # Capture Stage
//!
//! Reads input one unit at a time, echoes every unit straight away, and
//! gathers everything that is not a capture marker into the line buffer.
//! This is the only stage that blocks, and it blocks on the input source only:
//! both sends are non-blocking with a bounded retry, and a unit or line that
//! still does not fit is dropped with a warning.
//!
//! Runs on the blocking thread pool, never on an async worker.

use std::io;
use std::time::Duration;

use log::{debug, info, warn};

use crate::core::frame::{Completed, Frame, LineBuffer, OverflowPolicy, Push};
use crate::core::marker::CaptureUnit;
use crate::pipeline::channel::{SendError, Sender};
use crate::pipeline::shutdown::{KillSwitch, StopFlag};
use crate::terminal::{Input, InputSource};

/// Why capture returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureExit {
    /// The soft-stop marker was read.
    SoftStop,
    /// `stop_capture()` was called.
    StopRequested,
    /// The hard-kill marker was read, or `abort_all()` was called.
    HardKill,
    /// The input source ran out.
    InputClosed,
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureSettings {
    pub frame_capacity: usize,
    pub overflow: OverflowPolicy,
    pub send_retries: u32,
    pub input_wait: Duration,
}

pub struct Capture<S> {
    source: S,
    echo_tx: Sender<u8>,
    line_tx: Sender<Frame>,
    buffer: LineBuffer,
    settings: CaptureSettings,
    stop: StopFlag,
    kill: KillSwitch,
}

impl<S: InputSource> Capture<S> {
    pub fn new(
        source: S,
        echo_tx: Sender<u8>,
        line_tx: Sender<Frame>,
        settings: CaptureSettings,
        stop: StopFlag,
        kill: KillSwitch,
    ) -> Self {
        Self {
            source,
            echo_tx,
            line_tx,
            buffer: LineBuffer::new(settings.frame_capacity),
            settings,
            stop,
            kill,
        }
    }

    /// Runs until a marker, a stop request, or the end of input. Both
    /// senders are dropped on return.
    pub fn run(mut self) -> io::Result<CaptureExit> {
        info!("Capture stage started");
        loop {
            if self.kill.is_fired() {
                info!("Capture: ending after external hard kill");
                return Ok(CaptureExit::HardKill);
            }
            if self.stop.is_requested() {
                info!("Capture: stop requested");
                return Ok(CaptureExit::StopRequested);
            }

            let unit = match self.source.read_unit(self.settings.input_wait)? {
                Input::Unit(unit) => unit,
                Input::Idle => continue,
                Input::Closed => {
                    if !self.buffer.is_empty() {
                        debug!("Capture: discarding {} unfinished units", self.buffer.len());
                    }
                    info!("Capture: input closed");
                    return Ok(CaptureExit::InputClosed);
                }
            };

            self.echo(unit);

            match CaptureUnit::classify(unit) {
                CaptureUnit::LineEnd => self.complete_line(),
                CaptureUnit::SoftStop => {
                    info!("Capture: soft stop marker");
                    return Ok(CaptureExit::SoftStop);
                }
                CaptureUnit::HardKill => {
                    warn!("Capture: hard kill marker");
                    self.kill.fire();
                    return Ok(CaptureExit::HardKill);
                }
                CaptureUnit::Nul => debug!("Capture: zero unit echoed, not accumulated"),
                CaptureUnit::Text(byte) => {
                    if self.buffer.push(byte) == Push::Overflow && self.buffer.dropped() == 1 {
                        warn!(
                            "Capture: line exceeds {} bytes ({})",
                            self.buffer.capacity(),
                            self.settings.overflow.label()
                        );
                    }
                }
            }
        }
    }

    fn echo(&self, unit: u8) {
        match self.echo_tx.send_with_retry(unit, self.settings.send_retries) {
            Ok(()) => {}
            Err(SendError::Full(_)) => warn!("Capture: {} channel full, dropped unit", self.echo_tx.name()),
            Err(SendError::Closed(_)) => debug!("Capture: {} channel closed", self.echo_tx.name()),
        }
    }

    fn complete_line(&mut self) {
        let frame = match self.buffer.complete(self.settings.overflow) {
            Completed::Line(frame) => frame,
            Completed::Rejected { dropped } => {
                warn!("Capture: rejected overflowing line ({} units over)", dropped);
                return;
            }
        };
        debug!("Capture: line complete {:?}", frame);
        match self.line_tx.send_with_retry(frame, self.settings.send_retries) {
            Ok(()) => {}
            Err(SendError::Full(_)) => warn!("Capture: {} channel full, dropped line", self.line_tx.name()),
            Err(SendError::Closed(_)) => debug!("Capture: {} channel closed", self.line_tx.name()),
        }
    }
}
