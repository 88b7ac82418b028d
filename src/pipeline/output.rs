//! # Output Stage
//!
//! Polls the raw-echo channel first and the translated-line channel only when
//! no echo unit is waiting. Echo always wins a poll cycle, so a steady run of
//! keystrokes can hold translated lines back indefinitely. That priority is
//! intentional: typing must never lag behind translation.
//!
//! All writes go through a `Display`, a shared gate around the sink. Once the
//! hard-kill path closes it every later write is refused, so nothing is
//! printed after a hard kill has been processed.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};

use crate::core::frame::Frame;
use crate::pipeline::StageEnd;
use crate::pipeline::channel::{Receiver, TryRecv};

/// Written before and after every translated line.
pub const RECORD_SEPARATOR: &[u8] = b"\n\r";

// ============================================================================
// Display
// ============================================================================

struct DisplayState {
    writer: Box<dyn Write + Send>,
    closed: bool,
}

#[derive(Clone)]
pub struct Display {
    state: Arc<Mutex<DisplayState>>,
}

impl Display {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            state: Arc::new(Mutex::new(DisplayState {
                writer: Box::new(writer),
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes one echoed unit unframed. Returns `Ok(false)` once closed.
    pub fn echo(&self, unit: u8) -> io::Result<bool> {
        let mut state = self.lock();
        if state.closed {
            return Ok(false);
        }
        state.writer.write_all(&[unit])?;
        state.writer.flush()?;
        Ok(true)
    }

    /// Writes a translated line between record separators. Returns
    /// `Ok(false)` once closed.
    pub fn line(&self, content: &[u8]) -> io::Result<bool> {
        let mut state = self.lock();
        if state.closed {
            return Ok(false);
        }
        state.writer.write_all(RECORD_SEPARATOR)?;
        state.writer.write_all(content)?;
        state.writer.write_all(RECORD_SEPARATOR)?;
        state.writer.flush()?;
        Ok(true)
    }

    /// Refuses every later write. Waits for a write in progress to finish.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            let _ = state.writer.flush();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

// ============================================================================
// Stage Loop
// ============================================================================

pub async fn run_output(
    mut echo_rx: Receiver<u8>,
    mut translated_rx: Receiver<Frame>,
    display: Display,
    poll_interval: Duration,
) -> StageEnd {
    let mut echo_open = true;
    let mut translated_open = true;
    let mut lines_printed = 0usize;

    loop {
        // 1. Raw echo has priority
        if echo_open {
            match echo_rx.try_recv() {
                TryRecv::Ready(unit) => {
                    match display.echo(unit) {
                        Ok(true) => {}
                        Ok(false) => return StageEnd::Halted,
                        Err(e) => {
                            warn!("Output stage failed writing echo: {}", e);
                            return StageEnd::Failed;
                        }
                    }
                    // Keep the loop cancellable during long echo runs
                    tokio::task::yield_now().await;
                    continue;
                }
                TryRecv::Empty => {}
                TryRecv::Closed => {
                    debug!("Output: {} channel closed", echo_rx.name());
                    echo_open = false;
                }
            }
        }

        // 2. Translated lines only when no echo was waiting
        if translated_open {
            match translated_rx.try_recv() {
                TryRecv::Ready(frame) => {
                    match display.line(frame.content()) {
                        Ok(true) => lines_printed += 1,
                        Ok(false) => return StageEnd::Halted,
                        Err(e) => {
                            warn!("Output stage failed writing line: {}", e);
                            return StageEnd::Failed;
                        }
                    }
                    tokio::task::yield_now().await;
                    continue;
                }
                TryRecv::Empty => {}
                TryRecv::Closed => {
                    debug!("Output: {} channel closed", translated_rx.name());
                    translated_open = false;
                }
            }
        }

        if !echo_open && !translated_open {
            info!("Output stage drained ({} lines printed)", lines_printed);
            return StageEnd::Drained;
        }

        // 3. Nothing ready
        tokio::time::sleep(poll_interval).await;
    }
}
