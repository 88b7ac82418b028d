//! # Shutdown Scopes
//!
//! Two distinct ways to stop:
//!
//! - `StopFlag` asks capture alone to stop reading. Translate and output are
//!   not told anything.
//! - `KillSwitch` aborts translate and output, closes the display, restores
//!   the terminal and tells capture to end. Nothing is drained.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use tokio::sync::Notify;
use tokio::task::AbortHandle;

use crate::pipeline::output::Display;
use crate::terminal::ModeGuard;

#[derive(Clone, Default)]
pub struct StopFlag {
    requested: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

struct KillInner {
    stages: Vec<(&'static str, AbortHandle)>,
    display: Display,
    terminal: ModeGuard,
    fired: AtomicBool,
    notify: Notify,
}

#[derive(Clone)]
pub struct KillSwitch {
    inner: Arc<KillInner>,
}

impl KillSwitch {
    pub fn new(
        stages: Vec<(&'static str, AbortHandle)>,
        display: Display,
        terminal: ModeGuard,
    ) -> Self {
        Self {
            inner: Arc::new(KillInner {
                stages,
                display,
                terminal,
                fired: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Aborts every registered stage and restores the terminal. Only the first
    /// call does anything; returns whether this call was it.
    pub fn fire(&self) -> bool {
        if self.inner.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.display.close();
        for (name, handle) in &self.inner.stages {
            handle.abort();
            info!("Hard kill: aborted {} stage", name);
        }
        if let Err(e) = self.inner.terminal.restore() {
            warn!("Hard kill: failed to restore terminal: {}", e);
        }
        self.inner.notify.notify_waiters();
        true
    }

    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Resolves once the switch has fired, including when it already has.
    pub async fn fired(&self) {
        let notified = self.inner.notify.notified();
        if self.is_fired() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::NoopTerminal;
    use crate::test_support::{CountingTerminal, SharedBuffer};

    #[tokio::test]
    async fn test_fire_aborts_stages_once() {
        let terminal = CountingTerminal::default();
        let display = Display::new(SharedBuffer::default());
        let task = tokio::spawn(std::future::pending::<()>());
        let kill = KillSwitch::new(
            vec![("pending", task.abort_handle())],
            display.clone(),
            ModeGuard::enter(terminal.clone()).unwrap(),
        );

        assert!(kill.fire());
        assert!(!kill.fire());
        assert!(kill.is_fired());
        assert!(display.is_closed());
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(terminal.restores(), 1);
    }

    #[tokio::test]
    async fn test_fired_wakes_waiter() {
        let kill = KillSwitch::new(
            Vec::new(),
            Display::new(SharedBuffer::default()),
            ModeGuard::enter(NoopTerminal).unwrap(),
        );
        let waiter = tokio::spawn({
            let kill = kill.clone();
            async move { kill.fired().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        kill.fire();
        tokio_test::assert_ok!(
            tokio::time::timeout(std::time::Duration::from_secs(1), waiter).await
        )
        .unwrap();
        // Already fired: returns straight away
        kill.fired().await;
    }

    #[test]
    fn test_stop_flag_is_shared() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!other.is_requested());
        flag.request();
        assert!(other.is_requested());
    }

    #[test]
    fn test_fire_without_stages() {
        let kill = KillSwitch::new(
            Vec::new(),
            Display::new(SharedBuffer::default()),
            ModeGuard::enter(NoopTerminal).unwrap(),
        );
        assert!(kill.fire());
    }
}
