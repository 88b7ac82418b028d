//! # Channels
//!
//! Bounded one-way conduits between stages, built on `tokio::sync::mpsc`.
//! Receivers only expose a non-blocking poll: a receive either yields a
//! message, reports that nothing is there yet, or reports that every sender
//! is gone. "Empty" is the ordinary outcome of a poll and is never an error.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

/// Pause between attempts of a retried send.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub enum ChannelError {
    ZeroCapacity(&'static str),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::ZeroCapacity(name) => {
                write!(f, "cannot create {name} channel with zero capacity")
            }
        }
    }
}

impl std::error::Error for ChannelError {}

/// A failed send hands the message back.
#[derive(Debug, PartialEq, Eq)]
pub enum SendError<T> {
    Full(T),
    Closed(T),
}

impl<T> SendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            SendError::Full(v) | SendError::Closed(v) => v,
        }
    }
}

/// Result of a non-blocking receive.
#[derive(Debug, PartialEq, Eq)]
pub enum TryRecv<T> {
    Ready(T),
    Empty,
    Closed,
}

pub struct Sender<T> {
    name: &'static str,
    inner: mpsc::Sender<T>,
}

pub struct Receiver<T> {
    name: &'static str,
    inner: mpsc::Receiver<T>,
}

/// Creates a bounded channel. Zero capacity is refused rather than panicking
/// inside tokio.
pub fn bounded<T>(
    name: &'static str,
    capacity: usize,
) -> Result<(Sender<T>, Receiver<T>), ChannelError> {
    if capacity == 0 {
        return Err(ChannelError::ZeroCapacity(name));
    }
    let (tx, rx) = mpsc::channel(capacity);
    Ok((Sender { name, inner: tx }, Receiver { name, inner: rx }))
}

impl<T> Sender<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn try_send(&self, value: T) -> Result<(), SendError<T>> {
        self.inner.try_send(value).map_err(|e| match e {
            mpsc::error::TrySendError::Full(v) => SendError::Full(v),
            mpsc::error::TrySendError::Closed(v) => SendError::Closed(v),
        })
    }

    /// Non-blocking send retried up to `retries` extra times while the
    /// channel is full, sleeping the calling thread in between. Only for use
    /// off the async runtime.
    pub fn send_with_retry(&self, value: T, retries: u32) -> Result<(), SendError<T>> {
        let mut value = value;
        let mut attempt = 0;
        loop {
            match self.try_send(value) {
                Ok(()) => return Ok(()),
                Err(SendError::Full(v)) if attempt < retries => {
                    attempt += 1;
                    value = v;
                    std::thread::sleep(RETRY_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Waits for room in the channel. Returns the value if the receiver is gone.
    pub async fn send(&self, value: T) -> Result<(), SendError<T>> {
        self.inner
            .send(value)
            .await
            .map_err(|mpsc::error::SendError(v)| SendError::Closed(v))
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
        }
    }
}

impl<T> Receiver<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn try_recv(&mut self) -> TryRecv<T> {
        match self.inner.try_recv() {
            Ok(v) => TryRecv::Ready(v),
            Err(mpsc::error::TryRecvError::Empty) => TryRecv::Empty,
            Err(mpsc::error::TryRecvError::Disconnected) => TryRecv::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_is_refused() {
        let err = bounded::<u8>("echo", 0).err().unwrap();
        assert_eq!(err.to_string(), "cannot create echo channel with zero capacity");
    }

    #[test]
    fn test_empty_then_ready_then_closed() {
        let (tx, mut rx) = bounded::<u8>("echo", 4).unwrap();
        assert_eq!(rx.try_recv(), TryRecv::Empty);
        tx.try_send(b'c').unwrap();
        assert_eq!(rx.try_recv(), TryRecv::Ready(b'c'));
        drop(tx);
        assert_eq!(rx.try_recv(), TryRecv::Closed);
    }

    #[test]
    fn test_pending_messages_drain_before_closed() {
        let (tx, mut rx) = bounded::<u8>("echo", 4).unwrap();
        tx.try_send(1).unwrap();
        tx.try_send(2).unwrap();
        drop(tx);
        assert_eq!(rx.try_recv(), TryRecv::Ready(1));
        assert_eq!(rx.try_recv(), TryRecv::Ready(2));
        assert_eq!(rx.try_recv(), TryRecv::Closed);
    }

    #[test]
    fn test_full_channel_returns_value() {
        let (tx, _rx) = bounded::<u8>("echo", 1).unwrap();
        tx.try_send(1).unwrap();
        assert_eq!(tx.try_send(2), Err(SendError::Full(2)));
    }

    #[test]
    fn test_retry_gives_up_when_still_full() {
        let (tx, _rx) = bounded::<u8>("echo", 1).unwrap();
        tx.try_send(1).unwrap();
        let err = tx.send_with_retry(2, 3).unwrap_err();
        assert_eq!(err.into_inner(), 2);
    }

    #[test]
    fn test_send_to_dropped_receiver_is_closed() {
        let (tx, rx) = bounded::<u8>("line", 1).unwrap();
        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.send_with_retry(7, 3), Err(SendError::Closed(7)));
    }

    #[tokio::test]
    async fn test_async_send_waits_for_room() {
        let (tx, mut rx) = bounded::<u8>("translated", 1).unwrap();
        tx.try_send(1).unwrap();
        let pending = tokio::spawn(async move { tx.send(2).await });
        tokio::task::yield_now().await;
        assert_eq!(rx.try_recv(), TryRecv::Ready(1));
        tokio_test::assert_ok!(pending.await.unwrap());
        assert_eq!(rx.try_recv(), TryRecv::Ready(2));
    }
}
