//! # Translate Stage
//!
//! Polls the line channel, rewrites each frame with [`translate`], and passes
//! the result on. When the line channel is empty it sleeps one poll interval;
//! when it is closed and drained the stage ends, which in turn closes the
//! translated-line channel.

use std::time::Duration;

use log::{debug, info, warn};

use crate::core::frame::Frame;
use crate::core::translate::translate;
use crate::pipeline::StageEnd;
use crate::pipeline::channel::{Receiver, Sender, TryRecv};

pub async fn run_translate(
    mut line_rx: Receiver<Frame>,
    translated_tx: Sender<Frame>,
    poll_interval: Duration,
) -> StageEnd {
    let mut translated = 0usize;

    loop {
        match line_rx.try_recv() {
            TryRecv::Ready(frame) => {
                let output = translate(&frame);
                debug!("Translated {:?} -> {:?}", frame, output);
                if translated_tx.send(output).await.is_err() {
                    warn!(
                        "Translate: {} receiver dropped after {} lines",
                        translated_tx.name(),
                        translated
                    );
                    return StageEnd::Halted;
                }
                translated += 1;
            }
            TryRecv::Empty => tokio::time::sleep(poll_interval).await,
            TryRecv::Closed => {
                info!("Translate stage drained ({} lines)", translated);
                return StageEnd::Drained;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::channel::bounded;

    fn collect(rx: &mut Receiver<Frame>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let TryRecv::Ready(frame) = rx.try_recv() {
            assert!(frame.is_zero_padded());
            out.push(frame.content().to_vec());
        }
        out
    }

    #[tokio::test]
    async fn test_translates_lines_in_order() {
        let (line_tx, line_rx) = bounded("line", 8).unwrap();
        let (out_tx, mut out_rx) = bounded("translated", 8).unwrap();

        for line in [&b"caf"[..], b"abX", b"aKb"] {
            line_tx.try_send(Frame::from_content(line, 64)).unwrap();
        }
        drop(line_tx);

        let end = run_translate(line_rx, out_tx, Duration::from_millis(1)).await;
        assert_eq!(end, StageEnd::Drained);
        assert_eq!(
            collect(&mut out_rx),
            vec![b"czf".to_vec(), b"z".to_vec(), b"b".to_vec()]
        );
        assert_eq!(out_rx.try_recv(), TryRecv::Closed);
    }

    #[tokio::test]
    async fn test_waits_while_line_channel_is_empty() {
        let (line_tx, line_rx) = bounded("line", 8).unwrap();
        let (out_tx, mut out_rx) = bounded("translated", 8).unwrap();
        let stage = tokio::spawn(run_translate(line_rx, out_tx, Duration::from_millis(1)));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!stage.is_finished());

        line_tx.try_send(Frame::from_content(b"banana", 64)).unwrap();
        drop(line_tx);
        assert_eq!(stage.await.unwrap(), StageEnd::Drained);
        assert_eq!(collect(&mut out_rx), vec![b"bznznz".to_vec()]);
    }

    #[tokio::test]
    async fn test_halts_when_output_is_gone() {
        let (line_tx, line_rx) = bounded("line", 8).unwrap();
        let (out_tx, out_rx) = bounded::<Frame>("translated", 8).unwrap();
        drop(out_rx);
        line_tx.try_send(Frame::from_content(b"x", 8)).unwrap();

        let end = run_translate(line_rx, out_tx, Duration::from_millis(1)).await;
        assert_eq!(end, StageEnd::Halted);
    }
}
