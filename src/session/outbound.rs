//! Outbound session channel
//!
//! Each dialed peer gets a bounded queue of frames and a writer task that
//! drains it into the peer's stream. Pushing never waits: when the queue is
//! full the frame is dropped for that peer only, so a slow consumer degrades
//! its own feed and nothing else.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::Result;
use crate::media::FrameBuffer;
use crate::stats::SessionCounters;

/// Result of pushing a frame into one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Frame queued for the writer
    Queued,
    /// Queue full; frame dropped for this peer
    Dropped,
    /// Writer has gone away
    Closed,
}

/// Sending half of an outbound session
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct OutboundHandle {
    tx: mpsc::Sender<Bytes>,
    counters: Arc<SessionCounters>,
}

/// Receiving half, owned by the writer task
#[derive(Debug)]
pub struct OutboundQueue {
    rx: mpsc::Receiver<Bytes>,
    counters: Arc<SessionCounters>,
}

/// Create a bounded outbound queue holding up to `capacity` frames
pub fn channel(capacity: usize) -> (OutboundHandle, OutboundQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let counters = Arc::new(SessionCounters::default());

    (
        OutboundHandle {
            tx,
            counters: Arc::clone(&counters),
        },
        OutboundQueue { rx, counters },
    )
}

impl OutboundHandle {
    /// Queue a frame without waiting
    pub fn push(&self, frame: &FrameBuffer) -> PushOutcome {
        match self.tx.try_send(frame.data().clone()) {
            Ok(()) => {
                self.counters.record_queued();
                PushOutcome::Queued
            }
            Err(TrySendError::Full(_)) => {
                self.counters.record_dropped();
                PushOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => PushOutcome::Closed,
        }
    }

    /// Whether the writer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Counters for this session
    pub fn counters(&self) -> &Arc<SessionCounters> {
        &self.counters
    }
}

impl OutboundQueue {
    /// Take the next queued frame without waiting
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }

    /// Drain queued frames into `stream` until every handle is dropped
    ///
    /// Returns an error if a write fails. Frames go out back to back with no
    /// framing; the receiver splits them by size.
    pub async fn run_writer<W>(mut self, mut stream: W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(data) = self.rx.recv().await {
            stream.write_all(&data).await?;
            self.counters.record_sent(data.len());
        }

        stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::media::FrameGeometry;

    fn frame(value: u8) -> FrameBuffer {
        FrameBuffer::solid(FrameGeometry::new(2, 2).unwrap(), [value; 4])
    }

    #[test]
    fn test_push_bounded() {
        let (handle, _queue) = channel(2);

        assert_eq!(handle.push(&frame(1)), PushOutcome::Queued);
        assert_eq!(handle.push(&frame(2)), PushOutcome::Queued);
        assert_eq!(handle.push(&frame(3)), PushOutcome::Dropped);

        let stats = handle.counters().snapshot();
        assert_eq!(stats.frames_queued, 2);
        assert_eq!(stats.frames_dropped, 1);
    }

    #[test]
    fn test_push_after_writer_gone() {
        let (handle, queue) = channel(2);
        drop(queue);

        assert!(handle.is_closed());
        assert_eq!(handle.push(&frame(1)), PushOutcome::Closed);
    }

    #[tokio::test]
    async fn test_writer_drains_in_order() {
        let (handle, queue) = channel(4);
        let (local, mut remote) = tokio::io::duplex(1024);

        handle.push(&frame(1));
        handle.push(&frame(2));
        let counters = Arc::clone(handle.counters());
        drop(handle);

        queue.run_writer(local).await.unwrap();

        let mut received = Vec::new();
        remote.read_to_end(&mut received).await.unwrap();

        let mut expected = vec![1u8; 16];
        expected.extend_from_slice(&[2u8; 16]);
        assert_eq!(received, expected);
        assert_eq!(counters.snapshot().frames_sent, 2);
        assert_eq!(counters.snapshot().bytes_sent, 32);
    }

    #[tokio::test]
    async fn test_writer_sends_raw_frames_back_to_back() {
        let (handle, queue) = channel(4);
        let stream = tokio_test::io::Builder::new()
            .write(&[7u8; 16])
            .write(&[9u8; 16])
            .build();

        handle.push(&frame(7));
        handle.push(&frame(9));
        drop(handle);

        tokio_test::assert_ok!(queue.run_writer(stream).await);
    }

    #[tokio::test]
    async fn test_writer_error_on_closed_stream() {
        let (handle, queue) = channel(4);
        let (local, remote) = tokio::io::duplex(1024);
        drop(remote);

        handle.push(&frame(1));
        let result = queue.run_writer(local).await;
        assert!(result.is_err());
    }
}
