//! Frame queue between the reader and processor tasks
//!
//! | capacity | overflow      | channel                 |
//! |----------|---------------|-------------------------|
//! | absent   | (ignored)     | unbounded mpsc          |
//! | `n`      | `block`       | bounded mpsc, reader waits |
//! | `n`      | `drop_oldest` | broadcast ring, oldest lost |
//!
//! The ring holds `n` rounded up to a power of two; configuration
//! validation only admits powers of two for `drop_oldest`.

use rtu_sniff::RawFrame;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::config::{OverflowPolicy, QueueConfig};

/// The processor side has gone away
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Frame queue closed")]
pub struct QueueClosed;

/// Producer half, owned by the reader task
#[derive(Debug)]
pub enum FrameSender {
    Unbounded(mpsc::UnboundedSender<RawFrame>),
    Bounded(mpsc::Sender<RawFrame>),
    Ring(broadcast::Sender<RawFrame>),
}

/// Consumer half, owned by the processor task
#[derive(Debug)]
pub enum FrameReceiver {
    Unbounded(mpsc::UnboundedReceiver<RawFrame>),
    Bounded(mpsc::Receiver<RawFrame>),
    Ring {
        rx: broadcast::Receiver<RawFrame>,
        dropped: u64,
    },
}

/// Create a queue following the configured policy
pub fn frame_queue(config: &QueueConfig) -> (FrameSender, FrameReceiver) {
    match (config.capacity, config.overflow) {
        (None, _) => {
            let (tx, rx) = mpsc::unbounded_channel();
            (FrameSender::Unbounded(tx), FrameReceiver::Unbounded(rx))
        },
        (Some(capacity), OverflowPolicy::Block) => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (FrameSender::Bounded(tx), FrameReceiver::Bounded(rx))
        },
        (Some(capacity), OverflowPolicy::DropOldest) => {
            let (tx, rx) = broadcast::channel(capacity.max(1));
            (
                FrameSender::Ring(tx),
                FrameReceiver::Ring { rx, dropped: 0 },
            )
        },
    }
}

impl FrameSender {
    /// Enqueue a frame; waits for space only under the `block` policy
    pub async fn send(&self, frame: RawFrame) -> Result<(), QueueClosed> {
        match self {
            FrameSender::Unbounded(tx) => tx.send(frame).map_err(|_| QueueClosed),
            FrameSender::Bounded(tx) => tx.send(frame).await.map_err(|_| QueueClosed),
            FrameSender::Ring(tx) => tx.send(frame).map(|_| ()).map_err(|_| QueueClosed),
        }
    }
}

impl FrameReceiver {
    /// Next frame, or `None` once the sender is dropped and the queue drained
    pub async fn recv(&mut self) -> Option<RawFrame> {
        match self {
            FrameReceiver::Unbounded(rx) => rx.recv().await,
            FrameReceiver::Bounded(rx) => rx.recv().await,
            FrameReceiver::Ring { rx, dropped } => loop {
                match rx.recv().await {
                    Ok(frame) => return Some(frame),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        *dropped += n;
                        warn!("Processor lagging: {} frames dropped ({} total)", n, dropped);
                    },
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
        }
    }

    /// Frames lost to the `drop_oldest` policy so far
    pub fn dropped(&self) -> u64 {
        match self {
            FrameReceiver::Ring { dropped, .. } => *dropped,
            _ => 0,
        }
    }
}
