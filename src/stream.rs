//! Producer/consumer capability contracts and the bounded hand-off queue.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chunk::Chunk;
use crate::error::BatchError;

/// Sending half of a step's hand-off queue.
pub type ChunkSender = mpsc::Sender<Chunk>;

/// Receiving half of a step's hand-off queue.
pub type ChunkReceiver = mpsc::Receiver<Chunk>;

/// Reader role: emits a finite, ordered sequence of chunks.
///
/// The sender is moved into `read`, so the queue terminates exactly once on
/// every exit path - success, failure, or cancellation - when the sender
/// drops. Implementations that block for long stretches should poll `cancel`
/// at chunk boundaries; the step join stops waiting on cancellation either
/// way, but a polling producer also stops working.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn read(&self, cancel: CancellationToken, tx: ChunkSender) -> Result<(), BatchError>;
}

/// Writer role: drains the hand-off queue until it terminates, or returns
/// early with an error.
#[async_trait]
pub trait Consumer: Send + Sync {
    async fn write(&self, cancel: CancellationToken, rx: ChunkReceiver) -> Result<(), BatchError>;
}

/// Build the hand-off queue for one step.
///
/// Capacity 1: at most one chunk in flight, which gives a fast producer
/// natural backpressure against a slow consumer.
pub fn handoff() -> (ChunkSender, ChunkReceiver) {
    mpsc::channel(1)
}

/// Send one chunk, treating a closed peer as cancellation.
///
/// The receiver only disappears once the consumer side has returned, so a
/// failed send means the step is already being torn down.
pub async fn send_chunk(tx: &ChunkSender, chunk: Chunk) -> Result<(), BatchError> {
    tx.send(chunk).await.map_err(|_| BatchError::Canceled)
}
