//! In-memory reference adapters: a chunking row source and a collecting sink.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::binding::BindPosition;
use crate::chunk::{Chunk, Row};
use crate::error::BatchError;
use crate::stream::{send_chunk, ChunkReceiver, ChunkSender, Consumer, Producer};

/// Producer over a prepared row set.
///
/// Reference implementation of the chunk-boundary policy: with a chunk size
/// above zero, each full chunk is emitted as it fills and the trailing
/// partial chunk only when non-empty - a row count that is an exact multiple
/// of the chunk size produces no trailing empty chunk. With a chunk size of
/// zero, all rows go out as a single chunk.
pub struct MemorySource {
    rows: Vec<Row>,
    chunk_size: usize,
}

impl MemorySource {
    pub fn new(rows: Vec<Row>, chunk_size: usize) -> Self {
        Self { rows, chunk_size }
    }
}

#[async_trait]
impl Producer for MemorySource {
    async fn read(&self, cancel: CancellationToken, tx: ChunkSender) -> Result<(), BatchError> {
        if self.chunk_size == 0 {
            return send_chunk(&tx, Chunk::Rows(self.rows.clone())).await;
        }

        for batch in self.rows.chunks(self.chunk_size) {
            if cancel.is_cancelled() {
                return Err(BatchError::Canceled);
            }
            send_chunk(&tx, Chunk::Rows(batch.to_vec())).await?;
        }
        Ok(())
    }
}

/// Consumer collecting flattened records into a shared table.
///
/// With the transactional toggle on, records are staged locally and only
/// committed to the table once the stream has terminated cleanly; a failure
/// mid-stream rolls the staged records back. The rollback is recorded as a
/// side effect and never replaces the original error.
pub struct MemorySink {
    binding: BindPosition,
    transactional: bool,
    table: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MemorySink {
    pub fn new(binding: BindPosition) -> Self {
        Self {
            binding,
            transactional: false,
            table: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn transactional(mut self) -> Self {
        self.transactional = true;
        self
    }

    /// Handle to the committed records.
    pub fn table(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        self.table.clone()
    }
}

#[async_trait]
impl Consumer for MemorySink {
    async fn write(&self, _cancel: CancellationToken, mut rx: ChunkReceiver) -> Result<(), BatchError> {
        if self.transactional {
            let mut staged: Vec<Vec<String>> = Vec::new();
            while let Some(chunk) = rx.recv().await {
                match self.binding.flatten_chunk(&chunk) {
                    Ok(records) => staged.extend(records),
                    Err(err) => {
                        warn!(discarded = staged.len(), "rolling back staged records");
                        return Err(err);
                    }
                }
            }
            self.table.lock().await.extend(staged);
            Ok(())
        } else {
            while let Some(chunk) = rx.recv().await {
                // Flatten before touching the table so a rejected chunk
                // writes nothing.
                let records = self.binding.flatten_chunk(&chunk)?;
                self.table.lock().await.extend(records);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::handoff;

    fn row(id: usize) -> Row {
        Row::from([("id".to_string(), id.to_string())])
    }

    async fn collect_chunk_sizes(source: MemorySource) -> Vec<usize> {
        let (tx, mut rx) = handoff();
        let token = CancellationToken::new();
        let producer = tokio::spawn(async move { source.read(token, tx).await });

        let mut sizes = Vec::new();
        while let Some(chunk) = rx.recv().await {
            match chunk {
                Chunk::Rows(rows) => sizes.push(rows.len()),
                other => panic!("unexpected chunk shape: {}", other.shape()),
            }
        }
        producer.await.unwrap().unwrap();
        sizes
    }

    #[tokio::test]
    async fn chunk_size_zero_emits_one_chunk() {
        let source = MemorySource::new((0..5).map(row).collect(), 0);
        assert_eq!(collect_chunk_sizes(source).await, vec![5]);
    }

    #[tokio::test]
    async fn non_multiple_row_count_emits_trailing_partial_chunk() {
        let source = MemorySource::new((0..7).map(row).collect(), 3);
        assert_eq!(collect_chunk_sizes(source).await, vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn exact_multiple_row_count_suppresses_empty_trailing_chunk() {
        let source = MemorySource::new((0..6).map(row).collect(), 3);
        assert_eq!(collect_chunk_sizes(source).await, vec![3, 3]);
    }

    #[tokio::test]
    async fn sink_collects_flattened_records() {
        let binding = BindPosition::new().bind("id", 0);
        let sink = MemorySink::new(binding);
        let table = sink.table();

        let (tx, rx) = handoff();
        let writer = tokio::spawn(async move { sink.write(CancellationToken::new(), rx).await });
        send_chunk(&tx, Chunk::Rows(vec![row(1), row(2)])).await.unwrap();
        drop(tx);
        writer.await.unwrap().unwrap();

        let committed = table.lock().await;
        assert_eq!(*committed, vec![vec!["1".to_string()], vec!["2".to_string()]]);
    }

    #[tokio::test]
    async fn transactional_sink_rolls_back_on_unsupported_shape() {
        let binding = BindPosition::new().bind("id", 0);
        let sink = MemorySink::new(binding).transactional();
        let table = sink.table();

        let (tx, rx) = handoff();
        let writer = tokio::spawn(async move { sink.write(CancellationToken::new(), rx).await });
        send_chunk(&tx, Chunk::Rows(vec![row(1)])).await.unwrap();
        send_chunk(&tx, Chunk::Text("boom".to_string())).await.unwrap();
        drop(tx);

        let err = writer.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Not supported such a chunk type: text");
        assert!(table.lock().await.is_empty());
    }

    #[tokio::test]
    async fn non_transactional_sink_keeps_earlier_chunks() {
        let binding = BindPosition::new().bind("id", 0);
        let sink = MemorySink::new(binding);
        let table = sink.table();

        let (tx, rx) = handoff();
        let writer = tokio::spawn(async move { sink.write(CancellationToken::new(), rx).await });
        send_chunk(&tx, Chunk::Rows(vec![row(1)])).await.unwrap();
        send_chunk(&tx, Chunk::Text("boom".to_string())).await.unwrap();
        drop(tx);

        assert!(writer.await.unwrap().is_err());
        // The rejected chunk itself wrote nothing; the first chunk stays.
        assert_eq!(table.lock().await.len(), 1);
    }
}
