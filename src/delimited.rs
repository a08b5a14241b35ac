//! Delimited-file reference adapters.
//!
//! Plain delimiter-separated text, no quoting. Row keys come from the header
//! line when one is present, otherwise from the zero-based column index.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::binding::BindPosition;
use crate::chunk::{Chunk, Row};
use crate::error::BatchError;
use crate::stream::{send_chunk, ChunkReceiver, ChunkSender, Consumer, Producer};

fn default_delimiter() -> char {
    ','
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelimitedReaderConfig {
    pub path: PathBuf,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Treat the first line as a header naming the columns.
    #[serde(default)]
    pub has_header: bool,

    /// Rows per chunk; 0 sends the whole file as one chunk.
    #[serde(default)]
    pub chunk_size: usize,
}

/// Hook transforming an accumulated row batch into the chunk that goes out.
pub type RowMapper = Box<dyn Fn(Vec<Row>) -> Chunk + Send + Sync>;

/// Producer reading delimited rows from a file.
pub struct DelimitedReader {
    config: DelimitedReaderConfig,
    mapper: Option<RowMapper>,
}

impl DelimitedReader {
    pub fn new(config: DelimitedReaderConfig) -> Self {
        Self {
            config,
            mapper: None,
        }
    }

    /// Apply `mapper` to every batch before it is sent, replacing the
    /// default `Chunk::Rows` shape.
    pub fn with_mapper(mut self, mapper: impl Fn(Vec<Row>) -> Chunk + Send + Sync + 'static) -> Self {
        self.mapper = Some(Box::new(mapper));
        self
    }

    fn shape(&self, rows: Vec<Row>) -> Chunk {
        match &self.mapper {
            Some(mapper) => mapper(rows),
            None => Chunk::Rows(rows),
        }
    }
}

#[async_trait]
impl Producer for DelimitedReader {
    async fn read(&self, cancel: CancellationToken, tx: ChunkSender) -> Result<(), BatchError> {
        debug!(path = %self.config.path.display(), "reading delimited file");
        let file = File::open(&self.config.path).await?;
        let mut lines = BufReader::new(file).lines();

        let mut header: Option<Vec<String>> = None;
        if self.config.has_header {
            match lines.next_line().await? {
                Some(line) => header = Some(split_line(&line, self.config.delimiter)),
                None => return Ok(()),
            }
        }

        let mut chunk: Vec<Row> = Vec::new();
        while let Some(line) = lines.next_line().await? {
            chunk.push(keyed_row(
                header.as_deref(),
                split_line(&line, self.config.delimiter),
            ));
            if self.config.chunk_size > 0 && chunk.len() == self.config.chunk_size {
                if cancel.is_cancelled() {
                    return Err(BatchError::Canceled);
                }
                send_chunk(&tx, self.shape(std::mem::take(&mut chunk))).await?;
            }
        }

        // A row count that is an exact multiple of the chunk size produces no
        // trailing empty chunk; with chunk size 0 exactly one chunk goes out.
        if self.config.chunk_size == 0 || !chunk.is_empty() {
            send_chunk(&tx, self.shape(chunk)).await?;
        }
        Ok(())
    }
}

fn split_line(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(str::to_string).collect()
}

fn keyed_row(header: Option<&[String]>, values: Vec<String>) -> Row {
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            let key = header
                .and_then(|names| names.get(idx).cloned())
                .unwrap_or_else(|| idx.to_string());
            (key, value)
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelimitedWriterConfig {
    pub path: PathBuf,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Suppress the leading header line.
    #[serde(default)]
    pub no_header: bool,

    /// Column-position binding controlling header and per-row order.
    pub binding: BindPosition,
}

/// Consumer writing flattened rows to a delimited file.
pub struct DelimitedWriter {
    config: DelimitedWriterConfig,
}

impl DelimitedWriter {
    pub fn new(config: DelimitedWriterConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Consumer for DelimitedWriter {
    async fn write(&self, _cancel: CancellationToken, mut rx: ChunkReceiver) -> Result<(), BatchError> {
        debug!(path = %self.config.path.display(), "writing delimited file");
        let file = File::create(&self.config.path).await?;
        let mut out = BufWriter::new(file);
        let delimiter = self.config.delimiter.to_string();

        if !self.config.no_header {
            out.write_all(self.config.binding.header().join(&delimiter).as_bytes())
                .await?;
            out.write_all(b"\n").await?;
        }

        while let Some(chunk) = rx.recv().await {
            for record in self.config.binding.flatten_chunk(&chunk)? {
                out.write_all(record.join(&delimiter).as_bytes()).await?;
                out.write_all(b"\n").await?;
            }
        }

        out.flush().await?;
        Ok(())
    }
}
