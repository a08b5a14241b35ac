//! Batchline - a batch-job execution framework.
//!
//! A caller registers named jobs with a [`BatchApp`]; each job is an ordered
//! sequence of flows, each flow a set of steps run concurrently as one unit,
//! and each step streams chunks from one [`Producer`] into one [`Consumer`]
//! through a bounded hand-off queue with cooperative cancellation.

pub mod app;
pub mod binding;
pub mod chunk;
pub mod delimited;
pub mod error;
pub mod job;
pub mod memory;
pub mod step;
pub mod stream;

pub use app::{init_tracing, BatchApp, JobExecutor};
pub use binding::BindPosition;
pub use chunk::{Chunk, Row, TaggedRows};
pub use delimited::{
    DelimitedReader, DelimitedReaderConfig, DelimitedWriter, DelimitedWriterConfig, RowMapper,
};
pub use error::BatchError;
pub use job::{Flow, Job, JobBuilder};
pub use memory::{MemorySink, MemorySource};
pub use step::{Step, StepBuilder};
pub use stream::{handoff, send_chunk, ChunkReceiver, ChunkSender, Consumer, Producer};
