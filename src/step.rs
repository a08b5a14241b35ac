//! Step assembly and the two-party cooperative-cancellation join.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::BatchError;
use crate::stream::{handoff, Consumer, Producer};

/// Builder binding exactly one producer and one consumer into a [`Step`].
#[derive(Default)]
pub struct StepBuilder {
    name: Option<String>,
    reader: Option<Box<dyn Producer>>,
    writer: Option<Box<dyn Consumer>>,
}

impl StepBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Optional step name for logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn reader(mut self, reader: impl Producer + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    pub fn writer(mut self, writer: impl Consumer + 'static) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    /// Validate the binding. An incomplete step is a configuration error,
    /// reported before any task starts; there are no partial joins.
    pub fn build(self) -> Result<Step, BatchError> {
        let reader = self.reader.ok_or(BatchError::ReaderUnset)?;
        let writer = self.writer.ok_or(BatchError::WriterUnset)?;
        Ok(Step {
            name: self.name.unwrap_or_else(|| "step".to_string()),
            reader,
            writer,
        })
    }
}

/// One producer bound to one consumer through a hand-off queue.
///
/// Running a step consumes it, so a built step can never be shared between
/// two flow executions.
pub struct Step {
    name: String,
    reader: Box<dyn Producer>,
    writer: Box<dyn Consumer>,
}

impl Step {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the join: producer and consumer run as sibling tasks.
    ///
    /// Both sides run under a shared child token of `cancel`. The first error
    /// observed by either side cancels the token, which promptly unblocks the
    /// other side's watcher. The join still waits for both watchers before
    /// returning the first recorded error.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), BatchError> {
        let token = cancel.child_token();
        let (tx, rx) = handoff();
        let first_error: Arc<Mutex<Option<BatchError>>> = Arc::new(Mutex::new(None));

        debug!(step = %self.name, "executing step");

        let reader = self.reader;
        let reader_handle = {
            let token = token.clone();
            tokio::spawn(async move { reader.read(token, tx).await })
        };
        let writer = self.writer;
        let writer_handle = {
            let token = token.clone();
            tokio::spawn(async move { writer.write(token, rx).await })
        };

        tokio::join!(
            watch_side("reader", token.clone(), reader_handle, first_error.clone()),
            watch_side("writer", token.clone(), writer_handle, first_error.clone()),
        );

        let err = first_error.lock().await.take();
        match err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Race one side's nested task against the shared cancellation token.
///
/// If the token fires first, the watcher records `Canceled` at once and the
/// nested call keeps running detached, its eventual result discarded. The
/// framework does not guarantee the detached call stops; any resource it
/// holds is the collaborator's responsibility to release.
async fn watch_side(
    role: &'static str,
    token: CancellationToken,
    inner: JoinHandle<Result<(), BatchError>>,
    first_error: Arc<Mutex<Option<BatchError>>>,
) {
    let outcome = tokio::select! {
        () = token.cancelled() => Err(BatchError::Canceled),
        joined = inner => match joined {
            Ok(result) => result,
            Err(join_err) => Err(BatchError::Other(anyhow::anyhow!(
                "{role} task panicked: {join_err}"
            ))),
        },
    };

    if let Err(err) = outcome {
        if err.is_cancellation() {
            debug!(role, "side unblocked by peer failure");
        } else {
            error!(role, %err, "step side failed");
        }
        let mut slot = first_error.lock().await;
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        token.cancel();
    }
}
