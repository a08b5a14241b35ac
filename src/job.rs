//! Flow and job composition: ordered flows of concurrently-run steps.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::BatchError;
use crate::step::Step;

/// A set of steps executed concurrently as one unit.
///
/// All steps in a flow share one cancellation token; the first step failure
/// cancels it, and every step's own join returns promptly once it fires. The
/// flow still waits for every launched step before reporting.
pub struct Flow {
    steps: Vec<Step>,
}

impl Flow {
    pub fn single(step: Step) -> Self {
        Self { steps: vec![step] }
    }

    pub fn concurrent(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    async fn run(self) -> Result<(), BatchError> {
        if self.steps.len() == 1 {
            info!("start single step");
        } else {
            info!(steps = self.steps.len(), "start steps in parallel");
        }

        let token = CancellationToken::new();
        let first_error: Arc<Mutex<Option<BatchError>>> = Arc::new(Mutex::new(None));
        let mut set = JoinSet::new();

        for step in self.steps {
            let token = token.clone();
            let first_error = first_error.clone();
            set.spawn(async move {
                info!(step = step.name(), "execute step");
                if let Err(err) = step.run(token.clone()).await {
                    record_first(&first_error, err).await;
                    token.cancel();
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(join_err) = joined {
                let err = BatchError::Other(anyhow::anyhow!("step task panicked: {join_err}"));
                record_first(&first_error, err).await;
                token.cancel();
            }
        }

        let err = first_error.lock().await.take();
        match err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

async fn record_first(slot: &Mutex<Option<BatchError>>, err: BatchError) {
    let mut guard = slot.lock().await;
    if guard.is_none() {
        *guard = Some(err);
    }
}

/// A named ordered sequence of flows.
///
/// Flows run strictly sequentially: flow `i + 1` never starts before flow `i`
/// has fully returned, and the job aborts on the first flow failure without
/// starting the rest.
pub struct Job {
    name: String,
    flows: Vec<Flow>,
}

impl Job {
    pub fn builder(name: impl Into<String>) -> JobBuilder {
        JobBuilder {
            name: name.into(),
            flows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute every flow in declared order. Running a job consumes it; the
    /// framework executes a job definition exactly once per dispatch.
    pub async fn run(self) -> Result<(), BatchError> {
        for (index, flow) in self.flows.into_iter().enumerate() {
            if let Err(err) = flow.run().await {
                error!(job = %self.name, flow = index, %err, "flow failed, aborting job");
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Builder collecting flows for a [`Job`].
pub struct JobBuilder {
    name: String,
    flows: Vec<Flow>,
}

impl JobBuilder {
    /// Append a flow of exactly one step.
    pub fn single(mut self, step: Step) -> Self {
        self.flows.push(Flow::single(step));
        self
    }

    /// Append a flow whose steps all run concurrently.
    pub fn concurrent(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.flows.push(Flow::concurrent(steps.into_iter().collect()));
        self
    }

    pub fn build(self) -> Job {
        Job {
            name: self.name,
            flows: self.flows,
        }
    }
}
