//! Job registry and dispatch.

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::BatchError;

/// A registered, named batch job.
///
/// Implementations build their flows and steps fresh inside `run`, so a
/// registered job can be dispatched more than once. The framework itself
/// never retries a failed run.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Unique job name used for dispatch.
    fn name(&self) -> &str;

    /// Build and execute the job.
    async fn run(&self) -> Result<(), BatchError>;
}

/// Top-level framework instance: the collection of registered jobs.
#[derive(Default)]
pub struct BatchApp {
    jobs: Vec<Box<dyn JobExecutor>>,
}

impl BatchApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job executor.
    pub fn register(mut self, job: impl JobExecutor + 'static) -> Self {
        self.jobs.push(Box::new(job));
        self
    }

    /// Dispatch a job by name and run it to completion.
    pub async fn run(&self, job_name: &str) -> Result<(), BatchError> {
        for job in &self.jobs {
            if job.name() == job_name {
                info!(job = job_name, "target job");
                let result = job.run().await;
                match &result {
                    Ok(()) => info!(job = job_name, "job completed"),
                    Err(err) => error!(job = job_name, %err, "job failed"),
                }
                return result;
            }
        }

        let err = BatchError::JobNotFound(job_name.to_string());
        error!(%err, "dispatch failed");
        Err(err)
    }
}

/// Install the process-wide tracing subscriber.
///
/// The subscriber is owned by the top-level runtime and installed once at
/// startup; components only ever use the `tracing` macros. Respects
/// `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}
