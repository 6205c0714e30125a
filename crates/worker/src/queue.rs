//! Queue consumer: bounded-concurrency loop over an ingress channel.

use crate::pipeline::{JobOutcome, JobPipeline, PipelineError};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Counts from one run of the worker loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    /// Jobs that ended with a reply (including the register prompt)
    pub processed: usize,
    /// Invalid payloads, not retried
    pub dropped: usize,
    /// Jobs the queue should redeliver
    pub failed: usize,
}

impl WorkerStats {
    fn record(&mut self, result: Result<Result<JobOutcome, PipelineError>, JoinError>) {
        match result {
            Ok(Ok(outcome)) => {
                debug!(?outcome, "Job done");
                self.processed += 1;
            }
            Ok(Err(e)) if !e.is_retryable() => self.dropped += 1,
            Ok(Err(e)) => {
                warn!(error = %e, "Job failed");
                self.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "Job task panicked");
                self.failed += 1;
            }
        }
    }
}

pub struct QueueWorker {
    pipeline: Arc<JobPipeline>,
    concurrency: usize,
}

impl QueueWorker {
    pub fn new(pipeline: Arc<JobPipeline>, concurrency: usize) -> Self {
        Self {
            pipeline,
            concurrency: concurrency.max(1),
        }
    }

    /// Consume payloads until the sender side closes, then wait for
    /// in-flight jobs.
    pub async fn run(&self, mut ingress: mpsc::Receiver<Vec<u8>>) -> WorkerStats {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut stats = WorkerStats::default();

        info!(concurrency = self.concurrency, "Worker started");

        while let Some(payload) = ingress.recv().await {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let pipeline = self.pipeline.clone();
            tasks.spawn(async move {
                let _permit = permit;
                pipeline.process_payload(&payload).await
            });

            while let Some(done) = tasks.try_join_next() {
                stats.record(done);
            }
        }

        while let Some(done) = tasks.join_next().await {
            stats.record(done);
        }

        info!(
            processed = stats.processed,
            dropped = stats.dropped,
            failed = stats.failed,
            "Worker stopped"
        );
        stats
    }
}
