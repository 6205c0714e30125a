//! `merlin worker`: feed stdin lines to the queue worker.

use super::wiring::{CliResult, build_pipeline, load_config};
use merlin_worker::QueueWorker;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

pub async fn run(config_path: Option<&Path>, concurrency: Option<usize>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let concurrency = concurrency.unwrap_or(config.worker.concurrency);
    let pipeline = Arc::new(build_pipeline(&config).await?);
    let worker = QueueWorker::new(pipeline, concurrency);

    let (tx, rx) = mpsc::channel::<Vec<u8>>(concurrency * 4);
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    if tx.send(line.into_bytes()).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });

    let stats = worker.run(rx).await;
    reader.await?;

    println!(
        "processed={} dropped={} failed={}",
        stats.processed, stats.dropped, stats.failed
    );
    if stats.failed > 0 {
        return Err(format!("{} job(s) failed", stats.failed).into());
    }
    Ok(())
}
