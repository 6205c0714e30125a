//! `merlin process`: run one job payload through the pipeline.

use super::wiring::{CliResult, build_pipeline, load_config};
use merlin_worker::JobOutcome;
use std::path::Path;
use tokio::io::AsyncReadExt;

pub async fn run(config_path: Option<&Path>, payload: Option<String>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let pipeline = build_pipeline(&config).await?;

    let payload = match payload {
        Some(p) => p,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    match pipeline.process_payload(payload.trim().as_bytes()).await? {
        JobOutcome::Replied { messages, recovered } => {
            println!("Delivered {messages} message(s){}", if recovered { " (recovered)" } else { "" });
        }
        JobOutcome::Unregistered => println!("User not registered, register prompt sent"),
    }
    Ok(())
}
