//! `merlin config`: print defaults or check the active configuration.

use super::wiring::load_config;
use merlin_config::{AppConfig, CheckpointBackend, VectorBackend};
use std::path::Path;

pub fn show() {
    print!("{}", AppConfig::default_toml());
}

pub fn validate(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;

    let mut warnings = Vec::new();
    if config.openai.api_key.is_none() {
        warnings.push("No OpenAI key set (OPENAI_API_KEY)");
    }
    if config.telegram.bot_token.is_none() {
        warnings.push("No Telegram bot token set (TELEGRAM_BOT_TOKEN)");
    }
    if config.structured_data.api_key.is_none() {
        warnings.push("No structured data key set (CORRELATE_API_KEY); parameter tools disabled");
    }
    if config.users.is_empty() {
        warnings.push("No [[users]] configured; every job will get the register prompt");
    }

    println!("Config OK");
    for w in &warnings {
        println!("  warning: {w}");
    }
    println!();
    println!("  Model:        {}", config.openai.model);
    println!("  Embeddings:   {}", config.openai.embedding_model);
    let vectors = match config.vector_store.backend {
        VectorBackend::Memory => "memory",
        VectorBackend::Pinecone => "pinecone",
    };
    println!("  Vector store: {vectors} (namespace {})", config.vector_store.namespace);
    let checkpoints = match config.checkpoint.backend {
        CheckpointBackend::Memory => "memory".to_string(),
        CheckpointBackend::Sqlite => format!("sqlite at {}", config.checkpoint.path),
    };
    println!("  Checkpoints:  {checkpoints}");
    println!("  Concurrency:  {}", config.worker.concurrency);
    println!("  Users:        {}", config.users.len());
    Ok(())
}
