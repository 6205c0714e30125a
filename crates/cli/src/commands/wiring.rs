//! Builds the job pipeline from [`AppConfig`]. Every collaborator is
//! constructed here and passed down explicitly.

use merlin_agent::{AgentOrchestrator, ErrorRecoveryPath};
use merlin_channels::{ReplyDispatcher, TelegramPlatform};
use merlin_config::{AppConfig, CheckpointBackend, VectorBackend};
use merlin_core::checkpoint::CheckpointStore;
use merlin_core::exception::TracingExceptionSink;
use merlin_core::memory::VectorStore;
use merlin_core::provider::Provider;
use merlin_memory::{
    InMemoryCheckpointStore, InMemoryVectorStore, MemoryService, PineconeStore,
    SqliteCheckpointStore,
};
use merlin_providers::{CorrelateClient, OpenAiCompatProvider};
use merlin_tools::{TextCleaner, ToolRegistry};
use merlin_worker::{IdentityResolver, InMemoryUserDirectory, JobPipeline};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

async fn checkpoint_store(config: &AppConfig) -> CliResult<Arc<dyn CheckpointStore>> {
    let store: Arc<dyn CheckpointStore> = match config.checkpoint.backend {
        CheckpointBackend::Memory => Arc::new(InMemoryCheckpointStore::new()),
        CheckpointBackend::Sqlite => {
            if let Some(parent) = Path::new(&config.checkpoint.path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(SqliteCheckpointStore::new(&config.checkpoint.path).await?)
        }
    };
    Ok(store)
}

fn vector_store(config: &AppConfig) -> CliResult<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.vector_store.backend {
        VectorBackend::Memory => Arc::new(InMemoryVectorStore::new()),
        VectorBackend::Pinecone => Arc::new(PineconeStore::from_config(&config.vector_store)?),
    };
    Ok(store)
}

pub async fn build_pipeline(config: &AppConfig) -> CliResult<JobPipeline> {
    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_config(&config.openai)?);

    let memory = Arc::new(
        MemoryService::new(provider.clone(), vector_store(config)?)
            .with_namespace(config.vector_store.namespace.clone())
            .with_models(config.openai.model.clone(), config.openai.embedding_model.clone()),
    );

    let mut tools = ToolRegistry::new(memory).with_default_k(config.agent.retrieval_k);
    if config.agent.clean_tool_text {
        tools = tools.with_text_cleaner(TextCleaner::new(provider.clone(), config.openai.model.clone()));
    }
    match CorrelateClient::from_config(&config.structured_data)? {
        Some(client) => tools = tools.with_structured_data(Arc::new(client)),
        None => info!("Structured data service not configured, parameter tools disabled"),
    }

    let agent = AgentOrchestrator::new(
        provider,
        Arc::new(tools),
        checkpoint_store(config).await?,
        config.openai.model.clone(),
    )
    .with_temperature(config.openai.temperature)
    .with_max_steps(config.agent.max_steps)
    .with_default_thread(config.agent.default_thread_id.clone());

    let sink = Arc::new(TracingExceptionSink);
    let platform = Arc::new(TelegramPlatform::from_config(&config.telegram)?);
    let directory = Arc::new(InMemoryUserDirectory::from_config(&config.users));

    info!(
        model = %config.openai.model,
        users = config.users.len(),
        "Pipeline ready"
    );

    Ok(JobPipeline::new(
        IdentityResolver::new(directory),
        ErrorRecoveryPath::new(Arc::new(agent), sink.clone()),
        ReplyDispatcher::from_config(platform, &config.dispatch),
        sink,
    ))
}
