//! The tool catalog the orchestrator offers to the model.
//!
//! `execute` never fails: unknown tools, bad arguments and executor errors
//! all come back as a [`ToolResult`] with `success = false` and a message
//! the model can read.

use crate::catalog;
use crate::executors;
use crate::invocation::ToolInvocation;
use crate::text_cleaner::TextCleaner;
use merlin_core::error::ToolError;
use merlin_core::provider::ToolDefinition;
use merlin_core::structured::StructuredDataService;
use merlin_core::tool::{ToolCall, ToolKind, ToolResult};
use merlin_memory::MemoryService;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Who a tool call acts for. Filled in by the pipeline, never by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    /// Internal user id. Scopes memories, and is the id the structured-data
    /// service knows the user by.
    pub user_id: String,
}

pub struct ToolRegistry {
    memory: Arc<MemoryService>,
    structured: Option<Arc<dyn StructuredDataService>>,
    cleaner: Option<TextCleaner>,
    default_k: usize,
}

impl ToolRegistry {
    pub fn new(memory: Arc<MemoryService>) -> Self {
        Self {
            memory,
            structured: None,
            cleaner: None,
            default_k: 5,
        }
    }

    /// Enable the parameter/measurement tools.
    pub fn with_structured_data(mut self, service: Arc<dyn StructuredDataService>) -> Self {
        self.structured = Some(service);
        self
    }

    /// Clean memory text and search queries before they reach the store.
    pub fn with_text_cleaner(mut self, cleaner: TextCleaner) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k.max(1);
        self
    }

    /// Tools currently offered. Structured-data tools need a configured service.
    pub fn kinds(&self) -> Vec<ToolKind> {
        ToolKind::ALL
            .into_iter()
            .filter(|kind| self.is_available(*kind))
            .collect()
    }

    fn is_available(&self, kind: ToolKind) -> bool {
        match kind {
            ToolKind::SaveMemory | ToolKind::RetrieveMemories => true,
            _ => self.structured.is_some(),
        }
    }

    /// Get tool definitions for sending to the LLM.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.kinds().into_iter().map(catalog::definition).collect()
    }

    /// Run one tool call for `ctx`.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let Some(kind) = ToolKind::from_name(&call.name) else {
            warn!(tool = %call.name, "Model called an unknown tool");
            return ToolResult {
                call_id: call.id.clone(),
                kind: None,
                success: false,
                output: format!("Error: {}", ToolError::NotFound(call.name.clone())),
            };
        };

        let start = Instant::now();
        debug!(tool = %kind, call_id = %call.id, "Executing tool");

        let outcome = match ToolInvocation::parse(kind, call.arguments.clone()) {
            Ok(invocation) => self.run(invocation, ctx).await,
            Err(e) => Err(e),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                info!(tool = %kind, duration_ms, "Tool succeeded");
                ToolResult {
                    call_id: call.id.clone(),
                    kind: Some(kind),
                    success: true,
                    output,
                }
            }
            Err(e) => {
                warn!(tool = %kind, duration_ms, error = %e, "Tool failed");
                ToolResult {
                    call_id: call.id.clone(),
                    kind: Some(kind),
                    success: false,
                    output: failure_text(kind, &e),
                }
            }
        }
    }

    fn structured(&self, kind: ToolKind) -> Result<&dyn StructuredDataService, ToolError> {
        self.structured.as_deref().ok_or_else(|| {
            ToolError::Unavailable(format!("{kind}: structured data service is not configured"))
        })
    }

    async fn run(&self, invocation: ToolInvocation, ctx: &ToolContext) -> Result<String, ToolError> {
        let cleaner = self.cleaner.as_ref();
        let kind = invocation.kind();
        match invocation {
            ToolInvocation::SaveMemory(args) => {
                executors::save_memory(&self.memory, cleaner, ctx, args).await
            }
            ToolInvocation::RetrieveMemories(args) => {
                executors::retrieve_memories(&self.memory, cleaner, ctx, args, self.default_k).await
            }
            ToolInvocation::GetExternalProfile => {
                executors::get_external_profile(self.structured(kind)?, ctx).await
            }
            ToolInvocation::CreateParameter(args) => {
                executors::create_parameter(self.structured(kind)?, ctx, args).await
            }
            ToolInvocation::ListParameters => {
                executors::list_parameters(self.structured(kind)?, ctx).await
            }
            ToolInvocation::CreateMeasurement(args) => {
                executors::create_measurement(self.structured(kind)?, ctx, args).await
            }
            ToolInvocation::ListMeasurements(args) => {
                executors::list_measurements(self.structured(kind)?, ctx, args).await
            }
        }
    }
}

/// The text the model sees when a tool fails.
fn failure_text(kind: ToolKind, error: &ToolError) -> String {
    let prefix = match kind {
        ToolKind::SaveMemory => "Error saving memory",
        ToolKind::RetrieveMemories => "Error retrieving memories",
        ToolKind::GetExternalProfile => "Error retrieving user",
        ToolKind::CreateParameter => "Error creating parameter",
        ToolKind::ListParameters => "Error listing your parameters",
        ToolKind::CreateMeasurement => "Error creating measurement",
        ToolKind::ListMeasurements => "Error listing measurements",
    };
    let reason = match error {
        ToolError::ExecutionFailed { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    format!("{prefix}: {reason}")
}
