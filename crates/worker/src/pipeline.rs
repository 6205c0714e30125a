//! JobPipeline: one job from payload to delivered reply.
//!
//! decode → resolve user → run the turn (with recovery) → dispatch.
//! Anything that still fails after recovery is reported to the
//! [`ExceptionSink`] and returned so the queue can apply its redelivery
//! policy.

use crate::identity::IdentityResolver;
use crate::job::{Job, JobDecoder};
use chrono::Utc;
use merlin_agent::{ErrorRecoveryPath, TurnContext};
use merlin_channels::ReplyDispatcher;
use merlin_core::error::{ChannelError, ValidationError};
use merlin_core::event::{DomainEvent, EventBus};
use merlin_core::exception::ExceptionSink;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const REGISTER_PROMPT: &str = "Please register first using /register command";

/// Why a job did not complete.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Poison payload; redelivery cannot help.
    #[error("Invalid job: {0}")]
    Validation(#[from] ValidationError),

    #[error("Reply delivery failed: {0}")]
    Dispatch(#[from] ChannelError),
}

impl PipelineError {
    /// Whether redelivering the same payload could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Dispatch(_))
    }
}

/// What happened to a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The user got an answer, an explanation, or the apology.
    Replied { messages: usize, recovered: bool },
    /// The user is unknown and was asked to register.
    Unregistered,
}

pub struct JobPipeline {
    resolver: IdentityResolver,
    recovery: ErrorRecoveryPath,
    dispatcher: ReplyDispatcher,
    sink: Arc<dyn ExceptionSink>,
}

impl JobPipeline {
    pub fn new(
        resolver: IdentityResolver,
        recovery: ErrorRecoveryPath,
        dispatcher: ReplyDispatcher,
        sink: Arc<dyn ExceptionSink>,
    ) -> Self {
        Self {
            resolver,
            recovery,
            dispatcher,
            sink,
        }
    }

    fn events(&self) -> &Arc<EventBus> {
        self.recovery.agent().event_bus()
    }

    /// Decode a raw queue payload and process it.
    pub async fn process_payload(&self, payload: &[u8]) -> Result<JobOutcome, PipelineError> {
        let job = JobDecoder::decode(payload).inspect_err(|e| {
            warn!(error = %e, "Dropping invalid job payload");
        })?;
        self.process(job).await
    }

    pub async fn process(&self, job: Job) -> Result<JobOutcome, PipelineError> {
        info!(chat_id = %job.chat_id, thread_id = %job.thread_id, "Job accepted");
        self.events().publish(DomainEvent::JobAccepted {
            chat_id: job.chat_id.clone(),
            thread_id: job.thread_id.clone(),
            timestamp: Utc::now(),
        });

        let Some(user) = self.resolver.resolve(&job.user).await else {
            info!(chat_id = %job.chat_id, user_id = %job.user.id, "Unregistered user");
            self.deliver(&job, REGISTER_PROMPT).await?;
            return Ok(JobOutcome::Unregistered);
        };

        let turn = TurnContext::new(user).with_thread(job.thread_id.clone());
        let outcome = self.recovery.run(&job.message, &turn).await;

        let messages = self.deliver(&job, outcome.text()).await?;
        Ok(JobOutcome::Replied {
            messages,
            recovered: outcome.is_recovered(),
        })
    }

    async fn deliver(&self, job: &Job, text: &str) -> Result<usize, PipelineError> {
        match self.dispatcher.send_text(&job.chat_id, text).await {
            Ok(count) => {
                self.events().publish(DomainEvent::RepliesDispatched {
                    chat_id: job.chat_id.clone(),
                    count,
                    timestamp: Utc::now(),
                });
                Ok(count)
            }
            Err(e) => {
                self.sink.capture_exception(
                    &e,
                    &format!("Failed to deliver reply to chat {}", job.chat_id),
                );
                Err(e.into())
            }
        }
    }
}
