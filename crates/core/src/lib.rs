//! # Merlin Core
//!
//! Domain types, traits, and error definitions for the Merlin assistant
//! pipeline. This crate has **zero framework dependencies**: it defines the
//! domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM, vector store, chat platform, user
//! directory, checkpoint store, structured-data service, exception sink) is a trait here.
//! Implementations live in their respective crates and are passed into
//! components explicitly, so tests swap in scripted doubles.

pub mod channel;
pub mod checkpoint;
pub mod error;
pub mod event;
pub mod exception;
pub mod memory;
pub mod message;
pub mod provider;
pub mod structured;
pub mod tool;
pub mod user;

// Re-export key types at crate root for ergonomics
pub use channel::{ChatPlatform, LinkButton, OutboundMessage, Photo};
pub use checkpoint::CheckpointStore;
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use exception::{ExceptionSink, TracingExceptionSink};
pub use memory::{Memory, RecordMetadata, VectorMatch, VectorQuery, VectorRecord, VectorStore};
pub use message::{ChatMessage, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use structured::{
    DataType, ExternalProfile, Measurement, NewMeasurement, NewParameter, Parameter,
    StructuredDataService,
};
pub use tool::{ToolCall, ToolKind, ToolResult};
pub use user::{User, UserDirectory};
