//! Queue-facing side of Merlin: turn queue payloads into delivered replies.

pub mod directory;
pub mod identity;
pub mod job;
pub mod pipeline;
pub mod queue;

pub use directory::InMemoryUserDirectory;
pub use identity::IdentityResolver;
pub use job::{Job, JobDecoder, UserRef};
pub use pipeline::{JobOutcome, JobPipeline, PipelineError, REGISTER_PROMPT};
pub use queue::{QueueWorker, WorkerStats};
