//! The agent loop.
//!
//! A turn runs as a sequence of completion steps:
//!
//! 1. **Build context**: guidance, then the thread's checkpoint, then the new messages
//! 2. **Send to the model** with the tool catalog
//! 3. **If tool calls**: execute them through the registry, append results, go to 2
//! 4. **If text**: enforce the "Tools Used:" trailer, persist the turn, return
//!
//! [`ErrorRecoveryPath`] wraps a turn so a failure becomes either a
//! model-written explanation or a fixed apology.

pub mod error;
pub mod guidance;
pub mod orchestrator;
pub mod recovery;

#[cfg(test)]
mod test_helpers;

pub use error::AgentError;
pub use orchestrator::{AgentOrchestrator, TurnContext};
pub use recovery::{ErrorRecoveryPath, STATIC_APOLOGY, TurnOutcome};
