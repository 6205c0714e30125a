//! The agent's tool catalog.
//!
//! Tools give the agent access to a user's long-term memory and to the
//! external parameter/measurement service. The catalog is the closed set in
//! [`ToolKind`](merlin_core::ToolKind); [`ToolRegistry`] decodes each call
//! into typed arguments and dispatches it, turning every failure into text
//! for the model.

pub mod catalog;
mod executors;
pub mod invocation;
pub mod registry;
pub mod text_cleaner;

#[cfg(test)]
mod test_support;

pub use invocation::ToolInvocation;
pub use registry::{ToolContext, ToolRegistry};
pub use text_cleaner::TextCleaner;
