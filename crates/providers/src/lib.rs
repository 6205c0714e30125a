//! External service clients for Merlin.
//!
//! - [`OpenAiCompatProvider`]: chat completion with tools, plus embeddings
//! - [`CorrelateClient`]: the signed parameter/measurement REST service

pub mod openai_compat;
pub mod structured_data;

pub use openai_compat::OpenAiCompatProvider;
pub use structured_data::CorrelateClient;
