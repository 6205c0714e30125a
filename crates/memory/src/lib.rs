//! Long-term memory and conversation state for Merlin.
//!
//! - [`MemoryService`]: embed, store and answer from a user's saved facts
//! - vector stores: [`InMemoryVectorStore`], [`PineconeStore`]
//! - checkpoint stores: [`InMemoryCheckpointStore`], [`SqliteCheckpointStore`]

pub mod in_memory;
pub mod pinecone;
pub mod service;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::{InMemoryCheckpointStore, InMemoryVectorStore};
pub use pinecone::PineconeStore;
pub use service::MemoryService;
pub use vector::cosine_similarity;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCheckpointStore;
