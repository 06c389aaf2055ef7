//! Test helpers shared across Continuum crates.

pub mod embedding;
pub mod store;

pub use embedding::{FailingEmbedder, FixedEmbedder, HashingEmbedder, SlowEmbedder};
pub use store::{FailingVectorStore, InMemoryVectorStore, SlowVectorStore, StoredRow};
