//! Semantic memory storage and retrieval for Continuum.

pub mod client;
pub mod codec;
pub mod embedding;
pub mod error;
pub mod format;
pub mod model;
pub mod sql;
pub mod store;

/// Namespace-scoped memory client.
pub use client::{MAX_CONTENT_CHARS, MAX_SEARCH_LIMIT, MemoryClient, MemoryClientOptions};
/// Vector wire codec.
pub use codec::VectorCodec;
/// Embedding provider interface and HTTP implementation.
pub use embedding::{EmbeddingProvider, OllamaEmbeddingProvider};
/// Memory error type and diagnostics.
pub use error::{Diagnostic, MemoryError, Service};
/// Observation formatting.
pub use format::{
    FormattedMemory, MemoryContext, MemoryKind, MemoryMetadata, format_memory, format_memory_on,
    summarize,
};
/// Records, results and health reports.
pub use model::{
    HealthReport, HealthStatus, MemoryHit, MemoryRecord, MemoryStats, RecordSummary, SearchMode,
    SearchResults, ServiceStatus, namespace_for,
};
/// Vector store interface and HTTP implementation.
pub use store::{HttpVectorStore, ResultSet, SqlValue, Statement, StatementResult, VectorStore};
