//! Memory record model and result types returned by the client.

use crate::error::MemoryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Derive the isolation namespace for an agent identifier.
pub fn namespace_for(agent_id: &str) -> String {
    format!("agent_{agent_id}")
}

/// Persisted memory record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Record identifier.
    pub id: String,
    /// Namespace the record belongs to.
    pub namespace: String,
    /// Retrieval-optimized text body.
    pub content: String,
    /// Embedding computed from `content` at store time.
    pub embedding: Vec<f32>,
    /// Caller-defined metadata.
    pub metadata: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Equal to `created_at`; records are never updated.
    pub updated_at: DateTime<Utc>,
}

/// Summary returned after a successful store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordSummary {
    /// Generated record identifier (`mem_` + 12 hex chars).
    pub id: String,
    /// Content exactly as stored.
    pub text: String,
    /// Creation timestamp assigned by the client.
    pub created_at: DateTime<Utc>,
}

/// Search strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Nearest neighbours by cosine distance.
    #[default]
    Vector,
    /// Most recent first, no embedding involved.
    Chronological,
    /// Combined strategy; currently served by the vector path.
    Hybrid,
}

impl SearchMode {
    /// Return the mode as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Vector => "vector",
            SearchMode::Chronological => "chronological",
            SearchMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = MemoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "vector" => Ok(SearchMode::Vector),
            "chronological" => Ok(SearchMode::Chronological),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(MemoryError::Validation(format!(
                "mode must be 'vector', 'chronological', or 'hybrid' (got '{other}')"
            ))),
        }
    }
}

/// A single search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryHit {
    /// Record identifier.
    pub id: String,
    /// Stored content of the record.
    pub text: String,
    /// `1 - cosine distance`; 1.0 for chronological results.
    pub similarity: f64,
    /// Creation timestamp of the record.
    pub created_at: DateTime<Utc>,
    /// Caller-defined metadata; `{}` when none was stored.
    pub metadata: serde_json::Value,
}

impl MemoryHit {
    /// Memory type recorded in metadata, if any.
    pub fn memory_type(&self) -> Option<&str> {
        self.metadata.get("type").and_then(serde_json::Value::as_str)
    }
}

/// Result set returned by `search`, `recent` and `related`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    /// Hits in result order (closest or newest first).
    pub results: Vec<MemoryHit>,
    /// Wall-clock time spent embedding and querying.
    pub query_time_ms: u64,
    /// Namespace the query was scoped to.
    pub namespace: String,
    /// Strategy that produced the results.
    pub mode: SearchMode,
}

/// Aggregate statistics for a namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryStats {
    /// Namespace the statistics cover.
    pub namespace: String,
    /// Number of records in the namespace.
    pub memory_count: u64,
    /// Oldest record timestamp; `None` when empty.
    pub first_memory_at: Option<DateTime<Utc>>,
    /// Newest record timestamp; `None` when empty.
    pub last_memory_at: Option<DateTime<Utc>>,
}

/// Overall health verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Reachability of one dependency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
}

impl ServiceStatus {
    pub(crate) fn from_probe(ok: bool) -> Self {
        if ok { ServiceStatus::Up } else { ServiceStatus::Down }
    }
}

/// Health report; never an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthReport {
    /// `Healthy` only when both probes succeeded.
    pub status: HealthStatus,
    /// Outcome of the embedding provider probe.
    pub embedding_provider: ServiceStatus,
    /// Outcome of the vector store probe.
    pub vector_store: ServiceStatus,
}

impl HealthReport {
    /// Combine two probe outcomes into a report.
    pub fn from_probes(embedding_ok: bool, store_ok: bool) -> Self {
        let status = if embedding_ok && store_ok {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        Self {
            status,
            embedding_provider: ServiceStatus::from_probe(embedding_ok),
            vector_store: ServiceStatus::from_probe(store_ok),
        }
    }
}

/// Convert stored epoch seconds into a UTC timestamp.
pub(crate) fn timestamp_from_secs(secs: i64) -> Result<DateTime<Utc>, MemoryError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| MemoryError::Storage(format!("timestamp out of range: {secs}")))
}

#[cfg(test)]
mod tests {
    use super::{HealthReport, HealthStatus, SearchMode, ServiceStatus, namespace_for};
    use pretty_assertions::assert_eq;

    #[test]
    fn namespace_prefixes_agent_id() {
        assert_eq!(namespace_for("fork-main"), "agent_fork-main");
    }

    #[test]
    fn search_mode_parses_known_names_only() {
        assert_eq!("chronological".parse::<SearchMode>().ok(), Some(SearchMode::Chronological));
        assert!("semantic".parse::<SearchMode>().is_err());
    }

    #[test]
    fn health_is_degraded_unless_both_probes_pass() {
        let report = HealthReport::from_probes(true, false);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.vector_store, ServiceStatus::Down);
        assert_eq!(HealthReport::from_probes(true, true).status, HealthStatus::Healthy);
    }
}
