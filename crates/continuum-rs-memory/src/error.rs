//! Error types for memory operations.

use std::fmt;
use std::time::Duration;

/// External collaborator a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Text-to-vector model server.
    EmbeddingProvider,
    /// Statement-executing vector datastore.
    VectorStore,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::EmbeddingProvider => f.write_str("embedding provider"),
            Service::VectorStore => f.write_str("vector store"),
        }
    }
}

/// Errors returned by the memory client, codec, formatter and providers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Embedding provider unreachable, malformed response, or dimension mismatch.
    #[error("embedding error: {0}")]
    Embedding(String),
    /// Vector store unreachable, malformed response, or rejected statement.
    #[error("storage error: {0}")]
    Storage(String),
    /// Vector to token conversion failed.
    #[error("encoding error: {0}")]
    Encoding(String),
    /// Caller supplied missing or invalid fields.
    #[error("validation error: {0}")]
    Validation(String),
    /// A network call exceeded its bounded timeout.
    #[error("{service} timed out after {}s", timeout.as_secs_f32())]
    Timeout { service: Service, timeout: Duration },
    /// No record with the given id exists in the namespace.
    #[error("memory not found: {0}")]
    NotFound(String),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Coarse failure classification for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// An external service could not be reached or answered with garbage.
    ServiceDown(Service),
    /// An external service did not answer in time.
    ServiceTimeout(Service),
    /// The request itself was invalid.
    MalformedRequest,
    /// Stored data is inconsistent (e.g. mixed vector dimensions).
    DataIntegrity,
    /// The requested record does not exist.
    NotFound,
}

impl Diagnostic {
    /// One-line remediation hint.
    pub fn hint(&self) -> String {
        match self {
            Diagnostic::ServiceDown(service) => {
                format!("the {service} is down or misbehaving; check that it is running")
            }
            Diagnostic::ServiceTimeout(service) => {
                format!("the {service} did not answer in time; retry or raise timeout_secs")
            }
            Diagnostic::MalformedRequest => "the request was rejected; check the arguments".into(),
            Diagnostic::DataIntegrity => {
                "stored vectors do not match the embedding model; check embedding.dimensions"
                    .into()
            }
            Diagnostic::NotFound => "no such memory in this namespace".into(),
        }
    }
}

impl MemoryError {
    /// Classify this error for callers that surface failures to users.
    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            MemoryError::Embedding(_) => Diagnostic::ServiceDown(Service::EmbeddingProvider),
            MemoryError::Storage(_) => Diagnostic::ServiceDown(Service::VectorStore),
            MemoryError::Encoding(_) => Diagnostic::DataIntegrity,
            MemoryError::Validation(_) | MemoryError::Serde(_) => Diagnostic::MalformedRequest,
            MemoryError::Timeout { service, .. } => Diagnostic::ServiceTimeout(*service),
            MemoryError::NotFound(_) => Diagnostic::NotFound,
        }
    }

    /// Map a reqwest failure for the given service into a typed error.
    pub(crate) fn from_http(service: Service, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return MemoryError::Timeout { service, timeout };
        }
        match service {
            Service::EmbeddingProvider => MemoryError::Embedding(err.to_string()),
            Service::VectorStore => MemoryError::Storage(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, MemoryError, Service};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn timeout_is_classified_per_service() {
        let err = MemoryError::Timeout {
            service: Service::VectorStore,
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            err.diagnostic(),
            Diagnostic::ServiceTimeout(Service::VectorStore)
        );
        assert_eq!(err.to_string(), "vector store timed out after 30s");
    }

    #[test]
    fn hints_name_the_failing_service() {
        let err = MemoryError::Embedding("connection refused".to_string());
        assert!(err.diagnostic().hint().contains("embedding provider"));
        let err = MemoryError::Validation("limit must be positive".to_string());
        assert_eq!(err.diagnostic(), Diagnostic::MalformedRequest);
    }
}
