//! Error types for session operations.

use continuum_rs_config::ConfigError;
use continuum_rs_memory::{Diagnostic, MemoryError};
use thiserror::Error;

/// Errors returned by session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Memory client, formatter or provider failure.
    #[error(transparent)]
    Memory(#[from] MemoryError),
    /// Configuration could not be turned into a session.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Classification for user-facing messages; config problems count as malformed requests.
    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            SessionError::Memory(err) => err.diagnostic(),
            SessionError::Config(_) => Diagnostic::MalformedRequest,
        }
    }
}
