//! Public SDK surface for Continuum.
//!
//! This crate re-exports the memory, session and config crates and provides a
//! small initialization helper to keep consumer setup consistent.

/// Re-export for convenience.
pub use continuum_rs_config as config;
/// Re-export for convenience.
pub use continuum_rs_memory as memory;
/// Re-export for convenience.
pub use continuum_rs_session as session;

pub use continuum_rs_config::ContinuumConfig;
pub use continuum_rs_memory::{MemoryClient, MemoryError};
pub use continuum_rs_session::{MemorySession, SessionError, session_from_config};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
