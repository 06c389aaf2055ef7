//! Session continuity on top of the Continuum memory client.
//!
//! A [`MemorySession`] loads recent conversation bridges and standing
//! categories at start, serves retrieval and storage while active, and leaves a
//! bridge behind on close for the next session to pick up.

mod config;
mod context;
mod error;
mod options;
mod session;
mod state;

/// Config to runtime mapping.
pub use config::{
    client_from_config, retrieve_options_from_config, session_from_config,
    session_options_from_config,
};
/// Initialize bundle and retrieval rendering.
pub use context::{
    CategoryContext, ContextBundle, FRESH_START, NO_RELEVANT_MEMORIES, RenderedContext,
    render_hits,
};
/// Session error type.
pub use error::SessionError;
/// Session and retrieval options.
pub use options::{BridgeNotes, CategoryQuery, RetrieveOptions, SessionOptions};
/// Session handle.
pub use session::MemorySession;
/// Lifecycle states.
pub use state::SessionState;
