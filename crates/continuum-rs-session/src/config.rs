//! Config mapping from `ContinuumConfig` to runtime types.

use crate::error::SessionError;
use crate::options::{CategoryQuery, RetrieveOptions, SessionOptions};
use crate::session::MemorySession;
use continuum_rs_config::{ContinuumConfig, RetrievalConfig, RetrievalMode};
use continuum_rs_memory::{
    HttpVectorStore, MemoryClient, MemoryClientOptions, OllamaEmbeddingProvider, SearchMode,
};
use std::sync::Arc;
use std::time::Duration;

/// Build a memory client wired to the configured HTTP services.
pub fn client_from_config(config: &ContinuumConfig) -> Result<MemoryClient, SessionError> {
    let mut embedder = OllamaEmbeddingProvider::new(
        &config.embedding.url,
        &config.embedding.model,
        Duration::from_secs(config.embedding.timeout_secs),
    )?;
    let mut store = HttpVectorStore::new(
        &config.vector_store.url,
        Duration::from_secs(config.vector_store.timeout_secs),
    )?;
    if let Some(token) = &config.vector_store.auth_token {
        store = store.with_auth_token(token);
    }
    let mut options = MemoryClientOptions::new(&config.agent_id)
        .with_health_timeout(Duration::from_secs(config.health.timeout_secs));
    if let Some(dimensions) = config.embedding.dimensions {
        embedder = embedder.with_dimensions(dimensions);
        options = options.with_dimensions(dimensions);
    }
    Ok(MemoryClient::new(
        Arc::new(embedder),
        Arc::new(store),
        options,
    )?)
}

/// Translate retrieval config into per-call defaults.
pub fn retrieve_options_from_config(config: &RetrievalConfig) -> RetrieveOptions {
    RetrieveOptions {
        min_similarity: config.min_similarity,
        limit: config.limit,
        mode: search_mode_from_config(config.mode),
    }
}

/// Translate session config into runtime options.
pub fn session_options_from_config(config: &ContinuumConfig) -> SessionOptions {
    SessionOptions {
        bridge_limit: config.session.bridge_limit,
        categories: config
            .session
            .categories
            .iter()
            .map(|category| {
                let query = CategoryQuery::new(&category.memory_type, category.limit);
                match &category.title {
                    Some(title) => query.with_title(title),
                    None => query,
                }
            })
            .collect(),
        user_name: config.session.user_name.clone(),
        retrieve: retrieve_options_from_config(&config.retrieval),
    }
}

/// Build a session over a freshly configured client.
pub fn session_from_config(config: &ContinuumConfig) -> Result<MemorySession, SessionError> {
    let client = client_from_config(config)?;
    Ok(MemorySession::new(
        Arc::new(client),
        session_options_from_config(config),
    ))
}

/// Map retrieval mode from config to the client's search mode.
fn search_mode_from_config(mode: RetrievalMode) -> SearchMode {
    match mode {
        RetrievalMode::Vector => SearchMode::Vector,
        RetrievalMode::Chronological => SearchMode::Chronological,
        RetrievalMode::Hybrid => SearchMode::Hybrid,
    }
}
