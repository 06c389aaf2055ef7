//! Configuration schema for Continuum.

use serde::{Deserialize, Serialize};

/// Root config for a Continuum agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuumConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    /// Agent identifier; memories live in the `agent_<agent_id>` namespace.
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

impl Default for ContinuumConfig {
    fn default() -> Self {
        Self {
            schema: None,
            agent_id: default_agent_id(),
            embedding: EmbeddingConfig::default(),
            vector_store: VectorStoreConfig::default(),
            retrieval: RetrievalConfig::default(),
            session: SessionConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

/// Default agent identifier.
fn default_agent_id() -> String {
    "main".to_string()
}

/// Embedding model server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Expected vector length; learned from stored data when unset.
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimensions: None,
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_embedding_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

/// Default per-request timeout for both external services.
fn default_request_timeout_secs() -> u64 {
    30
}

/// Vector datastore settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_vector_store_url")]
    pub url: String,
    /// Bearer token sent with every statement batch.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_vector_store_url(),
            auth_token: None,
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_vector_store_url() -> String {
    "http://localhost:8787".to_string()
}

/// Defaults applied to `retrieve` calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results below this similarity are suppressed from rendered output.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    #[serde(default = "default_retrieval_limit")]
    pub limit: usize,
    #[serde(default)]
    pub mode: RetrievalMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            limit: default_retrieval_limit(),
            mode: RetrievalMode::default(),
        }
    }
}

fn default_min_similarity() -> f64 {
    0.7
}

fn default_retrieval_limit() -> usize {
    10
}

/// Search mode selection for retrieval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    #[default]
    Vector,
    Chronological,
    Hybrid,
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of recent conversation bridges loaded at initialize.
    #[serde(default = "default_bridge_limit")]
    pub bridge_limit: usize,
    /// High-salience categories loaded at initialize, in order.
    #[serde(default = "default_categories")]
    pub categories: Vec<SessionCategory>,
    /// Name used by the preference template.
    #[serde(default = "default_user_name")]
    pub user_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bridge_limit: default_bridge_limit(),
            categories: default_categories(),
            user_name: default_user_name(),
        }
    }
}

fn default_bridge_limit() -> usize {
    3
}

fn default_categories() -> Vec<SessionCategory> {
    vec![
        SessionCategory {
            memory_type: "preference".to_string(),
            limit: 5,
            title: None,
        },
        SessionCategory {
            memory_type: "project".to_string(),
            limit: 3,
            title: None,
        },
    ]
}

fn default_user_name() -> String {
    "User".to_string()
}

/// One category of memories loaded at initialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCategory {
    #[serde(rename = "type")]
    pub memory_type: String,
    #[serde(default = "default_category_limit")]
    pub limit: usize,
    /// Section heading; derived from the type when unset.
    #[serde(default)]
    pub title: Option<String>,
}

fn default_category_limit() -> usize {
    3
}

/// Health probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_health_timeout_secs(),
        }
    }
}

fn default_health_timeout_secs() -> u64 {
    5
}
