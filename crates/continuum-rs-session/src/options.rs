//! Options controlling initialize, retrieve and close.

use continuum_rs_memory::SearchMode;

/// Defaults for `retrieve`; overridable per call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveOptions {
    /// Results below this similarity are kept but not rendered.
    pub min_similarity: f64,
    pub limit: usize,
    pub mode: SearchMode,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            min_similarity: 0.7,
            limit: 10,
            mode: SearchMode::Vector,
        }
    }
}

impl RetrieveOptions {
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }
}

/// A memory category loaded by recency at initialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryQuery {
    /// Metadata `type` to match.
    pub memory_type: String,
    pub limit: usize,
    /// Heading used when rendering the bundle.
    pub title: String,
}

impl CategoryQuery {
    pub fn new(memory_type: impl Into<String>, limit: usize) -> Self {
        let memory_type = memory_type.into();
        let title = default_title(&memory_type);
        Self {
            memory_type,
            limit,
            title,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Heading for a category without an explicit title.
fn default_title(memory_type: &str) -> String {
    match memory_type {
        "preference" => "User Preferences & Patterns".to_string(),
        "project" => "Active Projects".to_string(),
        "consciousness" => "Cognitive Patterns".to_string(),
        other => {
            let words: Vec<String> = other
                .split(['-', '_'])
                .filter(|word| !word.is_empty())
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                })
                .collect();
            format!("{} Memories", words.join(" "))
        }
    }
}

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Number of recent conversation bridges loaded at initialize.
    pub bridge_limit: usize,
    pub categories: Vec<CategoryQuery>,
    /// Name the preference template attributes preferences to.
    pub user_name: String,
    pub retrieve: RetrieveOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            bridge_limit: 3,
            categories: vec![
                CategoryQuery::new("preference", 5),
                CategoryQuery::new("project", 3),
            ],
            user_name: "User".to_string(),
            retrieve: RetrieveOptions::default(),
        }
    }
}

/// End-of-session notes assembled into a conversation bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeNotes {
    /// What was accomplished; required.
    pub status: String,
    /// Where things are headed.
    pub momentum: String,
    /// Unfinished items.
    pub pending: String,
    /// Keywords for future retrieval.
    pub markers: String,
}

impl BridgeNotes {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }

    pub fn with_momentum(mut self, momentum: impl Into<String>) -> Self {
        self.momentum = momentum.into();
        self
    }

    pub fn with_pending(mut self, pending: impl Into<String>) -> Self {
        self.pending = pending.into();
        self
    }

    pub fn with_markers(mut self, markers: impl Into<String>) -> Self {
        self.markers = markers.into();
        self
    }
}
