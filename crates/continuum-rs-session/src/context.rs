//! Context bundles and rendered retrieval results.

use continuum_rs_memory::{MemoryHit, SearchResults};
use serde::Serialize;
use std::fmt::Write;

/// Rendered text of an initialize bundle with nothing in it.
pub const FRESH_START: &str = "No initialization memories found. Fresh start.";
/// Rendered text of a retrieval with nothing above threshold.
pub const NO_RELEVANT_MEMORIES: &str = "No relevant memories found.";

/// Memories of one category loaded at initialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryContext {
    pub memory_type: String,
    pub title: String,
    pub memories: Vec<MemoryHit>,
}

/// Everything initialize recovered for a new session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextBundle {
    pub namespace: String,
    /// Most recent conversation bridges, newest first.
    pub bridges: Vec<MemoryHit>,
    pub categories: Vec<CategoryContext>,
}

impl ContextBundle {
    /// True on cold start.
    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
            && self
                .categories
                .iter()
                .all(|category| category.memories.is_empty())
    }

    pub fn memory_count(&self) -> usize {
        self.bridges.len()
            + self
                .categories
                .iter()
                .map(|category| category.memories.len())
                .sum::<usize>()
    }

    /// Markdown sections for prompt injection.
    pub fn render(&self) -> String {
        let mut sections = Vec::new();
        if !self.bridges.is_empty() {
            sections.push(section("Recent Session Context", &self.bridges));
        }
        for category in &self.categories {
            if !category.memories.is_empty() {
                sections.push(section(&category.title, &category.memories));
            }
        }
        if sections.is_empty() {
            FRESH_START.to_string()
        } else {
            sections.join("\n")
        }
    }
}

/// Outcome of a retrieve call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedContext {
    pub query: String,
    pub min_similarity: f64,
    /// Every result returned by the search, including suppressed ones.
    pub results: SearchResults,
    /// Markdown rendering of the results at or above `min_similarity`.
    pub text: String,
}

impl RenderedContext {
    pub fn new(query: impl Into<String>, results: SearchResults, min_similarity: f64) -> Self {
        let shown: Vec<MemoryHit> = results
            .results
            .iter()
            .filter(|hit| hit.similarity >= min_similarity)
            .cloned()
            .collect();
        let text = if shown.is_empty() {
            NO_RELEVANT_MEMORIES.to_string()
        } else {
            section("Relevant Memories", &shown)
        };
        Self {
            query: query.into(),
            min_similarity,
            results,
            text,
        }
    }

    /// Results at or above the threshold, closest first.
    pub fn shown(&self) -> impl Iterator<Item = &MemoryHit> {
        self.results
            .results
            .iter()
            .filter(|hit| hit.similarity >= self.min_similarity)
    }

    pub fn found(&self) -> bool {
        self.shown().next().is_some()
    }

    /// Number of results hidden by the threshold.
    pub fn suppressed(&self) -> usize {
        self.results.results.len() - self.shown().count()
    }
}

fn section(title: &str, hits: &[MemoryHit]) -> String {
    format!("## {title}\n\n{}", render_hits(hits))
}

/// Render hits as numbered entries annotated with similarity and type.
pub fn render_hits(hits: &[MemoryHit]) -> String {
    let mut output = String::new();
    for (index, hit) in hits.iter().enumerate() {
        let _ = writeln!(
            output,
            "**Memory {}** (similarity: {:.2}, id: {})",
            index + 1,
            hit.similarity,
            hit.id
        );
        let _ = writeln!(output, "*Type: {}*", hit.memory_type().unwrap_or("general"));
        let _ = writeln!(output, "{}\n", hit.text);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{CategoryContext, ContextBundle, FRESH_START, RenderedContext, render_hits};
    use chrono::DateTime;
    use continuum_rs_memory::{MemoryHit, SearchMode, SearchResults};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn hit(id: &str, text: &str, similarity: f64, kind: Option<&str>) -> MemoryHit {
        MemoryHit {
            id: id.to_string(),
            text: text.to_string(),
            similarity,
            created_at: DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp"),
            metadata: kind.map(|kind| json!({ "type": kind })).unwrap_or(json!({})),
        }
    }

    fn results(hits: Vec<MemoryHit>) -> SearchResults {
        SearchResults {
            results: hits,
            query_time_ms: 3,
            namespace: "agent_main".to_string(),
            mode: SearchMode::Vector,
        }
    }

    #[test]
    fn renders_numbered_entries() {
        let rendered = render_hits(&[
            hit("mem_a", "first", 0.874, Some("preference")),
            hit("mem_b", "second", 0.5, None),
        ]);
        assert_eq!(
            rendered,
            "**Memory 1** (similarity: 0.87, id: mem_a)\n*Type: preference*\nfirst\n\n\
             **Memory 2** (similarity: 0.50, id: mem_b)\n*Type: general*\nsecond\n\n"
        );
    }

    #[test]
    fn empty_bundle_renders_fresh_start() {
        let bundle = ContextBundle {
            namespace: "agent_main".to_string(),
            bridges: Vec::new(),
            categories: vec![CategoryContext {
                memory_type: "preference".to_string(),
                title: "User Preferences & Patterns".to_string(),
                memories: Vec::new(),
            }],
        };
        assert!(bundle.is_empty());
        assert_eq!(bundle.memory_count(), 0);
        assert_eq!(bundle.render(), FRESH_START);
    }

    #[test]
    fn bundle_sections_skip_empty_categories() {
        let bundle = ContextBundle {
            namespace: "agent_main".to_string(),
            bridges: vec![hit("mem_b", "bridge body", 1.0, Some("bridge"))],
            categories: vec![
                CategoryContext {
                    memory_type: "preference".to_string(),
                    title: "User Preferences & Patterns".to_string(),
                    memories: Vec::new(),
                },
                CategoryContext {
                    memory_type: "project".to_string(),
                    title: "Active Projects".to_string(),
                    memories: vec![hit("mem_p", "project body", 1.0, Some("project"))],
                },
            ],
        };
        let rendered = bundle.render();
        assert!(rendered.starts_with("## Recent Session Context\n\n**Memory 1**"));
        assert!(rendered.contains("## Active Projects"));
        assert!(!rendered.contains("User Preferences"));
        assert_eq!(bundle.memory_count(), 2);
    }

    #[test]
    fn threshold_suppresses_but_keeps_results() {
        let context = RenderedContext::new(
            "query",
            results(vec![
                hit("mem_hi", "close", 0.91, None),
                hit("mem_lo", "distant", 0.42, None),
            ]),
            0.7,
        );
        assert!(context.found());
        assert_eq!(context.suppressed(), 1);
        assert_eq!(context.results.results.len(), 2);
        assert!(context.text.contains("mem_hi"));
        assert!(!context.text.contains("mem_lo"));

        let strict = RenderedContext::new("query", context.results.clone(), 0.95);
        assert!(!strict.found());
        assert_eq!(strict.text, "No relevant memories found.");
    }
}
