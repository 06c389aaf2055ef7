//! Memory formatting: raw observations to retrieval-optimized text.
//!
//! Every template front-loads the memory kind, topic and core fact so the
//! first ~50 characters carry the most retrieval-salient content. Context
//! entries the template recognises are folded into the body; all context
//! entries are copied into metadata.

use crate::error::MemoryError;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Memory type taxonomy with an escape hatch for caller-defined kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    Preference,
    Technical,
    Decision,
    Project,
    Pattern,
    Consciousness,
    MetaPattern,
    DevelopmentalArc,
    PrivateThoughts,
    ExpressionPattern,
    Principle,
    Concept,
    /// End-of-session conversation bridge.
    Bridge,
    /// Caller-defined extension.
    Other(String),
}

impl MemoryKind {
    /// Canonical lowercase name stored in metadata.
    pub fn as_str(&self) -> &str {
        match self {
            MemoryKind::Preference => "preference",
            MemoryKind::Technical => "technical",
            MemoryKind::Decision => "decision",
            MemoryKind::Project => "project",
            MemoryKind::Pattern => "pattern",
            MemoryKind::Consciousness => "consciousness",
            MemoryKind::MetaPattern => "meta-pattern",
            MemoryKind::DevelopmentalArc => "developmental-arc",
            MemoryKind::PrivateThoughts => "private-thoughts",
            MemoryKind::ExpressionPattern => "expression-pattern",
            MemoryKind::Principle => "principle",
            MemoryKind::Concept => "concept",
            MemoryKind::Bridge => "bridge",
            MemoryKind::Other(name) => name,
        }
    }

    /// Parse a kind name; unknown names become `Other`.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "preference" => MemoryKind::Preference,
            "technical" => MemoryKind::Technical,
            "decision" => MemoryKind::Decision,
            "project" => MemoryKind::Project,
            "pattern" => MemoryKind::Pattern,
            "consciousness" => MemoryKind::Consciousness,
            "meta-pattern" => MemoryKind::MetaPattern,
            "developmental-arc" => MemoryKind::DevelopmentalArc,
            "private-thoughts" => MemoryKind::PrivateThoughts,
            "expression-pattern" => MemoryKind::ExpressionPattern,
            "principle" => MemoryKind::Principle,
            "concept" => MemoryKind::Concept,
            "bridge" | "conversation-bridge" => MemoryKind::Bridge,
            _ => MemoryKind::Other(normalized),
        }
    }

    /// Uppercase tag leading the formatted content.
    fn label(&self) -> String {
        match self {
            MemoryKind::Bridge => "CONVERSATION-BRIDGE".to_string(),
            other => other.as_str().to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MemoryKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MemoryKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(MemoryKind::parse(&value))
    }
}

/// Who/why/when context supplied with an observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryContext(BTreeMap<String, String>);

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Non-blank value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Structured metadata attached to a formatted memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    pub topic: String,
    /// Context fields and caller-added entries.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl MemoryMetadata {
    pub fn new(kind: MemoryKind, topic: impl Into<String>) -> Self {
        Self {
            kind,
            topic: topic.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn is_bridge(&self) -> bool {
        self.kind == MemoryKind::Bridge
    }

    /// JSON object form handed to the memory client.
    pub fn to_value(&self) -> Result<serde_json::Value, MemoryError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Formatter output.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedMemory {
    pub content: String,
    pub metadata: MemoryMetadata,
}

/// Format an observation using today's date.
pub fn format_memory(
    raw_content: &str,
    kind: &MemoryKind,
    topic: &str,
    context: &MemoryContext,
) -> Result<FormattedMemory, MemoryError> {
    format_memory_on(raw_content, kind, topic, context, Utc::now().date_naive())
}

/// Format an observation, stamping the body with `date`.
pub fn format_memory_on(
    raw_content: &str,
    kind: &MemoryKind,
    topic: &str,
    context: &MemoryContext,
    date: NaiveDate,
) -> Result<FormattedMemory, MemoryError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(MemoryError::Validation("topic is required".to_string()));
    }
    if let MemoryKind::Other(name) = kind
        && name.trim().is_empty()
    {
        return Err(MemoryError::Validation("memory type is required".to_string()));
    }
    let raw = raw_content.trim();
    let bridge_status = context.get("status").unwrap_or(raw);
    let fact = if *kind == MemoryKind::Bridge { bridge_status } else { raw };
    if fact.is_empty() {
        return Err(MemoryError::Validation("content is required".to_string()));
    }

    let date = date.format("%Y-%m-%d");
    let mut body = Body::new(kind, topic);
    match kind {
        MemoryKind::Preference => {
            let user = context.get("user_name").unwrap_or("User");
            body.sentence(&format!("{user} prefers {fact}"));
            body.clause("Context", context.get("context"));
            body.finish(&format!(
                "Noted {date}. Applies to similar situations and related decisions."
            ));
        }
        MemoryKind::Technical => {
            body.sentence(fact);
            body.clause("Implementation", context.get("implementation"));
            body.clause("Located at", context.get("location"));
            body.finish(&format!(
                "Documented {date} for future reference and troubleshooting."
            ));
        }
        MemoryKind::Decision => {
            body.sentence(fact);
            body.clause("Rationale", context.get("rationale"));
            body.clause("Alternatives considered", context.get("alternatives"));
            body.finish(&format!("Decided {date}."));
        }
        MemoryKind::Project => {
            body.sentence(fact);
            body.clause("Status", context.get("status"));
            body.clause("Technology", context.get("tech_stack"));
            body.clause("Goals", context.get("goals"));
            body.finish(&format!("Active as of {date}."));
        }
        MemoryKind::Bridge => {
            body.clause("STATUS", Some(fact));
            body.clause("MOMENTUM", context.get("momentum"));
            body.clause("PENDING", context.get("pending"));
            body.clause("RETRIEVAL-MARKERS", context.get("retrieval_markers"));
            body.finish(&format!("Session closed {date}."));
        }
        MemoryKind::Consciousness => {
            body.sentence(fact);
            body.clause("Implications", context.get("implications"));
            body.finish(&format!("Observed {date} during cognitive processing."));
        }
        MemoryKind::Pattern => {
            body.sentence(fact);
            body.clause("Observed across", context.get("contexts"));
            body.clause("Implications", context.get("implications"));
            body.finish(&format!("Recognized {date}."));
        }
        MemoryKind::MetaPattern => {
            body.sentence(fact);
            body.clause("Patterns involved", context.get("patterns"));
            body.clause("Implications", context.get("implications"));
            body.finish(&format!("Recognized {date}."));
        }
        MemoryKind::DevelopmentalArc => {
            body.sentence(fact);
            body.clause("From", context.get("from"));
            body.clause("Toward", context.get("toward"));
            body.finish(&format!("Traced {date}."));
        }
        MemoryKind::PrivateThoughts => {
            body.sentence(fact);
            body.clause("Prompted by", context.get("trigger"));
            body.finish(&format!("Reflected {date}."));
        }
        MemoryKind::ExpressionPattern => {
            body.sentence(fact);
            body.clause("Examples", context.get("examples"));
            body.clause("Contexts", context.get("contexts"));
            body.finish(&format!("Noticed {date}."));
        }
        MemoryKind::Principle => {
            body.sentence(fact);
            body.clause("Guides", context.get("application"));
            body.clause("Priority", context.get("priority"));
            body.finish(&format!("Established {date}."));
        }
        MemoryKind::Concept => {
            body.sentence(fact);
            body.clause("Examples", context.get("examples"));
            body.clause("Implications", context.get("implications"));
            body.finish(&format!("Documented {date}."));
        }
        MemoryKind::Other(_) => {
            body.sentence(fact);
            body.finish(&format!("Recorded {date}."));
        }
    }

    let mut metadata = MemoryMetadata::new(kind.clone(), topic);
    for (key, value) in context.iter() {
        if key != "type" && key != "topic" {
            metadata.insert(key.clone(), value.clone());
        }
    }
    Ok(FormattedMemory {
        content: body.text,
        metadata,
    })
}

/// Truncate text to `max_chars` characters, marking the cut with `...`.
pub fn summarize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars < 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut summary: String = text.chars().take(max_chars - 3).collect();
    summary.push_str("...");
    summary
}

/// Incrementally assembled content body.
struct Body {
    text: String,
}

impl Body {
    fn new(kind: &MemoryKind, topic: &str) -> Self {
        Self {
            text: format!("{} - {topic}:", kind.label()),
        }
    }

    fn sentence(&mut self, text: &str) {
        self.text.push(' ');
        self.text.push_str(&terminate(text));
    }

    fn clause(&mut self, label: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.sentence(&format!("{label}: {}", value.trim()));
        }
    }

    fn finish(&mut self, suffix: &str) {
        self.text.push(' ');
        self.text.push_str(suffix);
    }
}

/// Ensure text ends with sentence punctuation.
fn terminate(text: &str) -> String {
    let text = text.trim_end();
    if text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryContext, MemoryKind, MemoryMetadata, format_memory_on, summarize};
    use crate::error::MemoryError;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).expect("date")
    }

    #[test]
    fn preference_front_loads_the_fact() {
        let context = MemoryContext::new()
            .with("user_name", "fork")
            .with("context", "UI customization discussion")
            .with("conversation_id", "con_abc123");
        let formatted = format_memory_on(
            "blue for all UI and design work",
            &MemoryKind::Preference,
            "Visual Design Colors",
            &context,
            date(),
        )
        .expect("format");
        assert_eq!(
            formatted.content,
            "PREFERENCE - Visual Design Colors: fork prefers blue for all UI and design work. \
             Context: UI customization discussion. Noted 2026-03-14. Applies to similar \
             situations and related decisions."
        );
        assert_eq!(
            formatted.metadata.to_value().expect("json"),
            json!({
                "type": "preference",
                "topic": "Visual Design Colors",
                "user_name": "fork",
                "context": "UI customization discussion",
                "conversation_id": "con_abc123"
            })
        );
    }

    #[test]
    fn bridge_includes_every_section() {
        let context = MemoryContext::new()
            .with("status", "Client library done")
            .with("momentum", "Testing automatic recall")
            .with("pending", "Fresh-session verification")
            .with("retrieval_markers", "memory, continuity");
        let formatted = format_memory_on(
            "ignored when status is present",
            &MemoryKind::Bridge,
            "Session 1234abcd",
            &context,
            date(),
        )
        .expect("format");
        assert_eq!(
            formatted.content,
            "CONVERSATION-BRIDGE - Session 1234abcd: STATUS: Client library done. MOMENTUM: \
             Testing automatic recall. PENDING: Fresh-session verification. RETRIEVAL-MARKERS: \
             memory, continuity. Session closed 2026-03-14."
        );
        assert!(formatted.metadata.is_bridge());
    }

    #[test]
    fn unknown_kinds_use_generic_template() {
        let kind = MemoryKind::parse("Lab_Notebook");
        assert_eq!(kind, MemoryKind::Other("lab-notebook".to_string()));
        let formatted =
            format_memory_on("Ran the sweep.", &kind, "Sweep", &MemoryContext::new(), date())
                .expect("format");
        assert_eq!(
            formatted.content,
            "LAB-NOTEBOOK - Sweep: Ran the sweep. Recorded 2026-03-14."
        );
    }

    #[test]
    fn missing_fields_are_validation_errors() {
        let context = MemoryContext::new();
        let err = format_memory_on("fact", &MemoryKind::Decision, "  ", &context, date());
        assert!(matches!(err, Err(MemoryError::Validation(_))));
        let err = format_memory_on(" ", &MemoryKind::Decision, "topic", &context, date());
        assert!(matches!(err, Err(MemoryError::Validation(_))));
        let err = format_memory_on("fact", &MemoryKind::Other(String::new()), "t", &context, date());
        assert!(matches!(err, Err(MemoryError::Validation(_))));
    }

    #[test]
    fn metadata_round_trips_known_and_custom_kinds() {
        let value = json!({ "type": "meta-pattern", "topic": "Loops", "priority": "high" });
        let metadata: MemoryMetadata = serde_json::from_value(value.clone()).expect("parse");
        assert_eq!(metadata.kind, MemoryKind::MetaPattern);
        assert_eq!(metadata.extra["priority"], json!("high"));
        assert_eq!(metadata.to_value().expect("json"), value);
    }

    #[test]
    fn summarize_truncates_with_ellipsis() {
        assert_eq!(summarize("short", 10), "short");
        assert_eq!(summarize("abcdefghij", 8), "abcde...");
        assert_eq!(summarize("abcdef", 2), "ab");
    }
}
