//! Session lifecycle over a shared memory client.

use crate::context::{CategoryContext, ContextBundle, RenderedContext};
use crate::error::SessionError;
use crate::options::{BridgeNotes, RetrieveOptions, SessionOptions};
use crate::state::SessionState;
use chrono::Utc;
use continuum_rs_memory::{
    FormattedMemory, MemoryClient, MemoryContext, MemoryError, MemoryKind, RecordSummary,
    format_memory,
};
use log::{debug, info, warn};
use std::sync::Arc;

/// One conversation's view of an agent's memory.
///
/// Transitions are tracked but not enforced: out-of-order calls proceed and
/// log a warning.
pub struct MemorySession {
    client: Arc<MemoryClient>,
    options: SessionOptions,
    state: SessionState,
    context: Option<ContextBundle>,
}

impl MemorySession {
    pub fn new(client: Arc<MemoryClient>, options: SessionOptions) -> Self {
        Self {
            client,
            options,
            state: SessionState::Uninitialized,
            context: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn namespace(&self) -> &str {
        self.client.namespace()
    }

    pub fn client(&self) -> &Arc<MemoryClient> {
        &self.client
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Bundle loaded by the last successful initialize.
    pub fn context(&self) -> Option<&ContextBundle> {
        self.context.as_ref()
    }

    /// Load recent bridges and standing categories; an empty bundle is a cold start.
    pub async fn initialize(&mut self) -> Result<ContextBundle, SessionError> {
        self.check_state("initialize", SessionState::Uninitialized);
        let previous = self.state;
        self.state = SessionState::Initializing;
        match self.load_context().await {
            Ok(bundle) => {
                self.state = SessionState::Active;
                info!(
                    "session initialized (namespace={}, bridges={}, memories={})",
                    self.namespace(),
                    bundle.bridges.len(),
                    bundle.memory_count()
                );
                self.context = Some(bundle.clone());
                Ok(bundle)
            }
            Err(err) => {
                self.state = previous;
                Err(err)
            }
        }
    }

    /// Search with the session's default retrieval options.
    pub async fn retrieve(&self, query: &str) -> Result<RenderedContext, SessionError> {
        self.retrieve_with(query, &self.options.retrieve).await
    }

    /// Search and render results at or above `options.min_similarity`.
    pub async fn retrieve_with(
        &self,
        query: &str,
        options: &RetrieveOptions,
    ) -> Result<RenderedContext, SessionError> {
        self.check_state("retrieve", SessionState::Active);
        let results = self.client.search(query, options.limit, options.mode).await?;
        let rendered = RenderedContext::new(query, results, options.min_similarity);
        debug!(
            "retrieved memories (namespace={}, returned={}, suppressed={})",
            self.namespace(),
            rendered.results.results.len(),
            rendered.suppressed()
        );
        Ok(rendered)
    }

    /// Format and store an observation. Identical content is stored again.
    pub async fn store(
        &self,
        raw_content: &str,
        kind: &MemoryKind,
        topic: &str,
        context: &MemoryContext,
    ) -> Result<RecordSummary, SessionError> {
        self.check_state("store", SessionState::Active);
        let mut context = context.clone();
        if *kind == MemoryKind::Preference && context.get("user_name").is_none() {
            context.insert("user_name", self.options.user_name.clone());
        }
        let formatted = format_memory(raw_content, kind, topic, &context)?;
        self.persist(formatted).await
    }

    /// Write a conversation bridge and close the session.
    pub async fn close(
        &mut self,
        conversation_id: &str,
        notes: &BridgeNotes,
    ) -> Result<RecordSummary, SessionError> {
        let conversation_id = conversation_id.trim();
        if conversation_id.is_empty() {
            return Err(
                MemoryError::Validation("conversation id is required".to_string()).into(),
            );
        }
        self.check_state("close", SessionState::Active);
        let previous = self.state;
        self.state = SessionState::Closing;
        match self.store_bridge(conversation_id, notes).await {
            Ok(summary) => {
                self.state = SessionState::Closed;
                info!(
                    "session closed (namespace={}, conversation_id={}, bridge_id={})",
                    self.namespace(),
                    conversation_id,
                    summary.id
                );
                Ok(summary)
            }
            Err(err) => {
                self.state = previous;
                Err(err)
            }
        }
    }

    async fn load_context(&self) -> Result<ContextBundle, SessionError> {
        let bridges = self
            .client
            .recent(Some(MemoryKind::Bridge.as_str()), self.options.bridge_limit)
            .await?
            .results;
        let mut categories = Vec::with_capacity(self.options.categories.len());
        for category in &self.options.categories {
            let memory_type = MemoryKind::parse(&category.memory_type);
            let memories = self
                .client
                .recent(Some(memory_type.as_str()), category.limit)
                .await?
                .results;
            categories.push(CategoryContext {
                memory_type: memory_type.to_string(),
                title: category.title.clone(),
                memories,
            });
        }
        Ok(ContextBundle {
            namespace: self.namespace().to_string(),
            bridges,
            categories,
        })
    }

    async fn store_bridge(
        &self,
        conversation_id: &str,
        notes: &BridgeNotes,
    ) -> Result<RecordSummary, SessionError> {
        let context = MemoryContext::new()
            .with("status", notes.status.clone())
            .with("momentum", notes.momentum.clone())
            .with("pending", notes.pending.clone())
            .with("retrieval_markers", notes.markers.clone())
            .with("conversation_id", conversation_id)
            .with("user_name", self.options.user_name.clone());
        let formatted = format_memory(
            &notes.status,
            &MemoryKind::Bridge,
            &bridge_topic(conversation_id),
            &context,
        )?;
        self.persist(formatted).await
    }

    async fn persist(&self, formatted: FormattedMemory) -> Result<RecordSummary, SessionError> {
        let FormattedMemory {
            content,
            mut metadata,
        } = formatted;
        metadata.insert("created", Utc::now().to_rfc3339());
        let summary = self.client.store(&content, &metadata.to_value()?).await?;
        debug!(
            "stored session memory (namespace={}, id={}, type={})",
            self.namespace(),
            summary.id,
            metadata.kind
        );
        Ok(summary)
    }

    fn check_state(&self, operation: &str, expected: SessionState) {
        if self.state != expected {
            warn!(
                "session operation out of order (operation={}, state={}, expected={})",
                operation, self.state, expected
            );
        }
    }
}

/// Bridge topic: `Session` plus the last eight characters of the conversation id.
fn bridge_topic(conversation_id: &str) -> String {
    let chars: Vec<char> = conversation_id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(8)..].iter().collect();
    format!("Session {tail}")
}

#[cfg(test)]
mod tests {
    use super::bridge_topic;
    use pretty_assertions::assert_eq;

    #[test]
    fn bridge_topic_uses_id_tail() {
        assert_eq!(bridge_topic("conv-2024-abcdef12"), "Session abcdef12");
        assert_eq!(bridge_topic("c1"), "Session c1");
    }
}
