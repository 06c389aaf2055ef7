//! Namespace-scoped memory client over an embedding provider and a vector store.

use crate::codec::VectorCodec;
use crate::embedding::EmbeddingProvider;
use crate::error::MemoryError;
use crate::model::{
    HealthReport, MemoryHit, MemoryRecord, MemoryStats, RecordSummary, SearchMode, SearchResults,
    namespace_for, timestamp_from_secs,
};
use crate::sql;
use crate::store::{ResultSet, SqlValue, Statement, VectorStore};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Maximum characters accepted for a single memory.
pub const MAX_CONTENT_CHARS: usize = 100_000;
/// Maximum results returned by a single query.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Construction options for [`MemoryClient`].
#[derive(Debug, Clone)]
pub struct MemoryClientOptions {
    /// Agent identifier; the namespace is derived from it.
    pub agent_id: String,
    /// Expected embedding dimensionality, if known up front.
    pub dimensions: Option<usize>,
    /// Timeout applied to each health probe.
    pub health_timeout: Duration,
}

impl MemoryClientOptions {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            dimensions: None,
            health_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

/// Storage, search and statistics facade for one namespace.
pub struct MemoryClient {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    agent_id: String,
    namespace: String,
    /// Dimensionality established by config or by data already in the store.
    dimensions: RwLock<Option<usize>>,
    health_timeout: Duration,
}

impl MemoryClient {
    /// Create a client bound to `options.agent_id`'s namespace.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        options: MemoryClientOptions,
    ) -> Result<Self, MemoryError> {
        if options.agent_id.trim().is_empty() {
            return Err(MemoryError::Validation("agent id is required".to_string()));
        }
        if options.dimensions == Some(0) {
            return Err(MemoryError::Validation(
                "dimensions must be positive".to_string(),
            ));
        }
        let namespace = namespace_for(&options.agent_id);
        info!(
            "initialized memory client (namespace={}, model={})",
            namespace,
            embedder.model_name()
        );
        Ok(Self {
            embedder,
            store,
            agent_id: options.agent_id,
            namespace,
            dimensions: RwLock::new(options.dimensions),
            health_timeout: options.health_timeout,
        })
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Namespace every read and write is scoped to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create the record table and its indexes if they do not exist.
    pub async fn ensure_schema(&self, dimensions: usize) -> Result<(), MemoryError> {
        if dimensions == 0 {
            return Err(MemoryError::Validation(
                "dimensions must be positive".to_string(),
            ));
        }
        if let Some(known) = *self.dimensions.read()
            && known != dimensions
        {
            return Err(MemoryError::Validation(format!(
                "schema dimensions {dimensions} conflict with established {known}"
            )));
        }
        let statements: Vec<Statement> =
            sql::schema(dimensions).into_iter().map(Statement::new).collect();
        let count = statements.len();
        for result in self.store.execute(statements).await? {
            result.into_result_set()?;
        }
        *self.dimensions.write() = Some(dimensions);
        info!("schema ensured (dimensions={dimensions}, statements={count})");
        Ok(())
    }

    /// Embed and persist `text` as a new record.
    pub async fn store(
        &self,
        text: &str,
        metadata: &serde_json::Value,
    ) -> Result<RecordSummary, MemoryError> {
        if text.trim().is_empty() {
            return Err(MemoryError::Validation("text is required".to_string()));
        }
        let chars = text.chars().count();
        if chars > MAX_CONTENT_CHARS {
            return Err(MemoryError::Validation(format!(
                "text exceeds {MAX_CONTENT_CHARS} character limit (got {chars})"
            )));
        }
        let metadata_json = match metadata {
            serde_json::Value::Null => "{}".to_string(),
            serde_json::Value::Object(_) => serde_json::to_string(metadata)?,
            _ => {
                return Err(MemoryError::Validation(
                    "metadata must be an object".to_string(),
                ));
            }
        };

        let embedding = self.embedder.embed(text).await?;
        let codec = self.codec().await?;
        let vector = codec.to_param(&embedding)?;

        let id = new_memory_id();
        let timestamp = Utc::now().timestamp();
        let created_at = timestamp_from_secs(timestamp)?;
        let statement = Statement::with_params(
            sql::INSERT_MEMORY,
            vec![
                id.clone().into(),
                self.namespace.clone().into(),
                text.into(),
                vector,
                metadata_json.into(),
                timestamp.into(),
                timestamp.into(),
            ],
        );
        self.execute_one(statement).await?;
        self.establish_dimensions(embedding.len());
        info!(
            "stored memory (namespace={}, id={}, content_len={})",
            self.namespace,
            id,
            text.len()
        );
        Ok(RecordSummary {
            id,
            text: text.to_string(),
            created_at,
        })
    }

    /// Search the namespace; results are closest first.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        mode: SearchMode,
    ) -> Result<SearchResults, MemoryError> {
        validate_limit(limit)?;
        let started = Instant::now();
        let results = match mode {
            SearchMode::Chronological => self.recent_hits(None, limit).await?,
            SearchMode::Vector | SearchMode::Hybrid => {
                if query.trim().is_empty() {
                    return Err(MemoryError::Validation(format!(
                        "query required for {mode} search"
                    )));
                }
                let embedding = self.embedder.embed(query).await?;
                let vector = self.codec().await?.to_param(&embedding)?;
                let rows = self
                    .execute_one(Statement::with_params(
                        sql::SEARCH_VECTOR,
                        vec![vector, self.namespace.clone().into(), limit_param(limit)],
                    ))
                    .await?;
                scored_hits(rows)?
            }
        };
        debug!(
            "search complete (namespace={}, mode={}, results={})",
            self.namespace,
            mode,
            results.len()
        );
        Ok(self.result_set(results, started, mode))
    }

    /// Most recent records, optionally restricted to one metadata `type`.
    pub async fn recent(
        &self,
        memory_type: Option<&str>,
        limit: usize,
    ) -> Result<SearchResults, MemoryError> {
        validate_limit(limit)?;
        let started = Instant::now();
        let results = self.recent_hits(memory_type, limit).await?;
        Ok(self.result_set(results, started, SearchMode::Chronological))
    }

    /// Fetch a full record by id.
    pub async fn get(&self, id: &str) -> Result<MemoryRecord, MemoryError> {
        let rows = self
            .execute_one(Statement::with_params(
                sql::GET_MEMORY,
                vec![id.into(), self.namespace.clone().into()],
            ))
            .await?;
        let Some(row) = rows.rows.first() else {
            return Err(MemoryError::NotFound(id.to_string()));
        };
        let codec = self.known_codec();
        let embedding = codec.decode(blob_at(row, 3, "embedding")?)?;
        Ok(MemoryRecord {
            id: text_at(row, 0, "id")?.to_string(),
            namespace: text_at(row, 1, "namespace")?.to_string(),
            content: text_at(row, 2, "content")?.to_string(),
            embedding,
            metadata: metadata_at(row, 4)?,
            created_at: timestamp_from_secs(int_at(row, 5, "created_at")?)?,
            updated_at: timestamp_from_secs(int_at(row, 6, "updated_at")?)?,
        })
    }

    /// Records nearest to a stored record, excluding the record itself.
    pub async fn related(
        &self,
        id: &str,
        limit: usize,
        min_similarity: f64,
    ) -> Result<SearchResults, MemoryError> {
        validate_limit(limit)?;
        let started = Instant::now();
        let record = self.get(id).await?;
        let vector = self.codec().await?.to_param(&record.embedding)?;
        let rows = self
            .execute_one(Statement::with_params(
                sql::SEARCH_RELATED,
                vec![
                    vector,
                    self.namespace.clone().into(),
                    id.into(),
                    limit_param(limit),
                ],
            ))
            .await?;
        let results = scored_hits(rows)?
            .into_iter()
            .filter(|hit| hit.similarity >= min_similarity)
            .collect();
        Ok(self.result_set(results, started, SearchMode::Vector))
    }

    /// Count and temporal extent of the namespace.
    pub async fn get_stats(&self) -> Result<MemoryStats, MemoryError> {
        let rows = self
            .execute_one(Statement::with_params(
                sql::STATS,
                vec![self.namespace.clone().into()],
            ))
            .await?;
        let mut stats = MemoryStats {
            namespace: self.namespace.clone(),
            memory_count: 0,
            first_memory_at: None,
            last_memory_at: None,
        };
        let Some(row) = rows.rows.first() else {
            return Ok(stats);
        };
        let count = row.first().and_then(SqlValue::as_i64).unwrap_or(0);
        if count <= 0 {
            return Ok(stats);
        }
        stats.memory_count = count as u64;
        stats.first_memory_at = optional_timestamp(row.get(1))?;
        stats.last_memory_at = optional_timestamp(row.get(2))?;
        Ok(stats)
    }

    /// Probe both dependencies; failures are reported, never raised.
    pub async fn health_check(&self) -> HealthReport {
        let (embedding, store) = tokio::join!(
            tokio::time::timeout(self.health_timeout, self.embedder.probe()),
            tokio::time::timeout(self.health_timeout, self.store.probe()),
        );
        let embedding_ok = probe_ok("embedding provider", embedding);
        let store_ok = probe_ok("vector store", store);
        let report = HealthReport::from_probes(embedding_ok, store_ok);
        debug!(
            "health check (namespace={}, status={:?})",
            self.namespace, report.status
        );
        report
    }

    async fn recent_hits(
        &self,
        memory_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryHit>, MemoryError> {
        let statement = match memory_type {
            Some(memory_type) => Statement::with_params(
                sql::SEARCH_RECENT_BY_TYPE,
                vec![
                    self.namespace.clone().into(),
                    memory_type.into(),
                    limit_param(limit),
                ],
            ),
            None => Statement::with_params(
                sql::SEARCH_RECENT,
                vec![self.namespace.clone().into(), limit_param(limit)],
            ),
        };
        let rows = self.execute_one(statement).await?;
        rows.rows
            .iter()
            .map(|row| hit_from_row(row, 1.0))
            .collect()
    }

    fn result_set(
        &self,
        results: Vec<MemoryHit>,
        started: Instant,
        mode: SearchMode,
    ) -> SearchResults {
        SearchResults {
            results,
            query_time_ms: started.elapsed().as_millis() as u64,
            namespace: self.namespace.clone(),
            mode,
        }
    }

    async fn execute_one(&self, statement: Statement) -> Result<ResultSet, MemoryError> {
        self.store
            .execute(vec![statement])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::Storage("empty store response".to_string()))?
            .into_result_set()
    }

    /// Codec for the namespace, learning dimensionality from stored data once.
    async fn codec(&self) -> Result<VectorCodec, MemoryError> {
        if let Some(dimensions) = *self.dimensions.read() {
            return Ok(VectorCodec::with_dimensions(dimensions));
        }
        let rows = self
            .execute_one(Statement::with_params(
                sql::SAMPLE_EMBEDDING,
                vec![self.namespace.clone().into()],
            ))
            .await?;
        let Some(row) = rows.rows.first() else {
            return Ok(VectorCodec::new());
        };
        let sample = VectorCodec::new().decode(blob_at(row, 0, "embedding")?)?;
        debug!(
            "learned dimensions from stored data (namespace={}, dimensions={})",
            self.namespace,
            sample.len()
        );
        self.establish_dimensions(sample.len());
        Ok(VectorCodec::with_dimensions(sample.len()))
    }

    fn known_codec(&self) -> VectorCodec {
        match *self.dimensions.read() {
            Some(dimensions) => VectorCodec::with_dimensions(dimensions),
            None => VectorCodec::new(),
        }
    }

    fn establish_dimensions(&self, dimensions: usize) {
        let mut known = self.dimensions.write();
        if known.is_none() {
            *known = Some(dimensions);
        }
    }
}

/// Generate a fresh record id.
fn new_memory_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("mem_{}", &uuid[..12])
}

fn validate_limit(limit: usize) -> Result<(), MemoryError> {
    if limit == 0 {
        return Err(MemoryError::Validation(
            "limit must be a positive integer".to_string(),
        ));
    }
    if limit > MAX_SEARCH_LIMIT {
        return Err(MemoryError::Validation(format!(
            "limit must be at most {MAX_SEARCH_LIMIT}"
        )));
    }
    Ok(())
}

fn limit_param(limit: usize) -> SqlValue {
    SqlValue::Integer(limit as i64)
}

fn probe_ok(
    name: &str,
    outcome: Result<Result<(), MemoryError>, tokio::time::error::Elapsed>,
) -> bool {
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!("health probe failed (service={name}, error={err})");
            false
        }
        Err(_) => {
            warn!("health probe timed out (service={name})");
            false
        }
    }
}

/// Map distance-bearing rows (`id, content, metadata, created_at, distance`) to hits.
fn scored_hits(rows: ResultSet) -> Result<Vec<MemoryHit>, MemoryError> {
    rows.rows
        .iter()
        .map(|row| {
            let distance = row
                .get(4)
                .and_then(SqlValue::as_f64)
                .ok_or_else(|| malformed_row("distance"))?;
            hit_from_row(row, (1.0 - distance).clamp(-1.0, 1.0))
        })
        .collect()
}

fn hit_from_row(row: &[SqlValue], similarity: f64) -> Result<MemoryHit, MemoryError> {
    Ok(MemoryHit {
        id: text_at(row, 0, "id")?.to_string(),
        text: text_at(row, 1, "content")?.to_string(),
        similarity,
        created_at: timestamp_from_secs(int_at(row, 3, "created_at")?)?,
        metadata: metadata_at(row, 2)?,
    })
}

fn malformed_row(column: &str) -> MemoryError {
    MemoryError::Storage(format!("malformed row: missing or invalid {column}"))
}

fn text_at<'a>(row: &'a [SqlValue], index: usize, column: &str) -> Result<&'a str, MemoryError> {
    row.get(index)
        .and_then(SqlValue::as_str)
        .ok_or_else(|| malformed_row(column))
}

fn int_at(row: &[SqlValue], index: usize, column: &str) -> Result<i64, MemoryError> {
    row.get(index)
        .and_then(SqlValue::as_i64)
        .ok_or_else(|| malformed_row(column))
}

fn blob_at<'a>(row: &'a [SqlValue], index: usize, column: &str) -> Result<&'a str, MemoryError> {
    row.get(index)
        .and_then(SqlValue::as_blob)
        .ok_or_else(|| malformed_row(column))
}

fn metadata_at(row: &[SqlValue], index: usize) -> Result<serde_json::Value, MemoryError> {
    match row.get(index) {
        None | Some(SqlValue::Null) => Ok(serde_json::json!({})),
        Some(SqlValue::Text(text)) if text.trim().is_empty() => Ok(serde_json::json!({})),
        Some(SqlValue::Text(text)) => serde_json::from_str(text)
            .map_err(|err| MemoryError::Storage(format!("malformed metadata: {err}"))),
        Some(_) => Err(malformed_row("metadata")),
    }
}

fn optional_timestamp(
    value: Option<&SqlValue>,
) -> Result<Option<chrono::DateTime<Utc>>, MemoryError> {
    match value.and_then(SqlValue::as_i64) {
        Some(secs) => Ok(Some(timestamp_from_secs(secs)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::{metadata_at, new_memory_id, scored_hits, validate_limit};
    use crate::error::MemoryError;
    use crate::store::{ResultSet, SqlValue};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn memory_ids_are_prefixed_hex() {
        let id = new_memory_id();
        assert!(id.starts_with("mem_"));
        assert_eq!(id.len(), 16);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_memory_id());
    }

    #[test]
    fn limit_must_be_within_bounds() {
        assert!(matches!(validate_limit(0), Err(MemoryError::Validation(_))));
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(100).is_ok());
        assert!(validate_limit(101).is_err());
    }

    #[test]
    fn distance_maps_to_clamped_similarity() {
        let row = |id: &str, distance: f64| {
            vec![
                SqlValue::Text(id.to_string()),
                SqlValue::Text("content".to_string()),
                SqlValue::Text(r#"{"type":"technical"}"#.to_string()),
                SqlValue::Integer(1_700_000_000),
                SqlValue::Float(distance),
            ]
        };
        let rows = ResultSet {
            columns: Vec::new(),
            rows: vec![row("a", 0.1), row("b", -0.000001), row("c", 2.5)],
        };
        let hits = scored_hits(rows).expect("hits");
        assert!((hits[0].similarity - 0.9).abs() < 1e-9);
        assert_eq!(hits[1].similarity, 1.0);
        assert_eq!(hits[2].similarity, -1.0);
        assert_eq!(hits[0].memory_type(), Some("technical"));
    }

    #[test]
    fn metadata_defaults_to_empty_object() {
        assert_eq!(metadata_at(&[SqlValue::Null], 0).expect("meta"), json!({}));
        assert_eq!(
            metadata_at(&[SqlValue::Text(String::new())], 0).expect("meta"),
            json!({})
        );
        assert!(metadata_at(&[SqlValue::Text("{oops".to_string())], 0).is_err());
    }
}
