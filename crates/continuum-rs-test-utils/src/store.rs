use async_trait::async_trait;
use continuum_rs_memory::sql;
use continuum_rs_memory::{
    MemoryError, SqlValue, Statement, StatementResult, VectorCodec, VectorStore,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// One row of the in-memory `memories` table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub rowid: i64,
    pub id: String,
    pub namespace: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Default)]
struct Table {
    dimensions: Option<usize>,
    rows: Vec<StoredRow>,
    next_rowid: i64,
    executed: Vec<String>,
}

/// Vector store fake that executes the client's statements in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorStore {
    table: Arc<Mutex<Table>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing the client.
    pub fn seed(
        &self,
        namespace: &str,
        id: &str,
        content: &str,
        embedding: Vec<f32>,
        metadata: serde_json::Value,
        created_at: i64,
    ) {
        let mut table = self.table.lock();
        table.next_rowid += 1;
        let rowid = table.next_rowid;
        table.rows.push(StoredRow {
            rowid,
            id: id.to_string(),
            namespace: namespace.to_string(),
            content: content.to_string(),
            embedding,
            metadata: metadata.to_string(),
            created_at,
            updated_at: created_at,
        });
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.table.lock().rows.clone()
    }

    pub fn schema_dimensions(&self) -> Option<usize> {
        self.table.lock().dimensions
    }

    /// Query text of every statement executed so far.
    pub fn executed(&self) -> Vec<String> {
        self.table.lock().executed.clone()
    }

    fn run(table: &mut Table, statement: &Statement) -> StatementResult {
        table.executed.push(statement.q.clone());
        let params = &statement.params;
        match statement.q.as_str() {
            "SELECT 1" => StatementResult::rows(&["1"], vec![vec![SqlValue::Integer(1)]]),
            q if q.starts_with("CREATE TABLE") => {
                match q
                    .split("F32_BLOB(")
                    .nth(1)
                    .and_then(|rest| rest.split(')').next())
                    .and_then(|digits| digits.parse::<usize>().ok())
                {
                    Some(dimensions) => {
                        table.dimensions.get_or_insert(dimensions);
                        StatementResult::rows(&[], Vec::new())
                    }
                    None => StatementResult::error("missing vector column"),
                }
            }
            q if q.starts_with("CREATE INDEX") => StatementResult::rows(&[], Vec::new()),
            sql::INSERT_MEMORY => insert(table, params),
            sql::SEARCH_VECTOR => nearest(
                table,
                param_blob(params, 0),
                text(params, 1),
                None,
                int(params, 2),
            ),
            sql::SEARCH_RELATED => nearest(
                table,
                param_blob(params, 0),
                text(params, 1),
                text(params, 2),
                int(params, 3),
            ),
            sql::SEARCH_RECENT => recent(table, text(params, 0), None, int(params, 1)),
            sql::SEARCH_RECENT_BY_TYPE => {
                recent(table, text(params, 0), text(params, 1), int(params, 2))
            }
            sql::GET_MEMORY => {
                let (Some(id), Some(namespace)) = (text(params, 0), text(params, 1)) else {
                    return StatementResult::error("missing parameters");
                };
                let rows = table
                    .rows
                    .iter()
                    .filter(|row| row.id == id && row.namespace == namespace)
                    .map(|row| {
                        vec![
                            row.id.clone().into(),
                            row.namespace.clone().into(),
                            row.content.clone().into(),
                            blob(&row.embedding),
                            row.metadata.clone().into(),
                            row.created_at.into(),
                            row.updated_at.into(),
                        ]
                    })
                    .collect();
                StatementResult::rows(
                    &[
                        "id",
                        "namespace",
                        "content",
                        "embedding",
                        "metadata",
                        "created_at",
                        "updated_at",
                    ],
                    rows,
                )
            }
            sql::SAMPLE_EMBEDDING => {
                let namespace = text(params, 0);
                let rows = table
                    .rows
                    .iter()
                    .filter(|row| Some(row.namespace.as_str()) == namespace)
                    .take(1)
                    .map(|row| vec![blob(&row.embedding)])
                    .collect();
                StatementResult::rows(&["embedding"], rows)
            }
            sql::STATS => {
                let namespace = text(params, 0);
                let scoped: Vec<&StoredRow> = table
                    .rows
                    .iter()
                    .filter(|row| Some(row.namespace.as_str()) == namespace)
                    .collect();
                let first = scoped.iter().map(|row| row.created_at).min();
                let last = scoped.iter().map(|row| row.created_at).max();
                StatementResult::rows(
                    &["count", "first", "last"],
                    vec![vec![
                        SqlValue::Integer(scoped.len() as i64),
                        first.map(SqlValue::Integer).unwrap_or(SqlValue::Null),
                        last.map(SqlValue::Integer).unwrap_or(SqlValue::Null),
                    ]],
                )
            }
            other => StatementResult::error(format!("unsupported statement: {other}")),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn execute(
        &self,
        statements: Vec<Statement>,
    ) -> Result<Vec<StatementResult>, MemoryError> {
        let mut table = self.table.lock();
        Ok(statements
            .iter()
            .map(|statement| Self::run(&mut table, statement))
            .collect())
    }
}

/// Vector store that is unreachable, or reachable but rejecting every statement.
#[derive(Debug, Clone, Copy, Default)]
pub enum FailingVectorStore {
    #[default]
    Unreachable,
    Rejecting,
}

#[async_trait]
impl VectorStore for FailingVectorStore {
    async fn execute(
        &self,
        statements: Vec<Statement>,
    ) -> Result<Vec<StatementResult>, MemoryError> {
        match self {
            FailingVectorStore::Unreachable => {
                Err(MemoryError::Storage("connection refused".to_string()))
            }
            FailingVectorStore::Rejecting => Ok(statements
                .iter()
                .map(|_| StatementResult::error("SQLITE_ERROR: no such table: memories"))
                .collect()),
        }
    }
}

/// In-memory store that sleeps before executing each batch.
#[derive(Debug, Clone)]
pub struct SlowVectorStore {
    delay: Duration,
    inner: InMemoryVectorStore,
}

impl SlowVectorStore {
    pub fn new(delay: Duration, inner: InMemoryVectorStore) -> Self {
        Self { delay, inner }
    }
}

#[async_trait]
impl VectorStore for SlowVectorStore {
    async fn execute(
        &self,
        statements: Vec<Statement>,
    ) -> Result<Vec<StatementResult>, MemoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.execute(statements).await
    }
}

fn insert(table: &mut Table, params: &[SqlValue]) -> StatementResult {
    let (Some(id), Some(namespace), Some(content), Some(token), Some(metadata)) = (
        text(params, 0),
        text(params, 1),
        text(params, 2),
        param_blob(params, 3),
        text(params, 4),
    ) else {
        return StatementResult::error("missing parameters");
    };
    let embedding = match VectorCodec::new().decode(token) {
        Ok(embedding) => embedding,
        Err(err) => return StatementResult::error(err.to_string()),
    };
    let expected = table
        .dimensions
        .or_else(|| table.rows.first().map(|row| row.embedding.len()));
    if let Some(expected) = expected
        && expected != embedding.len()
    {
        return StatementResult::error(format!(
            "vector dimensions differ: {} != {expected}",
            embedding.len()
        ));
    }
    if table.rows.iter().any(|row| row.id == id) {
        return StatementResult::error("UNIQUE constraint failed: memories.id");
    }
    table.next_rowid += 1;
    let row = StoredRow {
        rowid: table.next_rowid,
        id: id.to_string(),
        namespace: namespace.to_string(),
        content: content.to_string(),
        embedding,
        metadata: metadata.to_string(),
        created_at: int(params, 5).unwrap_or_default(),
        updated_at: int(params, 6).unwrap_or_default(),
    };
    table.rows.push(row);
    StatementResult::rows(&[], Vec::new())
}

fn nearest(
    table: &Table,
    token: Option<&str>,
    namespace: Option<&str>,
    exclude: Option<&str>,
    limit: Option<i64>,
) -> StatementResult {
    let Some(query) = token.and_then(|token| VectorCodec::new().decode(token).ok()) else {
        return StatementResult::error("invalid vector parameter");
    };
    let mut scored: Vec<(f64, &StoredRow)> = table
        .rows
        .iter()
        .filter(|row| Some(row.namespace.as_str()) == namespace)
        .filter(|row| exclude != Some(row.id.as_str()))
        .map(|row| (cosine_distance(&query, &row.embedding), row))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.rowid.cmp(&b.1.rowid)));
    let rows = scored
        .into_iter()
        .take(limit.unwrap_or_default().max(0) as usize)
        .map(|(distance, row)| {
            vec![
                row.id.clone().into(),
                row.content.clone().into(),
                row.metadata.clone().into(),
                row.created_at.into(),
                SqlValue::Float(distance),
            ]
        })
        .collect();
    StatementResult::rows(&["id", "content", "metadata", "created_at", "distance"], rows)
}

fn recent(
    table: &Table,
    namespace: Option<&str>,
    memory_type: Option<&str>,
    limit: Option<i64>,
) -> StatementResult {
    let mut scoped: Vec<&StoredRow> = table
        .rows
        .iter()
        .filter(|row| Some(row.namespace.as_str()) == namespace)
        .filter(|row| match memory_type {
            Some(memory_type) => metadata_type(&row.metadata).as_deref() == Some(memory_type),
            None => true,
        })
        .collect();
    scoped.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.rowid.cmp(&a.rowid)));
    let rows = scoped
        .into_iter()
        .take(limit.unwrap_or_default().max(0) as usize)
        .map(|row| {
            vec![
                row.id.clone().into(),
                row.content.clone().into(),
                row.metadata.clone().into(),
                row.created_at.into(),
            ]
        })
        .collect();
    StatementResult::rows(&["id", "content", "metadata", "created_at"], rows)
}

fn metadata_type(metadata: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(metadata)
        .ok()?
        .get("type")?
        .as_str()
        .map(str::to_string)
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 2.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

fn blob(embedding: &[f32]) -> SqlValue {
    VectorCodec::new().to_param(embedding).unwrap_or(SqlValue::Null)
}

fn text(params: &[SqlValue], index: usize) -> Option<&str> {
    params.get(index).and_then(SqlValue::as_str)
}

fn int(params: &[SqlValue], index: usize) -> Option<i64> {
    params.get(index).and_then(SqlValue::as_i64)
}

fn param_blob(params: &[SqlValue], index: usize) -> Option<&str> {
    params.get(index).and_then(SqlValue::as_blob)
}
