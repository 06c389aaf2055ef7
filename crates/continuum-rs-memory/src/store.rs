//! Vector store interface and the HTTP statements-API implementation.

use crate::error::{MemoryError, Service};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single value bound to, or returned from, a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    /// Binary data carried as base64 text.
    Blob { base64: String },
}

impl SqlValue {
    /// Build a blob value from an already-encoded base64 token.
    pub fn blob(base64: impl Into<String>) -> Self {
        SqlValue::Blob {
            base64: base64.into(),
        }
    }

    /// Integer view; integral floats are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(value) => Some(*value),
            SqlValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    /// Floating point view; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            SqlValue::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Base64 payload of a blob value.
    pub fn as_blob(&self) -> Option<&str> {
        match self {
            SqlValue::Blob { base64 } => Some(base64),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

/// Query text plus positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub q: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Statement without parameters.
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            params: Vec::new(),
        }
    }

    /// Statement with positional parameters.
    pub fn with_params(q: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            q: q.into(),
            params,
        }
    }
}

/// Columns and rows returned by a successful statement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<SqlValue>>,
}

/// Per-statement outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatementResult {
    Ok { results: ResultSet },
    Err { error: serde_json::Value },
}

impl StatementResult {
    /// Successful result wrapping the given rows.
    pub fn rows(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        StatementResult::Ok {
            results: ResultSet {
                columns: columns.iter().map(|column| column.to_string()).collect(),
                rows,
            },
        }
    }

    /// Error result carrying a message.
    pub fn error(message: impl Into<String>) -> Self {
        StatementResult::Err {
            error: serde_json::json!({ "message": message.into() }),
        }
    }

    /// Convert into the result set, surfacing store-side errors.
    pub fn into_result_set(self) -> Result<ResultSet, MemoryError> {
        match self {
            StatementResult::Ok { results } => Ok(results),
            StatementResult::Err { error } => {
                let message = error
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .or_else(|| error.as_str().map(str::to_string))
                    .unwrap_or_else(|| error.to_string());
                Err(MemoryError::Storage(message))
            }
        }
    }
}

#[async_trait]
/// Datastore that executes statements and computes vector distances.
pub trait VectorStore: Send + Sync {
    /// Execute statements in order, returning one result per statement.
    async fn execute(
        &self,
        statements: Vec<Statement>,
    ) -> Result<Vec<StatementResult>, MemoryError>;

    /// Cheap reachability check.
    async fn probe(&self) -> Result<(), MemoryError> {
        let mut results = self.execute(vec![Statement::new("SELECT 1")]).await?;
        if results.is_empty() {
            return Err(MemoryError::Storage("empty probe response".to_string()));
        }
        results.remove(0).into_result_set()?;
        Ok(())
    }
}

/// Request body for the statements endpoint.
#[derive(Serialize)]
struct ExecuteRequest<'a> {
    statements: &'a [Statement],
}

/// Vector store reached over the HTTP statements API.
#[derive(Debug, Clone)]
pub struct HttpVectorStore {
    client: reqwest::Client,
    url: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl HttpVectorStore {
    /// Create a store client for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MemoryError> {
        let url = url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| MemoryError::Storage(format!("failed to build http client: {err}")))?;
        info!("initialized http vector store (url={url})");
        Ok(Self {
            client,
            url,
            auth_token: None,
            timeout,
        })
    }

    /// Send a bearer token with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn execute(
        &self,
        statements: Vec<Statement>,
    ) -> Result<Vec<StatementResult>, MemoryError> {
        let http_err =
            |err: reqwest::Error| MemoryError::from_http(Service::VectorStore, self.timeout, err);
        debug!(
            "executing statements (url={}, count={})",
            self.url,
            statements.len()
        );
        let mut request = self.client.post(&self.url).json(&ExecuteRequest {
            statements: &statements,
        });
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)?;
        let body = response.text().await.map_err(http_err)?;
        let results: Vec<StatementResult> = serde_json::from_str(&body)
            .map_err(|err| MemoryError::Storage(format!("malformed store response: {err}")))?;
        if results.len() != statements.len() {
            return Err(MemoryError::Storage(format!(
                "expected {} statement results, got {}",
                statements.len(),
                results.len()
            )));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::{SqlValue, Statement, StatementResult};
    use crate::error::MemoryError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn statement_serializes_blob_params() {
        let statement = Statement::with_params(
            "SELECT vector32(?)",
            vec![SqlValue::blob("AACAPw=="), SqlValue::Null, 7.into()],
        );
        assert_eq!(
            serde_json::to_value(&statement).expect("json"),
            json!({ "q": "SELECT vector32(?)", "params": [{ "base64": "AACAPw==" }, null, 7] })
        );
        let bare = serde_json::to_value(Statement::new("SELECT 1")).expect("json");
        assert_eq!(bare, json!({ "q": "SELECT 1" }));
    }

    #[test]
    fn parses_mixed_statement_results() {
        let body = json!([
            { "results": { "columns": ["n", "d"], "rows": [[1, 0.25]] } },
            { "error": { "message": "no such table: memories" } }
        ]);
        let results: Vec<StatementResult> = serde_json::from_value(body).expect("parse");
        let first = results[0].clone().into_result_set().expect("rows");
        assert_eq!(first.rows[0][0].as_i64(), Some(1));
        assert_eq!(first.rows[0][1].as_f64(), Some(0.25));
        let err = results[1].clone().into_result_set().unwrap_err();
        assert!(matches!(err, MemoryError::Storage(message) if message.contains("no such table")));
    }

    #[test]
    fn string_errors_are_surfaced_verbatim() {
        let result = StatementResult::Err {
            error: json!("SQLITE_CONSTRAINT"),
        };
        let err = result.into_result_set().unwrap_err();
        assert_eq!(err.to_string(), "storage error: SQLITE_CONSTRAINT");
    }
}
