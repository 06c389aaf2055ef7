//! HTTP provider integration tests against local stub servers.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use continuum_rs_memory::{
    EmbeddingProvider, HttpVectorStore, MemoryError, OllamaEmbeddingProvider, SqlValue,
    Statement, VectorStore,
};
use support::Captured;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpListener;

mod support {
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    /// Request bodies and headers seen by a stub server.
    #[derive(Clone, Default)]
    pub struct Captured(Arc<Mutex<Vec<(Option<String>, Value)>>>);

    impl Captured {
        pub fn push(&self, auth: Option<String>, body: Value) {
            self.0.lock().expect("lock").push((auth, body));
        }

        pub fn all(&self) -> Vec<(Option<String>, Value)> {
            self.0.lock().expect("lock").clone()
        }
    }
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn auth_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn embeds_through_api_embed() {
    let captured = Captured::default();
    let app = Router::new()
        .route(
            "/api/embed",
            post(
                |State(captured): State<Captured>, Json(body): Json<Value>| async move {
                    captured.push(None, body);
                    Json(json!({ "embeddings": [[0.25, 0.5, 0.75]] }))
                },
            ),
        )
        .route("/api/version", get(|| async { Json(json!({ "version": "0.5.0" })) }))
        .with_state(captured.clone());
    let url = serve(app).await;

    let provider = OllamaEmbeddingProvider::new(&url, "nomic-embed-text", Duration::from_secs(5))
        .expect("provider");
    let vector = provider.embed("hello world").await.expect("embed");

    assert_eq!(vector, vec![0.25, 0.5, 0.75]);
    assert_eq!(provider.model_name(), "nomic-embed-text");
    let requests = captured.all();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].1,
        json!({ "model": "nomic-embed-text", "input": ["hello world"] })
    );
    provider.probe().await.expect("probe");
}

#[tokio::test]
async fn rejects_wrong_dimension_from_provider() {
    let app = Router::new().route(
        "/api/embed",
        post(|| async { Json(json!({ "embeddings": [[0.1, 0.2]] })) }),
    );
    let url = serve(app).await;
    let provider = OllamaEmbeddingProvider::new(&url, "model", Duration::from_secs(5))
        .expect("provider")
        .with_dimensions(768);

    let err = provider.embed("text").await.expect_err("dimension mismatch");
    assert!(matches!(err, MemoryError::Embedding(_)));
}

#[tokio::test]
async fn provider_http_errors_are_embedding_errors() {
    let app = Router::new().route(
        "/api/embed",
        post(|| async { (StatusCode::NOT_FOUND, "model not found") }),
    );
    let url = serve(app).await;
    let provider =
        OllamaEmbeddingProvider::new(&url, "missing", Duration::from_secs(5)).expect("provider");

    let err = provider.embed("text").await.expect_err("404");
    assert!(matches!(err, MemoryError::Embedding(_)));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let app = Router::new().route(
        "/api/embed",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "embeddings": [[0.1]] }))
        }),
    );
    let url = serve(app).await;
    let provider =
        OllamaEmbeddingProvider::new(&url, "slow", Duration::from_millis(200)).expect("provider");

    let err = provider.embed("text").await.expect_err("timeout");
    assert!(matches!(err, MemoryError::Timeout { .. }));
}

#[tokio::test]
async fn store_posts_statements_with_bearer_token() {
    let captured = Captured::default();
    let app = Router::new()
        .route(
            "/",
            post(
                |State(captured): State<Captured>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    captured.push(auth_header(&headers), body);
                    Json(json!([
                        { "results": { "columns": ["n"], "rows": [[3]] } },
                        { "error": { "message": "no such table: nope" } }
                    ]))
                },
            ),
        )
        .with_state(captured.clone());
    let url = serve(app).await;
    let store = HttpVectorStore::new(&url, Duration::from_secs(5))
        .expect("store")
        .with_auth_token("secret");

    let results = store
        .execute(vec![
            Statement::with_params("SELECT COUNT(*) FROM memories WHERE namespace = ?", vec![
                "agent_main".into(),
            ]),
            Statement::new("SELECT * FROM nope"),
        ])
        .await
        .expect("execute");

    let mut results = results.into_iter();
    let rows = results
        .next()
        .expect("first")
        .into_result_set()
        .expect("rows");
    assert_eq!(rows.rows, vec![vec![SqlValue::Integer(3)]]);
    let err = results
        .next()
        .expect("second")
        .into_result_set()
        .expect_err("store error");
    assert!(matches!(err, MemoryError::Storage(message) if message.contains("no such table")));

    let requests = captured.all();
    assert_eq!(requests[0].0.as_deref(), Some("Bearer secret"));
    assert_eq!(
        requests[0].1,
        json!({ "statements": [
            { "q": "SELECT COUNT(*) FROM memories WHERE namespace = ?", "params": ["agent_main"] },
            { "q": "SELECT * FROM nope" }
        ] })
    );
}

#[tokio::test]
async fn store_rejects_short_responses() {
    let app = Router::new().route("/", post(|| async { Json(json!([])) }));
    let url = serve(app).await;
    let store = HttpVectorStore::new(&url, Duration::from_secs(5)).expect("store");

    let err = store
        .execute(vec![Statement::new("SELECT 1")])
        .await
        .expect_err("mismatched count");
    assert!(matches!(err, MemoryError::Storage(_)));
}

#[tokio::test]
async fn unreachable_store_fails_probe() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let store = HttpVectorStore::new(format!("http://{addr}"), Duration::from_secs(2))
        .expect("store");

    let err = store.probe().await.expect_err("unreachable");
    assert!(matches!(err, MemoryError::Storage(_)));
}
