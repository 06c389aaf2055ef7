//! Tests for layered configuration loading.

use super::*;
use crate::{RetrievalMode, SessionCategory};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Options that only see the given user file and nothing from the real home.
fn isolated_options(cwd: &Path, user: Option<PathBuf>) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::new(cwd);
    options.user_config_path = user;
    options
}

#[test]
fn parse_minimal_config() {
    let config = ContinuumConfig::load_from_str("{}").expect("config");
    assert_eq!(config.agent_id, "main");
    assert_eq!(config.embedding.url, "http://localhost:11434");
    assert_eq!(config.embedding.model, "nomic-embed-text");
    assert_eq!(config.embedding.dimensions, None);
    assert_eq!(config.embedding.timeout_secs, 30);
    assert_eq!(config.vector_store.url, "http://localhost:8787");
    assert_eq!(config.retrieval.min_similarity, 0.7);
    assert_eq!(config.retrieval.limit, 10);
    assert_eq!(config.retrieval.mode, RetrievalMode::Vector);
    assert_eq!(config.session.bridge_limit, 3);
    assert_eq!(config.session.user_name, "User");
    assert_eq!(config.health.timeout_secs, 5);
    let types: Vec<(&str, usize)> = config
        .session
        .categories
        .iter()
        .map(|category| (category.memory_type.as_str(), category.limit))
        .collect();
    assert_eq!(types, vec![("preference", 5), ("project", 3)]);
}

#[test]
fn parses_json5_with_comments_and_categories() {
    let json5 = r#"{
        // agent scoped memories
        agent_id: "coder",
        embedding: { model: "mxbai-embed-large", dimensions: 1024 },
        vector_store: { url: "https://db.example.com", auth_token: "tok" },
        retrieval: { mode: "hybrid", min_similarity: 0.5 },
        session: { categories: [{ type: "decision", limit: 2, title: "Decisions" }] },
    }"#;
    let config = ContinuumConfig::load_from_str(json5).expect("config");
    assert_eq!(config.agent_id, "coder");
    assert_eq!(config.embedding.dimensions, Some(1024));
    assert_eq!(config.vector_store.auth_token.as_deref(), Some("tok"));
    assert_eq!(config.retrieval.mode, RetrievalMode::Hybrid);
    assert_eq!(
        config.session.categories,
        vec![SessionCategory {
            memory_type: "decision".to_string(),
            limit: 2,
            title: Some("Decisions".to_string()),
        }]
    );
}

#[test]
fn rejects_unknown_top_level_key() {
    let err = ContinuumConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

#[test]
fn rejects_invalid_retrieval_mode() {
    let err = ContinuumConfig::load_from_str(r#"{ retrieval: { mode: "fuzzy" } }"#).unwrap_err();
    assert!(format!("{err}").contains("retrieval.mode"));
}

#[test]
fn rejects_category_without_type() {
    let err =
        ContinuumConfig::load_from_str("{ session: { categories: [{ limit: 2 }] } }").unwrap_err();
    assert!(format!("{err}").contains("session.categories[0].type"));
}

#[test]
fn rejects_non_http_urls() {
    let err =
        ContinuumConfig::load_from_str(r#"{ embedding: { url: "localhost:11434" } }"#).unwrap_err();
    assert!(format!("{err}").contains("embedding.url"));
}

#[test]
fn validate_rejects_out_of_range_values() {
    for json5 in [
        r#"{ agent_id: "  " }"#,
        "{ health: { timeout_secs: 0 } }",
        "{ retrieval: { min_similarity: 1.5 } }",
        "{ retrieval: { limit: 0 } }",
        "{ embedding: { dimensions: 0 } }",
        r#"{ session: { categories: [{ type: "preference", limit: 500 }] } }"#,
    ] {
        let err = ContinuumConfig::load_from_str(json5).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{json5}: {err}");
    }
}

#[test]
fn parse_errors_name_the_layer() {
    let temp = TempDir::new().expect("tmp");
    let path = temp.path().join("broken.json5");
    write_json5(&path, "{ agent_id: ");
    let err = ContinuumConfig::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseFailed { .. }));
    assert!(format!("{err}").contains("broken.json5"));
}

#[test]
fn missing_file_is_a_read_error() {
    let temp = TempDir::new().expect("tmp");
    let err = ContinuumConfig::load_from_path(temp.path().join("absent.json5")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed { .. }));
}

#[test]
fn layered_config_prefers_cwd_over_project_and_user() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("user.json5");
    write_json5(
        &user_config,
        r#"{ agent_id: "user", embedding: { model: "user-model" } }"#,
    );
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        r#"{ agent_id: "project", retrieval: { limit: 4 } }"#,
    );
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), r#"{ agent_id: "cwd" }"#);

    let layered = ContinuumConfig::load_layered_with_options(isolated_options(
        &cwd,
        Some(user_config),
    ))
    .expect("layered");

    assert_eq!(layered.config.agent_id, "cwd");
    assert_eq!(layered.config.embedding.model, "user-model");
    assert_eq!(layered.config.retrieval.limit, 4);
    let sources: Vec<ConfigLayerSource> =
        layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd
        ]
    );
}

#[test]
fn project_root_used_as_cwd_loads_once() {
    let temp = TempDir::new().expect("tmp");
    let project_root = temp.path().join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    write_json5(&project_root.join(DEFAULT_CONFIG_FILE), r#"{ agent_id: "p" }"#);

    let layered =
        ContinuumConfig::load_layered_with_options(isolated_options(&project_root, None))
            .expect("layered");

    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::Project);
    assert_eq!(layered.config.agent_id, "p");
}

#[test]
fn runtime_override_wins() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(&root.join(DEFAULT_CONFIG_FILE), r#"{ agent_id: "cwd" }"#);
    let runtime_config = root.join("runtime.json5");
    write_json5(&runtime_config, r#"{ agent_id: "runtime" }"#);

    let options = isolated_options(root, None).with_runtime_path(&runtime_config);
    let layered = ContinuumConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.agent_id, "runtime");
    assert_eq!(
        layered.layers.last().map(|layer| layer.source),
        Some(ConfigLayerSource::Runtime)
    );
}

#[test]
fn missing_runtime_override_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options =
        isolated_options(temp.path(), None).with_runtime_path(temp.path().join("nope.json5"));
    let err = ContinuumConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed { .. }));
}

#[test]
fn schema_errors_in_one_layer_fail_the_load() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(
        &root.join(DEFAULT_CONFIG_FILE),
        "{ vector_store: { timeout_secs: \"soon\" } }",
    );
    let err = ContinuumConfig::load_layered_with_options(isolated_options(root, None))
        .unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cwd("));
    assert!(msg.contains("vector_store.timeout_secs"));
}
