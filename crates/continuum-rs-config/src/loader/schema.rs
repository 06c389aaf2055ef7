//! Schema validation helpers for Continuum JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = [
        "$schema",
        "agent_id",
        "embedding",
        "vector_store",
        "retrieval",
        "session",
        "health",
    ];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("agent_id") {
        expect_string(value, layer, "agent_id")?;
    }
    if let Some(value) = map.get("embedding") {
        validate_embedding(value, layer, "embedding")?;
    }
    if let Some(value) = map.get("vector_store") {
        validate_vector_store(value, layer, "vector_store")?;
    }
    if let Some(value) = map.get("retrieval") {
        validate_retrieval(value, layer, "retrieval")?;
    }
    if let Some(value) = map.get("session") {
        validate_session(value, layer, "session")?;
    }
    if let Some(value) = map.get("health") {
        let map = expect_object(value, layer, "health")?;
        ensure_allowed_keys(map, &["timeout_secs"], layer, "health")?;
        if let Some(value) = map.get("timeout_secs") {
            expect_u64(value, layer, "health.timeout_secs")?;
        }
    }

    Ok(())
}

/// Validate the "embedding" block.
fn validate_embedding(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["url", "model", "dimensions", "timeout_secs"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("url") {
        expect_url(value, layer, &join_path(path, "url"))?;
    }
    if let Some(value) = map.get("model") {
        expect_string(value, layer, &join_path(path, "model"))?;
    }
    if let Some(value) = map.get("dimensions")
        && !value.is_null()
    {
        expect_u64(value, layer, &join_path(path, "dimensions"))?;
    }
    if let Some(value) = map.get("timeout_secs") {
        expect_u64(value, layer, &join_path(path, "timeout_secs"))?;
    }
    Ok(())
}

/// Validate the "vector_store" block.
fn validate_vector_store(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["url", "auth_token", "timeout_secs"], layer, path)?;
    if let Some(value) = map.get("url") {
        expect_url(value, layer, &join_path(path, "url"))?;
    }
    if let Some(value) = map.get("auth_token")
        && !value.is_null()
    {
        expect_string(value, layer, &join_path(path, "auth_token"))?;
    }
    if let Some(value) = map.get("timeout_secs") {
        expect_u64(value, layer, &join_path(path, "timeout_secs"))?;
    }
    Ok(())
}

/// Validate the "retrieval" block.
fn validate_retrieval(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["min_similarity", "limit", "mode"], layer, path)?;
    if let Some(value) = map.get("min_similarity") {
        expect_f64(value, layer, &join_path(path, "min_similarity"))?;
    }
    if let Some(value) = map.get("limit") {
        expect_u64(value, layer, &join_path(path, "limit"))?;
    }
    if let Some(value) = map.get("mode") {
        validate_retrieval_mode(value, layer, &join_path(path, "mode"))?;
    }
    Ok(())
}

/// Validate retrieval mode values.
fn validate_retrieval_mode(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Some(mode) = value.as_str() else {
        return Err(invalid_field(layer, path, "expected string"));
    };
    if matches!(mode, "vector" | "chronological" | "hybrid") {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "invalid retrieval mode"))
    }
}

/// Validate the "session" block.
fn validate_session(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["bridge_limit", "categories", "user_name"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("bridge_limit") {
        expect_u64(value, layer, &join_path(path, "bridge_limit"))?;
    }
    if let Some(value) = map.get("user_name") {
        expect_string(value, layer, &join_path(path, "user_name"))?;
    }
    if let Some(value) = map.get("categories") {
        let arr = expect_array(value, layer, &join_path(path, "categories"))?;
        for (idx, entry) in arr.iter().enumerate() {
            validate_category(entry, layer, &format!("{path}.categories[{idx}]"))?;
        }
    }
    Ok(())
}

/// Validate a single initialize category.
fn validate_category(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["type", "limit", "title"], layer, path)?;

    let type_path = join_path(path, "type");
    let Some(type_value) = map.get("type") else {
        return Err(invalid_field(layer, &type_path, "missing required field"));
    };
    expect_string(type_value, layer, &type_path)?;
    if let Some(value) = map.get("limit") {
        expect_u64(value, layer, &join_path(path, "limit"))?;
    }
    if let Some(value) = map.get("title")
        && !value.is_null()
    {
        expect_string(value, layer, &join_path(path, "title"))?;
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON array or return a typed error.
fn expect_array<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Vec<Value>, ConfigError> {
    match value {
        Value::Array(arr) => Ok(arr),
        _ => Err(invalid_field(layer, path, "expected array")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect an http(s) URL string.
fn expect_url(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value.as_str() {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
        Some(_) => Err(invalid_field(layer, path, "expected http(s) url")),
        None => Err(invalid_field(layer, path, "expected string")),
    }
}

/// Expect a non-negative integer.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Expect a JSON number or return a typed error.
fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
