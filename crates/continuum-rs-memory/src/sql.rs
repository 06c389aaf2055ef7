//! Statement catalogue issued against the vector store.
//!
//! Every statement the client sends is defined here so alternative stores
//! (including in-memory fakes) can match on the exact query text.

/// Insert one record; the embedding parameter is a vector blob.
pub const INSERT_MEMORY: &str = "INSERT INTO memories (id, namespace, content, embedding, metadata, created_at, updated_at) VALUES (?, ?, ?, vector32(?), ?, ?, ?)";

/// Nearest neighbours by cosine distance within a namespace.
pub const SEARCH_VECTOR: &str = "SELECT id, content, metadata, created_at, vector_distance_cos(embedding, vector32(?)) AS distance FROM memories WHERE namespace = ? ORDER BY distance ASC LIMIT ?";

/// Nearest neighbours of a stored record, excluding the record itself.
pub const SEARCH_RELATED: &str = "SELECT id, content, metadata, created_at, vector_distance_cos(embedding, vector32(?)) AS distance FROM memories WHERE namespace = ? AND id != ? ORDER BY distance ASC LIMIT ?";

/// Most recent records within a namespace.
pub const SEARCH_RECENT: &str = "SELECT id, content, metadata, created_at FROM memories WHERE namespace = ? ORDER BY created_at DESC, rowid DESC LIMIT ?";

/// Most recent records of one metadata type within a namespace.
pub const SEARCH_RECENT_BY_TYPE: &str = "SELECT id, content, metadata, created_at FROM memories WHERE namespace = ? AND json_extract(metadata, '$.type') = ? ORDER BY created_at DESC, rowid DESC LIMIT ?";

/// Full record lookup scoped to a namespace.
pub const GET_MEMORY: &str = "SELECT id, namespace, content, embedding, metadata, created_at, updated_at FROM memories WHERE id = ? AND namespace = ?";

/// One stored embedding, used to learn the namespace's dimensionality.
pub const SAMPLE_EMBEDDING: &str = "SELECT embedding FROM memories WHERE namespace = ? LIMIT 1";

/// Count and temporal extent of a namespace.
pub const STATS: &str =
    "SELECT COUNT(*), MIN(created_at), MAX(created_at) FROM memories WHERE namespace = ?";

/// Idempotent schema for vectors of the given dimensionality.
pub fn schema(dimensions: usize) -> Vec<String> {
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS memories (id TEXT PRIMARY KEY, namespace TEXT NOT NULL, content TEXT NOT NULL, embedding F32_BLOB({dimensions}) NOT NULL, metadata TEXT NOT NULL DEFAULT '{{}}', created_at INTEGER NOT NULL, updated_at INTEGER NOT NULL)"
        ),
        "CREATE INDEX IF NOT EXISTS memories_namespace_idx ON memories (namespace)".to_string(),
        "CREATE INDEX IF NOT EXISTS memories_created_at_idx ON memories (created_at)".to_string(),
        "CREATE INDEX IF NOT EXISTS memories_embedding_idx ON memories (libsql_vector_idx(embedding, 'metric=cosine'))".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::schema;

    #[test]
    fn schema_embeds_dimensions() {
        let statements = schema(768);
        assert_eq!(statements.len(), 4);
        assert!(statements[0].contains("F32_BLOB(768)"));
        assert!(statements[0].contains("DEFAULT '{}'"));
        assert!(statements.iter().all(|q| q.contains("IF NOT EXISTS")));
    }
}
