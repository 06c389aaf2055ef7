use async_trait::async_trait;
use continuum_rs_memory::{EmbeddingProvider, MemoryError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Deterministic bag-of-words embedder; shared words raise similarity.
#[derive(Debug)]
pub struct HashingEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed_batch` calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut any = false;
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
        {
            let bucket = (fnv1a(&word.to_lowercase()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
            any = true;
        }
        if !any {
            vector[0] = 1.0;
        }
        normalize(vector)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs.iter().map(|input| self.vector_for(input)).collect())
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

/// Embedder returning registered vectors, falling back to hashing.
#[derive(Debug, Clone)]
pub struct FixedEmbedder {
    vectors: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    fallback: Arc<HashingEmbedder>,
}

impl FixedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            vectors: Arc::new(Mutex::new(HashMap::new())),
            fallback: Arc::new(HashingEmbedder::new(dimensions)),
        }
    }

    pub fn with(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.insert(text, vector);
        self
    }

    pub fn insert(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.vectors.lock().insert(text.into(), vector);
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        let vectors = self.vectors.lock();
        Ok(inputs
            .iter()
            .map(|input| {
                vectors
                    .get(input)
                    .cloned()
                    .unwrap_or_else(|| self.fallback.vector_for(input))
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

/// Embedder that always fails with the configured error.
#[derive(Debug, Clone, Copy, Default)]
pub enum FailingEmbedder {
    #[default]
    Unreachable,
    TimedOut,
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_batch(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        Err(match self {
            FailingEmbedder::Unreachable => {
                MemoryError::Embedding("connection refused".to_string())
            }
            FailingEmbedder::TimedOut => MemoryError::Timeout {
                service: continuum_rs_memory::Service::EmbeddingProvider,
                timeout: Duration::from_secs(30),
            },
        })
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Embedder that sleeps before answering, for exercising deadlines.
#[derive(Debug)]
pub struct SlowEmbedder {
    delay: Duration,
    inner: HashingEmbedder,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: HashingEmbedder::default(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed_batch(inputs).await
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

fn fnv1a(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}
