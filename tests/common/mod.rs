//! Shared fixtures for integration tests.

use document_rag::embedding::Embedder;
use document_rag::error::EmbeddingError;

/// Deterministic embedder that hashes lowercase word tokens into a fixed
/// number of buckets and unit-normalizes the result. Texts sharing vocabulary
/// get positive cosine similarity without any model download.
pub struct TokenHashEmbedder;

pub const DIM: usize = 32;

impl Embedder for TokenHashEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| embed_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "token-hash-test"
    }
}

pub fn embed_one(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % DIM as u64) as usize] += 1.0;
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}
