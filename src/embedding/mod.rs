//! Embedding generation behind a pluggable provider trait.
//!
//! The production provider is [`FastEmbedProvider`]; test doubles implement
//! [`Embedder`] with deterministic vectors.

mod fastembed_provider;

pub use fastembed_provider::FastEmbedProvider;

use crate::error::EmbeddingError;
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
pub trait Embedder: Send + Sync {
    /// Generate embeddings for a batch of texts, same length and order as the
    /// input. Vectors are unit-normalized.
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    ///
    /// Vectors from different models share no vector space; callers must
    /// re-embed an index after switching models.
    fn model_name(&self) -> &str;
}

/// Shared, injectable embedder handle
pub type SharedEmbedder = Arc<dyn Embedder>;

/// Run one batch through the embedder on a blocking thread, bounded by a
/// timeout so a wedged model call cannot hang the pipeline.
pub async fn embed_with_timeout(
    embedder: SharedEmbedder,
    texts: Vec<String>,
    timeout_secs: u64,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let task = tokio::task::spawn_blocking(move || embedder.embed_batch(texts));

    match tokio::time::timeout(Duration::from_secs(timeout_secs), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(EmbeddingError::GenerationFailed(format!(
            "embedding task panicked: {}",
            join_error
        ))),
        Err(_) => Err(EmbeddingError::Timeout(timeout_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder;

    impl Embedder for FixedEmbedder {
        fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct SlowEmbedder;

    impl Embedder for SlowEmbedder {
        fn embed_batch(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            std::thread::sleep(Duration::from_secs(5));
            Ok(vec![])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_embed_with_timeout_passes_through() {
        let embedder: SharedEmbedder = Arc::new(FixedEmbedder);
        let vectors = embed_with_timeout(embedder, vec!["a".to_string(), "b".to_string()], 30)
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_embed_with_timeout_surfaces_timeout() {
        let embedder: SharedEmbedder = Arc::new(SlowEmbedder);
        let result = embed_with_timeout(embedder, vec!["a".to_string()], 1).await;
        assert!(matches!(result, Err(EmbeddingError::Timeout(1))));
    }
}
