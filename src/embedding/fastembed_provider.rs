use super::Embedder;
use crate::error::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// FastEmbed-based embedding provider using all-MiniLM-L6-v2 by default.
///
/// The underlying model is created once and guarded by a mutex; the fastembed
/// call itself requires exclusive access.
pub struct FastEmbedProvider {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedProvider {
    /// Create a provider with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2, "all-MiniLM-L6-v2")
    }

    /// Create a provider from a configured model name
    pub fn from_model_name(name: &str) -> Result<Self, EmbeddingError> {
        let model = match name {
            "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
            "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
            "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "BAAI/bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            other => {
                return Err(EmbeddingError::ModelUnavailable(format!(
                    "unknown embedding model '{}'",
                    other
                )));
            }
        };
        Self::with_model(model, name)
    }

    fn with_model(model: EmbeddingModel, name: &str) -> Result<Self, EmbeddingError> {
        info!("Initializing FastEmbed model: {:?}", model);

        let dimension = match model {
            EmbeddingModel::AllMiniLML6V2 => 384,
            EmbeddingModel::AllMiniLML12V2 => 384,
            EmbeddingModel::BGEBaseENV15 => 768,
            EmbeddingModel::BGESmallENV15 => 384,
            _ => 384,
        };

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = false;

        let text_embedding = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(text_embedding),
            dimension,
            model_name: name.to_string(),
        })
    }

    /// Process-wide shared instance of the default model, created on first
    /// use and reused for the process lifetime.
    pub fn shared() -> Result<Arc<Self>, EmbeddingError> {
        static SHARED: Mutex<Option<Arc<FastEmbedProvider>>> = Mutex::new(None);

        let mut guard = SHARED
            .lock()
            .map_err(|e| EmbeddingError::ModelUnavailable(format!("shared model lock poisoned: {}", e)))?;
        if let Some(provider) = guard.as_ref() {
            return Ok(provider.clone());
        }
        let provider = Arc::new(Self::new()?);
        *guard = Some(provider.clone());
        Ok(provider)
    }
}

impl Embedder for FastEmbedProvider {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let expected = texts.len();
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::ModelUnavailable(format!("model lock poisoned: {}", e)))?;
        let embeddings = model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::GenerationFailed(e.to_string()))?;
        drop(model);

        if embeddings.len() != expected {
            return Err(EmbeddingError::GenerationFailed(format!(
                "expected {} embeddings, got {}",
                expected,
                embeddings.len()
            )));
        }
        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings.into_iter().map(unit_normalize).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Scale a vector to unit length so cosine similarity reduces to a dot
/// product for downstream consumers. Zero vectors are left untouched.
fn unit_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}
