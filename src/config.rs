/// Configuration system for document-rag
///
/// Supports loading from multiple sources with priority:
/// Environment variables > Config file > Defaults
use crate::error::{ConfigError, RagError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chunking configuration
    pub chunking: ChunkingConfig,

    /// Embedding model configuration
    pub embedding: EmbeddingConfig,

    /// Retrieval configuration
    pub retrieval: RetrievalConfig,

    /// Local index storage configuration
    pub storage: StorageConfig,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive windows in characters (must be < chunk_size)
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Minimum collapsed-text length for a window to become a chunk
    #[serde(default = "default_min_chunk_len")]
    pub min_chunk_len: usize,

    /// Hard cap on chunks per document; excess windows are dropped
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout in seconds for one embedding batch
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of results to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Bucket width in characters for near-adjacent deduplication
    #[serde(default = "default_dedup_bucket_chars")]
    pub dedup_bucket_chars: usize,

    /// Minimum top score for the synthesizer to consider results relevant
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: f32,
}

/// Local index storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the redb database file
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
}

// Default value functions
fn default_chunk_size() -> usize {
    800
}

fn default_overlap() -> usize {
    120
}

fn default_min_chunk_len() -> usize {
    40
}

fn default_max_chunks() -> usize {
    1200
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    4
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_top_k() -> usize {
    6
}

fn default_dedup_bucket_chars() -> usize {
    200
}

fn default_relevance_floor() -> f32 {
    0.1
}

fn default_index_path() -> PathBuf {
    crate::paths::PlatformPaths::default_index_path()
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            min_chunk_len: default_min_chunk_len(),
            max_chunks: default_max_chunks(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            dedup_bucket_chars: default_dedup_bucket_chars(),
            relevance_floor: default_relevance_floor(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunking.chunk_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "chunking.overlap".to_string(),
                reason: format!(
                    "must be smaller than chunk_size ({}), got {}",
                    self.chunking.chunk_size, self.chunking.overlap
                ),
            }
            .into());
        }

        if self.chunking.max_chunks == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunking.max_chunks".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.batch_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retrieval.top_k".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.retrieval.dedup_bucket_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retrieval.dedup_bucket_chars".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if !(0.0..=1.0).contains(&self.retrieval.relevance_floor) {
            return Err(ConfigError::InvalidValue {
                key: "retrieval.relevance_floor".to_string(),
                reason: format!(
                    "must be between 0.0 and 1.0, got {}",
                    self.retrieval.relevance_floor
                ),
            }
            .into());
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Embedding model
        if let Ok(model) = std::env::var("DOCUMENT_RAG_MODEL") {
            self.embedding.model_name = model;
        }

        // Index path
        if let Ok(path) = std::env::var("DOCUMENT_RAG_INDEX_PATH") {
            self.storage.index_path = PathBuf::from(path);
        }

        // Batch size
        if let Ok(batch_size) = std::env::var("DOCUMENT_RAG_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.embedding.batch_size = size;
        }

        // Top-K
        if let Ok(top_k) = std::env::var("DOCUMENT_RAG_TOP_K")
            && let Ok(k) = top_k.parse()
        {
            self.retrieval.top_k = k;
        }

        // Relevance floor
        if let Ok(floor) = std::env::var("DOCUMENT_RAG_RELEVANCE_FLOOR")
            && let Ok(value) = floor.parse()
        {
            self.retrieval.relevance_floor = value;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
