//! Build and query orchestration.
//!
//! [`RagPipeline`] owns the embedder, the index store, and the synthesizer,
//! and composes them into the operations a host application calls: index a
//! document, delete it, retrieve chunks, and answer a question.

use crate::chunker::{self, ChunkOutcome};
use crate::config::Config;
use crate::embedding::{FastEmbedProvider, SharedEmbedder, embed_with_timeout};
use crate::error::{EmbeddingError, RagError};
use crate::extractor;
use crate::retriever::Retriever;
use crate::store::{RedbIndexStore, SharedStore};
use crate::synthesizer::{HeuristicSynthesizer, Synthesizer};
use crate::types::{Chunk, DocumentMeta, IndexReport, Retrieved, SynthesizedAnswer};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Progress stages reported during an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Parse,
    Chunk,
    Embed { done: usize, total: usize },
    Persist,
}

/// Callback invoked as an index build moves through its stages.
pub type ProgressSink = Arc<dyn Fn(BuildStage) + Send + Sync>;

/// Main entry point for indexing and querying documents.
///
/// # Example
///
/// ```no_run
/// use document_rag::{Config, RagPipeline};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let pipeline = RagPipeline::new(Config::new()?).await?;
///
///     let bytes = std::fs::read("paper.pdf")?;
///     let report = pipeline.index_document("paper-1", "paper.pdf", bytes).await?;
///     println!("indexed {} chunks", report.chunks_indexed);
///
///     let answer = pipeline.ask("what is the title?", None).await?;
///     println!("{}", answer.answer);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RagPipeline {
    embedder: SharedEmbedder,
    store: SharedStore,
    synthesizer: Arc<dyn Synthesizer>,
    retriever: Retriever,
    config: Arc<Config>,
    progress: Option<ProgressSink>,
}

impl RagPipeline {
    /// Create a pipeline with the configured embedding model and a redb index
    /// at the configured path.
    ///
    /// The default model is the process-wide shared FastEmbed instance,
    /// created on first use.
    pub async fn new(config: Config) -> Result<Self, RagError> {
        config.validate()?;

        let embedder: SharedEmbedder = if config.embedding.model_name == "all-MiniLM-L6-v2" {
            FastEmbedProvider::shared()?
        } else {
            Arc::new(FastEmbedProvider::from_model_name(
                &config.embedding.model_name,
            )?)
        };

        info!(
            "Initializing RAG pipeline (model: {}, index: {})",
            embedder.model_name(),
            config.storage.index_path.display()
        );

        let store: SharedStore = Arc::new(RedbIndexStore::open(&config.storage.index_path)?);
        Ok(Self::with_parts(embedder, store, config))
    }

    /// Assemble a pipeline from explicit parts.
    ///
    /// Used to inject alternative embedders (e.g. a deterministic test
    /// double), stores, or synthesizers.
    pub fn with_parts(embedder: SharedEmbedder, store: SharedStore, config: Config) -> Self {
        let synthesizer = Arc::new(HeuristicSynthesizer::new(config.retrieval.relevance_floor));
        let retriever = Retriever::new(
            embedder.clone(),
            store.clone(),
            config.retrieval.clone(),
            config.embedding.timeout_secs,
        );
        Self {
            embedder,
            store,
            synthesizer,
            retriever,
            config: Arc::new(config),
            progress: None,
        }
    }

    /// Replace the answer synthesizer (e.g. with a model-backed one).
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Attach a build progress callback.
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    fn report(&self, stage: BuildStage) {
        if let Some(sink) = &self.progress {
            sink(stage);
        }
    }

    /// Index one document: extract text, chunk it, embed the chunks, and
    /// persist chunk/vector pairs.
    ///
    /// Documents are independent; concurrent builds of different document ids
    /// do not interfere. Callers must not build and delete the same document
    /// id concurrently. Re-indexing is delete-then-rebuild.
    pub async fn index_document(
        &self,
        doc_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<IndexReport, RagError> {
        let start = Instant::now();
        info!("Indexing document '{}' from '{}'", doc_id, file_name);

        self.report(BuildStage::Parse);
        let file_name_owned = file_name.to_string();
        let extracted =
            tokio::task::spawn_blocking(move || extractor::extract(&file_name_owned, &bytes))
                .await
                .map_err(|e| RagError::Other(format!("extraction task panicked: {}", e)))?;
        if extracted.text.is_empty() {
            warn!("no text extracted from '{}'", file_name);
        }

        self.report(BuildStage::Chunk);
        let ChunkOutcome { chunks, truncated } =
            chunker::chunk_text(doc_id, &extracted.text, &self.config.chunking)?;
        if truncated > 0 {
            warn!(
                "chunk cap reached for '{}': {} chunks dropped",
                doc_id, truncated
            );
        }
        debug!("{} chunks for '{}'", chunks.len(), doc_id);

        // Embed in small batches, yielding between batches so embedding work
        // does not monopolize the runtime.
        let batch_size = self.config.embedding.batch_size.max(1);
        let timeout_secs = self.config.embedding.timeout_secs;
        let total = chunks.len();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(total);
        self.report(BuildStage::Embed { done: 0, total });
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let embedded = embed_with_timeout(self.embedder.clone(), texts, timeout_secs).await?;
            vectors.extend(embedded);
            self.report(BuildStage::Embed {
                done: vectors.len(),
                total,
            });
            tokio::task::yield_now().await;
        }
        if vectors.len() != total {
            return Err(EmbeddingError::GenerationFailed(format!(
                "expected {} vectors, got {}",
                total,
                vectors.len()
            ))
            .into());
        }

        self.report(BuildStage::Persist);
        // Every vector is computed before the first write, so a concurrent
        // scan of this document only ever trails by one in-flight pair.
        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            self.store.put_chunk_with_vector(chunk, vector).await?;
        }
        if let Some(meta) = &extracted.meta {
            self.store.put_document_meta(doc_id, meta).await?;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Indexed '{}': {} chunks in {}ms",
            doc_id, total, duration_ms
        );
        Ok(IndexReport {
            doc_id: doc_id.to_string(),
            chunks_indexed: total,
            chunks_truncated: truncated,
            embeddings_generated: vectors.len(),
            duration_ms,
            meta: extracted.meta,
        })
    }

    /// Delete a document's chunks, vectors, and metadata. Unknown ids are a
    /// no-op.
    pub async fn delete_document(&self, doc_id: &str) -> Result<(), RagError> {
        info!("Deleting document '{}'", doc_id);
        self.store.delete_document(doc_id).await?;
        Ok(())
    }

    /// Top-K chunks for a query, optionally restricted to one document.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        doc_id: Option<&str>,
    ) -> Result<Vec<Retrieved>, RagError> {
        self.retriever.retrieve(query, top_k, doc_id).await
    }

    /// Answer a question: retrieve the configured top-K chunks and synthesize
    /// an answer with citations.
    pub async fn ask(
        &self,
        query: &str,
        doc_id: Option<&str>,
    ) -> Result<SynthesizedAnswer, RagError> {
        let retrieved = self
            .retrieve(query, self.config.retrieval.top_k, doc_id)
            .await?;
        Ok(self.synthesizer.synthesize(query, &retrieved))
    }

    /// Metadata extracted for a document, or `None` for an unknown id.
    pub async fn document_meta(&self, doc_id: &str) -> Result<Option<DocumentMeta>, RagError> {
        Ok(self.store.get_document_meta(doc_id).await?)
    }

    /// A document's stored chunks, ordered by start offset.
    pub async fn list_chunks(&self, doc_id: &str) -> Result<Vec<Chunk>, RagError> {
        Ok(self.store.list_chunks(doc_id).await?)
    }

    /// Best-effort title/authors/year facts for a document, combining stored
    /// metadata with pattern scans over the head chunks.
    pub async fn document_facts(&self, doc_id: &str) -> Result<DocumentMeta, RagError> {
        let mut facts = DocumentMeta::new();

        if let Some(meta) = self.store.get_document_meta(doc_id).await? {
            if let Some(title) = meta.get("title") {
                facts.insert("title".to_string(), title.clone());
            }
            if let Some(author) = meta.get("author") {
                facts.insert("authors".to_string(), author.clone());
            }
        }

        let chunks = self.store.list_chunks(doc_id).await?;
        let head_text = chunks
            .iter()
            .take(5)
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(" \n ");
        let lines: Vec<&str> = line_split_re()
            .split(&head_text)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if !facts.contains_key("title") {
            let candidate = lines
                .iter()
                .find(|line| title_prefix_re().is_match(line))
                .map(|line| title_prefix_re().replace(line, "").trim().to_string())
                .or_else(|| {
                    lines
                        .iter()
                        .find(|line| {
                            let len = line.chars().count();
                            len > 8 && len < 160
                        })
                        .map(|line| line.to_string())
                });
            if let Some(title) = candidate {
                facts.insert("title".to_string(), title);
            }
        }

        if !facts.contains_key("authors") {
            let candidate = lines
                .iter()
                .find(|line| author_prefix_re().is_match(line))
                .map(|line| author_prefix_re().replace(line, "").trim().to_string())
                .or_else(|| {
                    lines
                        .iter()
                        .find(|line| author_shape_re().is_match(line))
                        .map(|line| line.to_string())
                });
            if let Some(authors) = candidate {
                facts.insert("authors".to_string(), authors);
            }
        }

        if let Some(found) = year_re().find(&head_text) {
            facts.insert("year".to_string(), found.as_str().to_string());
        }

        Ok(facts)
    }
}

fn line_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n|\r|\.\s+").unwrap())
}

fn title_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^title\s*[:\-]\s*").unwrap())
}

fn author_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(author|penulis)s?\s*[:\-]\s*").unwrap())
}

/// Two or more word tokens followed by a separator, the usual shape of an
/// author list line.
fn author_shape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]{2,}\s+[A-Za-z]{2,}(;|,)").unwrap())
}

/// Publication years 2000-2099
fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(20\d{2})\b").unwrap())
}
