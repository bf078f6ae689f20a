//! Query-time retrieval: embed the query, scan stored vectors, score by
//! cosine similarity, deduplicate near-adjacent chunks.
//!
//! The scan visits every stored record, which is the right trade-off for a
//! small per-user index. A larger corpus would swap an approximate
//! nearest-neighbor index in behind the same [`IndexStore`] seam without
//! changing this module's contract.

use crate::config::RetrievalConfig;
use crate::embedding::{SharedEmbedder, embed_with_timeout};
use crate::error::{EmbeddingError, RagError};
use crate::store::SharedStore;
use crate::types::Retrieved;
use std::collections::HashSet;
use tracing::debug;

/// Cosine similarity between two vectors.
///
/// Defined as 0.0 when either vector has zero norm. Computed in full even
/// though stored vectors are normalized by convention; the store makes no
/// guarantee about it.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Scores stored chunks against query embeddings.
#[derive(Clone)]
pub struct Retriever {
    embedder: SharedEmbedder,
    store: SharedStore,
    config: RetrievalConfig,
    embed_timeout_secs: u64,
}

impl Retriever {
    pub fn new(
        embedder: SharedEmbedder,
        store: SharedStore,
        config: RetrievalConfig,
        embed_timeout_secs: u64,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
            embed_timeout_secs,
        }
    }

    /// Top-K chunks for a query, optionally restricted to one document.
    ///
    /// Results are in descending score order, at most `top_k` long, and hold
    /// at most one chunk per `dedup_bucket_chars`-wide start-offset bucket per
    /// document. Equal scores keep their store scan order (the sort is
    /// stable). An empty store yields an empty result, not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        doc_id: Option<&str>,
    ) -> Result<Vec<Retrieved>, RagError> {
        let query_vector = self.embed_query(query).await?;

        let mut candidates = self.store.scan_all().await?;
        if let Some(doc_id) = doc_id {
            candidates.retain(|(chunk, _)| chunk.doc_id == doc_id);
        }
        if candidates.is_empty() {
            debug!("no indexed vectors to score");
            return Ok(Vec::new());
        }

        let mut scored: Vec<Retrieved> = candidates
            .into_iter()
            .map(|(chunk, vector)| Retrieved {
                score: cosine_similarity(&query_vector, &vector),
                chunk,
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        // Keep only the best-scoring chunk per coarse offset bucket so
        // overlapping windows of the same passage don't crowd the results.
        let bucket_width = self.config.dedup_bucket_chars.max(1);
        let mut seen_buckets = HashSet::new();
        let mut picked = Vec::new();
        for candidate in scored {
            let bucket = (
                candidate.chunk.doc_id.clone(),
                candidate.chunk.start / bucket_width,
            );
            if !seen_buckets.insert(bucket) {
                continue;
            }
            picked.push(candidate);
            if picked.len() >= top_k {
                break;
            }
        }

        debug!("retrieved {} chunks for query", picked.len());
        Ok(picked)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = embed_with_timeout(
            self.embedder.clone(),
            vec![query.to_string()],
            self.embed_timeout_secs,
        )
        .await?;

        match vectors.pop() {
            Some(vector) => Ok(vector),
            None => Err(EmbeddingError::GenerationFailed(
                "model returned no vector for the query".to_string(),
            )
            .into()),
        }
    }
}
