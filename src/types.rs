use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document-level metadata extracted from a file (e.g. title/author from a
/// PDF Info dictionary). Free-form field name to string value.
pub type DocumentMeta = BTreeMap<String, String>;

/// One contiguous slice of a document's normalized text, the unit of
/// retrieval.
///
/// `start` and `end` are character offsets into the normalized source text
/// (`0 <= start < end <= text length`). The id is derived from
/// `(doc_id, start, end)` so re-deriving it for the same window is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{doc_id}-{start}-{end}`
    pub id: String,
    /// Owning document's caller-assigned id
    pub doc_id: String,
    /// Character offset of the window start (inclusive)
    pub start: usize,
    /// Character offset of the window end (exclusive)
    pub end: usize,
    /// Trimmed, whitespace-collapsed text of the window
    pub text: String,
}

impl Chunk {
    /// Storage key for a chunk window of a document.
    pub fn key(doc_id: &str, start: usize, end: usize) -> String {
        format!("{doc_id}-{start}-{end}")
    }

    /// Key prefix shared by every chunk and vector record of a document.
    pub fn document_prefix(doc_id: &str) -> String {
        format!("{doc_id}-")
    }
}

/// Result of text extraction from a raw file.
///
/// Extraction degrades instead of failing: a file with no extractable text
/// yields an empty string here, and downstream chunking produces zero chunks.
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub text: String,
    pub meta: Option<DocumentMeta>,
}

impl ExtractedText {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A retrieved chunk with its cosine similarity score against the query.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub chunk: Chunk,
    pub score: f32,
}

/// A citation attached to a synthesized answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub doc_id: String,
    /// First 240 characters of the cited chunk
    pub excerpt: String,
    /// `[start, end)` character range of the cited chunk
    pub range: (usize, usize),
}

/// A human-readable answer assembled from retrieved chunks.
#[derive(Debug, Clone)]
pub struct SynthesizedAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Outcome of indexing one document.
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub doc_id: String,
    /// Number of chunks persisted
    pub chunks_indexed: usize,
    /// Number of chunks dropped by the per-document cap
    pub chunks_truncated: usize,
    pub embeddings_generated: usize,
    pub duration_ms: u64,
    /// Document metadata found during extraction, if any
    pub meta: Option<DocumentMeta>,
}
