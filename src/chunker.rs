//! Sliding-window chunking of normalized document text.
//!
//! Windows are measured in characters, overlap by a fixed amount, and store a
//! whitespace-collapsed copy of their text. Given the same input and
//! parameters the output is byte-identical across runs.

use crate::config::ChunkingConfig;
use crate::error::ChunkingError;
use crate::types::Chunk;

/// Result of chunking one document's text.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    /// Chunks in start-offset order
    pub chunks: Vec<Chunk>,
    /// Number of chunks dropped by the per-document cap
    pub truncated: usize,
}

/// Split text into overlapping chunks.
///
/// Starting at offset 0, each window spans up to `chunk_size` characters; the
/// next window starts `chunk_size - overlap` characters later. A window only
/// becomes a chunk when its collapsed text reaches `min_chunk_len`. Offsets in
/// the emitted chunks are character offsets into `text`.
pub fn chunk_text(
    doc_id: &str,
    text: &str,
    config: &ChunkingConfig,
) -> Result<ChunkOutcome, ChunkingError> {
    if config.chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize(
            "chunk_size must be greater than 0".to_string(),
        ));
    }
    if config.overlap >= config.chunk_size {
        return Err(ChunkingError::OverlapTooLarge {
            overlap: config.overlap,
            chunk_size: config.chunk_size,
        });
    }

    // Character offsets mapped to byte boundaries once up front.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(byte_idx, _)| byte_idx)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total_chars {
        let end = (start + config.chunk_size).min(total_chars);
        let piece = &text[boundaries[start]..boundaries[end]];
        let collapsed = piece.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() >= config.min_chunk_len {
            chunks.push(Chunk {
                id: Chunk::key(doc_id, start, end),
                doc_id: doc_id.to_string(),
                start,
                end,
                text: collapsed,
            });
        }
        if end == total_chars {
            break;
        }
        start = end - config.overlap;
    }

    // Cap bounds memory and compute on very large inputs; truncation is
    // silent but observable through the returned count.
    let truncated = chunks.len().saturating_sub(config.max_chunks);
    if truncated > 0 {
        chunks.truncate(config.max_chunks);
    }

    Ok(ChunkOutcome { chunks, truncated })
}
