//! # Document RAG - Local Document Indexing and Retrieval
//!
//! An embedded RAG (Retrieval-Augmented Generation) pipeline for user-uploaded
//! documents: parse, chunk, embed, persist, and retrieve - all inside the host
//! process, with no server round-trips.
//!
//! ## Key Features
//!
//! - **Local Embeddings**: FastEmbed (all-MiniLM-L6-v2) loaded once per process
//! - **Embedded Storage**: redb key-value tables for chunks, vectors, and
//!   document metadata; prefix-scoped single-transaction document deletion
//! - **PDF and Text Extraction**: page-by-page PDF text plus Info-dictionary
//!   metadata via lopdf, graceful fallback for other file types
//! - **Cosine Retrieval**: full-scan scoring with near-adjacent deduplication
//! - **Heuristic Answers**: model-free synthesis with citations, swappable for
//!   a model-backed implementation
//!
//! ## Architecture
//!
//! ```text
//! file bytes ──▶ extractor ──▶ chunker ──▶ embedding ──▶ store
//!                                                          │
//!                        query ──▶ retriever ◀─────────────┘
//!                                      │
//!                                 synthesizer ──▶ answer + sources
//! ```
//!
//! Build and query paths share the store as their only coupling point; each
//! document is processed independently.
//!
//! ## Usage Example
//!
//! ```no_run
//! use document_rag::{Config, RagPipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = RagPipeline::new(Config::new()?).await?;
//!
//!     let bytes = std::fs::read("paper.pdf")?;
//!     pipeline.index_document("paper-1", "paper.pdf", bytes).await?;
//!
//!     let answer = pipeline.ask("what is the title?", None).await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```

/// Sliding-window text chunking
pub mod chunker;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation using FastEmbed
pub mod embedding;

/// Error types and utilities
pub mod error;

/// File-to-text extraction (PDF, plain text, fallback)
pub mod extractor;

/// Path normalization and platform directory utilities
pub mod paths;

/// Build and query orchestration
pub mod pipeline;

/// Cosine-similarity retrieval over the stored index
pub mod retriever;

/// Local index persistence (redb)
pub mod store;

/// Heuristic answer synthesis
pub mod synthesizer;

/// Core record types
pub mod types;

pub use config::Config;
pub use error::RagError;
pub use pipeline::{BuildStage, ProgressSink, RagPipeline};
pub use types::{Chunk, DocumentMeta, IndexReport, Retrieved, SourceRef, SynthesizedAnswer};
