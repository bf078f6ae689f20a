use anyhow::Result;
use clap::{Parser, Subcommand};
use document_rag::{Config, RagPipeline};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "document-rag", version, about = "Local document indexing and retrieval")]
struct Cli {
    /// Path to a TOML config file (defaults to the platform config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, chunk, embed, and persist a document
    Index {
        /// File to index (.pdf, .txt, or any UTF-8 text)
        file: PathBuf,

        /// Caller-assigned document id (defaults to the file stem)
        #[arg(long)]
        doc_id: Option<String>,
    },
    /// Ask a question against the index
    Ask {
        query: String,

        /// Restrict retrieval to one document
        #[arg(long)]
        doc: Option<String>,
    },
    /// Show the raw top-K retrieved chunks for a query
    Retrieve {
        query: String,

        #[arg(long, default_value_t = 6)]
        top_k: usize,

        /// Restrict retrieval to one document
        #[arg(long)]
        doc: Option<String>,
    },
    /// Delete a document's chunks, vectors, and metadata
    Delete { doc_id: String },
    /// List a document's stored chunks
    Chunks { doc_id: String },
    /// Show title/authors/year heuristics for a document
    Facts { doc_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::new()?,
    };
    let pipeline = RagPipeline::new(config).await?;

    match cli.command {
        Command::Index { file, doc_id } => {
            let doc_id = doc_id.unwrap_or_else(|| {
                file.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "document".to_string())
            });
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = std::fs::read(&file)?;

            let report = pipeline.index_document(&doc_id, &file_name, bytes).await?;
            println!(
                "Indexed '{}': {} chunks in {}ms",
                report.doc_id, report.chunks_indexed, report.duration_ms
            );
            if report.chunks_truncated > 0 {
                println!(
                    "  note: {} chunks dropped by the per-document cap",
                    report.chunks_truncated
                );
            }
            if let Some(meta) = report.meta {
                for (key, value) in meta {
                    println!("  {}: {}", key, value);
                }
            }
        }
        Command::Ask { query, doc } => {
            let answer = pipeline.ask(&query, doc.as_deref()).await?;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for source in answer.sources {
                    println!(
                        "  [{}] {}..{}: {}",
                        source.doc_id, source.range.0, source.range.1, source.excerpt
                    );
                }
            }
        }
        Command::Retrieve { query, top_k, doc } => {
            let results = pipeline.retrieve(&query, top_k, doc.as_deref()).await?;
            if results.is_empty() {
                println!("No results.");
            }
            for hit in results {
                println!(
                    "{:.4}  {}  [{}..{})\n    {}",
                    hit.score, hit.chunk.doc_id, hit.chunk.start, hit.chunk.end, hit.chunk.text
                );
            }
        }
        Command::Delete { doc_id } => {
            pipeline.delete_document(&doc_id).await?;
            println!("Deleted '{}'", doc_id);
        }
        Command::Chunks { doc_id } => {
            for chunk in pipeline.list_chunks(&doc_id).await? {
                println!("[{}..{}) {}", chunk.start, chunk.end, chunk.text);
            }
        }
        Command::Facts { doc_id } => {
            for (key, value) in pipeline.document_facts(&doc_id).await? {
                println!("{}: {}", key, value);
            }
        }
    }

    Ok(())
}
