//! End-to-end tests for the index/retrieve/answer pipeline, driven by a
//! deterministic embedder so no model download is needed.

mod common;

use common::TokenHashEmbedder;
use document_rag::pipeline::BuildStage;
use document_rag::store::RedbIndexStore;
use document_rag::synthesizer::NO_MATCH_ANSWER;
use document_rag::{Config, RagPipeline};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn test_pipeline(temp_dir: &TempDir) -> RagPipeline {
    let mut config = Config::default();
    config.storage.index_path = temp_dir.path().join("index.redb");

    let store = Arc::new(RedbIndexStore::open(&config.storage.index_path).unwrap());
    RagPipeline::with_parts(Arc::new(TokenHashEmbedder), store, config)
}

fn sample_text(chars: usize) -> String {
    "the quick brown fox jumps over the lazy dog "
        .chars()
        .cycle()
        .take(chars)
        .collect()
}

#[tokio::test]
async fn test_index_2000_chars_produces_expected_offsets() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&temp_dir);

    let text = sample_text(2000);
    let report = pipeline
        .index_document("doc1", "doc1.txt", text.into_bytes())
        .await
        .unwrap();

    assert_eq!(report.chunks_indexed, 3);
    assert_eq!(report.chunks_truncated, 0);
    assert_eq!(report.embeddings_generated, 3);

    let chunks = pipeline.list_chunks("doc1").await.unwrap();
    let starts: Vec<usize> = chunks.iter().map(|c| c.start).collect();
    assert_eq!(starts, vec![0, 680, 1360]);
    assert_eq!(chunks.last().unwrap().end, 2000);
}

#[tokio::test]
async fn test_title_question_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&temp_dir);

    let text = "Title: Laptop Recommender\nAbstract: a study of laptop recommendation systems.";
    pipeline
        .index_document("paper-1", "paper.txt", text.as_bytes().to_vec())
        .await
        .unwrap();

    let answer = pipeline.ask("what is the title?", None).await.unwrap();

    assert!(
        answer.answer.contains("Laptop Recommender"),
        "answer was: {}",
        answer.answer
    );
    assert!(!answer.sources.is_empty());
    assert_eq!(answer.sources[0].doc_id, "paper-1");
}

#[tokio::test]
async fn test_empty_store_ask_returns_fixed_answer() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&temp_dir);

    let retrieved = pipeline.retrieve("anything at all", 6, None).await.unwrap();
    assert!(retrieved.is_empty());

    let answer = pipeline.ask("anything at all", None).await.unwrap();
    assert_eq!(answer.answer, NO_MATCH_ANSWER);
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn test_delete_document_leaves_others_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&temp_dir);

    pipeline
        .index_document("alpha", "alpha.txt", sample_text(1500).into_bytes())
        .await
        .unwrap();
    pipeline
        .index_document("beta", "beta.txt", sample_text(1500).into_bytes())
        .await
        .unwrap();

    pipeline.delete_document("alpha").await.unwrap();

    assert!(pipeline.list_chunks("alpha").await.unwrap().is_empty());
    assert!(!pipeline.list_chunks("beta").await.unwrap().is_empty());

    // Retrieval only ever sees the surviving document
    let results = pipeline
        .retrieve("quick brown fox", 10, None)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|hit| hit.chunk.doc_id == "beta"));
}

#[tokio::test]
async fn test_delete_then_rebuild_reindexes() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&temp_dir);

    pipeline
        .index_document("doc1", "doc1.txt", sample_text(1500).into_bytes())
        .await
        .unwrap();
    pipeline.delete_document("doc1").await.unwrap();
    let report = pipeline
        .index_document("doc1", "doc1.txt", sample_text(2000).into_bytes())
        .await
        .unwrap();

    assert_eq!(report.chunks_indexed, 3);
    assert_eq!(pipeline.list_chunks("doc1").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_chunk_cap_is_observable_in_report() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.index_path = temp_dir.path().join("index.redb");
    config.chunking.max_chunks = 2;

    let store = Arc::new(RedbIndexStore::open(&config.storage.index_path).unwrap());
    let pipeline = RagPipeline::with_parts(Arc::new(TokenHashEmbedder), store, config);

    let report = pipeline
        .index_document("doc1", "doc1.txt", sample_text(5000).into_bytes())
        .await
        .unwrap();

    assert_eq!(report.chunks_indexed, 2);
    assert!(report.chunks_truncated > 0);
}

#[tokio::test]
async fn test_undecodable_file_indexes_zero_chunks() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&temp_dir);

    let report = pipeline
        .index_document("bin-1", "blob.bin", vec![0xFF, 0xFE, 0x81, 0x00])
        .await
        .unwrap();

    assert_eq!(report.chunks_indexed, 0);
    assert!(pipeline.list_chunks("bin-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_build_progress_stages_reported_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let stages: Arc<Mutex<Vec<BuildStage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_stages = stages.clone();

    let pipeline = test_pipeline(&temp_dir).with_progress(Arc::new(move |stage| {
        sink_stages.lock().unwrap().push(stage);
    }));

    pipeline
        .index_document("doc1", "doc1.txt", sample_text(2000).into_bytes())
        .await
        .unwrap();

    let stages = stages.lock().unwrap();
    assert_eq!(stages.first(), Some(&BuildStage::Parse));
    assert!(stages.contains(&BuildStage::Chunk));
    assert!(stages.contains(&BuildStage::Persist));
    assert!(
        stages
            .iter()
            .any(|stage| matches!(stage, BuildStage::Embed { total: 3, .. }))
    );
    // Embedding progress is monotonic
    let embed_done: Vec<usize> = stages
        .iter()
        .filter_map(|stage| match stage {
            BuildStage::Embed { done, .. } => Some(*done),
            _ => None,
        })
        .collect();
    assert!(embed_done.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn test_pdf_metadata_flows_into_document_meta() {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal("Hello World")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("A Study"),
        "Author" => Object::string_literal("Jane Doe"),
    });
    doc.trailer.set("Info", info_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();

    let temp_dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&temp_dir);

    // Body is below the minimum chunk length: zero chunks, metadata kept
    let report = pipeline
        .index_document("paper-1", "paper.pdf", bytes)
        .await
        .unwrap();
    assert_eq!(report.chunks_indexed, 0);

    let meta = pipeline.document_meta("paper-1").await.unwrap().unwrap();
    assert_eq!(meta.get("title").map(String::as_str), Some("A Study"));
    assert_eq!(meta.get("author").map(String::as_str), Some("Jane Doe"));

    let facts = pipeline.document_facts("paper-1").await.unwrap();
    assert_eq!(facts.get("title").map(String::as_str), Some("A Study"));
    assert_eq!(facts.get("authors").map(String::as_str), Some("Jane Doe"));
}

#[tokio::test]
async fn test_document_facts_from_head_chunks() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&temp_dir);

    let text = "Title: Laptop Recommender\nAuthors: Jane Doe, John Smith\nPublished in 2023. \
                Abstract: a study of laptop recommendation systems built on local retrieval.";
    pipeline
        .index_document("paper-1", "paper.txt", text.as_bytes().to_vec())
        .await
        .unwrap();

    let facts = pipeline.document_facts("paper-1").await.unwrap();
    assert!(
        facts
            .get("title")
            .is_some_and(|t| t.contains("Laptop Recommender"))
    );
    assert!(facts.get("authors").is_some_and(|a| a.contains("Jane Doe")));
    assert_eq!(facts.get("year").map(String::as_str), Some("2023"));
}

#[tokio::test]
async fn test_retrieval_scoped_to_document() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = test_pipeline(&temp_dir);

    let rust_text = format!(
        "Rust systems programming with ownership and borrowing. {}",
        sample_text(200)
    );
    let cooking_text = format!(
        "Cooking pasta with garlic and olive oil at home. {}",
        sample_text(200)
    );
    pipeline
        .index_document("rust-doc", "rust.txt", rust_text.into_bytes())
        .await
        .unwrap();
    pipeline
        .index_document("cooking-doc", "cooking.txt", cooking_text.into_bytes())
        .await
        .unwrap();

    let scoped = pipeline
        .retrieve("ownership in rust", 5, Some("cooking-doc"))
        .await
        .unwrap();
    assert!(scoped.iter().all(|hit| hit.chunk.doc_id == "cooking-doc"));

    let unscoped = pipeline.retrieve("ownership in rust", 1, None).await.unwrap();
    assert_eq!(unscoped[0].chunk.doc_id, "rust-doc");
}
