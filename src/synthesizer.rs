//! Heuristic answer synthesis from retrieved chunks.
//!
//! A deterministic fallback that needs no model: it recognizes title-seeking
//! questions and otherwise assembles excerpt bullets. Callers with access to
//! a language model can implement [`Synthesizer`] themselves and pass the
//! same retrieved chunks as context.

use crate::types::{Retrieved, SourceRef, SynthesizedAnswer};
use regex::Regex;
use std::sync::OnceLock;

/// Fixed answer when nothing relevant was retrieved.
pub const NO_MATCH_ANSWER: &str = "No relevant information was found in the indexed documents.";

const ANSWER_PREAMBLE: &str = "Here are the most relevant excerpts for your question:";

/// Maximum excerpt length attached to a source citation.
const EXCERPT_CHARS: usize = 240;

/// Trait for answer synthesis
pub trait Synthesizer: Send + Sync {
    /// Turn retrieved chunks into a human-readable answer with citations.
    fn synthesize(&self, query: &str, retrieved: &[Retrieved]) -> SynthesizedAnswer;
}

/// Pattern-matching synthesizer with a relevance floor.
pub struct HeuristicSynthesizer {
    relevance_floor: f32,
}

impl HeuristicSynthesizer {
    pub fn new(relevance_floor: f32) -> Self {
        Self { relevance_floor }
    }

    /// Scan the top chunks for a `Title:`-style line, falling back to the
    /// first line of a chunk. Returns `None` when no plausible candidate is
    /// found, letting the generic path answer instead.
    fn detect_title(&self, retrieved: &[Retrieved]) -> Option<SynthesizedAnswer> {
        for hit in retrieved.iter().take(4) {
            let lines = split_lines(&hit.chunk.text);
            let candidate = lines
                .iter()
                .find(|line| title_line_re().is_match(line))
                .or_else(|| lines.first());

            if let Some(candidate) = candidate {
                let len = candidate.chars().count();
                if len > 4 && len < 220 {
                    let title = title_prefix_re().replace(candidate, "").trim().to_string();
                    let answer = format!("Detected title (heuristic): \"{}\"", title);
                    return Some(SynthesizedAnswer {
                        answer,
                        sources: sources_from(retrieved, 3),
                    });
                }
            }
        }
        None
    }
}

impl Synthesizer for HeuristicSynthesizer {
    fn synthesize(&self, query: &str, retrieved: &[Retrieved]) -> SynthesizedAnswer {
        if retrieved.is_empty() || retrieved[0].score < self.relevance_floor {
            return SynthesizedAnswer {
                answer: NO_MATCH_ANSWER.to_string(),
                sources: Vec::new(),
            };
        }

        if title_query_re().is_match(&query.to_lowercase())
            && let Some(answer) = self.detect_title(retrieved)
        {
            return answer;
        }

        let mut parts = vec![ANSWER_PREAMBLE.to_string()];
        parts.extend(
            retrieved
                .iter()
                .take(3)
                .map(|hit| format!("• {}", hit.chunk.text.trim())),
        );

        SynthesizedAnswer {
            answer: parts.join("\n"),
            sources: sources_from(retrieved, 6),
        }
    }
}

fn sources_from(retrieved: &[Retrieved], limit: usize) -> Vec<SourceRef> {
    retrieved
        .iter()
        .take(limit)
        .map(|hit| SourceRef {
            doc_id: hit.chunk.doc_id.clone(),
            excerpt: hit.chunk.text.chars().take(EXCERPT_CHARS).collect(),
            range: (hit.chunk.start, hit.chunk.end),
        })
        .collect()
}

/// Split chunk text into candidate lines at newlines and sentence ends.
fn split_lines(text: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\n|\.\s+").unwrap());
    re.split(text)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Query asks for a title ("title", or "judul" in host-app documents).
fn title_query_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(title|judul)\b").unwrap())
}

fn title_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^title\s*[:\-]").unwrap())
}

fn title_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^title\s*[:\-]\s*").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn retrieved(doc_id: &str, start: usize, text: &str, score: f32) -> Retrieved {
        Retrieved {
            chunk: Chunk {
                id: Chunk::key(doc_id, start, start + text.len()),
                doc_id: doc_id.to_string(),
                start,
                end: start + text.len(),
                text: text.to_string(),
            },
            score,
        }
    }

    #[test]
    fn test_empty_retrieval_gives_fixed_answer() {
        let synthesizer = HeuristicSynthesizer::new(0.1);
        let answer = synthesizer.synthesize("anything", &[]);
        assert_eq!(answer.answer, NO_MATCH_ANSWER);
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn test_below_floor_gives_fixed_answer() {
        let synthesizer = HeuristicSynthesizer::new(0.1);
        let hits = vec![retrieved("doc1", 0, "some marginally related text here", 0.05)];
        let answer = synthesizer.synthesize("anything", &hits);
        assert_eq!(answer.answer, NO_MATCH_ANSWER);
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn test_title_query_extracts_title_line() {
        let synthesizer = HeuristicSynthesizer::new(0.1);
        let hits = vec![retrieved(
            "doc1",
            0,
            "Title: Laptop Recommender Abstract: a study of laptop recommendation systems",
            0.8,
        )];
        let answer = synthesizer.synthesize("what is the title?", &hits);
        assert!(answer.answer.contains("Laptop Recommender"));
        assert!(!answer.answer.to_lowercase().starts_with("title:"));
        assert!(!answer.sources.is_empty());
        assert!(answer.sources.len() <= 3);
    }

    #[test]
    fn test_title_query_falls_back_to_first_line() {
        let synthesizer = HeuristicSynthesizer::new(0.1);
        let hits = vec![retrieved(
            "doc1",
            0,
            "A Survey of Retrieval Methods. The field has grown considerably in recent years",
            0.8,
        )];
        let answer = synthesizer.synthesize("what is the title of this paper", &hits);
        assert!(answer.answer.contains("A Survey of Retrieval Methods"));
    }

    #[test]
    fn test_generic_answer_has_preamble_and_bullets() {
        let synthesizer = HeuristicSynthesizer::new(0.1);
        let hits: Vec<Retrieved> = (0..5)
            .map(|i| {
                retrieved(
                    "doc1",
                    i * 300,
                    &format!("relevant passage number {}", i),
                    0.9 - i as f32 * 0.1,
                )
            })
            .collect();

        let answer = synthesizer.synthesize("tell me about passages", &hits);

        assert!(answer.answer.starts_with(ANSWER_PREAMBLE));
        // Only the top 3 become bullets
        assert_eq!(answer.answer.matches('•').count(), 3);
        // Up to 6 sources
        assert_eq!(answer.sources.len(), 5);
    }

    #[test]
    fn test_sources_capped_at_six() {
        let synthesizer = HeuristicSynthesizer::new(0.1);
        let hits: Vec<Retrieved> = (0..9)
            .map(|i| retrieved("doc1", i * 300, "a relevant passage of text", 0.9))
            .collect();
        let answer = synthesizer.synthesize("a question", &hits);
        assert_eq!(answer.sources.len(), 6);
    }

    #[test]
    fn test_excerpt_truncated_to_240_chars() {
        let synthesizer = HeuristicSynthesizer::new(0.1);
        let long_text = "word ".repeat(100);
        let hits = vec![retrieved("doc1", 0, long_text.trim(), 0.9)];
        let answer = synthesizer.synthesize("a question", &hits);
        assert_eq!(answer.sources[0].excerpt.chars().count(), 240);
    }

    #[test]
    fn test_source_range_matches_chunk_offsets() {
        let synthesizer = HeuristicSynthesizer::new(0.1);
        let hits = vec![retrieved("doc1", 680, "a relevant passage of text", 0.9)];
        let answer = synthesizer.synthesize("a question", &hits);
        assert_eq!(answer.sources[0].range, (680, 680 + 26));
    }
}
