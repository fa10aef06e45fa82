//! Question answering over the chunked knowledge collection.
//!
//! Embeds every chunk and the question, takes the nearest chunks from a
//! freshly built [`FlatL2Index`], and renders a bulleted extractive answer
//! followed by the sources it drew on.

use anyhow::{bail, Context, Result};
use scraper::Html;
use std::collections::HashSet;
use tracing::debug;

use crate::chunk::split_sentences;
use crate::embedding::{embed_query, Embedder};
use crate::extract::collapse_whitespace;
use crate::index::FlatL2Index;
use crate::models::Chunk;

pub const ANSWER_HEADER: &str = "ANSWER FROM KNOWLEDGE BASE:";
pub const SOURCES_HEADER: &str = "SOURCES USED:";

/// Answer `question` from `chunks`.
///
/// `chunks` must be non-empty. Uses the `top_k` nearest chunks and keeps at
/// most `max_sentences` distinct sentences.
pub async fn answer_question(
    embedder: &dyn Embedder,
    question: &str,
    chunks: &[Chunk],
    top_k: usize,
    max_sentences: usize,
) -> Result<String> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder
        .embed(&texts)
        .await
        .context("Failed to embed knowledge chunks")?;
    if vectors.len() != chunks.len() {
        bail!(
            "embedder {} returned {} vectors for {} chunks",
            embedder.model_name(),
            vectors.len(),
            chunks.len()
        );
    }
    let index = FlatL2Index::build(vectors)?;

    let query = embed_query(embedder, question)
        .await
        .context("Failed to embed question")?;
    let hits = index.search(&query, top_k)?;
    debug!(
        chunks = index.len(),
        hits = hits.len(),
        model = embedder.model_name(),
        "retrieved chunks"
    );

    let retrieved: Vec<&Chunk> = hits.iter().map(|h| &chunks[h.index]).collect();
    Ok(format_answer(&retrieved, max_sentences))
}

/// Render retrieved chunks as the answer text.
pub fn format_answer(retrieved: &[&Chunk], max_sentences: usize) -> String {
    let combined = retrieved
        .iter()
        .map(|c| clean_text(&c.text))
        .collect::<Vec<_>>()
        .join(" ");

    let mut seen = HashSet::new();
    let bullets = split_sentences(&combined)
        .into_iter()
        .filter(|s| seen.insert(*s))
        .take(max_sentences)
        .map(|s| format!("- {}", s))
        .collect::<Vec<_>>()
        .join("\n");

    let mut sources: Vec<String> = Vec::new();
    for chunk in retrieved {
        let line = format!(
            "{}: {}",
            chunk.source_type.as_str().to_uppercase(),
            chunk.source_path
        );
        if !sources.contains(&line) {
            sources.push(line);
        }
    }
    let sources = sources.join("\n");

    format!(
        "{}\n\n{}\n\n{}\n{}",
        ANSWER_HEADER, bullets, SOURCES_HEADER, sources
    )
}

/// Strip any markup from chunk text and collapse whitespace.
fn clean_text(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    let plain: String = fragment.root_element().text().collect();
    collapse_whitespace(&plain)
}
