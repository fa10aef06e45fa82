//! Sentence-boundary text chunker.
//!
//! Splits record content into [`Chunk`]s of at most `max_chars` characters.
//! Sentences end at `.`, `!` or `?` followed by whitespace; they are packed
//! greedily and never split, so a single sentence longer than the limit
//! becomes an oversized chunk of its own. Chunks never span two records.
//!
//! A chunk's text is the slice of the record content running from its first
//! sentence to its last, so text that already fits the limit chunks to
//! exactly its trimmed self.

use crate::models::{Chunk, SourceRecord};

/// Split a whole collection into chunks, in record order.
pub fn chunk_records(records: &[SourceRecord], max_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for record in records {
        for (start, end) in chunk_spans(&record.content, max_chars) {
            chunks.push(Chunk {
                chunk_index: chunks.len(),
                text: record.content[start..end].to_string(),
                source_type: record.source_type.clone(),
                source_path: record.source_path.clone(),
            });
        }
    }
    chunks
}

/// Split text into trimmed sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_spans(text)
        .into_iter()
        .map(|(start, end)| &text[start..end])
        .collect()
}

/// Byte spans of the chunks of one text.
fn chunk_spans(text: &str, max_chars: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    // (start, end, length in chars) of the chunk being filled
    let mut current: Option<(usize, usize, usize)> = None;

    for (start, end) in sentence_spans(text) {
        current = match current {
            None => Some((start, end, text[start..end].chars().count())),
            Some((chunk_start, chunk_end, len)) => {
                let grown = len + text[chunk_end..end].chars().count();
                if grown <= max_chars {
                    Some((chunk_start, end, grown))
                } else {
                    spans.push((chunk_start, chunk_end));
                    Some((start, end, text[start..end].chars().count()))
                }
            }
        };
    }
    if let Some((start, end, _)) = current {
        spans.push((start, end));
    }
    spans
}

/// Byte spans of the trimmed, non-empty sentences of `text`.
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(boundary, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }
        push_trimmed(text, start, boundary, &mut spans);

        let mut resume = boundary;
        while let Some(&(i, w)) = chars.peek() {
            if !w.is_whitespace() {
                break;
            }
            resume = i + w.len_utf8();
            chars.next();
        }
        start = resume;
    }
    push_trimmed(text, start, text.len(), &mut spans);
    spans
}

fn push_trimmed(text: &str, start: usize, end: usize, spans: &mut Vec<(usize, usize)>) {
    let piece = &text[start..end];
    let trimmed = piece.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = piece.len() - piece.trim_start().len();
    spans.push((start + lead, start + lead + trimmed.len()));
}
