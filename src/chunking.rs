//! Recursive document chunking.
//!
//! [`RecursiveChunker`] splits the corpus into overlapping chunks, preferring
//! natural boundaries: paragraphs, then sentences, then words, with a hard
//! character cut as the last resort. All sizes are measured in characters,
//! not bytes — the corpus is Cyrillic.

use tracing::debug;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Split levels tried in order before the hard character cut.
const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

/// Splits page text into chunks of at most `chunk_size` characters, where
/// each chunk is seeded with the last `chunk_overlap` characters of its
/// predecessor so context survives chunk boundaries.
///
/// Pages are joined before splitting, so a chunk may span adjacent pages.
/// The overlap seed is the only permitted slack: no chunk exceeds
/// `chunk_size + chunk_overlap` characters. Output is deterministic for
/// identical input and configuration.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] when `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size` (which would never terminate).
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Split the documents into chunks.
    ///
    /// Returns an empty `Vec` if every document has empty text. Each chunk
    /// has an empty embedding vector; embeddings are attached later by the
    /// pipeline.
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        let text = documents
            .iter()
            .map(|d| d.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        if text.is_empty() {
            return Vec::new();
        }

        let pieces = split_and_merge(&text, self.chunk_size, self.chunk_overlap, &SEPARATORS);
        debug!(chunk_count = pieces.len(), "documents chunked");

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk { id: format!("chunk_{i}"), text, embedding: Vec::new() })
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Last `n` characters of `text`, used to seed the next chunk with overlap.
fn tail_chars(text: &str, n: usize) -> String {
    let len = char_len(text);
    text.chars().skip(len.saturating_sub(n)).collect()
}

/// Split text at the first separator level that applies, merge segments into
/// chunks that respect `chunk_size`, and recurse into the next level for any
/// segment that is still too large.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size || separators.is_empty() {
        return split_by_size(text, chunk_size, chunk_overlap);
    }

    let separator = separators[0];
    let remaining_separators = &separators[1..];

    let segments = split_keeping_separator(text, separator);
    if segments.len() <= 1 {
        // Separator absent at this level — try the next one.
        return split_and_merge(text, chunk_size, chunk_overlap, remaining_separators);
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    // Characters in `current` that are pure overlap seed, not new content.
    let mut seed_len = 0;

    for segment in segments {
        let current_len = char_len(&current);
        if current_len > seed_len && current_len + char_len(segment) > chunk_size {
            let piece = std::mem::take(&mut current);
            emit(&mut chunks, piece, chunk_size, chunk_overlap, remaining_separators);
            if let Some(last) = chunks.last() {
                current = tail_chars(last, chunk_overlap);
                seed_len = char_len(&current);
            }
        }
        current.push_str(segment);
    }

    if char_len(&current) > seed_len {
        emit(&mut chunks, current, chunk_size, chunk_overlap, remaining_separators);
    }

    chunks
}

/// Push a merged piece, recursing into the next separator level when a single
/// segment made it exceed `chunk_size` on its own.
fn emit(
    chunks: &mut Vec<String>,
    piece: String,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) {
    if char_len(&piece) > chunk_size + chunk_overlap {
        chunks.extend(split_and_merge(&piece, chunk_size, chunk_overlap, separators));
    } else {
        chunks.push(piece);
    }
}

/// Split text at a separator while keeping the separator attached to the
/// preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Hard character cut with overlap, used when no natural boundary fits.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = chunk_size - chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> Document {
        Document { page: 0, text: text.to_string() }
    }

    fn shared_overlap(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        (1..=a.len().min(b.len()))
            .rev()
            .find(|&n| a[a.len() - n..] == b[..n])
            .unwrap_or(0)
    }

    #[test]
    fn rejects_overlap_not_less_than_size() {
        assert!(matches!(RecursiveChunker::new(100, 100), Err(RagError::Config(_))));
        assert!(matches!(RecursiveChunker::new(100, 150), Err(RagError::Config(_))));
        assert!(matches!(RecursiveChunker::new(0, 0), Err(RagError::Config(_))));
    }

    #[test]
    fn short_input_is_a_single_chunk() {
        let chunker = RecursiveChunker::new(200, 40).unwrap();
        let chunks = chunker.split(&[page("Статья 1. Настоящий кодекс регулирует порядок подачи жалоб.")]);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "chunk_0");
        assert!(chunks[0].embedding.is_empty());
    }

    #[test]
    fn empty_documents_produce_no_chunks() {
        let chunker = RecursiveChunker::new(100, 20).unwrap();
        assert!(chunker.split(&[]).is_empty());
        assert!(chunker.split(&[page(""), page("   ")]).is_empty());
    }

    #[test]
    fn chunk_length_is_bounded_by_size_plus_overlap() {
        let chunker = RecursiveChunker::new(100, 20).unwrap();
        let text = "Жалоба подаётся в письменной форме и должна содержать наименование органа. "
            .repeat(40);
        let chunks = chunker.split(&[page(&text)]);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            let len = chunk.text.chars().count();
            assert!(len >= 1 && len <= 120, "chunk length {len} out of bounds");
        }
    }

    #[test]
    fn consecutive_chunks_share_overlap() {
        let chunker = RecursiveChunker::new(100, 20).unwrap();
        let text = "Орган рассматривает жалобу в течение пятнадцати рабочих дней со дня её регистрации. "
            .repeat(30);
        let chunks = chunker.split(&[page(&text)]);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            assert!(
                shared_overlap(&pair[0].text, &pair[1].text) >= 20,
                "chunks do not share the configured overlap"
            );
        }
    }

    #[test]
    fn prefers_sentence_boundaries_over_hard_cuts() {
        let chunker = RecursiveChunker::new(60, 10).unwrap();
        let text = "Первое предложение закона. Второе предложение закона. Третье предложение закона. Четвёртое предложение закона.";
        let chunks = chunker.split(&[page(text)]);

        assert!(chunks.len() > 1);
        // Every chunk ends at a sentence boundary rather than mid-word.
        for chunk in &chunks {
            assert!(
                chunk.text.trim_end().ends_with('.'),
                "chunk severed mid-sentence: {:?}",
                chunk.text
            );
        }
    }

    #[test]
    fn chunks_may_span_adjacent_pages() {
        let chunker = RecursiveChunker::new(500, 50).unwrap();
        let chunks = chunker.split(&[
            page("Статья 1. Общие положения настоящего кодекса."),
            page("Статья 2. Порядок подачи жалобы на решение органа."),
        ]);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Статья 1"));
        assert!(chunks[0].text.contains("Статья 2"));
    }

    #[test]
    fn split_is_deterministic() {
        let chunker = RecursiveChunker::new(80, 15).unwrap();
        let text = "Решение может быть обжаловано в вышестоящий орган либо в суд. ".repeat(20);
        let docs = [page(&text)];

        assert_eq!(chunker.split(&docs), chunker.split(&docs));
    }

    #[test]
    fn hard_cut_applies_exact_overlap() {
        let pieces = split_by_size(&"абвгдежзик".repeat(10), 30, 10);

        assert!(pieces.len() > 1);
        for pair in pieces.windows(2) {
            let tail: String = pair[0].chars().skip(pair[0].chars().count() - 10).collect();
            assert!(pair[1].starts_with(&tail));
        }
    }
}
