//! Corpus loading and page filtering.
//!
//! The corpus is the legal code pre-extracted to UTF-8 text, one page per
//! form-feed-separated section (the layout `pdftotext` produces). Pages that
//! are too short or carry an ellipsis marker are dropped as OCR garbage.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Pages whose stripped text is at most this many characters are dropped.
const MIN_PAGE_CHARS: usize = 30;

/// Literal marker indicating truncated or OCR-garbled page content.
const TRUNCATION_MARKER: &str = "...";

/// Separator between pages in the extracted corpus text.
const PAGE_SEPARATOR: char = '\u{0C}';

/// Load the corpus at `path` and return its usable pages in source order.
///
/// Page text is returned as found in the corpus; stripping is applied only
/// for the length test, never to the stored text.
///
/// # Errors
///
/// Returns [`RagError::Ingestion`] if the file cannot be read or contains no
/// pages at all. A corpus where every page is filtered out yields an empty
/// `Vec`, not an error — the caller decides whether that is fatal.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let raw = fs::read_to_string(path).map_err(|e| {
        RagError::Ingestion(format!("cannot read corpus at {}: {e}", path.display()))
    })?;

    if raw.trim().is_empty() {
        return Err(RagError::Ingestion(format!(
            "corpus at {} contains no extractable pages",
            path.display()
        )));
    }

    let pages: Vec<&str> = raw.split(PAGE_SEPARATOR).collect();
    let total_pages = pages.len();

    let documents: Vec<Document> = pages
        .into_iter()
        .enumerate()
        .filter(|(page, text)| {
            let keep = text.trim().chars().count() > MIN_PAGE_CHARS
                && !text.contains(TRUNCATION_MARKER);
            if !keep {
                debug!(page, "dropped degenerate page");
            }
            keep
        })
        .map(|(page, text)| Document { page, text: text.to_string() })
        .collect();

    info!(total_pages, kept_pages = documents.len(), "corpus loaded");

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_corpus(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn keeps_only_qualifying_page() {
        let good = "Статья 5. Жалоба подаётся в течение десяти рабочих дней со дня вручения.";
        let short = "Короткий";
        let truncated = "Статья 6. Текст статьи обрывается на середине предложения...";
        let corpus = format!("{good}\u{0C}{short}\u{0C}{truncated}");
        let file = write_corpus(&corpus);

        let documents = load_corpus(file.path()).unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].page, 0);
        assert_eq!(documents[0].text, good);
    }

    #[test]
    fn preserves_page_order_and_numbers() {
        let corpus = "Первая статья закона устанавливает общие положения кодекса.\u{0C}\
                      мало\u{0C}\
                      Третья статья закона устанавливает порядок обжалования решений.";
        let file = write_corpus(corpus);

        let documents = load_corpus(file.path()).unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].page, 0);
        assert_eq!(documents[1].page, 2);
    }

    #[test]
    fn missing_file_is_ingestion_error() {
        let err = load_corpus(Path::new("/nonexistent/kodeks.txt")).unwrap_err();
        assert!(matches!(err, RagError::Ingestion(_)));
    }

    #[test]
    fn empty_file_is_ingestion_error() {
        let file = write_corpus("");
        let err = load_corpus(file.path()).unwrap_err();
        assert!(matches!(err, RagError::Ingestion(_)));
    }

    #[test]
    fn all_pages_filtered_is_ok_and_empty() {
        let file = write_corpus("мало\u{0C}тоже мало");
        let documents = load_corpus(file.path()).unwrap();
        assert!(documents.is_empty());
    }
}
