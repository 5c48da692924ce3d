use serde::{Deserialize, Serialize};
use thiserror::Error;

use tocsmith_core::{classify, ClassifierConfig, Heading, OutlineTree};

use backend::LopdfBackend;

pub mod backend;
pub mod layout;
pub mod writer;

pub use writer::{BookmarkWriter, OutlineHandle};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("PDF writing error: {0}")]
    Write(String),
    #[error("Unknown outline parent handle: {0}")]
    UnknownParent(usize),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Parse(e.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub page_count: usize,
}

// ---------------------------------------------------------------------------
// Convenience free functions (stateless, re-parse each call)
// ---------------------------------------------------------------------------

/// Infer headings from font geometry.
///
/// Every page is scanned before classification starts, since the size
/// thresholds depend on the whole document.
pub fn detect_headings(bytes: &[u8], config: &ClassifierConfig) -> Result<Vec<Heading>, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    let candidates = layout::extract_candidates(&backend)?;
    log::debug!(
        "classifying {} text boxes from {} pages",
        candidates.len(),
        backend.page_count()
    );
    Ok(classify(&candidates, config))
}

pub fn page_count(bytes: &[u8]) -> Result<usize, PdfError> {
    Ok(LopdfBackend::load_bytes(bytes)?.page_count())
}

/// Get document metadata without extracting any text.
pub fn info(bytes: &[u8]) -> Result<DocumentMetadata, PdfError> {
    Ok(LopdfBackend::load_bytes(bytes)?.metadata())
}

/// Copy a PDF, replacing its outline with `outline`.
///
/// An empty outline produces a plain copy with no bookmarks.
pub fn apply_outline(bytes: &[u8], outline: &OutlineTree) -> Result<Vec<u8>, PdfError> {
    let mut writer = BookmarkWriter::from_bytes(bytes)?;
    writer.add_outline(outline)?;

    let mut out = Vec::new();
    writer.write_to(&mut out)?;
    Ok(out)
}


#[cfg(test)]
mod tests {
    use tocsmith_core::{build_outline, parse_toc, TocOptions};

    use super::*;

    #[test]
    fn test_info_rejects_empty_bytes() {
        assert!(info(&[]).is_err());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(&fixtures::blank_pdf(3)).unwrap(), 3);
    }

    #[test]
    fn test_info_without_info_dictionary() {
        let meta = info(&fixtures::blank_pdf(2)).unwrap();
        assert_eq!(meta.page_count, 2);
        assert_eq!(meta.title, None);
    }

    #[test]
    fn test_detect_headings_end_to_end() {
        let mut body: Vec<fixtures::Line<'_>> = vec![("Getting Started", 24.0, 72.0, 760.0)];
        for i in 0..8 {
            body.push(("ordinary paragraph text", 10.0, 72.0, 600.0 - 40.0 * i as f32));
        }
        let pdf = fixtures::pdf_with_pages(&[body, vec![("Second page text", 10.0, 72.0, 500.0)]]);

        let headings = detect_headings(&pdf, &ClassifierConfig::default()).unwrap();
        let title = headings
            .iter()
            .find(|h| h.title() == "Getting Started")
            .expect("large heading should be detected");
        assert_eq!(title.page(), 1);
        assert_eq!(title.level().as_u8(), 1);
        assert!(headings.iter().any(|h| h.page() == 2));
    }

    #[test]
    fn test_apply_outline_round_trip_counts() {
        let pdf = fixtures::blank_pdf(5);
        let toc = "1 Intro 1\n1.1 Scope 2\n1.2 Terms 3\n2 Usage 4\n";
        let outline = build_outline(parse_toc(toc, &TocOptions::default()), 5);

        let out = apply_outline(&pdf, &outline).unwrap();
        let doc = lopdf::Document::load_mem(&out).unwrap();
        let root_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = doc.get_dictionary(root_id).unwrap();
        let outlines_id = catalog.get(b"Outlines").unwrap().as_reference().unwrap();
        let outlines = doc.get_dictionary(outlines_id).unwrap();
        assert_eq!(outlines.get(b"Count").unwrap().as_i64().unwrap(), 4);
        assert_eq!(doc.get_pages().len(), 5);
    }

    #[test]
    fn test_apply_empty_outline_is_plain_copy() {
        let pdf = fixtures::blank_pdf(2);
        let out = apply_outline(&pdf, &OutlineTree::default()).unwrap();
        let doc = lopdf::Document::load_mem(&out).unwrap();
        let root_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        assert!(doc.get_dictionary(root_id).unwrap().get(b"Outlines").is_err());
        assert_eq!(doc.get_pages().len(), 2);
    }
}
