//! Session and result types produced by the pipeline.
//!
//! [`DocumentSession`] is the unit everything else operates on: one loaded
//! PDF, read-only after construction, discarded at the end of the run. The
//! remaining types ([`Answer`], [`EvidenceClip`], [`AskReport`],
//! [`DocumentProfile`]) are plain result structs with public fields so callers
//! can destructure them freely.

use crate::error::AskFailure;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One page of a loaded document: native text plus OCR output from any
/// embedded images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based page number; contiguous across the session.
    pub number: usize,
    /// Text extracted from the page's content streams.
    pub text: String,
    /// Concatenated OCR output from all raster images on the page, in
    /// image-encounter order. Empty when the page has no images or no OCR
    /// engine is configured.
    pub ocr_text: String,
    /// The unit shown to the LLM: `text`, followed by a labelled OCR section
    /// when OCR produced anything.
    pub combined: String,
}

/// Section label separating native text from OCR output in
/// [`PageRecord::combined`].
pub const OCR_SECTION_LABEL: &str = "--- OCR Text from Images on this Page ---";

impl PageRecord {
    /// Build a record, assembling `combined` from the two text sources.
    ///
    /// A page with no text and no images yields an empty `combined` string —
    /// that is a valid (blank) page, not an error.
    pub fn new(number: usize, text: impl Into<String>, ocr_text: impl Into<String>) -> Self {
        let text = text.into();
        let ocr_text = ocr_text.into();
        let combined = if ocr_text.trim().is_empty() {
            text.clone()
        } else {
            format!("{text}\n\n{OCR_SECTION_LABEL}\n{ocr_text}")
        };
        Self {
            number,
            text,
            ocr_text,
            combined,
        }
    }
}

/// An ordered, immutable sequence of [`PageRecord`]s for one loaded PDF.
///
/// Built once by [`crate::load`] and then only read; the interactive loop
/// answers every question against the same session. Nothing is persisted
/// across runs.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    source: PathBuf,
    pages: Vec<PageRecord>,
    /// Keeps a downloaded PDF's temp directory alive for the session's
    /// lifetime — the evidence locator re-opens the file per question.
    temp_guard: Option<std::sync::Arc<tempfile::TempDir>>,
}

impl DocumentSession {
    /// Assemble a session from already-extracted pages.
    ///
    /// Pages must be in document order with contiguous 1-based numbers;
    /// [`crate::load`] guarantees this, and test fixtures are expected to
    /// uphold it too.
    pub fn new(source: impl Into<PathBuf>, pages: Vec<PageRecord>) -> Self {
        debug_assert!(pages.iter().enumerate().all(|(i, p)| p.number == i + 1));
        Self {
            source: source.into(),
            pages,
            temp_guard: None,
        }
    }

    /// Attach the temp-dir guard of a downloaded input.
    pub(crate) fn with_temp_guard(mut self, guard: tempfile::TempDir) -> Self {
        self.temp_guard = Some(std::sync::Arc::new(guard));
        self
    }

    /// Path of the PDF this session was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Total number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Look up a page by 1-based number.
    pub fn page(&self, number: usize) -> Option<&PageRecord> {
        if number >= 1 {
            self.pages.get(number - 1)
        } else {
            None
        }
    }

    /// All pages in document order.
    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }
}

/// A citation-bearing answer from the grounded answerer.
///
/// `quote` is the contract the evidence locator depends on: when present it is
/// expected to be a verbatim substring of the cited page's content. Both
/// `quote` and `cited_page` are `None` when the model returned the fixed
/// fallback string or omitted the evidence block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Full answer text as returned by the model (or a fixed apology string
    /// when the call failed).
    pub text: String,
    /// Exact quote from the evidence block, if one was emitted.
    pub quote: Option<String>,
    /// 1-based page the quote was attributed to; validated against the
    /// session's page range before use.
    pub cited_page: Option<usize>,
}

/// Pixel region of a rendered page, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A rendered crop of the document region containing a located quote.
///
/// Transient artifact: the caller decides whether and where to write it.
/// [`EvidenceClip::filename`] gives the deterministic per-page name, so a
/// rerun of the same question overwrites the previous clip.
#[derive(Debug, Clone)]
pub struct EvidenceClip {
    /// 1-based page the quote was found on.
    pub page: usize,
    /// Pixel region of the match within the rendered page.
    pub region: ClipRegion,
    /// PNG-encoded crop.
    pub png: Vec<u8>,
}

impl EvidenceClip {
    /// Deterministic output name derived from the page number.
    pub fn filename(&self) -> String {
        format!("reference_clip_page_{}.png", self.page)
    }
}

/// Everything that came out of one question: the routed page, the answer, the
/// optional evidence clip, and which degradation (if any) occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskReport {
    /// The question as asked.
    pub question: String,
    /// Page chosen by the router; `None` when routing failed (or in batch
    /// mode, where no routing happens).
    pub routed_page: Option<usize>,
    /// The grounded answer.
    pub answer: Answer,
    /// Evidence clip, when the quote was located on the rendered page.
    #[serde(skip)]
    pub clip: Option<EvidenceClip>,
    /// The soft failure that degraded this question, if any.
    pub failure: Option<AskFailure>,
    /// Wall-clock time spent on this question.
    pub duration_ms: u64,
}

/// Structured metadata extracted from the document text by the profile
/// variant. Every field the model could not determine is `None` (`null` in
/// the model's JSON output).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentProfile {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Emitting company or organization. Keyed `company_name` on the wire to
    /// match the extraction prompt.
    #[serde(rename = "company_name", alias = "organization")]
    pub organization: Option<String>,
    pub publication_date: Option<String>,
    pub document_type: Option<String>,
    #[serde(default)]
    pub key_topics: Vec<String>,
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_is_text_only_without_ocr() {
        let p = PageRecord::new(1, "hello world", "");
        assert_eq!(p.combined, "hello world");
    }

    #[test]
    fn combined_labels_ocr_section() {
        let p = PageRecord::new(2, "body", "figure caption");
        assert!(p.combined.starts_with("body"));
        assert!(p.combined.contains(OCR_SECTION_LABEL));
        assert!(p.combined.ends_with("figure caption"));
    }

    #[test]
    fn blank_page_yields_empty_combined() {
        let p = PageRecord::new(3, "", "");
        assert!(p.combined.is_empty());
    }

    #[test]
    fn whitespace_only_ocr_is_ignored() {
        let p = PageRecord::new(1, "text", " \n ");
        assert_eq!(p.combined, "text");
    }

    #[test]
    fn session_page_lookup_is_one_based() {
        let session = DocumentSession::new(
            "doc.pdf",
            vec![
                PageRecord::new(1, "first", ""),
                PageRecord::new(2, "second", ""),
            ],
        );
        assert_eq!(session.page_count(), 2);
        assert_eq!(session.page(1).unwrap().text, "first");
        assert_eq!(session.page(2).unwrap().text, "second");
        assert!(session.page(0).is_none());
        assert!(session.page(3).is_none());
    }

    #[test]
    fn clip_filename_is_deterministic() {
        let clip = EvidenceClip {
            page: 7,
            region: ClipRegion {
                x: 0,
                y: 0,
                width: 10,
                height: 10,
            },
            png: vec![1, 2, 3],
        };
        assert_eq!(clip.filename(), "reference_clip_page_7.png");
    }

    #[test]
    fn profile_parses_nullable_fields() {
        let json = r#"{
            "title": "Lemon and Orange Disease Classification",
            "author": null,
            "company_name": null,
            "publication_date": null,
            "document_type": "research paper",
            "key_topics": ["plant disease", "image classification"],
            "summary": "A study of citrus disease classifiers."
        }"#;
        let p: DocumentProfile = serde_json::from_str(json).unwrap();
        assert_eq!(
            p.title.as_deref(),
            Some("Lemon and Orange Disease Classification")
        );
        assert!(p.author.is_none());
        assert_eq!(p.key_topics.len(), 2);
    }

    #[test]
    fn profile_tolerates_missing_topics() {
        let p: DocumentProfile = serde_json::from_str(r#"{"title": "T"}"#).unwrap();
        assert!(p.key_topics.is_empty());
    }
}
