//! # pdfqa
//!
//! Ask questions about a PDF and get grounded, citation-bearing answers with
//! visual evidence clips.
//!
//! ## Why this crate?
//!
//! Shipping a whole document to an LLM per question is slow, expensive, and
//! invites hallucination. pdfqa instead runs a two-stage retrieval-and-citation
//! pipeline: a cheap routing call picks the single most relevant page from
//! bounded per-page previews, then a grounded answering call — restricted to
//! that page's content — must produce an exact supporting quote. The quote is
//! re-located on the rendered page and cropped to a PNG, so every answer comes
//! with evidence a human can check at a glance.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Load    extract text + OCR embedded images per page (pdfium, CPU-bound)
//!  ├─ 2. Route   pick the most relevant page from truncated previews (LLM, t=0)
//!  ├─ 3. Answer  grounded answer with exact quote + page citation (LLM, t=0)
//!  └─ 4. Locate  find the quote on the rendered page → cropped PNG clip
//! ```
//!
//! Steps 2–4 repeat per question against the session built in step 1.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfqa::{ask, load, QaConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = QaConfig::default();
//!     let session = load("paper.pdf", &config).await?;
//!
//!     let report = ask(&session, "What was the dropout rate?", &config).await?;
//!     println!("{}", report.answer.text);
//!     if let Some(clip) = report.clip {
//!         std::fs::write(clip.filename(), &clip.png)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Only loading and provider resolution are fatal. Everything per-question
//! degrades gracefully: routing failure returns a fixed message, an answering
//! transport error returns a fixed apology, an unlocatable quote just means no
//! clip. See [`error`] for the full vocabulary.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfqa` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `tesseract` | off | Tesseract OCR for embedded page images (needs libtesseract + libleptonica) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfqa = { version = "0.4", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod ask;
pub mod config;
pub mod error;
pub mod llm;
pub mod ocr;
pub mod pipeline;
pub mod profile;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use ask::{ask, ask_batch, ask_batch_with_model, ask_with_model};
pub use config::{QaConfig, QaConfigBuilder};
pub use error::{AskFailure, PdfQaError};
pub use llm::{ChatModel, ChatQuery, EdgequakeModel, ModelError};
pub use ocr::{OcrEngine, OcrError};
pub use pipeline::loader::{load, load_stream, LoadedSource, PageRecordStream};
pub use pipeline::locator::locate;
pub use profile::profile;
pub use session::{
    Answer, AskReport, ClipRegion, DocumentProfile, DocumentSession, EvidenceClip, PageRecord,
};

#[cfg(feature = "tesseract")]
pub use ocr::TesseractOcr;
