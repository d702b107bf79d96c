//! Error types for the pdfqa library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfQaError`] — **Fatal**: the session cannot proceed at all (bad input
//!   file, wrong password, no LLM provider configured). Returned as
//!   `Err(PdfQaError)` from [`crate::load`] and the `ask*` entry points.
//!
//! * [`AskFailure`] — **Non-fatal**: one question degraded (routing found no
//!   page, the answering call failed, the quote could not be located on the
//!   rendered page) but the session stays alive for the next question. Stored
//!   inside [`crate::session::AskReport`] rather than propagated as `Err`.
//!
//! The separation keeps the interactive loop honest: a network blip during one
//! answer must never tear down a loaded document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfqa library.
///
/// Per-question failures use [`AskFailure`] and are stored in
/// [`crate::session::AskReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PdfQaError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Text extraction failed for a specific page while building the session.
    ///
    /// The loader aborts rather than returning a partial session; a document
    /// whose pages cannot be read is treated the same as an unreadable file.
    #[error("Text extraction failed for page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy,\n\
or install libpdfium on the system library path.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal degradation for a single question.
///
/// Stored in [`crate::session::AskReport::failure`]. The question produced a
/// reduced result (no page, an apology answer, or no evidence clip) but the
/// session continues.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum AskFailure {
    /// The router returned no resolvable page number for this question.
    #[error("No relevant page could be determined for this question")]
    RoutingFailed,

    /// The answering call failed; the answer text is the fixed apology string.
    #[error("The answer model could not be reached: {detail}")]
    AnswerDegraded { detail: String },

    /// The cited quote was not found verbatim on the rendered page.
    #[error("Quote not found on rendered page {page}; no evidence clip produced")]
    EvidenceNotFound { page: usize },
}
