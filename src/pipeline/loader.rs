//! Document loading: per-page text extraction plus OCR of embedded images.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy extraction and OCR.
//!
//! ## Failure policy
//!
//! Loading is all-or-nothing: an unopenable or unparseable document fails
//! with a fatal error and no partial session is returned. Within a page,
//! though, OCR is best-effort — a single undecodable image or OCR glitch is
//! logged and skipped, because one broken figure must not make the rest of
//! the document unqueryable. A page with no text and no images yields an
//! empty record, not an error.

use crate::config::QaConfig;
use crate::error::PdfQaError;
use crate::ocr::OcrEngine;
use crate::pipeline::{create_pdfium, input, open_document};
use crate::session::{DocumentSession, PageRecord};
use futures::Stream;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tempfile::TempDir;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Load a PDF (local path or HTTP/HTTPS URL) into a [`DocumentSession`].
///
/// This is the primary loading entry point. The returned session owns every
/// page's extracted text and OCR output and is read-only from here on; all
/// questions for the run are answered against it.
///
/// # Errors
/// Fatal only: file not found / not a PDF / corrupt / password problems /
/// download failures. Per-image OCR problems degrade to warnings.
pub async fn load(
    input_str: impl AsRef<str>,
    config: &QaConfig,
) -> Result<DocumentSession, PdfQaError> {
    let input_str = input_str.as_ref();
    info!("Loading document: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let (path, temp_guard) = resolved.into_parts();

    let password = config.password.clone();
    let ocr = config.ocr.clone();
    let task_path = path.clone();

    let pages = tokio::task::spawn_blocking(move || {
        extract_pages_blocking(&task_path, password.as_deref(), ocr.as_deref())
    })
    .await
    .map_err(|e| PdfQaError::Internal(format!("Load task panicked: {e}")))??;

    info!("Loaded {} pages from {}", pages.len(), path.display());

    let session = DocumentSession::new(path, pages);
    Ok(match temp_guard {
        Some(guard) => session.with_temp_guard(guard),
        None => session,
    })
}

/// A boxed stream of page records, emitted in document order.
pub type PageRecordStream = Pin<Box<dyn Stream<Item = Result<PageRecord, PdfQaError>> + Send>>;

/// Handle to the resolved source backing an in-progress streaming load.
///
/// Owns the temp directory of a downloaded input, so the file outlives the
/// stream and remains available to the evidence locator. Keep it alive until
/// the stream is drained, then turn it into the session with
/// [`LoadedSource::into_session`].
pub struct LoadedSource {
    path: PathBuf,
    page_count: usize,
    temp_guard: Option<TempDir>,
}

impl LoadedSource {
    /// Local path of the resolved PDF.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total pages in the document, known before the stream starts.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Assemble the session from the collected page records.
    pub fn into_session(self, pages: Vec<PageRecord>) -> DocumentSession {
        let session = DocumentSession::new(self.path, pages);
        match self.temp_guard {
            Some(guard) => session.with_temp_guard(guard),
            None => session,
        }
    }
}

/// Load a PDF, streaming each [`PageRecord`] as its extraction finishes.
///
/// Lets callers drive a progress display while pages arrive; the page count
/// is known up front via [`LoadedSource::page_count`]. Pages are always
/// emitted in document order. The session must still be complete before the
/// first question is asked — collect the records and call
/// [`LoadedSource::into_session`].
///
/// # Errors
/// Fatal resolution/open errors are returned immediately; a mid-document
/// extraction error arrives as an `Err` item terminating the stream.
pub async fn load_stream(
    input_str: impl AsRef<str>,
    config: &QaConfig,
) -> Result<(LoadedSource, PageRecordStream), PdfQaError> {
    let input_str = input_str.as_ref();
    info!("Loading document (streaming): {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let (path, temp_guard) = resolved.into_parts();

    // Open once up front for the page count (and to surface open errors
    // before the caller starts drawing a progress bar).
    let count_path = path.clone();
    let count_password = config.password.clone();
    let page_count = tokio::task::spawn_blocking(move || -> Result<usize, PdfQaError> {
        let pdfium = create_pdfium()?;
        let document = open_document(&pdfium, &count_path, count_password.as_deref())?;
        Ok(document.pages().len() as usize)
    })
    .await
    .map_err(|e| PdfQaError::Internal(format!("Page-count task panicked: {e}")))??;

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<PageRecord, PdfQaError>>(4);

    let task_path = path.clone();
    let password = config.password.clone();
    let ocr = config.ocr.clone();

    tokio::task::spawn_blocking(move || {
        let result = stream_pages_blocking(&task_path, password.as_deref(), ocr.as_deref(), &tx);
        if let Err(e) = result {
            // Receiver may be gone if the caller dropped the stream early.
            let _ = tx.blocking_send(Err(e));
        }
    });

    let source = LoadedSource {
        path,
        page_count,
        temp_guard,
    };

    Ok((source, Box::pin(ReceiverStream::new(rx))))
}

// ── Blocking implementations ─────────────────────────────────────────────

fn extract_pages_blocking(
    path: &Path,
    password: Option<&str>,
    ocr: Option<&dyn OcrEngine>,
) -> Result<Vec<PageRecord>, PdfQaError> {
    let pdfium = create_pdfium()?;
    let document = open_document(&pdfium, path, password)?;
    let pages = document.pages();
    let total = pages.len() as usize;
    debug!("Document opened: {} pages", total);

    let mut records = Vec::with_capacity(total);
    for (index, page) in pages.iter().enumerate() {
        records.push(extract_page(&page, index + 1, ocr)?);
    }

    Ok(records)
}

fn stream_pages_blocking(
    path: &Path,
    password: Option<&str>,
    ocr: Option<&dyn OcrEngine>,
    tx: &tokio::sync::mpsc::Sender<Result<PageRecord, PdfQaError>>,
) -> Result<(), PdfQaError> {
    let pdfium = create_pdfium()?;
    let document = open_document(&pdfium, path, password)?;

    for (index, page) in document.pages().iter().enumerate() {
        let record = extract_page(&page, index + 1, ocr)?;
        if tx.blocking_send(Ok(record)).is_err() {
            // Caller dropped the stream; stop extracting.
            return Ok(());
        }
    }

    Ok(())
}

/// Extract one page: native text, then OCR of each embedded raster image in
/// encounter order.
fn extract_page(
    page: &PdfPage<'_>,
    number: usize,
    ocr: Option<&dyn OcrEngine>,
) -> Result<PageRecord, PdfQaError> {
    let text = page
        .text()
        .map_err(|e| PdfQaError::ExtractionFailed {
            page: number,
            detail: format!("{e:?}"),
        })?
        .all();

    let ocr_text = match ocr {
        Some(engine) => ocr_page_images(page, number, engine),
        None => String::new(),
    };

    debug!(
        "Page {}: {} chars text, {} chars OCR",
        number,
        text.len(),
        ocr_text.len()
    );

    Ok(PageRecord::new(number, text, ocr_text))
}

/// OCR every raster image object on the page, concatenating outputs in
/// encounter order. Per-image failures are skipped with a warning.
fn ocr_page_images(page: &PdfPage<'_>, number: usize, engine: &dyn OcrEngine) -> String {
    let mut parts: Vec<String> = Vec::new();

    for object in page.objects().iter() {
        let Some(image_object) = object.as_image_object() else {
            continue;
        };

        match image_object.get_raw_image() {
            Ok(image) => match engine.recognize(&image) {
                Ok(text) => {
                    if !text.trim().is_empty() {
                        parts.push(text.trim_end().to_string());
                    }
                }
                Err(e) => warn!("OCR failed for an image on page {number}: {e}"),
            },
            Err(e) => warn!("Could not decode an image on page {number}: {e:?}"),
        }
    }

    parts.join("\n")
}
