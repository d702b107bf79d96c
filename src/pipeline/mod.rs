//! Pipeline stages for document question-answering.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and lets us swap implementations (e.g. a
//! different OCR engine) without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ loader ──▶ router ──▶ answerer ──▶ locator
//! (URL/path) (text+OCR) (page #)  (grounded    (quote →
//!                                  answer)      image clip)
//! ```
//!
//! 1. [`input`]    — canonicalise the user-supplied path or URL to a local file
//! 2. [`loader`]   — extract per-page text and OCR embedded images; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`router`]   — pick the page most relevant to the question (LLM call)
//! 4. [`answerer`] — produce the grounded, citation-bearing answer (LLM call)
//! 5. [`locator`]  — find the quoted evidence on the rendered page and crop it
//! 6. [`render`]   — rasterise a single page for vision-mode requests
//!
//! The router→answerer→locator chain runs strictly sequentially per question;
//! nothing in this pipeline processes two questions concurrently.

pub mod answerer;
pub mod input;
pub mod loader;
pub mod locator;
pub mod render;
pub mod router;

use crate::error::PdfQaError;
use pdfium_render::prelude::*;
use std::path::Path;

/// Bind to a pdfium library instance.
///
/// Resolution order: `PDFIUM_LIB_PATH` (file or directory), the current
/// directory, then the system library path.
pub(crate) fn create_pdfium() -> Result<Pdfium, PdfQaError> {
    let bindings = if let Ok(configured) = std::env::var("PDFIUM_LIB_PATH") {
        Pdfium::bind_to_library(&configured).or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&configured))
        })
    } else {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
    };

    bindings
        .map(Pdfium::new)
        .map_err(|e| PdfQaError::PdfiumBindingFailed(format!("{e:?}")))
}

/// Open a document, mapping pdfium's password/corruption failures onto the
/// fatal error vocabulary.
pub(crate) fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PdfQaError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PdfQaError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                PdfQaError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            PdfQaError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Truncate to at most `limit` characters without splitting a code point.
pub(crate) fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        // 'é' is two bytes; a byte-index slice at 2 would panic.
        let s = "héllo wörld";
        assert_eq!(truncate_chars(s, 2), "hé");
        assert_eq!(truncate_chars(s, 100), s);
        assert_eq!(truncate_chars("", 5), "");
    }
}
