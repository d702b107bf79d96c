//! Evidence location: find the cited quote on the rendered page and crop it.
//!
//! The search runs against the page pdfium renders, not the session's cached
//! text, because the clip must show the reader the actual document region.
//! Everything here is best-effort by design: OCR noise, whitespace
//! normalisation, or answerer paraphrase can all make a quote unmatchable,
//! and the correct response to that is "no clip", never an error. Any
//! pdfium/search/render failure therefore surfaces as `None`.
//!
//! When the quote appears more than once, the first match in document order
//! (top-to-bottom, left-to-right) wins — a deterministic tie-break.

use crate::config::QaConfig;
use crate::pipeline::create_pdfium;
use crate::session::{ClipRegion, EvidenceClip};
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Locate `quote` on the given page (1-based) and crop the region around it.
///
/// Returns `None` when the quote cannot be found verbatim, the page is out of
/// range, or any pdfium operation fails.
pub async fn locate(
    source: &Path,
    page_number: usize,
    quote: &str,
    config: &QaConfig,
) -> Option<EvidenceClip> {
    let needle = normalize_quote(quote);
    if needle.is_empty() {
        return None;
    }

    let path = source.to_path_buf();
    let password = config.password.clone();
    let dpi = config.clip_dpi;
    let margin = config.clip_margin;

    let task = tokio::task::spawn_blocking(move || {
        locate_blocking(&path, page_number, &needle, password.as_deref(), dpi, margin)
    })
    .await;

    match task {
        Ok(clip) => clip,
        Err(e) => {
            warn!("Locate task panicked: {e}");
            None
        }
    }
}

/// Collapse all whitespace runs (including line breaks) to single spaces.
///
/// Answer quotes often span a line wrap in the source; the page's character
/// stream carries the wrap as whitespace, so a space-normalised needle is the
/// closest literal form that can still match. The search itself stays
/// literal — no fuzzy matching.
pub fn normalize_quote(quote: &str) -> String {
    quote.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn locate_blocking(
    path: &Path,
    page_number: usize,
    needle: &str,
    password: Option<&str>,
    dpi: u32,
    margin: f32,
) -> Option<EvidenceClip> {
    let pdfium = match create_pdfium() {
        Ok(p) => p,
        Err(e) => {
            warn!("Evidence locator could not bind pdfium: {e}");
            return None;
        }
    };

    let document = match pdfium.load_pdf_from_file(path, password) {
        Ok(d) => d,
        Err(e) => {
            warn!("Evidence locator could not reopen '{}': {e:?}", path.display());
            return None;
        }
    };

    let pages = document.pages();
    if page_number < 1 || page_number > pages.len() as usize {
        warn!(
            "Evidence requested for page {} of a {}-page document",
            page_number,
            pages.len()
        );
        return None;
    }

    let page = match pages.get((page_number - 1) as u16) {
        Ok(p) => p,
        Err(e) => {
            warn!("Could not open page {page_number}: {e:?}");
            return None;
        }
    };

    let text = match page.text() {
        Ok(t) => t,
        Err(e) => {
            warn!("Could not read text of page {page_number}: {e:?}");
            return None;
        }
    };

    let search = match text.search(needle, &PdfSearchOptions::new()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Could not search text of page {page_number}: {e:?}");
            return None;
        }
    };
    let mut matches = search.iter(PdfSearchDirection::SearchForward);
    let segments = match matches.next() {
        Some(s) => s,
        None => {
            info!("Quote not found on rendered page {page_number}");
            return None;
        }
    };

    // Minimal bounding region over the match's segments.
    let mut left = f32::MAX;
    let mut bottom = f32::MAX;
    let mut right = f32::MIN;
    let mut top = f32::MIN;
    for segment in segments.iter() {
        let b = segment.bounds();
        left = left.min(b.left.value);
        right = right.max(b.right.value);
        bottom = bottom.min(b.bottom.value);
        top = top.max(b.top.value);
    }
    if left > right || bottom > top {
        return None;
    }

    let page_width = page.width().value;
    let page_height = page.height().value;

    // Small visual margin, clamped to the page.
    let left = (left - margin).max(0.0);
    let right = (right + margin).min(page_width);
    let bottom = (bottom - margin).max(0.0);
    let top = (top + margin).min(page_height);

    // Render the full page at the clip resolution, then crop in pixel space.
    let scale = dpi as f32 / 72.0;
    let render_config =
        PdfRenderConfig::new().set_target_width((page_width * scale).round() as i32);

    let bitmap = match page.render_with_config(&render_config) {
        Ok(b) => b,
        Err(e) => {
            warn!("Rendering page {page_number} for the evidence clip failed: {e:?}");
            return None;
        }
    };
    let image = bitmap.as_image();

    let sx = image.width() as f32 / page_width;
    let sy = image.height() as f32 / page_height;

    // PDF coordinates have their origin at the bottom-left; pixels at the
    // top-left.
    let x = (left * sx).floor().max(0.0) as u32;
    let y = ((page_height - top) * sy).floor().max(0.0) as u32;
    let width = (((right - left) * sx).ceil() as u32)
        .min(image.width().saturating_sub(x))
        .max(1);
    let height = (((top - bottom) * sy).ceil() as u32)
        .min(image.height().saturating_sub(y))
        .max(1);

    debug!(
        "Quote located on page {page_number}: crop {}x{} at ({x}, {y})",
        width, height
    );

    let crop = image.crop_imm(x, y, width, height);
    let mut png = Vec::new();
    if let Err(e) = crop.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png) {
        warn!("Encoding the evidence clip failed: {e}");
        return None;
    }

    Some(EvidenceClip {
        page: page_number,
        region: ClipRegion {
            x,
            y,
            width,
            height,
        },
        png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(
            normalize_quote("The dropout\n  rate was\t0.5."),
            "The dropout rate was 0.5."
        );
        assert_eq!(normalize_quote("  plain  "), "plain");
        assert_eq!(normalize_quote(" \n\t "), "");
    }
}
