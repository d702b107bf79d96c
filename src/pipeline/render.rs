//! Single-page rasterisation for vision-mode answer requests.
//!
//! The routed page is rendered to a PNG, base64-wrapped, and attached to the
//! answer prompt so a vision-capable model can read figures and diagrams the
//! text extraction cannot see.
//!
//! ## Why PNG?
//! Lossless compression preserves text crispness. JPEG artefacts on rendered
//! text confuse vision models and degrade reading accuracy at low DPI.
//!
//! ## Why `detail: "high"`?
//! GPT-4-class tiling divides images into 512 px tiles; `detail: "high"`
//! enables the full tile budget so fine print and small tables stay legible.

use crate::config::QaConfig;
use crate::error::PdfQaError;
use crate::pipeline::{create_pdfium, open_document};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Rasterise one page (1-based) and encode it for a multimodal API request.
///
/// Runs inside `spawn_blocking` since pdfium operations are CPU-bound.
pub async fn render_page_image(
    pdf_path: &Path,
    page_number: usize,
    config: &QaConfig,
) -> Result<ImageData, PdfQaError> {
    let path = pdf_path.to_path_buf();
    let password = config.password.clone();
    let max_pixels = config.render_pixels;

    let image = tokio::task::spawn_blocking(move || {
        render_page_blocking(&path, page_number, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| PdfQaError::Internal(format!("Render task panicked: {e}")))??;

    encode_image(&image).map_err(|e| PdfQaError::Internal(format!("Image encoding failed: {e}")))
}

/// Blocking implementation of single-page rendering.
fn render_page_blocking(
    pdf_path: &Path,
    page_number: usize,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<DynamicImage, PdfQaError> {
    let pdfium = create_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;
    let pages = document.pages();
    let total = pages.len() as usize;

    if page_number < 1 || page_number > total {
        return Err(PdfQaError::Internal(format!(
            "Render requested for page {page_number} of a {total}-page document"
        )));
    }

    let page = pages
        .get((page_number - 1) as u16)
        .map_err(|e| PdfQaError::Internal(format!("Failed to open page {page_number}: {e:?}")))?;

    // Cap the longest edge regardless of physical page size so pdfium never
    // allocates an unbounded bitmap for an oversized page.
    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| PdfQaError::Internal(format!("Rasterisation failed for page {page_number}: {e:?}")))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_number,
        image.width(),
        image.height()
    );

    Ok(image)
}

/// Encode a rasterised page as a base64 PNG ready for the vision API.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_image(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        assert!(!data.data.is_empty());
        // Verify it's valid base64
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert!(!decoded.is_empty());
    }
}
