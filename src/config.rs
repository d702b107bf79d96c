//! Configuration for a question-answering session.
//!
//! All behaviour is controlled through [`QaConfig`], built via its
//! [`QaConfigBuilder`]. Keeping every knob in one struct makes it trivial to
//! share a config across the session, log it, and diff two runs to understand
//! why their answers differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::PdfQaError;
use crate::llm::ChatModel;
use crate::ocr::OcrEngine;
use std::fmt;
use std::sync::Arc;

/// Configuration for loading a document and answering questions about it.
///
/// Built via [`QaConfig::builder()`] or [`QaConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfqa::QaConfig;
///
/// let config = QaConfig::builder()
///     .summary_chars(200)
///     .clip_dpi(150)
///     .model_id("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct QaConfig {
    /// Pre-constructed chat model. Takes precedence over `provider_name`.
    /// This is the injection point for tests and for callers that need
    /// custom middleware around the provider.
    pub model: Option<Arc<dyn ChatModel>>,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If `None`, the provider default is used.
    pub model_id: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If `None` along with `model`, the provider is auto-detected from the
    /// environment.
    pub provider_name: Option<String>,

    /// OCR engine for embedded page images. `None` means pages load with
    /// empty OCR sections.
    pub ocr: Option<Arc<dyn OcrEngine>>,

    /// Sampling temperature for answering and profile extraction.
    /// Default: 0.0. Routing always runs at 0.
    ///
    /// Answering is a grounding task whose quote must be a verbatim substring
    /// of the source page — it wants the model as deterministic as the API
    /// allows. This is a correctness requirement, not a style preference.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 1024.
    ///
    /// Answers carry a template (answer section + evidence block); 1024
    /// covers them comfortably while keeping a runaway response bounded.
    pub max_tokens: usize,

    /// Characters of each page's content shown to the router. Default: 300.
    ///
    /// Bounding the per-page preview keeps the routing prompt small for large
    /// documents. The trade-off is deliberate: truncation may hide late-page
    /// evidence, which is an accepted limitation of the router, not a defect.
    pub summary_chars: usize,

    /// Character cap on the assembled context block in batch mode.
    /// Default: 4000. Routed mode sends the full chosen page.
    pub context_chars: usize,

    /// Vision mode: attach the routed page's rendered PNG to the answer
    /// request. Default: false.
    ///
    /// Helps when the evidence lives in a figure or diagram the text
    /// extraction cannot see. Requires a vision-capable model; costs image
    /// tokens per question.
    pub vision: bool,

    /// Render resolution for evidence clips, in DPI. Default: 200.
    pub clip_dpi: u32,

    /// Margin in PDF points added around a located quote before cropping.
    /// Default: 4.0.
    pub clip_margin: f32,

    /// Maximum rendered image dimension (width or height) in pixels for
    /// vision-mode page renders. Default: 2000.
    ///
    /// A safety cap independent of page size, so pdfium never allocates an
    /// unbounded bitmap for an oversized page.
    pub render_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Override for the router's instruction block. If `None`, the built-in
    /// instructions from [`crate::prompts`] are used.
    pub routing_instructions: Option<String>,

    /// Override for the answerer's instruction block. If `None`, the built-in
    /// instructions from [`crate::prompts`] are used.
    pub answer_instructions: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            model: None,
            model_id: None,
            provider_name: None,
            ocr: None,
            temperature: 0.0,
            max_tokens: 1024,
            summary_chars: 300,
            context_chars: 4000,
            vision: false,
            clip_dpi: 200,
            clip_margin: 4.0,
            render_pixels: 2000,
            password: None,
            routing_instructions: None,
            answer_instructions: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for QaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QaConfig")
            .field("model", &self.model.as_ref().map(|_| "<dyn ChatModel>"))
            .field("model_id", &self.model_id)
            .field("provider_name", &self.provider_name)
            .field("ocr", &self.ocr.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("summary_chars", &self.summary_chars)
            .field("context_chars", &self.context_chars)
            .field("vision", &self.vision)
            .field("clip_dpi", &self.clip_dpi)
            .field("clip_margin", &self.clip_margin)
            .field("render_pixels", &self.render_pixels)
            .finish()
    }
}

impl QaConfig {
    /// Create a new builder for `QaConfig`.
    pub fn builder() -> QaConfigBuilder {
        QaConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`QaConfig`].
#[derive(Debug)]
pub struct QaConfigBuilder {
    config: QaConfig,
}

impl QaConfigBuilder {
    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.config.model = Some(model);
        self
    }

    pub fn model_id(mut self, id: impl Into<String>) -> Self {
        self.config.model_id = Some(id.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr = Some(engine);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn summary_chars(mut self, n: usize) -> Self {
        self.config.summary_chars = n.clamp(50, 2000);
        self
    }

    pub fn context_chars(mut self, n: usize) -> Self {
        self.config.context_chars = n.max(200);
        self
    }

    pub fn vision(mut self, v: bool) -> Self {
        self.config.vision = v;
        self
    }

    pub fn clip_dpi(mut self, dpi: u32) -> Self {
        self.config.clip_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn clip_margin(mut self, points: f32) -> Self {
        self.config.clip_margin = points.max(0.0);
        self
    }

    pub fn render_pixels(mut self, px: u32) -> Self {
        self.config.render_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn routing_instructions(mut self, text: impl Into<String>) -> Self {
        self.config.routing_instructions = Some(text.into());
        self
    }

    pub fn answer_instructions(mut self, text: impl Into<String>) -> Self {
        self.config.answer_instructions = Some(text.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<QaConfig, PdfQaError> {
        let c = &self.config;
        if c.clip_dpi < 72 || c.clip_dpi > 400 {
            return Err(PdfQaError::InvalidConfig(format!(
                "clip DPI must be 72–400, got {}",
                c.clip_dpi
            )));
        }
        if c.summary_chars == 0 {
            return Err(PdfQaError::InvalidConfig(
                "summary_chars must be ≥ 1".into(),
            ));
        }
        if c.context_chars < c.summary_chars {
            return Err(PdfQaError::InvalidConfig(format!(
                "context_chars ({}) must not be smaller than summary_chars ({})",
                c.context_chars, c.summary_chars
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_deterministic_leaning() {
        let c = QaConfig::default();
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.summary_chars, 300);
        assert_eq!(c.context_chars, 4000);
        assert_eq!(c.clip_dpi, 200);
        assert!(!c.vision);
    }

    #[test]
    fn builder_clamps_ranges() {
        let c = QaConfig::builder()
            .summary_chars(5)
            .clip_dpi(1000)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.summary_chars, 50);
        assert_eq!(c.clip_dpi, 400);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn context_smaller_than_summary_is_rejected() {
        let err = QaConfig::builder()
            .summary_chars(2000)
            .context_chars(200)
            .build()
            .unwrap_err();
        assert!(matches!(err, PdfQaError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_injected_objects() {
        let repr = format!("{:?}", QaConfig::default());
        assert!(repr.contains("QaConfig"));
        assert!(!repr.contains("password"));
    }
}
