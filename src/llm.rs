//! LLM access: the narrow [`ChatModel`] seam plus the edgequake-llm adapter.
//!
//! The router, answerer, and profiler only ever see [`ChatModel`] — a single
//! `complete` call taking a prompt (and, for vision mode, inline images) and
//! returning plain text. Keeping the seam this narrow means tests can inject
//! a scripted model with a dozen lines of code, and the pipeline itself holds
//! no provider-specific or process-wide state.
//!
//! Real requests go through [`EdgequakeModel`], which wraps any
//! `edgequake_llm::LLMProvider` (OpenAI, Anthropic, Gemini, Ollama, Azure,
//! or any OpenAI-compatible endpoint).

use crate::config::QaConfig;
use crate::error::PdfQaError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use thiserror::Error;

/// Model used when neither the caller nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// A completion request: one prompt, optional inline images, fixed sampling
/// parameters.
#[derive(Clone)]
pub struct ChatQuery {
    /// The full prompt text (instructions + context + question).
    pub prompt: String,
    /// Inline image payloads for vision-capable models. Empty in text mode.
    pub images: Vec<ImageData>,
    /// Sampling temperature. Routing and answering both pin this at or near
    /// zero: these are classification/grounding calls, not open generation.
    pub temperature: f32,
    /// Maximum tokens the model may generate.
    pub max_tokens: usize,
}

impl std::fmt::Debug for ChatQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatQuery")
            .field("prompt_chars", &self.prompt.len())
            .field("images", &self.images.len())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ChatQuery {
    /// Text-only query.
    pub fn text(prompt: impl Into<String>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
            temperature,
            max_tokens,
        }
    }

    /// Attach inline images (vision mode).
    pub fn with_images(mut self, images: Vec<ImageData>) -> Self {
        self.images = images;
        self
    }
}

/// Error from a single model call.
///
/// Deliberately a plain message: every caller in this crate converts a failed
/// call into a soft result (routing `None`, apology answer, profile `None`),
/// so nothing downstream ever matches on the error's structure.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// The LLM collaborator interface consumed by the router, answerer, and
/// profiler.
///
/// Implementations must be `Send + Sync`; the pipeline shares one model
/// across the whole session behind an `Arc`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one completion request and return the raw response text.
    async fn complete(&self, query: &ChatQuery) -> Result<String, ModelError>;
}

/// [`ChatModel`] backed by an `edgequake_llm::LLMProvider`.
pub struct EdgequakeModel {
    provider: Arc<dyn LLMProvider>,
}

impl EdgequakeModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChatModel for EdgequakeModel {
    async fn complete(&self, query: &ChatQuery) -> Result<String, ModelError> {
        let message = if query.images.is_empty() {
            ChatMessage::user(query.prompt.as_str())
        } else {
            ChatMessage::user_with_images(query.prompt.as_str(), query.images.clone())
        };
        let messages = vec![message];

        let options = CompletionOptions {
            temperature: Some(query.temperature),
            max_tokens: Some(query.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError(format!("{e}")))?;

        Ok(response.content)
    }
}

/// Instantiate a named provider with the given model, wrapped as a
/// [`ChatModel`].
fn create_model(provider_name: &str, model: &str) -> Result<Arc<dyn ChatModel>, PdfQaError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PdfQaError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(EdgequakeModel::new(provider)))
}

/// Resolve the chat model, from most-specific to least-specific.
///
/// The four-level fallback chain lets library users and CLI users each set
/// exactly as much or as little as they need:
///
/// 1. **Injected model** (`config.model`) — the caller constructed the object
///    entirely (a real provider with middleware, or a test double).
///
/// 2. **Named provider** (`config.provider_name`) — e.g. `"openai"` plus an
///    optional model id; the factory reads the matching API key
///    (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    both set means the execution environment (Makefile, CI) chose; honoured
///    before auto-detection so the choice survives multiple API keys being
///    present.
///
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — scans known API
///    key variables and picks the first available provider, preferring OpenAI
///    when its key is present.
pub fn resolve_model(config: &QaConfig) -> Result<Arc<dyn ChatModel>, PdfQaError> {
    // 1) Injected model takes priority
    if let Some(ref model) = config.model {
        return Ok(Arc::clone(model));
    }

    // 2) Provider name + model id
    if let Some(ref name) = config.provider_name {
        let model_id = config.model_id.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_model(name, model_id);
    }

    // 3) Environment pair
    if let (Ok(prov), Ok(model_id)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model_id.is_empty() {
            return create_model(&prov, &model_id);
        }
    }

    // Prefer OpenAI explicitly when an OpenAI API key is present, so users
    // with multiple provider keys get a predictable default.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model_id = config.model_id.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_model("openai", model_id);
        }
    }

    // 4) Full auto-detection
    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PdfQaError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(EdgequakeModel::new(provider)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_query_has_no_images() {
        let q = ChatQuery::text("what is on page 2?", 0.0, 512);
        assert!(q.images.is_empty());
        assert_eq!(q.temperature, 0.0);
        assert_eq!(q.max_tokens, 512);
    }

    #[test]
    fn with_images_attaches_payloads() {
        let img = ImageData::new("aGVsbG8=", "image/png");
        let q = ChatQuery::text("describe this page", 0.0, 512).with_images(vec![img]);
        assert_eq!(q.images.len(), 1);
    }

    #[test]
    fn model_error_displays_detail() {
        let e = ModelError("HTTP 500 from provider".into());
        assert!(e.to_string().contains("HTTP 500"));
    }
}
