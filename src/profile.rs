//! Document profile extraction: structured metadata from the combined text.
//!
//! The model is asked for a strict JSON object (fixed keys, null for
//! anything it cannot determine, no surrounding prose) and the response is
//! fed to serde. The parse is deliberately forgiving about packaging —
//! models wrap JSON in code fences or a leading sentence often enough that
//! the brace-delimited span is extracted before parsing — but not about
//! content: anything serde rejects means no profile.

use crate::config::QaConfig;
use crate::error::PdfQaError;
use crate::llm::{resolve_model, ChatModel, ChatQuery};
use crate::pipeline::truncate_chars;
use crate::prompts;
use crate::session::{DocumentProfile, DocumentSession};
use std::sync::Arc;
use tracing::{info, warn};

/// Extract a [`DocumentProfile`] from the session's combined text.
///
/// Soft-fails to `Ok(None)` on any model or parse problem — a document
/// without a determinable profile is an ordinary outcome, not an error.
///
/// # Errors
/// Only [`PdfQaError::ProviderNotConfigured`].
pub async fn profile(
    session: &DocumentSession,
    config: &QaConfig,
) -> Result<Option<DocumentProfile>, PdfQaError> {
    let model = resolve_model(config)?;
    Ok(profile_with_model(&model, session, config).await)
}

/// Profile extraction with an explicit model.
pub async fn profile_with_model(
    model: &Arc<dyn ChatModel>,
    session: &DocumentSession,
    config: &QaConfig,
) -> Option<DocumentProfile> {
    let text = session
        .pages()
        .iter()
        .map(|p| p.combined.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let excerpt = truncate_chars(&text, config.context_chars);

    let prompt = prompts::profile_prompt(excerpt);
    let query = ChatQuery::text(prompt, config.temperature, config.max_tokens);

    let raw = match model.complete(&query).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Profile call failed: {e}");
            return None;
        }
    };

    match parse_profile(&raw) {
        Some(p) => {
            info!("Profile extracted ({} key topics)", p.key_topics.len());
            Some(p)
        }
        None => {
            warn!("Profile response was not parseable JSON: {raw:?}");
            None
        }
    }
}

/// Parse the model response into a profile.
///
/// Takes the span from the first `{` to the last `}` — which strips code
/// fences and stray prose in one move — and hands it to serde.
pub fn parse_profile(raw: &str) -> Option<DocumentProfile> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_JSON: &str = r#"{
        "title": "Pooling Layers",
        "author": "A. Researcher",
        "company_name": null,
        "publication_date": "2023",
        "document_type": "lecture notes",
        "key_topics": ["pooling", "convolution", "downsampling"],
        "summary": "Notes on pooling layers in CNNs."
    }"#;

    #[test]
    fn parses_bare_json() {
        let p = parse_profile(PROFILE_JSON).unwrap();
        assert_eq!(p.title.as_deref(), Some("Pooling Layers"));
        assert_eq!(p.key_topics.len(), 3);
        assert!(p.organization.is_none());
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{PROFILE_JSON}\n```");
        let p = parse_profile(&fenced).unwrap();
        assert_eq!(p.document_type.as_deref(), Some("lecture notes"));
    }

    #[test]
    fn parses_json_with_leading_prose() {
        let noisy = format!("Here is the metadata you asked for:\n{PROFILE_JSON}");
        assert!(parse_profile(&noisy).is_some());
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_profile("I could not extract metadata.").is_none());
        assert!(parse_profile("").is_none());
        assert!(parse_profile("{not json}").is_none());
    }
}
