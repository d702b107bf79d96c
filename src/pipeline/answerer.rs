//! Grounded answering: a citation-bearing answer constrained to supplied
//! context.
//!
//! The prompt does three things the rest of the pipeline depends on:
//! restricts the model to the supplied pages (no outside knowledge), mandates
//! the answer/evidence template whose quote the locator will search for
//! verbatim, and mandates a fixed fallback string when the context does not
//! support an answer. Temperature stays at zero because an invented quote is
//! not a style problem — it breaks the evidence-location contract downstream.
//!
//! ## Failure policy
//!
//! A transport/API error is terminal for this one question: the outcome
//! carries a fixed apology string as the answer text, no quote, no page, and
//! the error detail in [`AnswerOutcome::failure`]. Never retried, never
//! raised.

use crate::config::QaConfig;
use crate::error::AskFailure;
use crate::llm::{ChatModel, ChatQuery};
use crate::pipeline::truncate_chars;
use crate::prompts::{
    self, DEFAULT_ANSWER_INSTRUCTIONS, MODEL_UNAVAILABLE_APOLOGY, NOT_FOUND_FALLBACK,
    VISION_CONTEXT_NOTE,
};
use crate::session::{Answer, PageRecord};
use edgequake_llm::ImageData;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one answering call: the answer plus the degradation that
/// produced it, if any.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub answer: Answer,
    pub failure: Option<AskFailure>,
}

/// Answer the question from the supplied pages only.
///
/// With a single page (routed mode) the full page content is sent; with
/// several pages (batch mode) the assembled context block is capped at
/// `config.context_chars`, mirroring the router's bounded-prompt trade-off.
/// `page_image` attaches a rendered page for vision-capable models.
///
/// `page_count` bounds citation validation: a cited page outside
/// `[1, page_count]` keeps the answer and quote but drops the citation, the
/// same range policy the router applies to its own output.
pub async fn answer(
    model: &Arc<dyn ChatModel>,
    pages: &[&PageRecord],
    question: &str,
    page_count: usize,
    page_image: Option<ImageData>,
    config: &QaConfig,
) -> AnswerOutcome {
    let batch_limit = if pages.len() > 1 {
        Some(config.context_chars)
    } else {
        None
    };
    let context = build_context(pages, batch_limit);

    let mut instructions = config
        .answer_instructions
        .as_deref()
        .unwrap_or(DEFAULT_ANSWER_INSTRUCTIONS)
        .to_string();
    if page_image.is_some() {
        instructions.push_str(VISION_CONTEXT_NOTE);
    }

    let prompt = prompts::answer_prompt(&instructions, &context, question);
    debug!(
        "Answer prompt: {} chars over {} page(s)",
        prompt.len(),
        pages.len()
    );

    let mut query = ChatQuery::text(prompt, config.temperature, config.max_tokens);
    if let Some(image) = page_image {
        query = query.with_images(vec![image]);
    }

    match model.complete(&query).await {
        Ok(raw) => AnswerOutcome {
            answer: parse_answer(&raw, page_count),
            failure: None,
        },
        Err(e) => {
            warn!("Answer call failed: {e}");
            AnswerOutcome {
                answer: Answer {
                    text: MODEL_UNAVAILABLE_APOLOGY.to_string(),
                    quote: None,
                    cited_page: None,
                },
                failure: Some(AskFailure::AnswerDegraded {
                    detail: e.to_string(),
                }),
            }
        }
    }
}

/// Assemble the labelled context block from the supplied pages.
pub fn build_context(pages: &[&PageRecord], limit: Option<usize>) -> String {
    let joined = pages
        .iter()
        .map(|p| format!("--- Page {} ---\n{}", p.number, p.combined))
        .collect::<Vec<_>>()
        .join("\n\n");

    match limit {
        Some(n) => truncate_chars(&joined, n).to_string(),
        None => joined,
    }
}

static RE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<QUOTE>(.*?)</QUOTE>").unwrap());
static RE_SOURCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<SOURCE>\s*Page\s*(\d+)").unwrap());
static RE_BRACKET_PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[Page\s*(\d+)\]").unwrap());

/// Parse the model's response into an [`Answer`].
///
/// The fallback string is normalised byte-for-byte (models sometimes wrap it
/// in the quotes the instruction used); otherwise the full response is kept
/// as the answer text and the evidence block is mined for a quote and page.
pub fn parse_answer(raw: &str, page_count: usize) -> Answer {
    let trimmed = raw.trim();

    if is_fallback(trimmed) {
        return Answer {
            text: NOT_FOUND_FALLBACK.to_string(),
            quote: None,
            cited_page: None,
        };
    }

    let quote = RE_QUOTE
        .captures(trimmed)
        .map(|c| c[1].trim().to_string())
        .filter(|q| !q.is_empty());

    let cited_page = extract_cited_page(trimmed).filter(|&p| {
        let in_range = p >= 1 && p <= page_count;
        if !in_range {
            warn!("Answer cited page {p} of a {page_count}-page document; dropping citation");
        }
        in_range
    });

    Answer {
        text: trimmed.to_string(),
        quote,
        cited_page,
    }
}

/// True when the response is the fixed not-found fallback, modulo surrounding
/// whitespace or a single layer of quoting.
fn is_fallback(trimmed: &str) -> bool {
    let stripped = trimmed
        .trim_matches(|c| c == '\'' || c == '"')
        .trim();
    stripped == NOT_FOUND_FALLBACK
}

/// Page number from the evidence block, preferring the `<SOURCE>` marker and
/// falling back to a `[Page N]` citation in the prose.
fn extract_cited_page(raw: &str) -> Option<usize> {
    RE_SOURCE
        .captures(raw)
        .or_else(|| RE_BRACKET_PAGE.captures(raw))
        .and_then(|c| c[1].parse::<usize>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATED: &str = "**Answer:**\nThe dropout rate was 0.5.\n\n<EVIDENCE>\n<QUOTE>The dropout rate was 0.5.</QUOTE>\n<SOURCE>Page 2</SOURCE>\n</EVIDENCE>";

    #[test]
    fn parses_quote_and_page_from_template() {
        let a = parse_answer(TEMPLATED, 3);
        assert_eq!(a.quote.as_deref(), Some("The dropout rate was 0.5."));
        assert_eq!(a.cited_page, Some(2));
        assert!(a.text.contains("**Answer:**"));
    }

    #[test]
    fn fallback_is_normalised_byte_for_byte() {
        for raw in [
            NOT_FOUND_FALLBACK,
            "  The answer could not be found in the provided document.  ",
            "'The answer could not be found in the provided document.'",
        ] {
            let a = parse_answer(raw, 3);
            assert_eq!(a.text, NOT_FOUND_FALLBACK);
            assert!(a.quote.is_none());
            assert!(a.cited_page.is_none());
        }
    }

    #[test]
    fn missing_evidence_block_gives_no_quote() {
        let a = parse_answer("**Answer:**\nIt was 0.5, roughly.", 3);
        assert!(a.quote.is_none());
        assert!(a.cited_page.is_none());
        assert!(a.text.contains("roughly"));
    }

    #[test]
    fn out_of_range_citation_is_dropped_but_quote_kept() {
        let raw = "**Answer:**\nYes.\n\n<EVIDENCE>\n<QUOTE>Some supporting sentence.</QUOTE>\n<SOURCE>Page 9</SOURCE>\n</EVIDENCE>";
        let a = parse_answer(raw, 3);
        assert_eq!(a.quote.as_deref(), Some("Some supporting sentence."));
        assert!(a.cited_page.is_none());
    }

    #[test]
    fn bracket_citation_is_a_fallback_source() {
        let a = parse_answer("The study used SVM classifiers [Page 4].", 5);
        assert_eq!(a.cited_page, Some(4));
    }

    #[test]
    fn multiline_quote_is_captured() {
        let raw = "<EVIDENCE>\n<QUOTE>First line\nsecond line.</QUOTE>\n<SOURCE>Page 1</SOURCE>\n</EVIDENCE>";
        let a = parse_answer(raw, 2);
        assert_eq!(a.quote.as_deref(), Some("First line\nsecond line."));
    }

    #[test]
    fn empty_quote_tags_give_none() {
        let a = parse_answer("<QUOTE>   </QUOTE> <SOURCE>Page 1</SOURCE>", 2);
        assert!(a.quote.is_none());
    }

    #[test]
    fn context_labels_every_page() {
        let p1 = PageRecord::new(1, "alpha", "");
        let p2 = PageRecord::new(2, "beta", "");
        let ctx = build_context(&[&p1, &p2], None);
        assert!(ctx.contains("--- Page 1 ---\nalpha"));
        assert!(ctx.contains("--- Page 2 ---\nbeta"));
    }

    #[test]
    fn batch_context_is_capped() {
        let long = "y".repeat(5000);
        let p1 = PageRecord::new(1, long, "");
        let p2 = PageRecord::new(2, "tail", "");
        let ctx = build_context(&[&p1, &p2], Some(4000));
        assert_eq!(ctx.chars().count(), 4000);
    }
}
