//! Page routing: pick the single page most relevant to a question.
//!
//! Routing exists to bound the answer prompt: instead of shipping the whole
//! document to the model per question, a cheap classification call over
//! truncated per-page previews selects one page, and only that page's full
//! content goes into the grounded-answer prompt.
//!
//! ## Failure policy
//!
//! Routing is soft end to end: a transport error, an unparseable response,
//! and an out-of-range page number all come back as `None`. The caller treats
//! `None` as "cannot proceed with this question" and moves on — routing never
//! raises.

use crate::config::QaConfig;
use crate::llm::{ChatModel, ChatQuery};
use crate::pipeline::truncate_chars;
use crate::prompts::{self, DEFAULT_ROUTING_INSTRUCTIONS};
use crate::session::DocumentSession;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Select the most relevant page for the question, or `None`.
///
/// The returned number is guaranteed to be within `[1, page_count]`.
pub async fn route(
    model: &Arc<dyn ChatModel>,
    session: &DocumentSession,
    question: &str,
    config: &QaConfig,
) -> Option<usize> {
    let summaries = page_summaries(session, config.summary_chars);
    let instructions = config
        .routing_instructions
        .as_deref()
        .unwrap_or(DEFAULT_ROUTING_INSTRUCTIONS);
    let prompt = prompts::routing_prompt(instructions, &summaries, question);
    debug!("Routing prompt: {} chars", prompt.len());

    // Routing is a classification-like decision, not open generation; it
    // always runs at temperature 0 regardless of the configured answer
    // temperature.
    let query = ChatQuery::text(prompt, 0.0, config.max_tokens);

    let raw = match model.complete(&query).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Routing call failed: {e}");
            return None;
        }
    };

    let page = match extract_page_number(&raw) {
        Some(p) => p,
        None => {
            warn!("Routing response contained no page number: {raw:?}");
            return None;
        }
    };

    if page < 1 || page > session.page_count() {
        warn!(
            "Routing response named page {} of a {}-page document",
            page,
            session.page_count()
        );
        return None;
    }

    info!("Routed question to page {page}");
    Some(page)
}

/// Build the bounded per-page previews shown to the router.
///
/// Each line is `Page N: <first `limit` chars of combined content>...` —
/// truncation may hide late-page evidence, which is the router's accepted
/// precision/size trade-off.
pub fn page_summaries(session: &DocumentSession, limit: usize) -> String {
    session
        .pages()
        .iter()
        .map(|p| {
            format!(
                "Page {}: {}...",
                p.number,
                truncate_chars(&p.combined, limit).trim_end()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_FIRST_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Extract the first integer token found anywhere in the response.
///
/// The instruction says "ONLY the page number", but models add stray words
/// ("The most relevant page is 3."); scanning for the first integer keeps
/// routing robust to that.
pub fn extract_page_number(raw: &str) -> Option<usize> {
    RE_FIRST_INT
        .find(raw)
        .and_then(|m| m.as_str().parse::<usize>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PageRecord;

    fn session(pages: &[&str]) -> DocumentSession {
        DocumentSession::new(
            "doc.pdf",
            pages
                .iter()
                .enumerate()
                .map(|(i, text)| PageRecord::new(i + 1, *text, ""))
                .collect(),
        )
    }

    #[test]
    fn extracts_bare_integer() {
        assert_eq!(extract_page_number("2"), Some(2));
        assert_eq!(extract_page_number("  4  \n"), Some(4));
    }

    #[test]
    fn extracts_integer_from_extraneous_text() {
        assert_eq!(
            extract_page_number("The most relevant page number is 3."),
            Some(3)
        );
        assert_eq!(extract_page_number("Page 12 looks best"), Some(12));
    }

    #[test]
    fn no_integer_yields_none() {
        assert_eq!(extract_page_number("I cannot tell."), None);
        assert_eq!(extract_page_number(""), None);
    }

    #[test]
    fn absurdly_long_digit_runs_yield_none() {
        // Longer than usize can hold — parse fails, treated as no answer.
        assert_eq!(extract_page_number(&"9".repeat(40)), None);
    }

    #[test]
    fn summaries_are_truncated_per_page() {
        let long = "x".repeat(500);
        let s = session(&["short intro", &long]);
        let summaries = page_summaries(&s, 300);
        let lines: Vec<&str> = summaries.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Page 1: short intro"));
        // 300 chars of content plus the "Page 2: " prefix and "..." suffix
        assert!(lines[1].len() <= 300 + "Page 2: ".len() + 3);
        assert!(lines[1].ends_with("..."));
    }
}
