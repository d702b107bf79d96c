//! Per-question orchestration: route → answer → locate.
//!
//! One [`AskReport`] comes back per question, always — the chain degrades
//! per component rather than raising. Routing failure short-circuits with a
//! fixed message; an answering failure yields the fixed apology; a quote that
//! cannot be located just means no clip. Only provider resolution is fatal,
//! and only because nothing at all can run without a model.
//!
//! The chain is strictly sequential and blocks on each model call; questions
//! are never processed concurrently within a session.

use crate::config::QaConfig;
use crate::error::{AskFailure, PdfQaError};
use crate::llm::{resolve_model, ChatModel};
use crate::pipeline::{answerer, locator, render, router};
use crate::prompts::NO_ROUTE_MESSAGE;
use crate::session::{Answer, AskReport, DocumentSession, PageRecord};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Answer one question against the session, in routed mode.
///
/// Resolves the model from the config (injected object, named provider, or
/// environment auto-detection), then runs the Router→Answerer→Locator chain.
///
/// # Errors
/// Only [`PdfQaError::ProviderNotConfigured`] (no usable model). Every
/// per-question problem degrades into the returned report instead.
pub async fn ask(
    session: &DocumentSession,
    question: &str,
    config: &QaConfig,
) -> Result<AskReport, PdfQaError> {
    let model = resolve_model(config)?;
    Ok(ask_with_model(&model, session, question, config).await)
}

/// Routed mode with an explicit model (the injection point for tests and
/// callers managing their own provider).
pub async fn ask_with_model(
    model: &Arc<dyn ChatModel>,
    session: &DocumentSession,
    question: &str,
    config: &QaConfig,
) -> AskReport {
    let start = Instant::now();
    info!("Question: {question}");

    // ── Step 1: Route to the most relevant page ──────────────────────────
    let Some(page_number) = router::route(model, session, question, config).await else {
        return routing_failed_report(question, start);
    };

    // Route guarantees the range, so this lookup cannot miss; the guard only
    // keeps a logic regression from panicking the loop.
    let Some(record) = session.page(page_number) else {
        warn!("Routed page {page_number} vanished from the session");
        return routing_failed_report(question, start);
    };

    // ── Step 2: Vision render (optional; degrades to text-only) ──────────
    let page_image = if config.vision {
        match render::render_page_image(session.source(), page_number, config).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Vision render failed; continuing text-only: {e}");
                None
            }
        }
    } else {
        None
    };

    // ── Step 3: Grounded answer over the routed page ─────────────────────
    let outcome = answerer::answer(
        model,
        &[record],
        question,
        session.page_count(),
        page_image,
        config,
    )
    .await;
    let answer = outcome.answer;
    let mut failure = outcome.failure;

    // ── Step 4: Locate the quoted evidence ───────────────────────────────
    let clip = if let Some(ref quote) = answer.quote {
        let evidence_page = answer.cited_page.unwrap_or(page_number);
        let clip = locator::locate(session.source(), evidence_page, quote, config).await;
        if clip.is_none() && failure.is_none() {
            failure = Some(AskFailure::EvidenceNotFound {
                page: evidence_page,
            });
        }
        clip
    } else {
        None
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Question answered from page {page_number} in {duration_ms}ms (clip: {})",
        clip.is_some()
    );

    AskReport {
        question: question.to_string(),
        routed_page: Some(page_number),
        answer,
        clip,
        failure,
        duration_ms,
    }
}

/// Answer one question over the whole document, skipping routing.
///
/// All pages go into one context block, capped at `config.context_chars` —
/// the original batch trade-off: simpler, but long documents get truncated.
pub async fn ask_batch(
    session: &DocumentSession,
    question: &str,
    config: &QaConfig,
) -> Result<AskReport, PdfQaError> {
    let model = resolve_model(config)?;
    Ok(ask_batch_with_model(&model, session, question, config).await)
}

/// Batch mode with an explicit model.
pub async fn ask_batch_with_model(
    model: &Arc<dyn ChatModel>,
    session: &DocumentSession,
    question: &str,
    config: &QaConfig,
) -> AskReport {
    let start = Instant::now();
    info!("Question (batch mode): {question}");

    let pages: Vec<&PageRecord> = session.pages().iter().collect();
    let outcome = answerer::answer(
        model,
        &pages,
        question,
        session.page_count(),
        None,
        config,
    )
    .await;
    let answer = outcome.answer;
    let mut failure = outcome.failure;

    // Without routing there is no default evidence page; a clip needs an
    // explicit citation.
    let clip = match (&answer.quote, answer.cited_page) {
        (Some(quote), Some(evidence_page)) => {
            let clip = locator::locate(session.source(), evidence_page, quote, config).await;
            if clip.is_none() && failure.is_none() {
                failure = Some(AskFailure::EvidenceNotFound {
                    page: evidence_page,
                });
            }
            clip
        }
        _ => None,
    };

    AskReport {
        question: question.to_string(),
        routed_page: None,
        answer,
        clip,
        failure,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

fn routing_failed_report(question: &str, start: Instant) -> AskReport {
    AskReport {
        question: question.to_string(),
        routed_page: None,
        answer: Answer {
            text: NO_ROUTE_MESSAGE.to_string(),
            quote: None,
            cited_page: None,
        },
        clip: None,
        failure: Some(AskFailure::RoutingFailed),
        duration_ms: start.elapsed().as_millis() as u64,
    }
}
