//! Integration tests for the per-question pipeline, driven by a scripted
//! mock model.
//!
//! These tests exercise the routing → answering → locating chain and its
//! degradation paths without touching a network or a pdfium library: the
//! session is built from hand-made page records, and the model replays a
//! fixed script of responses. Evidence location against a real rendered page
//! is covered by the gated tests in `e2e.rs`.

use async_trait::async_trait;
use pdfqa::prompts::{MODEL_UNAVAILABLE_APOLOGY, NOT_FOUND_FALLBACK, NO_ROUTE_MESSAGE};
use pdfqa::{
    ask_batch_with_model, ask_with_model, AskFailure, ChatModel, ChatQuery, DocumentSession,
    ModelError, PageRecord, QaConfig,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays a fixed script of responses and records every query it saw.
struct MockModel {
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    queries: Mutex<Vec<ChatQuery>>,
}

impl MockModel {
    fn scripted<I>(responses: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<String, ModelError>>,
    {
        Arc::new(Self {
            script: Mutex::new(responses.into_iter().collect()),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn queries(&self) -> Vec<ChatQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn complete(&self, query: &ChatQuery) -> Result<String, ModelError> {
        self.queries.lock().unwrap().push(query.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError("mock script exhausted".into())))
    }
}

fn ok(s: &str) -> Result<String, ModelError> {
    Ok(s.to_string())
}

fn err(s: &str) -> Result<String, ModelError> {
    Err(ModelError(s.to_string()))
}

/// Three pages; the dropout-rate fact lives on page 2.
fn three_page_session() -> DocumentSession {
    DocumentSession::new(
        "no-such-file.pdf",
        vec![
            PageRecord::new(1, "Introduction to the study of pooling layers.", ""),
            PageRecord::new(
                2,
                "Training details. The dropout rate was 0.5. Batch size was 64.",
                "",
            ),
            PageRecord::new(3, "Conclusions and future work.", ""),
        ],
    )
}

const TEMPLATED_ANSWER: &str = "**Answer:**\nThe dropout rate was 0.5.\n\n<EVIDENCE>\n<QUOTE>The dropout rate was 0.5.</QUOTE>\n<SOURCE>Page 2</SOURCE>\n</EVIDENCE>";

const QUESTION: &str = "What was the dropout rate?";

#[tokio::test]
async fn routed_question_answers_from_the_routed_page_only() {
    let session = three_page_session();
    let model = MockModel::scripted([ok("2"), ok(TEMPLATED_ANSWER)]);
    let config = QaConfig::default();

    let report = ask_with_model(&(model.clone() as Arc<dyn ChatModel>), &session, QUESTION, &config).await;

    assert_eq!(report.routed_page, Some(2));
    assert!(report.answer.text.contains("0.5"));
    assert_eq!(report.answer.quote.as_deref(), Some("The dropout rate was 0.5."));
    assert_eq!(report.answer.cited_page, Some(2));

    let queries = model.queries();
    assert_eq!(queries.len(), 2, "one routing call, one answer call");

    // Routing prompt carries every page preview and the question.
    assert!(queries[0].prompt.contains("Page 1:"));
    assert!(queries[0].prompt.contains("Page 3:"));
    assert!(queries[0].prompt.contains(QUESTION));

    // Answer prompt is grounded on page 2 alone.
    assert!(queries[1].prompt.contains("--- Page 2 ---"));
    assert!(!queries[1].prompt.contains("--- Page 1 ---"));
    assert!(!queries[1].prompt.contains("--- Page 3 ---"));
    assert!(queries[1].prompt.contains("The dropout rate was 0.5."));

    // Both calls are deterministic-leaning.
    assert_eq!(queries[0].temperature, 0.0);
    assert_eq!(queries[1].temperature, 0.0);

    // The source file does not exist, so the locator cannot produce a clip;
    // that degradation is reported, not raised.
    assert!(report.clip.is_none());
    assert!(matches!(
        report.failure,
        Some(AskFailure::EvidenceNotFound { page: 2 })
    ));
}

#[tokio::test]
async fn routing_tolerates_extraneous_words_around_the_integer() {
    let session = three_page_session();
    let model = MockModel::scripted([
        ok("Sure! The most relevant page number is 2."),
        ok(TEMPLATED_ANSWER),
    ]);
    let config = QaConfig::default();

    let report = ask_with_model(&(model as Arc<dyn ChatModel>), &session, QUESTION, &config).await;
    assert_eq!(report.routed_page, Some(2));
}

#[tokio::test]
async fn routing_transport_error_degrades_to_no_route() {
    let session = three_page_session();
    let model = MockModel::scripted([err("connection refused")]);
    let config = QaConfig::default();

    let report =
        ask_with_model(&(model.clone() as Arc<dyn ChatModel>), &session, QUESTION, &config).await;

    assert_eq!(report.routed_page, None);
    assert_eq!(report.answer.text, NO_ROUTE_MESSAGE);
    assert!(report.answer.quote.is_none());
    assert!(report.clip.is_none());
    assert!(matches!(report.failure, Some(AskFailure::RoutingFailed)));
    assert_eq!(model.queries().len(), 1, "no answer call after a failed route");
}

#[tokio::test]
async fn routing_without_a_parseable_integer_degrades() {
    let session = three_page_session();
    let model = MockModel::scripted([ok("I really cannot tell.")]);
    let config = QaConfig::default();

    let report =
        ask_with_model(&(model.clone() as Arc<dyn ChatModel>), &session, QUESTION, &config).await;

    assert!(matches!(report.failure, Some(AskFailure::RoutingFailed)));
    assert_eq!(model.queries().len(), 1);
}

#[tokio::test]
async fn routing_out_of_range_page_degrades() {
    let session = three_page_session();
    let model = MockModel::scripted([ok("7")]);
    let config = QaConfig::default();

    let report = ask_with_model(&(model as Arc<dyn ChatModel>), &session, QUESTION, &config).await;

    assert_eq!(report.routed_page, None);
    assert!(matches!(report.failure, Some(AskFailure::RoutingFailed)));
}

#[tokio::test]
async fn answer_transport_error_degrades_to_apology() {
    let session = three_page_session();
    let model = MockModel::scripted([ok("2"), err("HTTP 503 from provider")]);
    let config = QaConfig::default();

    let report = ask_with_model(&(model as Arc<dyn ChatModel>), &session, QUESTION, &config).await;

    assert_eq!(report.routed_page, Some(2));
    assert_eq!(report.answer.text, MODEL_UNAVAILABLE_APOLOGY);
    assert!(report.answer.quote.is_none());
    assert!(report.clip.is_none());
    match report.failure {
        Some(AskFailure::AnswerDegraded { ref detail }) => {
            assert!(detail.contains("503"), "detail: {detail}")
        }
        ref other => panic!("expected AnswerDegraded, got {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_question_returns_the_exact_fallback_and_no_clip() {
    let session = three_page_session();
    let model = MockModel::scripted([ok("3"), ok(NOT_FOUND_FALLBACK)]);
    let config = QaConfig::default();

    let report = ask_with_model(
        &(model as Arc<dyn ChatModel>),
        &session,
        "What is the airspeed of an unladen swallow?",
        &config,
    )
    .await;

    assert_eq!(report.answer.text, NOT_FOUND_FALLBACK);
    assert!(report.answer.quote.is_none());
    assert!(report.answer.cited_page.is_none());
    assert!(report.clip.is_none());
    // A fallback answer is a complete, successful outcome — nothing degraded.
    assert!(report.failure.is_none());
}

#[tokio::test]
async fn quote_without_citation_falls_back_to_the_routed_page() {
    let session = three_page_session();
    let no_source =
        "**Answer:**\nIt was 0.5.\n\n<EVIDENCE>\n<QUOTE>The dropout rate was 0.5.</QUOTE>\n</EVIDENCE>";
    let model = MockModel::scripted([ok("2"), ok(no_source)]);
    let config = QaConfig::default();

    let report = ask_with_model(&(model as Arc<dyn ChatModel>), &session, QUESTION, &config).await;

    assert!(report.answer.quote.is_some());
    assert!(report.answer.cited_page.is_none());
    // The locator was pointed at the routed page (and found nothing, since
    // the backing file does not exist).
    assert!(matches!(
        report.failure,
        Some(AskFailure::EvidenceNotFound { page: 2 })
    ));
}

#[tokio::test]
async fn batch_mode_sends_every_page_in_one_call() {
    let session = three_page_session();
    let model = MockModel::scripted([ok(TEMPLATED_ANSWER)]);
    let config = QaConfig::default();

    let report =
        ask_batch_with_model(&(model.clone() as Arc<dyn ChatModel>), &session, QUESTION, &config)
            .await;

    assert_eq!(report.routed_page, None);
    assert_eq!(report.answer.cited_page, Some(2));

    let queries = model.queries();
    assert_eq!(queries.len(), 1, "batch mode skips routing");
    for label in ["--- Page 1 ---", "--- Page 2 ---", "--- Page 3 ---"] {
        assert!(queries[0].prompt.contains(label), "missing {label}");
    }
}

#[tokio::test]
async fn batch_mode_caps_the_context_block() {
    let filler = "lorem ipsum dolor sit amet ".repeat(400);
    let session = DocumentSession::new(
        "no-such-file.pdf",
        vec![
            PageRecord::new(1, filler.clone(), ""),
            PageRecord::new(2, "The needle sentence sits far past the cap.", ""),
        ],
    );
    let model = MockModel::scripted([ok(NOT_FOUND_FALLBACK)]);
    let config = QaConfig::builder().context_chars(4000).build().unwrap();

    ask_batch_with_model(&(model.clone() as Arc<dyn ChatModel>), &session, QUESTION, &config).await;

    let queries = model.queries();
    // The assembled context was truncated: the second page never made it in.
    assert!(!queries[0].prompt.contains("needle sentence"));
}

#[tokio::test]
async fn summary_truncation_is_honoured_in_the_routing_prompt() {
    let long_page = "a".repeat(1000);
    let session = DocumentSession::new(
        "no-such-file.pdf",
        vec![PageRecord::new(1, long_page, "")],
    );
    let model = MockModel::scripted([ok("1"), ok(NOT_FOUND_FALLBACK)]);
    let config = QaConfig::builder().summary_chars(200).build().unwrap();

    ask_with_model(&(model.clone() as Arc<dyn ChatModel>), &session, QUESTION, &config).await;

    let routing_prompt = &model.queries()[0].prompt;
    assert!(routing_prompt.contains(&"a".repeat(200)));
    assert!(!routing_prompt.contains(&"a".repeat(201)));
}
