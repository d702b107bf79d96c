//! Prompt templates for routing, answering, and profile extraction.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the fallback string, the evidence markers,
//!    and the routing instruction all appear in exactly one place; the parser
//!    in the answerer and the template here cannot drift apart silently.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without a
//!    live model, making template regressions easy to catch.
//!
//! Callers can override the instruction blocks via
//! [`crate::config::QaConfig::routing_instructions`] and
//! [`crate::config::QaConfig::answer_instructions`]; the constants here are
//! used when no override is provided.

/// Fixed string the model must return verbatim when the context does not
/// support an answer. The answerer compares against this byte-for-byte to
/// decide that no quote or citation exists.
pub const NOT_FOUND_FALLBACK: &str = "The answer could not be found in the provided document.";

/// Fixed user-visible answer text when the model call itself fails. Terminal
/// for that single question; the session continues.
pub const MODEL_UNAVAILABLE_APOLOGY: &str =
    "Sorry, I could not process the request to the AI model.";

/// Fixed user-visible answer text when routing produced no usable page.
pub const NO_ROUTE_MESSAGE: &str =
    "Sorry, I couldn't determine a relevant page for that question.";

/// Evidence markers of the answer template. The answerer's parser extracts
/// the quote between [`QUOTE_OPEN`] and [`QUOTE_CLOSE`].
pub const QUOTE_OPEN: &str = "<QUOTE>";
pub const QUOTE_CLOSE: &str = "</QUOTE>";

/// Default instruction block for the page router.
///
/// The response contract is deliberately brutal — "ONLY the page number as an
/// integer" — because the caller extracts the first integer token from
/// whatever comes back and anything else is wasted tokens.
pub const DEFAULT_ROUTING_INSTRUCTIONS: &str = "You are a routing assistant. Your job is to find the most relevant page number to answer the user's question based on the page summaries. Prioritize pages whose figures or images are mentioned if the question asks about one. Respond with ONLY the page number as an integer.";

/// Default instruction block for the grounded answerer.
///
/// Three load-bearing requirements: context-only answering, the fixed
/// response template (whose quote the evidence locator will search for
/// verbatim on the rendered page), and the exact fallback string.
pub const DEFAULT_ANSWER_INSTRUCTIONS: &str = r#"You are a research assistant. Your task is to answer a question based ONLY on the text provided within the <DOCUMENT_CONTEXT> tags. You are forbidden from using outside knowledge.

Your response MUST be in this format:
**Answer:**
[Your clear and concise answer.]

<EVIDENCE>
<QUOTE>An exact quote from the document that directly proves your answer.</QUOTE>
<SOURCE>Page X</SOURCE>
</EVIDENCE>

CRITICAL RULE: If the answer is not in the document, respond ONLY with: 'The answer could not be found in the provided document.' Do not try to guess or infer an answer."#;

/// Extra instruction appended in vision mode, where the rendered page image
/// travels with the request.
pub const VISION_CONTEXT_NOTE: &str = "\n\nThe rendered page is attached as an image. Figures, diagrams, and tables visible in the image are part of the document context; if your evidence comes from one, say so in the answer.";

/// Build the routing prompt from page summaries and the user question.
pub fn routing_prompt(instructions: &str, summaries: &str, question: &str) -> String {
    format!(
        "{instructions}\n\n--- Page Summaries ---\n{summaries}\n\nUser Question: \"{question}\"\n\nMost relevant page number is:"
    )
}

/// Build the grounded-answer prompt from an assembled context block and the
/// user question.
pub fn answer_prompt(instructions: &str, context: &str, question: &str) -> String {
    format!(
        "{instructions}\n\n<DOCUMENT_CONTEXT>\n{context}\n</DOCUMENT_CONTEXT>\n\nUSER QUESTION: {question}"
    )
}

/// Build the profile-extraction prompt over the document's combined text.
///
/// The JSON-only contract matters: the caller feeds the response straight to
/// a JSON parser (after stripping stray code fences) and degrades to no
/// profile on anything unparseable.
pub fn profile_prompt(text: &str) -> String {
    format!(
        "You are a data extraction bot. Analyze the following document text, which includes text from paragraphs and from images across all pages, and extract key metadata. Your output MUST be a valid JSON object with the keys \"title\", \"author\", \"company_name\", \"publication_date\", \"document_type\", \"key_topics\" (a list of 3-5 topics), and \"summary\" describing the whole document. If a field is not available, return null for its value. Do not include any text before or after the JSON object.\n\nDOCUMENT TEXT:\n---\n{text}\n---"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_instructions_carry_the_exact_fallback() {
        // The parser compares responses against NOT_FOUND_FALLBACK verbatim;
        // the template must ask for exactly that string.
        assert!(DEFAULT_ANSWER_INSTRUCTIONS.contains(NOT_FOUND_FALLBACK));
    }

    #[test]
    fn answer_instructions_carry_the_evidence_markers() {
        assert!(DEFAULT_ANSWER_INSTRUCTIONS.contains(QUOTE_OPEN));
        assert!(DEFAULT_ANSWER_INSTRUCTIONS.contains(QUOTE_CLOSE));
        assert!(DEFAULT_ANSWER_INSTRUCTIONS.contains("<SOURCE>Page X</SOURCE>"));
    }

    #[test]
    fn routing_prompt_embeds_question_and_summaries() {
        let p = routing_prompt(
            DEFAULT_ROUTING_INSTRUCTIONS,
            "Page 1: intro...\nPage 2: results...",
            "What was the dropout rate?",
        );
        assert!(p.contains("Page 2: results..."));
        assert!(p.contains("\"What was the dropout rate?\""));
        assert!(p.ends_with("Most relevant page number is:"));
    }

    #[test]
    fn answer_prompt_wraps_context_in_tags() {
        let p = answer_prompt(DEFAULT_ANSWER_INSTRUCTIONS, "--- Page 2 ---\nBody", "Q?");
        let open = p.find("<DOCUMENT_CONTEXT>").unwrap();
        let close = p.find("</DOCUMENT_CONTEXT>").unwrap();
        assert!(open < close);
        assert!(p[open..close].contains("--- Page 2 ---"));
    }

    #[test]
    fn profile_prompt_demands_json_keys() {
        let p = profile_prompt("some document text");
        for key in [
            "\"title\"",
            "\"author\"",
            "\"company_name\"",
            "\"publication_date\"",
            "\"document_type\"",
            "\"key_topics\"",
            "\"summary\"",
        ] {
            assert!(p.contains(key), "missing {key}");
        }
    }
}
