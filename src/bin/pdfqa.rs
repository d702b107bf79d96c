//! CLI binary for pdfqa.
//!
//! A thin shim over the library crate that maps CLI flags to `QaConfig`,
//! drives the interactive question loop, and writes evidence clips to disk.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use pdfqa::llm::resolve_model;
use pdfqa::{
    ask_batch_with_model, ask_with_model, load_stream, profile::profile_with_model, AskFailure,
    AskReport, QaConfig,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Interactive question loop over a local PDF
  pdfqa paper.pdf

  # One-shot question
  pdfqa paper.pdf -Q "What was the dropout rate?"

  # Answer over all pages at once (no routing), from a URL
  pdfqa https://arxiv.org/pdf/1706.03762 --batch -Q "Who are the authors?"

  # Vision mode: attach the routed page image for figure-heavy documents
  pdfqa slides.pdf --vision -Q "What does the architecture diagram show?"

  # Extract structured document metadata as JSON
  pdfqa report.pdf --profile --json

  # Use a specific model and keep clips in a separate directory
  pdfqa --provider openai --model gpt-4.1-mini --clip-dir clips/ paper.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium shared library

SETUP:
  1. Set an API key:   export OPENAI_API_KEY=sk-...
  2. Install pdfium:   put libpdfium on the library path, or set PDFIUM_LIB_PATH
  3. Ask away:         pdfqa document.pdf

  Evidence clips are written as reference_clip_page_<N>.png next to the
  current directory (or --clip-dir) and overwritten on rerun.
"#;

/// Ask questions about a PDF with grounded, citation-bearing answers.
#[derive(Parser, Debug)]
#[command(
    name = "pdfqa",
    version,
    about = "Ask questions about a PDF — grounded answers with citations and visual evidence clips",
    long_about = "Load a PDF (local file or URL), then answer natural-language questions about it. \
Each question is routed to the most relevant page, answered strictly from that page's content \
with an exact supporting quote, and the quote is located on the rendered page and cropped to a \
PNG evidence clip. Supports OpenAI, Anthropic, Google Gemini, and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Ask a single question and exit instead of starting the interactive loop.
    #[arg(short = 'Q', long)]
    question: Option<String>,

    /// Answer over all pages at once instead of routing to one page.
    #[arg(long, env = "PDFQA_BATCH")]
    batch: bool,

    /// Attach the routed page's rendered image to the answer request
    /// (requires a vision-capable model).
    #[arg(long, env = "PDFQA_VISION")]
    vision: bool,

    /// Extract structured document metadata (title, author, topics, …) and exit.
    #[arg(long)]
    profile: bool,

    /// Output machine-readable JSON (for --profile and -Q).
    #[arg(long, env = "PDFQA_JSON")]
    json: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Characters of each page shown to the routing step.
    #[arg(long, env = "PDFQA_SUMMARY_CHARS", default_value_t = 300)]
    summary_chars: usize,

    /// Character cap on the batch-mode context block.
    #[arg(long, env = "PDFQA_CONTEXT_CHARS", default_value_t = 4000)]
    context_chars: usize,

    /// Evidence clip render resolution (72–400 DPI).
    #[arg(long, env = "PDFQA_CLIP_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    clip_dpi: u32,

    /// Directory to write evidence clips into.
    #[arg(long, env = "PDFQA_CLIP_DIR", default_value = ".")]
    clip_dir: PathBuf,

    /// Max LLM output tokens per call.
    #[arg(long, env = "PDFQA_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0). Keep at 0 unless you know why not.
    #[arg(long, env = "PDFQA_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFQA_PASSWORD")]
    password: Option<String>,

    /// Path to a text file overriding the routing instructions.
    #[arg(long, env = "PDFQA_ROUTING_PROMPT")]
    routing_prompt: Option<PathBuf>,

    /// Path to a text file overriding the answer instructions.
    #[arg(long, env = "PDFQA_ANSWER_PROMPT")]
    answer_prompt: Option<PathBuf>,

    /// Skip OCR of embedded page images even when an engine is available.
    #[arg(long, env = "PDFQA_NO_OCR")]
    no_ocr: bool,

    /// OCR language passed to Tesseract (with the `tesseract` feature).
    #[arg(long, env = "PDFQA_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Disable the loading progress bar.
    #[arg(long, env = "PDFQA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFQA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except answers and errors.
    #[arg(short, long, env = "PDFQA_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "PDFQA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Keep library logs out of the way of the conversation unless asked.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    // Resolve the model up front (fail fast on a missing API key, before the
    // potentially slow document load); every question reuses it.
    let model = resolve_model(&config).context("No usable LLM provider")?;

    // ── Load the document (one session per run) ──────────────────────────
    let session = load_with_progress(&cli, &config).await?;

    if !cli.quiet {
        eprintln!(
            "{} {} loaded ({} pages)",
            green("✓"),
            bold(&cli.input),
            session.page_count()
        );
    }

    // ── Profile mode ─────────────────────────────────────────────────────
    if cli.profile {
        match profile_with_model(&model, &session, &config).await {
            Some(p) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&p)?);
                } else {
                    print_profile(&p);
                }
            }
            None => {
                eprintln!("{} No profile could be extracted from this document", yellow("⚠"));
            }
        }
        return Ok(());
    }

    // ── One-shot question ────────────────────────────────────────────────
    if let Some(ref question) = cli.question {
        let report = if cli.batch {
            ask_batch_with_model(&model, &session, question, &config).await
        } else {
            ask_with_model(&model, &session, question, &config).await
        };
        present_report(&cli, &report)?;
        return Ok(());
    }

    // ── Interactive loop ─────────────────────────────────────────────────
    if !cli.quiet {
        eprintln!(
            "{}",
            dim("Document analysis complete. Ask questions; type 'quit' to exit.")
        );
    }

    loop {
        print!("\n{} ", cyan("You (type 'quit' to exit):"));
        io::stdout().flush().ok();

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            // EOF (ctrl-d / piped input exhausted)
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "quit" | "exit") {
            if !cli.quiet {
                eprintln!("{}", dim("Exiting chat. Goodbye!"));
            }
            break;
        }

        let report = if cli.batch {
            ask_batch_with_model(&model, &session, question, &config).await
        } else {
            ask_with_model(&model, &session, question, &config).await
        };
        present_report(&cli, &report)?;
    }

    Ok(())
}

/// Map CLI args to `QaConfig`.
async fn build_config(cli: &Cli) -> Result<QaConfig> {
    let mut builder = QaConfig::builder()
        .summary_chars(cli.summary_chars)
        .context_chars(cli.context_chars)
        .clip_dpi(cli.clip_dpi)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .vision(cli.vision)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model_id(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref path) = cli.routing_prompt {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read routing instructions from {path:?}"))?;
        builder = builder.routing_instructions(text);
    }
    if let Some(ref path) = cli.answer_prompt {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read answer instructions from {path:?}"))?;
        builder = builder.answer_instructions(text);
    }

    #[cfg(feature = "tesseract")]
    if !cli.no_ocr {
        match pdfqa::TesseractOcr::new(&cli.ocr_lang) {
            Ok(engine) => builder = builder.ocr(std::sync::Arc::new(engine)),
            Err(e) => eprintln!(
                "{} OCR unavailable ({e}); embedded images will be skipped",
                yellow("⚠")
            ),
        }
    }
    #[cfg(not(feature = "tesseract"))]
    if !cli.no_ocr {
        // Built without an OCR engine; pages load with empty OCR sections.
        let _ = &cli.ocr_lang;
    }

    builder.build().context("Invalid configuration")
}

/// Load the session, showing a per-page progress bar while pages stream in.
async fn load_with_progress(cli: &Cli, config: &QaConfig) -> Result<pdfqa::DocumentSession> {
    let (source, mut stream) = load_stream(&cli.input, config)
        .await
        .context("Failed to load PDF")?;

    let show_bar = !cli.quiet && !cli.no_progress;
    let bar = if show_bar {
        let bar = ProgressBar::new(source.page_count() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Reading");
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let mut pages = Vec::with_capacity(source.page_count());
    while let Some(item) = stream.next().await {
        let record = item.context("Failed while extracting pages")?;
        if let Some(ref bar) = bar {
            bar.inc(1);
        }
        pages.push(record);
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    Ok(source.into_session(pages))
}

/// Print one question's outcome and write its evidence clip, if any.
fn present_report(cli: &Cli, report: &AskReport) -> Result<()> {
    if cli.json && cli.question.is_some() {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("\n{}", bold("Assistant:"));
        println!("{}", report.answer.text);
    }

    if let Some(ref clip) = report.clip {
        std::fs::create_dir_all(&cli.clip_dir)
            .with_context(|| format!("Failed to create clip directory {:?}", cli.clip_dir))?;
        let path = cli.clip_dir.join(clip.filename());
        std::fs::write(&path, &clip.png)
            .with_context(|| format!("Failed to write evidence clip to {path:?}"))?;
        if !cli.quiet {
            eprintln!(
                "{} Evidence clip saved to {}",
                green("✓"),
                bold(&path.display().to_string())
            );
        }
    } else if let Some(ref failure) = report.failure {
        // Routing and answer degradations already speak through the answer
        // text; only the missing-clip case needs its own note.
        if matches!(failure, AskFailure::EvidenceNotFound { .. }) && !cli.quiet {
            eprintln!(
                "{} {}",
                yellow("⚠"),
                dim("Could not find the exact quote on the page to create a clip.")
            );
        }
    }

    if !cli.quiet {
        if let Some(page) = report.routed_page {
            eprintln!(
                "   {}",
                dim(&format!("page {page}  ·  {}ms", report.duration_ms))
            );
        }
    }

    Ok(())
}

fn print_profile(p: &pdfqa::DocumentProfile) {
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "—".to_string());
    println!("Title:             {}", show(&p.title));
    println!("Author:            {}", show(&p.author));
    println!("Organization:      {}", show(&p.organization));
    println!("Publication date:  {}", show(&p.publication_date));
    println!("Document type:     {}", show(&p.document_type));
    println!(
        "Key topics:        {}",
        if p.key_topics.is_empty() {
            "—".to_string()
        } else {
            p.key_topics.join(", ")
        }
    );
    println!("Summary:           {}", show(&p.summary));
}
