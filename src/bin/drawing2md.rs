//! CLI binary for edgequake-drawing2md.
//!
//! A thin shim over the library crate: `serve` runs the browser UI, `analyze`
//! runs one analysis from the terminal.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_drawing2md::{
    web, AnalysisProgressCallback, Analyzer, AnalyzerConfig, ExtractionStrategy, ImageDetail,
    ProgressCallback, ServerConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
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

// ── CLI spinner using indicatif ──────────────────────────────────────────────

/// Spinner shown while the model call is in flight.
struct SpinnerCallback {
    bar: ProgressBar,
}

impl SpinnerCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for SpinnerCallback {
    fn on_analysis_start(&self, image_bytes: usize, mime_type: &str) {
        self.bar.set_message(format!("Encoding {image_bytes} bytes ({mime_type})…"));
    }

    fn on_request_start(&self, model: &str) {
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.bar.set_message(format!("Extracting information with {model}…"));
    }

    fn on_request_complete(&self, response_len: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} model replied {}", green("✔"), dim(&format!("({response_len} chars)")));
    }

    fn on_request_error(&self, _error: &str) {
        self.bar.finish_and_clear();
    }

    fn on_extraction(&self, found_record: bool) {
        if !found_record {
            eprintln!(
                "{} JSON data could not be extracted from the response.",
                yellow("⚠")
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the browser UI on http://127.0.0.1:3000
  drawing2md serve

  # Listen on all interfaces
  drawing2md serve --bind 0.0.0.0:8080

  # Analyse one drawing from the terminal
  drawing2md analyze bracket.jpg

  # Full result (raw reply, record, token counts) as JSON
  drawing2md analyze --json https://example.org/drawings/shaft.png

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter, e.g. edgequake_drawing2md=debug
"#;

/// Analyse mechanical engineering drawings with Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "drawing2md",
    version,
    about = "Analyse mechanical engineering drawings with Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    model: ModelArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DRAWING2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DRAWING2MD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the browser UI.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "DRAWING2MD_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,

        /// Largest accepted upload in MiB.
        #[arg(long, env = "DRAWING2MD_MAX_UPLOAD_MB", default_value_t = 20)]
        max_upload_mb: usize,
    },

    /// Analyse one image file or URL and print the result.
    Analyze {
        /// Local image path or HTTP/HTTPS URL.
        input: String,

        /// Print the full analysis as JSON instead of Markdown.
        #[arg(long, env = "DRAWING2MD_JSON")]
        json: bool,

        /// Disable the spinner.
        #[arg(long, env = "DRAWING2MD_NO_PROGRESS")]
        no_progress: bool,
    },
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM model ID (e.g. gpt-4o-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file containing a custom instruction.
    #[arg(long, global = true, env = "DRAWING2MD_PROMPT")]
    prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0). Provider default when unset.
    #[arg(long, global = true, env = "DRAWING2MD_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max LLM output tokens. Provider default when unset.
    #[arg(long, global = true, env = "DRAWING2MD_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Image detail hint: auto, low, high.
    #[arg(long, global = true, env = "DRAWING2MD_DETAIL", value_enum, default_value = "auto")]
    detail: DetailArg,

    /// JSON extraction: outer (first '{' to last '}') or balanced.
    #[arg(long, global = true, env = "DRAWING2MD_EXTRACTION", value_enum, default_value = "outer")]
    extraction: ExtractionArg,

    /// Model call timeout in seconds.
    #[arg(long, global = true, env = "DRAWING2MD_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, global = true, env = "DRAWING2MD_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DetailArg {
    Auto,
    Low,
    High,
}

impl From<DetailArg> for ImageDetail {
    fn from(v: DetailArg) -> Self {
        match v {
            DetailArg::Auto => ImageDetail::Auto,
            DetailArg::Low => ImageDetail::Low,
            DetailArg::High => ImageDetail::High,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ExtractionArg {
    Outer,
    Balanced,
}

impl From<ExtractionArg> for ExtractionStrategy {
    fn from(v: ExtractionArg) -> Self {
        match v {
            ExtractionArg::Outer => ExtractionStrategy::OuterBraces,
            ExtractionArg::Balanced => ExtractionStrategy::FirstBalancedObject,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives enough feedback for one-shot analyses; keep library
    // INFO logs for the server.
    let spinner_active = matches!(
        cli.command,
        Command::Analyze { json: false, no_progress: false, .. }
    ) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner_active {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress: Option<ProgressCallback> = if spinner_active {
        Some(SpinnerCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli.model, progress).await?;
    let analyzer = Analyzer::from_config(config).context("Failed to set up the LLM provider")?;

    match cli.command {
        Command::Serve {
            bind,
            max_upload_mb,
        } => {
            let server = ServerConfig {
                bind,
                max_upload_bytes: max_upload_mb.max(1) * 1024 * 1024,
            };
            if !cli.quiet {
                eprintln!("{} open http://{} in your browser", green("◆"), bind);
            }
            web::serve(Arc::new(analyzer), server)
                .await
                .context("Server failed")?;
        }
        Command::Analyze { input, json, .. } => {
            let analysis = analyzer
                .analyze_input(&input)
                .await
                .context("Analysis failed")?;

            if json {
                let out = serde_json::to_string_pretty(&analysis)
                    .context("Failed to serialise output")?;
                println!("{out}");
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(analysis.markdown.as_bytes())
                    .context("Failed to write to stdout")?;
                if let Some(ref record) = analysis.record {
                    let pretty = serde_json::to_string_pretty(record)
                        .context("Failed to serialise record")?;
                    writeln!(handle, "\n## Structured Data\n\n```json\n{pretty}\n```")
                        .context("Failed to write to stdout")?;
                }
            }

            if !cli.quiet && !json {
                eprintln!(
                    "   {} tokens in  /  {} tokens out  —  {}ms",
                    dim(&analysis.stats.input_tokens.to_string()),
                    dim(&analysis.stats.output_tokens.to_string()),
                    analysis.stats.duration_ms,
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `AnalyzerConfig`.
async fn build_config(args: &ModelArgs, progress: Option<ProgressCallback>) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .image_detail(args.detail.clone().into())
        .extraction(args.extraction.clone().into())
        .api_timeout_secs(args.api_timeout)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref path) = args.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(t) = args.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = args.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
