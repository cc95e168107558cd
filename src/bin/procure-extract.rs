//! CLI binary for procure-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use procure_extract::taxonomy::{self, CommodityGroup};
use procure_extract::{
    classify_text, extract, extract_stream, extract_to_file, resolve_oracle, ExtractionConfig,
    ExtractionOutput, ExtractionProgressCallback, OracleSession, ProgressCallback, Stage,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the current stage, with a log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, input: &str) {
        self.bar.set_message(format!("opening {input}…"));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<24} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_degraded(&self, stage: Stage, reason: &str) {
        let msg = if reason.chars().count() > 80 {
            format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
        } else {
            reason.to_string()
        };
        self.bar
            .println(format!("  {} {:<24} {}", yellow("⚠"), stage.to_string(), yellow(&msg)));
    }

    fn on_extraction_complete(&self, confidence: f64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} extraction finished, confidence {}",
            green("✔"),
            bold(&format!("{confidence:.2}"))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract an offer (JSON on stdout)
  procure-extract extract offer.pdf

  # Write the result to a file
  procure-extract extract offer.pdf -o offer.json

  # Several offers, four at a time, one JSON file each
  procure-extract batch offers/*.pdf --output-dir results/ --concurrency 4

  # Classify a free-text description
  procure-extract classify "Moss wall with company logo, installation included"

  # Browse the commodity taxonomy (no API key needed)
  procure-extract groups --search logistics

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID for every call
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, e.g. procure_extract=debug
"#;

/// Turn vendor offer PDFs into confidence-scored procurement records.
#[derive(Parser, Debug)]
#[command(
    name = "procure-extract",
    version,
    about = "Turn vendor offer PDFs into confidence-scored procurement records",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PROCURE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PROCURE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract one offer PDF.
    Extract {
        /// Local PDF file path.
        input: PathBuf,

        /// Write JSON to this file instead of stdout.
        #[arg(short, long, env = "PROCURE_OUTPUT")]
        output: Option<PathBuf>,

        /// Print only the procurement record, not the full report.
        #[arg(long)]
        record_only: bool,

        #[command(flatten)]
        oracle: OracleArgs,
    },

    /// Extract several offer PDFs concurrently.
    Batch {
        /// Local PDF file paths.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory receiving one `<name>.json` per input.
        #[arg(long, env = "PROCURE_OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Documents processed at once.
        #[arg(short, long, env = "PROCURE_CONCURRENCY", default_value_t = 4)]
        concurrency: usize,

        #[command(flatten)]
        oracle: OracleArgs,
    },

    /// Classify a free-text description against the commodity taxonomy.
    Classify {
        text: String,

        #[command(flatten)]
        oracle: OracleArgs,
    },

    /// List or search commodity groups.
    Groups {
        /// Case-insensitive substring of a group or category name.
        #[arg(long)]
        search: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct OracleArgs {
    /// LLM model for structured extraction and classification.
    #[arg(long, env = "PROCURE_MODEL")]
    model: Option<String>,

    /// LLM model for vision calls (footer images, VAT fallback).
    #[arg(long, env = "PROCURE_VISION_MODEL")]
    vision_model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "PROCURE_PROVIDER")]
    provider: Option<String>,

    /// Per-call oracle timeout in seconds.
    #[arg(long, env = "PROCURE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Max output tokens for the structured-extraction answer.
    #[arg(long, env = "PROCURE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PROCURE_PASSWORD")]
    password: Option<String>,

    /// Skip commodity classification.
    #[arg(long, env = "PROCURE_NO_CLASSIFY")]
    no_classify: bool,

    /// Never make the vision VAT-ID fallback call.
    #[arg(long, env = "PROCURE_NO_VAT_FALLBACK")]
    no_vat_fallback: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner is the feedback for single extractions; library INFO logs
    // would tear through it.
    let show_progress = !cli.quiet && matches!(cli.command, Command::Extract { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    match cli.command {
        Command::Extract {
            ref input,
            ref output,
            record_only,
            ref oracle,
        } => {
            let progress: Option<ProgressCallback> = if show_progress && !cli.verbose {
                Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
            } else {
                None
            };
            let config = build_config(oracle, 1, progress)?;
            run_extract(input, output.as_ref(), record_only, cli.quiet, &config).await
        }
        Command::Batch {
            inputs,
            ref output_dir,
            concurrency,
            ref oracle,
        } => {
            let config = build_config(oracle, concurrency, None)?;
            run_batch(inputs, output_dir, cli.quiet, &config).await
        }
        Command::Classify { ref text, ref oracle } => {
            let config = build_config(oracle, 1, None)?;
            run_classify(text, &config).await
        }
        Command::Groups { ref search, json } => print_groups(search.as_deref(), json),
    }
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(
    args: &OracleArgs,
    concurrency: usize,
    progress: Option<ProgressCallback>,
) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .api_timeout_secs(args.api_timeout)
        .max_tokens(args.max_tokens)
        .classify(!args.no_classify)
        .vat_fallback(!args.no_vat_fallback)
        .concurrency(concurrency);

    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref model) = args.vision_model {
        builder = builder.vision_model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = args.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn to_json(output: &ExtractionOutput, record_only: bool) -> Result<String> {
    let json = if record_only {
        serde_json::to_string_pretty(&output.data)
    } else {
        serde_json::to_string_pretty(output)
    };
    json.context("Failed to serialise output")
}

async fn run_extract(
    input: &PathBuf,
    output: Option<&PathBuf>,
    record_only: bool,
    quiet: bool,
    config: &ExtractionConfig,
) -> Result<()> {
    match output {
        Some(path) if !record_only => {
            let out = extract_to_file(input, path, config)
                .await
                .with_context(|| format!("Extraction failed for {}", input.display()))?;
            if !quiet {
                eprintln!(
                    "{}  {}  confidence {:.2}  {} oracle calls  {}ms  →  {}",
                    green("✔"),
                    bold(&out.data.vendor_name),
                    out.data.confidence,
                    out.stats.oracle_calls,
                    out.stats.total_duration_ms,
                    bold(&path.display().to_string()),
                );
            }
        }
        _ => {
            let out = extract(input, config)
                .await
                .with_context(|| format!("Extraction failed for {}", input.display()))?;
            let json = to_json(&out, record_only)?;
            match output {
                Some(path) => tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
    }
    Ok(())
}

async fn run_batch(
    inputs: Vec<PathBuf>,
    output_dir: &PathBuf,
    quiet: bool,
    config: &ExtractionConfig,
) -> Result<()> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let total = inputs.len();
    let mut failed = 0usize;
    let mut results = extract_stream(inputs, config);

    while let Some((input, result)) = results.next().await {
        match result {
            Ok(out) => {
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "offer".to_string());
                let path = output_dir.join(format!("{stem}.json"));
                tokio::fs::write(&path, to_json(&out, false)?)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if !quiet {
                    eprintln!(
                        "  {} {}  {:.2}  {}",
                        green("✓"),
                        input.display(),
                        out.data.confidence,
                        dim(&path.display().to_string())
                    );
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("  {} {}  {}", red("✗"), input.display(), red(&e.to_string()));
            }
        }
    }

    if !quiet {
        eprintln!("{}/{} documents extracted", total - failed, total);
    }
    if failed == total && total > 0 {
        anyhow::bail!("All {total} documents failed");
    }
    Ok(())
}

async fn run_classify(text: &str, config: &ExtractionConfig) -> Result<()> {
    let oracle = resolve_oracle(config).context("No oracle available")?;
    let session = OracleSession::new(oracle.as_ref(), config.api_timeout_secs);
    let result = classify_text(&session, text)
        .await
        .context("Classification failed")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialise classification")?
    );
    Ok(())
}

fn print_groups(search: Option<&str>, json: bool) -> Result<()> {
    let groups: Vec<&CommodityGroup> = match search {
        Some(q) => taxonomy::search(q),
        None => taxonomy::list_sorted(),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&groups).context("Failed to serialise groups")?
        );
        return Ok(());
    }

    for group in groups {
        println!(
            "{:>3}  {:<24} {}",
            group.id,
            group.category.name(),
            group.name
        );
    }
    Ok(())
}
