//! CLI binary for docpress.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PublishConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docpress::pipeline::extract::{distinct, extract_references};
use docpress::pipeline::reference::{classify, preview};
use docpress::{
    process, process_to_files, render, resolve_store, AssetProgressCallback, AssetStore, Document,
    MemoryStore, ProcessOutput, ProgressCallback, PublishConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per asset. Assets settle out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Scanning document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&index)
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl AssetProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} assets  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_prefix("Uploading");
        if total > 0 {
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Resolving {total} assets…"))
            ));
        }
    }

    fn on_asset_start(&self, index: usize, _total: usize, reference: &str) {
        self.start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(index, Instant::now());
        self.bar.set_message(reference.to_string());
    }

    fn on_asset_complete(&self, index: usize, total: usize, url: &str) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Asset {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            dim(url),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_asset_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Asset {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&preview(error)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, resolved: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(resolved);
        if failed == 0 {
            eprintln!(
                "{} {} assets made durable",
                green("✔"),
                bold(&resolved.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} assets made durable  ({} left unchanged)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&resolved.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Publish a document: upload images, print markup
  docpress publish post.json

  # Write post.html and post.json (canonical tree) to a directory
  docpress publish post.json --out-dir public/

  # Try it without touching a real store
  docpress --dry-run publish post.json

  # Render markup only, no uploads
  docpress render post.json

  # List the image references a publish would handle
  docpress assets post.json

ENVIRONMENT VARIABLES:
  DOCPRESS_STORE_URL      Object storage API base URL
  DOCPRESS_STORE_BUCKET   Object storage bucket
  DOCPRESS_STORE_KEY      Object storage API key
  DOCPRESS_STORE_DIR      Local directory store (used when no object storage is set)
  DOCPRESS_PUBLIC_URL     Public URL the local directory is served at
  RUST_LOG                Overrides the log filter
"#;

/// Publish rich-text documents with durable, rehosted images.
#[derive(Parser, Debug)]
#[command(
    name = "docpress",
    version,
    about = "Publish rich-text documents with durable, rehosted images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Use an in-memory store; nothing is persisted.
    #[arg(long, global = true, env = "DOCPRESS_DRY_RUN")]
    dry_run: bool,

    /// Maximum concurrent asset uploads.
    #[arg(short, long, global = true, env = "DOCPRESS_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Timeout for each external image download, in seconds.
    #[arg(long, global = true, env = "DOCPRESS_FETCH_TIMEOUT", default_value_t = 30)]
    fetch_timeout: u64,

    /// Leave external http(s) images where they are.
    #[arg(long, global = true, env = "DOCPRESS_NO_REHOST")]
    no_rehost: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "DOCPRESS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCPRESS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload images, rewrite the tree and render markup.
    Publish {
        /// Document JSON file.
        input: PathBuf,

        /// Write `<stem>.html` and `<stem>.json` here instead of printing markup.
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Print the canonical document JSON instead of markup.
        #[arg(long, conflicts_with = "out_dir")]
        json: bool,
    },
    /// Render markup without touching any store.
    Render {
        /// Document JSON file.
        input: PathBuf,
    },
    /// List distinct image references and how each would be handled.
    Assets {
        /// Document JSON file.
        input: PathBuf,
    },
}

const DRY_RUN_BASE: &str = "memory://docpress";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Render { input } => {
            let document = read_document(input).await?;
            write_stdout(&render(&document))
        }
        Command::Assets { input } => {
            let document = read_document(input).await?;
            list_assets(&cli, &document)
        }
        Command::Publish {
            input,
            out_dir,
            json,
        } => {
            let document = read_document(input).await?;
            let show_progress = !cli.quiet && !cli.no_progress;
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn AssetProgressCallback>)
            } else {
                None
            };
            let config = build_config(&cli, progress)?;

            let output = if let Some(dir) = out_dir {
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "document".to_string());
                let html_path = dir.join(format!("{stem}.html"));
                let json_path = dir.join(format!("{stem}.json"));
                let output = process_to_files(&document, &html_path, &json_path, &config)
                    .await
                    .context("Publish failed")?;
                if !cli.quiet {
                    eprintln!(
                        "{}  {}  {}",
                        green("→"),
                        bold(&html_path.display().to_string()),
                        bold(&json_path.display().to_string()),
                    );
                }
                output
            } else {
                let output = process(&document, &config)
                    .await
                    .context("Publish failed")?;
                if *json {
                    write_stdout(
                        &output
                            .document
                            .to_json_pretty()
                            .context("Failed to serialise document")?,
                    )?;
                } else {
                    write_stdout(&output.markup)?;
                }
                output
            };

            if !cli.quiet {
                print_summary(&output, show_progress);
            }
            Ok(())
        }
    }
}

/// Map CLI args to `PublishConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PublishConfig> {
    let mut builder = PublishConfig::builder()
        .concurrency(cli.concurrency)
        .fetch_timeout_secs(cli.fetch_timeout)
        .rehost_external(!cli.no_rehost);

    if cli.dry_run {
        builder = builder.store(Arc::new(MemoryStore::new(DRY_RUN_BASE)));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let config = builder.build().context("Invalid configuration")?;
    if config.store.is_none() {
        // Fail before any upload starts, with the configuration hint.
        resolve_store(&config).context("No asset store available")?;
    }
    Ok(config)
}

async fn read_document(path: &Path) -> Result<Document> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Document::from_json(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

fn list_assets(cli: &Cli, document: &Document) -> Result<()> {
    // Without a store, nothing classifies as canonical by base URL.
    let store_base = if cli.dry_run {
        DRY_RUN_BASE.to_string()
    } else {
        let config = build_config_quiet(cli)?;
        resolve_store(&config)
            .map(|s| s.public_base().to_string())
            .unwrap_or_default()
    };

    let references = extract_references(document);
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for reference in distinct(&references) {
        let count = references.iter().filter(|r| **r == reference).count();
        let kind = classify(&reference, &store_base);
        writeln!(
            handle,
            "{:<16} {:>3}×  {}",
            serde_json::to_value(kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            count,
            preview(&reference)
        )
        .context("Failed to write to stdout")?;
    }
    Ok(())
}

fn build_config_quiet(cli: &Cli) -> Result<PublishConfig> {
    PublishConfig::builder()
        .concurrency(cli.concurrency)
        .fetch_timeout_secs(cli.fetch_timeout)
        .build()
        .context("Invalid configuration")
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

fn print_summary(output: &ProcessOutput, show_progress: bool) {
    let stats = &output.stats;
    if !show_progress {
        eprintln!(
            "Resolved {}/{} assets in {}ms",
            stats.resolved_assets,
            stats.resolved_assets + stats.failed_assets,
            stats.total_duration_ms
        );
    }
    for warning in output.warnings() {
        eprintln!("  {} {}", cyan("⚠"), warning);
    }
    eprintln!(
        "   {} image nodes  /  {} distinct  /  {} already canonical  /  {} skipped",
        dim(&stats.image_nodes.to_string()),
        dim(&stats.distinct_references.to_string()),
        dim(&stats.canonical_assets.to_string()),
        dim(&stats.skipped_assets.to_string()),
    );
}
