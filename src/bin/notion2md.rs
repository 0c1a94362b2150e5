//! CLI binary for notion2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use notion2md::{
    convert, convert_to_file, BlockOrdering, ConversionConfig, ConversionProgressCallback,
    ProgressCallback, StorageConfig,
};
use std::io::{self, Write};
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
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner carrying the current status line, plus one
/// log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("notion2md");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_status(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn on_relocation_start(&self, total_images: usize) {
        self.bar.set_prefix("Images");
        if total_images > 0 {
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Processing {total_images} images…"))
            ));
        }
        self.on_status("Processing images...");
    }

    fn on_image_complete(&self, index: usize, total: usize, destination_url: &str) {
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(destination_url),
        ));
    }

    fn on_image_error(&self, index: usize, total: usize, alt: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            if alt.is_empty() { "untitled" } else { alt },
            red(&msg),
        ));
        self.on_status(&format!("Image upload failed: {alt}"));
    }

    fn on_conversion_complete(&self, relocated: usize, failed: usize) {
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} Conversion complete  {} images relocated",
                green("✔"),
                bold(&relocated.to_string())
            );
        } else {
            eprintln!(
                "{} Conversion complete  {} images relocated  ({} failed, original links kept)",
                cyan("⚠"),
                bold(&relocated.to_string()),
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render a page to stdout, keeping original image links
  notion2md https://www.notion.so/My-Page-0123abcd456789ef0123456789abcdef --no-images

  # Render to a file, relocating images to a COS bucket
  notion2md 0123abcd456789ef0123456789abcdef -o page.md \
      --bucket mybucket --region ap-guangzhou --prefix notion/

  # Structured output with per-image results
  notion2md <page> --json > page.json

  # Legacy pairwise ordering (direct children before their parent)
  notion2md <page> --ordering legacy

ENVIRONMENT VARIABLES:
  NOTION_TOKEN     Value of the token_v2 cookie (private pages)
  COS_BUCKET       Destination bucket
  COS_REGION       Bucket region (e.g. ap-guangzhou)
  COS_SECRET_ID    COS SecretId
  COS_SECRET_KEY   COS SecretKey
  COS_PATH         Key prefix for uploaded images (e.g. notion/)
  RUST_LOG         Override the log filter

Images are relocated only when bucket, region, secret id and secret key are
all set. Failed images keep their original link; the run still succeeds.
"#;

/// Convert Notion pages to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "notion2md",
    version,
    about = "Convert Notion pages to Markdown",
    long_about = "Convert a Notion page (URL or id) to Markdown. Images hosted on the \
service's short-lived storage can be copied to a COS bucket and their links rewritten \
to durable URLs.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Page URL, 32-character id, or hyphenated UUID.
    input: String,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "NOTION2MD_OUTPUT")]
    output: Option<PathBuf>,

    /// token_v2 cookie value for private pages.
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// COS bucket to relocate images into.
    #[arg(long, env = "COS_BUCKET")]
    bucket: Option<String>,

    /// COS region of the bucket.
    #[arg(long, env = "COS_REGION")]
    region: Option<String>,

    /// COS SecretId.
    #[arg(long, env = "COS_SECRET_ID", hide_env_values = true)]
    secret_id: Option<String>,

    /// COS SecretKey.
    #[arg(long, env = "COS_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Key prefix for uploaded images.
    #[arg(long, env = "COS_PATH", default_value = "")]
    prefix: String,

    /// Keep original image links; skip relocation.
    #[arg(long, env = "NOTION2MD_NO_IMAGES")]
    no_images: bool,

    /// Block ordering strategy.
    #[arg(long, env = "NOTION2MD_ORDERING", value_enum, default_value = "depth-first")]
    ordering: OrderingArg,

    /// Output structured JSON (ConversionOutput) instead of Markdown.
    #[arg(long, env = "NOTION2MD_JSON")]
    json: bool,

    /// Disable progress spinner.
    #[arg(long, env = "NOTION2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NOTION2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "NOTION2MD_QUIET")]
    quiet: bool,

    /// Page fetch timeout in seconds.
    #[arg(long, env = "NOTION2MD_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// Per-image download/upload timeout in seconds.
    #[arg(long, env = "NOTION2MD_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Base URL of the internal API.
    #[arg(long, env = "NOTION2MD_API_BASE", default_value = notion2md::config::DEFAULT_API_BASE_URL)]
    api_base: String,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OrderingArg {
    DepthFirst,
    Legacy,
}

impl From<OrderingArg> for BlockOrdering {
    fn from(v: OrderingArg) -> Self {
        match v {
            OrderingArg::DepthFirst => BlockOrdering::DepthFirst,
            OrderingArg::Legacy => BlockOrdering::Legacy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    if config.relocation_target().is_none() && !cli.no_images && !cli.quiet {
        eprintln!(
            "{}",
            dim("No COS bucket configured; image links are left unchanged.")
        );
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let result = run(&cli, &config, show_progress).await;
    clear_on_error(result, spinner.as_deref())
}

/// Leave no stale status line above a fatal error.
fn clear_on_error<T>(result: Result<T>, spinner: Option<&CliProgressCallback>) -> Result<T> {
    if result.is_err() {
        if let Some(cb) = spinner {
            cb.bar.finish_and_clear();
        }
    }
    result
}

/// Convert and emit the result to a file or stdout.
async fn run(cli: &Cli, config: &ConversionConfig, show_progress: bool) -> Result<()> {
    match cli.output {
        Some(ref output_path) if !cli.json => {
            let stats = convert_to_file(&cli.input, output_path, config)
                .await
                .context("Conversion failed")?;

            if !cli.quiet {
                eprintln!(
                    "{}  {} blocks  {}/{} images  {}ms  →  {}",
                    if stats.images_failed == 0 {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    stats.block_count,
                    stats.images_relocated,
                    stats.images_found,
                    stats.total_duration_ms,
                    bold(&output_path.display().to_string()),
                );
            }
        }
        _ => {
            let output = convert(&cli.input, config)
                .await
                .context("Conversion failed")?;

            let mut rendered = if cli.json {
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?
            } else {
                output.markdown.clone()
            };
            // Ensure a trailing newline.
            if !rendered.ends_with('\n') {
                rendered.push('\n');
            }

            if let Some(ref path) = cli.output {
                std::fs::write(path, &rendered)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            } else {
                io::stdout()
                    .lock()
                    .write_all(rendered.as_bytes())
                    .context("Failed to write to stdout")?;
            }

            if !cli.quiet && !show_progress {
                eprintln!(
                    "Converted {} blocks in {}ms",
                    output.stats.block_count, output.stats.total_duration_ms
                );
                if output.stats.images_failed > 0 {
                    eprintln!("  {} images failed", output.stats.images_failed);
                    for failure in output.failed_relocations() {
                        if let Some(ref e) = failure.error {
                            eprintln!("    {}", dim(&e.to_string()));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .ordering(cli.ordering.clone().into())
        .relocate_images(!cli.no_images)
        .api_base_url(cli.api_base.clone())
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref token) = cli.token {
        builder = builder.notion_token(token.clone());
    }

    if !cli.no_images {
        if let Some(storage) = storage_from_cli(cli) {
            builder = builder.storage(storage);
        }
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    Ok(builder.build()?)
}

/// Any storage flag turns storage on; the builder reports whichever are missing.
fn storage_from_cli(cli: &Cli) -> Option<StorageConfig> {
    let fields = [&cli.bucket, &cli.region, &cli.secret_id, &cli.secret_key];
    if fields.iter().all(|f| f.is_none()) {
        return None;
    }
    let value = |f: &Option<String>| f.clone().unwrap_or_default();
    Some(
        StorageConfig::new(
            value(&cli.bucket),
            value(&cli.region),
            value(&cli.secret_id),
            value(&cli.secret_key),
        )
        .prefix(cli.prefix.clone()),
    )
}
