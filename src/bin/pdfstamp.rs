//! CLI binary for pdfstamp.
//!
//! A thin shim over the library crate that maps CLI flags to `StampConfig`,
//! loads the attachment manifest and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfstamp::pipeline::input::{filename_from_url, is_url};
use pdfstamp::{
    inspect, save_to_file, AttachmentSet, ProgressCallback, SaveProgressCallback, StampConfig,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the PDF loads, then a bar over attachments. Embeds finish
/// in any order, so the bar only counts.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} attachments  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Embedding");
        self.bar.set_message("");
    }
}

impl SaveProgressCallback for CliProgressCallback {
    fn on_save_start(&self, total_attachments: usize) {
        self.activate_bar(total_attachments);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Stamping {total_attachments} attachments…"))
        ));
    }

    fn on_attachment_embedded(&self, page_num: usize, id: &str) {
        self.bar.set_message(format!("page {page_num}: {id}"));
        self.bar.inc(1);
    }

    fn on_embed_error(&self, page_num: usize, id: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep the log tidy.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}  {:<12}  {}",
            red("✗"),
            page_num,
            id,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_page_drawn(&self, page_num: usize, commands: usize) {
        self.bar.set_prefix("Drawing");
        self.bar.println(format!(
            "  {} Page {:>3}  {}",
            green("✓"),
            page_num,
            dim(&format!("{commands} overlays")),
        ));
    }

    fn on_save_complete(&self, bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} PDF written  {}",
            green("✔"),
            dim(&format!("{} KiB", bytes.div_ceil(1024)))
        );
    }
}

impl CliProgressCallback {
    /// Clear the bar after an aborted save.
    fn abandon(&self) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        if errors > 0 {
            eprintln!("{} save aborted after {} embed errors", red("✘"), errors);
        }
    }
}

const AFTER_HELP: &str = r##"EXAMPLES:
  # Stamp the overlays described in a manifest
  pdfstamp lease.pdf -a lease.json

  # Choose the output file
  pdfstamp lease.pdf -a lease.json -o signed/lease.pdf

  # Stamp a PDF from a URL and compress the result
  pdfstamp https://example.com/form.pdf -a form.json --compress

  # Inspect page count and page sizes
  pdfstamp --inspect-only lease.pdf

  # Machine-readable stats
  pdfstamp --json lease.pdf -a lease.json > stats.json

MANIFEST FORMAT:
  A JSON array with one entry per page; each entry is an array of
  attachments. Coordinates are in points from the page's top-left corner.

  [
    [
      { "type": "text", "x": 72, "y": 90, "text": "Approved", "size": 18,
        "fontFamily": "Helvetica-Bold" },
      { "type": "image", "x": 400, "y": 700, "width": 120, "height": 40,
        "file": { "path": "signature.png" } },
      { "type": "drawing", "x": 60, "y": 720, "width": 200, "height": 60,
        "path": "M0,30 C50,0 100,60 150,30", "stroke": "#1a237e",
        "strokeWidth": 2, "scale": 1 }
    ],
    []
  ]

ENVIRONMENT VARIABLES:
  PDFSTAMP_ATTACHMENTS      Attachment manifest path
  PDFSTAMP_OUTPUT           Output PDF path
  PDFSTAMP_COMPRESS         Compress streams on save
  PDFSTAMP_DOWNLOAD_TIMEOUT HTTP download timeout in seconds
  RUST_LOG                  Override log filter (e.g. pdfstamp=debug)
"##;

/// Stamp text, images and freehand drawings onto PDF pages.
#[derive(Parser, Debug)]
#[command(
    name = "pdfstamp",
    version,
    about = "Stamp text, images and freehand drawings onto PDF pages",
    long_about = "Stamp overlays onto an existing PDF (local file or URL). Overlays are \
described by a JSON manifest in screen coordinates and are embedded all-or-nothing: if any \
one of them cannot be prepared, no output is written.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// JSON attachment manifest.
    #[arg(
        short,
        long,
        env = "PDFSTAMP_ATTACHMENTS",
        required_unless_present = "inspect_only"
    )]
    attachments: Option<PathBuf>,

    /// Output PDF path. Default: <input-stem>-stamped.pdf in the current directory.
    #[arg(short, long, env = "PDFSTAMP_OUTPUT")]
    output: Option<PathBuf>,

    /// Flate-compress uncompressed streams in the output.
    #[arg(long, env = "PDFSTAMP_COMPRESS")]
    compress: bool,

    /// Print save stats (or metadata with --inspect-only) as JSON on stdout.
    #[arg(long, env = "PDFSTAMP_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFSTAMP_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no stamping.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSTAMP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSTAMP_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFSTAMP_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = StampConfig::builder()
            .download_timeout_secs(cli.download_timeout)
            .build()
            .context("Invalid configuration")?;
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            println!("Encrypted:    {}", meta.is_encrypted);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
            for (i, page) in meta.pages.iter().enumerate() {
                println!(
                    "  Page {:>3}:  {} × {} pt",
                    i + 1,
                    page.width,
                    page.height
                );
            }
        }
        return Ok(());
    }

    // ── Load manifest ────────────────────────────────────────────────────
    let manifest = cli
        .attachments
        .as_deref()
        .context("--attachments is required unless --inspect-only is set")?;
    let attachments = AttachmentSet::from_file(manifest)
        .await
        .with_context(|| format!("Failed to load attachments from {}", manifest.display()))?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let mut builder = StampConfig::builder()
        .compress(cli.compress)
        .download_timeout_secs(cli.download_timeout);
    if let Some(ref cb) = progress {
        builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run save ─────────────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    let result = save_to_file(&cli.input, &attachments, &output_path, &config).await;
    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            if let Some(ref cb) = progress {
                cb.abandon();
            }
            return Err(e).context("Save failed");
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} text, {} images, {} drawings on {}/{} pages  {}ms  →  {}",
            green("✔"),
            stats.text_count,
            stats.image_count,
            stats.drawing_count,
            stats.stamped_pages,
            stats.total_pages,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
    }

    Ok(())
}

/// `<stem>-stamped.pdf` in the current directory.
fn default_output_path(input: &str) -> PathBuf {
    let name = if is_url(input) {
        filename_from_url(input)
    } else {
        input.to_string()
    };
    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    PathBuf::from(format!("{stem}-stamped.pdf"))
}
