use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::{Path, PathBuf};

use imageprep::adjust::Adjustments;
use imageprep::pipeline::{self, ContainerFormat, ProcessResult};
use imageprep::{config, exif};

#[derive(Parser, Debug)]
#[command(
    name = "imageprep",
    version,
    about = "Make near-identical, bit-distinct copies of images with fabricated capture metadata"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Output directory (default: next to each input)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Saturation, 0 to 2 (1 = unchanged)
    #[arg(long, allow_hyphen_values = true)]
    saturation: Option<String>,

    /// Brightness, -1 to 1 (0 = unchanged)
    #[arg(long, allow_hyphen_values = true)]
    brightness: Option<String>,

    /// Contrast, 0 to 2 (1 = unchanged)
    #[arg(long, allow_hyphen_values = true)]
    contrast: Option<String>,

    /// Draw random adjustments for every image
    #[arg(long)]
    random: bool,

    /// Seed the random source for reproducible output
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Display embedded metadata and exit
    #[arg(long)]
    show: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// One line of the JSON report.
#[derive(Serialize)]
#[serde(untagged)]
enum ReportEntry {
    Done(ProcessResult),
    Failed { path: PathBuf, error: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // --show lists Processed_* outputs too
    let images = pipeline::collect_images(&cli.paths, !cli.show);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    // Handle --show
    if cli.show {
        for image_path in &images {
            print_embedded(image_path)?;
        }
        return Ok(());
    }

    let config = config::Config::load(cli.config.as_deref())?;
    let options = config.pipeline_options();
    let random_mode = cli.random || config.adjustments.random_mode;
    let fixed = cli_adjustments(&cli, config.adjustments());

    let mut rng = match cli.seed.or(config.seed) {
        Some(seed) => {
            log::info!("Using seed {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let out_dir = cli.output.clone().or_else(|| config.output.directory.clone());
    if let Some(dir) = &out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let total = images.len();
    log::info!("Found {total} image(s) to process");
    if !random_mode {
        log_adjustments(&fixed);
    }

    // Process each image; one failure never stops the run
    let mut report = Vec::with_capacity(total);
    for (i, image_path) in images.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", i + 1, total, image_path.display());

        let adjustments = if random_mode {
            let drawn = Adjustments::random(&mut rng);
            log_adjustments(&drawn);
            drawn
        } else {
            fixed
        };
        let output = pipeline::output_path_for(image_path, out_dir.as_deref());

        match pipeline::run(image_path, &output, adjustments, &options, &mut rng) {
            Ok(result) => {
                log::info!("  Wrote: {}", result.output.display());
                log::info!(
                    "  Device: {} / {}",
                    result.metadata.device_model,
                    result.metadata.creation_time
                );
                match &result.embed {
                    exif::EmbedOutcome::Embedded => {
                        log::info!("  Metadata: {} embedded", result.format)
                    }
                    exif::EmbedOutcome::Skipped => {
                        log::info!("  Metadata: skipped ({} container)", result.format)
                    }
                    exif::EmbedOutcome::Failed(reason) => {
                        log::warn!("  Metadata: failed ({reason})")
                    }
                }
                report.push(ReportEntry::Done(result));
            }
            Err(e) => {
                log::error!("  Error: {e}");
                report.push(ReportEntry::Failed {
                    path: image_path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    // Summary
    let success = report
        .iter()
        .filter(|r| matches!(r, ReportEntry::Done(_)))
        .count();
    let embedded = report
        .iter()
        .filter(|r| matches!(r, ReportEntry::Done(p) if p.embed.succeeded()))
        .count();
    log::info!(
        "Done: {success} succeeded ({embedded} with metadata), {} failed out of {total} images",
        total - success
    );

    Ok(())
}

/// Config values overridden by any adjustment flags; bad flag values keep the
/// config value.
fn cli_adjustments(cli: &Cli, base: Adjustments) -> Adjustments {
    base.with_inputs(
        cli.saturation.as_deref(),
        cli.brightness.as_deref(),
        cli.contrast.as_deref(),
    )
}

fn log_adjustments(adjustments: &Adjustments) {
    log::info!(
        "  Adjustments: saturation {:.2}, brightness {:.2}, contrast {:.2}",
        adjustments.saturation,
        adjustments.brightness,
        adjustments.contrast
    );
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print the embedded metadata of a file, organized by section.
fn print_embedded(path: &Path) -> Result<()> {
    let format = ContainerFormat::from_path(path);
    let data = exif::read_embedded(path, format)?;

    println!();
    println!("{BOLD}File:{RESET} {} ({format})", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    // --- Device ---
    print_section(
        "Device",
        &[
            ("Make", data.make.as_deref()),
            ("Model", data.model.as_deref()),
            ("Software", data.software.as_deref()),
        ],
    );

    // --- Capture ---
    print_section(
        "Capture",
        &[
            ("ModifyDate", data.date_time.as_deref()),
            ("DateTimeOriginal", data.date_time_original.as_deref()),
            ("UserComment", data.user_comment.as_deref()),
        ],
    );

    // --- GPS ---
    if data.has_gps {
        println!("  {BOLD}GPS{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        if let Some(lat) = data.gps_latitude {
            print_row("GPSLatitude", &format!("{lat:.6}"));
        }
        if let Some(lon) = data.gps_longitude {
            print_row("GPSLongitude", &format!("{lon:.6}"));
        }
        println!();
    }

    // --- PNG text chunks ---
    if !data.text_chunks.is_empty() {
        println!("  {BOLD}Text Chunks{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (key, value) in &data.text_chunks {
            print_row(key, value);
        }
        println!();
    }

    if data.is_empty() {
        println!("  {DIM}(no embedded metadata found){RESET}");
        println!();
    }

    Ok(())
}

fn print_section(title: &str, fields: &[(&str, Option<&str>)]) {
    if fields.iter().all(|(_, v)| v.is_none()) {
        return;
    }
    println!("  {BOLD}{title}{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    for (tag, val) in fields {
        if let Some(v) = val {
            print_row(tag, v);
        }
    }
    println!();
}

/// Print a single row in the metadata display table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
