use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::adjust::{self, Adjustments};
use crate::error::ProcessingError;
use crate::exif::{self, EmbedOutcome};
use crate::synthetic::SyntheticMetadata;
use crate::transform::{self, TransformOptions};

/// Supported input extensions.
const IMAGE_EXTENSIONS: &[&str] = &[
    // Pixels + embedded metadata
    "jpg", "jpeg", "png",
    // Pixels only
    "gif", "bmp", "webp",
];

/// Prefix added to the file name of every processed image.
pub const OUTPUT_PREFIX: &str = "Processed_";

/// The metadata container of an image, determined by its format.
///
/// - **Jpeg** gets an EXIF block.
/// - **Png** gets `tEXt` chunks.
/// - **Unsupported** formats are processed pixel-only; embedding is skipped.
///
/// Use [`ContainerFormat::from_path`] to detect the format from a file extension.
///
/// # Example
///
/// ```rust
/// use imageprep::pipeline::ContainerFormat;
/// use std::path::Path;
///
/// assert_eq!(ContainerFormat::from_path(Path::new("photo.JPG")), ContainerFormat::Jpeg);
/// assert_eq!(ContainerFormat::from_path(Path::new("scan.bmp")), ContainerFormat::Unsupported);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// JPEG: EXIF APP1 segment
    Jpeg,
    /// PNG: `tEXt` chunks
    Png,
    /// GIF, BMP, WebP and anything else: no embedding
    Unsupported,
}

impl ContainerFormat {
    /// Determine the container from a file path extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            _ => Self::Unsupported,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Unsupported => "unsupported",
        })
    }
}

/// Knobs for a single [`run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub transform: TransformOptions,
    /// Replace an existing file at the output path.
    pub overwrite: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            transform: TransformOptions::default(),
            overwrite: true,
        }
    }
}

/// The result of processing a single image.
///
/// Only produced when the pixel transform succeeded; `embed` tells whether the
/// metadata made it into the container as well.
///
/// # Example
///
/// ```rust,no_run
/// use imageprep::adjust::normalize;
/// use imageprep::pipeline::{run, PipelineOptions};
/// use rand::SeedableRng;
/// use std::path::Path;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let result = run(
///     Path::new("photo.jpg"),
///     Path::new("Processed_photo.jpg"),
///     normalize(1.2, 0.1, 1.1),
///     &PipelineOptions::default(),
///     &mut rng,
/// )?;
/// println!("{} -> {} ({:?})", result.path.display(), result.output.display(), result.embed);
/// # Ok::<(), imageprep::error::ProcessingError>(())
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub path: PathBuf,
    pub output: PathBuf,
    pub format: ContainerFormat,
    pub adjustments: Adjustments,
    pub width: u32,
    pub height: u32,
    pub noisy_pixels: usize,
    pub watermarked_pixels: usize,
    /// The record used both for the watermark and the embedded metadata.
    pub metadata: SyntheticMetadata,
    pub embed: EmbedOutcome,
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). With `skip_processed`, files found in a
/// directory that already carry the [`OUTPUT_PREFIX`] are left out, so
/// re-running over an output directory does not process results twice.
/// Explicitly named files are always kept.
///
/// # Example
///
/// ```rust,no_run
/// use imageprep::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(
///     &[
///         PathBuf::from("photo.jpg"),   // single file
///         PathBuf::from("./uploads/"),  // entire directory
///     ],
///     true,
/// );
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf], skip_processed: bool) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                let skipped = skip_processed && is_processed(p);
                if p.is_file() && is_supported_image(p) && !skipped {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_processed(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(OUTPUT_PREFIX))
}

/// Output location for `input`: `Processed_<file name>` inside `out_dir`, or
/// next to the input when no directory is given.
pub fn output_path_for(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    dir.join(format!("{OUTPUT_PREFIX}{name}"))
}

/// Process one image with a fresh, entropy-seeded random source.
///
/// The three values are normalized first (see [`adjust::normalize`]). Returns
/// the output path; metadata embedding is best-effort and never fails the
/// call.
pub fn process(
    input: &Path,
    output: &Path,
    saturation: f64,
    brightness: f64,
    contrast: f64,
) -> Result<PathBuf, ProcessingError> {
    let mut rng = StdRng::from_entropy();
    process_with_rng(input, output, saturation, brightness, contrast, &mut rng)
}

/// [`process`] with a caller-supplied random source, for reproducible output.
pub fn process_with_rng<R: Rng + ?Sized>(
    input: &Path,
    output: &Path,
    saturation: f64,
    brightness: f64,
    contrast: f64,
    rng: &mut R,
) -> Result<PathBuf, ProcessingError> {
    let adjustments = adjust::normalize(saturation, brightness, contrast);
    run(input, output, adjustments, &PipelineOptions::default(), rng).map(|r| r.output)
}

/// Process a single image through the full pipeline.
///
/// 1. **Transform**: decode, adjust colors, add noise, draw the synthetic
///    record, stamp the watermark and encode to `output`
/// 2. **Embed**: write the same record into the output's metadata container
///
/// A transform failure is returned as an error and nothing is embedded. An
/// embed failure is logged and reported in [`ProcessResult::embed`].
pub fn run<R: Rng + ?Sized>(
    input: &Path,
    output: &Path,
    adjustments: Adjustments,
    options: &PipelineOptions,
    rng: &mut R,
) -> Result<ProcessResult, ProcessingError> {
    let format = ContainerFormat::from_path(input);

    if !options.overwrite && output.exists() {
        return Err(ProcessingError::io(
            output,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "output file already exists"),
        ));
    }

    log::debug!(
        "  adjustments: saturation {:.2}, brightness {:.2}, contrast {:.2}",
        adjustments.saturation,
        adjustments.brightness,
        adjustments.contrast
    );

    let transformed = transform::transform(input, output, &adjustments, &options.transform, rng)?;
    let embed = exif::embed(output, format, &transformed.metadata);

    Ok(ProcessResult {
        path: input.to_path_buf(),
        output: transformed.path,
        format,
        adjustments,
        width: transformed.width,
        height: transformed.height,
        noisy_pixels: transformed.noisy_pixels,
        watermarked_pixels: transformed.watermarked_pixels,
        metadata: transformed.metadata,
        embed,
    })
}
