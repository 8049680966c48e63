//! Metadata embedding and read-back.
//!
//! [`embed`] routes to the strategy for the output's [`ContainerFormat`]:
//!
//! - JPEG gets an EXIF block (IFD0 + Exif sub-IFD + GPS sub-IFD)
//! - PNG gets six `tEXt` chunks before `IEND`
//! - anything else is skipped
//!
//! Embedding is best-effort. Failures are logged and reported as
//! [`EmbedOutcome::Failed`], never as an error; the pixel output stays valid.

pub mod png;
mod reader;
mod writer;

pub use reader::{EmbeddedMetadata, read_embedded, read_exif, read_text_chunks};
pub use writer::{
    Dms, build_tags, build_tiff_block, embed_into_jpeg_bytes, location_comment, write_jpeg_exif,
};

use serde::Serialize;
use std::path::Path;

use crate::pipeline::ContainerFormat;
use crate::synthetic::SyntheticMetadata;

/// Result of a best-effort metadata embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum EmbedOutcome {
    /// Metadata was written into the container.
    Embedded,
    /// The container format has no embedding strategy.
    Skipped,
    /// The container could not be parsed or rewritten.
    Failed(String),
}

impl EmbedOutcome {
    /// `true` only when metadata actually landed in the file.
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Embedded)
    }
}

/// Embed `metadata` into the file at `path`.
///
/// The file is read, rebuilt in memory and atomically replaced, so a failure
/// leaves the original pixel-only file untouched.
pub fn embed(path: &Path, format: ContainerFormat, metadata: &SyntheticMetadata) -> EmbedOutcome {
    let result = match format {
        ContainerFormat::Jpeg => write_jpeg_exif(path, metadata),
        ContainerFormat::Png => png::write_png_text(path, metadata),
        ContainerFormat::Unsupported => {
            log::debug!("  No metadata strategy for {}, skipping", path.display());
            return EmbedOutcome::Skipped;
        }
    };

    match result {
        Ok(()) => EmbedOutcome::Embedded,
        Err(e) => {
            log::warn!("Failed to embed metadata into {}: {e:#}", path.display());
            EmbedOutcome::Failed(format!("{e:#}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::fs;
    use tempfile::TempDir;

    fn metadata() -> SyntheticMetadata {
        crate::synthetic::generate(&mut StdRng::seed_from_u64(17))
    }

    fn digits(s: &str) -> String {
        s.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    // ── JPEG / EXIF ──────────────────────────────────────────────────

    #[test]
    fn jpeg_round_trip_recovers_strings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        RgbImage::from_pixel(32, 32, Rgb([200, 10, 10]))
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();
        let meta = metadata();

        assert_eq!(embed(&path, ContainerFormat::Jpeg, &meta), EmbedOutcome::Embedded);

        let read = read_exif(&path).unwrap();
        assert_eq!(read.make.as_deref(), Some(meta.make()));
        assert_eq!(read.model.as_deref(), Some(meta.device_model.as_str()));
        assert_eq!(read.software.as_deref(), Some(meta.software.as_str()));
        // Date rendering varies by reader; the digits must match.
        let stamp = read.date_time.expect("DateTime tag present");
        assert!(digits(&stamp).starts_with(&digits(&meta.creation_time)), "{stamp}");

        assert!(read.has_gps);
        assert!((read.gps_latitude.unwrap() - meta.latitude).abs() < 1e-4);
        assert!((read.gps_longitude.unwrap() - meta.longitude).abs() < 1e-4);

        // Pixels are still decodable
        let img = image::open(&path).unwrap();
        assert_eq!(img.to_rgb8().dimensions(), (32, 32));
    }

    #[test]
    fn jpeg_embed_replaces_previous_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpeg");
        RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]))
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();

        let first = metadata();
        let mut second = metadata();
        second.device_model = "Sony ZV-1".into();
        second.software = "VSCO".into();

        assert!(embed(&path, ContainerFormat::Jpeg, &first).succeeded());
        assert!(embed(&path, ContainerFormat::Jpeg, &second).succeeded());

        let read = read_exif(&path).unwrap();
        assert_eq!(read.model.as_deref(), Some("Sony ZV-1"));
        assert_eq!(read.make.as_deref(), Some("Sony"));
        assert_eq!(read.software.as_deref(), Some("VSCO"));
    }

    #[test]
    fn corrupt_jpeg_reports_failure_and_keeps_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"not really a jpeg").unwrap();

        let outcome = embed(&path, ContainerFormat::Jpeg, &metadata());
        assert!(matches!(outcome, EmbedOutcome::Failed(_)));
        assert!(!outcome.succeeded());
        assert_eq!(fs::read(&path).unwrap(), b"not really a jpeg");
    }

    // ── PNG / tEXt ───────────────────────────────────────────────────

    #[test]
    fn png_round_trip_recovers_all_pairs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.png");
        RgbaImage::from_pixel(16, 16, Rgba([0, 128, 255, 255])).save(&path).unwrap();
        let meta = metadata();

        assert!(embed(&path, ContainerFormat::Png, &meta).succeeded());

        let pairs = read_text_chunks(&path).unwrap();
        let expected: Vec<(String, String)> = png::text_entries(&meta)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(pairs, expected);

        let bytes = fs::read(&path).unwrap();
        let parsed = img_parts::png::Png::from_bytes(bytes.into()).unwrap();
        assert_eq!(parsed.chunks().last().unwrap().kind(), png::END_CHUNK);

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(3, 3), &Rgba([0, 128, 255, 255]));
    }

    #[test]
    fn corrupt_png_reports_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\ntruncated").unwrap();
        assert!(matches!(
            embed(&path, ContainerFormat::Png, &metadata()),
            EmbedOutcome::Failed(_)
        ));
    }

    // ── other formats ────────────────────────────────────────────────

    #[test]
    fn unsupported_format_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.bmp");
        RgbImage::from_pixel(4, 4, Rgb([5, 5, 5])).save(&path).unwrap();
        let before = fs::read(&path).unwrap();

        let outcome = embed(&path, ContainerFormat::Unsupported, &metadata());
        assert_eq!(outcome, EmbedOutcome::Skipped);
        assert!(!outcome.succeeded());
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn outcome_serializes_with_status() {
        let json = serde_json::to_value(EmbedOutcome::Failed("bad".into())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failed", "reason": "bad"}));
        let json = serde_json::to_value(EmbedOutcome::Embedded).unwrap();
        assert_eq!(json, serde_json::json!({"status": "embedded"}));
    }
}
