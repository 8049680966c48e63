use anyhow::{Context, Result};
use img_parts::Bytes;
use img_parts::png::Png;
use nom_exif::*;
use std::path::Path;

use crate::pipeline::ContainerFormat;

/// Capture metadata found in an image container.
///
/// JPEG files fill the EXIF fields; PNG files fill `text_chunks`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedMetadata {
    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
    pub date_time: Option<String>,
    pub date_time_original: Option<String>,
    pub user_comment: Option<String>,
    pub has_gps: bool,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub text_chunks: Vec<(String, String)>,
}

impl EmbeddedMetadata {
    /// Value of the first PNG text chunk with this keyword.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.text_chunks
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.make.is_none()
            && self.model.is_none()
            && self.software.is_none()
            && self.date_time.is_none()
            && !self.has_gps
            && self.text_chunks.is_empty()
    }
}

/// Read embedded capture metadata from `path` according to its container.
pub fn read_embedded(path: &Path, format: ContainerFormat) -> Result<EmbeddedMetadata> {
    match format {
        ContainerFormat::Jpeg => read_exif(path),
        ContainerFormat::Png => Ok(EmbeddedMetadata {
            text_chunks: read_text_chunks(path)?,
            ..Default::default()
        }),
        ContainerFormat::Unsupported => Ok(EmbeddedMetadata::default()),
    }
}

/// Read the EXIF block of a file.
pub fn read_exif(path: &Path) -> Result<EmbeddedMetadata> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open image file")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return Ok(EmbeddedMetadata::default());
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    let text = |tag: ExifTag| exif.get(tag).and_then(entry_to_string);

    let mut data = EmbeddedMetadata {
        make: text(ExifTag::Make),
        model: text(ExifTag::Model),
        software: text(ExifTag::Software),
        date_time: text(ExifTag::ModifyDate),
        date_time_original: text(ExifTag::DateTimeOriginal),
        user_comment: text(ExifTag::UserComment),
        ..Default::default()
    };

    if let Some(gps) = gps_info {
        data.has_gps = true;
        data.gps_latitude = Some(latlng_to_decimal(&gps.latitude, gps.latitude_ref));
        data.gps_longitude = Some(latlng_to_decimal(&gps.longitude, gps.longitude_ref));
    }

    Ok(data)
}

/// Read all `tEXt` key/value pairs from a PNG file.
pub fn read_text_chunks(path: &Path) -> Result<Vec<(String, String)>> {
    let bytes = std::fs::read(path).context("Failed to read image file")?;
    let png = Png::from_bytes(Bytes::from(bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse PNG: {e}"))?;
    Ok(super::png::text_chunks(&png))
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> f64 {
    let degrees = latlng.0.0 as f64 / latlng.0.1 as f64;
    let minutes = latlng.1.0 as f64 / latlng.1.1 as f64;
    let seconds = latlng.2.0 as f64 / latlng.2.1 as f64;

    let mut coord = degrees + minutes / 60.0 + seconds / 3600.0;

    if reference == 'S' || reference == 'W' {
        coord = -coord;
    }

    coord
}
