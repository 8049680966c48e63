use anyhow::{Context, Result};
use img_parts::Bytes;
use img_parts::ImageEXIF;
use img_parts::jpeg::Jpeg;
use little_exif::endian::Endian;
use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use little_exif::exif_tag_format::ExifTagFormat;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use std::path::Path;

use crate::atomic;
use crate::synthetic::SyntheticMetadata;

const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;
const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
const TAG_GPS_LONGITUDE: u16 = 0x0004;

/// GPS seconds are stored as hundredths.
const GPS_SECONDS_DENOMINATOR: u32 = 100;

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
// img-parts set_exif() expects just the TIFF data (after Exif\0\0)
const JPEG_EXIF_OVERHEAD: usize = 10; // 2 + 2 + 6

/// A coordinate split into EXIF degree/minute/second parts.
///
/// `seconds_hundredths` is the seconds value times 100, rounded; it is written
/// as the rational `seconds_hundredths / 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    pub seconds_hundredths: u32,
}

impl Dms {
    /// Split the absolute value of `decimal` into degrees, minutes and seconds.
    ///
    /// Rounding happens once, on the total in hundredths of a second, so the
    /// parts are always canonical (minutes and seconds below 60).
    pub fn from_decimal(decimal: f64) -> Self {
        let per_degree = 3600 * GPS_SECONDS_DENOMINATOR as u64;
        let total = (decimal.abs() * per_degree as f64).round() as u64;
        let per_minute = 60 * GPS_SECONDS_DENOMINATOR as u64;
        Self {
            degrees: (total / per_degree) as u32,
            minutes: (total % per_degree / per_minute) as u32,
            seconds_hundredths: (total % per_minute) as u32,
        }
    }

    /// Back to decimal degrees (always non-negative).
    pub fn to_decimal(&self) -> f64 {
        self.degrees as f64
            + self.minutes as f64 / 60.0
            + self.seconds_hundredths as f64 / GPS_SECONDS_DENOMINATOR as f64 / 3600.0
    }
}

/// Encode a GPS rational value as raw bytes (3 rationals = 24 bytes, little-endian).
fn encode_gps_rational(dms: Dms) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(24);
    bytes.extend_from_slice(&dms.degrees.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&dms.minutes.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&dms.seconds_hundredths.to_le_bytes());
    bytes.extend_from_slice(&GPS_SECONDS_DENOMINATOR.to_le_bytes());
    bytes
}

/// Free-text comment stored in the Exif sub-IFD.
pub fn location_comment(metadata: &SyntheticMetadata) -> String {
    format!("Location: {}", metadata.location)
}

/// Build the full EXIF tag set for a metadata record.
///
/// - IFD0: Make, Model, Software, ModifyDate
/// - Exif sub-IFD: DateTimeOriginal, CreateDate, UserComment (location)
/// - GPS sub-IFD: latitude/longitude with hemisphere refs, when both are finite
pub fn build_tags(metadata: &SyntheticMetadata) -> Vec<ExifTag> {
    let timestamp = metadata.exif_datetime();

    let mut comment_bytes = b"ASCII\0\0\0".to_vec();
    comment_bytes.extend_from_slice(location_comment(metadata).as_bytes());

    let mut tags = vec![
        ExifTag::Make(metadata.make().to_string()),
        ExifTag::Model(metadata.device_model.clone()),
        ExifTag::Software(metadata.software.clone()),
        ExifTag::ModifyDate(timestamp.clone()),
        ExifTag::DateTimeOriginal(timestamp.clone()),
        ExifTag::CreateDate(timestamp),
        ExifTag::UserComment(comment_bytes),
    ];

    if metadata.latitude.is_finite() && metadata.longitude.is_finite() {
        collect_gps_tags(&mut tags, metadata.latitude, metadata.longitude);
    }

    tags
}

/// Collect GPS tags into the tag list.
fn collect_gps_tags(tags: &mut Vec<ExifTag>, lat: f64, lon: f64) {
    let lat_ref = if lat >= 0.0 { "N" } else { "S" };
    let lon_ref = if lon >= 0.0 { "E" } else { "W" };

    let coords = [
        (TAG_GPS_LATITUDE_REF, lat_ref, TAG_GPS_LATITUDE, Dms::from_decimal(lat)),
        (TAG_GPS_LONGITUDE_REF, lon_ref, TAG_GPS_LONGITUDE, Dms::from_decimal(lon)),
    ];

    for (ref_tag, hemisphere, value_tag, dms) in coords {
        if let Ok(tag) = ExifTag::from_u16_with_data(
            ref_tag,
            &ExifTagFormat::STRING,
            &format!("{hemisphere}\0").into_bytes(),
            &Endian::Little,
            &ExifTagGroup::GPSIFD,
        ) {
            tags.push(tag);
        }

        if let Ok(tag) = ExifTag::from_u16_with_data(
            value_tag,
            &ExifTagFormat::RATIONAL64U,
            &encode_gps_rational(dms),
            &Endian::Little,
            &ExifTagGroup::GPSIFD,
        ) {
            tags.push(tag);
        } else {
            log::debug!("  Could not build GPS tag 0x{value_tag:04X}");
        }
    }
}

/// Serialize the tag set into a TIFF block (the payload of an EXIF APP1 segment).
pub fn build_tiff_block(metadata: &SyntheticMetadata) -> Result<Vec<u8>> {
    let mut exif = Metadata::new();
    for tag in build_tags(metadata) {
        exif.set_tag(tag);
    }
    let exif_bytes = exif.as_u8_vec(FileExtension::JPEG);
    if exif_bytes.len() <= JPEG_EXIF_OVERHEAD {
        anyhow::bail!("Serialized EXIF block is empty");
    }
    Ok(exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec())
}

/// Write the synthetic EXIF block into a JPEG file.
///
/// Strategy:
/// 1. Read the entire JPEG with img-parts (preserves all other segments)
/// 2. Build a fresh TIFF block with little_exif
/// 3. Replace the EXIF APP1 segment, placed right after APP0
/// 4. Atomically replace the file
pub fn write_jpeg_exif(path: &Path, metadata: &SyntheticMetadata) -> Result<()> {
    let file_bytes = std::fs::read(path).context("Failed to read image file")?;
    let output = embed_into_jpeg_bytes(file_bytes, metadata)?;
    atomic::write_bytes(path, &output).context("Failed to write JPEG file")?;
    log::debug!("  EXIF written: {} / {}", metadata.device_model, metadata.exif_datetime());
    Ok(())
}

/// In-memory variant of [`write_jpeg_exif`].
pub fn embed_into_jpeg_bytes(file_bytes: Vec<u8>, metadata: &SyntheticMetadata) -> Result<Vec<u8>> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;

    let orig_exif_pos = find_exif_segment_pos(&jpeg);
    let tiff_data = build_tiff_block(metadata)?;

    // set_exif removes the old segment and inserts at position 3
    jpeg.set_exif(Some(Bytes::from(tiff_data)));

    // Move it back to where EXIF was, or right after APP0, so it precedes
    // any other APP1 segment
    if let Some(new_pos) = find_exif_segment_pos(&jpeg) {
        let target_pos = orig_exif_pos.unwrap_or(1);
        if target_pos < new_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }

    Ok(jpeg.encoder().bytes().to_vec())
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == 0xE1 && s.contents().starts_with(EXIF_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Dms ──────────────────────────────────────────────────────────

    #[test]
    fn dms_splits_positive_coordinate() {
        // 40.7128 = 40° 42' 46.08"
        let dms = Dms::from_decimal(40.7128);
        assert_eq!(dms, Dms { degrees: 40, minutes: 42, seconds_hundredths: 4608 });
    }

    #[test]
    fn dms_uses_absolute_value() {
        assert_eq!(Dms::from_decimal(-73.9857), Dms::from_decimal(73.9857));
        let dms = Dms::from_decimal(-73.9857);
        assert_eq!(dms.degrees, 73);
        assert_eq!(dms.minutes, 59);
    }

    #[test]
    fn dms_carries_whole_minutes() {
        // 1.15 - 1.0 is slightly below 0.15 in f64
        assert_eq!(Dms::from_decimal(1.15), Dms { degrees: 1, minutes: 9, seconds_hundredths: 0 });
        assert_eq!(Dms::from_decimal(-1.2), Dms { degrees: 1, minutes: 12, seconds_hundredths: 0 });
    }

    #[test]
    fn dms_parts_stay_below_sixty() {
        for i in 0..=1_800_000u32 {
            let v = i as f64 / 10_000.0;
            let dms = Dms::from_decimal(v);
            assert!(dms.minutes < 60, "{v} -> {dms:?}");
            assert!(dms.seconds_hundredths < 6000, "{v} -> {dms:?}");
            assert!((dms.to_decimal() - v).abs() < 1e-5, "{v} -> {dms:?}");
        }
    }

    #[test]
    fn dms_round_trips_within_rounding() {
        for v in [0.0, 0.0001, 12.3456, 89.9999, 179.9999, 45.5] {
            let back = Dms::from_decimal(v).to_decimal();
            assert!((back - v).abs() < 1e-5, "{v} -> {back}");
        }
    }

    #[test]
    fn gps_rational_layout() {
        let bytes = encode_gps_rational(Dms { degrees: 1, minutes: 2, seconds_hundredths: 345 });
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &345u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &100u32.to_le_bytes());
    }

    // ── tag set ──────────────────────────────────────────────────────

    fn sample() -> SyntheticMetadata {
        SyntheticMetadata {
            creation_time: "2022-07-09 14:03:59".into(),
            date: "2022-07-09".into(),
            year: "2022".into(),
            device_model: "Google Pixel 7 Pro".into(),
            software: "Snapseed".into(),
            resolution: "4000x3000".into(),
            location: "Tokyo".into(),
            gps: "-33.8688, 151.2093".into(),
            latitude: -33.8688,
            longitude: 151.2093,
        }
    }

    #[test]
    fn tags_include_gps_when_coordinates_present() {
        let tags = build_tags(&sample());
        // 7 base tags + 2 refs + 2 coordinates
        assert_eq!(tags.len(), 11);
    }

    #[test]
    fn tags_skip_gps_without_coordinates() {
        let mut meta = sample();
        meta.latitude = f64::NAN;
        assert_eq!(build_tags(&meta).len(), 7);
    }

    #[test]
    fn location_comment_mentions_location() {
        assert_eq!(location_comment(&sample()), "Location: Tokyo");
    }

    #[test]
    fn tiff_block_starts_with_byte_order_mark() {
        let block = build_tiff_block(&sample()).unwrap();
        assert!(block.starts_with(b"II") || block.starts_with(b"MM"));
    }

    #[test]
    fn embedding_into_garbage_fails() {
        assert!(embed_into_jpeg_bytes(b"not a jpeg".to_vec(), &sample()).is_err());
    }
}
