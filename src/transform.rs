//! Pixel transform engine.
//!
//! Decodes an image into an RGBA raster, applies the color adjustments,
//! injects sparse noise, stamps the covert watermark and encodes the result in
//! the input's own format. The passes always run in this order:
//!
//! 1. saturation (skipped when neutral)
//! 2. brightness (skipped when neutral)
//! 3. contrast (skipped when neutral)
//! 4. sparse noise
//! 5. synthetic metadata draw + covert alpha watermark
//!
//! With a seeded rng the output is fully reproducible.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use rand::Rng;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::adjust::Adjustments;
use crate::atomic;
use crate::error::ProcessingError;
use crate::synthetic::{self, SyntheticMetadata};

/// Probability that a given pixel receives noise.
pub const NOISE_PROBABILITY: f64 = 0.001;
/// Noise deltas are drawn from `-NOISE_AMPLITUDE..=NOISE_AMPLITUDE`.
pub const NOISE_AMPLITUDE: i16 = 5;
/// Watermark grid origin, measured from the right edge.
pub const WATERMARK_OFFSET_X: u32 = 20;
/// Watermark grid origin, measured from the bottom edge.
pub const WATERMARK_OFFSET_Y: u32 = 5;
/// Watermark grid row length.
pub const WATERMARK_COLUMNS: usize = 10;
/// Default JPEG encoder quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encoder settings for [`transform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// JPEG quality, 1–100.
    pub jpeg_quality: u8,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// What [`transform`] produced.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Metadata record drawn for this image (also the watermark source).
    pub metadata: SyntheticMetadata,
    pub noisy_pixels: usize,
    pub watermarked_pixels: usize,
}

/// Run the full pixel pipeline from `input` to `output`.
///
/// The output is encoded in the input's format (by extension, falling back to
/// content sniffing). It is staged next to `output` and renamed into place, so
/// an encode failure never leaves a file at `output`.
pub fn transform<R: Rng + ?Sized>(
    input: &Path,
    output: &Path,
    adjustments: &Adjustments,
    options: &TransformOptions,
    rng: &mut R,
) -> Result<Transformed, ProcessingError> {
    let (mut raster, format) = decode(input)?;
    let (width, height) = raster.dimensions();
    log::debug!(
        "Decoded {} ({width}x{height}, {format:?})",
        input.display()
    );

    adjust_colors(&mut raster, adjustments);
    let noisy_pixels = add_noise(&mut raster, rng);

    let metadata = synthetic::generate(rng);
    let watermarked_pixels = stamp_watermark(&mut raster, &metadata.watermark_text());
    log::debug!("  noise: {noisy_pixels} px, watermark: {watermarked_pixels} px");

    encode(raster, format, output, options)?;

    Ok(Transformed {
        path: output.to_path_buf(),
        format,
        width,
        height,
        metadata,
        noisy_pixels,
        watermarked_pixels,
    })
}

/// Decode `input` into an RGBA raster and report the format to re-encode with.
pub fn decode(input: &Path) -> Result<(RgbaImage, ImageFormat), ProcessingError> {
    let reader = ImageReader::open(input)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| ProcessingError::decode(input, e))?;

    let format = ImageFormat::from_path(input)
        .ok()
        .or(reader.format())
        .ok_or_else(|| ProcessingError::decode(input, "unrecognized image format"))?;

    let image = reader
        .decode()
        .map_err(|e| ProcessingError::decode(input, e))?;
    Ok((image.to_rgba8(), format))
}

/// Encode `raster` as `format` and atomically place it at `output`.
pub fn encode(
    raster: RgbaImage,
    format: ImageFormat,
    output: &Path,
    options: &TransformOptions,
) -> Result<(), ProcessingError> {
    let mut staged = atomic::stage(output).map_err(|e| ProcessingError::io(output, e))?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let image = DynamicImage::ImageRgba8(raster);
        let written = match format {
            // JPEG has no alpha channel
            ImageFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut writer, options.jpeg_quality);
                rgb.write_with_encoder(encoder)
            }
            _ => image.write_to(&mut writer, format),
        };
        written.map_err(|e| ProcessingError::encode(output, e))?;
        writer.flush().map_err(|e| ProcessingError::io(output, e))?;
    }
    atomic::commit(staged, output).map_err(|e| ProcessingError::io(output, e))
}

/// Apply the saturation, brightness and contrast passes, skipping any that
/// are at their neutral value.
pub fn adjust_colors(raster: &mut RgbaImage, adjustments: &Adjustments) {
    if adjustments.saturation != 1.0 {
        saturate(raster, (adjustments.saturation - 1.0) * 100.0);
    }
    if adjustments.brightness != 0.0 {
        brighten(raster, adjustments.brightness);
    }
    if adjustments.contrast != 1.0 {
        contrast(raster, adjustments.contrast - 1.0);
    }
}

/// Shift HSL saturation by `percent` (−100 = grayscale, +100 = fully saturated).
pub fn saturate(raster: &mut RgbaImage, percent: f64) {
    let amount = percent / 100.0;
    for pixel in raster.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let (h, s, l) = rgb_to_hsl(r, g, b);
        let (r, g, b) = hsl_to_rgb(h, (s + amount).clamp(0.0, 1.0), l);
        pixel.0[0] = r;
        pixel.0[1] = g;
        pixel.0[2] = b;
    }
}

/// Brightness in `[-1, 1]`: negative values scale toward black, positive
/// values move each channel toward white by that fraction.
pub fn brighten(raster: &mut RgbaImage, value: f64) {
    let adjust = |c: u8| -> u8 {
        let c = c as f64;
        let v = if value < 0.0 {
            c * (1.0 + value)
        } else {
            c + (255.0 - c) * value
        };
        v.clamp(0.0, 255.0) as u8
    };
    for pixel in raster.pixels_mut() {
        for c in &mut pixel.0[..3] {
            *c = adjust(*c);
        }
    }
}

/// Contrast in `[-1, 1]`: `-1` flattens to mid-gray, `1` thresholds around 127.
pub fn contrast(raster: &mut RgbaImage, value: f64) {
    // (1 - value) reaches zero at the top of the range
    let factor = (value + 1.0) / (1.0 - value).max(f64::EPSILON);
    let adjust = |c: u8| -> u8 {
        (factor * (c as f64 - 127.0) + 127.0)
            .floor()
            .clamp(0.0, 255.0) as u8
    };
    for pixel in raster.pixels_mut() {
        for c in &mut pixel.0[..3] {
            *c = adjust(*c);
        }
    }
}

/// Sparse noise: each pixel, with probability [`NOISE_PROBABILITY`], gets one
/// delta in `±NOISE_AMPLITUDE` added to R, G and B alike. Alpha is untouched.
///
/// Returns the number of pixels selected. Pixels are visited column by column.
pub fn add_noise<R: Rng + ?Sized>(raster: &mut RgbaImage, rng: &mut R) -> usize {
    let (width, height) = raster.dimensions();
    let mut touched = 0;
    for x in 0..width {
        for y in 0..height {
            if !rng.gen_bool(NOISE_PROBABILITY) {
                continue;
            }
            let delta = rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
            let pixel = raster.get_pixel_mut(x, y);
            for c in &mut pixel.0[..3] {
                *c = (*c as i16 + delta).clamp(0, 255) as u8;
            }
            touched += 1;
        }
    }
    touched
}

/// Covert watermark: character `i` of `text` lowers the alpha of pixel
/// `(W - 20 + i % 10, H - 5 + i / 10)` by one. Positions outside the raster
/// are skipped; RGB is never changed.
///
/// Returns the number of pixels touched.
pub fn stamp_watermark(raster: &mut RgbaImage, text: &str) -> usize {
    let (width, height) = raster.dimensions();
    let origin_x = width as i64 - WATERMARK_OFFSET_X as i64;
    let origin_y = height as i64 - WATERMARK_OFFSET_Y as i64;
    let mut touched = 0;

    for i in 0..text.chars().count() {
        let x = origin_x + (i % WATERMARK_COLUMNS) as i64;
        let y = origin_y + (i / WATERMARK_COLUMNS) as i64;
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            continue;
        }
        let pixel = raster.get_pixel_mut(x as u32, y as u32);
        pixel.0[3] = pixel.0[3].saturating_sub(1);
        touched += 1;
    }
    touched
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, s, l)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let to_u8 = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;

    if s == 0.0 {
        let v = to_u8(l);
        return (v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        to_u8(hue_to_rgb(p, q, h + 1.0 / 3.0)),
        to_u8(hue_to_rgb(p, q, h)),
        to_u8(hue_to_rgb(p, q, h - 1.0 / 3.0)),
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
