//! Fabricated capture metadata.
//!
//! Every processed image gets a fresh [`SyntheticMetadata`] record drawn from
//! fixed catalogs. The record drives both the covert watermark and the
//! metadata embedded into the output container.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Last year of the capture-date window.
pub const LATEST_YEAR: u32 = 2024;
/// Number of years in the capture-date window (ending at [`LATEST_YEAR`]).
pub const YEAR_WINDOW: u32 = 7;

/// Device catalog: brand followed by its model list.
const DEVICES: &[(&str, &[&str])] = &[
    ("iPhone", &["11 Pro", "12", "13 Pro Max", "14", "15 Pro", "SE"]),
    ("Samsung Galaxy", &["S21", "S22 Ultra", "S23", "A53", "Note 20", "Z Flip 4"]),
    ("Google Pixel", &["6", "7 Pro", "8", "6a", "7a", "Fold"]),
    ("Xiaomi", &["Mi 11", "Redmi Note 10", "13T Pro", "Poco F5"]),
    ("OnePlus", &["9 Pro", "10T", "11", "Nord 3"]),
    ("Sony", &["Alpha a7 III", "Alpha a6400", "ZV-1", "RX100 VII"]),
    ("Canon", &["EOS R6", "EOS 90D", "PowerShot G7 X", "EOS M50"]),
    ("Nikon", &["Z6 II", "D780", "D7500", "Coolpix P1000"]),
    ("GoPro", &["Hero 10 Black", "Hero 11", "Max"]),
];

const SOFTWARE: &[&str] = &[
    "Instagram", "Snapchat", "Camera App", "Lightroom", "Photoshop", "VSCO", "Snapseed",
    "Pixlr", "Canva",
];

const RESOLUTIONS: &[&str] = &["1920x1080", "3840x2160", "1280x720", "2560x1440", "4000x3000"];

const LOCATIONS: &[&str] = &[
    "New York", "Los Angeles", "Chicago", "Miami", "London", "Paris", "Tokyo", "Sydney",
    "Berlin", "Toronto", "Barcelona", "Seoul",
];

/// A fabricated capture-context record.
///
/// `resolution` is a free-form tag and does not have to match the real raster
/// dimensions. `gps` is the `"<lat>, <long>"` string form of
/// `latitude`/`longitude`, both rounded to four decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticMetadata {
    /// `YYYY-MM-DD HH:MM:SS`
    pub creation_time: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub year: String,
    pub device_model: String,
    pub software: String,
    pub resolution: String,
    pub location: String,
    pub gps: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl SyntheticMetadata {
    /// Camera make: the first whitespace-delimited token of the device model.
    pub fn make(&self) -> &str {
        self.device_model
            .split_whitespace()
            .next()
            .unwrap_or(&self.device_model)
    }

    /// Creation time in the `YYYY:MM:DD HH:MM:SS` layout EXIF expects.
    pub fn exif_datetime(&self) -> String {
        match self.creation_time.split_once(' ') {
            Some((date, time)) => format!("{} {time}", date.replace('-', ":")),
            None => self.creation_time.replace('-', ":"),
        }
    }

    /// Text encoded by the covert watermark: `"<device_model> <date>"`.
    pub fn watermark_text(&self) -> String {
        format!("{} {}", self.device_model, self.date)
    }
}

/// Draw a fresh metadata record.
///
/// All draws are independent and come from `rng`, so a seeded generator
/// yields a reproducible record.
///
/// # Example
///
/// ```rust
/// use imageprep::synthetic::generate;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// let meta = generate(&mut rng);
/// assert_eq!(meta.date.len(), 10);
/// assert!(meta.creation_time.starts_with(&meta.date));
/// ```
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> SyntheticMetadata {
    let year = rng.gen_range(LATEST_YEAR + 1 - YEAR_WINDOW..=LATEST_YEAR);
    let month: u32 = rng.gen_range(1..=12);
    // Capped at 28 so every month is valid.
    let day: u32 = rng.gen_range(1..=28);
    let hour: u32 = rng.gen_range(0..24);
    let minute: u32 = rng.gen_range(0..60);
    let second: u32 = rng.gen_range(0..60);

    let (brand, models) = DEVICES[rng.gen_range(0..DEVICES.len())];
    let device_model = format!("{brand} {}", pick(rng, models));

    let software = pick(rng, SOFTWARE).to_string();
    let resolution = pick(rng, RESOLUTIONS).to_string();
    let location = pick(rng, LOCATIONS).to_string();

    let latitude = round4(rng.gen_range(-90.0..=90.0));
    let longitude = round4(rng.gen_range(-180.0..=180.0));

    let date = format!("{year}-{month:02}-{day:02}");
    let time = format!("{hour:02}:{minute:02}:{second:02}");

    SyntheticMetadata {
        creation_time: format!("{date} {time}"),
        date,
        year: year.to_string(),
        device_model,
        software,
        resolution,
        location,
        gps: format!("{latitude:.4}, {longitude:.4}"),
        latitude,
        longitude,
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, list: &[&'static str]) -> &'static str {
    list[rng.gen_range(0..list.len())]
}

/// Round to four decimals, folding `-0.0` into `0.0`.
fn round4(v: f64) -> f64 {
    let r = (v * 10_000.0).round() / 10_000.0;
    if r == 0.0 { 0.0 } else { r }
}
