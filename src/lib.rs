//! # imageprep
//!
//! Produce visually near-identical but bit-distinct derivatives of an image:
//! the colors are jittered, sparse noise is injected, a covert watermark is
//! stamped into the alpha channel and fabricated capture metadata (device,
//! timestamp, GPS, software) is embedded in the file's own metadata container.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imageprep::pipeline::process;
//! use std::path::Path;
//!
//! fn main() -> Result<(), imageprep::error::ProcessingError> {
//!     // saturation 1.2, brightness +0.05, contrast 1.1
//!     let out = process(
//!         Path::new("photo.jpg"),
//!         Path::new("Processed_photo.jpg"),
//!         1.2,
//!         0.05,
//!         1.1,
//!     )?;
//!     println!("Wrote {}", out.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Reproducible Runs
//!
//! Every random draw (noise, metadata) comes from a caller-supplied rng:
//!
//! ```rust,no_run
//! use imageprep::adjust::Adjustments;
//! use imageprep::pipeline::{run, PipelineOptions};
//! use rand::SeedableRng;
//! use std::path::Path;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let adjustments = Adjustments::random(&mut rng);
//! let result = run(
//!     Path::new("in.png"),
//!     Path::new("out.png"),
//!     adjustments,
//!     &PipelineOptions::default(),
//!     &mut rng,
//! )?;
//! println!("{} / {}", result.metadata.device_model, result.metadata.creation_time);
//! # Ok::<(), imageprep::error::ProcessingError>(())
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Metadata |
//! |--------|----------|
//! | JPEG (`.jpg`, `.jpeg`) | EXIF block (IFD0, Exif, GPS) |
//! | PNG (`.png`) | Six `tEXt` chunks |
//! | GIF, BMP, WebP | None (pixels only) |
//!
//! ## Modules
//!
//! - [`adjust`]: Adjustment values and their normalization
//! - [`synthetic`]: Fabricated capture metadata
//! - [`transform`]: Decode, color passes, noise, watermark, encode
//! - [`exif`]: Metadata embedding and read-back
//! - [`pipeline`]: Single-image coordinator, format detection and file collection
//! - [`config`]: Configuration types and loading/saving
//! - [`error`]: Fatal processing errors

pub mod adjust;
mod atomic;
pub mod config;
pub mod error;
pub mod exif;
pub mod pipeline;
pub mod synthetic;
pub mod transform;
