use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adjust::{self, Adjustments};
use crate::pipeline::PipelineOptions;
use crate::transform::{DEFAULT_JPEG_QUALITY, TransformOptions};

/// Top-level configuration for the imageprep CLI.
///
/// Holds the default adjustment values, output behavior and an optional fixed
/// seed for reproducible runs.
///
/// # Loading
///
/// ```rust,no_run
/// use imageprep::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.adjustments.brightness = 0.1;
/// config.seed = Some(42);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default color adjustments.
    pub adjustments: AdjustmentConfig,
    /// Where and how processed images are written.
    pub output: OutputConfig,
    /// Fixed rng seed. `None` seeds from the OS for every run.
    pub seed: Option<u64>,
}

/// Default adjustment values, on the same scale as [`Adjustments`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentConfig {
    pub saturation: f64,
    pub brightness: f64,
    pub contrast: f64,
    /// Draw fresh random adjustments for every image instead.
    pub random_mode: bool,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for processed images. `None` writes next to each input.
    pub directory: Option<PathBuf>,
    /// If `true`, replace existing files at the output path.
    pub overwrite: bool,
    /// JPEG encoder quality, 1–100.
    pub jpeg_quality: u8,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        let neutral = Adjustments::identity();
        Self {
            saturation: neutral.saturation,
            brightness: neutral.brightness,
            contrast: neutral.contrast,
            random_mode: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            overwrite: false,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Config {
    /// Resolve the config file path, same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::debug!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// The configured adjustments, normalized into their valid domains.
    pub fn adjustments(&self) -> Adjustments {
        let a = &self.adjustments;
        adjust::normalize(a.saturation, a.brightness, a.contrast)
    }

    /// Encoder and overwrite settings for [`crate::pipeline::run`].
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            transform: TransformOptions {
                jpeg_quality: self.output.jpeg_quality.clamp(1, 100),
            },
            overwrite: self.output.overwrite,
        }
    }
}
