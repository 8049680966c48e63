//! Error types for the processing pipeline.
//!
//! Only decode and encode failures are fatal. Metadata embedding is best-effort
//! and reports through [`EmbedOutcome`](crate::exif::EmbedOutcome) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal failure while processing a single image.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The input could not be read or parsed as a supported raster format.
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The processed raster could not be written to the output path.
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Filesystem failure outside of decoding/encoding (e.g. staging the output).
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessingError {
    pub(crate) fn decode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn encode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Encode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` if the input could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// `true` if the output could not be written.
    pub fn is_encode(&self) -> bool {
        matches!(self, Self::Encode { .. } | Self::Io { .. })
    }

    /// The file the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Decode { path, .. } | Self::Encode { path, .. } | Self::Io { path, .. } => path,
        }
    }
}
