//! Error types for tallpdf.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tallpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while turning a tall image into a paginated PDF.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry inputs were zero, negative, or not finite.
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    /// The source image could not be opened or decoded.
    #[error("Failed to decode image {}: {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A band could not be converted to the target colour mode or encoded.
    #[error("Cannot encode band {band}: {reason}")]
    Encoding { band: u32, reason: String },

    /// The document could not be assembled or written.
    #[error("Export failed: {0}")]
    Export(String),

    /// No bands reached the exporter.
    #[error("Document has no pages")]
    EmptyDocument,

    /// The conversion was cancelled between bands.
    #[error("Conversion cancelled")]
    Cancelled,

    /// I/O error on intermediate band storage.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn encoding(band: u32, reason: impl ToString) -> Self {
        Error::Encoding {
            band,
            reason: reason.to_string(),
        }
    }
}
