//! Error types for GeoTIFF header reading.

use thiserror::Error;

/// Result type for GeoTIFF operations.
pub type GeoTiffResult<T> = Result<T, GeoTiffError>;

/// Error types for GeoTIFF reading.
#[derive(Error, Debug)]
pub enum GeoTiffError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The TIFF container itself could not be decoded
    #[error("TIFF decoding failed: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// A required GeoTIFF tag or GeoKey is absent
    #[error("Missing georeferencing: {0}")]
    MissingGeoreference(String),

    /// A GeoTIFF tag is present but malformed
    #[error("Invalid GeoTIFF tag: {0}")]
    InvalidTag(String),

    /// CRS is user-defined or otherwise not expressible as an EPSG code
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
