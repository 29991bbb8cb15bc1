//! Error types for the ingestion crate.

use std::path::PathBuf;

use eo3_metadata::MetadataError;
use geotiff_parser::GeoTiffError;
use netcdf_parser::NetCdfError;
use storage::IndexError;
use thiserror::Error;

/// Errors that can occur while importing a source.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error(
        "File names in '{folder}' differ from '{reference}': \
         only in reference {missing:?}, only in folder {extra:?}"
    )]
    FolderMismatch {
        reference: String,
        folder: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("No measurement registry for product '{0}'")]
    UnknownProduct(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("Failed to read GeoTIFF: {0}")]
    GeoTiff(#[from] GeoTiffError),

    #[error("Failed to read NetCDF: {0}")]
    NetCdf(#[from] NetCdfError),

    #[error("No time axis in '{}' and no fixed time configured", .0.display())]
    MissingTime(PathBuf),

    #[error("None of the product's measurements are present in '{}'", .0.display())]
    NoMeasurements(PathBuf),

    #[error("Index operation failed: {0}")]
    Index(#[from] IndexError),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("SHA-256 mismatch for '{}': expected {expected}, got {actual}", .path.display())]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Failed to extract archive: {0}")]
    Archive(String),
}

impl IngestionError {
    /// Whether the error must abort the whole run instead of skipping one
    /// item or one source.
    pub fn is_fatal(&self) -> bool {
        match self {
            IngestionError::FolderMismatch { .. }
            | IngestionError::UnknownProduct(_)
            | IngestionError::InvalidConfig(_) => true,
            IngestionError::Metadata(e) => matches!(
                e,
                MetadataError::ProductNameMismatch { .. }
                    | MetadataError::MissingProductName(_)
                    | MetadataError::EmptyRegistry(_)
            ),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for IngestionError {
    fn from(err: reqwest::Error) -> Self {
        IngestionError::Download(err.to_string())
    }
}

impl From<zip::result::ZipError> for IngestionError {
    fn from(err: zip::result::ZipError) -> Self {
        IngestionError::Archive(err.to_string())
    }
}

impl From<walkdir::Error> for IngestionError {
    fn from(err: walkdir::Error) -> Self {
        IngestionError::FileRead(err.into())
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
