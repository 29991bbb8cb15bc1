//! Error types for descriptor construction.

use thiserror::Error;

/// Result type for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Errors raised while building or serializing descriptors.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(
        "Product name mismatch: declared '{declared}', document '{document}', \
         metadata document '{embedded}'"
    )]
    ProductNameMismatch {
        declared: String,
        document: String,
        embedded: String,
    },

    #[error("Metadata document of product '{0}' has no product.name entry")]
    MissingProductName(String),

    #[error("Invalid band binding for measurement '{measurement}': {reason}")]
    InvalidBandBinding { measurement: String, reason: String },

    #[error("Measurement '{measurement}' is not defined by product '{product}'")]
    UnknownMeasurement { product: String, measurement: String },

    #[error("Measurement '{0}' is bound more than once")]
    DuplicateMeasurement(String),

    #[error("Product '{0}' defines no measurements")]
    EmptyRegistry(String),

    #[error("Invalid footprint: {0}")]
    InvalidFootprint(String),

    #[error("Invalid grid shape {rows}x{cols}")]
    InvalidShape { rows: usize, cols: usize },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
