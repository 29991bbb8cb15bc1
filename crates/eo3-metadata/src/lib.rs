//! Product and dataset descriptors for the spatio-temporal index.
//!
//! Source adapters hand raw facts (file path, envelope, grid, band list) to
//! the builder in this crate, which turns them into the two canonical
//! documents the index understands:
//!
//! - [`ProductDescriptor`]: one homogeneous measurement family
//! - [`DatasetDescriptor`]: one file registered under a product
//!
//! Both are only constructible through [`build_product_document`] and
//! [`build_dataset_document`], so every descriptor in circulation has passed
//! the cross-field checks (product name agreement, band index xor layer,
//! closed footprint, bands known to the product).
//!
//! Descriptors serialize to the eo3 document layout, as YAML for the sidecar
//! files and as JSON for index submission.

pub mod builder;
pub mod dataset;
pub mod document;
pub mod error;
pub mod geometry;
pub mod identity;
pub mod measurement;
pub mod product;
pub mod sidecar;

pub use builder::{build_dataset_document, build_product_document};
pub use dataset::{
    BandBinding, BandLocation, BandSpec, DatasetDescriptor, DatasetFacts, FileFormat, Grid,
    Temporal,
};
pub use error::{MetadataError, Result};
pub use geometry::{AffineTransform, BoundingBox, Footprint};
pub use identity::dataset_id;
pub use measurement::{Measurement, MeasurementRegistry, Nodata};
pub use product::{MetadataDocument, ProductDescriptor, ProductDraft};
pub use sidecar::{dataset_sidecar_path, product_sidecar_path, SIDECAR_EXTENSION};
