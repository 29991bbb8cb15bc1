//! Source adapters and index reconciliation for the cube importer.
//!
//! # Architecture
//!
//! Each enabled source is handled by a [`SourceAdapter`]:
//!
//! - [`TiledRasterAdapter`]: GeoTIFF tiles in parallel per-product folders
//! - [`GridAdapter`]: NetCDF grids, one product per source
//!
//! An adapter makes its files available ([`fetch`]), lists them per product
//! ([`ProductDatasetMap`]) and turns them into descriptors via the
//! `eo3-metadata` builder. The [`Reconciler`] registers whatever the index
//! is missing, writing YAML sidecars next to the data, and the [`Importer`]
//! runs that for every source in configuration order.

pub mod adapter;
pub mod bands;
pub mod config;
pub mod error;
pub mod fetch;
pub mod grid;
pub mod pipeline;
pub mod reconcile;
pub mod tiled_raster;

// Re-exports
pub use adapter::{adapter_for, list_files, ProductDatasetMap, SourceAdapter};
pub use config::{
    parse_bool, ImporterConfig, PeriodUnit, PeriodicConfig, SourceConfig, SourceKind, Until,
};
pub use error::{IngestionError, Result};
pub use fetch::{extract_zip, sha256_file, FetchPlan, Fetcher};
pub use grid::GridAdapter;
pub use pipeline::Importer;
pub use reconcile::{ReconcileReport, Reconciler};
pub use tiled_raster::TiledRasterAdapter;
