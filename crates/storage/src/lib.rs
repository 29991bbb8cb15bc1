//! Index backends for the importer.
//!
//! Provides the [`IndexBackend`] seam plus two implementations:
//! - [`PgIndex`]: PostgreSQL tables for products and datasets (JSONB documents)
//! - [`MemoryIndex`]: in-process index for dry runs and tests

pub mod backend;
pub mod error;
pub mod memory;
pub mod postgres;

pub use backend::IndexBackend;
pub use error::{IndexError, IndexResult};
pub use memory::{MemoryIndex, StoredDataset};
pub use postgres::PgIndex;
