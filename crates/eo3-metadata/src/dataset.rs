//! Dataset descriptors and the raw facts adapters provide for them.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_yaml::Mapping;
use uuid::Uuid;

use crate::geometry::{AffineTransform, Footprint};
use crate::product::MetadataDocument;

/// File container tag written to `odc:file_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileFormat {
    GeoTIFF,
    NetCDF,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::GeoTIFF => write!(f, "GeoTIFF"),
            FileFormat::NetCDF => write!(f, "NetCDF"),
        }
    }
}

/// Acquisition and processing times of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Temporal {
    pub acquired: DateTime<Utc>,
    pub processed: DateTime<Utc>,
}

/// Unvalidated band location as reported by an adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BandSpec {
    pub band: Option<u32>,
    pub layer: Option<String>,
}

impl BandSpec {
    pub fn index(band: u32) -> Self {
        Self {
            band: Some(band),
            layer: None,
        }
    }

    pub fn layer(layer: impl Into<String>) -> Self {
        Self {
            band: None,
            layer: Some(layer.into()),
        }
    }
}

/// Where inside the file a measurement lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandLocation {
    /// 1-based band index in a multi-band file.
    Index(u32),
    /// Variable name inside a multi-variable file.
    Layer(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandBinding {
    pub measurement: String,
    pub path: String,
    pub location: BandLocation,
}

/// Raster grid: shape as (rows, cols) and a row-major 3x3 affine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub shape: (usize, usize),
    pub transform: [f64; 9],
}

/// Raw dataset facts collected by an adapter from one file.
#[derive(Debug, Clone)]
pub struct DatasetFacts {
    pub path: PathBuf,
    pub crs: String,
    pub footprint: Vec<[f64; 2]>,
    pub shape: (usize, usize),
    pub transform: AffineTransform,
    pub bands: Vec<(String, BandSpec)>,
    pub platform: Option<String>,
    pub instrument: Option<String>,
    pub temporal: Temporal,
    pub file_format: FileFormat,
    pub lineage: Mapping,
}

/// A validated dataset. Only the builder constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    pub(crate) id: Uuid,
    pub(crate) path: PathBuf,
    pub(crate) product_name: String,
    pub(crate) crs: String,
    pub(crate) geometry: Footprint,
    pub(crate) grid: Grid,
    pub(crate) bands: Vec<BandBinding>,
    pub(crate) platform: Option<String>,
    pub(crate) instrument: Option<String>,
    pub(crate) temporal: Temporal,
    pub(crate) file_format: FileFormat,
    pub(crate) lineage: Mapping,
    pub(crate) metadata: MetadataDocument,
}

impl DatasetDescriptor {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn geometry(&self) -> &Footprint {
        &self.geometry
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn bands(&self) -> &[BandBinding] {
        &self.bands
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn instrument(&self) -> Option<&str> {
        self.instrument.as_deref()
    }

    pub fn temporal(&self) -> &Temporal {
        &self.temporal
    }

    pub fn file_format(&self) -> FileFormat {
        self.file_format
    }

    pub fn lineage(&self) -> &Mapping {
        &self.lineage
    }

    pub fn metadata(&self) -> &MetadataDocument {
        &self.metadata
    }
}
