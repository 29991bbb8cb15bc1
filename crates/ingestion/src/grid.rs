//! NetCDF grid sources: one folder, one product, one file per time step.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use eo3_metadata::{
    AffineTransform, BandSpec, DatasetFacts, FileFormat, MeasurementRegistry, MetadataDocument,
    ProductDescriptor, ProductDraft, Temporal,
};
use netcdf_parser::read_grid_info;
use serde_yaml::Mapping;
use tracing::{debug, warn};

use crate::adapter::{list_files, ProductDatasetMap, SourceAdapter};
use crate::bands;
use crate::config::{SourceConfig, SourceKind};
use crate::error::{IngestionError, Result};
use crate::fetch::{FetchPlan, Fetcher};

/// Platform and instrument recorded for model and reanalysis grids.
const NOT_APPLICABLE: &str = "na";

pub struct GridAdapter {
    id: String,
    folder: String,
    product_names: Vec<String>,
    registry: MeasurementRegistry,
    extension: &'static str,
    /// Acquisition time for grids without a time axis.
    static_time: Option<DateTime<Utc>>,
    plan: FetchPlan,
    fetcher: Fetcher,
}

impl GridAdapter {
    pub fn new(
        config: &SourceConfig,
        registry: MeasurementRegistry,
        plan: FetchPlan,
        fetcher: Fetcher,
    ) -> Result<Self> {
        if config.product_names.is_empty() {
            return Err(IngestionError::InvalidConfig(format!(
                "{} declares no product",
                config.kind
            )));
        }
        Ok(Self {
            id: config.kind.id().to_string(),
            folder: config.folder.clone(),
            product_names: config.product_names.clone(),
            registry,
            extension: "nc",
            static_time: None,
            plan,
            fetcher,
        })
    }

    /// Adapter with the measurement registry of a known grid source.
    pub fn for_source(config: &SourceConfig, plan: FetchPlan, fetcher: Fetcher) -> Result<Self> {
        let registry = match config.kind {
            SourceKind::CmemsWaves => bands::cmems_waves(),
            SourceKind::CmemsCurrents => bands::cmems_currents(),
            SourceKind::CmemsPhysics => bands::cmems_physics(),
            SourceKind::Gfs => bands::gfs(),
            SourceKind::GlobalRelief => bands::global_relief(),
            SourceKind::Anthroprotect => {
                return Err(IngestionError::InvalidConfig(
                    "anthroprotect is not a grid source".to_string(),
                ))
            }
        };
        let adapter = Self::new(config, registry, plan, fetcher)?;

        // ETOPO 2022 carries no time axis
        match config.kind {
            SourceKind::GlobalRelief => {
                let release = Utc
                    .with_ymd_and_hms(2022, 1, 1, 0, 0, 0)
                    .single()
                    .ok_or_else(|| IngestionError::InvalidConfig("release date".to_string()))?;
                Ok(adapter.with_static_time(release))
            }
            _ => Ok(adapter),
        }
    }

    pub fn with_static_time(mut self, time: DateTime<Utc>) -> Self {
        self.static_time = Some(time);
        self
    }
}

#[async_trait]
impl SourceAdapter for GridAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn folder(&self) -> &str {
        &self.folder
    }

    fn product_names(&self) -> &[String] {
        &self.product_names
    }

    async fn fetch_if_absent(&self, data_root: &Path) -> bool {
        self.fetcher
            .fetch_if_absent(&self.plan, data_root, &self.folder)
            .await
    }

    fn build_product_dataset_map(&self, data_root: &Path) -> Result<ProductDatasetMap> {
        let files = list_files(&data_root.join(&self.folder), self.extension)?;
        let mut map = ProductDatasetMap::new();
        if let Some(product) = self.product_names.first() {
            debug!(product = %product, files = files.len(), "Collected grid files");
            map.insert(product.clone(), files);
        }
        Ok(map)
    }

    fn product_draft(&self, product_name: &str) -> Result<ProductDraft> {
        if !self.product_names.iter().any(|p| p == product_name) {
            return Err(IngestionError::UnknownProduct(product_name.to_string()));
        }
        Ok(ProductDraft {
            name: product_name.to_string(),
            description: product_name.to_string(),
            measurements: self.registry.clone(),
            metadata: MetadataDocument::for_product(product_name),
        })
    }

    fn dataset_facts(&self, product: &ProductDescriptor, file: &Path) -> Result<DatasetFacts> {
        let info = read_grid_info(file)?;

        let mut bands = Vec::new();
        let mut absent = Vec::new();
        for (name, measurement) in product.measurements().iter() {
            let layer = measurement.layer.as_deref().unwrap_or(name);
            if info.has_variable(layer) {
                bands.push((name.to_string(), BandSpec::layer(layer)));
            } else {
                absent.push(layer);
            }
        }
        if bands.is_empty() {
            return Err(IngestionError::NoMeasurements(file.to_path_buf()));
        }
        if !absent.is_empty() {
            warn!(
                path = %file.display(),
                absent = ?absent,
                "Variables missing from file, binding the remaining measurements"
            );
        }

        let time = info
            .time
            .or(self.static_time)
            .ok_or_else(|| IngestionError::MissingTime(file.to_path_buf()))?;

        let transform = AffineTransform::from_gdal(info.geotransform);
        let footprint = transform
            .bounds(info.rows, info.cols)
            .footprint()
            .into_vertices();

        Ok(DatasetFacts {
            path: file.to_path_buf(),
            crs: info.crs,
            footprint,
            shape: (info.rows, info.cols),
            transform,
            bands,
            platform: Some(NOT_APPLICABLE.to_string()),
            instrument: Some(NOT_APPLICABLE.to_string()),
            temporal: Temporal {
                acquired: time,
                processed: time,
            },
            file_format: FileFormat::NetCDF,
            lineage: Mapping::new(),
        })
    }
}
