//! Shared helpers for the ingestion integration tests.

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use eo3_metadata::{
    AffineTransform, BandSpec, BoundingBox, DatasetFacts, FileFormat, Measurement,
    MeasurementRegistry, MetadataDocument, Nodata, ProductDescriptor, ProductDraft, Temporal,
};
use ingestion::{ProductDatasetMap, SourceAdapter};
use serde_yaml::Mapping;
use test_utils::GeoTiffFixture;
use tracing::Level;

/// Adapter over a fixed file list that never opens the files it describes.
pub struct StubAdapter {
    pub folder: String,
    pub products: Vec<String>,
    pub files: Vec<(String, Vec<PathBuf>)>,
    /// Overrides the `product.name` embedded in every metadata document.
    pub embedded_name: Option<String>,
}

impl StubAdapter {
    pub fn new(folder: &str, product: &str, files: Vec<PathBuf>) -> Self {
        Self {
            folder: folder.to_string(),
            products: vec![product.to_string()],
            files: vec![(product.to_string(), files)],
            embedded_name: None,
        }
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn id(&self) -> &str {
        "stub"
    }

    fn folder(&self) -> &str {
        &self.folder
    }

    fn product_names(&self) -> &[String] {
        &self.products
    }

    async fn fetch_if_absent(&self, data_root: &Path) -> bool {
        data_root.join(&self.folder).is_dir()
    }

    fn build_product_dataset_map(&self, _data_root: &Path) -> ingestion::Result<ProductDatasetMap> {
        let mut map = ProductDatasetMap::new();
        for (product, files) in &self.files {
            map.insert(product.clone(), files.clone());
        }
        Ok(map)
    }

    fn product_draft(&self, product_name: &str) -> ingestion::Result<ProductDraft> {
        let embedded = self.embedded_name.as_deref().unwrap_or(product_name);
        Ok(ProductDraft {
            name: product_name.to_string(),
            description: format!("{} stub", product_name),
            measurements: MeasurementRegistry::new()
                .with("value", Measurement::new("float32", "1", Nodata::NaN)),
            metadata: MetadataDocument::for_product(embedded),
        })
    }

    fn dataset_facts(
        &self,
        _product: &ProductDescriptor,
        file: &Path,
    ) -> ingestion::Result<DatasetFacts> {
        let time = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        Ok(DatasetFacts {
            path: file.to_path_buf(),
            crs: "EPSG:4326".to_string(),
            footprint: BoundingBox::new(0.0, 0.0, 1.0, 1.0).footprint().into_vertices(),
            shape: (1, 1),
            transform: AffineTransform::north_up(0.0, 1.0, 1.0, 1.0),
            bands: vec![("value".to_string(), BandSpec::layer("value"))],
            platform: None,
            instrument: None,
            temporal: Temporal {
                acquired: time,
                processed: time,
            },
            file_format: FileFormat::NetCDF,
            lineage: Mapping::new(),
        })
    }
}

/// Lays out `<root>/anthroprotect/tiles/{s2,s2_scl,lcs}/<tiles>` plus
/// `investigative/<extra>` with georeferenced GeoTIFFs.
pub fn write_anthroprotect(root: &Path, tiles: &[&str], investigative: &[&str]) -> PathBuf {
    let source = root.join("anthroprotect");
    for (subfolder, bands) in [("tiles/s2", 4), ("tiles/s2_scl", 1), ("tiles/lcs", 4)] {
        let dir = source.join(subfolder);
        std::fs::create_dir_all(&dir).unwrap();
        for tile in tiles {
            GeoTiffFixture::default().with_bands(bands).write(&dir.join(tile));
        }
    }
    if !investigative.is_empty() {
        let dir = source.join("investigative");
        std::fs::create_dir_all(&dir).unwrap();
        for tile in investigative {
            GeoTiffFixture::default().with_bands(4).write(&dir.join(tile));
        }
    }
    source
}

pub fn file_names(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

/// Buffer collecting plain-text log lines of one test.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Subscriber writing WARN and above into this buffer.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let buffer = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .with_ansi(false)
            .without_time()
            .with_writer(move || buffer.clone())
            .finish()
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
