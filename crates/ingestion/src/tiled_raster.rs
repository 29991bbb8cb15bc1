//! GeoTIFF tile collections split over parallel subfolders.
//!
//! Each declared product owns one subfolder; every subfolder holds the same
//! tile names. An optional supplementary folder contributes extra tiles to
//! the first product only.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use eo3_metadata::{
    AffineTransform, BandSpec, DatasetFacts, FileFormat, MeasurementRegistry, MetadataDocument,
    ProductDescriptor, ProductDraft, Temporal,
};
use geotiff_parser::read_geotiff_info;
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::adapter::{list_files, ProductDatasetMap, SourceAdapter};
use crate::bands;
use crate::config::SourceConfig;
use crate::error::{IngestionError, Result};
use crate::fetch::{FetchPlan, Fetcher};

/// Per-product settings, matched against product names by prefix.
#[derive(Debug, Clone)]
pub struct TileProfile {
    pub prefix: &'static str,
    pub registry: fn() -> MeasurementRegistry,
    pub platform: &'static str,
    pub instrument: Option<&'static str>,
    pub keyword: &'static str,
}

/// Canonical link added to every product's metadata document.
#[derive(Debug, Clone)]
pub struct Link {
    pub media_type: &'static str,
    pub rel: &'static str,
    pub title: &'static str,
    pub href: &'static str,
    pub hreflang: &'static str,
}

impl Link {
    fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        for (key, value) in [
            ("type", self.media_type),
            ("rel", self.rel),
            ("title", self.title),
            ("href", self.href),
            ("hreflang", self.hreflang),
        ] {
            map.insert(Value::from(key), Value::from(value));
        }
        Value::Mapping(map)
    }
}

pub struct TiledRasterAdapter {
    id: String,
    folder: String,
    product_names: Vec<String>,
    /// One subfolder per declared product, relative to the source folder.
    subfolders: Vec<String>,
    supplementary: Option<String>,
    extension: &'static str,
    /// Checked in order; more specific prefixes come first.
    profiles: Vec<TileProfile>,
    keywords: Vec<&'static str>,
    links: Vec<Link>,
    temporal: Temporal,
    plan: FetchPlan,
    fetcher: Fetcher,
}

impl TiledRasterAdapter {
    /// The AnthroProtect Fennoscandia collection (Sentinel-2, scene
    /// classification and land cover tiles).
    pub fn anthroprotect(config: &SourceConfig, plan: FetchPlan, fetcher: Fetcher) -> Result<Self> {
        if config.product_names.len() != 3 {
            return Err(IngestionError::InvalidConfig(format!(
                "anthroprotect needs 3 product names, got {:?}",
                config.product_names
            )));
        }

        Ok(Self {
            id: config.kind.id().to_string(),
            folder: config.folder.clone(),
            product_names: config.product_names.clone(),
            subfolders: vec![
                "tiles/s2".to_string(),
                "tiles/s2_scl".to_string(),
                "tiles/lcs".to_string(),
            ],
            supplementary: Some("investigative".to_string()),
            extension: "tif",
            profiles: vec![
                TileProfile {
                    prefix: "s2_scl",
                    registry: bands::sentinel2_scl,
                    platform: "Sentinel-2 scene classification map",
                    instrument: None,
                    keyword: "Sentinel-2 scene classification map",
                },
                TileProfile {
                    prefix: "s2",
                    registry: bands::sentinel2,
                    platform: "Sentinel-2 Level-2A",
                    instrument: Some("Multi-spectral instrument (MSI)"),
                    keyword: "Sentinel-2",
                },
                TileProfile {
                    prefix: "lcs",
                    registry: bands::land_cover,
                    platform: "Copernicus CORINE Land Cover dataset, MODIS Land Cover Type 1, \
                               Copernicus Global Land Service, ESA GlobCover",
                    instrument: None,
                    keyword: "Land cover data",
                },
            ],
            keywords: vec!["AnthroProtect", "Wilderness", "Fennoscandia"],
            links: vec![Link {
                media_type: "text/html",
                rel: "canonical",
                title: "AnthroProtect dataset",
                href: "http://rs.ipb.uni-bonn.de/data/anthroprotect/",
                hreflang: "en-US",
            }],
            temporal: Temporal {
                acquired: fixed_time(2020, 8, 1)?,
                processed: fixed_time(2021, 10, 12)?,
            },
            plan,
            fetcher,
        })
    }

    fn profile(&self, product_name: &str) -> Result<&TileProfile> {
        self.profiles
            .iter()
            .find(|p| product_name.starts_with(p.prefix))
            .ok_or_else(|| IngestionError::UnknownProduct(product_name.to_string()))
    }

    fn metadata_document(&self, product_name: &str, profile: &TileProfile) -> MetadataDocument {
        let keywords = self
            .keywords
            .iter()
            .chain(std::iter::once(&profile.keyword))
            .map(|k| Value::from(*k))
            .collect();
        let links = self.links.iter().map(Link::to_value).collect();

        MetadataDocument::for_product(product_name)
            .with_value("keywords", Value::Sequence(keywords))
            .with_value("links", Value::Sequence(links))
    }
}

#[async_trait]
impl SourceAdapter for TiledRasterAdapter {
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
        let source = data_root.join(&self.folder);
        let mut map = ProductDatasetMap::new();
        let mut reference: Option<(&str, Vec<OsString>)> = None;

        for (product, subfolder) in self.product_names.iter().zip(&self.subfolders) {
            let files = list_files(&source.join(subfolder), self.extension)?;
            let names: Vec<OsString> = files
                .iter()
                .filter_map(|f| f.file_name().map(|n| n.to_os_string()))
                .collect();

            if let Some((ref_folder, ref_names)) = &reference {
                if *ref_names != names {
                    return Err(folder_mismatch(ref_folder, ref_names, subfolder, &names));
                }
            } else {
                reference = Some((subfolder.as_str(), names));
            }

            debug!(product = %product, files = files.len(), "Collected tiles");
            map.insert(product.clone(), files);
        }

        if let (Some(supplementary), Some(first)) = (&self.supplementary, self.product_names.first())
        {
            let dir = source.join(supplementary);
            if dir.is_dir() {
                let extra = list_files(&dir, self.extension)?;
                debug!(product = %first, files = extra.len(), "Adding supplementary tiles");
                map.extend(first, extra);
            } else {
                warn!(path = %dir.display(), "Supplementary folder does not exist");
            }
        }

        Ok(map)
    }

    fn product_draft(&self, product_name: &str) -> Result<ProductDraft> {
        let profile = self.profile(product_name)?;
        Ok(ProductDraft {
            name: product_name.to_string(),
            description: product_name.to_string(),
            measurements: (profile.registry)(),
            metadata: self.metadata_document(product_name, profile),
        })
    }

    fn dataset_facts(&self, product: &ProductDescriptor, file: &Path) -> Result<DatasetFacts> {
        let profile = self.profile(product.name())?;
        let info = read_geotiff_info(file)?;

        let registry = product.measurements();
        if info.band_count != registry.len() {
            warn!(
                path = %file.display(),
                bands = info.band_count,
                measurements = registry.len(),
                "Band count differs from the product's measurements"
            );
        }

        let bands = registry
            .names()
            .zip(1u32..)
            .map(|(name, index)| (name.to_string(), BandSpec::index(index)))
            .collect();

        let transform = AffineTransform::from_gdal(info.geotransform);
        let footprint = transform
            .bounds(info.height, info.width)
            .footprint()
            .into_vertices();

        Ok(DatasetFacts {
            path: file.to_path_buf(),
            crs: info.crs,
            footprint,
            shape: (info.height, info.width),
            transform,
            bands,
            platform: Some(profile.platform.to_string()),
            instrument: profile.instrument.map(str::to_string),
            temporal: self.temporal,
            file_format: FileFormat::GeoTIFF,
            lineage: Mapping::new(),
        })
    }
}

fn fixed_time(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .ok_or_else(|| IngestionError::InvalidConfig(format!("invalid date {year}-{month}-{day}")))
}

fn folder_mismatch(
    reference: &str,
    expected: &[OsString],
    folder: &str,
    found: &[OsString],
) -> IngestionError {
    let expected: BTreeSet<_> = expected.iter().map(|n| n.to_string_lossy().into_owned()).collect();
    let found: BTreeSet<_> = found.iter().map(|n| n.to_string_lossy().into_owned()).collect();
    IngestionError::FolderMismatch {
        reference: reference.to_string(),
        folder: folder.to_string(),
        missing: expected.difference(&found).cloned().collect(),
        extra: found.difference(&expected).cloned().collect(),
    }
}
