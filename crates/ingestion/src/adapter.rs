//! The source adapter seam and the product-dataset map.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eo3_metadata::{
    build_dataset_document, build_product_document, DatasetDescriptor, DatasetFacts,
    ProductDescriptor, ProductDraft,
};
use walkdir::WalkDir;

use crate::config::{SourceConfig, SourceKind};
use crate::error::{IngestionError, Result};
use crate::fetch::{FetchPlan, Fetcher};
use crate::grid::GridAdapter;
use crate::tiled_raster::TiledRasterAdapter;

/// Product name to the files registered under it, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDatasetMap {
    entries: Vec<(String, Vec<PathBuf>)>,
}

impl ProductDatasetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the files of a product, replacing an earlier entry in place.
    pub fn insert(&mut self, product: impl Into<String>, files: Vec<PathBuf>) {
        let product = product.into();
        match self.entries.iter_mut().find(|(p, _)| *p == product) {
            Some(entry) => entry.1 = files,
            None => self.entries.push((product, files)),
        }
    }

    /// Append files to a product's list.
    pub fn extend(&mut self, product: &str, files: impl IntoIterator<Item = PathBuf>) {
        match self.entries.iter_mut().find(|(p, _)| p == product) {
            Some(entry) => entry.1.extend(files),
            None => self.entries.push((product.to_string(), files.into_iter().collect())),
        }
    }

    pub fn get(&self, product: &str) -> Option<&[PathBuf]> {
        self.entries
            .iter()
            .find(|(p, _)| p == product)
            .map(|(_, files)| files.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.entries.iter().map(|(p, f)| (p.as_str(), f.as_slice()))
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dataset_count(&self) -> usize {
        self.entries.iter().map(|(_, f)| f.len()).sum()
    }

    /// Add an empty entry for every declared product without one.
    ///
    /// Returns the names that were missing.
    pub fn ensure_complete(&mut self, declared: &[String]) -> Vec<String> {
        let missing: Vec<String> = declared
            .iter()
            .filter(|name| self.get(name).is_none())
            .cloned()
            .collect();
        for name in &missing {
            self.entries.push((name.clone(), Vec::new()));
        }
        missing
    }
}

/// One source family: where its files live, how they get there, and how
/// its files become products and datasets.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable source identifier used in logs.
    fn id(&self) -> &str;

    /// Folder below the data root holding the source's files and product
    /// sidecars.
    fn folder(&self) -> &str;

    /// Declared products, in registration order.
    fn product_names(&self) -> &[String];

    /// Make the source's folder available. `false` means the source must be
    /// skipped for this run.
    async fn fetch_if_absent(&self, data_root: &Path) -> bool;

    fn build_product_dataset_map(&self, data_root: &Path) -> Result<ProductDatasetMap>;

    /// Raw product facts for a declared product.
    fn product_draft(&self, product_name: &str) -> Result<ProductDraft>;

    /// Raw facts of one file of `product`.
    fn dataset_facts(&self, product: &ProductDescriptor, file: &Path) -> Result<DatasetFacts>;

    fn describe_product(&self, product_name: &str) -> Result<ProductDescriptor> {
        let draft = self.product_draft(product_name)?;
        Ok(build_product_document(product_name, draft)?)
    }

    fn describe_dataset(
        &self,
        product: &ProductDescriptor,
        file: &Path,
    ) -> Result<DatasetDescriptor> {
        let facts = self.dataset_facts(product, file)?;
        Ok(build_dataset_document(product, facts)?)
    }
}

/// Build the adapter for a configured source.
pub fn adapter_for(config: &SourceConfig, fetcher: &Fetcher) -> Result<Box<dyn SourceAdapter>> {
    let plan = fetch_plan(config)?;
    let adapter: Box<dyn SourceAdapter> = match config.kind {
        SourceKind::Anthroprotect => Box::new(TiledRasterAdapter::anthroprotect(
            config,
            plan,
            fetcher.clone(),
        )?),
        _ => Box::new(GridAdapter::for_source(config, plan, fetcher.clone())?),
    };
    Ok(adapter)
}

fn fetch_plan(config: &SourceConfig) -> Result<FetchPlan> {
    let required = |value: &Option<String>, what: &str| {
        value.clone().ok_or_else(|| {
            IngestionError::InvalidConfig(format!("{} needs a {}", config.kind, what))
        })
    };
    let plan = match config.kind {
        SourceKind::Anthroprotect => FetchPlan::Archive {
            url: required(&config.url, "download URL")?,
            archive_name: required(&config.download_name, "archive name")?,
            sha256: config.sha256.clone(),
            force: config.force_download,
        },
        SourceKind::GlobalRelief => FetchPlan::SingleFile {
            url: required(&config.url, "download URL")?,
            file_name: required(&config.download_name, "file name")?,
        },
        _ => FetchPlan::ExternalFolder,
    };
    Ok(plan)
}

/// Files directly inside `dir` whose names end in `.<extension>`, sorted by
/// file name. Symlinks to files count as files.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let suffix = format!(".{}", extension);
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.path().is_file() && entry.file_name().to_string_lossy().ends_with(&suffix) {
            files.push(entry.into_path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{temp_test_dir, touch_files};

    #[test]
    fn test_ensure_complete_adds_missing_products() {
        let mut map = ProductDatasetMap::new();
        map.insert("s2", vec![PathBuf::from("/a.tif")]);

        let declared = vec!["s2".to_string(), "s2_scl".to_string(), "lcs".to_string()];
        let missing = map.ensure_complete(&declared);

        assert_eq!(missing, vec!["s2_scl", "lcs"]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("lcs"), Some(&[][..]));
        assert!(map.ensure_complete(&declared).is_empty());
    }

    #[test]
    fn test_extend_appends_in_order() {
        let mut map = ProductDatasetMap::new();
        map.insert("s2", vec![PathBuf::from("/t/a.tif")]);
        map.extend("s2", vec![PathBuf::from("/i/c.tif")]);
        assert_eq!(
            map.get("s2").unwrap(),
            &[PathBuf::from("/t/a.tif"), PathBuf::from("/i/c.tif")]
        );
        assert_eq!(map.dataset_count(), 2);
    }

    #[test]
    fn test_list_files_filters_and_sorts() {
        let dir = temp_test_dir();
        touch_files(
            dir.path(),
            &["b.tif", "a.tif", "a.tif.dataset-metadata.yaml", "notes.txt"],
        );
        std::fs::create_dir_all(dir.path().join("nested.tif")).unwrap();

        let files = list_files(dir.path(), "tif").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.tif", "b.tif"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_files_follows_symlinks() {
        let dir = temp_test_dir();
        let store = temp_test_dir();
        touch_files(store.path(), &["real.tif"]);
        std::os::unix::fs::symlink(store.path().join("real.tif"), dir.path().join("linked.tif"))
            .unwrap();
        std::os::unix::fs::symlink(store.path().join("gone.tif"), dir.path().join("broken.tif"))
            .unwrap();

        let files = list_files(dir.path(), "tif").unwrap();
        assert_eq!(files, vec![dir.path().join("linked.tif")]);
    }

    #[test]
    fn test_list_files_missing_folder() {
        let dir = temp_test_dir();
        let err = list_files(&dir.path().join("absent"), "nc").unwrap_err();
        assert!(matches!(err, IngestionError::FileRead(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fetch_plans() {
        let anthro = SourceConfig::defaults(SourceKind::Anthroprotect);
        assert!(matches!(
            fetch_plan(&anthro).unwrap(),
            FetchPlan::Archive { sha256: Some(_), force: false, .. }
        ));
        let relief = SourceConfig::defaults(SourceKind::GlobalRelief);
        assert!(matches!(
            fetch_plan(&relief).unwrap(),
            FetchPlan::SingleFile { .. }
        ));
        let waves = SourceConfig::defaults(SourceKind::CmemsWaves);
        assert_eq!(fetch_plan(&waves).unwrap(), FetchPlan::ExternalFolder);

        let mut broken = relief.clone();
        broken.url = None;
        assert!(fetch_plan(&broken).is_err());
    }
}
