//! Bringing the index in line with what a source has on disk.
//!
//! Products are registered before any dataset of the source. Datasets are
//! then visited one at a time in map order; a dataset that cannot be built
//! or submitted is logged and skipped, never retried within the run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use eo3_metadata::{
    dataset_id, dataset_sidecar_path, product_sidecar_path, DatasetDescriptor, ProductDescriptor,
};
use storage::IndexBackend;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

use crate::adapter::SourceAdapter;
use crate::error::Result;

/// Outcome counters of one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub source: String,
    pub products_added: usize,
    pub products_present: usize,
    pub datasets_added: usize,
    pub datasets_present: usize,
    /// Files listed in the map that no longer exist.
    pub datasets_missing: usize,
    pub datasets_failed: usize,
}

impl ReconcileReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }

    pub fn log(&self) {
        info!(
            source = %self.source,
            products_added = self.products_added,
            products_present = self.products_present,
            datasets_added = self.datasets_added,
            datasets_present = self.datasets_present,
            datasets_missing = self.datasets_missing,
            datasets_failed = self.datasets_failed,
            "Source reconciled"
        );
    }
}

enum DatasetOutcome {
    Added,
    Present,
}

/// Drives source adapters against an index.
#[derive(Clone)]
pub struct Reconciler {
    index: Arc<dyn IndexBackend>,
}

impl Reconciler {
    pub fn new(index: Arc<dyn IndexBackend>) -> Self {
        Self { index }
    }

    /// Register every product and dataset of `adapter` the index lacks.
    ///
    /// Errors that abort the source (unreadable folders, mismatching tile
    /// folders, inconsistent product names, index failures on products) are
    /// returned; per-dataset problems only show up in the report.
    #[instrument(skip(self, adapter, data_root), fields(source = %adapter.id()))]
    pub async fn reconcile_source(
        &self,
        adapter: &dyn SourceAdapter,
        data_root: &Path,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(adapter.id());
        let source_folder = data_root.join(adapter.folder());

        let mut map = adapter.build_product_dataset_map(data_root)?;
        for product in map.ensure_complete(adapter.product_names()) {
            warn!(product = %product, "Product is missing in product-dataset map");
        }
        info!(
            products = map.len(),
            datasets = map.dataset_count(),
            "Built product-dataset map"
        );

        let mut products = HashMap::new();
        for name in adapter.product_names() {
            let product = adapter.describe_product(name)?;
            if self.ensure_product(&product, &source_folder).await? {
                report.products_added += 1;
            } else {
                report.products_present += 1;
            }
            products.insert(name.clone(), product);
        }

        for (name, files) in map.iter() {
            let Some(product) = products.get(name) else {
                warn!(product = %name, "Map entry for an undeclared product, skipping");
                continue;
            };

            for file in files {
                if !file.exists() {
                    warn!(path = %file.display(), "Dataset file vanished, skipping");
                    report.datasets_missing += 1;
                    continue;
                }

                match self.ensure_dataset(adapter, product, file).await {
                    Ok(DatasetOutcome::Added) => report.datasets_added += 1,
                    Ok(DatasetOutcome::Present) => report.datasets_present += 1,
                    Err(e) => {
                        error!(
                            product = %name,
                            path = %file.display(),
                            error = %e,
                            "Could not register dataset"
                        );
                        report.datasets_failed += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Returns whether the product was added.
    async fn ensure_product(&self, product: &ProductDescriptor, folder: &Path) -> Result<bool> {
        if self.index.product_exists(product.name()).await? {
            info!(product = %product.name(), "Product already registered");
            return Ok(false);
        }

        let sidecar = product_sidecar_path(folder, product.name());
        if sidecar.exists() {
            debug!(path = %sidecar.display(), "Keeping existing product sidecar");
        } else {
            fs::write(&sidecar, product.to_yaml()?).await?;
            debug!(path = %sidecar.display(), "Wrote product sidecar");
        }

        self.index
            .add_product(product.name(), &product.to_json()?)
            .await?;
        info!(product = %product.name(), "Product added");
        Ok(true)
    }

    async fn ensure_dataset(
        &self,
        adapter: &dyn SourceAdapter,
        product: &ProductDescriptor,
        file: &Path,
    ) -> Result<DatasetOutcome> {
        let id = dataset_id(file);
        if self.index.dataset_exists(id).await? {
            debug!(id = %id, path = %file.display(), "Dataset already registered");
            return Ok(DatasetOutcome::Present);
        }

        let dataset = adapter.describe_dataset(product, file)?;
        self.submit_dataset(&dataset).await?;
        Ok(DatasetOutcome::Added)
    }

    async fn submit_dataset(&self, dataset: &DatasetDescriptor) -> Result<()> {
        let sidecar = dataset_sidecar_path(dataset.path());
        fs::write(&sidecar, dataset.to_yaml()?).await?;

        let uri = format!("file://{}", sidecar.display());
        self.index
            .add_dataset(dataset.id(), dataset.product_name(), &dataset.to_json()?, &uri)
            .await?;
        info!(id = %dataset.id(), uri = %uri, "Dataset added");
        Ok(())
    }
}
