//! One import pass over all enabled sources.

use std::path::PathBuf;
use std::sync::Arc;

use storage::IndexBackend;
use tracing::{error, info, warn};

use crate::adapter::{adapter_for, SourceAdapter};
use crate::config::ImporterConfig;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::reconcile::{ReconcileReport, Reconciler};

pub struct Importer {
    data_root: PathBuf,
    adapters: Vec<Box<dyn SourceAdapter>>,
    reconciler: Reconciler,
}

impl Importer {
    /// Build adapters for every enabled source.
    pub fn new(config: &ImporterConfig, index: Arc<dyn IndexBackend>) -> Result<Self> {
        let fetcher = Fetcher::new()?;
        let adapters = config
            .sources
            .iter()
            .map(|source| adapter_for(source, &fetcher))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_adapters(config.data_root(), adapters, index))
    }

    pub fn with_adapters(
        data_root: PathBuf,
        adapters: Vec<Box<dyn SourceAdapter>>,
        index: Arc<dyn IndexBackend>,
    ) -> Self {
        Self {
            data_root,
            adapters,
            reconciler: Reconciler::new(index),
        }
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    /// Fetch and reconcile every source in order.
    ///
    /// A source whose fetch fails or whose reconciliation hits a non-fatal
    /// error is skipped; a fatal error stops the pass.
    pub async fn run_once(&self) -> Result<Vec<ReconcileReport>> {
        let mut reports = Vec::new();
        info!(
            data_root = %self.data_root.display(),
            sources = self.adapters.len(),
            "Starting import"
        );

        for adapter in &self.adapters {
            info!(source = %adapter.id(), "Processing source");

            if !adapter.fetch_if_absent(&self.data_root).await {
                warn!(source = %adapter.id(), "Source data not available, skipping");
                continue;
            }

            match self
                .reconciler
                .reconcile_source(adapter.as_ref(), &self.data_root)
                .await
            {
                Ok(report) => {
                    report.log();
                    reports.push(report);
                }
                Err(e) if e.is_fatal() => {
                    error!(source = %adapter.id(), error = %e, "Fatal error, aborting import");
                    return Err(e);
                }
                Err(e) => {
                    error!(source = %adapter.id(), error = %e, "Could not reconcile source");
                }
            }
        }

        info!(sources = reports.len(), "Import finished");
        Ok(reports)
    }
}
