//! In-memory index for dry runs and tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::IndexBackend;
use crate::error::{IndexError, IndexResult};

/// A dataset as stored by [`MemoryIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDataset {
    pub product_name: String,
    pub document: Value,
    pub source_uri: String,
}

#[derive(Default)]
struct MemoryState {
    products: Vec<(String, Value)>,
    datasets: HashMap<Uuid, StoredDataset>,
    rejected: HashSet<Uuid>,
}

/// Insert counters.
#[derive(Default)]
struct MemoryIndexStats {
    product_inserts: AtomicU64,
    dataset_inserts: AtomicU64,
    failed_inserts: AtomicU64,
}

/// Index kept entirely in memory. Enforces the same constraints as the
/// PostgreSQL index: unique product names, unique dataset ids and datasets
/// only under registered products.
#[derive(Default)]
pub struct MemoryIndex {
    state: RwLock<MemoryState>,
    stats: MemoryIndexStats,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future `add_dataset` for `id` fail.
    pub async fn reject_dataset(&self, id: Uuid) {
        self.state.write().await.rejected.insert(id);
    }

    pub async fn product(&self, name: &str) -> Option<Value> {
        let state = self.state.read().await;
        state
            .products
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub async fn dataset(&self, id: Uuid) -> Option<StoredDataset> {
        self.state.read().await.datasets.get(&id).cloned()
    }

    pub async fn dataset_count(&self) -> usize {
        self.state.read().await.datasets.len()
    }

    pub fn product_inserts(&self) -> u64 {
        self.stats.product_inserts.load(Ordering::Relaxed)
    }

    pub fn dataset_inserts(&self) -> u64 {
        self.stats.dataset_inserts.load(Ordering::Relaxed)
    }

    /// Inserts refused for conflicts, unknown products or rejections.
    pub fn failed_inserts(&self) -> u64 {
        self.stats.failed_inserts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl IndexBackend for MemoryIndex {
    async fn list_product_names(&self) -> IndexResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state.products.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn add_product(&self, name: &str, definition: &Value) -> IndexResult<()> {
        let mut state = self.state.write().await;
        if state.products.iter().any(|(n, _)| n == name) {
            self.stats.failed_inserts.fetch_add(1, Ordering::Relaxed);
            return Err(IndexError::Conflict(format!("product '{}'", name)));
        }
        state.products.push((name.to_string(), definition.clone()));
        self.stats.product_inserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn dataset_exists(&self, id: Uuid) -> IndexResult<bool> {
        Ok(self.state.read().await.datasets.contains_key(&id))
    }

    async fn add_dataset(
        &self,
        id: Uuid,
        product_name: &str,
        document: &Value,
        source_uri: &str,
    ) -> IndexResult<()> {
        let mut state = self.state.write().await;

        let failure = if state.rejected.contains(&id) {
            Some(IndexError::Rejected(format!("dataset '{}'", id)))
        } else if !state.products.iter().any(|(n, _)| n == product_name) {
            Some(IndexError::UnknownProduct(product_name.to_string()))
        } else if state.datasets.contains_key(&id) {
            Some(IndexError::Conflict(format!("dataset '{}'", id)))
        } else {
            None
        };
        if let Some(err) = failure {
            self.stats.failed_inserts.fetch_add(1, Ordering::Relaxed);
            return Err(err);
        }

        state.datasets.insert(
            id,
            StoredDataset {
                product_name: product_name.to_string(),
                document: document.clone(),
                source_uri: source_uri.to_string(),
            },
        );
        self.stats.dataset_inserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
