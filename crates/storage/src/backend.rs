//! The index seam the reconciliation engine talks to.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::IndexResult;

/// Minimal operations of a spatio-temporal product/dataset index.
///
/// Each insert is atomic on its own: a failed `add_dataset` leaves every
/// previously added dataset untouched.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Names of all registered products.
    async fn list_product_names(&self) -> IndexResult<Vec<String>>;

    async fn product_exists(&self, name: &str) -> IndexResult<bool> {
        Ok(self.list_product_names().await?.iter().any(|n| n == name))
    }

    /// Register a product definition document.
    async fn add_product(&self, name: &str, definition: &Value) -> IndexResult<()>;

    async fn dataset_exists(&self, id: Uuid) -> IndexResult<bool>;

    /// Register a dataset document under an already registered product.
    async fn add_dataset(
        &self,
        id: Uuid,
        product_name: &str,
        document: &Value,
        source_uri: &str,
    ) -> IndexResult<()>;
}
