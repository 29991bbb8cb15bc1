//! Product descriptors and the shared metadata document.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::measurement::MeasurementRegistry;

/// Free-form metadata map shared by a product and all of its datasets.
///
/// Always carries `product.name`; adapters add keywords, links and similar
/// entries that the index exposes to downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataDocument(Mapping);

impl MetadataDocument {
    /// Document containing only `product: {name: <name>}`.
    pub fn for_product(name: &str) -> Self {
        let mut product = Mapping::new();
        product.insert(Value::from("name"), Value::from(name));
        let mut map = Mapping::new();
        map.insert(Value::from("product"), Value::Mapping(product));
        Self(map)
    }

    /// Add or replace a top-level entry.
    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(Value::from(key), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The embedded `product.name`, if present and a string.
    pub fn product_name(&self) -> Option<&str> {
        self.0.get("product")?.get("name")?.as_str()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }
}

/// Raw product facts handed over by an adapter.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub measurements: MeasurementRegistry,
    pub metadata: MetadataDocument,
}

/// A validated product. Only the builder constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDescriptor {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) measurements: MeasurementRegistry,
    pub(crate) metadata: MetadataDocument,
}

impl ProductDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn measurements(&self) -> &MeasurementRegistry {
        &self.measurements
    }

    pub fn metadata(&self) -> &MetadataDocument {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_product_embeds_name() {
        let doc = MetadataDocument::for_product("s2");
        assert_eq!(doc.product_name(), Some("s2"));
    }

    #[test]
    fn test_with_value_keeps_product_name() {
        let doc = MetadataDocument::for_product("lcs")
            .with_value("keywords", vec!["AnthroProtect", "Land cover data"]);
        assert_eq!(doc.product_name(), Some("lcs"));
        assert!(doc.get("keywords").is_some_and(|v| v.is_sequence()));
    }

    #[test]
    fn test_missing_product_name() {
        let doc = MetadataDocument::default().with_value("keywords", "x");
        assert_eq!(doc.product_name(), None);
    }
}
