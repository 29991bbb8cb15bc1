//! Band/measurement definitions and the ordered measurement registry.

use serde::{Serialize, Serializer};

/// Nodata sentinel of a measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Nodata {
    Int(i64),
    Float(f64),
    /// Written as the string `NaN`, which the index parses as a float NaN.
    NaN,
}

impl Serialize for Nodata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Nodata::Int(v) => serializer.serialize_i64(*v),
            Nodata::Float(v) => serializer.serialize_f64(*v),
            Nodata::NaN => serializer.serialize_str("NaN"),
        }
    }
}

/// One named data channel of a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub dtype: String,
    pub units: String,
    pub nodata: Nodata,
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_offset: Option<f64>,
    /// Variable name inside the file when it differs from the measurement name.
    #[serde(skip)]
    pub layer: Option<String>,
}

impl Measurement {
    pub fn new(dtype: &str, units: &str, nodata: Nodata) -> Self {
        Self {
            dtype: dtype.to_string(),
            units: units.to_string(),
            nodata,
            aliases: Vec::new(),
            scale_factor: None,
            add_offset: None,
            layer: None,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_scaling(mut self, scale_factor: f64, add_offset: f64) -> Self {
        self.scale_factor = Some(scale_factor);
        self.add_offset = Some(add_offset);
        self
    }

    pub fn with_layer(mut self, layer: &str) -> Self {
        self.layer = Some(layer.to_string());
        self
    }
}

/// Insertion-ordered mapping from measurement name to definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementRegistry {
    entries: Vec<(String, Measurement)>,
}

impl MeasurementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a measurement. Re-inserting a name replaces it in place.
    pub fn insert(&mut self, name: impl Into<String>, measurement: Measurement) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = measurement,
            None => self.entries.push((name, measurement)),
        }
    }

    pub fn with(mut self, name: &str, measurement: Measurement) -> Self {
        self.insert(name, measurement);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Measurement> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Measurement)> {
        self.entries.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Measurement)> for MeasurementRegistry {
    fn from_iter<I: IntoIterator<Item = (String, Measurement)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (name, measurement) in iter {
            registry.insert(name, measurement);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keeps_insertion_order() {
        let registry = MeasurementRegistry::new()
            .with("red", Measurement::new("uint16", "1", Nodata::Float(0.0)))
            .with("blue", Measurement::new("uint16", "1", Nodata::Float(0.0)))
            .with("green", Measurement::new("uint16", "1", Nodata::Float(0.0)));

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["red", "blue", "green"]);
    }

    #[test]
    fn test_reinsert_replaces_in_place() {
        let mut registry = MeasurementRegistry::new()
            .with("a", Measurement::new("int16", "m", Nodata::Int(-1)))
            .with("b", Measurement::new("int16", "m", Nodata::Int(-1)));
        registry.insert("a", Measurement::new("float32", "m", Nodata::NaN));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().next(), Some("a"));
        assert_eq!(registry.get("a").map(|m| m.dtype.as_str()), Some("float32"));
    }

    #[test]
    fn test_nodata_serialization() {
        assert_eq!(serde_json::to_value(Nodata::NaN).unwrap(), "NaN");
        assert_eq!(serde_json::to_value(Nodata::Int(-32767)).unwrap(), -32767);
        assert_eq!(serde_json::to_value(Nodata::Float(0.0)).unwrap(), 0.0);
    }
}
