//! eo3 document layout of product and dataset descriptors.
//!
//! Documents are assembled as ordered YAML mappings so the sidecar files are
//! byte-identical across runs. The JSON form submitted to the index is the
//! same tree.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_yaml::{Mapping, Value};

use crate::dataset::{BandLocation, DatasetDescriptor};
use crate::error::Result;
use crate::product::ProductDescriptor;

pub const DATASET_SCHEMA: &str = "https://schemas.opendatacube.org/dataset";
pub const METADATA_TYPE: &str = "eo3";

fn datetime_value(dt: &DateTime<Utc>) -> Value {
    Value::from(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn entry(map: &mut Mapping, key: &str, value: impl Into<Value>) {
    map.insert(Value::from(key), value.into());
}

fn optional_string(value: Option<&str>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

impl ProductDescriptor {
    /// Product document: `metadata_type`, `name`, `description`, `metadata`,
    /// `measurements` (a list, each item carrying its `name`).
    pub fn to_document(&self) -> Result<Value> {
        let mut measurements = Vec::with_capacity(self.measurements().len());
        for (name, measurement) in self.measurements().iter() {
            let mut item = Mapping::new();
            entry(&mut item, "name", name);
            if let Value::Mapping(fields) = serde_yaml::to_value(measurement)? {
                item.extend(fields);
            }
            measurements.push(Value::Mapping(item));
        }

        let mut doc = Mapping::new();
        entry(&mut doc, "metadata_type", METADATA_TYPE);
        entry(&mut doc, "name", self.name());
        entry(&mut doc, "description", self.description());
        entry(&mut doc, "metadata", self.metadata().as_mapping().clone());
        entry(&mut doc, "measurements", Value::Sequence(measurements));
        Ok(Value::Mapping(doc))
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_document()?)?)
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_document()?)?)
    }
}

impl DatasetDescriptor {
    /// Dataset document. The product's metadata document is merged in as
    /// top-level keys after `lineage`.
    pub fn to_document(&self) -> Result<Value> {
        let ring: Vec<Value> = self
            .geometry()
            .vertices()
            .iter()
            .map(|[x, y]| Value::Sequence(vec![Value::from(*x), Value::from(*y)]))
            .collect();
        let mut geometry = Mapping::new();
        entry(&mut geometry, "type", "Polygon");
        entry(&mut geometry, "coordinates", Value::Sequence(vec![Value::Sequence(ring)]));

        let (rows, cols) = self.grid().shape;
        let mut default_grid = Mapping::new();
        entry(&mut default_grid, "shape", vec![rows as u64, cols as u64]);
        entry(&mut default_grid, "transform", self.grid().transform.to_vec());
        let mut grids = Mapping::new();
        entry(&mut grids, "default", default_grid);

        let mut measurements = Mapping::new();
        for binding in self.bands() {
            let mut band = Mapping::new();
            entry(&mut band, "path", binding.path.as_str());
            match &binding.location {
                BandLocation::Index(index) => entry(&mut band, "band", *index),
                BandLocation::Layer(layer) => entry(&mut band, "layer", layer.as_str()),
            }
            entry(&mut measurements, &binding.measurement, band);
        }

        let mut properties = Mapping::new();
        entry(&mut properties, "eo:platform", optional_string(self.platform()));
        entry(&mut properties, "eo:instrument", optional_string(self.instrument()));
        entry(&mut properties, "datetime", datetime_value(&self.temporal().acquired));
        entry(
            &mut properties,
            "odc:processing_datetime",
            datetime_value(&self.temporal().processed),
        );
        entry(&mut properties, "odc:file_format", self.file_format().to_string());

        let mut doc = Mapping::new();
        entry(&mut doc, "$schema", DATASET_SCHEMA);
        entry(&mut doc, "id", self.id().to_string());
        entry(&mut doc, "crs", self.crs());
        entry(&mut doc, "geometry", geometry);
        entry(&mut doc, "grids", grids);
        entry(&mut doc, "measurements", measurements);
        entry(&mut doc, "properties", properties);
        entry(&mut doc, "lineage", self.lineage().clone());
        doc.extend(self.metadata().as_mapping().clone());
        Ok(Value::Mapping(doc))
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_document()?)?)
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_document()?)?)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;

    use super::*;
    use crate::builder::{build_dataset_document, build_product_document};
    use crate::dataset::{BandSpec, DatasetFacts, FileFormat, Temporal};
    use crate::geometry::AffineTransform;
    use crate::measurement::{Measurement, MeasurementRegistry, Nodata};
    use crate::product::{MetadataDocument, ProductDraft};

    fn waves() -> ProductDescriptor {
        build_product_document(
            "waves",
            ProductDraft {
                name: "waves".to_string(),
                description: "wave product".to_string(),
                measurements: MeasurementRegistry::new()
                    .with(
                        "VHM0",
                        Measurement::new("int16", "m", Nodata::Int(-32767))
                            .with_aliases(&["sea_surface_wave_significant_height"])
                            .with_scaling(0.01, 0.0),
                    )
                    .with("depth", Measurement::new("float32", "m", Nodata::NaN)),
                metadata: MetadataDocument::for_product("waves"),
            },
        )
        .unwrap()
    }

    fn waves_dataset(product: &ProductDescriptor) -> DatasetDescriptor {
        let transform = AffineTransform::north_up(-10.0, 60.0, 0.5, 0.5);
        build_dataset_document(
            product,
            DatasetFacts {
                path: PathBuf::from("/odc/data/waves/waves_2023-01-01.nc"),
                crs: "EPSG:4326".to_string(),
                footprint: transform.bounds(20, 40).footprint().into_vertices(),
                shape: (20, 40),
                transform,
                bands: vec![
                    ("VHM0".to_string(), BandSpec::layer("VHM0")),
                    ("depth".to_string(), BandSpec::layer("deptho")),
                ],
                platform: Some("na".to_string()),
                instrument: Some("na".to_string()),
                temporal: Temporal {
                    acquired: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
                    processed: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
                },
                file_format: FileFormat::NetCDF,
                lineage: Mapping::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_product_document_layout() {
        let json = waves().to_json().unwrap();
        assert_eq!(json["metadata_type"], "eo3");
        assert_eq!(json["name"], "waves");
        assert_eq!(json["metadata"]["product"]["name"], "waves");

        let vhm0 = &json["measurements"][0];
        assert_eq!(vhm0["name"], "VHM0");
        assert_eq!(vhm0["nodata"], -32767);
        assert_eq!(vhm0["scale_factor"], 0.01);
        assert_eq!(vhm0["add_offset"], 0.0);

        let depth = &json["measurements"][1];
        assert_eq!(depth["nodata"], "NaN");
        assert!(depth.get("scale_factor").is_none());
    }

    #[test]
    fn test_dataset_document_layout() {
        let product = waves();
        let json = waves_dataset(&product).to_json().unwrap();

        assert_eq!(json["$schema"], DATASET_SCHEMA);
        assert_eq!(json["id"], "0cd0492a-4282-5dad-9bfe-61c89da3665a");
        assert_eq!(json["crs"], "EPSG:4326");
        assert_eq!(json["geometry"]["type"], "Polygon");
        assert_eq!(json["geometry"]["coordinates"][0][0][0], -10.0);
        assert_eq!(json["geometry"]["coordinates"][0][0][1], 50.0);
        assert_eq!(json["grids"]["default"]["shape"][0], 20);
        assert_eq!(json["grids"]["default"]["shape"][1], 40);
        assert_eq!(json["grids"]["default"]["transform"][8], 1.0);
        assert_eq!(json["measurements"]["depth"]["layer"], "deptho");
        assert!(json["measurements"]["depth"].get("band").is_none());
        assert_eq!(json["properties"]["datetime"], "2023-01-01T00:00:00.000Z");
        assert_eq!(json["properties"]["odc:file_format"], "NetCDF");
        assert_eq!(json["lineage"], serde_json::json!({}));
        assert_eq!(json["product"]["name"], "waves");
    }

    #[test]
    fn test_dataset_yaml_is_deterministic() {
        let product = waves();
        let first = waves_dataset(&product).to_yaml().unwrap();
        let second = waves_dataset(&product).to_yaml().unwrap();
        assert_eq!(first, second);
        assert!(first.contains(DATASET_SCHEMA));
    }
}
