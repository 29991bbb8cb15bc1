//! Validating construction of product and dataset descriptors.

use std::collections::HashSet;

use crate::dataset::{BandBinding, BandLocation, BandSpec, DatasetDescriptor, DatasetFacts, Grid};
use crate::error::{MetadataError, Result};
use crate::geometry::Footprint;
use crate::identity::dataset_id;
use crate::product::{ProductDescriptor, ProductDraft};

/// Validate a product draft against the name it is registered under.
///
/// The declared name, the draft's own name and the `product.name` entry of
/// its metadata document must all agree.
pub fn build_product_document(declared_name: &str, draft: ProductDraft) -> Result<ProductDescriptor> {
    let embedded = draft
        .metadata
        .product_name()
        .ok_or_else(|| MetadataError::MissingProductName(declared_name.to_string()))?;

    if declared_name != draft.name || declared_name != embedded {
        return Err(MetadataError::ProductNameMismatch {
            declared: declared_name.to_string(),
            document: draft.name.clone(),
            embedded: embedded.to_string(),
        });
    }

    if draft.measurements.is_empty() {
        return Err(MetadataError::EmptyRegistry(draft.name));
    }

    Ok(ProductDescriptor {
        name: draft.name,
        description: draft.description,
        measurements: draft.measurements,
        metadata: draft.metadata,
    })
}

/// Turn raw file facts into a dataset descriptor of `product`.
pub fn build_dataset_document(
    product: &ProductDescriptor,
    facts: DatasetFacts,
) -> Result<DatasetDescriptor> {
    if facts.crs.trim().is_empty() {
        return Err(MetadataError::MissingField("crs"));
    }

    let (rows, cols) = facts.shape;
    if rows == 0 || cols == 0 {
        return Err(MetadataError::InvalidShape { rows, cols });
    }

    if facts.bands.is_empty() {
        return Err(MetadataError::MissingField("bands"));
    }

    let mut seen = HashSet::new();
    for (measurement, _) in &facts.bands {
        if !seen.insert(measurement.as_str()) {
            return Err(MetadataError::DuplicateMeasurement(measurement.clone()));
        }
    }

    let geometry = Footprint::from_ring(facts.footprint)?;
    let path = facts.path.to_string_lossy().into_owned();

    let bands = facts
        .bands
        .into_iter()
        .map(|(measurement, spec)| bind_band(product, measurement, spec, &path))
        .collect::<Result<Vec<_>>>()?;

    Ok(DatasetDescriptor {
        id: dataset_id(&facts.path),
        path: facts.path,
        product_name: product.name().to_string(),
        crs: facts.crs,
        geometry,
        grid: Grid {
            shape: facts.shape,
            transform: facts.transform.to_row_major(),
        },
        bands,
        platform: facts.platform,
        instrument: facts.instrument,
        temporal: facts.temporal,
        file_format: facts.file_format,
        lineage: facts.lineage,
        metadata: product.metadata().clone(),
    })
}

fn bind_band(
    product: &ProductDescriptor,
    measurement: String,
    spec: BandSpec,
    path: &str,
) -> Result<BandBinding> {
    if !product.measurements().contains(&measurement) {
        return Err(MetadataError::UnknownMeasurement {
            product: product.name().to_string(),
            measurement,
        });
    }

    let location = match (spec.band, spec.layer) {
        (Some(0), None) => {
            return Err(MetadataError::InvalidBandBinding {
                measurement,
                reason: "band index is 1-based".to_string(),
            })
        }
        (Some(index), None) => BandLocation::Index(index),
        (None, Some(layer)) => BandLocation::Layer(layer),
        (Some(_), Some(_)) => {
            return Err(MetadataError::InvalidBandBinding {
                measurement,
                reason: "both band index and layer given".to_string(),
            })
        }
        (None, None) => {
            return Err(MetadataError::InvalidBandBinding {
                measurement,
                reason: "neither band index nor layer given".to_string(),
            })
        }
    };

    Ok(BandBinding {
        measurement,
        path: path.to_string(),
        location,
    })
}
