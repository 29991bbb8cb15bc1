//! Sidecar file naming.

use std::path::{Path, PathBuf};

pub const SIDECAR_EXTENSION: &str = "yaml";

/// `<folder>/<product>.product-metadata.yaml`
pub fn product_sidecar_path(folder: &Path, product_name: &str) -> PathBuf {
    folder.join(format!("{product_name}.product-metadata.{SIDECAR_EXTENSION}"))
}

/// `<file>.dataset-metadata.yaml` next to the dataset file. The full file
/// name (extension included) is kept so `a.tif` and `a.nc` never collide.
pub fn dataset_sidecar_path(file: &Path) -> PathBuf {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sidecar = format!("{name}.dataset-metadata.{SIDECAR_EXTENSION}");
    match file.parent() {
        Some(parent) => parent.join(sidecar),
        None => PathBuf::from(sidecar),
    }
}
