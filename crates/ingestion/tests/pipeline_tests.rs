//! Whole import passes driven by environment-style configuration.

mod common;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use common::write_anthroprotect;
use eo3_metadata::dataset_id;
use ingestion::{ImporterConfig, Importer, IngestionError};
use storage::MemoryIndex;
use test_utils::{temp_test_dir, NetCdfGridFixture};

fn config(base: &Path, vars: &[(&str, &str)]) -> ImporterConfig {
    let mut map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.insert("BASE_FOLDER".to_string(), base.display().to_string());
    ImporterConfig::from_lookup(|key| map.get(key).cloned()).unwrap()
}

fn write_waves(data_root: &Path, days: &[u32]) {
    let folder = data_root.join("waves");
    std::fs::create_dir_all(&folder).unwrap();
    for day in days {
        NetCdfGridFixture::default()
            .with_variables(&["VHM0", "VTPK", "VMDR"])
            .with_time(vec![0.0], &format!("hours since 2023-01-{:02} 00:00:00", day))
            .write(&folder.join(format!("waves_2023-01-{:02}.nc", day)));
    }
}

#[tokio::test]
async fn test_run_once_imports_available_sources() {
    let base = temp_test_dir();
    let data_root = base.path().join("data");
    write_waves(&data_root, &[1, 2]);
    let cfg = config(
        base.path(),
        &[("CMEMS_WAVES_ENABLED", "true"), ("CMEMS_PHYSICS_ENABLED", "true")],
    );
    let index = Arc::new(MemoryIndex::new());

    let importer = Importer::new(&cfg, index.clone()).unwrap();
    assert_eq!(importer.source_ids(), vec!["cmems_physics", "cmems_waves"]);

    let reports = importer.run_once().await.unwrap();

    // physics has no folder and is skipped
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].source, "cmems_waves");
    assert_eq!(reports[0].products_added, 1);
    assert_eq!(reports[0].datasets_added, 2);
    assert!(data_root.join("waves/waves.product-metadata.yaml").is_file());

    let second = data_root.join("waves/waves_2023-01-02.nc");
    let stored = index.dataset(dataset_id(&second)).await.unwrap();
    assert_eq!(stored.product_name, "waves");
    assert_eq!(
        stored.document["properties"]["datetime"],
        "2023-01-02T00:00:00.000Z"
    );
    assert_eq!(stored.document["measurements"]["VMDR"]["layer"], "VMDR");
}

#[tokio::test]
async fn test_rerun_only_adds_new_files() {
    let base = temp_test_dir();
    let data_root = base.path().join("data");
    write_waves(&data_root, &[1]);
    let cfg = config(base.path(), &[("CMEMS_WAVES_ENABLED", "true")]);
    let index = Arc::new(MemoryIndex::new());
    let importer = Importer::new(&cfg, index.clone()).unwrap();

    importer.run_once().await.unwrap();
    write_waves(&data_root, &[2]);
    let reports = importer.run_once().await.unwrap();

    assert_eq!(reports[0].products_present, 1);
    assert_eq!(reports[0].datasets_present, 1);
    assert_eq!(reports[0].datasets_added, 1);
    assert_eq!(index.dataset_inserts(), 2);
}

#[tokio::test]
async fn test_broken_source_does_not_stop_later_sources() {
    let base = temp_test_dir();
    let data_root = base.path().join("data");
    let anthroprotect = write_anthroprotect(&data_root, &["a.tif"], &[]);
    std::fs::remove_dir_all(anthroprotect.join("tiles/lcs")).unwrap();
    write_waves(&data_root, &[1]);
    let cfg = config(
        base.path(),
        &[("ANTHROPROTECT_ENABLED", "true"), ("CMEMS_WAVES_ENABLED", "true")],
    );
    let index = Arc::new(MemoryIndex::new());

    let reports = Importer::new(&cfg, index.clone())
        .unwrap()
        .run_once()
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].source, "cmems_waves");
    assert!(index.product("s2").await.is_none());
}

#[tokio::test]
async fn test_fatal_error_aborts_the_run() {
    let base = temp_test_dir();
    let data_root = base.path().join("data");
    let anthroprotect = write_anthroprotect(&data_root, &["a.tif", "b.tif"], &[]);
    std::fs::remove_file(anthroprotect.join("tiles/s2_scl/a.tif")).unwrap();
    write_waves(&data_root, &[1]);
    let cfg = config(
        base.path(),
        &[("ANTHROPROTECT_ENABLED", "true"), ("CMEMS_WAVES_ENABLED", "true")],
    );
    let index = Arc::new(MemoryIndex::new());

    let err = Importer::new(&cfg, index.clone())
        .unwrap()
        .run_once()
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::FolderMismatch { .. }));
    assert!(index.product("waves").await.is_none());
}

#[tokio::test]
async fn test_invalid_product_names_rejected_at_build() {
    let base = temp_test_dir();
    let mut map = HashMap::new();
    map.insert("BASE_FOLDER".to_string(), base.path().display().to_string());
    map.insert("ANTHROPROTECT_ENABLED".to_string(), "true".to_string());
    map.insert("ANTHROPROTECT_PRODUCT_NAMES".to_string(), "s2 lcs".to_string());

    let err = ImporterConfig::from_lookup(|key| map.get(key).cloned()).unwrap_err();
    assert!(err.is_fatal());
}
