//! Reconciliation against an in-memory index.

mod common;

use std::sync::Arc;

use common::{file_names, write_anthroprotect, LogCapture, StubAdapter};
use eo3_metadata::{dataset_id, dataset_sidecar_path, product_sidecar_path};
use ingestion::{adapter_for, Fetcher, IngestionError, Reconciler, SourceConfig, SourceKind};
use storage::MemoryIndex;
use test_utils::{temp_test_dir, touch_files, GeoTiffFixture};

fn anthroprotect() -> Box<dyn ingestion::SourceAdapter> {
    adapter_for(
        &SourceConfig::defaults(SourceKind::Anthroprotect),
        &Fetcher::new().unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_anthroprotect_map_includes_investigative_tiles() {
    let dir = temp_test_dir();
    write_anthroprotect(dir.path(), &["a.tif", "b.tif"], &["c.tif"]);

    let map = anthroprotect().build_product_dataset_map(dir.path()).unwrap();

    assert_eq!(file_names(map.get("s2").unwrap()), vec!["a.tif", "b.tif", "c.tif"]);
    assert_eq!(file_names(map.get("s2_scl").unwrap()), vec!["a.tif", "b.tif"]);
    assert_eq!(file_names(map.get("lcs").unwrap()), vec!["a.tif", "b.tif"]);
    assert!(map.get("s2").unwrap()[2].ends_with("investigative/c.tif"));
}

#[tokio::test]
async fn test_anthroprotect_first_run_registers_everything() {
    let dir = temp_test_dir();
    let source = write_anthroprotect(dir.path(), &["a.tif", "b.tif"], &["c.tif"]);
    let index = Arc::new(MemoryIndex::new());
    let reconciler = Reconciler::new(index.clone());

    let report = reconciler
        .reconcile_source(anthroprotect().as_ref(), dir.path())
        .await
        .unwrap();

    assert_eq!(report.source, "anthroprotect");
    assert_eq!(report.products_added, 3);
    assert_eq!(report.datasets_added, 7);
    assert_eq!(report.datasets_failed, 0);
    assert_eq!(index.dataset_count().await, 7);

    for product in ["s2", "s2_scl", "lcs"] {
        assert!(product_sidecar_path(&source, product).is_file());
    }

    let extra = source.join("investigative/c.tif");
    assert!(dataset_sidecar_path(&extra).is_file());
    let stored = index.dataset(dataset_id(&extra)).await.unwrap();
    assert_eq!(stored.product_name, "s2");
    assert_eq!(
        stored.source_uri,
        format!("file://{}", dataset_sidecar_path(&extra).display())
    );
}

#[tokio::test]
async fn test_dataset_documents_carry_product_metadata() {
    let dir = temp_test_dir();
    let source = write_anthroprotect(dir.path(), &["a.tif"], &[]);
    let index = Arc::new(MemoryIndex::new());

    Reconciler::new(index.clone())
        .reconcile_source(anthroprotect().as_ref(), dir.path())
        .await
        .unwrap();

    let product = index.product("lcs").await.unwrap();
    let tile = source.join("tiles/lcs/a.tif");
    let doc = index.dataset(dataset_id(&tile)).await.unwrap().document;

    assert_eq!(doc["product"]["name"], "lcs");
    assert_eq!(doc["keywords"], product["metadata"]["keywords"]);
    assert_eq!(doc["links"], product["metadata"]["links"]);
    assert_eq!(doc["crs"], "EPSG:32633");
    assert_eq!(doc["grids"]["default"]["shape"], serde_json::json!([16, 16]));
    assert_eq!(doc["properties"]["odc:file_format"], "GeoTIFF");
    assert_eq!(doc["measurements"]["corine"]["band"], 1);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let dir = temp_test_dir();
    let source = write_anthroprotect(dir.path(), &["a.tif", "b.tif"], &["c.tif"]);
    let index = Arc::new(MemoryIndex::new());
    let reconciler = Reconciler::new(index.clone());
    let adapter = anthroprotect();

    reconciler.reconcile_source(adapter.as_ref(), dir.path()).await.unwrap();
    let product_sidecar = std::fs::read(product_sidecar_path(&source, "s2")).unwrap();
    let tile_sidecar = dataset_sidecar_path(&source.join("tiles/s2/a.tif"));
    let dataset_sidecar = std::fs::read(&tile_sidecar).unwrap();

    let report = reconciler
        .reconcile_source(adapter.as_ref(), dir.path())
        .await
        .unwrap();

    assert_eq!(report.products_added, 0);
    assert_eq!(report.products_present, 3);
    assert_eq!(report.datasets_added, 0);
    assert_eq!(report.datasets_present, 7);
    assert_eq!(index.product_inserts(), 3);
    assert_eq!(index.dataset_inserts(), 7);
    assert_eq!(
        std::fs::read(product_sidecar_path(&source, "s2")).unwrap(),
        product_sidecar
    );
    assert_eq!(std::fs::read(&tile_sidecar).unwrap(), dataset_sidecar);
}

#[tokio::test]
async fn test_existing_product_sidecar_is_kept() {
    let dir = temp_test_dir();
    let source = write_anthroprotect(dir.path(), &["a.tif"], &[]);
    let custom = "name: s2\ncurated: true\n";
    std::fs::write(product_sidecar_path(&source, "s2"), custom).unwrap();
    let index = Arc::new(MemoryIndex::new());

    let report = Reconciler::new(index.clone())
        .reconcile_source(anthroprotect().as_ref(), dir.path())
        .await
        .unwrap();

    assert_eq!(report.products_added, 3);
    assert_eq!(
        std::fs::read_to_string(product_sidecar_path(&source, "s2")).unwrap(),
        custom
    );
    assert!(index.product("s2").await.is_some());
}

#[tokio::test]
async fn test_tile_name_mismatch_is_fatal() {
    let dir = temp_test_dir();
    let source = write_anthroprotect(dir.path(), &["a.tif", "b.tif"], &[]);
    std::fs::remove_file(source.join("tiles/lcs/b.tif")).unwrap();
    let index = Arc::new(MemoryIndex::new());

    let err = Reconciler::new(index.clone())
        .reconcile_source(anthroprotect().as_ref(), dir.path())
        .await
        .unwrap_err();

    match &err {
        IngestionError::FolderMismatch { missing, extra, .. } => {
            assert_eq!(missing, &vec!["b.tif".to_string()]);
            assert!(extra.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_fatal());
    assert_eq!(index.product_inserts(), 0);
}

#[tokio::test]
async fn test_unreadable_tile_is_skipped() {
    let dir = temp_test_dir();
    let source = write_anthroprotect(dir.path(), &["a.tif", "b.tif"], &[]);
    GeoTiffFixture::default()
        .without_georeference()
        .write(&source.join("tiles/s2_scl/b.tif"));
    let index = Arc::new(MemoryIndex::new());

    let report = Reconciler::new(index.clone())
        .reconcile_source(anthroprotect().as_ref(), dir.path())
        .await
        .unwrap();

    assert_eq!(report.datasets_added, 5);
    assert_eq!(report.datasets_failed, 1);
    assert!(!dataset_sidecar_path(&source.join("tiles/s2_scl/b.tif")).exists());
}

#[tokio::test]
async fn test_vanished_file_does_not_stop_the_source() {
    let dir = temp_test_dir();
    let folder = dir.path().join("stub");
    let files = touch_files(&folder, &["1.nc", "2.nc", "3.nc", "4.nc", "5.nc"]);
    std::fs::remove_file(&files[2]).unwrap();
    let index = Arc::new(MemoryIndex::new());

    let report = Reconciler::new(index.clone())
        .reconcile_source(&StubAdapter::new("stub", "grid", files.clone()), dir.path())
        .await
        .unwrap();

    assert_eq!(report.datasets_added, 4);
    assert_eq!(report.datasets_missing, 1);
    assert_eq!(index.dataset_count().await, 4);
    assert!(index.dataset(dataset_id(&files[4])).await.is_some());
}

#[tokio::test]
async fn test_rejected_dataset_is_counted_and_skipped() {
    let dir = temp_test_dir();
    let files = touch_files(&dir.path().join("stub"), &["1.nc", "2.nc", "3.nc"]);
    let index = Arc::new(MemoryIndex::new());
    index.reject_dataset(dataset_id(&files[1])).await;

    let report = Reconciler::new(index.clone())
        .reconcile_source(&StubAdapter::new("stub", "grid", files.clone()), dir.path())
        .await
        .unwrap();

    assert_eq!(report.datasets_added, 2);
    assert_eq!(report.datasets_failed, 1);
    assert!(index.dataset(dataset_id(&files[2])).await.is_some());
}

#[tokio::test]
async fn test_product_without_datasets_is_still_registered() {
    let dir = temp_test_dir();
    let files = touch_files(&dir.path().join("stub"), &["1.nc"]);
    let mut adapter = StubAdapter::new("stub", "grid", files);
    adapter.products.push("empty".to_string());
    let index = Arc::new(MemoryIndex::new());

    let report = Reconciler::new(index.clone())
        .reconcile_source(&adapter, dir.path())
        .await
        .unwrap();

    assert_eq!(report.products_added, 2);
    assert_eq!(report.datasets_added, 1);
    assert!(index.product("empty").await.is_some());
}

#[tokio::test]
async fn test_one_warning_per_product_missing_from_map() {
    let dir = temp_test_dir();
    let files = touch_files(&dir.path().join("stub"), &["1.nc"]);
    let mut adapter = StubAdapter::new("stub", "grid", files);
    adapter.products.push("empty".to_string());
    adapter.products.push("unused".to_string());
    let index = Arc::new(MemoryIndex::new());

    let logs = LogCapture::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());
    let report = Reconciler::new(index)
        .reconcile_source(&adapter, dir.path())
        .await
        .unwrap();

    let warnings: Vec<_> = logs
        .lines()
        .into_iter()
        .filter(|l| l.contains("Product is missing in product-dataset map"))
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("product=empty"));
    assert!(warnings[1].contains("product=unused"));
    assert!(warnings.iter().all(|l| l.contains("WARN")));
    assert_eq!(report.products_added, 3);
}

#[tokio::test]
async fn test_embedded_name_mismatch_is_fatal() {
    let dir = temp_test_dir();
    let files = touch_files(&dir.path().join("stub"), &["1.nc"]);
    let mut adapter = StubAdapter::new("stub", "grid", files);
    adapter.embedded_name = Some("other".to_string());
    let index = Arc::new(MemoryIndex::new());

    let err = Reconciler::new(index.clone())
        .reconcile_source(&adapter, dir.path())
        .await
        .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(index.product_inserts(), 0);
    assert_eq!(index.dataset_count().await, 0);
}
