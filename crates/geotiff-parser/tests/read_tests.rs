//! Header reading against GeoTIFF files written with the tiff encoder.

use geotiff_parser::{read_geotiff_info, GeoTiffError};
use test_utils::{temp_test_dir, GeoTiffFixture};

#[test]
fn test_read_projected_single_band() {
    let dir = temp_test_dir();
    let path = dir.path().join("anth_1.tif");
    GeoTiffFixture::default().write(&path);

    let info = read_geotiff_info(&path).unwrap();
    assert_eq!(info.width, 16);
    assert_eq!(info.height, 16);
    assert_eq!(info.band_count, 1);
    assert_eq!(info.crs, "EPSG:32633");
    assert_eq!(info.geotransform, [500000.0, 10.0, 0.0, 7000000.0, 0.0, -10.0]);
    assert_eq!(info.bounds(), (500000.0, 6999840.0, 500160.0, 7000000.0));
}

#[test]
fn test_read_multi_band() {
    let dir = temp_test_dir();
    let path = dir.path().join("lcs.tif");
    GeoTiffFixture::default().with_bands(4).write(&path);

    let info = read_geotiff_info(&path).unwrap();
    assert_eq!(info.band_count, 4);
}

#[test]
fn test_read_geographic() {
    let dir = temp_test_dir();
    let path = dir.path().join("geo.tif");
    GeoTiffFixture {
        epsg: 4326,
        geographic: true,
        origin: (10.0, 60.0),
        pixel_size: 0.25,
        ..GeoTiffFixture::default()
    }
    .write(&path);

    let info = read_geotiff_info(&path).unwrap();
    assert_eq!(info.crs, "EPSG:4326");
    assert_eq!(info.bounds(), (10.0, 56.0, 14.0, 60.0));
}

#[test]
fn test_plain_tiff_reports_missing_georeference() {
    let dir = temp_test_dir();
    let path = dir.path().join("plain.tif");
    GeoTiffFixture::default().without_georeference().write(&path);

    let err = read_geotiff_info(&path).unwrap_err();
    assert!(matches!(err, GeoTiffError::MissingGeoreference(_)));
}

#[test]
fn test_not_a_tiff() {
    let dir = temp_test_dir();
    let path = dir.path().join("broken.tif");
    std::fs::write(&path, b"this is not a tiff").unwrap();

    let err = read_geotiff_info(&path).unwrap_err();
    assert!(matches!(err, GeoTiffError::Tiff(_)));
}

#[test]
fn test_missing_file() {
    let dir = temp_test_dir();
    let err = read_geotiff_info(&dir.path().join("absent.tif")).unwrap_err();
    assert!(matches!(err, GeoTiffError::IoError(_)));
}
