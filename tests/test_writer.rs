//! GeoTIFF writer round-trips, checked by reading back through GDAL.

use gdal::Metadata;
use ndarray::Array2;
use postfire::{
    write_geotiff, CalibrationType, FireError, GeoTransform, Polarization, SarGrid,
    SpeckleFilterKind, Units,
};

fn processed_grid() -> SarGrid {
    let data = Array2::from_shape_fn((5, 6), |(i, j)| -(i as f32) - j as f32 / 10.0);
    let mut grid = SarGrid::from_transform(
        data,
        GeoTransform::north_up(500_000.0, 10.0, 5_000_000.0, -10.0),
        Some("EPSG:32610".to_string()),
        Some(0.0),
    );
    grid.provenance.polarization = Some(Polarization::VV);
    grid.provenance.calibration = Some(CalibrationType::Sigma0);
    grid.provenance.units = Some(Units::Db);
    grid.provenance.speckle_filter = Some(SpeckleFilterKind::Lee);
    grid.provenance.filter_window = Some(5);
    grid
}

#[test]
fn test_round_trip_shape_values_and_transform() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("processed_vv.tif");

    let grid = processed_grid();
    write_geotiff(&grid, &path).unwrap();
    assert!(path.exists());

    let dataset = gdal::Dataset::open(&path).unwrap();
    let (width, height) = dataset.raster_size();
    assert_eq!((height, width), grid.shape());
    assert_eq!(dataset.raster_count(), 1);

    let gt = dataset.geo_transform().unwrap();
    let expected = grid.geo_transform.to_gdal();
    for (a, b) in gt.iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-6);
    }

    let band = dataset.rasterband(1).unwrap();
    assert_eq!(band.no_data_value(), Some(0.0));
    let buffer = band
        .read_as::<f32>((0, 0), (width, height), (width, height), None)
        .unwrap();
    let restored = Array2::from_shape_vec((height, width), buffer.data).unwrap();
    assert_eq!(restored, grid.data);
}

#[test]
fn test_round_trip_crs_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crs.tif");
    write_geotiff(&processed_grid(), &path).unwrap();

    let dataset = gdal::Dataset::open(&path).unwrap();
    let projection = dataset.projection();
    assert!(projection.contains("32610"), "projection was: {}", projection);
}

#[test]
fn test_provenance_tags_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags.tif");
    write_geotiff(&processed_grid(), &path).unwrap();

    let dataset = gdal::Dataset::open(&path).unwrap();
    assert_eq!(
        dataset.metadata_item("polarization", "").as_deref(),
        Some("VV")
    );
    assert_eq!(
        dataset.metadata_item("calibration", "").as_deref(),
        Some("sigma0")
    );
    assert_eq!(dataset.metadata_item("units", "").as_deref(), Some("dB"));
    assert_eq!(
        dataset.metadata_item("speckle_filter", "").as_deref(),
        Some("lee")
    );
    assert_eq!(
        dataset.metadata_item("filter_window", "").as_deref(),
        Some("5")
    );
    // No crop happened, so the tag must be absent
    assert_eq!(dataset.metadata_item("cropped", ""), None);
}

#[test]
fn test_unparseable_crs_degrades_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nocrs.tif");

    let mut grid = processed_grid();
    grid.crs = Some("certainly not a CRS definition".to_string());
    write_geotiff(&grid, &path).unwrap();

    let dataset = gdal::Dataset::open(&path).unwrap();
    assert!(dataset.projection().is_empty());
}

#[test]
fn test_parent_directories_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a").join("b").join("deep.tif");
    write_geotiff(&processed_grid(), &path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_empty_grid_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.tif");

    let grid = SarGrid::from_transform(
        Array2::<f32>::zeros((0, 0)),
        GeoTransform::identity(),
        None,
        None,
    );
    let err = write_geotiff(&grid, &path).unwrap_err();
    assert!(matches!(err, FireError::InvalidFormat(_)));
    assert!(!path.exists());
}
