//! Serialization of processed grids to geotagged raster files.

use crate::types::{FireError, FireResult, SarGrid};
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{DriverManager, Metadata};
use std::path::Path;

/// Default output driver
pub const DEFAULT_DRIVER: &str = "GTiff";

/// Rebuild a structured spatial reference from the carried CRS string,
/// accepting `EPSG:<code>` identifiers and WKT definitions.
fn parse_crs(definition: &str) -> gdal::errors::Result<SpatialRef> {
    if let Some(code) = definition
        .strip_prefix("EPSG:")
        .and_then(|c| c.trim().parse::<u32>().ok())
    {
        return SpatialRef::from_epsg(code);
    }
    SpatialRef::from_wkt(definition)
}

/// Write a grid as a single-band GeoTIFF
pub fn write_geotiff<P: AsRef<Path>>(grid: &SarGrid, output_path: P) -> FireResult<()> {
    write_raster(grid, output_path, DEFAULT_DRIVER)
}

/// Write a grid as a single-band raster with the given GDAL driver.
///
/// Parent directories are created as needed. The carried CRS string is
/// parsed back into a structured reference; when parsing fails the raster is
/// written without a CRS and the degradation is logged rather than treated
/// as fatal. Every scalar provenance entry lands as a string tag on the
/// output file. Driver failures propagate as [`FireError::Gdal`].
pub fn write_raster<P: AsRef<Path>>(
    grid: &SarGrid,
    output_path: P,
    driver_name: &str,
) -> FireResult<()> {
    let output_path = output_path.as_ref();
    let (height, width) = grid.shape();

    // A zero-size grid is a valid pipeline value (an empty crop) but not a
    // writable raster; reject it before the driver produces something worse.
    if grid.is_empty() {
        return Err(FireError::InvalidFormat(format!(
            "cannot write empty {}x{} grid to {}",
            height,
            width,
            output_path.display()
        )));
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    log::info!("writing {}x{} grid to {}", height, width, output_path.display());

    let driver = DriverManager::get_driver_by_name(driver_name)?;
    let mut dataset =
        driver.create_with_band_type::<f32, _>(output_path, width as isize, height as isize, 1)?;

    dataset.set_geo_transform(&grid.geo_transform.to_gdal())?;

    if let Some(ref crs) = grid.crs {
        match parse_crs(crs) {
            Ok(spatial_ref) => dataset.set_spatial_ref(&spatial_ref)?,
            Err(e) => {
                log::warn!("could not parse CRS '{}', writing without CRS: {}", crs, e);
            }
        }
    }

    {
        let mut band = dataset.rasterband(1)?;
        let flat: Vec<f32> = grid.data.iter().cloned().collect();
        let buffer = Buffer::new((width, height), flat);
        band.write((0, 0), (width, height), &buffer)?;
        if let Some(nodata) = grid.nodata {
            band.set_no_data_value(Some(nodata))?;
        }
    }

    for (key, value) in grid.provenance.to_tags() {
        dataset.set_metadata_item(&key, &value, "")?;
    }

    log::info!("saved {}", output_path.display());
    Ok(())
}
