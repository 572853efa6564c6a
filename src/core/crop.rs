//! Spatial cropping in the grid's own coordinate space.
//!
//! Rasters coming out of the SAFE extractor carry a product-local affine
//! frame, not verified geographic alignment, so the vector-boundary entry
//! point deliberately does not slice: it records the boundary's bounding box
//! as provenance and leaves the pixels alone. Callers that can supply
//! pixel-equivalent bounds get a real crop from [`crop_to_bounds`]. One
//! policy, applied unconditionally; `cropped` provenance is set only when a
//! crop actually resized the grid.

use crate::io::boundary::FireBoundary;
use crate::types::{BoundingBox, FireResult, SarGrid};
use ndarray::s;
use std::path::Path;

/// Contiguous index range of `coords` whose values fall inside `[lo, hi]`.
/// Works for ascending and descending coordinate vectors; the result may be
/// empty (`start == end`).
fn select_range(coords: &[f64], lo: f64, hi: f64) -> (usize, usize) {
    let mut start = None;
    let mut end = 0;
    for (idx, &c) in coords.iter().enumerate() {
        if c >= lo && c <= hi {
            if start.is_none() {
                start = Some(idx);
            }
            end = idx + 1;
        }
    }
    match start {
        Some(s) => (s, end),
        None => (0, 0),
    }
}

/// Crop the grid to `bounds`, given in the grid's coordinate units.
///
/// Columns keep `min_x <= x <= max_x`. Rows conventionally run top-down
/// (y decreases as the row index grows), so the row selection slices from
/// `max_y` down to `min_y`; both axis directions are handled. Coordinate
/// vectors are re-sliced in lock-step with the samples and the translation
/// terms of the affine transform are recomputed for the new origin.
///
/// An empty selection yields a valid zero-size grid, not an error.
pub fn crop_to_bounds(grid: &SarGrid, bounds: &BoundingBox) -> SarGrid {
    let (col_start, col_end) = select_range(&grid.x_coords, bounds.min_x, bounds.max_x);
    let (row_start, row_end) = select_range(&grid.y_coords, bounds.min_y, bounds.max_y);

    let data = grid
        .data
        .slice(s![row_start..row_end, col_start..col_end])
        .to_owned();

    let mut geo_transform = grid.geo_transform;
    geo_transform.top_left_x = grid.geo_transform.x_coord(col_start);
    geo_transform.top_left_y = grid.geo_transform.y_coord(row_start);

    let mut out = SarGrid {
        data,
        x_coords: grid.x_coords[col_start..col_end].to_vec(),
        y_coords: grid.y_coords[row_start..row_end].to_vec(),
        geo_transform,
        crs: grid.crs.clone(),
        nodata: grid.nodata,
        provenance: grid.provenance.clone(),
    };
    out.provenance.cropped = true;
    out
}

/// Annotate the grid with the combined bounding box of a vector boundary
/// file.
///
/// No pixels are touched and `cropped` stays unset: boundary coordinates are
/// geographic while the grid frame generally is not, so slicing here would
/// silently cut the wrong region. The recorded `geojson_bounds` provenance
/// lets downstream consumers perform the pixel-space crop once they have
/// registered the two frames.
pub fn clip_to_boundary<P: AsRef<Path>>(grid: &SarGrid, boundary_path: P) -> FireResult<SarGrid> {
    let boundary = FireBoundary::from_file(boundary_path)?;
    let mut out = grid.clone();
    out.provenance.geojson_bounds = Some(boundary.total_bounds());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoTransform;
    use ndarray::Array2;
    use std::io::Write;

    fn test_grid() -> SarGrid {
        // 6x8 grid, x = 0..7, y = 10 down to 5
        let data = Array2::from_shape_fn((6, 8), |(i, j)| (i * 8 + j) as f32);
        SarGrid::from_transform(
            data,
            GeoTransform::north_up(0.0, 1.0, 10.0, -1.0),
            Some("EPSG:4326".to_string()),
            None,
        )
    }

    #[test]
    fn test_crop_strictly_interior_bounds() {
        let grid = test_grid();
        let bounds = BoundingBox::new(2.0, 6.0, 5.0, 9.0);
        let cropped = crop_to_bounds(&grid, &bounds);

        let (height, width) = cropped.shape();
        assert!(height < grid.shape().0);
        assert!(width < grid.shape().1);
        assert_eq!((height, width), (4, 4));

        for &x in &cropped.x_coords {
            assert!(x >= bounds.min_x && x <= bounds.max_x);
        }
        for &y in &cropped.y_coords {
            assert!(y >= bounds.min_y && y <= bounds.max_y);
        }
        assert_eq!(cropped.x_coords.len(), width);
        assert_eq!(cropped.y_coords.len(), height);
        assert!(cropped.provenance.cropped);
    }

    #[test]
    fn test_crop_recomputes_transform_origin() {
        let grid = test_grid();
        let cropped = crop_to_bounds(&grid, &BoundingBox::new(3.0, 5.0, 7.0, 8.0));

        // First kept column is x=3, first kept row is y=8
        assert_eq!(cropped.geo_transform.top_left_x, 3.0);
        assert_eq!(cropped.geo_transform.top_left_y, 8.0);
        // Scale terms untouched
        assert_eq!(cropped.geo_transform.pixel_width, 1.0);
        assert_eq!(cropped.geo_transform.pixel_height, -1.0);
        // Samples moved in lock-step: first sample is row y=8 (i=2), col x=3
        assert_eq!(cropped.data[[0, 0]], (2 * 8 + 3) as f32);
    }

    #[test]
    fn test_crop_full_extent_is_identity_shape() {
        let grid = test_grid();
        let cropped = crop_to_bounds(&grid, &BoundingBox::new(0.0, 5.0, 7.0, 10.0));
        assert_eq!(cropped.shape(), grid.shape());
        assert_eq!(cropped.data, grid.data);
    }

    #[test]
    fn test_crop_disjoint_bounds_yields_empty_grid() {
        let grid = test_grid();
        let cropped = crop_to_bounds(&grid, &BoundingBox::new(100.0, 100.0, 200.0, 200.0));
        assert_eq!(cropped.shape(), (0, 0));
        assert!(cropped.x_coords.is_empty());
        assert!(cropped.y_coords.is_empty());
    }

    #[test]
    fn test_crop_does_not_touch_units_or_crs() {
        let mut grid = test_grid();
        grid.provenance.units = Some(crate::types::Units::Db);
        let cropped = crop_to_bounds(&grid, &BoundingBox::new(1.0, 6.0, 6.0, 9.0));
        assert_eq!(cropped.provenance.units, Some(crate::types::Units::Db));
        assert_eq!(cropped.crs.as_deref(), Some("EPSG:4326"));
    }

    #[test]
    fn test_clip_to_boundary_annotates_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fire.geojson");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{}},"geometry":{{"type":"Polygon","coordinates":[[[-120.5,38.0],[-120.0,38.0],[-120.0,38.6],[-120.5,38.6],[-120.5,38.0]]]}}}}]}}"#
        )
        .unwrap();

        let grid = test_grid();
        let clipped = clip_to_boundary(&grid, &path).unwrap();

        // Annotate-only policy: same shape, bounds recorded, cropped unset
        assert_eq!(clipped.shape(), grid.shape());
        assert!(!clipped.provenance.cropped);
        let bounds = clipped.provenance.geojson_bounds.unwrap();
        assert_eq!(bounds, BoundingBox::new(-120.5, 38.0, -120.0, 38.6));
    }

    #[test]
    fn test_clip_to_boundary_missing_file() {
        let grid = test_grid();
        let err = clip_to_boundary(&grid, "/no/such/fire.geojson").unwrap_err();
        assert!(matches!(err, crate::types::FireError::NotFound(_)));
    }
}
