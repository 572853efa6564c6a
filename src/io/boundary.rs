//! Vector boundary files (GeoJSON).
//!
//! Fire perimeters arrive as GeoJSON feature collections. Only the combined
//! bounding box across all contained geometries is needed here, so the
//! parser walks every coordinate position instead of materializing typed
//! geometry objects.

use crate::types::{BoundingBox, FireError, FireResult};
use serde_json::Value;
use std::path::Path;

/// A parsed vector boundary: its total bounds and how many geometries it held
#[derive(Debug, Clone)]
pub struct FireBoundary {
    bounds: BoundingBox,
    geometry_count: usize,
}

impl FireBoundary {
    /// Read and parse a GeoJSON boundary file. Accepts a FeatureCollection,
    /// a single Feature or a bare geometry.
    pub fn from_file<P: AsRef<Path>>(path: P) -> FireResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FireError::NotFound(format!(
                "boundary file not found: {}",
                path.display()
            )));
        }

        let text = std::fs::read_to_string(path)?;
        let boundary = Self::from_geojson_str(&text)?;
        log::info!(
            "boundary {} covers {} ({} geometries)",
            path.display(),
            boundary.bounds,
            boundary.geometry_count
        );
        Ok(boundary)
    }

    /// Parse GeoJSON text into a boundary
    pub fn from_geojson_str(text: &str) -> FireResult<Self> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| FireError::InvalidFormat(format!("invalid GeoJSON: {}", e)))?;

        let mut geometries = Vec::new();
        collect_geometries(&root, &mut geometries);
        if geometries.is_empty() {
            return Err(FireError::InvalidFormat(
                "GeoJSON contains no geometries".to_string(),
            ));
        }

        let mut bounds: Option<BoundingBox> = None;
        for geometry in &geometries {
            walk_positions(geometry, &mut |x, y| {
                let point = BoundingBox::new(x, y, x, y);
                bounds = Some(match bounds {
                    Some(b) => b.union(&point),
                    None => point,
                });
            });
        }

        let bounds = bounds.ok_or_else(|| {
            FireError::InvalidFormat("GeoJSON geometries carry no coordinates".to_string())
        })?;

        Ok(Self {
            bounds,
            geometry_count: geometries.len(),
        })
    }

    /// Combined bounding box across all geometries
    pub fn total_bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn geometry_count(&self) -> usize {
        self.geometry_count
    }
}

/// Collect `coordinates` values of every geometry reachable from `value`
fn collect_geometries<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            if let Some(features) = value.get("features").and_then(Value::as_array) {
                for feature in features {
                    collect_geometries(feature, out);
                }
            }
        }
        Some("Feature") => {
            if let Some(geometry) = value.get("geometry") {
                collect_geometries(geometry, out);
            }
        }
        Some("GeometryCollection") => {
            if let Some(members) = value.get("geometries").and_then(Value::as_array) {
                for member in members {
                    collect_geometries(member, out);
                }
            }
        }
        Some(_) => {
            if let Some(coordinates) = value.get("coordinates") {
                out.push(coordinates);
            }
        }
        None => {}
    }
}

/// Visit every `[x, y, ...]` position in a (possibly nested) coordinates array
fn walk_positions(value: &Value, visit: &mut dyn FnMut(f64, f64)) {
    if let Some(items) = value.as_array() {
        match (
            items.first().and_then(Value::as_f64),
            items.get(1).and_then(Value::as_f64),
        ) {
            (Some(x), Some(y)) => visit(x, y),
            _ => {
                for item in items {
                    walk_positions(item, visit);
                }
            }
        }
    }
}
