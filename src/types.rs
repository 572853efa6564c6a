use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued backscatter sample
pub type SarReal = f32;

/// 2D real SAR data array (row x column)
pub type SarRealImage = Array2<SarReal>;

/// Polarization modes for Sentinel-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl Polarization {
    /// Lowercase token embedded in SAFE measurement file names (`-vv-`, `-vh-`, ...)
    pub fn token(&self) -> &'static str {
        match self {
            Polarization::VV => "vv",
            Polarization::VH => "vh",
            Polarization::HV => "hv",
            Polarization::HH => "hh",
        }
    }
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

impl std::str::FromStr for Polarization {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HV" => Ok(Polarization::HV),
            "HH" => Ok(Polarization::HH),
            _ => Err(FireError::Unsupported(format!("polarization: {}", s))),
        }
    }
}

/// Radiometric calibration conventions.
///
/// With the approximate power-law calibration used here the convention is
/// recorded in provenance but does not change the numeric transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationType {
    Sigma0,
    Gamma0,
    Beta0,
}

impl std::fmt::Display for CalibrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationType::Sigma0 => write!(f, "sigma0"),
            CalibrationType::Gamma0 => write!(f, "gamma0"),
            CalibrationType::Beta0 => write!(f, "beta0"),
        }
    }
}

impl std::str::FromStr for CalibrationType {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sigma0" => Ok(CalibrationType::Sigma0),
            "gamma0" => Ok(CalibrationType::Gamma0),
            "beta0" => Ok(CalibrationType::Beta0),
            _ => Err(FireError::Unsupported(format!("calibration type: {}", s))),
        }
    }
}

/// Radiometric unit of the grid samples.
///
/// Advances monotonically through the pipeline: unset after extraction,
/// `Linear` after calibration, `Db` after log-scale conversion. The speckle
/// filter and cropper never touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    Linear,
    Db,
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Units::Linear => write!(f, "linear"),
            Units::Db => write!(f, "dB"),
        }
    }
}

/// Available speckle filter kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeckleFilterKind {
    /// Adaptive minimum-mean-square-error filter
    Lee,
    /// Alias of `Lee`; edge-directional refinement is not implemented
    RefinedLee,
    /// Rank filter over the window
    Median,
}

impl std::fmt::Display for SpeckleFilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeckleFilterKind::Lee => write!(f, "lee"),
            SpeckleFilterKind::RefinedLee => write!(f, "refined_lee"),
            SpeckleFilterKind::Median => write!(f, "median"),
        }
    }
}

impl std::str::FromStr for SpeckleFilterKind {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lee" => Ok(SpeckleFilterKind::Lee),
            "refined_lee" => Ok(SpeckleFilterKind::RefinedLee),
            "median" => Ok(SpeckleFilterKind::Median),
            _ => Err(FireError::Unsupported(format!("filter kind: {}", s))),
        }
    }
}

/// Geospatial bounding box (grid coordinate units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Smallest box containing both `self` and `other`
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // west,south,east,north - the order catalog query strings expect
        write!(f, "{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Affine transformation from pixel indices to grid coordinates.
///
/// Field layout matches the GDAL geotransform convention:
/// `x = pixel_width * col + rotation_x * row + top_left_x`,
/// `y = rotation_y * col + pixel_height * row + top_left_y`.
/// Sentinel-1 products carry no rotation, so both rotation terms are zero
/// in practice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform with no rotation terms
    pub fn north_up(top_left_x: f64, pixel_width: f64, top_left_y: f64, pixel_height: f64) -> Self {
        Self {
            top_left_x,
            pixel_width,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height,
        }
    }

    /// Identity transform, used when a raster carries no georeferencing
    pub fn identity() -> Self {
        Self::north_up(0.0, 1.0, 0.0, 1.0)
    }

    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// X coordinate of column `col`
    pub fn x_coord(&self, col: usize) -> f64 {
        self.pixel_width * col as f64 + self.top_left_x
    }

    /// Y coordinate of row `row`
    pub fn y_coord(&self, row: usize) -> f64 {
        self.pixel_height * row as f64 + self.top_left_y
    }
}

/// Per-stage provenance carried by every grid.
///
/// Each pipeline stage fills exactly the fields it owns and leaves the rest
/// untouched, so the record only ever grows as the grid moves downstream.
/// The raster writer persists every scalar field as a string tag on the
/// output file; these fields are part of the output contract, not debug
/// information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Set by the extractor
    pub polarization: Option<Polarization>,
    /// SAFE product identifier, parsed from the archive file name
    pub product_id: Option<String>,
    /// Acquisition start time, when recoverable from the product name
    pub acquisition: Option<DateTime<Utc>>,
    /// Set by the calibrator
    pub calibration: Option<CalibrationType>,
    /// Unit state machine: `None` -> `Linear` -> `Db`
    pub units: Option<Units>,
    /// Set by the speckle filter
    pub speckle_filter: Option<SpeckleFilterKind>,
    pub filter_window: Option<usize>,
    /// True only when an actual crop resized the grid
    pub cropped: bool,
    /// Combined bounding box of a vector boundary file, recorded by the
    /// annotate-only clip
    pub geojson_bounds: Option<BoundingBox>,
}

impl Provenance {
    /// Scalar provenance entries as string pairs, ready to be written as
    /// raster tags. Unset fields are skipped; `cropped` is emitted only when
    /// a crop actually occurred.
    pub fn to_tags(&self) -> Vec<(String, String)> {
        let mut tags = Vec::new();
        if let Some(pol) = self.polarization {
            tags.push(("polarization".to_string(), pol.to_string()));
        }
        if let Some(ref id) = self.product_id {
            tags.push(("product_id".to_string(), id.clone()));
        }
        if let Some(ts) = self.acquisition {
            tags.push(("acquisition".to_string(), ts.to_rfc3339()));
        }
        if let Some(cal) = self.calibration {
            tags.push(("calibration".to_string(), cal.to_string()));
        }
        if let Some(units) = self.units {
            tags.push(("units".to_string(), units.to_string()));
        }
        if let Some(filter) = self.speckle_filter {
            tags.push(("speckle_filter".to_string(), filter.to_string()));
        }
        if let Some(window) = self.filter_window {
            tags.push(("filter_window".to_string(), window.to_string()));
        }
        if self.cropped {
            tags.push(("cropped".to_string(), "true".to_string()));
        }
        if let Some(ref bounds) = self.geojson_bounds {
            tags.push(("geojson_bounds".to_string(), bounds.to_string()));
        }
        tags
    }
}

/// A raster band labeled with spatial coordinates and provenance.
///
/// This is the value flowing through the whole pipeline: created by the
/// extractor, transformed stage by stage (each stage returns a new grid,
/// never mutating its input), consumed by the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct SarGrid {
    /// Samples, row-major `(height, width)`
    pub data: SarRealImage,
    /// X coordinate of each column, length `width`
    pub x_coords: Vec<f64>,
    /// Y coordinate of each row, length `height`
    pub y_coords: Vec<f64>,
    pub geo_transform: GeoTransform,
    /// Opaque CRS string; re-parsed only at write time
    pub crs: Option<String>,
    pub nodata: Option<f64>,
    pub provenance: Provenance,
}

impl SarGrid {
    /// Build a grid from samples and an affine transform, deriving the
    /// coordinate vectors from the transform.
    pub fn from_transform(
        data: SarRealImage,
        geo_transform: GeoTransform,
        crs: Option<String>,
        nodata: Option<f64>,
    ) -> Self {
        let (height, width) = data.dim();
        let x_coords = (0..width).map(|col| geo_transform.x_coord(col)).collect();
        let y_coords = (0..height).map(|row| geo_transform.y_coord(row)).collect();
        Self {
            data,
            x_coords,
            y_coords,
            geo_transform,
            crs,
            nodata,
            provenance: Provenance::default(),
        }
    }

    /// `(height, width)` of the sample array
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_empty(&self) -> bool {
        let (height, width) = self.shape();
        height == 0 || width == 0
    }

    /// New grid with replaced samples and everything else carried over.
    /// The replacement must keep the shape; coordinates stay valid.
    pub fn with_data(&self, data: SarRealImage) -> Self {
        debug_assert_eq!(self.data.dim(), data.dim());
        Self {
            data,
            x_coords: self.x_coords.clone(),
            y_coords: self.y_coords.clone(),
            geo_transform: self.geo_transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
            provenance: self.provenance.clone(),
        }
    }
}

/// Error types for post-fire SAR processing
#[derive(Debug, thiserror::Error)]
pub enum FireError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported option: {0}")]
    Unsupported(String),

    #[error("invalid data format: {0}")]
    InvalidFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("download error: {0}")]
    Download(String),
}

/// Result type for post-fire SAR operations
pub type FireResult<T> = Result<T, FireError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_polarization_roundtrip() {
        for s in ["VV", "VH", "HV", "HH"] {
            let pol: Polarization = s.parse().unwrap();
            assert_eq!(pol.to_string(), s);
        }
        assert!("XX".parse::<Polarization>().is_err());
    }

    #[test]
    fn test_filter_kind_parse() {
        assert_eq!("lee".parse::<SpeckleFilterKind>().unwrap(), SpeckleFilterKind::Lee);
        assert_eq!(
            "refined_lee".parse::<SpeckleFilterKind>().unwrap(),
            SpeckleFilterKind::RefinedLee
        );
        assert!("boxcar".parse::<SpeckleFilterKind>().is_err());
    }

    #[test]
    fn test_geo_transform_coordinates() {
        let gt = GeoTransform::north_up(0.0, 1.0, 4.0, -1.0);
        assert_eq!(gt.x_coord(0), 0.0);
        assert_eq!(gt.x_coord(3), 3.0);
        assert_eq!(gt.y_coord(0), 4.0);
        assert_eq!(gt.y_coord(3), 1.0);

        let gdal = gt.to_gdal();
        assert_eq!(GeoTransform::from_gdal(&gdal), gt);
    }

    #[test]
    fn test_grid_coordinates_match_shape() {
        let data = Array2::<f32>::zeros((3, 5));
        let grid = SarGrid::from_transform(
            data,
            GeoTransform::north_up(10.0, 2.0, 100.0, -2.0),
            None,
            None,
        );
        assert_eq!(grid.x_coords.len(), 5);
        assert_eq!(grid.y_coords.len(), 3);
        assert_eq!(grid.x_coords[0], 10.0);
        assert_eq!(grid.x_coords[4], 18.0);
        assert_eq!(grid.y_coords[0], 100.0);
        assert_eq!(grid.y_coords[2], 96.0);
    }

    #[test]
    fn test_provenance_tags_skip_unset() {
        let mut prov = Provenance::default();
        assert!(prov.to_tags().is_empty());

        prov.polarization = Some(Polarization::VV);
        prov.calibration = Some(CalibrationType::Sigma0);
        prov.units = Some(Units::Linear);
        let tags = prov.to_tags();
        assert_eq!(tags.len(), 3);
        assert!(tags.contains(&("calibration".to_string(), "sigma0".to_string())));
        assert!(!tags.iter().any(|(k, _)| k == "cropped"));

        prov.cropped = true;
        assert!(prov.to_tags().contains(&("cropped".to_string(), "true".to_string())));
    }

    #[test]
    fn test_bounding_box_union() {
        let a = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let b = BoundingBox::new(-1.0, 1.0, 1.0, 3.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(-1.0, 0.0, 2.0, 3.0));
    }
}
