//! postfire: post-wildfire change analysis toolkit
//!
//! Ingests Sentinel-1 SAR imagery and GEDI LiDAR granule metadata to support
//! burn-severity mapping. The heart of the crate is the GRD preprocessing
//! pipeline: extract a polarization band from a SAFE archive, calibrate it
//! to linear backscatter power, convert to dB, suppress speckle and crop —
//! with georeferencing and provenance carried through every stage — then
//! write the result as a tagged GeoTIFF.
//!
//! ```no_run
//! use postfire::{
//!     Calibrate, CalibrationType, Despeckle, GrdReader, Pipeline, Polarization,
//!     SpeckleFilterKind, ToDb, write_geotiff,
//! };
//!
//! # fn main() -> postfire::FireResult<()> {
//! let reader = GrdReader::new("S1A_IW_GRDH_...SAFE.zip")?;
//! let band = reader.read_band(Polarization::VV)?;
//!
//! let processed = Pipeline::new()
//!     .then(Box::new(Calibrate::new(CalibrationType::Sigma0)))
//!     .then(Box::new(ToDb))
//!     .then(Box::new(Despeckle::new(SpeckleFilterKind::Lee, 5)?))
//!     .run(band)?;
//!
//! write_geotiff(&processed, "processed_vv.tif")?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    BoundingBox, CalibrationType, FireError, FireResult, GeoTransform, Polarization, Provenance,
    SarGrid, SarReal, SarRealImage, SpeckleFilterKind, Units,
};

pub use crate::core::{
    clip_to_boundary, crop_to_bounds, to_db, Calibrate, Calibrator, ClipBoundary, CropBounds,
    Despeckle, GridTransform, LogObserver, NullObserver, Pipeline, PipelineObserver, SpeckleFilter,
    ToDb,
};

pub use io::{
    write_geotiff, write_raster, FireBoundary, GediClient, GediProduct, GrdReader,
    ProductDescriptor, ProductDownloader, Sentinel1Search,
};
