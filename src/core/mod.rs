//! Core SAR preprocessing stages

pub mod calibrate;
pub mod crop;
pub mod pipeline;
pub mod speckle_filter;

// Re-export main types
pub use calibrate::{to_db, Calibrator, CALIBRATION_SCALE, DB_FLOOR};
pub use crop::{clip_to_boundary, crop_to_bounds};
pub use pipeline::{
    Calibrate, ClipBoundary, CropBounds, Despeckle, GridTransform, LogObserver, NullObserver,
    Pipeline, PipelineObserver, ToDb,
};
pub use speckle_filter::{SpeckleFilter, LEE_NOISE_COEFFICIENT};
