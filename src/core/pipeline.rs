//! Explicit ordered pipeline of grid transforms.
//!
//! Each preprocessing stage is a value implementing [`GridTransform`], a
//! single capability: turn one grid into another. A [`Pipeline`] chains them
//! in order, threading the grid through. Core transforms stay free of side
//! effects; progress reporting goes through an injectable
//! [`PipelineObserver`], with [`LogObserver`] routing to the `log` facade by
//! default.

use crate::core::calibrate::{to_db, Calibrator};
use crate::core::crop::{clip_to_boundary, crop_to_bounds};
use crate::core::speckle_filter::SpeckleFilter;
use crate::types::{BoundingBox, CalibrationType, FireResult, SarGrid, SpeckleFilterKind};
use std::path::PathBuf;

/// One pipeline stage: transforms a labeled grid into a new labeled grid
pub trait GridTransform {
    /// Stage name for observers and error context
    fn name(&self) -> &str;

    fn apply(&self, grid: &SarGrid) -> FireResult<SarGrid>;
}

/// Receives stage lifecycle notifications from a running pipeline
pub trait PipelineObserver {
    fn stage_started(&self, _name: &str, _grid: &SarGrid) {}
    fn stage_finished(&self, _name: &str, _grid: &SarGrid) {}
}

/// Default observer: reports stage progress through the `log` facade
#[derive(Debug, Default)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn stage_started(&self, name: &str, grid: &SarGrid) {
        let (height, width) = grid.shape();
        log::info!("stage {} starting on {}x{} grid", name, height, width);
    }

    fn stage_finished(&self, name: &str, grid: &SarGrid) {
        let (height, width) = grid.shape();
        log::info!("stage {} finished, output {}x{}", name, height, width);
    }
}

/// Observer that drops every notification; useful in tests
#[derive(Debug, Default)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}

/// Ordered chain of grid transforms
pub struct Pipeline {
    stages: Vec<Box<dyn GridTransform>>,
    observer: Box<dyn PipelineObserver>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            observer: Box::new(LogObserver),
        }
    }

    /// Replace the progress observer
    pub fn with_observer(mut self, observer: Box<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Append a stage
    pub fn then(mut self, stage: Box<dyn GridTransform>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, returning the final grid
    pub fn run(&self, grid: SarGrid) -> FireResult<SarGrid> {
        let mut current = grid;
        for stage in &self.stages {
            self.observer.stage_started(stage.name(), &current);
            current = stage.apply(&current)?;
            self.observer.stage_finished(stage.name(), &current);
        }
        Ok(current)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Radiometric calibration stage
pub struct Calibrate {
    calibrator: Calibrator,
}

impl Calibrate {
    pub fn new(cal_type: CalibrationType) -> Self {
        Self {
            calibrator: Calibrator::new(cal_type),
        }
    }
}

impl GridTransform for Calibrate {
    fn name(&self) -> &str {
        "calibrate"
    }

    fn apply(&self, grid: &SarGrid) -> FireResult<SarGrid> {
        Ok(self.calibrator.calibrate(grid))
    }
}

/// Log-scale (dB) conversion stage
pub struct ToDb;

impl GridTransform for ToDb {
    fn name(&self) -> &str {
        "to_db"
    }

    fn apply(&self, grid: &SarGrid) -> FireResult<SarGrid> {
        Ok(to_db(grid))
    }
}

/// Speckle filtering stage
pub struct Despeckle {
    filter: SpeckleFilter,
}

impl Despeckle {
    pub fn new(kind: SpeckleFilterKind, window_size: usize) -> FireResult<Self> {
        Ok(Self {
            filter: SpeckleFilter::new(kind, window_size)?,
        })
    }
}

impl GridTransform for Despeckle {
    fn name(&self) -> &str {
        "despeckle"
    }

    fn apply(&self, grid: &SarGrid) -> FireResult<SarGrid> {
        Ok(self.filter.apply(grid))
    }
}

/// Bounds crop stage
pub struct CropBounds {
    bounds: BoundingBox,
}

impl CropBounds {
    pub fn new(bounds: BoundingBox) -> Self {
        Self { bounds }
    }
}

impl GridTransform for CropBounds {
    fn name(&self) -> &str {
        "crop_bounds"
    }

    fn apply(&self, grid: &SarGrid) -> FireResult<SarGrid> {
        Ok(crop_to_bounds(grid, &self.bounds))
    }
}

/// Vector-boundary annotation stage (annotate-only clip)
pub struct ClipBoundary {
    boundary_path: PathBuf,
}

impl ClipBoundary {
    pub fn new<P: Into<PathBuf>>(boundary_path: P) -> Self {
        Self {
            boundary_path: boundary_path.into(),
        }
    }
}

impl GridTransform for ClipBoundary {
    fn name(&self) -> &str {
        "clip_boundary"
    }

    fn apply(&self, grid: &SarGrid) -> FireResult<SarGrid> {
        clip_to_boundary(grid, &self.boundary_path)
    }
}
