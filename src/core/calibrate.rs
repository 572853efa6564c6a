//! Radiometric calibration and log-scale conversion.
//!
//! Calibration here is an approximation: exact radiometry needs the per-product
//! calibration look-up tables from the SAFE annotations, which this crate does
//! not parse. GRD digital numbers are converted to linear backscatter power
//! with a fixed power law instead. The requested calibration convention is
//! recorded in provenance but does not change the numbers.

use crate::types::{CalibrationType, SarGrid, Units};

/// Fixed scale constant of the power-law calibration: `power = dn^2 / 1e6`
pub const CALIBRATION_SCALE: f32 = 1.0e6;

/// Floor applied to non-positive samples before taking the logarithm
pub const DB_FLOOR: f32 = 1.0e-10;

/// Approximate radiometric calibrator
#[derive(Debug, Clone, Copy)]
pub struct Calibrator {
    cal_type: CalibrationType,
}

impl Calibrator {
    pub fn new(cal_type: CalibrationType) -> Self {
        Self { cal_type }
    }

    pub fn cal_type(&self) -> CalibrationType {
        self.cal_type
    }

    /// Convert digital numbers to linear backscatter power.
    ///
    /// Deterministic: the same input grid always yields bit-identical output.
    /// Sets `calibration` and advances `units` to `linear`; nothing else on
    /// the grid changes.
    pub fn calibrate(&self, grid: &SarGrid) -> SarGrid {
        let calibrated = grid.data.mapv(|dn| dn * dn / CALIBRATION_SCALE);
        let mut out = grid.with_data(calibrated);
        out.provenance.calibration = Some(self.cal_type);
        out.provenance.units = Some(Units::Linear);
        out
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(CalibrationType::Sigma0)
    }
}

/// Convert linear power values to decibels: `10 * log10(value)`.
///
/// Non-positive samples are floored at [`DB_FLOOR`] to avoid singularities.
/// Precondition: the grid holds linear-unit samples and has not been
/// converted before; feeding a dB grid back in is a caller error and is not
/// guarded against.
pub fn to_db(grid: &SarGrid) -> SarGrid {
    let db = grid
        .data
        .mapv(|v| 10.0 * (if v > 0.0 { v } else { DB_FLOOR }).log10());
    let mut out = grid.with_data(db);
    out.provenance.units = Some(Units::Db);
    out
}
