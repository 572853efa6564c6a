//! Speckle filtering for multiplicative SAR noise.
//!
//! The Lee filter estimates local first- and second-order statistics with a
//! separable box filter and shrinks each sample toward the local mean by a
//! weight derived from the multiplicative noise model. In homogeneous regions
//! the weight goes to zero (maximal smoothing); near edges it approaches one
//! (detail preserved). The median filter is a plain rank filter. Window
//! boundaries are handled by clamping indices to the image edge.

use crate::types::{FireError, FireResult, SarGrid, SarRealImage, SpeckleFilterKind};
use ndarray::{Array2, Zip};

/// Empirical SAR speckle coefficient: assumed noise variance is `mean^2 / 4.4`
pub const LEE_NOISE_COEFFICIENT: f32 = 4.4;

/// Image size above which the median filter switches to the rayon path
#[cfg(feature = "parallel")]
const PARALLEL_MIN_PIXELS: usize = 1_000_000;

/// Speckle filter processor
#[derive(Debug, Clone, Copy)]
pub struct SpeckleFilter {
    kind: SpeckleFilterKind,
    window_size: usize,
}

impl SpeckleFilter {
    /// Create a filter. The window must be odd and at least 3; even windows
    /// would be asymmetric and are rejected rather than rounded.
    pub fn new(kind: SpeckleFilterKind, window_size: usize) -> FireResult<Self> {
        if window_size < 3 || window_size % 2 == 0 {
            return Err(FireError::Unsupported(format!(
                "filter window must be odd and >= 3, got {}",
                window_size
            )));
        }
        Ok(Self { kind, window_size })
    }

    pub fn kind(&self) -> SpeckleFilterKind {
        self.kind
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Filter the grid. Shape, coordinates and transform are untouched;
    /// `speckle_filter` and `filter_window` provenance is recorded. The
    /// filter is unit-agnostic, though it is conventionally run on dB data.
    pub fn apply(&self, grid: &SarGrid) -> SarGrid {
        let filtered = if grid.is_empty() {
            grid.data.clone()
        } else {
            match self.kind {
                // RefinedLee is an explicit alias: edge-directional
                // refinement is not implemented.
                SpeckleFilterKind::Lee | SpeckleFilterKind::RefinedLee => {
                    lee_filter(&grid.data, self.window_size)
                }
                SpeckleFilterKind::Median => median_filter(&grid.data, self.window_size),
            }
        };
        let mut out = grid.with_data(filtered);
        out.provenance.speckle_filter = Some(self.kind);
        out.provenance.filter_window = Some(self.window_size);
        out
    }
}

/// Separable box (uniform) filter with clamped boundary.
fn box_filter(img: &SarRealImage, window: usize) -> SarRealImage {
    let (height, width) = img.dim();
    let half = (window / 2) as isize;

    // Horizontal pass
    let mut rows = Array2::<f32>::zeros((height, width));
    for i in 0..height {
        for j in 0..width {
            let mut sum = 0.0_f64;
            for k in -half..=half {
                let jj = (j as isize + k).clamp(0, width as isize - 1) as usize;
                sum += img[[i, jj]] as f64;
            }
            rows[[i, j]] = (sum / window as f64) as f32;
        }
    }

    // Vertical pass
    let mut out = Array2::<f32>::zeros((height, width));
    for j in 0..width {
        for i in 0..height {
            let mut sum = 0.0_f64;
            for k in -half..=half {
                let ii = (i as isize + k).clamp(0, height as isize - 1) as usize;
                sum += rows[[ii, j]] as f64;
            }
            out[[i, j]] = (sum / window as f64) as f32;
        }
    }

    out
}

/// Adaptive minimum-mean-square-error Lee filter.
///
/// Local variance comes from box-filtered moments, `v = mean(x^2) - mean(x)^2`;
/// the noise model is `nv = m^2 / 4.4` and the shrinkage weight
/// `k = v / (v + nv)`, zero when the denominator vanishes.
fn lee_filter(img: &SarRealImage, window: usize) -> SarRealImage {
    let mean = box_filter(img, window);
    let sq_mean = box_filter(&img.mapv(|v| v * v), window);

    let mut out = Array2::<f32>::zeros(img.raw_dim());
    Zip::from(&mut out)
        .and(img)
        .and(&mean)
        .and(&sq_mean)
        .for_each(|o, &x, &m, &sm| {
            let variance = (sm - m * m).max(0.0);
            let noise_variance = m * m / LEE_NOISE_COEFFICIENT;
            let denom = variance + noise_variance;
            let k = if denom > 0.0 { variance / denom } else { 0.0 };
            *o = m + k * (x - m);
        });
    out
}

/// One output row of the median filter
fn median_row(img: &SarRealImage, i: usize, window: usize) -> Vec<f32> {
    let (height, width) = img.dim();
    let half = (window / 2) as isize;
    let mut row = Vec::with_capacity(width);
    let mut values = Vec::with_capacity(window * window);

    for j in 0..width {
        values.clear();
        for wi in -half..=half {
            let ii = (i as isize + wi).clamp(0, height as isize - 1) as usize;
            for wj in -half..=half {
                let jj = (j as isize + wj).clamp(0, width as isize - 1) as usize;
                values.push(img[[ii, jj]]);
            }
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        // window*window is odd, the middle element is the median
        row.push(values[values.len() / 2]);
    }
    row
}

/// Rank (median) filter over the clamped window
fn median_filter(img: &SarRealImage, window: usize) -> SarRealImage {
    let (height, width) = img.dim();

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<f32>> = if height * width >= PARALLEL_MIN_PIXELS {
        use rayon::prelude::*;
        (0..height)
            .into_par_iter()
            .map(|i| median_row(img, i, window))
            .collect()
    } else {
        (0..height).map(|i| median_row(img, i, window)).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<f32>> = (0..height).map(|i| median_row(img, i, window)).collect();

    let mut out = Array2::<f32>::zeros((height, width));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, v) in row.into_iter().enumerate() {
            out[[i, j]] = v;
        }
    }
    out
}
