//! Matched-filter fiducial finder
//!
//! Correlates the crop with a [`FiducialKernel`] (pixels outside the crop
//! count as zero), rescales the response to `[0, 1]` and keeps the strongest
//! strict 4-neighbor maxima above `mean + k * sigma` of the rescaled surface.
//! Only pixels whose whole kernel footprint lies inside the crop are
//! reported, and never the outermost ring.

use super::{FiducialKernel, FiducialLocation};
use crate::config::{finite, non_zero, ConfigError};
use ndarray::{Array2, ArrayView2};
use shared::image_proc::{BoundedPeakSet, PeakCandidate};
use shared::{StatsScan, StdDevMode};
use std::num::NonZeroUsize;
use std::ops::Range;

/// Zero-padded correlation of `image` with `kernel`, same size as `image`
pub fn correlate(image: ArrayView2<u8>, kernel: &FiducialKernel) -> Array2<f64> {
    let (height, width) = image.dim();
    let taps = kernel.taps();

    Array2::from_shape_fn((height, width), |(row, col)| {
        taps.iter()
            .filter_map(|tap| {
                let r = row.checked_add_signed(tap.row_offset).filter(|&r| r < height)?;
                let c = col.checked_add_signed(tap.col_offset).filter(|&c| c < width)?;
                Some(tap.weight * f64::from(image[[r, c]]))
            })
            .sum()
    })
}

/// Rescale in place to `[0, 1]`. A constant surface becomes all zeros.
pub fn normalize_min_max(surface: &mut Array2<f64>) {
    let stats: StatsScan<f64> = surface.iter().copied().collect();
    let Ok((min, max)) = stats.min_max() else {
        return;
    };

    let range = max - min;
    if range > 0.0 {
        surface.mapv_inplace(|v| (v - min) / range);
    } else {
        surface.fill(0.0);
    }
}

/// 2-D correlation fiducial finder with a fixed kernel
#[derive(Debug, Clone)]
pub struct MatchedFilterFiducialFinder {
    kernel: FiducialKernel,
    sigma_multiplier: f64,
    capacity: NonZeroUsize,
}

impl MatchedFilterFiducialFinder {
    /// Create a finder around a prepared kernel
    ///
    /// # Arguments
    /// * `kernel` - Correlation kernel, usually built from the reference mask
    /// * `sigma_multiplier` - k in the `mean + k * sigma` response threshold
    /// * `capacity` - Maximum number of marks reported per crop
    pub fn new(
        kernel: FiducialKernel,
        sigma_multiplier: f64,
        capacity: usize,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            kernel,
            sigma_multiplier: finite(sigma_multiplier, "matched_filter.sigma_multiplier")?,
            capacity: non_zero(capacity, "max_fiducials")?,
        })
    }

    pub fn kernel(&self) -> &FiducialKernel {
        &self.kernel
    }

    /// Normalized correlation response of the crop
    pub fn response(&self, image: ArrayView2<u8>) -> Array2<f64> {
        let mut surface = correlate(image, &self.kernel);
        normalize_min_max(&mut surface);
        surface
    }

    /// Rows and columns where the kernel footprint stays inside an image of
    /// `dim` and every pixel has four neighbors
    fn search_region(&self, (height, width): (usize, usize)) -> (Range<usize>, Range<usize>) {
        let (rows, cols) = self.kernel.dim();
        let (anchor_row, anchor_col) = self.kernel.anchor();
        let top = anchor_row.max(1);
        let bottom = (rows - 1 - anchor_row).max(1);
        let left = anchor_col.max(1);
        let right = (cols - 1 - anchor_col).max(1);
        (
            top..height.saturating_sub(bottom),
            left..width.saturating_sub(right),
        )
    }

    /// Locate up to `capacity` marks in crop coordinates, scored by normalized response
    pub fn find(&self, image: ArrayView2<u8>) -> Vec<FiducialLocation> {
        let (row_range, col_range) = self.search_region(image.dim());
        if row_range.is_empty() || col_range.is_empty() {
            return Vec::new();
        }

        let surface = self.response(image);
        let stats: StatsScan<f64> = surface.iter().copied().collect();
        let Ok(threshold) = stats.sigma_threshold(self.sigma_multiplier, StdDevMode::Population)
        else {
            return Vec::new();
        };

        let mut peaks = BoundedPeakSet::new(self.capacity);
        let mut above = 0usize;
        for row in row_range {
            for col in col_range.clone() {
                let value = surface[[row, col]];
                if value <= threshold {
                    continue;
                }
                above += 1;
                let is_peak = value > surface[[row - 1, col]]
                    && value > surface[[row + 1, col]]
                    && value > surface[[row, col - 1]]
                    && value > surface[[row, col + 1]];
                if is_peak {
                    peaks.insert(PeakCandidate::new((row, col), value));
                }
            }
        }

        log::debug!(
            "Matched filter: threshold {threshold:.3}, {above} pixels above, {} peaks kept",
            peaks.len()
        );
        peaks.into_candidates().into_iter().map(FiducialLocation::from).collect()
    }
}
