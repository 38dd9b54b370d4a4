//! Disk center estimation from many independent chords
//!
//! `C` rows and `C` columns are sampled evenly across the frame, at index
//! `floor((2i + 1) * extent / (2C))`. Each chord that yields a clean
//! rising/falling pair contributes its midpoint: row chords to the x axis,
//! column chords to the y axis. Chords that cross a fiducial, miss the disk
//! or see only one limb are simply skipped.

use crate::config::{non_zero, CenterConfig, ConfigError};
use crate::edge::{ChordRejection, EdgeLocalizer};
use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use shared::{StatsScan, StdDevMode};
use std::num::NonZeroUsize;

/// Coordinate reported on both axes when no disk was found
pub const NO_SOLUTION: f64 = -1.0;

/// Disk center estimate with per-axis scatter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterResult {
    /// Column coordinate, from row chords
    pub x: f64,
    /// Row coordinate, from column chords
    pub y: f64,
    pub std_dev_x: f64,
    pub std_dev_y: f64,
    /// Row chords that produced a midpoint
    pub count_x: usize,
    /// Column chords that produced a midpoint
    pub count_y: usize,
}

impl CenterResult {
    pub fn no_solution(count_x: usize, count_y: usize) -> Self {
        Self {
            x: NO_SOLUTION,
            y: NO_SOLUTION,
            std_dev_x: 0.0,
            std_dev_y: 0.0,
            count_x,
            count_y,
        }
    }

    /// Both axes received at least one chord midpoint
    pub fn is_valid(&self) -> bool {
        self.count_x >= 1 && self.count_y >= 1
    }

    /// `(x, y)` when valid
    pub fn position(&self) -> Option<(f64, f64)> {
        self.is_valid().then_some((self.x, self.y))
    }
}

/// Per-axis accumulation of chord midpoints
#[derive(Debug, Default)]
struct AxisEstimate {
    midpoints: StatsScan<f64>,
    crossing_count: usize,
    order: usize,
    unresolved: usize,
}

impl AxisEstimate {
    fn record(&mut self, outcome: Result<f64, ChordRejection>) {
        match outcome {
            Ok(midpoint) => self.midpoints.push(midpoint),
            Err(ChordRejection::CrossingCount(_)) => self.crossing_count += 1,
            Err(ChordRejection::Order) => self.order += 1,
            Err(ChordRejection::UnresolvedCrossing { .. }) => self.unresolved += 1,
        }
    }

    fn count(&self) -> usize {
        self.midpoints.count()
    }

    /// `(mean, std_dev)`; a deviation that is undefined for the sample count is 0
    fn summarize(&self, mode: StdDevMode) -> Option<(f64, f64)> {
        let mean = self.midpoints.mean().ok()?;
        let std_dev = self.midpoints.std_dev(mode).unwrap_or(0.0);
        Some((mean, std_dev))
    }
}

/// Chord-sampling disk center estimator
#[derive(Debug, Clone)]
pub struct ChordCenterFinder {
    localizer: EdgeLocalizer,
    chord_count: NonZeroUsize,
    std_dev_mode: StdDevMode,
}

impl ChordCenterFinder {
    /// Build a finder from the center section of the configuration
    ///
    /// # Arguments
    /// * `config` - Limb threshold, fit half-width, chord count and deviation mode
    ///
    /// # Returns
    /// * `Ok(ChordCenterFinder)` - Ready to run on frames of any size
    /// * `Err(ConfigError)` - A zero chord count or half-width, or a non-finite threshold
    pub fn new(config: &CenterConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            localizer: EdgeLocalizer::new(config.edge_threshold, config.fit_half_width)?,
            chord_count: non_zero(config.chord_count, "center.chord_count")?,
            std_dev_mode: config.std_dev_mode,
        })
    }

    pub fn localizer(&self) -> &EdgeLocalizer {
        &self.localizer
    }

    /// Evenly spaced chord indices across `extent` pixels.
    ///
    /// When `extent` is smaller than the chord count some indices repeat.
    pub fn chord_indices(&self, extent: usize) -> impl Iterator<Item = usize> {
        let count = self.chord_count.get();
        (0..count).map(move |i| (2 * i + 1) * extent / (2 * count))
    }

    /// Estimate the disk center from row and column chords
    ///
    /// Row chords give the x coordinate and column chords the y coordinate.
    /// Each axis averages the midpoints of its usable chords.
    ///
    /// # Arguments
    /// * `image` - Full frame, row-major
    ///
    /// # Returns
    /// The center with per-axis deviation and chord counts, or the
    /// `(-1, -1)` sentinel when either axis has no usable chord
    pub fn find_center(&self, image: ArrayView2<u8>) -> CenterResult {
        let (height, width) = image.dim();
        if height == 0 || width == 0 {
            return CenterResult::no_solution(0, 0);
        }

        let mut x_axis = AxisEstimate::default();
        for row in self.chord_indices(height) {
            x_axis.record(self.localizer.locate(image.index_axis(Axis(0), row)));
        }

        let mut y_axis = AxisEstimate::default();
        for col in self.chord_indices(width) {
            y_axis.record(self.localizer.locate(image.index_axis(Axis(1), col)));
        }

        log::debug!(
            "Chords accepted {}x/{}y of {}; rejected x: {} count, {} order, {} unresolved; \
             y: {} count, {} order, {} unresolved",
            x_axis.count(),
            y_axis.count(),
            self.chord_count,
            x_axis.crossing_count,
            x_axis.order,
            x_axis.unresolved,
            y_axis.crossing_count,
            y_axis.order,
            y_axis.unresolved,
        );

        match (
            x_axis.summarize(self.std_dev_mode),
            y_axis.summarize(self.std_dev_mode),
        ) {
            (Some((x, std_dev_x)), Some((y, std_dev_y))) => CenterResult {
                x,
                y,
                std_dev_x,
                std_dev_y,
                count_x: x_axis.count(),
                count_y: y_axis.count(),
            },
            _ => CenterResult::no_solution(x_axis.count(), y_axis.count()),
        }
    }
}
