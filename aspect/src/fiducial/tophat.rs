//! Two-pass projection fiducial finder
//!
//! Pass 1 sums each row of the crop into a profile, isolates narrow marks
//! with a 1-D top-hat and keeps the strongest strict local maxima above
//! `mean + k * sigma`. Pass 2 takes a band of `fiducial_width / 2` rows either
//! side of every row peak, projects it onto columns and keeps the single
//! strongest column peak, which pairs with the row into one location.

use super::FiducialLocation;
use crate::config::{non_zero, AxisTopHat, ConfigError, TopHatConfig};
use ndarray::{s, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use shared::image_proc::{top_hat, BoundedPeakSet, MarkPolarity, PeakCandidate};
use shared::{StatsScan, StdDevMode};
use std::num::NonZeroUsize;

/// Profile whose statistics set the detection threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    /// `mean + k * sigma` of the top-hat output
    #[default]
    Filtered,
    /// `k * sigma` of the raw projection. The top-hat removes the baseline,
    /// so only the spread of the raw profile carries over.
    ///
    /// This intentionally differs from a literal `mean + k * sigma` of the raw
    /// projection, whose mean would sit far above any top-hat response.
    Source,
}

/// Direction a 2-D image is collapsed into a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionAxis {
    /// One sum per row
    Rows,
    /// One sum per column
    Columns,
}

/// Sum projection of `image` along `axis`
pub fn project(image: ArrayView2<u8>, axis: ProjectionAxis) -> Vec<f64> {
    let axis = match axis {
        ProjectionAxis::Rows => Axis(0),
        ProjectionAxis::Columns => Axis(1),
    };
    image
        .axis_iter(axis)
        .map(|lane| lane.iter().map(|&v| f64::from(v)).sum())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisFilter {
    width: NonZeroUsize,
    sigma_multiplier: f64,
}

impl AxisFilter {
    fn new(params: &AxisTopHat, field: &'static str) -> Result<Self, ConfigError> {
        Ok(Self {
            width: non_zero(params.width, field)?,
            sigma_multiplier: params.sigma_multiplier,
        })
    }
}

/// Top-hat projection fiducial finder
#[derive(Debug, Clone)]
pub struct TopHatFiducialFinder {
    rows: AxisFilter,
    columns: AxisFilter,
    band_half_width: usize,
    polarity: MarkPolarity,
    threshold_source: ThresholdSource,
    capacity: NonZeroUsize,
}

impl TopHatFiducialFinder {
    /// Create a finder
    ///
    /// # Arguments
    /// * `config` - Filter widths, threshold multipliers, mark size and polarity
    /// * `capacity` - Maximum number of marks reported per crop
    ///
    /// # Returns
    /// * `Ok(TopHatFiducialFinder)` - When the configuration validates
    /// * `Err(ConfigError)` - For zero widths or capacity, or non-finite multipliers
    pub fn new(config: &TopHatConfig, capacity: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rows: AxisFilter::new(&config.rows, "top_hat.rows.width")?,
            columns: AxisFilter::new(&config.columns, "top_hat.columns.width")?,
            band_half_width: non_zero(config.fiducial_width, "top_hat.fiducial_width")?.get() / 2,
            polarity: config.polarity,
            threshold_source: config.threshold_source,
            capacity: non_zero(capacity, "max_fiducials")?,
        })
    }

    fn threshold(&self, source: &[f64], filtered: &[f64], k: f64) -> Option<f64> {
        let mode = StdDevMode::Population;
        match self.threshold_source {
            ThresholdSource::Filtered => StatsScan::new(filtered).sigma_threshold(k, mode).ok(),
            ThresholdSource::Source => StatsScan::new(source)
                .std_dev(mode)
                .ok()
                .map(|sigma| k * sigma),
        }
    }

    /// Strongest strict local maxima of the filtered profile above threshold
    fn profile_peaks(
        &self,
        profile: &[f64],
        filter: AxisFilter,
        capacity: NonZeroUsize,
    ) -> BoundedPeakSet<usize> {
        let mut peaks = BoundedPeakSet::new(capacity);
        let filtered = top_hat(profile, filter.width.get(), self.polarity);
        let Some(threshold) = self.threshold(profile, &filtered, filter.sigma_multiplier) else {
            return peaks;
        };

        for (offset, window) in filtered.windows(3).enumerate() {
            let (left, value, right) = (window[0], window[1], window[2]);
            if value > threshold && value > left && value > right {
                peaks.insert(PeakCandidate::new(offset + 1, value));
            }
        }
        peaks
    }

    /// Locate up to `capacity` marks in crop coordinates.
    ///
    /// Row peaks with no column peak inside their band are dropped. The
    /// score is the filtered row-profile value.
    pub fn find(&self, image: ArrayView2<u8>) -> Vec<FiducialLocation> {
        let (height, _) = image.dim();
        let row_profile = project(image, ProjectionAxis::Rows);
        let row_peaks = self.profile_peaks(&row_profile, self.rows, self.capacity);
        log::debug!("Top-hat row pass found {} peaks", row_peaks.len());

        let single = NonZeroUsize::MIN;
        row_peaks
            .iter()
            .filter_map(|row_peak| {
                let row = row_peak.location;
                let start = row.saturating_sub(self.band_half_width);
                let end = row.saturating_add(self.band_half_width).saturating_add(1).min(height);
                let band = image.slice(s![start..end, ..]);

                let col_profile = project(band, ProjectionAxis::Columns);
                let col_peaks = self.profile_peaks(&col_profile, self.columns, single);
                col_peaks.best().map(|col_peak| FiducialLocation {
                    row,
                    col: col_peak.location,
                    score: row_peak.score,
                })
            })
            .collect()
    }
}
