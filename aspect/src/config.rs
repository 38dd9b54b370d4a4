//! Aspect engine configuration
//!
//! All tunables are fixed at start-up. They are stored as JSON and validated
//! once, so per-frame processing never has to deal with a misconfiguration.

use crate::fiducial::tophat::ThresholdSource;
use crate::fiducial::FiducialMethod;
use serde::{Deserialize, Serialize};
use shared::image_proc::MarkPolarity;
use shared::StdDevMode;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors, reported at construction time
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub(crate) fn non_zero(value: usize, field: &'static str) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(value).ok_or(ConfigError::Zero { field })
}

pub(crate) fn finite(value: f64, field: &'static str) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

/// Chord sampling for the disk center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterConfig {
    /// Number of row chords and of column chords
    pub chord_count: usize,
    /// Limb threshold in raw counts
    pub edge_threshold: f64,
    /// Half-width of the line-fit window around each crossing
    pub fit_half_width: usize,
    /// Denominator for the reported chord scatter
    pub std_dev_mode: StdDevMode,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            chord_count: 40,
            edge_threshold: 125.0,
            fit_half_width: 3,
            std_dev_mode: StdDevMode::Sample,
        }
    }
}

impl CenterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero(self.chord_count, "center.chord_count")?;
        non_zero(self.fit_half_width, "center.fit_half_width")?;
        finite(self.edge_threshold, "center.edge_threshold")?;
        Ok(())
    }
}

/// Top-hat parameters for one projection axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisTopHat {
    /// Structuring element width in samples; must exceed the mark size
    pub width: usize,
    /// Threshold multiplier k in `mean + k * sigma`
    pub sigma_multiplier: f64,
}

impl Default for AxisTopHat {
    fn default() -> Self {
        Self {
            width: 9,
            sigma_multiplier: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopHatConfig {
    /// First pass, one projection value per row
    pub rows: AxisTopHat,
    /// Second pass, one projection value per column inside each row slice
    pub columns: AxisTopHat,
    /// Expected mark size; the column slice spans `fiducial_width / 2` rows either side
    pub fiducial_width: usize,
    /// Mark contrast. `Bright` filters with `f - open(f)`; the default `Dark`
    /// intentionally uses `close(f) - f` instead, so engraved marks that dip
    /// below the disk come out as positive peaks.
    pub polarity: MarkPolarity,
    pub threshold_source: ThresholdSource,
}

impl Default for TopHatConfig {
    fn default() -> Self {
        Self {
            rows: AxisTopHat::default(),
            columns: AxisTopHat::default(),
            fiducial_width: 4,
            polarity: MarkPolarity::Dark,
            threshold_source: ThresholdSource::Filtered,
        }
    }
}

impl TopHatConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_zero(self.rows.width, "top_hat.rows.width")?;
        non_zero(self.columns.width, "top_hat.columns.width")?;
        non_zero(self.fiducial_width, "top_hat.fiducial_width")?;
        finite(self.rows.sigma_multiplier, "top_hat.rows.sigma_multiplier")?;
        finite(self.columns.sigma_multiplier, "top_hat.columns.sigma_multiplier")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchedFilterConfig {
    /// Threshold multiplier k in `mean + k * sigma` of the normalized surface
    pub sigma_multiplier: f64,
    /// Reference mask image the kernel is built from
    pub mask_path: Option<PathBuf>,
    /// Mask pixels within this many counts of mid-gray are "don't care"
    pub gray_tolerance: u8,
}

impl Default for MatchedFilterConfig {
    fn default() -> Self {
        Self {
            sigma_multiplier: 3.0,
            mask_path: None,
            gray_tolerance: 16,
        }
    }
}

impl MatchedFilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite(self.sigma_multiplier, "matched_filter.sigma_multiplier")?;
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectConfig {
    pub center: CenterConfig,
    pub fiducial_method: FiducialMethod,
    pub top_hat: TopHatConfig,
    pub matched_filter: MatchedFilterConfig,
    /// Half-size of the square crop around the disk center searched for fiducials
    pub search_radius: usize,
    /// Maximum number of fiducials reported per frame
    pub max_fiducials: usize,
    /// Processing time above which a frame is reported as over budget
    pub frame_budget_ms: u64,
}

impl Default for AspectConfig {
    fn default() -> Self {
        Self {
            center: CenterConfig::default(),
            fiducial_method: FiducialMethod::MatchedFilter,
            top_hat: TopHatConfig::default(),
            matched_filter: MatchedFilterConfig::default(),
            search_radius: 100,
            max_fiducials: 12,
            frame_budget_ms: 100,
        }
    }
}

impl AspectConfig {
    /// Check every section, including the ones the selected method does not use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.center.validate()?;
        self.top_hat.validate()?;
        self.matched_filter.validate()?;
        non_zero(self.search_radius, "search_radius")?;
        non_zero(self.max_fiducials, "max_fiducials")?;
        Ok(())
    }

    /// Load from a JSON file. Missing fields take their default values.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save as pretty-printed JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
