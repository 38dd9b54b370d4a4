//! Aspect - solar disk center and fiducial mark localization
//!
//! Per-frame pipeline of the aspect sensor:
//!
//! 1. [`ChordCenterFinder`] estimates the sub-pixel disk center from many
//!    row and column chords.
//! 2. A square crop of `search_radius` pixels around the center is searched
//!    for fiducials with either the [`MatchedFilterFiducialFinder`] or the
//!    [`TopHatFiducialFinder`].
//! 3. Fiducial positions are translated back to full-frame coordinates.
//!
//! The engine is built once from an [`AspectConfig`] and holds no mutable
//! state, so one instance can serve frames from any number of threads.

pub mod center;
pub mod config;
pub mod edge;
mod error;
pub mod fiducial;

pub use center::{CenterResult, ChordCenterFinder, NO_SOLUTION};
pub use config::{AspectConfig, ConfigError};
pub use edge::{EdgeCrossing, EdgeLocalizer};
pub use error::AspectError;
pub use fiducial::{
    FiducialKernel, FiducialLocation, FiducialMethod, MatchedFilterFiducialFinder,
    TopHatFiducialFinder,
};

use ndarray::ArrayView2;
use serde::Serialize;
use shared::{CropWindow, ImageSize};
use std::time::{Duration, Instant};

/// Everything measured on one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSolution {
    pub center: CenterResult,
    /// Fiducials in full-frame coordinates, in finder output order
    pub fiducials: Vec<FiducialLocation>,
    /// Region searched for fiducials; `None` when no disk was found
    pub crop: Option<CropWindow>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
enum FiducialFinder {
    TopHat(TopHatFiducialFinder),
    MatchedFilter(MatchedFilterFiducialFinder),
}

impl FiducialFinder {
    fn find(&self, image: ArrayView2<u8>) -> Vec<FiducialLocation> {
        match self {
            FiducialFinder::TopHat(finder) => finder.find(image),
            FiducialFinder::MatchedFilter(finder) => finder.find(image),
        }
    }
}

/// Configured per-frame localization pipeline
#[derive(Debug, Clone)]
pub struct AspectEngine {
    config: AspectConfig,
    center_finder: ChordCenterFinder,
    fiducials: FiducialFinder,
}

impl AspectEngine {
    /// Build from a configuration. With the matched filter selected the
    /// kernel is loaded from `matched_filter.mask_path`.
    ///
    /// # Arguments
    /// * `config` - Complete engine configuration; every section is validated
    ///
    /// # Returns
    /// * `Ok(AspectEngine)` - Ready to process frames from any thread
    /// * `Err(AspectError)` - Invalid configuration, missing mask path, or an unreadable mask
    pub fn new(config: AspectConfig) -> Result<Self, AspectError> {
        match config.fiducial_method {
            FiducialMethod::TopHat => Self::build(config, None),
            FiducialMethod::MatchedFilter => {
                let path = config
                    .matched_filter
                    .mask_path
                    .as_deref()
                    .ok_or(AspectError::MissingMaskPath)?;
                let kernel = FiducialKernel::load(path, config.matched_filter.gray_tolerance)?;
                Self::build(config, Some(kernel))
            }
        }
    }

    /// Build with a kernel supplied by the caller; `mask_path` is ignored.
    pub fn with_kernel(config: AspectConfig, kernel: FiducialKernel) -> Result<Self, AspectError> {
        Self::build(config, Some(kernel))
    }

    fn build(config: AspectConfig, kernel: Option<FiducialKernel>) -> Result<Self, AspectError> {
        config.validate()?;
        let center_finder = ChordCenterFinder::new(&config.center)?;

        let fiducials = match (config.fiducial_method, kernel) {
            (FiducialMethod::MatchedFilter, Some(kernel)) => {
                FiducialFinder::MatchedFilter(MatchedFilterFiducialFinder::new(
                    kernel,
                    config.matched_filter.sigma_multiplier,
                    config.max_fiducials,
                )?)
            }
            (FiducialMethod::MatchedFilter, None) => return Err(AspectError::MissingMaskPath),
            (FiducialMethod::TopHat, _) => FiducialFinder::TopHat(TopHatFiducialFinder::new(
                &config.top_hat,
                config.max_fiducials,
            )?),
        };

        log::info!(
            "Aspect engine ready: {} chords, threshold {}, {:?} fiducials (max {})",
            config.center.chord_count,
            config.center.edge_threshold,
            config.fiducial_method,
            config.max_fiducials
        );

        Ok(Self {
            config,
            center_finder,
            fiducials,
        })
    }

    pub fn config(&self) -> &AspectConfig {
        &self.config
    }

    /// Disk center of a full frame; see [`ChordCenterFinder::find_center`]
    pub fn find_center(&self, frame: ArrayView2<u8>) -> CenterResult {
        self.center_finder.find_center(frame)
    }

    /// Run the configured fiducial finder on an already cropped image.
    /// Locations are in the coordinates of `sub_image`.
    pub fn find_fiducials(&self, sub_image: ArrayView2<u8>) -> Vec<FiducialLocation> {
        self.fiducials.find(sub_image)
    }

    /// Full pipeline on one frame. Never fails: a frame without a disk
    /// yields an invalid center and no fiducials.
    pub fn process_frame(&self, frame: ArrayView2<u8>) -> FrameSolution {
        let start = Instant::now();
        let center = self.find_center(frame);

        let crop = center.position().and_then(|(x, y)| {
            CropWindow::around(y, x, self.config.search_radius, ImageSize::of_view(&frame))
        });

        let fiducials = match &crop {
            Some(window) => self
                .find_fiducials(window.view(&frame))
                .into_iter()
                .map(|fiducial| fiducial.to_frame(window))
                .collect(),
            None => {
                log::warn!(
                    "No disk found (row chords {}, column chords {})",
                    center.count_x,
                    center.count_y
                );
                Vec::new()
            }
        };

        let elapsed = start.elapsed();
        let budget = Duration::from_millis(self.config.frame_budget_ms);
        if elapsed > budget {
            log::warn!(
                "Frame took {:.1} ms, over the {} ms budget",
                elapsed.as_secs_f64() * 1e3,
                self.config.frame_budget_ms
            );
        }

        FrameSolution {
            center,
            fiducials,
            crop,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::image_proc::synthetic::{disk_frame, fiducial_mask, SyntheticDisk};
    use shared::image_proc::MarkPolarity;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_engine_is_shareable() {
        assert_send_sync::<AspectEngine>();
    }

    #[test]
    fn test_matched_filter_needs_mask() {
        let result = AspectEngine::new(AspectConfig::default());
        assert!(matches!(result, Err(AspectError::MissingMaskPath)));
    }

    #[test]
    fn test_missing_mask_file() {
        let mut config = AspectConfig::default();
        config.matched_filter.mask_path = Some("/nonexistent/mask.png".into());
        assert!(matches!(
            AspectEngine::new(config),
            Err(AspectError::Kernel(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_kernel() {
        let mut config = AspectConfig::default();
        config.search_radius = 0;
        let kernel = FiducialKernel::from_mask(&fiducial_mask(MarkPolarity::Dark), 16).unwrap();
        assert!(matches!(
            AspectEngine::with_kernel(config, kernel),
            Err(AspectError::Config(ConfigError::Zero { field: "search_radius" }))
        ));
    }

    #[test]
    fn test_top_hat_needs_no_mask() {
        let config = AspectConfig {
            fiducial_method: FiducialMethod::TopHat,
            ..Default::default()
        };
        let engine = AspectEngine::new(config).unwrap();
        assert_eq!(engine.config().fiducial_method, FiducialMethod::TopHat);
    }

    #[test]
    fn test_crop_follows_center() {
        let kernel = FiducialKernel::from_mask(&fiducial_mask(MarkPolarity::Dark), 16).unwrap();
        let mut config = AspectConfig::default();
        config.search_radius = 60;
        let engine = AspectEngine::with_kernel(config, kernel).unwrap();

        let frame = disk_frame(ImageSize::from_width_height(512, 512), &SyntheticDisk::default());
        let solution = engine.process_frame(frame.view());

        let crop = solution.crop.unwrap();
        assert_eq!((crop.row_min, crop.col_min), (196, 196));
        assert_eq!(crop.size(), ImageSize::from_width_height(121, 121));
        assert!(solution.fiducials.is_empty());
    }
}
