//! Fiducial mark localization inside a crop around the disk center
//!
//! Two finders are available. The matched filter correlates the crop with a
//! kernel built from a reference mask and is the default. The top-hat
//! finder works on 1-D row and column projections and needs no mask.

pub mod kernel;
pub mod matched_filter;
pub mod tophat;

use serde::{Deserialize, Serialize};
use shared::image_proc::PeakCandidate;
use shared::CropWindow;

pub use kernel::{FiducialKernel, KernelError, KernelTap};
pub use matched_filter::MatchedFilterFiducialFinder;
pub use tophat::{ThresholdSource, TopHatFiducialFinder};

/// Fiducial detection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiducialMethod {
    /// Row then column projection peaks
    TopHat,
    /// 2-D correlation against the reference mask
    #[default]
    MatchedFilter,
}

/// A located fiducial mark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiducialLocation {
    pub row: usize,
    pub col: usize,
    /// Detection strength; comparable only between marks from the same finder
    pub score: f64,
}

impl FiducialLocation {
    /// Shift from crop coordinates into full-frame coordinates
    pub fn to_frame(self, crop: &CropWindow) -> Self {
        let (row, col) = crop.to_frame(self.row, self.col);
        Self { row, col, ..self }
    }
}

impl From<PeakCandidate<(usize, usize)>> for FiducialLocation {
    fn from(peak: PeakCandidate<(usize, usize)>) -> Self {
        let (row, col) = peak.location;
        Self {
            row,
            col,
            score: peak.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use shared::ImageSize;

    #[test]
    fn test_translation_to_frame() {
        let frame = Array2::<u8>::zeros((512, 512));
        let crop = CropWindow::around(256.0, 256.0, 60, ImageSize::of_view(&frame.view())).unwrap();
        let local = FiducialLocation {
            row: 24,
            col: 34,
            score: 1.0,
        };

        let global = local.to_frame(&crop);
        assert_eq!((global.row, global.col), (220, 230));
        assert_eq!(global.score, 1.0);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(
            serde_json::to_string(&FiducialMethod::MatchedFilter).unwrap(),
            "\"matched_filter\""
        );
        assert_eq!(FiducialMethod::default(), FiducialMethod::MatchedFilter);
    }
}
