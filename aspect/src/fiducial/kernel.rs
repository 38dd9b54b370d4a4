//! Matched-filter kernel built from a reference mask image
//!
//! The mask is an 8-bit image of one fiducial. Pixels near mid-gray are
//! "don't care" (weight 0), lighter pixels weigh +1 and darker ones -1. Only
//! the non-zero weights are kept as taps relative to the kernel anchor.

use image::{GrayImage, ImageError};
use ndarray::Array2;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Mask value that maps to a zero weight
pub const MID_GRAY: u8 = 128;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("kernel is empty ({rows}x{cols})")]
    Empty { rows: usize, cols: usize },
    #[error("kernel has no non-zero weight")]
    AllZero,
    #[error("kernel weight at ({row}, {col}) is {value}, expected -1, 0 or +1")]
    InvalidWeight { row: usize, col: usize, value: f64 },
    #[error("failed to load mask {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

/// One non-zero kernel weight, offset from the anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelTap {
    pub row_offset: isize,
    pub col_offset: isize,
    pub weight: f64,
}

/// Immutable correlation kernel with weights in {-1, 0, +1}
#[derive(Debug, Clone, PartialEq)]
pub struct FiducialKernel {
    weights: Array2<f64>,
    taps: Vec<KernelTap>,
}

impl FiducialKernel {
    /// Wrap an explicit weight grid. The anchor is the element at
    /// `(rows / 2, cols / 2)`.
    ///
    /// # Returns
    /// * `Ok(FiducialKernel)` - With one tap per non-zero weight
    /// * `Err(KernelError)` - For an empty or all-zero grid, or a weight other than -1, 0 or +1
    pub fn from_weights(weights: Array2<f64>) -> Result<Self, KernelError> {
        let (rows, cols) = weights.dim();
        if rows == 0 || cols == 0 {
            return Err(KernelError::Empty { rows, cols });
        }

        let (anchor_row, anchor_col) = (rows / 2, cols / 2);
        let mut taps = Vec::new();
        for ((row, col), &value) in weights.indexed_iter() {
            if value != 0.0 && value != 1.0 && value != -1.0 {
                return Err(KernelError::InvalidWeight { row, col, value });
            }
            if value != 0.0 {
                taps.push(KernelTap {
                    row_offset: row as isize - anchor_row as isize,
                    col_offset: col as isize - anchor_col as isize,
                    weight: value,
                });
            }
        }

        if taps.is_empty() {
            return Err(KernelError::AllZero);
        }
        Ok(Self { weights, taps })
    }

    /// Build from a mask image. Pixels within `gray_tolerance` of
    /// [`MID_GRAY`] get weight 0.
    pub fn from_mask(mask: &GrayImage, gray_tolerance: u8) -> Result<Self, KernelError> {
        let (width, height) = mask.dimensions();
        let weights = Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
            let value = mask.get_pixel(col as u32, row as u32)[0];
            if value.abs_diff(MID_GRAY) <= gray_tolerance {
                0.0
            } else if value > MID_GRAY {
                1.0
            } else {
                -1.0
            }
        });
        Self::from_weights(weights)
    }

    /// Read a mask image from disk and build the kernel from its luma channel
    pub fn load(path: &Path, gray_tolerance: u8) -> Result<Self, KernelError> {
        let mask = image::open(path)
            .map_err(|source| KernelError::Load {
                path: path.to_path_buf(),
                source,
            })?
            .to_luma8();
        let kernel = Self::from_mask(&mask, gray_tolerance)?;
        log::info!(
            "Loaded {}x{} fiducial kernel with {} taps from {}",
            kernel.dim().0,
            kernel.dim().1,
            kernel.taps.len(),
            path.display()
        );
        Ok(kernel)
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn taps(&self) -> &[KernelTap] {
        &self.taps
    }

    /// `(rows, cols)`
    pub fn dim(&self) -> (usize, usize) {
        self.weights.dim()
    }

    /// Kernel element aligned with the output pixel
    pub fn anchor(&self) -> (usize, usize) {
        let (rows, cols) = self.dim();
        (rows / 2, cols / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use ndarray::arr2;
    use shared::image_proc::synthetic::fiducial_mask;
    use shared::image_proc::MarkPolarity;

    #[test]
    fn test_dark_mask_weights() {
        let kernel = FiducialKernel::from_mask(&fiducial_mask(MarkPolarity::Dark), 16).unwrap();

        assert_eq!(kernel.dim(), (7, 7));
        assert_eq!(kernel.anchor(), (3, 3));
        assert_eq!(kernel.weights()[[3, 3]], -1.0);
        assert_eq!(kernel.weights()[[1, 3]], 1.0);
        assert_eq!(kernel.weights()[[0, 0]], 0.0);
        // 3x3 center plus the 16-pixel ring
        assert_eq!(kernel.taps().len(), 25);
        assert_eq!(kernel.taps().iter().filter(|t| t.weight < 0.0).count(), 9);
    }

    #[test]
    fn test_tap_offsets_are_anchor_relative() {
        let kernel = FiducialKernel::from_weights(arr2(&[[1.0, 0.0, 0.0], [0.0, 0.0, -1.0]])).unwrap();

        assert_eq!(kernel.anchor(), (1, 1));
        assert_eq!(
            kernel.taps(),
            &[
                KernelTap {
                    row_offset: -1,
                    col_offset: -1,
                    weight: 1.0
                },
                KernelTap {
                    row_offset: 0,
                    col_offset: 1,
                    weight: -1.0
                },
            ]
        );
    }

    #[test]
    fn test_gray_tolerance() {
        let mask = GrayImage::from_fn(3, 1, |x, _| Luma([[110u8, 128, 150][x as usize]]));

        let strict = FiducialKernel::from_mask(&mask, 0).unwrap();
        assert_eq!(strict.weights().row(0).to_vec(), vec![-1.0, 0.0, 1.0]);

        let loose = FiducialKernel::from_mask(&mask, 20).unwrap();
        assert_eq!(loose.weights().row(0).to_vec(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_invalid_kernels() {
        assert!(matches!(
            FiducialKernel::from_weights(Array2::zeros((0, 3))),
            Err(KernelError::Empty { rows: 0, cols: 3 })
        ));
        assert!(matches!(
            FiducialKernel::from_weights(Array2::zeros((3, 3))),
            Err(KernelError::AllZero)
        ));
        assert!(matches!(
            FiducialKernel::from_weights(arr2(&[[1.0, 0.5]])),
            Err(KernelError::InvalidWeight { row: 0, col: 1, .. })
        ));

        let gray = GrayImage::from_pixel(5, 5, Luma([MID_GRAY]));
        assert!(matches!(
            FiducialKernel::from_mask(&gray, 16),
            Err(KernelError::AllZero)
        ));
    }

    #[test]
    fn test_load_mask_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        fiducial_mask(MarkPolarity::Dark).save(&path).unwrap();

        let loaded = FiducialKernel::load(&path, 16).unwrap();
        let built = FiducialKernel::from_mask(&fiducial_mask(MarkPolarity::Dark), 16).unwrap();
        assert_eq!(loaded, built);
    }

    #[test]
    fn test_missing_mask_file() {
        let err = FiducialKernel::load(Path::new("/nonexistent/mask.png"), 16).unwrap_err();
        assert!(matches!(err, KernelError::Load { .. }));
        assert!(err.to_string().contains("/nonexistent/mask.png"));
    }
}
