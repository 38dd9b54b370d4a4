//! Synthetic aspect frames for tests, benchmarks and lab checks
//!
//! Produces uniform solar disks on a flat background, small fiducial marks
//! with a peaked 3x3 profile, seeded Gaussian read noise, and the reference
//! mask image matching the generated marks.

use super::morphology::MarkPolarity;
use crate::image_size::ImageSize;
use image::{GrayImage, Luma};
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Uniform disk on a uniform background
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticDisk {
    /// Disk center column (x), in pixels
    pub center_x: f64,
    /// Disk center row (y), in pixels
    pub center_y: f64,
    pub radius: f64,
    pub disk_level: u8,
    pub background_level: u8,
}

impl Default for SyntheticDisk {
    fn default() -> Self {
        Self {
            center_x: 256.3,
            center_y: 255.7,
            radius: 150.0,
            disk_level: 200,
            background_level: 50,
        }
    }
}

/// Relative weights of the 3x3 mark profile; the center is strictly the peak
const MARK_PROFILE: [[f64; 3]; 3] = [[0.5, 0.75, 0.5], [0.75, 1.0, 0.75], [0.5, 0.75, 0.5]];

/// Fiducial mark appearance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkStyle {
    pub polarity: MarkPolarity,
    /// Intensity change at the mark center
    pub amplitude: f64,
}

impl Default for MarkStyle {
    fn default() -> Self {
        Self {
            polarity: MarkPolarity::Dark,
            amplitude: 150.0,
        }
    }
}

/// Render a disk frame. A pixel belongs to the disk when its center lies
/// within `radius` of the disk center.
pub fn disk_frame(size: ImageSize, disk: &SyntheticDisk) -> Array2<u8> {
    let r2 = disk.radius * disk.radius;
    Array2::from_shape_fn(size.shape(), |(row, col)| {
        let dx = col as f64 - disk.center_x;
        let dy = row as f64 - disk.center_y;
        if dx * dx + dy * dy <= r2 {
            disk.disk_level
        } else {
            disk.background_level
        }
    })
}

/// Flat frame at a single level
pub fn flat_frame(size: ImageSize, level: u8) -> Array2<u8> {
    Array2::from_elem(size.shape(), level)
}

/// Stamp marks centered on the given `(row, col)` positions.
///
/// Marks whose footprint leaves the frame are clipped.
pub fn stamp_marks(frame: &mut Array2<u8>, marks: &[(usize, usize)], style: MarkStyle) {
    let (height, width) = frame.dim();
    let sign = match style.polarity {
        MarkPolarity::Bright => 1.0,
        MarkPolarity::Dark => -1.0,
    };

    for &(row, col) in marks {
        for (dr, weights) in MARK_PROFILE.iter().enumerate() {
            for (dc, weight) in weights.iter().enumerate() {
                let (Some(r), Some(c)) = ((row + dr).checked_sub(1), (col + dc).checked_sub(1))
                else {
                    continue;
                };
                if r >= height || c >= width {
                    continue;
                }
                let value = f64::from(frame[[r, c]]) + sign * style.amplitude * weight;
                frame[[r, c]] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Add zero-mean Gaussian noise with a fixed seed so results are reproducible
pub fn add_gaussian_noise(frame: &mut Array2<u8>, sigma: f64, seed: u64) {
    let Ok(normal) = Normal::new(0.0, sigma) else {
        log::warn!("Skipping noise: invalid sigma {sigma}");
        return;
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    for pixel in frame.iter_mut() {
        let noisy = f64::from(*pixel) + normal.sample(&mut rng);
        *pixel = noisy.round().clamp(0.0, 255.0) as u8;
    }
}

/// Reference mask for the marks produced by [`stamp_marks`].
///
/// 7x7 image: the 3x3 mark footprint carries the mark polarity, the
/// surrounding ring the opposite one, and the outer border is mid-gray
/// ("don't care").
pub fn fiducial_mask(polarity: MarkPolarity) -> GrayImage {
    let (mark, ring) = match polarity {
        MarkPolarity::Bright => (255u8, 0u8),
        MarkPolarity::Dark => (0u8, 255u8),
    };

    GrayImage::from_fn(7, 7, |x, y| {
        let distance = x.abs_diff(3).max(y.abs_diff(3));
        let value = match distance {
            0 | 1 => mark,
            2 => ring,
            _ => 128,
        };
        Luma([value])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_frame_levels() {
        let disk = SyntheticDisk {
            center_x: 50.0,
            center_y: 40.0,
            radius: 10.0,
            ..Default::default()
        };
        let frame = disk_frame(ImageSize::from_width_height(100, 80), &disk);

        assert_eq!(frame.dim(), (80, 100));
        assert_eq!(frame[[40, 50]], 200);
        assert_eq!(frame[[40, 60]], 200);
        assert_eq!(frame[[40, 61]], 50);
        assert_eq!(frame[[0, 0]], 50);
    }

    #[test]
    fn test_dark_mark_profile() {
        let mut frame = flat_frame(ImageSize::from_width_height(10, 10), 200);
        stamp_marks(&mut frame, &[(5, 5)], MarkStyle::default());

        assert_eq!(frame[[5, 5]], 50);
        assert_eq!(frame[[4, 5]], 88);
        assert_eq!(frame[[4, 4]], 125);
        assert_eq!(frame[[3, 5]], 200);
    }

    #[test]
    fn test_mark_clipped_at_corner() {
        let mut frame = flat_frame(ImageSize::from_width_height(4, 4), 10);
        let style = MarkStyle {
            polarity: MarkPolarity::Bright,
            amplitude: 100.0,
        };
        stamp_marks(&mut frame, &[(0, 0)], style);

        assert_eq!(frame[[0, 0]], 110);
        assert_eq!(frame[[1, 1]], 60);
        assert_eq!(frame[[2, 2]], 10);
    }

    #[test]
    fn test_noise_is_reproducible() {
        let size = ImageSize::from_width_height(32, 32);
        let mut a = flat_frame(size, 100);
        let mut b = flat_frame(size, 100);
        add_gaussian_noise(&mut a, 3.0, 42);
        add_gaussian_noise(&mut b, 3.0, 42);

        assert_eq!(a, b);
        assert!(a.iter().any(|&v| v != 100));
    }

    #[test]
    fn test_mask_layout() {
        let mask = fiducial_mask(MarkPolarity::Dark);
        assert_eq!(mask.dimensions(), (7, 7));
        assert_eq!(mask.get_pixel(3, 3)[0], 0);
        assert_eq!(mask.get_pixel(2, 4)[0], 0);
        assert_eq!(mask.get_pixel(1, 3)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 128);
    }
}
