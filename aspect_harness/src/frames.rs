//! Frame and mask image I/O for lab runs
//!
//! Frames on disk are any 8-bit grayscale (or convertible) image format the
//! `image` crate reads. Color frames are reduced to luma.

use anyhow::{Context, Result};
use ndarray::Array2;
use shared::image_proc::synthetic::{
    add_gaussian_noise, disk_frame, fiducial_mask, stamp_marks, MarkStyle, SyntheticDisk,
};
use shared::image_proc::{array_to_gray_image, gray_image_to_array};
use shared::ImageSize;
use std::path::{Path, PathBuf};

/// File extensions picked up by [`list_frames`]
pub const FRAME_EXTENSIONS: [&str; 5] = ["png", "bmp", "tif", "tiff", "pgm"];

/// Load a frame as a `(height, width)` 8-bit array
pub fn load_frame(path: &Path) -> Result<Array2<u8>> {
    let image = image::open(path)
        .with_context(|| format!("failed to open frame {}", path.display()))?
        .to_luma8();
    Ok(gray_image_to_array(&image))
}

pub fn save_frame(frame: &Array2<u8>, path: &Path) -> Result<()> {
    array_to_gray_image(&frame.view())
        .save(path)
        .with_context(|| format!("failed to write frame {}", path.display()))
}

fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            FRAME_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Frame files directly inside `dir`, sorted by path
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;

    let mut frames = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_frame(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Parameters of a synthetic lab frame
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    pub size: ImageSize,
    pub disk: SyntheticDisk,
    /// Mark centers as `(row, col)`
    pub marks: Vec<(usize, usize)>,
    pub style: MarkStyle,
    /// Read noise sigma in counts; 0 disables noise
    pub noise_sigma: f64,
    pub seed: u64,
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self {
            size: ImageSize::from_width_height(512, 512),
            disk: SyntheticDisk::default(),
            marks: vec![(220, 230), (250, 300), (290, 260), (200, 280)],
            style: MarkStyle::default(),
            noise_sigma: 2.0,
            seed: 1,
        }
    }
}

impl SyntheticScene {
    pub fn render(&self) -> Array2<u8> {
        let mut frame = disk_frame(self.size, &self.disk);
        stamp_marks(&mut frame, &self.marks, self.style);
        if self.noise_sigma > 0.0 {
            add_gaussian_noise(&mut frame, self.noise_sigma, self.seed);
        }
        frame
    }

    /// Write `frame.png` and the matching `mask.png` into `dir`
    pub fn write(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let frame_path = dir.join("frame.png");
        save_frame(&self.render(), &frame_path)?;

        let mask_path = dir.join("mask.png");
        fiducial_mask(self.style.polarity)
            .save(&mask_path)
            .with_context(|| format!("failed to write mask {}", mask_path.display()))?;

        Ok((frame_path, mask_path))
    }
}
