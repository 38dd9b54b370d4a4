//! Image processing building blocks
//!
//! Frame views and conversions, 1-D morphology for projection profiles,
//! bounded top-N peak selection and synthetic frame generation.

pub mod image;
pub mod morphology;
pub mod peaks;
#[cfg(feature = "synthetic")]
pub mod synthetic;

pub use image::{array_to_gray_image, frame_view, gray_image_to_array, FrameError};
pub use morphology::{black_top_hat, close, dilate, erode, open, top_hat, white_top_hat, MarkPolarity};
pub use peaks::{BoundedPeakSet, PeakCandidate};
