//! Frame dimensions and crop windows

use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame dimensions
///
/// Arrays in this workspace are indexed `[row, col]`, so an `ImageSize`
/// maps to an ndarray shape of `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Frame width in pixels (number of columns)
    pub width: usize,
    /// Frame height in pixels (number of rows)
    pub height: usize,
}

impl ImageSize {
    pub fn from_width_height(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Size of an array view, reading the `(rows, cols)` shape
    pub fn of_view<T>(view: &ArrayView2<T>) -> Self {
        let (height, width) = view.dim();
        Self { width, height }
    }

    /// Shape tuple in ndarray order `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangular sub-region of a frame, in full-frame pixel coordinates.
///
/// Rows span `row_min..row_min + height`, columns `col_min..col_min + width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropWindow {
    pub row_min: usize,
    pub col_min: usize,
    pub height: usize,
    pub width: usize,
}

impl CropWindow {
    /// Square window of `2 * half_size + 1` pixels centered on the pixel
    /// nearest to `(center_row, center_col)`, clipped to the frame.
    ///
    /// Returns `None` when the clipped window is empty, which happens when
    /// the center lies more than `half_size` pixels outside the frame.
    pub fn around(
        center_row: f64,
        center_col: f64,
        half_size: usize,
        frame: ImageSize,
    ) -> Option<Self> {
        if !center_row.is_finite() || !center_col.is_finite() {
            return None;
        }

        let (row_min, row_max) = clip_span(center_row.round(), half_size, frame.height)?;
        let (col_min, col_max) = clip_span(center_col.round(), half_size, frame.width)?;

        Some(Self {
            row_min,
            col_min,
            height: row_max - row_min,
            width: col_max - col_min,
        })
    }

    pub fn row_max(&self) -> usize {
        self.row_min + self.height
    }

    pub fn col_max(&self) -> usize {
        self.col_min + self.width
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::from_width_height(self.width, self.height)
    }

    /// View of the window inside `frame`.
    ///
    /// The window must have been built for a frame of this size.
    pub fn view<'a, T>(&self, frame: &ArrayView2<'a, T>) -> ArrayView2<'a, T> {
        frame
            .clone()
            .slice_move(s![self.row_min..self.row_max(), self.col_min..self.col_max()])
    }

    /// Translate a window-local `(row, col)` into full-frame coordinates
    pub fn to_frame(&self, row: usize, col: usize) -> (usize, usize) {
        (row + self.row_min, col + self.col_min)
    }
}

/// Clip `[center - half, center + half]` to `[0, extent)`, returning a half-open span.
fn clip_span(center: f64, half: usize, extent: usize) -> Option<(usize, usize)> {
    let half = half as f64;
    let lo = (center - half).max(0.0);
    let hi = (center + half + 1.0).min(extent as f64);
    if hi <= lo {
        return None;
    }
    Some((lo as usize, hi as usize))
}
