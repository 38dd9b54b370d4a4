//! Frame buffers, views and `image` crate conversions

use crate::image_size::ImageSize;
use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayView2, ShapeBuilder};
use thiserror::Error;

/// Errors building a frame view over a raw buffer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("row stride {stride} is smaller than frame width {width}")]
    StrideTooSmall { stride: usize, width: usize },
    #[error("buffer holds {actual} bytes, a {size} frame with stride {stride} needs {required}")]
    BufferTooShort {
        size: ImageSize,
        stride: usize,
        required: usize,
        actual: usize,
    },
}

/// Borrow a raw 8-bit row-major buffer as a `(height, width)` view.
///
/// `stride` is the distance in bytes between the starts of consecutive rows;
/// pass `size.width` for tightly packed frames. No pixels are copied.
pub fn frame_view(
    buffer: &[u8],
    size: ImageSize,
    stride: usize,
) -> Result<ArrayView2<'_, u8>, FrameError> {
    if stride < size.width {
        return Err(FrameError::StrideTooSmall {
            stride,
            width: size.width,
        });
    }

    let required = if size.is_empty() {
        0
    } else {
        (size.height - 1) * stride + size.width
    };
    if buffer.len() < required {
        return Err(FrameError::BufferTooShort {
            size,
            stride,
            required,
            actual: buffer.len(),
        });
    }

    let view = ArrayView2::from_shape(size.shape().strides((stride, 1)), &buffer[..required])
        .map_err(|_| FrameError::BufferTooShort {
            size,
            stride,
            required,
            actual: buffer.len(),
        })?;
    Ok(view)
}

/// Converts an `(height, width)` array view into an `image::GrayImage`.
///
/// Array index `[row, col]` maps to pixel `(x = col, y = row)`.
pub fn array_to_gray_image(arr: &ArrayView2<u8>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut img = GrayImage::new(width as u32, height as u32);

    for ((row, col), &value) in arr.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([value]));
    }

    img
}

/// Converts an `image::GrayImage` into an owned `(height, width)` array
pub fn gray_image_to_array(img: &GrayImage) -> Array2<u8> {
    let (width, height) = img.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        img.get_pixel(col as u32, row as u32)[0]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_frame_view() {
        let buffer: Vec<u8> = (0..12).collect();
        let view = frame_view(&buffer, ImageSize::from_width_height(4, 3), 4).unwrap();

        assert_eq!(view.dim(), (3, 4));
        assert_eq!(view[[0, 0]], 0);
        assert_eq!(view[[1, 0]], 4);
        assert_eq!(view[[2, 3]], 11);
    }

    #[test]
    fn test_padded_frame_view() {
        // 3 pixels per row, 5 bytes per row, padding bytes are 255
        let buffer = [1, 2, 3, 255, 255, 4, 5, 6, 255, 255, 7, 8, 9];
        let view = frame_view(&buffer, ImageSize::from_width_height(3, 3), 5).unwrap();

        assert_eq!(view.row(1).to_vec(), vec![4, 5, 6]);
        assert_eq!(view.column(2).to_vec(), vec![3, 6, 9]);
        assert!(view.iter().all(|&v| v != 255));
    }

    #[test]
    fn test_frame_view_rejects_bad_geometry() {
        let buffer = [0u8; 10];
        assert_eq!(
            frame_view(&buffer, ImageSize::from_width_height(4, 2), 3),
            Err(FrameError::StrideTooSmall { stride: 3, width: 4 })
        );
        assert!(matches!(
            frame_view(&buffer, ImageSize::from_width_height(4, 3), 4),
            Err(FrameError::BufferTooShort { required: 12, actual: 10, .. })
        ));
    }

    #[test]
    fn test_gray_image_conversion() {
        let arr = Array2::from_shape_fn((2, 3), |(row, col)| (row * 10 + col) as u8);
        let img = array_to_gray_image(&arr.view());

        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1)[0], 12);
        assert_eq!(gray_image_to_array(&img), arr);
    }
}
