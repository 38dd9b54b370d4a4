//! Sub-pixel limb localization along a single chord
//!
//! A chord is one row or column of the frame. Walking it from the start, a
//! rising crossing is recorded where the previous sample is below the
//! threshold and the current one is at or above it, and a falling crossing
//! on the reverse transition. Each crossing is refined by an ordinary
//! least-squares line through the samples in `[k - w, k + w)` (clipped to
//! the chord) solved for the threshold level. The scan then resumes at the
//! end of that window so the same limb cannot trigger twice.
//!
//! A usable chord has exactly one rising then one falling crossing; its
//! center is the midpoint of the two refined positions.

use crate::config::{finite, non_zero, ConfigError};
use ndarray::ArrayView1;
use std::fmt;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingDirection {
    Rising,
    Falling,
}

/// A threshold crossing refined to sub-pixel precision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCrossing {
    /// First sample on the far side of the threshold
    pub index: usize,
    /// Fitted position where the intensity equals the threshold
    pub position: f64,
    pub direction: CrossingDirection,
}

/// Least-squares line `intensity = slope * index + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    /// Fit over `(x, y)` samples. Needs two distinct x values.
    pub fn least_squares<I>(samples: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (mut n, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (x, y) in samples {
            n += 1.0;
            sx += x;
            sy += y;
            sxx += x * x;
            sxy += x * y;
        }

        let denominator = n * sxx - sx * sx;
        if n < 2.0 || denominator == 0.0 {
            return None;
        }

        let slope = (n * sxy - sx * sy) / denominator;
        let intercept = (sy - slope * sx) / n;
        Some(Self { slope, intercept })
    }

    /// Position where the line reaches `level`; `None` for a flat fit
    pub fn solve_for(&self, level: f64) -> Option<f64> {
        if self.slope.abs() <= f64::EPSILON {
            return None;
        }
        let position = (level - self.intercept) / self.slope;
        position.is_finite().then_some(position)
    }
}

/// Why a chord produced no center
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordRejection {
    /// Not exactly two crossings (limb out of view, occlusion, noise)
    CrossingCount(usize),
    /// Two crossings, but falling before rising
    Order,
    /// The line fit at this crossing was degenerate
    UnresolvedCrossing { index: usize },
}

impl fmt::Display for ChordRejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChordRejection::CrossingCount(count) => write!(f, "{count} crossings"),
            ChordRejection::Order => write!(f, "falling before rising"),
            ChordRejection::UnresolvedCrossing { index } => {
                write!(f, "degenerate fit at index {index}")
            }
        }
    }
}

/// Threshold-crossing edge finder for 1-D intensity profiles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeLocalizer {
    threshold: f64,
    half_width: NonZeroUsize,
}

impl EdgeLocalizer {
    /// Create a localizer
    ///
    /// # Arguments
    /// * `threshold` - Intensity level that separates limb from background
    /// * `half_width` - Samples on either side of a crossing used by the line fit
    ///
    /// # Returns
    /// * `Ok(EdgeLocalizer)` - For a finite threshold and a non-zero half-width
    /// * `Err(ConfigError)` - Otherwise
    pub fn new(threshold: f64, half_width: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            threshold: finite(threshold, "edge threshold")?,
            half_width: non_zero(half_width, "fit half-width")?,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn half_width(&self) -> usize {
        self.half_width.get()
    }

    /// Fit window `[k - w, k + w)` clipped to `[0, len)`
    fn window(&self, index: usize, len: usize) -> (usize, usize) {
        let w = self.half_width.get();
        (index.saturating_sub(w), index.saturating_add(w).min(len))
    }

    fn refine(&self, chord: &ArrayView1<u8>, start: usize, end: usize) -> Option<f64> {
        let samples = (start..end).map(|i| (i as f64, f64::from(chord[i])));
        LineFit::least_squares(samples)?.solve_for(self.threshold)
    }

    /// All refined crossings along the chord, in scan order
    pub fn crossings(&self, chord: ArrayView1<u8>) -> Result<Vec<EdgeCrossing>, ChordRejection> {
        let len = chord.len();
        let mut crossings = Vec::new();
        if len < 2 {
            return Ok(crossings);
        }

        let threshold = self.threshold;
        let mut previous = f64::from(chord[0]);
        let mut k = 1;

        while k < len {
            let current = f64::from(chord[k]);
            let direction = if previous < threshold && current >= threshold {
                Some(CrossingDirection::Rising)
            } else if previous >= threshold && current < threshold {
                Some(CrossingDirection::Falling)
            } else {
                None
            };

            let Some(direction) = direction else {
                previous = current;
                k += 1;
                continue;
            };

            let (start, end) = self.window(k, len);
            let position = self
                .refine(&chord, start, end)
                .ok_or(ChordRejection::UnresolvedCrossing { index: k })?;
            crossings.push(EdgeCrossing {
                index: k,
                position,
                direction,
            });

            let resume = end.max(k + 1);
            if resume >= len {
                break;
            }
            previous = f64::from(chord[resume - 1]);
            k = resume;
        }

        Ok(crossings)
    }

    /// Sub-pixel chord center: midpoint of the rising and falling limb
    pub fn locate(&self, chord: ArrayView1<u8>) -> Result<f64, ChordRejection> {
        match self.crossings(chord)?.as_slice() {
            [rising, falling]
                if rising.direction == CrossingDirection::Rising
                    && falling.direction == CrossingDirection::Falling =>
            {
                Ok(0.5 * (rising.position + falling.position))
            }
            [_, _] => Err(ChordRejection::Order),
            other => Err(ChordRejection::CrossingCount(other.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;

    /// Trapezoid with 10 counts/pixel ramps crossing 125 at 50.3 and 150.3
    fn ramp_chord() -> Array1<u8> {
        Array1::from_shape_fn(200, |i| {
            let x = i as f64;
            (10.0 * x - 378.0).min(1628.0 - 10.0 * x).clamp(0.0, 255.0) as u8
        })
    }

    fn step_chord(levels: &[(u8, usize)]) -> Array1<u8> {
        levels
            .iter()
            .flat_map(|&(level, count)| std::iter::repeat(level).take(count))
            .collect()
    }

    #[test]
    fn test_line_fit_exact() {
        let fit = LineFit::least_squares([(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
        assert_abs_diff_eq!(fit.slope, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.intercept, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.solve_for(4.0).unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_line_fit_degenerate() {
        assert!(LineFit::least_squares([(1.0, 3.0)]).is_none());
        assert!(LineFit::least_squares([(1.0, 3.0), (1.0, 5.0)]).is_none());

        let flat = LineFit::least_squares([(0.0, 7.0), (1.0, 7.0)]).unwrap();
        assert!(flat.solve_for(7.0).is_none());
    }

    #[test]
    fn test_ramp_edges_recovered_for_all_half_widths() {
        let chord = ramp_chord();
        for half_width in 1..=10 {
            let localizer = EdgeLocalizer::new(125.0, half_width).unwrap();
            let crossings = localizer.crossings(chord.view()).unwrap();

            assert_eq!(crossings.len(), 2, "half-width {half_width}");
            assert_eq!(crossings[0].direction, CrossingDirection::Rising);
            assert_eq!(crossings[0].index, 51);
            assert_abs_diff_eq!(crossings[0].position, 50.3, epsilon = 1e-9);
            assert_eq!(crossings[1].direction, CrossingDirection::Falling);
            assert_eq!(crossings[1].index, 151);
            assert_abs_diff_eq!(crossings[1].position, 150.3, epsilon = 1e-9);

            let center = localizer.locate(chord.view()).unwrap();
            assert_abs_diff_eq!(center, 100.3, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_symmetric_step_lands_between_pixels() {
        // Background 50, disk 200: the threshold is the midpoint, so each
        // fitted limb sits half a pixel outside the first/last disk pixel.
        let chord = step_chord(&[(50, 20), (200, 31), (50, 20)]);
        let localizer = EdgeLocalizer::new(125.0, 3).unwrap();
        let crossings = localizer.crossings(chord.view()).unwrap();

        assert_abs_diff_eq!(crossings[0].position, 19.5, epsilon = 1e-9);
        assert_abs_diff_eq!(crossings[1].position, 50.5, epsilon = 1e-9);
        assert_abs_diff_eq!(localizer.locate(chord.view()).unwrap(), 35.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_chord_rejected() {
        let chord = Array1::from_elem(64, 50u8);
        let localizer = EdgeLocalizer::new(125.0, 3).unwrap();
        assert_eq!(
            localizer.locate(chord.view()),
            Err(ChordRejection::CrossingCount(0))
        );
    }

    #[test]
    fn test_occluded_chord_rejected() {
        // Dark mark splits the disk chord into two segments
        let chord = step_chord(&[(50, 20), (200, 20), (40, 5), (200, 20), (50, 20)]);
        let localizer = EdgeLocalizer::new(125.0, 2).unwrap();
        assert_eq!(
            localizer.locate(chord.view()),
            Err(ChordRejection::CrossingCount(4))
        );
    }

    #[test]
    fn test_falling_before_rising_rejected() {
        let chord = step_chord(&[(200, 10), (50, 10), (200, 10)]);
        let localizer = EdgeLocalizer::new(125.0, 1).unwrap();
        assert_eq!(localizer.locate(chord.view()), Err(ChordRejection::Order));
    }

    #[test]
    fn test_limb_cut_by_frame_edge_rejected() {
        // Disk runs off the end of the chord: only the rising limb is seen
        let chord = step_chord(&[(50, 30), (200, 30)]);
        let localizer = EdgeLocalizer::new(125.0, 3).unwrap();
        assert_eq!(
            localizer.locate(chord.view()),
            Err(ChordRejection::CrossingCount(1))
        );
    }

    #[test]
    fn test_short_chords() {
        let localizer = EdgeLocalizer::new(125.0, 3).unwrap();
        let empty = Array1::<u8>::zeros(0);
        let single = Array1::from_elem(1, 200u8);

        assert_eq!(localizer.crossings(empty.view()).unwrap(), vec![]);
        assert_eq!(localizer.crossings(single.view()).unwrap(), vec![]);
    }

    #[test]
    fn test_oversized_window_covers_whole_chord() {
        let localizer = EdgeLocalizer::new(100.0, usize::MAX).unwrap();
        let chord = step_chord(&[(0, 10), (200, 10)]);

        let crossings = localizer.crossings(chord.view()).unwrap();
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].direction, CrossingDirection::Rising);
        assert_eq!(
            localizer.locate(chord.view()),
            Err(ChordRejection::CrossingCount(1))
        );
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            EdgeLocalizer::new(125.0, 0),
            Err(ConfigError::Zero { .. })
        ));
        assert!(matches!(
            EdgeLocalizer::new(f64::NAN, 3),
            Err(ConfigError::NonFinite { .. })
        ));
    }
}
