//! 1-D grayscale morphology on projection profiles
//!
//! All operators use a flat, symmetric structuring element spanning
//! `width / 2` samples on either side of the center (so an even `width`
//! behaves like `width + 1`). Windows are clipped at the profile ends.

use serde::{Deserialize, Serialize};

/// Contrast of the marks a top-hat filter should isolate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkPolarity {
    /// Marks brighter than their surroundings
    Bright,
    /// Marks darker than their surroundings (engraved fiducials on the disk)
    #[default]
    Dark,
}

fn sliding<F>(profile: &[f64], width: usize, pick: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64,
{
    let half = width / 2;
    let len = profile.len();
    (0..len)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = i.saturating_add(half).saturating_add(1).min(len);
            profile[lo..hi]
                .iter()
                .copied()
                .fold(profile[i], |acc, v| pick(acc, v))
        })
        .collect()
}

/// Sliding-window minimum
pub fn erode(profile: &[f64], width: usize) -> Vec<f64> {
    sliding(profile, width, f64::min)
}

/// Sliding-window maximum
pub fn dilate(profile: &[f64], width: usize) -> Vec<f64> {
    sliding(profile, width, f64::max)
}

/// Erosion followed by dilation; removes bright features narrower than the window
pub fn open(profile: &[f64], width: usize) -> Vec<f64> {
    dilate(&erode(profile, width), width)
}

/// Dilation followed by erosion; fills dark features narrower than the window
pub fn close(profile: &[f64], width: usize) -> Vec<f64> {
    erode(&dilate(profile, width), width)
}

/// `f - open(f)`: narrow bright features over the local background
pub fn white_top_hat(profile: &[f64], width: usize) -> Vec<f64> {
    profile
        .iter()
        .zip(open(profile, width))
        .map(|(&f, o)| f - o)
        .collect()
}

/// `close(f) - f`: narrow dark features below the local background
pub fn black_top_hat(profile: &[f64], width: usize) -> Vec<f64> {
    close(profile, width)
        .into_iter()
        .zip(profile)
        .map(|(c, &f)| c - f)
        .collect()
}

/// Top-hat for the given polarity. The output is non-negative and peaks on marks.
pub fn top_hat(profile: &[f64], width: usize, polarity: MarkPolarity) -> Vec<f64> {
    match polarity {
        MarkPolarity::Bright => white_top_hat(profile, width),
        MarkPolarity::Dark => black_top_hat(profile, width),
    }
}
