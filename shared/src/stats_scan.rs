//! StatsScan - running statistics over floating point samples
//!
//! Tracks min, max, sum and sum of squares so that mean, variance and
//! standard deviation are available after a single pass. Samples can be fed
//! from a slice, an iterator, or one at a time with [`StatsScan::push`].
//!
//! NaN detection stops accumulation; every accessor then reports the index
//! of the first NaN instead of a silently poisoned value.

use num_traits::float::Float;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error types for StatsScan operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("NaN value encountered at index {0}")]
    NaNEncountered(usize),
    #[error("No data provided (empty slice)")]
    NoData,
    #[error("{mode} deviation needs at least {required} samples, got {count}")]
    InsufficientSamples {
        mode: StdDevMode,
        count: usize,
        required: usize,
    },
}

/// Denominator used for variance and standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdDevMode {
    /// Divide by `n - 1` (Bessel-corrected sample variance)
    #[default]
    Sample,
    /// Divide by `n`
    Population,
}

impl StdDevMode {
    /// Minimum number of samples for which the variance is defined
    pub fn min_samples(self) -> usize {
        match self {
            StdDevMode::Sample => 2,
            StdDevMode::Population => 1,
        }
    }
}

impl fmt::Display for StdDevMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StdDevMode::Sample => write!(f, "sample"),
            StdDevMode::Population => write!(f, "population"),
        }
    }
}

/// Running statistics over floating point data
#[derive(Debug, Clone)]
pub struct StatsScan<T: Float> {
    min_value: Option<T>,
    max_value: Option<T>,
    sum: T,
    sum_sq: T,
    count: usize,
    seen: usize,
    nan_index: Option<usize>,
}

impl<T: Float> Default for StatsScan<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Float> FromIterator<T> for StatsScan<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut scan = Self::empty();
        for value in iter {
            if scan.has_nan() {
                break;
            }
            scan.push(value);
        }
        scan
    }
}

impl<T: Float> StatsScan<T> {
    /// An accumulator with no samples
    pub fn empty() -> Self {
        Self {
            min_value: None,
            max_value: None,
            sum: T::zero(),
            sum_sq: T::zero(),
            count: 0,
            seen: 0,
            nan_index: None,
        }
    }

    /// Compute statistics over a slice in one pass
    pub fn new(data: &[T]) -> Self {
        data.iter().copied().collect()
    }

    /// Add one sample.
    ///
    /// After the first NaN all further samples are ignored.
    pub fn push(&mut self, value: T) {
        if self.nan_index.is_some() {
            return;
        }

        let index = self.seen;
        self.seen += 1;

        if value.is_nan() {
            self.nan_index = Some(index);
            return;
        }

        self.sum = self.sum + value;
        self.sum_sq = self.sum_sq + value * value;
        self.count += 1;

        self.min_value = Some(self.min_value.map_or(value, |min| min.min(value)));
        self.max_value = Some(self.max_value.map_or(value, |max| max.max(value)));
    }

    fn check(&self) -> Result<(), StatsError> {
        match self.nan_index {
            Some(index) => Err(StatsError::NaNEncountered(index)),
            None if self.count == 0 => Err(StatsError::NoData),
            None => Ok(()),
        }
    }

    pub fn min(&self) -> Result<T, StatsError> {
        self.check()?;
        self.min_value.ok_or(StatsError::NoData)
    }

    pub fn max(&self) -> Result<T, StatsError> {
        self.check()?;
        self.max_value.ok_or(StatsError::NoData)
    }

    /// Both extremes as `(min, max)`
    pub fn min_max(&self) -> Result<(T, T), StatsError> {
        Ok((self.min()?, self.max()?))
    }

    pub fn sum(&self) -> Result<T, StatsError> {
        self.check()?;
        Ok(self.sum)
    }

    pub fn sum_of_squares(&self) -> Result<T, StatsError> {
        self.check()?;
        Ok(self.sum_sq)
    }

    pub fn mean(&self) -> Result<T, StatsError> {
        self.check()?;
        Ok(self.sum / count_as(self.count))
    }

    /// Number of accumulated (non-NaN) samples
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn has_nan(&self) -> bool {
        self.nan_index.is_some()
    }

    /// Variance from the accumulated sums: `(sum_sq - n * mean^2) / d`,
    /// with `d = n - 1` or `d = n` depending on `mode`.
    ///
    /// Rounding can push the numerator slightly below zero for constant
    /// data, so the result is clamped at zero.
    pub fn variance(&self, mode: StdDevMode) -> Result<T, StatsError> {
        let mean = self.mean()?;
        let required = mode.min_samples();
        if self.count < required {
            return Err(StatsError::InsufficientSamples {
                mode,
                count: self.count,
                required,
            });
        }

        let n: T = count_as(self.count);
        let denominator = match mode {
            StdDevMode::Sample => n - T::one(),
            StdDevMode::Population => n,
        };
        let numerator = self.sum_sq - n * mean * mean;
        Ok((numerator / denominator).max(T::zero()))
    }

    pub fn std_dev(&self, mode: StdDevMode) -> Result<T, StatsError> {
        Ok(self.variance(mode)?.sqrt())
    }

    /// Detection threshold `mean + k * sigma`
    pub fn sigma_threshold(&self, k: T, mode: StdDevMode) -> Result<T, StatsError> {
        Ok(self.mean()? + k * self.std_dev(mode)?)
    }
}

fn count_as<T: Float>(count: usize) -> T {
    T::from(count).unwrap_or_else(T::max_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basic_stats_f64() {
        let scanner = StatsScan::<f64>::new(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]);

        assert_eq!(scanner.min_max().unwrap(), (1.0, 9.0));
        assert_eq!(scanner.count(), 8);
        assert_relative_eq!(scanner.mean().unwrap(), 3.875);
        assert_relative_eq!(scanner.sum().unwrap(), 31.0);
    }

    #[test]
    fn test_variance_modes() {
        // Mean 5, population variance 4, sample variance 32/7
        let data = [2.0_f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let scanner = StatsScan::new(&data);

        assert_relative_eq!(scanner.variance(StdDevMode::Population).unwrap(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(scanner.std_dev(StdDevMode::Population).unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(scanner.variance(StdDevMode::Sample).unwrap(), 32.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_push_matches_slice() {
        let data = [0.5_f64, -1.25, 8.0, 3.0];
        let mut pushed = StatsScan::empty();
        for &value in &data {
            pushed.push(value);
        }
        let sliced = StatsScan::new(&data);

        assert_eq!(pushed.count(), sliced.count());
        assert_relative_eq!(pushed.mean().unwrap(), sliced.mean().unwrap());
        assert_relative_eq!(
            pushed.sum_of_squares().unwrap(),
            sliced.sum_of_squares().unwrap()
        );
    }

    #[test]
    fn test_single_sample_deviation() {
        let scanner = StatsScan::<f64>::new(&[42.0]);

        assert_eq!(scanner.mean().unwrap(), 42.0);
        assert_eq!(scanner.std_dev(StdDevMode::Population).unwrap(), 0.0);
        assert_eq!(
            scanner.std_dev(StdDevMode::Sample),
            Err(StatsError::InsufficientSamples {
                mode: StdDevMode::Sample,
                count: 1,
                required: 2,
            })
        );
    }

    #[test]
    fn test_constant_data_has_zero_deviation() {
        let scanner: StatsScan<f64> = std::iter::repeat(24200.0).take(121).collect();
        assert_eq!(scanner.std_dev(StdDevMode::Population).unwrap(), 0.0);
        assert_eq!(
            scanner.sigma_threshold(3.0, StdDevMode::Population).unwrap(),
            24200.0
        );
    }

    #[test]
    fn test_nan_handling() {
        let scanner = StatsScan::<f64>::new(&[1.0, 2.0, f64::NAN, 3.0, 4.0]);

        assert!(scanner.has_nan());
        assert_eq!(scanner.count(), 2);
        assert_eq!(scanner.min(), Err(StatsError::NaNEncountered(2)));
        assert_eq!(scanner.mean(), Err(StatsError::NaNEncountered(2)));
        assert_eq!(
            scanner.variance(StdDevMode::Population),
            Err(StatsError::NaNEncountered(2))
        );
    }

    #[test]
    fn test_no_data() {
        let scanner = StatsScan::<f64>::new(&[]);

        assert_eq!(scanner.min(), Err(StatsError::NoData));
        assert_eq!(scanner.mean(), Err(StatsError::NoData));
        assert_eq!(scanner.std_dev(StdDevMode::Population), Err(StatsError::NoData));
        assert_eq!(scanner.count(), 0);
    }

    #[test]
    fn test_f32_support() {
        let scanner = StatsScan::<f32>::new(&[1.0, 2.0, 3.0]);
        assert!((scanner.mean().unwrap() - 2.0).abs() < 1e-6);
        assert!((scanner.std_dev(StdDevMode::Sample).unwrap() - 1.0).abs() < 1e-6);
    }
}
