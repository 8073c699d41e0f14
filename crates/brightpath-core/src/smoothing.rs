//! One-dimensional smoothing filters for brightness profiles.
//!
//! A profile is noisy, so each one is smoothed before the wavefront is
//! selected. The filter is chosen by [`SmoothingMode`]. The box filters
//! shorten the curve and shift every index by half a window, which
//! [`SmoothingMode::offset`] reports so callers can map positions back.

use serde::{Deserialize, Serialize};

use crate::types::CoreError;

/// Which filter [`smooth`] applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmoothingMode {
    /// Box filter over `window_size` samples ("valid" convolution).
    #[default]
    MovingAverage,

    /// Gaussian filter of width `sigma`, same length as the input.
    Gaussian,

    /// Central-difference gradient of the moving average.
    Gradient,

    /// No filtering.
    Raw,
}

impl SmoothingMode {
    /// Index shift introduced by the filter for `window_size`.
    #[must_use]
    pub const fn offset(self, window_size: usize) -> usize {
        match self {
            Self::MovingAverage | Self::Gradient => window_size / 2,
            Self::Gaussian | Self::Raw => 0,
        }
    }
}

/// Map a possibly out-of-range index onto `0..len` by mirroring at the
/// edges (`d c b a | a b c d | d c b a`).
///
/// `len` must be non-zero.
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]
pub(crate) const fn reflect_index(index: i64, len: usize) -> usize {
    let n = len as i64;
    let period = 2 * n;
    let m = index.rem_euclid(period);
    (if m < n { m } else { period - 1 - m }) as usize
}

/// Box-filter `data` with a window of `window_size` samples.
///
/// Only fully covered windows are kept, so the output has
/// `data.len() - window_size + 1` samples.
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if `window_size` is zero or
/// larger than `data`.
pub fn moving_average(data: &[f64], window_size: usize) -> Result<Vec<f64>, CoreError> {
    if window_size < 1 {
        return Err(CoreError::invalid("window_size should be at least 1"));
    }
    if window_size > data.len() {
        return Err(CoreError::invalid(format!(
            "window_size {window_size} is larger than the data length {}",
            data.len()
        )));
    }
    #[allow(clippy::cast_precision_loss)]
    let divisor = window_size as f64;
    Ok(data
        .windows(window_size)
        .map(|window| window.iter().sum::<f64>() / divisor)
        .collect())
}

/// Gaussian-smooth `data` with standard deviation `sigma`.
///
/// The kernel is truncated at four standard deviations and the input is
/// mirrored at both ends. A non-positive (or non-finite) `sigma` returns
/// the data unchanged.
#[must_use]
pub fn gaussian_filter(data: &[f64], sigma: f64) -> Vec<f64> {
    if data.is_empty() || !sigma.is_finite() || sigma <= 0.0 {
        return data.to_vec();
    }

    #[allow(clippy::cast_possible_truncation)]
    let radius = (4.0f64.mul_add(sigma, 0.5)).floor() as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let k = k as f64;
            (-0.5 * (k / sigma).powi(2)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();

    (0..data.len())
        .map(|i| {
            #[allow(clippy::cast_possible_wrap)]
            let center = i as i64;
            weights
                .iter()
                .zip(-radius..=radius)
                .map(|(w, k)| w * data[reflect_index(center + k, data.len())])
                .sum::<f64>()
                / total
        })
        .collect()
}

/// Numerical gradient with unit spacing.
///
/// Interior samples use central differences, the two ends one-sided
/// differences. A single sample has gradient zero.
#[must_use]
pub fn gradient(data: &[f64]) -> Vec<f64> {
    match data.len() {
        0 => Vec::new(),
        1 => vec![0.0],
        n => (0..n)
            .map(|i| match i {
                0 => data[1] - data[0],
                i if i == n - 1 => data[n - 1] - data[n - 2],
                i => (data[i + 1] - data[i - 1]) / 2.0,
            })
            .collect(),
    }
}

/// First derivative of the sampled function `ys(xs)` at the sample
/// closest to `target`, by central difference.
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if `xs` and `ys` differ in
/// length, or the closest sample is at either end.
pub fn derivative_at(xs: &[f64], ys: &[f64], target: f64) -> Result<f64, CoreError> {
    if xs.len() != ys.len() {
        return Err(CoreError::invalid(format!(
            "xs has {} samples but ys has {}",
            xs.len(),
            ys.len()
        )));
    }
    let idx = xs
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
        .map(|(i, _)| i)
        .ok_or_else(|| CoreError::invalid("no samples"))?;
    if idx < 1 || idx + 2 > xs.len() {
        return Err(CoreError::invalid(format!(
            "{target} is too close to the boundaries"
        )));
    }
    Ok((ys[idx + 1] - ys[idx - 1]) / (xs[idx + 1] - xs[idx - 1]))
}

/// Apply `mode` to `curve`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if a box filter's
/// `window_size` does not fit the curve.
pub fn smooth(
    curve: &[f64],
    mode: SmoothingMode,
    window_size: usize,
    sigma: f64,
) -> Result<Vec<f64>, CoreError> {
    match mode {
        SmoothingMode::MovingAverage => moving_average(curve, window_size),
        SmoothingMode::Gaussian => Ok(gaussian_filter(curve, sigma)),
        SmoothingMode::Gradient => moving_average(curve, window_size).map(|avg| gradient(&avg)),
        SmoothingMode::Raw => Ok(curve.to_vec()),
    }
}
