// src/selector.rs

use log::debug;
use ndarray::ArrayView1;

use crate::error::VarianceError;

/// Index of the first entry of `cumulative` that is `>= threshold`, or `None`
/// if the threshold is never reached.
///
/// Index `i` means the top `i + 1` components are in use.
pub fn first_index_reaching(cumulative: ArrayView1<f64>, threshold: f64) -> Option<usize> {
    cumulative.iter().position(|&captured| captured >= threshold)
}

/// Smallest number of components whose cumulative explained variance reaches
/// `threshold`.
///
/// `cumulative` is the running-sum vector of a
/// [`VarianceProfile`](crate::profile::VarianceProfile), so `threshold` must be
/// on the same scale (a fraction, not a percentage). The result counts
/// components: if the single largest component already suffices, this returns
/// 1. A threshold at or below zero is met by that first component too.
///
/// # Errors
/// * [`VarianceError::InvalidThreshold`] if `threshold` is NaN.
/// * [`VarianceError::UnsatisfiableThreshold`] if no prefix reaches the
///   threshold, including an empty `cumulative`.
pub fn select_component_count(
    cumulative: ArrayView1<f64>,
    threshold: f64,
) -> Result<usize, VarianceError> {
    if threshold.is_nan() {
        return Err(VarianceError::InvalidThreshold { threshold });
    }
    match first_index_reaching(cumulative, threshold) {
        Some(index) => {
            debug!(
                "Threshold {} reached by {} components (cumulative {}).",
                threshold,
                index + 1,
                cumulative[index]
            );
            Ok(index + 1)
        }
        None => Err(VarianceError::UnsatisfiableThreshold {
            threshold,
            achieved: cumulative.iter().cloned().fold(0.0, f64::max),
        }),
    }
}
