// src/profile.rs

use log::debug;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::VarianceError;

/// Explained-variance profile of a spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceProfile {
    /// Fraction of total variance per component, non-increasing, sums to 1.
    pub percentages: Array1<f64>,
    /// Inclusive running sum of `percentages`, capped at 1. Non-decreasing,
    /// last entry exactly 1.
    /// `cumulative[i]` is the variance captured by the top `i + 1` components.
    pub cumulative: Array1<f64>,
}

impl VarianceProfile {
    pub fn len(&self) -> usize {
        self.percentages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.percentages.is_empty()
    }

    /// Variance captured by the top `k` components. Zero for `k == 0`,
    /// saturates at the full total for `k` past the end. An empty profile
    /// captures nothing.
    pub fn captured_by(&self, k: usize) -> f64 {
        match k {
            _ if self.cumulative.is_empty() => 0.0,
            0 => 0.0,
            k => self.cumulative[k.min(self.cumulative.len()) - 1],
        }
    }
}

/// Turns variance magnitudes into an explained-variance profile.
///
/// Takes absolute values, sorts descending, divides by the total, and forms the
/// running sum. The last cumulative entry is exactly 1, so a target of 1.0 is
/// always reachable. Depends only on the multiset of magnitudes, not their order,
/// and is invariant to scaling the input by any nonzero constant.
///
/// # Errors
/// * [`VarianceError::EmptyMagnitudes`] for an empty input.
/// * [`VarianceError::NonFiniteMagnitude`] if any entry is NaN or infinite.
/// * [`VarianceError::ZeroTotalVariance`] if every entry is zero.
pub fn explained_variance_profile(
    magnitudes: ArrayView1<f64>,
) -> Result<VarianceProfile, VarianceError> {
    if magnitudes.is_empty() {
        return Err(VarianceError::EmptyMagnitudes);
    }
    if let Some((index, &value)) = magnitudes.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(VarianceError::NonFiniteMagnitude { index, value });
    }

    let mut sorted: Vec<f64> = magnitudes.iter().map(|v| v.abs()).collect();
    sorted.sort_unstable_by(|a, b| b.total_cmp(a));

    // Scale by the largest entry first so the sum stays finite near f64::MAX.
    let largest = sorted[0];
    if largest == 0.0 {
        return Err(VarianceError::ZeroTotalVariance);
    }
    let relative: Vec<f64> = sorted.into_iter().map(|v| v / largest).collect();
    let total: f64 = relative.iter().sum();
    debug!(
        "Normalizing {} magnitudes with total variance {} (largest {}).",
        relative.len(),
        total * largest,
        largest
    );

    let percentages: Array1<f64> = relative.into_iter().map(|v| v / total).collect();
    let mut cumulative: Array1<f64> = percentages
        .iter()
        .scan(0.0_f64, |running, &p| {
            *running += p;
            Some(running.min(1.0))
        })
        .collect();
    // The full spectrum captures all of the variance, rounding aside.
    let last = cumulative.len() - 1;
    cumulative[last] = 1.0;

    Ok(VarianceProfile {
        percentages,
        cumulative,
    })
}
