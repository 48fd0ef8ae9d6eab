// src/centering.rs

use float_cmp::approx_eq;
use log::{debug, warn};
use ndarray::{Array2, ArrayView2, Axis};

use crate::error::VarianceError;

/// Standard deviations below this are treated as zero when standardizing.
const ZERO_STD_THRESHOLD: f64 = 1e-9;

/// Fails on the first NaN or infinite entry, reporting its position.
pub fn ensure_finite(data_matrix: ArrayView2<f64>) -> Result<(), VarianceError> {
    match data_matrix
        .indexed_iter()
        .find(|(_, value)| !value.is_finite())
    {
        Some(((row, col), &value)) => Err(VarianceError::NonFiniteInput { row, col, value }),
        None => Ok(()),
    }
}

/// Subtracts each column's arithmetic mean.
///
/// Always succeeds. For input that is already centered this is a no-op up to
/// rounding, so the resulting column means are close to, not exactly, zero.
/// A matrix with no rows is returned unchanged.
pub fn center_columns(data_matrix: ArrayView2<f64>) -> Array2<f64> {
    let mut centered = data_matrix.to_owned();
    if let Some(mean_vector) = data_matrix.mean_axis(Axis(0)) {
        centered -= &mean_vector;
    }
    centered
}

/// True if every column mean is within `epsilon` of zero.
pub fn has_zero_column_means(data_matrix: ArrayView2<f64>, epsilon: f64) -> bool {
    match data_matrix.mean_axis(Axis(0)) {
        Some(means) => means
            .iter()
            .all(|&m| approx_eq!(f64, m, 0.0, epsilon = epsilon)),
        None => true,
    }
}

/// Fails with [`VarianceError::ZeroTotalVariance`] when no column of
/// `centered` varies by more than rounding noise.
///
/// "Noise" is judged against the magnitude of the uncentered `data_matrix`:
/// subtracting a mean like 0.1 leaves residues around 1e-17, which must not be
/// mistaken for a real spectrum.
pub fn ensure_nonzero_variance(
    data_matrix: ArrayView2<f64>,
    centered: ArrayView2<f64>,
) -> Result<(), VarianceError> {
    let data_scale = data_matrix
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let largest_std = centered
        .map_axis(Axis(0), |column| column.std(0.0))
        .iter()
        .cloned()
        .fold(0.0_f64, f64::max);
    if largest_std <= ZERO_STD_THRESHOLD * data_scale {
        debug!(
            "Largest column standard deviation {:e} is noise at data scale {:e}.",
            largest_std, data_scale
        );
        return Err(VarianceError::ZeroTotalVariance);
    }
    Ok(())
}

/// Z-scores each column: subtract the mean, divide by the population standard
/// deviation (ddof = 0).
///
/// Columns whose standard deviation is effectively zero are divided by 1.0
/// instead, which leaves them as all zeros after centering.
pub fn standardize_columns(data_matrix: ArrayView2<f64>) -> Array2<f64> {
    let mut standardized = center_columns(data_matrix);
    if standardized.nrows() == 0 {
        return standardized;
    }

    let std_dev_vector = standardized.map_axis(Axis(0), |column| column.std(0.0));
    let constant_columns = std_dev_vector
        .iter()
        .filter(|&&s| s.abs() < ZERO_STD_THRESHOLD)
        .count();
    if constant_columns > 0 {
        warn!(
            "{} of {} columns have zero variance; they are left at zero after standardization.",
            constant_columns,
            standardized.ncols()
        );
    }

    let sanitized_scale_vector =
        std_dev_vector.mapv(|val| if val.abs() < ZERO_STD_THRESHOLD { 1.0 } else { val });
    standardized /= &sanitized_scale_vector;
    debug!(
        "Standardized {} x {} matrix.",
        standardized.nrows(),
        standardized.ncols()
    );
    standardized
}
