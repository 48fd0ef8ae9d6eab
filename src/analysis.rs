// src/analysis.rs

use log::{debug, info, warn};
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::centering::{
    center_columns, ensure_finite, ensure_nonzero_variance, has_zero_column_means,
    standardize_columns,
};
use crate::error::VarianceError;
use crate::linalg_backends::LinAlgBackendProvider;
use crate::profile::{explained_variance_profile, VarianceProfile};
use crate::selector::select_component_count;
use crate::spectrum::{
    spectrum_extractor, CovarianceSpectrum, SpectrumExtractor, SpectrumMethod, SvdSpectrum,
};

/// Settings for [`analyze_explained_variance`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarianceAnalysisConfig {
    /// Decomposition used to obtain the spectrum.
    pub method: SpectrumMethod,
    /// Fraction of total variance, in [0, 1], the selected components must capture.
    pub target_variance: f64,
    /// Z-score the columns before centering. Leave off when the input has
    /// already been standardized.
    pub standardize: bool,
    /// Column means within this distance of zero count as centered.
    pub centering_tolerance: f64,
}

impl Default for VarianceAnalysisConfig {
    fn default() -> Self {
        Self {
            method: SpectrumMethod::Covariance,
            target_variance: 0.90,
            standardize: false,
            centering_tolerance: 1e-9,
        }
    }
}

/// Everything an explained-variance run produces, in plain array form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceReport {
    pub method: SpectrumMethod,
    pub n_samples: usize,
    pub n_features: usize,
    /// Covariance eigenvalues, absolute, in descending order.
    pub eigenvalues: Array1<f64>,
    pub profile: VarianceProfile,
    /// Number of leading components reaching `target_variance`.
    pub selected_components: usize,
    pub target_variance: f64,
}

/// Validates and centers `data_matrix` (rows = samples, columns = features),
/// standardizing first if `standardize` is set.
///
/// Data whose only variation is rounding noise is rejected with
/// [`VarianceError::ZeroTotalVariance`] whether or not it is standardized.
pub fn prepare_matrix(
    data_matrix: ArrayView2<f64>,
    standardize: bool,
    centering_tolerance: f64,
) -> Result<ndarray::Array2<f64>, VarianceError> {
    let (n_samples, n_features) = data_matrix.dim();
    if n_samples == 0 || n_features == 0 {
        return Err(VarianceError::EmptyMatrix { n_samples, n_features });
    }
    if n_samples < 2 {
        return Err(VarianceError::InsufficientSamples { n_samples });
    }
    ensure_finite(data_matrix)?;
    ensure_nonzero_variance(data_matrix, center_columns(data_matrix).view())?;

    let centered = if standardize {
        center_columns(standardize_columns(data_matrix).view())
    } else {
        center_columns(data_matrix)
    };
    if !has_zero_column_means(centered.view(), centering_tolerance) {
        warn!(
            "Column means after centering exceed tolerance {}; input values may be very large.",
            centering_tolerance
        );
    }
    Ok(centered)
}

/// Runs the whole chain on one dataset: center, extract the spectrum with the
/// configured method, build the profile, select the component count.
///
/// # Errors
/// Any precondition failure, decomposition failure, or an unreachable
/// `target_variance` is returned as-is.
pub fn analyze_explained_variance(
    data_matrix: ArrayView2<f64>,
    config: &VarianceAnalysisConfig,
) -> Result<VarianceReport, VarianceError> {
    let (n_samples, n_features) = data_matrix.dim();
    info!(
        "Explained variance analysis of {} samples x {} features using {} ({} backend).",
        n_samples,
        n_features,
        config.method,
        LinAlgBackendProvider::new().name()
    );

    let centered = prepare_matrix(data_matrix, config.standardize, config.centering_tolerance)?;
    let spectrum = spectrum_extractor(config.method)
        .extract(centered.view())?
        .sorted_by_magnitude();
    let profile = explained_variance_profile(spectrum.magnitudes.view())?;
    let selected_components = select_component_count(profile.cumulative.view(), config.target_variance)?;

    info!(
        "{} of {} components capture {:.4} of the variance (target {}).",
        selected_components,
        n_features,
        profile.captured_by(selected_components),
        config.target_variance
    );

    Ok(VarianceReport {
        method: config.method,
        n_samples,
        n_features,
        eigenvalues: spectrum.magnitudes,
        profile,
        selected_components,
        target_variance: config.target_variance,
    })
}

/// How closely the covariance and SVD paths agree on one centered matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumAgreement {
    pub covariance: VarianceProfile,
    pub svd: VarianceProfile,
    /// Largest absolute difference between the two percentage vectors.
    pub max_percentage_diff: f64,
    /// Largest absolute difference between the two cumulative vectors.
    pub max_cumulative_diff: f64,
}

impl SpectrumAgreement {
    pub fn agrees_within(&self, tolerance: f64) -> bool {
        self.max_percentage_diff <= tolerance && self.max_cumulative_diff <= tolerance
    }
}

fn max_abs_diff(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Profiles `centered` with both extractors and measures their disagreement.
pub fn compare_spectrum_methods(
    centered: ArrayView2<f64>,
) -> Result<SpectrumAgreement, VarianceError> {
    let cov_spectrum = CovarianceSpectrum::new()
        .with_directions(false)
        .extract(centered)?;
    let svd_spectrum = SvdSpectrum::new().extract(centered)?;

    let covariance = explained_variance_profile(cov_spectrum.magnitudes.view())?;
    let svd = explained_variance_profile(svd_spectrum.magnitudes.view())?;

    let max_percentage_diff = max_abs_diff(&covariance.percentages, &svd.percentages);
    let max_cumulative_diff = max_abs_diff(&covariance.cumulative, &svd.cumulative);
    debug!(
        "Covariance vs SVD profiles: max percentage diff {:e}, max cumulative diff {:e}.",
        max_percentage_diff, max_cumulative_diff
    );

    Ok(SpectrumAgreement {
        covariance,
        svd,
        max_percentage_diff,
        max_cumulative_diff,
    })
}
