// src/spectrum.rs

//! Variance spectra of a centered data matrix.
//!
//! Two interchangeable extractors produce the same quantity, the eigenvalues of
//! the sample covariance `XᵗX / (n-1)`:
//!
//! * [`CovarianceSpectrum`] builds the d×d covariance and eigendecomposes it.
//! * [`SvdSpectrum`] takes the SVD of X directly and converts each singular
//!   value with [`singular_values_to_eigenvalues`].

use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::VarianceError;
use crate::linalg_backends::{BackendEigh, BackendSVD, LinAlgBackendProvider};

/// Which decomposition produced a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpectrumMethod {
    /// Eigendecomposition of the sample covariance matrix.
    #[default]
    Covariance,
    /// Singular value decomposition of the centered data matrix.
    Svd,
}

impl fmt::Display for SpectrumMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectrumMethod::Covariance => write!(f, "covariance eigendecomposition"),
            SpectrumMethod::Svd => write!(f, "singular value decomposition"),
        }
    }
}

/// Variance magnitudes of a centered matrix, optionally paired with their
/// principal directions.
///
/// The order of `magnitudes` is whatever the decomposition returned. Use
/// [`Spectrum::sorted_by_magnitude`] before relying on any ordering.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub method: SpectrumMethod,
    /// Covariance eigenvalues (or their equivalent). Length d.
    pub magnitudes: Array1<f64>,
    /// Unit-length directions in feature space, one column per magnitude.
    /// Shape: `(d, d)` when present.
    pub directions: Option<Array2<f64>>,
    /// Number of samples the spectrum was estimated from.
    pub n_samples: usize,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Returns a copy ordered by descending absolute magnitude, with each
    /// direction column moved together with its magnitude. Magnitudes in the
    /// result are absolute values. Ties keep no particular order.
    pub fn sorted_by_magnitude(&self) -> Spectrum {
        let mut order: Vec<usize> = (0..self.magnitudes.len()).collect();
        order.sort_unstable_by(|&a, &b| {
            self.magnitudes[b]
                .abs()
                .partial_cmp(&self.magnitudes[a].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let magnitudes: Array1<f64> = order.iter().map(|&i| self.magnitudes[i].abs()).collect();
        let directions = self
            .directions
            .as_ref()
            .map(|dirs| dirs.select(Axis(1), &order));

        Spectrum {
            method: self.method,
            magnitudes,
            directions,
            n_samples: self.n_samples,
        }
    }
}

/// A strategy for extracting the variance spectrum of a centered matrix.
pub trait SpectrumExtractor {
    fn method(&self) -> SpectrumMethod;

    /// `centered` has shape `(n_samples, n_features)` with (near-)zero column means.
    fn extract(&self, centered: ArrayView2<f64>) -> Result<Spectrum, VarianceError>;
}

/// Builds the extractor for `method` with the feature-selected backend.
pub fn spectrum_extractor(method: SpectrumMethod) -> Box<dyn SpectrumExtractor> {
    match method {
        SpectrumMethod::Covariance => Box::new(CovarianceSpectrum::new()),
        SpectrumMethod::Svd => Box::new(SvdSpectrum::new()),
    }
}

fn check_shape(centered: ArrayView2<f64>) -> Result<(usize, usize), VarianceError> {
    let (n_samples, n_features) = centered.dim();
    if n_samples == 0 || n_features == 0 {
        return Err(VarianceError::EmptyMatrix { n_samples, n_features });
    }
    if n_samples < 2 {
        return Err(VarianceError::InsufficientSamples { n_samples });
    }
    if n_features > n_samples {
        warn!(
            "More features ({}) than samples ({}); the covariance estimate is rank deficient.",
            n_features, n_samples
        );
    }
    Ok((n_samples, n_features))
}

/// Sample covariance `XᵗX / (n-1)` of a centered matrix. Shape `(d, d)`.
pub fn covariance_matrix(centered: ArrayView2<f64>) -> Result<Array2<f64>, VarianceError> {
    let (n_samples, _) = check_shape(centered)?;
    let mut cov_matrix = centered.t().dot(&centered);
    cov_matrix /= (n_samples - 1) as f64;
    Ok(cov_matrix)
}

/// Converts singular values of a centered n×d matrix X into the eigenvalues of
/// its sample covariance: `λ = s² / (n-1)`.
pub fn singular_values_to_eigenvalues(
    singular_values: ArrayView1<f64>,
    n_samples: usize,
) -> Result<Array1<f64>, VarianceError> {
    if n_samples < 2 {
        return Err(VarianceError::InsufficientSamples { n_samples });
    }
    let denominator = (n_samples - 1) as f64;
    Ok(singular_values.mapv(|s| s * s / denominator))
}

/// Spectrum via eigendecomposition of the sample covariance matrix.
#[derive(Debug, Clone)]
pub struct CovarianceSpectrum<B = LinAlgBackendProvider> {
    backend: B,
    compute_directions: bool,
}

impl CovarianceSpectrum<LinAlgBackendProvider> {
    pub fn new() -> Self {
        Self::with_backend(LinAlgBackendProvider::new())
    }
}

impl Default for CovarianceSpectrum<LinAlgBackendProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> CovarianceSpectrum<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            compute_directions: true,
        }
    }

    /// Whether to keep eigenvectors in the returned [`Spectrum`].
    pub fn with_directions(mut self, compute_directions: bool) -> Self {
        self.compute_directions = compute_directions;
        self
    }
}

impl<B: BackendEigh> SpectrumExtractor for CovarianceSpectrum<B> {
    fn method(&self) -> SpectrumMethod {
        SpectrumMethod::Covariance
    }

    fn extract(&self, centered: ArrayView2<f64>) -> Result<Spectrum, VarianceError> {
        let n_samples = centered.nrows();
        let cov_matrix = covariance_matrix(centered)?;
        debug!(
            "Eigendecomposing {}x{} covariance matrix.",
            cov_matrix.nrows(),
            cov_matrix.ncols()
        );

        let eig = self
            .backend
            .eigh_upper(&cov_matrix)
            .map_err(|source| VarianceError::Decomposition {
                algorithm: "Eigendecomposition of covariance matrix",
                source,
            })?;

        // A PSD matrix only produces negative eigenvalues through rounding.
        let largest = eig.eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let most_negative = eig.eigenvalues.iter().cloned().fold(0.0_f64, f64::min);
        if most_negative < -1e-8 * largest.max(1.0) {
            warn!(
                "Covariance eigendecomposition returned eigenvalue {} (largest magnitude {}); the matrix is numerically ill-conditioned.",
                most_negative, largest
            );
        }

        Ok(Spectrum {
            method: SpectrumMethod::Covariance,
            magnitudes: eig.eigenvalues,
            directions: self.compute_directions.then_some(eig.eigenvectors),
            n_samples,
        })
    }
}

/// Spectrum via singular value decomposition of the centered matrix.
///
/// When n < d only n singular values exist; the remaining d - n eigenvalues
/// are exactly zero and are appended as such.
#[derive(Debug, Clone)]
pub struct SvdSpectrum<B = LinAlgBackendProvider> {
    backend: B,
    compute_directions: bool,
}

impl SvdSpectrum<LinAlgBackendProvider> {
    pub fn new() -> Self {
        Self::with_backend(LinAlgBackendProvider::new())
    }
}

impl Default for SvdSpectrum<LinAlgBackendProvider> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> SvdSpectrum<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            compute_directions: false,
        }
    }

    /// Whether to keep the right singular vectors in the returned [`Spectrum`].
    pub fn with_directions(mut self, compute_directions: bool) -> Self {
        self.compute_directions = compute_directions;
        self
    }
}

impl<B: BackendSVD> SvdSpectrum<B> {
    /// Raw singular values of `centered`, non-increasing, length min(n, d).
    pub fn singular_values(&self, centered: ArrayView2<f64>) -> Result<Array1<f64>, VarianceError> {
        check_shape(centered)?;
        let svd = self.decompose(centered, false)?;
        Ok(svd.s)
    }

    fn decompose(
        &self,
        centered: ArrayView2<f64>,
        compute_v: bool,
    ) -> Result<crate::linalg_backends::SVDOutput, VarianceError> {
        self.backend
            .svd_into(centered.to_owned(), false, compute_v)
            .map_err(|source| VarianceError::Decomposition {
                algorithm: "Singular value decomposition",
                source,
            })
    }
}

impl<B: BackendSVD> SpectrumExtractor for SvdSpectrum<B> {
    fn method(&self) -> SpectrumMethod {
        SpectrumMethod::Svd
    }

    fn extract(&self, centered: ArrayView2<f64>) -> Result<Spectrum, VarianceError> {
        let (n_samples, n_features) = check_shape(centered)?;
        let svd = self.decompose(centered, self.compute_directions)?;
        debug!(
            "SVD of {}x{} centered matrix produced {} singular values.",
            n_samples,
            n_features,
            svd.s.len()
        );

        let eigenvalues = singular_values_to_eigenvalues(svd.s.view(), n_samples)?;
        let mut magnitudes = Array1::<f64>::zeros(n_features);
        magnitudes
            .slice_mut(s![..eigenvalues.len()])
            .assign(&eigenvalues);

        // Only a full V supplies a direction for every padded zero eigenvalue.
        let directions = match svd.vt {
            Some(vt) if vt.nrows() >= n_features => {
                Some(vt.slice(s![..n_features, ..]).t().to_owned())
            }
            Some(_) => {
                debug!("Backend returned a thin V; dropping directions for the padded spectrum.");
                None
            }
            None => None,
        };

        Ok(Spectrum {
            method: SpectrumMethod::Svd,
            magnitudes,
            directions,
            n_samples,
        })
    }
}
