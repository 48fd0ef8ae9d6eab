// src/error.rs

use thiserror::Error;

/// A thread-safe wrapper for errors coming out of the linear algebra backends,
/// so they implement `Send` and `Sync`.
pub type ThreadSafeStdError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong while computing an explained-variance profile.
///
/// Errors are surfaced to the immediate caller; nothing in this crate retries
/// or substitutes a fallback value.
#[derive(Debug, Error)]
pub enum VarianceError {
    #[error("Input matrix has zero samples or zero features ({n_samples} x {n_features}).")]
    EmptyMatrix { n_samples: usize, n_features: usize },

    #[error("At least 2 samples are required to estimate a covariance, but got {n_samples}.")]
    InsufficientSamples { n_samples: usize },

    #[error("Input matrix contains a non-finite value ({value}) at row {row}, column {col}.")]
    NonFiniteInput { row: usize, col: usize, value: f64 },

    #[error("Cannot build a variance profile from an empty magnitude vector.")]
    EmptyMagnitudes,

    #[error("Magnitude vector contains a non-finite value ({value}) at index {index}.")]
    NonFiniteMagnitude { index: usize, value: f64 },

    #[error("Magnitude vector sums to zero; there is no variance to distribute across components.")]
    ZeroTotalVariance,

    #[error("Variance threshold must be a number, but got {threshold}.")]
    InvalidThreshold { threshold: f64 },

    #[error("Variance threshold {threshold} is never reached; the cumulative profile tops out at {achieved}.")]
    UnsatisfiableThreshold { threshold: f64, achieved: f64 },

    #[error("{algorithm} failed: {source}")]
    Decomposition {
        algorithm: &'static str,
        #[source]
        source: ThreadSafeStdError,
    },
}
