// Explained variance for principal component analysis (PCA)

#![doc = include_str!("../README.md")]

pub mod analysis;
pub mod centering;
pub mod error;
pub mod linalg_backends;
pub mod profile;
pub mod selector;
pub mod spectrum;

pub use analysis::{
    analyze_explained_variance, compare_spectrum_methods, prepare_matrix, SpectrumAgreement,
    VarianceAnalysisConfig, VarianceReport,
};
pub use centering::{
    center_columns, ensure_finite, ensure_nonzero_variance, has_zero_column_means,
    standardize_columns,
};
pub use error::VarianceError;
pub use profile::{explained_variance_profile, VarianceProfile};
pub use selector::{first_index_reaching, select_component_count};
pub use spectrum::{
    covariance_matrix, singular_values_to_eigenvalues, spectrum_extractor, CovarianceSpectrum,
    Spectrum, SpectrumExtractor, SpectrumMethod, SvdSpectrum,
};
