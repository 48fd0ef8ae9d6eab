// src/linalg_backends.rs

use ndarray::{Array1, Array2};

use crate::error::ThreadSafeStdError;

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput {
    /// Eigenvalues in whatever order the backend produced them.
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<f64>,
}

/// Symmetric eigendecomposition reading the upper triangle (LAPACK DSYEVD style).
/// Implementers may assume `matrix` is symmetric.
pub trait BackendEigh {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError>;
}

/// Output of a thin Singular Value Decomposition.
#[derive(Debug)]
pub struct SVDOutput {
    pub u: Option<Array2<f64>>,
    /// min(n, d) singular values, non-negative and non-increasing.
    pub s: Array1<f64>,
    pub vt: Option<Array2<f64>>,
}

pub trait BackendSVD {
    fn svd_into(
        &self,
        matrix: Array2<f64>,
        compute_u: bool,
        compute_v: bool,
    ) -> Result<SVDOutput, ThreadSafeStdError>;
}

// --- ndarray-linalg (LAPACK) backend ---

use ndarray_linalg::{Eigh as NdLinalgEigh, SVDInto as NdLinalgSVDInto, UPLO};

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

fn to_dyn_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> ThreadSafeStdError {
    Box::new(e)
}

impl BackendEigh for NdarrayLinAlgBackend {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
        let (eigenvalues, eigenvectors) = matrix.eigh(UPLO::Upper).map_err(to_dyn_error)?;
        Ok(EighOutput { eigenvalues, eigenvectors })
    }
}

impl BackendSVD for NdarrayLinAlgBackend {
    fn svd_into(
        &self,
        matrix: Array2<f64>,
        compute_u: bool,
        compute_v: bool,
    ) -> Result<SVDOutput, ThreadSafeStdError> {
        let (u, s, vt) = matrix.svd_into(compute_u, compute_v).map_err(to_dyn_error)?;
        Ok(SVDOutput { u, s, vt })
    }
}

// --- faer backend ---

#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{BackendEigh, BackendSVD, EighOutput, SVDOutput};
    use crate::error::ThreadSafeStdError;
    use faer::linalg::solvers::{SelfAdjointEigen as FaerSelfAdjointEigen, Svd as FaerSolverSvd};
    use faer::{ColRef, MatRef};
    use ndarray::{Array1, Array2};

    fn to_dyn_error_faer(msg: String) -> ThreadSafeStdError {
        Box::new(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    /// Views a contiguous ndarray matrix as a faer matrix without copying.
    fn faer_view(matrix: &Array2<f64>) -> Result<MatRef<'_, f64>, ThreadSafeStdError> {
        let (nrows, ncols) = matrix.dim();
        let slice = matrix.as_slice_memory_order().ok_or_else(|| {
            to_dyn_error_faer(format!(
                "Input ndarray matrix ({}x{}) is non-contiguous and cannot be viewed by faer.",
                nrows, ncols
            ))
        })?;
        if matrix.is_standard_layout() {
            Ok(MatRef::from_row_major_slice(slice, nrows, ncols))
        } else {
            Ok(MatRef::from_column_major_slice(slice, nrows, ncols))
        }
    }

    fn faer_mat_to_ndarray(faer_mat: MatRef<'_, f64>) -> Array2<f64> {
        Array2::from_shape_fn((faer_mat.nrows(), faer_mat.ncols()), |(i, j)| faer_mat[(i, j)])
    }

    fn faer_col_to_ndarray_vec(faer_col: ColRef<'_, f64>) -> Array1<f64> {
        Array1::from_shape_fn(faer_col.nrows(), |i| faer_col[i])
    }

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    impl BackendEigh for FaerLinAlgBackend {
        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
            if matrix.nrows() != matrix.ncols() {
                return Err(to_dyn_error_faer(
                    "Matrix must be square for eigendecomposition.".to_string(),
                ));
            }
            if matrix.is_empty() {
                return Ok(EighOutput {
                    eigenvalues: Array1::zeros(0),
                    eigenvectors: Array2::zeros((0, 0)),
                });
            }
            // Symmetric input: a row-major view of the upper triangle is the same matrix.
            let eig = FaerSelfAdjointEigen::new(faer_view(matrix)?, faer::Side::Upper)
                .map_err(|e| to_dyn_error_faer(format!("Faer eigendecomposition failed: {:?}", e)))?;
            Ok(EighOutput {
                eigenvalues: faer_col_to_ndarray_vec(eig.S().column_vector()),
                eigenvectors: faer_mat_to_ndarray(eig.U()),
            })
        }
    }

    impl BackendSVD for FaerLinAlgBackend {
        fn svd_into(
            &self,
            matrix: Array2<f64>,
            compute_u: bool,
            compute_v: bool,
        ) -> Result<SVDOutput, ThreadSafeStdError> {
            let (nrows, ncols) = matrix.dim();
            if matrix.is_empty() {
                let k_dim = nrows.min(ncols);
                return Ok(SVDOutput {
                    u: if compute_u { Some(Array2::zeros((nrows, k_dim))) } else { None },
                    s: Array1::zeros(k_dim),
                    vt: if compute_v { Some(Array2::zeros((k_dim, ncols))) } else { None },
                });
            }
            let svd = FaerSolverSvd::new_thin(faer_view(&matrix)?)
                .map_err(|e| to_dyn_error_faer(format!("Faer SVD computation failed: {:?}", e)))?;

            let s = faer_col_to_ndarray_vec(svd.S().column_vector());
            let u = if compute_u { Some(faer_mat_to_ndarray(svd.U())) } else { None };
            let vt = if compute_v {
                Some(faer_mat_to_ndarray(svd.V()).t().into_owned())
            } else {
                None
            };
            Ok(SVDOutput { u, s, vt })
        }
    }
}

// --- Compile-time dispatch ---

/// Dispatches to the linear algebra backend selected by Cargo features:
/// faer when `backend_faer` is enabled, ndarray-linalg otherwise.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider;

impl LinAlgBackendProvider {
    pub fn new() -> Self {
        Self
    }

    /// Human-readable backend name, used in log lines.
    pub fn name(&self) -> &'static str {
        if cfg!(feature = "backend_faer") {
            "faer"
        } else {
            "ndarray-linalg"
        }
    }
}

impl BackendEigh for LinAlgBackendProvider {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.eigh_upper(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.eigh_upper(matrix)
        }
    }
}

impl BackendSVD for LinAlgBackendProvider {
    fn svd_into(
        &self,
        matrix: Array2<f64>,
        compute_u: bool,
        compute_v: bool,
    ) -> Result<SVDOutput, ThreadSafeStdError> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.svd_into(matrix, compute_u, compute_v)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.svd_into(matrix, compute_u, compute_v)
        }
    }
}
