// In tests/variance_profile_tests.rs

use approx::assert_abs_diff_eq;
use explained_variance::{
    analyze_explained_variance, center_columns, compare_spectrum_methods,
    explained_variance_profile, first_index_reaching, has_zero_column_means,
    select_component_count, singular_values_to_eigenvalues, standardize_columns,
    CovarianceSpectrum, SpectrumExtractor, SpectrumMethod, SvdSpectrum, VarianceAnalysisConfig,
    VarianceError,
};
use ndarray::{array, Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

const CROSS_METHOD_TOLERANCE: f64 = 1e-6;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_f64_arrays_are_close(
    arr1: ArrayView1<f64>,
    arr2: ArrayView1<f64>,
    tolerance: f64,
    context: &str,
) {
    assert_eq!(arr1.dim(), arr2.dim(), "Array dimensions differ for {}", context);
    for (i, (a, b)) in arr1.iter().zip(arr2.iter()).enumerate() {
        assert!(
            (a - b).abs() < tolerance,
            "Mismatch at index {} for {}: {} vs {} (diff: {})",
            i,
            context,
            a,
            b,
            (a - b).abs()
        );
    }
}

/// Correlated Gaussian data: independent normals mixed through a fixed
/// lower-triangular matrix so the spectrum has clearly distinct eigenvalues.
fn generate_correlated_data(n_samples: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let latent = Array2::from_shape_fn((n_samples, n_features), |_| rng.sample(normal));
    let mixing = Array2::from_shape_fn((n_features, n_features), |(i, j)| {
        if j <= i {
            1.0 / (1.0 + (i - j) as f64) * (n_features - j) as f64
        } else {
            0.0
        }
    });
    latent.dot(&mixing.t())
}

fn wine_eigenvalues() -> Array1<f64> {
    array![
        4.732, 2.511, 1.454, 0.924, 0.858, 0.645, 0.554, 0.104, 0.350, 0.170, 0.291, 0.227, 0.252
    ]
}

#[test]
fn centered_columns_have_zero_mean() {
    for seed in 0..5 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n_samples = rng.gen_range(2..60);
        let n_features = rng.gen_range(1..12);
        let offset = rng.gen_range(-100.0..100.0);
        let data = generate_correlated_data(n_samples, n_features, seed) + offset;

        let centered = center_columns(data.view());
        assert_eq!(centered.dim(), data.dim());
        assert!(has_zero_column_means(centered.view(), 1e-9), "seed {}", seed);
    }
}

#[test]
fn random_profiles_satisfy_normalization_invariants() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..50 {
        let len = rng.gen_range(1..30);
        let magnitudes = Array1::from_shape_fn(len, |_| rng.gen_range(-10.0..10.0));
        let profile = explained_variance_profile(magnitudes.view()).unwrap();

        assert_abs_diff_eq!(profile.percentages.sum(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(profile.cumulative[len - 1], 1.0, epsilon = 1e-9);
        for i in 1..len {
            assert!(profile.percentages[i - 1] >= profile.percentages[i]);
            assert!(profile.cumulative[i - 1] <= profile.cumulative[i]);
        }
    }
}

#[test]
fn covariance_and_svd_profiles_agree() {
    init_logging();
    for &(n_samples, n_features, seed) in &[(50, 5, 1), (200, 13, 2), (30, 30, 3), (12, 20, 4)] {
        let data = generate_correlated_data(n_samples, n_features, seed);
        let centered = center_columns(standardize_columns(data.view()).view());

        let cov = CovarianceSpectrum::new().extract(centered.view()).unwrap();
        let svd = SvdSpectrum::new().extract(centered.view()).unwrap();
        let cov_profile = explained_variance_profile(cov.magnitudes.view()).unwrap();
        let svd_profile = explained_variance_profile(svd.magnitudes.view()).unwrap();

        let context = format!("{}x{}", n_samples, n_features);
        assert_f64_arrays_are_close(
            cov_profile.percentages.view(),
            svd_profile.percentages.view(),
            CROSS_METHOD_TOLERANCE,
            &format!("percentages {}", context),
        );
        assert_f64_arrays_are_close(
            cov_profile.cumulative.view(),
            svd_profile.cumulative.view(),
            CROSS_METHOD_TOLERANCE,
            &format!("cumulative {}", context),
        );

        let agreement = compare_spectrum_methods(centered.view()).unwrap();
        assert!(agreement.agrees_within(CROSS_METHOD_TOLERANCE), "{}", context);
    }
}

#[test]
fn raw_singular_values_give_a_different_profile() {
    let data = generate_correlated_data(100, 6, 11);
    let centered = center_columns(data.view());
    let n_samples = centered.nrows();

    let cov = CovarianceSpectrum::new().extract(centered.view()).unwrap();
    let cov_profile = explained_variance_profile(cov.magnitudes.view()).unwrap();

    let singular_values = SvdSpectrum::new().singular_values(centered.view()).unwrap();
    let raw_profile = explained_variance_profile(singular_values.view()).unwrap();
    let max_diff = cov_profile
        .percentages
        .iter()
        .zip(raw_profile.percentages.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    assert!(
        max_diff > 1e-3,
        "unsquared singular values should not reproduce the covariance profile (max diff {})",
        max_diff
    );

    // Squaring and rescaling restores agreement.
    let converted = singular_values_to_eigenvalues(singular_values.view(), n_samples).unwrap();
    let converted_profile = explained_variance_profile(converted.view()).unwrap();
    assert_f64_arrays_are_close(
        cov_profile.percentages.view(),
        converted_profile.percentages.view(),
        CROSS_METHOD_TOLERANCE,
        "converted singular values",
    );
}

#[test]
fn converted_singular_values_match_covariance_eigenvalues() {
    let data = generate_correlated_data(40, 4, 5);
    let centered = center_columns(data.view());
    let cov = CovarianceSpectrum::new()
        .extract(centered.view())
        .unwrap()
        .sorted_by_magnitude();
    let singular_values = SvdSpectrum::new().singular_values(centered.view()).unwrap();
    let converted = singular_values_to_eigenvalues(singular_values.view(), 40).unwrap();
    for (a, b) in cov.magnitudes.iter().zip(converted.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-8 * a.max(1.0));
    }
}

#[test]
fn wine_scale_scenario() {
    let profile = explained_variance_profile(wine_eigenvalues().view()).unwrap();
    assert_abs_diff_eq!(profile.percentages[0], 0.362, epsilon = 1e-3);
    assert_abs_diff_eq!(profile.percentages[1], 0.192, epsilon = 1e-3);
    assert_abs_diff_eq!(profile.percentages[2], 0.111, epsilon = 1e-3);
    assert!(profile.cumulative[4] >= 0.80);
    assert_abs_diff_eq!(profile.cumulative[12], 1.0, epsilon = 1e-9);

    // 0.90 is first reached at zero-based index 7: eight components.
    assert_eq!(first_index_reaching(profile.cumulative.view(), 0.90), Some(7));
    assert!(profile.cumulative[6] < 0.90);
    assert_eq!(select_component_count(profile.cumulative.view(), 0.90).unwrap(), 8);

    // 0.40 is first reached at zero-based index 1: two components.
    assert_eq!(first_index_reaching(profile.cumulative.view(), 0.40), Some(1));
    assert_eq!(select_component_count(profile.cumulative.view(), 0.40).unwrap(), 2);

    // The largest component alone covers 0.30.
    assert_eq!(select_component_count(profile.cumulative.view(), 0.30).unwrap(), 1);
}

#[test]
fn wine_scenario_is_scale_invariant() {
    let reference = explained_variance_profile(wine_eigenvalues().view()).unwrap();
    // Pretend these came from squared singular values of a 178-sample matrix.
    let scaled = wine_eigenvalues() * 177.0;
    let profile = explained_variance_profile(scaled.view()).unwrap();
    assert_f64_arrays_are_close(
        reference.cumulative.view(),
        profile.cumulative.view(),
        1e-12,
        "scaled cumulative",
    );
}

#[test]
fn selector_is_monotone_on_real_profile() {
    let data = generate_correlated_data(80, 10, 21);
    let report = analyze_explained_variance(
        data.view(),
        &VarianceAnalysisConfig {
            standardize: true,
            ..Default::default()
        },
    )
    .unwrap();

    let cumulative = report.profile.cumulative.view();
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..200 {
        let p1: f64 = rng.gen_range(0.0..0.999);
        let p2: f64 = rng.gen_range(p1..0.9999);
        let k1 = select_component_count(cumulative, p1).unwrap();
        let k2 = select_component_count(cumulative, p2).unwrap();
        assert!(k1 <= k2, "k({}) = {} > k({}) = {}", p1, k1, p2, k2);
    }
}

#[test]
fn pipeline_methods_produce_matching_reports() {
    init_logging();
    let data = generate_correlated_data(150, 8, 33);
    let run = |method: SpectrumMethod| {
        analyze_explained_variance(
            data.view(),
            &VarianceAnalysisConfig {
                method,
                target_variance: 0.95,
                standardize: true,
                ..Default::default()
            },
        )
        .unwrap()
    };
    let cov = run(SpectrumMethod::Covariance);
    let svd = run(SpectrumMethod::Svd);

    assert_eq!(cov.selected_components, svd.selected_components);
    assert_f64_arrays_are_close(
        cov.eigenvalues.view(),
        svd.eigenvalues.view(),
        1e-8,
        "report eigenvalues",
    );
    assert_f64_arrays_are_close(
        cov.profile.cumulative.view(),
        svd.profile.cumulative.view(),
        CROSS_METHOD_TOLERANCE,
        "report cumulative",
    );
}

#[test]
fn report_serializes_to_plain_arrays() {
    let data = generate_correlated_data(20, 3, 8);
    let report = analyze_explained_variance(data.view(), &VarianceAnalysisConfig::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["n_features"], 3);
    assert_eq!(json["method"], "Covariance");
    assert!(json["profile"]["cumulative"].is_object() || json["profile"]["cumulative"].is_array());
}

#[test]
fn zero_variance_data_is_a_precondition_error() {
    let data = Array2::from_elem((10, 4), 3.25);
    let err = analyze_explained_variance(data.view(), &VarianceAnalysisConfig::default())
        .unwrap_err();
    assert!(matches!(err, VarianceError::ZeroTotalVariance), "{}", err);
}

#[test]
fn full_variance_target_is_always_reachable() {
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    for _ in 0..200 {
        let len = rng.gen_range(1..40);
        let magnitudes = Array1::from_shape_fn(len, |_| rng.gen_range(0.01..10.0));
        let profile = explained_variance_profile(magnitudes.view()).unwrap();
        assert_eq!(profile.cumulative[len - 1], 1.0);
        // Every component carries real variance, so all of them are needed.
        assert_eq!(select_component_count(profile.cumulative.view(), 1.0).unwrap(), len);
    }

    let report = analyze_explained_variance(
        generate_correlated_data(60, 7, 17).view(),
        &VarianceAnalysisConfig {
            target_variance: 1.0,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(report.selected_components <= 7);
    assert_eq!(report.profile.captured_by(report.selected_components), 1.0);
}

#[test]
fn target_above_full_variance_is_unsatisfiable() {
    let profile = explained_variance_profile(wine_eigenvalues().view()).unwrap();
    match select_component_count(profile.cumulative.view(), 1.0 + 1e-12) {
        Err(VarianceError::UnsatisfiableThreshold { achieved, .. }) => assert_eq!(achieved, 1.0),
        other => panic!("expected UnsatisfiableThreshold, got {:?}", other),
    }
}

#[test]
fn constant_fractional_data_has_no_spectrum() {
    for &standardize in &[false, true] {
        let err = analyze_explained_variance(
            Array2::from_elem((3, 2), 0.1).view(),
            &VarianceAnalysisConfig {
                standardize,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, VarianceError::ZeroTotalVariance), "{}", err);
    }
}
