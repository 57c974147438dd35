// In tests/gp_basis_tests.rs

use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate};
use float_cmp::approx_eq;
use gp_basis::{
    make_centered_gp_eigendecomp, make_gp_basis, GpBasisError, GpConfig, KernelKind, ModelCoords,
    Scale, TimeAxis,
};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Irregular, sorted time points like poll release dates.
fn random_time_axis(n: usize, horizon: f64, seed: u64) -> Array1<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..horizon)).collect();
    points.sort_by(|a, b| a.partial_cmp(b).unwrap());
    Array1::from(points)
}

fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[test]
fn test_basis_covariance_converges_with_variance_limit() {
    let t = random_time_axis(80, 200.0, 7);
    let axis = TimeAxis::from(t.clone());

    let full = make_centered_gp_eigendecomp(&axis, &GpConfig::gaussian(20.0).with_variance_limit(1.0))
        .expect("full basis");
    let coarse = make_centered_gp_eigendecomp(&axis, &GpConfig::gaussian(20.0).with_variance_limit(0.9))
        .expect("coarse basis");
    let fine = make_centered_gp_eigendecomp(&axis, &GpConfig::gaussian(20.0).with_variance_limit(0.999))
        .expect("fine basis");

    assert!(coarse.n_basis() < fine.n_basis());
    assert!(fine.n_basis() <= full.n_basis());

    let exact = full.reconstruct_covariance();
    let err_coarse = max_abs_diff(&coarse.reconstruct_covariance(), &exact);
    let err_fine = max_abs_diff(&fine.reconstruct_covariance(), &exact);
    assert!(
        err_fine < err_coarse,
        "finer truncation should approximate better: fine={} coarse={}",
        err_fine,
        err_coarse
    );

    // The unit diagonal of the Gaussian kernel survives the full reconstruction.
    for i in 0..t.len() {
        assert_abs_diff_eq!(exact[[i, i]], 1.0, epsilon = 1e-6);
    }
}

#[test]
fn test_zerosum_basis_on_irregular_axis() {
    let axis = TimeAxis::from(random_time_axis(60, 120.0, 11));
    let config = GpConfig::gaussian(vec![Scale::Numeric(5.0), Scale::Numeric(30.0)])
        .with_variance_weight(vec![0.3, 0.7])
        .with_zerosum(true)
        .with_variance_limit(0.99);
    let gp = make_centered_gp_eigendecomp(&axis, &config).expect("zero-sum basis");

    for (j, s) in gp.basis().sum_axis(Axis(0)).iter().enumerate() {
        assert!(approx_eq!(f64, *s, 0.0, epsilon = 1e-8), "column {} sums to {}", j, s);
    }
    let cov = gp.reconstruct_covariance();
    for s in cov.sum_axis(Axis(1)).iter() {
        assert_abs_diff_eq!(*s, 0.0, epsilon = 1e-7);
    }
}

#[test]
fn test_smooth_kernel_loses_roundoff_eigenvalues_to_precision_cutoff() {
    // A lengthscale far above the spacing makes the covariance numerically
    // low-rank; its trailing eigenvalues are roundoff noise of either sign.
    let t = Array1::linspace(0.0, 10.0, 60);
    let axis = TimeAxis::from(t.clone());
    let gp = make_centered_gp_eigendecomp(&axis, &GpConfig::gaussian(50.0).with_variance_limit(1.0))
        .expect("smooth basis");

    assert!(gp.n_basis() < gp.n_points(), "expected some eigenvalues below zero to be cut");
    assert!(gp.eigenvalues().iter().all(|&v| v >= 0.0));
    assert_abs_diff_eq!(gp.explained_variance_ratio(), 1.0, epsilon = 1e-12);

    let cov = gp.reconstruct_covariance();
    for i in 0..t.len() {
        for j in 0..t.len() {
            let diff = (t[i] - t[j]) / 50.0;
            assert_abs_diff_eq!(cov[[i, j]], (-0.5 * diff * diff).exp(), epsilon = 1e-8);
        }
    }
}

#[test]
fn test_eigenvectors_are_orthonormal() {
    let axis = TimeAxis::from(random_time_axis(50, 100.0, 3));
    let gp = make_centered_gp_eigendecomp(&axis, &GpConfig::gaussian(10.0).with_variance_limit(0.999))
        .expect("basis");

    // Undo the sqrt(lambda) scaling to recover the eigenvectors.
    let scale = gp.eigenvalues().mapv(|v| 1.0 / v.sqrt());
    let vecs = gp.basis() * &scale;
    let gram = vecs.t().dot(&vecs);
    for i in 0..gp.n_basis() {
        for j in 0..gp.n_basis() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-8);
        }
    }
}

#[test]
fn test_datetime_and_numeric_axes_agree() {
    let start = NaiveDate::from_ymd_opt(2020, 3, 2).unwrap();
    let offsets_days = [0i64, 3, 7, 12, 20, 33, 41, 55, 60, 72];
    let dates: Vec<NaiveDate> = offsets_days.iter().map(|d| start + Duration::days(*d)).collect();
    let numeric: Vec<f64> = offsets_days.iter().map(|d| *d as f64).collect();

    let by_date = make_centered_gp_eigendecomp(
        &TimeAxis::from(dates),
        &GpConfig::gaussian(Scale::Duration(Duration::days(14))),
    )
    .expect("datetime basis");
    let by_number =
        make_centered_gp_eigendecomp(&TimeAxis::from(numeric), &GpConfig::gaussian(14.0))
            .expect("numeric basis");

    assert_eq!(by_date.n_basis(), by_number.n_basis());
    for (a, b) in by_date.eigenvalues().iter().zip(by_number.eigenvalues().iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn test_model_layer_registers_each_basis() {
    let axis = TimeAxis::from(Array1::linspace(0.0, 90.0, 91));
    let mut coords = ModelCoords::new();

    let (national, national_dim) =
        make_gp_basis(&axis, None, Some("national"), &mut coords).expect("national basis");
    let seasonal_config = GpConfig::from_json_str(
        r#"{ "kernel": "periodic", "lengthscale": 1.5, "period": 30, "variance_limit": 0.95 }"#,
    )
    .expect("config parses");
    let (seasonal, seasonal_dim) =
        make_gp_basis(&axis, Some(&seasonal_config), Some("seasonal"), &mut coords)
            .expect("seasonal basis");

    assert_eq!(national.kernel(), KernelKind::Gaussian);
    assert_eq!(seasonal.kernel(), KernelKind::Periodic);
    assert_eq!(coords.get(&national_dim), Some(&(0..national.n_basis())));
    assert_eq!(coords.get(&seasonal_dim), Some(&(0..seasonal.n_basis())));
    assert_eq!(coords.len(), 2);
}

fn variant_name(err: &GpBasisError) -> &'static str {
    match err {
        GpBasisError::InvalidInput(_) => "InvalidInput",
        GpBasisError::InvalidConfig(_) => "InvalidConfig",
        GpBasisError::Unsupported(_) => "Unsupported",
        GpBasisError::UnknownKernel(_) => "UnknownKernel",
        GpBasisError::UnitMismatch(_) => "UnitMismatch",
        GpBasisError::InvalidDuration(_) => "InvalidDuration",
        GpBasisError::Decomposition(_) => "Decomposition",
        GpBasisError::DegenerateSpectrum(_) => "DegenerateSpectrum",
        GpBasisError::Io(_) => "Io",
        GpBasisError::Serialization(_) => "Serialization",
    }
}

#[test]
fn test_rejected_configurations_surface_typed_errors() {
    let axis = TimeAxis::from(vec![0.0, 1.0, 2.0, 3.0]);
    let cases = [
        (r#"{ "kernel": "periodic", "lengthscale": [1, 2], "period": 4 }"#, "Unsupported"),
        (r#"{ "kernel": "randomwalk", "lengthscale": 5 }"#, "Unsupported"),
        (r#"{ "lengthscale": [1, 2], "variance_weight": [0.2, 0.2] }"#, "InvalidConfig"),
        (r#"{ "lengthscale": "14D" }"#, "UnitMismatch"),
        (r#"{ "variance_limit": 1.2 }"#, "InvalidConfig"),
    ];
    for (json, expected) in cases {
        let config = GpConfig::from_json_str(json).expect("config parses");
        let err = make_centered_gp_eigendecomp(&axis, &config).unwrap_err();
        assert_eq!(variant_name(&err), expected, "unexpected error for {}: {}", json, err);
    }
}
