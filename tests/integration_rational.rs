// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: rational approximation of x^{-1/2} through the public API.
//!
//! Property tests sample the approximation interval at random points, away
//! from the log grid the fit itself is checked on.

use std::sync::OnceLock;

use hotspring_pseudofermion::lattice::rational::Exponent;
use hotspring_pseudofermion::tolerances::{RATIONAL_FRESH_GRID_SAMPLES, RATIONAL_PRECISION};
use hotspring_pseudofermion::{ApproximationError, RationalApproximation, RationalParams};
use proptest::prelude::*;

fn reference_fit() -> &'static RationalApproximation {
    static FIT: OnceLock<RationalApproximation> = OnceLock::new();
    FIT.get_or_init(|| {
        RationalApproximation::build(&RationalParams::default(), Exponent::INVERSE_SQRT)
            .expect("default fit")
    })
}

#[test]
fn reference_fit_meets_precision_on_fresh_grid() {
    let fit = reference_fit();
    assert_eq!(fit.degree(), 12);
    assert!(fit.error() < RATIONAL_PRECISION);
    let fresh = fit.max_relative_error(RATIONAL_FRESH_GRID_SAMPLES);
    assert!(fresh < RATIONAL_PRECISION, "fresh-grid error {fresh:e}");
    assert!(fit.bounds().covers(1.0, 25.0));
}

#[test]
fn config_json_drives_the_fit() {
    let config = hotspring_pseudofermion::ActionConfig::from_json_str(
        r#"{ "rational": { "lo": 0.5, "hi": 50.0, "degree": 14 } }"#,
    )
    .expect("config");
    let fit = RationalApproximation::build(&config.rational, Exponent::INVERSE_SQRT)
        .expect("fit");
    assert_eq!(fit.degree(), 14);
    assert!((fit.bounds().lo() - 0.5).abs() < f64::EPSILON);
    assert!(fit.error() < RATIONAL_PRECISION);
}

#[test]
fn unsupported_exponent_rejected() {
    let cube_root = Exponent {
        numerator: -1,
        denominator: 3,
    };
    assert!(matches!(
        RationalApproximation::build(&RationalParams::default(), cube_root),
        Err(ApproximationError::UnsupportedExponent { .. })
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn relative_error_bounded_inside_interval(x in 0.95f64..100.0) {
        let fit = reference_fit();
        let rel = (fit.evaluate(x) * x.sqrt() - 1.0).abs();
        prop_assert!(rel <= fit.error() + 1e-14, "x = {x}: {rel:e} > {:e}", fit.error());
    }

    #[test]
    fn approximation_is_decreasing(x in 0.95f64..99.0, step in 1e-3f64..1.0) {
        let fit = reference_fit();
        prop_assert!(fit.evaluate(x) > fit.evaluate(x + step));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn random_intervals_fit_to_reported_error(
        lo in 0.1f64..10.0,
        ratio in 2.0f64..1000.0,
        degree in 6usize..16,
    ) {
        let params = RationalParams {
            lo,
            hi: lo * ratio,
            degree,
            precision: 1e-3,
            ..RationalParams::default()
        };
        let fit = RationalApproximation::build(&params, Exponent::INVERSE_SQRT)
            .expect("loose fit");
        prop_assert_eq!(fit.degree(), degree);
        prop_assert!(fit.poles().all(|p| p > 0.0));
        prop_assert!(fit.residues().all(|r| r > 0.0));
        prop_assert!(fit.norm() > 0.0);
        let fresh = fit.max_relative_error(RATIONAL_FRESH_GRID_SAMPLES);
        prop_assert!(
            fresh <= 1.01 * fit.error() + 1e-14,
            "fresh {fresh:e} vs reported {:e}",
            fit.error()
        );
    }
}
