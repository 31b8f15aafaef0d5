// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: pseudofermion heat bath on the 4⁴ reference lattice.

use std::io::Write;
use std::sync::Arc;

use hotspring_pseudofermion::lattice::cg::SolverParams;
use hotspring_pseudofermion::lattice::complex_f64::Complex64;
use hotspring_pseudofermion::lattice::gauge::GaugeField;
use hotspring_pseudofermion::lattice::noise::{GaussianNoise, LcgNoise, NoiseSource};
use hotspring_pseudofermion::lattice::rational::Exponent;
use hotspring_pseudofermion::tolerances::{DOUBLE_REFRESH_ABS, REFRESH_IDENTITY_ABS};
use hotspring_pseudofermion::{
    ActionConfig, ActionError, ExactOneFlavourRatioAction, FermionOperator, ParallelContext,
    PseudofermionAction, StaggeredOperator, TwoFlavourRatioAction,
};

const DIMS: [usize; 4] = [4, 4, 4, 4];

fn staggered(mass: f64, ctx: &Arc<ParallelContext>) -> Arc<dyn FermionOperator> {
    Arc::new(StaggeredOperator::new(mass, Arc::clone(ctx)))
}

fn eofa(ctx: &Arc<ParallelContext>, config: &ActionConfig) -> ExactOneFlavourRatioAction {
    ExactOneFlavourRatioAction::new(staggered(0.2, ctx), staggered(1.0, ctx), config)
        .expect("exact one flavour action")
}

/// Pauli-Villars ratio with a light fermion; identity checks need tight solves.
fn pauli_villars(ctx: &Arc<ParallelContext>) -> TwoFlavourRatioAction {
    let config = ActionConfig {
        solver: SolverParams {
            tolerance: 1e-12,
            max_iterations: 10_000,
        },
        ..ActionConfig::two_flavour_ratio()
    };
    TwoFlavourRatioAction::new(staggered(1.0, ctx), staggered(0.04, ctx), &config)
        .expect("two flavour action")
}

fn refresh_identity(action: &mut dyn PseudofermionAction, lat: &GaugeField, seed: u64) -> f64 {
    let eta = GaussianNoise::from_seed(seed)
        .gaussian(lat.volume())
        .scaled(action.noise_scale());
    action.refresh_with_noise(lat, &eta).expect("refresh");
    let phi = action.phi().expect("phi").clone();
    let k_phi = action.apply_operator(lat, &phi).expect("apply");
    let diff = phi.dot(&k_phi) - Complex64::real(eta.norm_sq());
    diff.re.abs().max(diff.im.abs())
}

#[test]
fn refresh_identity_on_reference_lattice() {
    let ctx = ParallelContext::init(0).expect("pool");
    let lat = GaugeField::hot_start(DIMS, 42);

    let mut one = eofa(&ctx, &ActionConfig::exact_one_flavour());
    let err = refresh_identity(&mut one, &lat, 42);
    assert!(err < REFRESH_IDENTITY_ABS, "exact one flavour: {err:e}");

    let mut two = pauli_villars(&ctx);
    let err = refresh_identity(&mut two, &lat, 42);
    assert!(err < REFRESH_IDENTITY_ABS, "two flavour ratio: {err:e}");
}

#[test]
fn double_refresh_on_reference_lattice() {
    let ctx = ParallelContext::init(0).expect("pool");
    let lat = GaugeField::hot_start(DIMS, 43);
    let mut action = eofa(&ctx, &ActionConfig::exact_one_flavour());
    let eta = GaussianNoise::from_seed(7)
        .gaussian(lat.volume())
        .scaled(action.noise_scale());

    action.refresh_with_noise(&lat, &eta).expect("refresh");
    let once = action.phi().expect("phi").clone();
    action.refresh_with_noise(&lat, &once).expect("refresh");
    let twice = action.phi().expect("phi").clone();
    let back = action.apply_operator(&lat, &twice).expect("apply");
    let err = back.sub(&eta).norm_sq();
    assert!(err < DOUBLE_REFRESH_ABS, "|M R R eta - eta|² = {err:e}");
}

#[test]
fn lcg_noise_refresh_is_reproducible_across_pools() {
    let lat = GaugeField::hot_start(DIMS, 44);
    let config = ActionConfig::exact_one_flavour();

    let run = |threads: usize| {
        let ctx = ParallelContext::init(threads).expect("pool");
        let mut action = eofa(&ctx, &config);
        action
            .refresh(&lat, &mut LcgNoise::from_seed(12_345))
            .expect("refresh");
        let s = action.action(&lat).expect("action");
        (action.phi().expect("phi").clone(), s.to_bits())
    };

    let (phi_serial, s_serial) = run(1);
    let (phi_threaded, s_threaded) = run(3);
    assert!(phi_serial == phi_threaded, "phi depends on thread count");
    assert_eq!(s_serial, s_threaded, "action depends on thread count");
}

#[test]
fn config_file_drives_action_construction() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(
        file,
        r#"{{ "rational": {{ "degree": 14 }}, "solver": {{ "tolerance": 1e-11 }} }}"#
    )
    .expect("write config");

    let config = ActionConfig::from_path(file.path()).expect("load config");
    assert_eq!(config.solver.tolerance, 1e-11);

    let ctx = ParallelContext::init(2).expect("pool");
    let action = eofa(&ctx, &config);
    assert_eq!(action.approximation().degree(), 14);
    assert_eq!(action.approximation().exponent(), Exponent::INVERSE_SQRT);
    assert!((action.right().mass_sq() - 1.0).abs() < 1e-15);
    assert!((action.mass_gap() - 0.96).abs() < 1e-12);
}

#[test]
fn refresh_on_wrong_lattice_is_rejected() {
    let ctx = ParallelContext::init(1).expect("pool");
    let lat = GaugeField::hot_start(DIMS, 45);
    let small = GaugeField::hot_start([2, 2, 2, 2], 45);
    let mut action = eofa(&ctx, &ActionConfig::exact_one_flavour());
    let eta = GaussianNoise::from_seed(1).gaussian(small.volume());
    assert!(matches!(
        action.refresh_with_noise(&lat, &eta),
        Err(ActionError::VolumeMismatch { .. })
    ));
}
