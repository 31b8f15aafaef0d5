// SPDX-License-Identifier: AGPL-3.0-only

//! Pseudofermion Force Validation.
//!
//! Refreshes determinant-ratio pseudofermions on a hot 4^4 staggered
//! lattice and checks heat bath, action and force against each other.
//!
//! # Validation targets
//!
//! | Observable | Expected | Tolerance | Basis |
//! |-----------|----------|-----------|-------|
//! | Rational fit error | < 1e-12 | upper bound | Zolotarev degree 12 on [0.95, 100] |
//! | Refresh identity | ⟨φ,Kφ⟩ = ⟨η,η⟩ | 1e-8 abs | W† K W = 1 |
//! | Double refresh | K R R η = η | 1e-8 abs | R(M) Hermitian |
//! | Force check | S' − S = ΔS_pred | 1.0 abs at dt=1e-4 | Reference smoke bound |
//! | dt sweep | residual ratio ≈ 4 | [3, 5) | O(dt²) residual |
//! | Link unitarity | max |UU† − 1| | 1e-10 abs | Hot start and 6th-order step stay in SU(3) |
//!
//! # Usage
//!
//! ```text
//! validate_pseudofermion_force [--seed=N] [--lattice=L] [--config=PATH] [--ratio]
//! ```
//!
//! `--ratio` adds the two-flavour ratio action (light 0.04, Pauli-Villars
//! 1.0). A JSON summary of every force check follows the table.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use hotspring_pseudofermion::lattice::cg::SolverParams;
use hotspring_pseudofermion::lattice::fermion::FermionField;
use hotspring_pseudofermion::lattice::force_check::{
    random_momentum, residual_ratios, ForceCheckReport, ForceConsistency,
};
use hotspring_pseudofermion::lattice::gauge::GaugeField;
use hotspring_pseudofermion::lattice::noise::{GaussianNoise, NoiseSource};
use hotspring_pseudofermion::lattice::operator::{FermionOperator, StaggeredOperator};
use hotspring_pseudofermion::lattice::pseudofermion::{
    ExactOneFlavourRatioAction, PseudofermionAction, TwoFlavourRatioAction,
};
use hotspring_pseudofermion::lattice::su3::Su3Matrix;
use hotspring_pseudofermion::telemetry::ensure_tracing;
use hotspring_pseudofermion::tolerances;
use hotspring_pseudofermion::validation::ValidationHarness;
use hotspring_pseudofermion::{ActionConfig, ActionError, ParallelContext};

/// Light and heavy staggered masses of the one-flavour ratio.
///
/// σ(M) = 1 + k / σ(D†D) ⊂ [1.06, 25], inside [0.95, 100].
const EOFA_LIGHT_MASS: f64 = 0.2;
const EOFA_HEAVY_MASS: f64 = 1.0;

/// Light and Pauli-Villars masses of the two-flavour ratio.
const RATIO_LIGHT_MASS: f64 = 0.04;
const RATIO_PV_MASS: f64 = 1.0;

/// Solver target for identity checks: 1e-8 on ⟨φ,Kφ⟩ needs tighter solves
/// than the production 1e-8 residual.
const IDENTITY_SOLVER: SolverParams = SolverParams {
    tolerance: 1e-12,
    max_iterations: 10_000,
};

struct CliArgs {
    seed: u64,
    lattice: usize,
    config: Option<PathBuf>,
    ratio: bool,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut args = CliArgs {
        seed: 42,
        lattice: 4,
        config: None,
        ratio: false,
    };
    for arg in std::env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--seed=") {
            args.seed = val.parse().map_err(|_| format!("--seed=N, got {val}"))?;
        } else if let Some(val) = arg.strip_prefix("--lattice=") {
            args.lattice = val.parse().map_err(|_| format!("--lattice=L, got {val}"))?;
        } else if let Some(val) = arg.strip_prefix("--config=") {
            args.config = Some(PathBuf::from(val));
        } else if arg == "--ratio" {
            args.ratio = true;
        } else {
            return Err(format!("unknown argument {arg}"));
        }
    }
    if args.lattice < 2 {
        return Err("--lattice must be at least 2".into());
    }
    Ok(args)
}

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    dims: [usize; 4],
    force_checks: Vec<ForceCheckReport>,
}

fn main() {
    ensure_tracing();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Pseudofermion Force Validation                             ║");
    println!("║  Exact one flavour: x^(-1/2) rational heat bath, hot start  ║");
    println!("║  Force vs finite action difference, 6th-order link update   ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let args = match parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("error: {msg}");
            std::process::exit(2);
        }
    };
    let config = match &args.config {
        Some(path) => match ActionConfig::from_path(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {}: {e}", path.display());
                std::process::exit(2);
            }
        },
        None => ActionConfig::default(),
    };

    let mut harness = ValidationHarness::new("pseudofermion_force");
    let dims = [args.lattice; 4];
    let mut summary = RunSummary {
        seed: args.seed,
        dims,
        force_checks: Vec::new(),
    };

    let ctx = match ParallelContext::init(config.threads) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&args, &config, &ctx, dims, &mut harness, &mut summary) {
        println!("  aborted: {e}");
        harness.check_bool(&format!("run completed ({e})"), false);
    }

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!();
            println!("{json}");
        }
        Err(e) => eprintln!("warning: JSON summary unavailable: {e}"),
    }
    harness.finish();
}

fn run(
    args: &CliArgs,
    config: &ActionConfig,
    ctx: &Arc<ParallelContext>,
    dims: [usize; 4],
    harness: &mut ValidationHarness,
    summary: &mut RunSummary,
) -> Result<(), ActionError> {
    println!("  lattice {dims:?}, seed {}, {} threads", args.seed, ctx.threads());
    println!();

    let gauge = GaugeField::hot_start(dims, args.seed);
    harness.check_upper(
        "hot start links unitary",
        gauge.max_unitarity_deviation(),
        tolerances::EXACT_F64,
    );
    let mut seed = args.seed.wrapping_add(2);
    let mom = random_momentum(gauge.link_count(), &mut seed);

    // ═══ Phase 1: rational approximation ═══
    println!("═══ Phase 1: Rational approximation of x^(-1/2) ═══");
    let mut eofa = ExactOneFlavourRatioAction::new(
        staggered(EOFA_LIGHT_MASS, ctx),
        staggered(EOFA_HEAVY_MASS, ctx),
        config,
    )?;
    {
        let approx = eofa.approximation();
        let fresh = approx.max_relative_error(tolerances::RATIONAL_FRESH_GRID_SAMPLES);
        println!(
            "  degree {}, [{}, {}], error {:.3e} (fresh grid {:.3e}), {} iterations",
            approx.degree(),
            approx.bounds().lo(),
            approx.bounds().hi(),
            approx.error(),
            fresh,
            approx.iterations()
        );
        harness.check_upper("rational fit error", approx.error(), config.rational.precision);
        harness.check_upper("rational fresh-grid error", fresh, config.rational.precision);
        harness.check_bool(
            "rational poles and residues positive",
            approx.poles().all(|p| p > 0.0) && approx.residues().all(|r| r > 0.0),
        );
    }
    println!();

    // ═══ Phase 2: heat bath identities ═══
    println!("═══ Phase 2: Exact one flavour heat bath (m_l={EOFA_LIGHT_MASS}, m_r={EOFA_HEAVY_MASS}) ═══");
    let eta = GaussianNoise::from_seed(args.seed.wrapping_add(1))
        .gaussian(gauge.volume())
        .scaled(config.noise_scale);
    heatbath_identity(&mut eofa, &gauge, &eta, harness)?;
    {
        let once = eofa.phi().cloned().ok_or(ActionError::PreconditionViolation {
            operation: "double refresh",
        })?;
        eofa.refresh_with_noise(&gauge, &once)?;
        let twice = eofa.phi().cloned().ok_or(ActionError::PreconditionViolation {
            operation: "double refresh",
        })?;
        let err = eofa.apply_operator(&gauge, &twice)?.sub(&eta).norm_sq();
        println!("  |M R(R η) − η|² = {err:.3e}");
        harness.check_upper("EOFA double refresh", err, tolerances::DOUBLE_REFRESH_ABS);
    }
    println!();

    // ═══ Phase 3: force consistency ═══
    println!("═══ Phase 3: Exact one flavour force check ═══");
    eofa.refresh(&gauge, &mut GaussianNoise::from_seed(args.seed.wrapping_add(3)))?;
    force_phase("EOFA", &eofa, &gauge, &mom, harness, summary)?;
    println!();

    if args.ratio {
        // ═══ Phase 4: two-flavour ratio ═══
        println!("═══ Phase 4: Two-flavour ratio (m={RATIO_LIGHT_MASS}, PV m={RATIO_PV_MASS}) ═══");
        let tight = ActionConfig {
            solver: IDENTITY_SOLVER,
            ..config.clone()
        };
        let mut ratio = TwoFlavourRatioAction::new(
            staggered(RATIO_PV_MASS, ctx),
            staggered(RATIO_LIGHT_MASS, ctx),
            &tight,
        )?;
        heatbath_identity(&mut ratio, &gauge, &eta, harness)?;

        let production = ActionConfig {
            noise_scale: config.noise_scale,
            imaginary_tolerance: config.imaginary_tolerance,
            threads: config.threads,
            ..ActionConfig::two_flavour_ratio()
        };
        let mut ratio = TwoFlavourRatioAction::new(
            staggered(RATIO_PV_MASS, ctx),
            staggered(RATIO_LIGHT_MASS, ctx),
            &production,
        )?;
        ratio.refresh(&gauge, &mut GaussianNoise::from_seed(args.seed.wrapping_add(4)))?;
        force_phase("two-flavour ratio", &ratio, &gauge, &mom, harness, summary)?;
        println!();
    }
    Ok(())
}

fn staggered(mass: f64, ctx: &Arc<ParallelContext>) -> Arc<dyn FermionOperator> {
    Arc::new(StaggeredOperator::new(mass, Arc::clone(ctx)))
}

fn heatbath_identity(
    action: &mut dyn PseudofermionAction,
    gauge: &GaugeField,
    eta: &FermionField,
    harness: &mut ValidationHarness,
) -> Result<(), ActionError> {
    action.refresh_with_noise(gauge, eta)?;
    let phi = action.phi().cloned().ok_or(ActionError::PreconditionViolation {
        operation: "refresh identity",
    })?;
    let k_phi = action.apply_operator(gauge, &phi)?;
    let lhs = phi.dot(&k_phi);
    let rhs = eta.norm_sq();
    println!("  <φ, K φ> = {:.15e} {:+.3e}i", lhs.re, lhs.im);
    println!("  <η, η>   = {rhs:.15e}");
    let name = action.name();
    harness.check_abs(
        &format!("{name} refresh identity (re)"),
        lhs.re,
        rhs,
        tolerances::REFRESH_IDENTITY_ABS,
    );
    harness.check_abs(
        &format!("{name} refresh identity (im)"),
        lhs.im,
        0.0,
        tolerances::REFRESH_IDENTITY_ABS,
    );
    Ok(())
}

fn force_phase(
    label: &str,
    action: &dyn PseudofermionAction,
    gauge: &GaugeField,
    mom: &[Su3Matrix],
    harness: &mut ValidationHarness,
    summary: &mut RunSummary,
) -> Result<(), ActionError> {
    let check = ForceConsistency::prepare(action, gauge)?;
    let report = check.check(mom, tolerances::FORCE_CHECK_DT, tolerances::FORCE_CHECK_ABS)?;
    println!("  dt      = {:e}", report.dt);
    println!("  S       = {:.15e}", report.action_before);
    println!("  S'      = {:.15e}", report.action_after);
    println!("  dS      = {:.15e}", report.delta);
    println!("  dSpred  = {:.15e}", report.predicted);
    println!("  |dS − dSpred| = {:.3e}", report.residual);
    harness.check_upper(
        &format!("{label} force residual at dt={}", report.dt),
        report.residual,
        report.tolerance,
    );
    harness.check_upper(
        &format!("{label} stepped links unitary"),
        report.unitarity_deviation,
        tolerances::EXACT_F64,
    );
    summary.force_checks.push(report);

    let sweep = check.sweep(mom, &tolerances::FORCE_SWEEP_DTS, tolerances::FORCE_CHECK_ABS)?;
    for r in &sweep {
        println!("  dt={:<8e} residual={:.3e}", r.dt, r.residual);
    }
    for (i, ratio) in residual_ratios(&sweep).into_iter().enumerate() {
        println!("  ratio[{i}] = {ratio:.3} (expected ~4 for O(dt²))");
        harness.check_range(
            &format!("{label} residual ratio {i}"),
            ratio,
            tolerances::FORCE_SWEEP_RATIO_MIN,
            tolerances::FORCE_SWEEP_RATIO_MAX,
        );
    }
    summary.force_checks.extend(sweep);
    Ok(())
}
