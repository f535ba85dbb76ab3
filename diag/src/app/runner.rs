use super::model::build_operator;
use crate::config::{Args, Config};
use color_eyre::eyre::{Result, WrapErr};
use davidson::{DavidsonSolver, Solution, SolverSettings};
use nalgebra::DMatrix;
use std::time::Instant;
use tracing::info;

/// Solver settings: library defaults, then the YAML values, then command-line overrides
pub fn resolve_settings(args: &Args, config: &Config) -> SolverSettings {
    let params = &config.davidson;
    let n_roots = args.n_roots.or(params.n_roots).unwrap_or(1);

    let mut settings = SolverSettings::new(n_roots);
    if let Some(max_iterations) = args.max_iterations.or(params.max_iterations) {
        settings = settings.with_max_iterations(max_iterations);
    }
    if let Some(threshold) = args.convergence_threshold.or(params.convergence_threshold) {
        settings = settings.with_convergence_threshold(threshold);
    }
    if let Some(size) = args.max_subspace_size.or(params.max_subspace_size) {
        settings = settings.with_max_subspace_size(size);
    }
    if let Some(size) = params.collapse_size {
        settings = settings.with_collapse_size(size);
    }
    if let Some(threshold) = params.discard_threshold {
        settings = settings.with_discard_threshold(threshold);
    }
    settings.with_quiet(args.quiet || params.quiet.unwrap_or(false))
}

pub fn run_davidson(matrix: DMatrix<f64>, args: &Args, config: &Config) -> Result<Solution> {
    let settings = resolve_settings(args, config);
    info!("Davidson settings: {:?}", settings);

    let operator = build_operator(
        matrix,
        settings.n_roots,
        config.davidson.preconditioner_shift,
    )?;

    let start = Instant::now();
    let solution = DavidsonSolver::new(operator, settings)
        .wrap_err("Failed to initialize the Davidson solver")?
        .solve()
        .wrap_err("Davidson iterations failed")?;
    info!(
        "Davidson finished in {:.4} s",
        start.elapsed().as_secs_f64()
    );
    Ok(solution)
}
