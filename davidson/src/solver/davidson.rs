//! Core Davidson-Liu iteration
//!
//! Implementation of the block Davidson algorithm with diagonal preconditioning,
//! deflation of converged roots and subspace collapse onto the lowest Ritz vectors.

extern crate nalgebra as na;

use crate::convergence::{RootState, RootTracker};
use crate::correction::{Preconditioner, PreconditionerSource};
use crate::error::{Callback, ContractIssue, DavidsonError, Result};
use crate::projected::{ProjectedMatrix, RitzDecomposition};
use crate::provider::{checked_diagonal, checked_vector, DavidsonProvider, FnProvider};
use crate::settings::SolverSettings;
use crate::subspace::{Insertion, Subspace};
use na::DVector;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Iteration report at `info`, or at `debug` when the settings ask for quiet output
macro_rules! report {
    ($quiet:expr, $($arg:tt)+) => {
        if $quiet {
            debug!($($arg)+)
        } else {
            info!($($arg)+)
        }
    };
}

/// Converged eigenpairs, lowest first
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Vec<Vec<f64>>,
    /// Residual norm of each eigenpair in the final iteration
    pub residual_norms: Vec<f64>,
    pub stats: SolveStats,
}

/// Bookkeeping of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
    /// Number of projected diagonalizations performed
    pub iterations: usize,
    pub collapses: usize,
    /// Number of `apply` calls
    pub sigma_evaluations: usize,
    /// Guess or correction vectors rejected by the subspace
    pub discarded_vectors: usize,
}

/// Where the state machine currently is
#[derive(Debug, Clone, PartialEq)]
pub enum SolverState {
    Iterating,
    Converged,
    Failed(DavidsonError),
}

/// Outcome of one successful iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Converged,
}

/// Davidson-Liu solver bound to one collaborator
pub struct DavidsonSolver<P: DavidsonProvider> {
    provider: P,
    settings: SolverSettings,
    subspace: Subspace,
    projected: ProjectedMatrix,
    tracker: RootTracker,
    preconditioner: Preconditioner,
    stats: SolveStats,
    state: SolverState,
}

impl<P: DavidsonProvider> DavidsonSolver<P> {
    /// Initialize the solver: diagonal, guess, preconditioner and the seed sigma vectors
    ///
    /// Each collaborator callback is validated before its output is used; a
    /// malformed result aborts with [`DavidsonError::ContractViolation`].
    pub fn new(mut provider: P, settings: SolverSettings) -> Result<Self> {
        settings.validate()?;
        let n_roots = settings.n_roots;

        report!(settings.quiet, "Davidson diagonalization");
        report!(
            settings.quiet,
            "  Roots: {}, max iterations: {}, residual threshold: {:.2e}",
            n_roots,
            settings.max_iterations,
            settings.convergence_threshold
        );

        let start = Instant::now();
        let diagonal = checked_diagonal(provider.diagonal())?;
        let dim = diagonal.len();
        report!(
            settings.quiet,
            "  Diagonal of dimension {} computed ({:.4} s)",
            dim,
            start.elapsed().as_secs_f64()
        );

        if dim < n_roots {
            return Err(DavidsonError::InvalidSettings(format!(
                "{} roots requested from an operator of dimension {}",
                n_roots, dim
            )));
        }

        let start = Instant::now();
        let raw_guesses = provider.initial_guess(diagonal.as_slice());
        if raw_guesses.len() < n_roots {
            return Err(DavidsonError::contract(
                Callback::InitialGuess,
                ContractIssue::TooFewVectors {
                    required: n_roots,
                    actual: raw_guesses.len(),
                },
            ));
        }
        let guesses = raw_guesses
            .into_iter()
            .enumerate()
            .map(|(index, guess)| checked_vector(Callback::InitialGuess, index, guess, dim))
            .collect::<Result<Vec<_>>>()?;
        report!(
            settings.quiet,
            "  {} guess vectors computed ({:.4} s)",
            guesses.len(),
            start.elapsed().as_secs_f64()
        );

        let preconditioner = match provider.preconditioner() {
            Some(values) => Preconditioner::new(
                checked_vector(Callback::Preconditioner, 0, values, dim)?,
                PreconditionerSource::Collaborator,
            ),
            None => Preconditioner::new(diagonal, PreconditionerSource::OperatorDiagonal),
        };
        debug!("Preconditioner source: {:?}", preconditioner.source());

        let capacity = settings.max_subspace_size.min(dim);
        let mut solver = DavidsonSolver {
            provider,
            subspace: Subspace::new(dim, capacity, settings.discard_threshold),
            projected: ProjectedMatrix::new(),
            tracker: RootTracker::new(n_roots, settings.convergence_threshold),
            preconditioner,
            stats: SolveStats::default(),
            state: SolverState::Iterating,
            settings,
        };

        let mut accepted = Vec::with_capacity(guesses.len());
        for (index, guess) in guesses.iter().enumerate() {
            match solver.subspace.add_vector(guess) {
                Insertion::Accepted(handle) => accepted.push(handle),
                Insertion::Dependent { norm } => {
                    solver.stats.discarded_vectors += 1;
                    warn!(
                        "Guess vector {} discarded, norm ({:.2e}) below threshold ({:.2e})",
                        index, norm, solver.settings.discard_threshold
                    );
                }
                Insertion::Full => {
                    solver.stats.discarded_vectors += 1;
                    warn!(
                        "Guess vector {} ignored, subspace capacity {} reached",
                        index, capacity
                    );
                }
            }
        }

        if accepted.len() < n_roots {
            return Err(DavidsonError::contract(
                Callback::InitialGuess,
                ContractIssue::RankDeficient {
                    required: n_roots,
                    rank: accepted.len(),
                },
            ));
        }

        for handle in accepted {
            solver.compute_sigma(handle)?;
        }

        Ok(solver)
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn subspace(&self) -> &Subspace {
        &self.subspace
    }

    pub fn roots(&self) -> &[RootState] {
        self.tracker.roots()
    }

    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    pub fn state(&self) -> &SolverState {
        &self.state
    }

    /// Run one iteration
    ///
    /// Builds the projected matrix, checks convergence and, unless done, extends the
    /// subspace with correction vectors (collapsing it first when they would not fit).
    /// On the last budgeted iteration no corrections are generated.
    pub fn step(&mut self) -> Result<Step> {
        match &self.state {
            SolverState::Converged => return Ok(Step::Converged),
            SolverState::Failed(err) => return Err(err.clone()),
            SolverState::Iterating => {}
        }

        let start = Instant::now();
        let iteration = self.stats.iterations;
        self.stats.iterations += 1;

        debug_assert!(self.subspace.is_fully_paired());
        self.projected.update(&self.subspace);
        let ritz = self.projected.diagonalize();
        let residuals = self.tracker.evaluate(&self.subspace, &ritz);
        self.report_iteration(iteration);

        if self.tracker.all_converged() {
            report!(
                self.settings.quiet,
                "  *** Convergence of residuals reached after {} iterations ({:.4} s) ***",
                self.stats.iterations,
                start.elapsed().as_secs_f64()
            );
            self.state = SolverState::Converged;
            return Ok(Step::Converged);
        }

        if self.stats.iterations >= self.settings.max_iterations {
            let err = DavidsonError::NonConvergence {
                iterations: self.stats.iterations,
                unconverged: self.tracker.unconverged(),
                max_residual_norm: self.tracker.max_residual_norm(),
            };
            warn!("{}", err);
            return Err(self.fail(err));
        }

        let candidates = self.preconditioner.candidates(&residuals);
        if self.subspace.len() + candidates.len() > self.subspace.capacity() {
            self.collapse(&ritz);
        }

        let mut accepted = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            match self.subspace.add_vector(&candidate.vector) {
                Insertion::Accepted(handle) => accepted.push(handle),
                Insertion::Dependent { norm } => {
                    self.stats.discarded_vectors += 1;
                    warn!(
                        "Correction vector of root {} discarded, norm ({:.2e}) below threshold ({:.2e})",
                        candidate.root, norm, self.settings.discard_threshold
                    );
                }
                Insertion::Full => {
                    self.stats.discarded_vectors += 1;
                    debug!(
                        "Correction vector of root {} dropped, subspace is full",
                        candidate.root
                    );
                }
            }
        }

        if accepted.is_empty() {
            let err = DavidsonError::Stagnation {
                iteration: self.stats.iterations,
                unconverged: self.tracker.unconverged(),
            };
            warn!("{}", err);
            return Err(self.fail(err));
        }

        for handle in accepted {
            self.compute_sigma(handle)?;
        }

        debug!(
            "Iteration {} done, subspace size {} ({:.4} s)",
            iteration,
            self.subspace.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(Step::Continue)
    }

    /// Iterate until convergence or failure
    pub fn solve(mut self) -> Result<Solution> {
        while self.step()? == Step::Continue {}
        Ok(self.collect_solution())
    }

    /// The converged eigenpairs, once the solver has converged
    pub fn solution(&self) -> Option<Solution> {
        match self.state {
            SolverState::Converged => Some(self.collect_solution()),
            _ => None,
        }
    }

    fn collect_solution(&self) -> Solution {
        let mut pairs: Vec<(usize, &RootState)> = self.tracker.roots().iter().enumerate().collect();
        pairs.sort_by(|(a, root_a), (b, root_b)| {
            root_a
                .eigenvalue
                .total_cmp(&root_b.eigenvalue)
                .then(a.cmp(b))
        });

        let mut solution = Solution {
            eigenvalues: Vec::with_capacity(pairs.len()),
            eigenvectors: Vec::with_capacity(pairs.len()),
            residual_norms: Vec::with_capacity(pairs.len()),
            stats: self.stats,
        };
        for (_, root) in pairs {
            if let Some(vector) = root.eigenvector() {
                solution.eigenvalues.push(root.eigenvalue);
                solution.eigenvectors.push(vector.iter().copied().collect());
                solution.residual_norms.push(root.residual_norm);
            }
        }
        solution
    }

    /// Apply the operator to trial vector `handle` and pair the result
    fn compute_sigma(&mut self, handle: usize) -> Result<()> {
        let trial: Vec<f64> = self.subspace.trial(handle).iter().copied().collect();
        let sigma = self.provider.apply(&trial);
        self.stats.sigma_evaluations += 1;
        match checked_vector(Callback::Apply, handle, sigma, self.subspace.dim()) {
            Ok(sigma) => {
                self.subspace.pair_sigma(handle, &sigma);
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Restart the subspace from the lowest `collapse_size` Ritz vectors
    fn collapse(&mut self, ritz: &RitzDecomposition) {
        let before = self.subspace.len();
        let keep = self.settings.collapse_size.min(ritz.len());
        let kept = self.subspace.collapse(&ritz.lowest(keep));
        self.projected.reset();
        self.stats.collapses += 1;
        report!(
            self.settings.quiet,
            "  Subspace collapsed from {} to {} vectors",
            before,
            kept
        );
    }

    fn report_iteration(&self, iteration: usize) {
        report!(
            self.settings.quiet,
            "  Iter {:3}  (subspace size {})",
            iteration,
            self.subspace.len()
        );
        for (index, root) in self.tracker.roots().iter().enumerate() {
            let marker = if root.converged { "*" } else { " " };
            report!(
                self.settings.quiet,
                "    State {:3}{}: E = {:16.10}  (DE = {:14.10}  N(R) = {:.3e})",
                index,
                marker,
                root.eigenvalue,
                root.eigenvalue_change,
                root.residual_norm
            );
        }
    }

    fn fail(&mut self, err: DavidsonError) -> DavidsonError {
        self.state = SolverState::Failed(err.clone());
        err
    }
}

/// Lowest `settings.n_roots` eigenpairs from three collaborator closures
///
/// The operator diagonal doubles as the preconditioner.
pub fn diagonalize<D, G, A>(
    settings: &SolverSettings,
    calc_diag: D,
    calc_guess: G,
    calc_sigma: A,
) -> Result<Solution>
where
    D: FnMut() -> Vec<f64>,
    G: FnMut(&[f64]) -> Vec<Vec<f64>>,
    A: FnMut(&[f64]) -> Vec<f64>,
{
    let provider = FnProvider::new(calc_diag, calc_guess, calc_sigma);
    DavidsonSolver::new(provider, settings.clone())?.solve()
}

/// Like [`diagonalize`], with a separate preconditioner diagonal
pub fn diagonalize_with_preconditioner<D, G, A, C>(
    settings: &SolverSettings,
    calc_diag: D,
    calc_guess: G,
    calc_sigma: A,
    preconditioner: C,
) -> Result<Solution>
where
    D: FnMut() -> Vec<f64>,
    G: FnMut(&[f64]) -> Vec<Vec<f64>>,
    A: FnMut(&[f64]) -> Vec<f64>,
    C: FnMut() -> Vec<f64>,
{
    let provider =
        FnProvider::new(calc_diag, calc_guess, calc_sigma).with_preconditioner(preconditioner);
    DavidsonSolver::new(provider, settings.clone())?.solve()
}

/// Residual norm `‖A v - θ v‖` of an eigenpair, with `A` given by `apply`
pub fn residual_norm<A>(mut apply: A, eigenvalue: f64, eigenvector: &[f64]) -> f64
where
    A: FnMut(&[f64]) -> Vec<f64>,
{
    let image = DVector::from_vec(apply(eigenvector));
    let vector = DVector::from_column_slice(eigenvector);
    (image - vector * eigenvalue).norm()
}
