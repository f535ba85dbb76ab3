//! Davidson-Liu driver
//!
//! This module sequences the subspace store, projected matrix, convergence tracker and
//! preconditioner into the iterative loop:
//!
//! ```text
//! INIT → ITERATING ⇄ COLLAPSING → CONVERGED | FAILED
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use davidson::{diagonalize, lowest_diagonal_guess, SolverSettings};
//!
//! let settings = SolverSettings::new(3).with_convergence_threshold(1e-8);
//! let solution = diagonalize(
//!     &settings,
//!     || hamiltonian.diagonal(),
//!     |diag| lowest_diagonal_guess(diag, 3),
//!     |trial| hamiltonian.sigma(trial),
//! )?;
//! ```
//!
//! For step-wise control (inspecting the subspace between iterations) use
//! [`DavidsonSolver`] directly.

mod davidson;

pub use davidson::{
    diagonalize, diagonalize_with_preconditioner, residual_norm, DavidsonSolver, Solution,
    SolveStats, SolverState, Step,
};
