//! Davidson-Liu block eigensolver
//!
//! Computes the lowest few eigenpairs of a large symmetric operator that is only
//! available through a matrix-vector product. The operator is supplied through the
//! [`DavidsonProvider`] trait (or closures via [`FnProvider`]); the solver never stores
//! or inspects the operator itself.
//!
//! ## Modules
//!
//! - `subspace`: orthonormal trial vectors and their sigma vectors
//! - `projected`: projected matrix and the dense eigen-step
//! - `convergence`: residuals and per-root convergence
//! - `correction`: diagonal preconditioner and correction vectors
//! - `solver`: the iteration driver
//! - `operator`: explicit dense matrix collaborator

pub mod convergence;
pub mod correction;
pub mod error;
pub mod operator;
pub mod projected;
pub mod provider;
pub mod settings;
pub mod solver;
pub mod subspace;

/// Re-export commonly used types
pub use error::{Callback, ContractIssue, DavidsonError, Result};
pub use operator::DenseOperator;
pub use provider::{lowest_diagonal_guess, DavidsonProvider, FnProvider};
pub use settings::SolverSettings;
pub use solver::{
    diagonalize, diagonalize_with_preconditioner, residual_norm, DavidsonSolver, Solution,
    SolveStats, SolverState, Step,
};
