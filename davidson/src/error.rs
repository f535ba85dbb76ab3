//! Error types for the Davidson solver
//!
//! Every failure of the solver is surfaced as a [`DavidsonError`]. The solver never
//! retries on its own: restarting with a larger subspace or a looser tolerance is a
//! decision for the caller.

use std::fmt;
use thiserror::Error;

/// Result type alias using the solver's error
pub type Result<T> = std::result::Result<T, DavidsonError>;

/// The collaborator callback that produced a malformed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Diagonal,
    InitialGuess,
    Apply,
    Preconditioner,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Callback::Diagonal => "diagonal",
            Callback::InitialGuess => "initial guess",
            Callback::Apply => "apply",
            Callback::Preconditioner => "preconditioner",
        };
        f.write_str(name)
    }
}

/// What exactly was wrong with a collaborator's output
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractIssue {
    #[error("vector {index} has length {actual}, expected {expected}")]
    WrongLength {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("vector {index} holds a non-finite value {value} at position {position}")]
    NonFinite {
        index: usize,
        position: usize,
        value: f64,
    },

    #[error("returned an empty vector, the operator dimension must be at least 1")]
    EmptyDimension,

    #[error("returned {actual} vectors, at least {required} are needed")]
    TooFewVectors { required: usize, actual: usize },

    #[error("vectors span only {rank} dimensions, at least {required} are needed")]
    RankDeficient { required: usize, rank: usize },
}

/// Errors that can occur while diagonalizing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DavidsonError {
    /// The iteration budget ran out before every root converged
    #[error(
        "Davidson solver did not converge in {iterations} iterations \
         ({} unconverged roots, max residual norm {max_residual_norm:.3e})",
        .unconverged.len()
    )]
    NonConvergence {
        iterations: usize,
        unconverged: Vec<usize>,
        max_residual_norm: f64,
    },

    /// Every correction vector of an iteration was linearly dependent on the subspace
    #[error(
        "Davidson solver stagnated at iteration {iteration}: no correction vector could be \
         added for roots {unconverged:?}"
    )]
    Stagnation {
        iteration: usize,
        unconverged: Vec<usize>,
    },

    /// A collaborator returned output that breaks the callback contract
    #[error("{callback} callback violated its contract: {issue}")]
    ContractViolation {
        callback: Callback,
        issue: ContractIssue,
    },

    /// A dense operator matrix that is not square
    #[error("Operator matrix must be square, got {rows}x{cols}")]
    NonSquareOperator { rows: usize, cols: usize },

    /// The solver settings are inconsistent
    #[error("Invalid solver settings: {0}")]
    InvalidSettings(String),
}

impl DavidsonError {
    pub(crate) fn contract(callback: Callback, issue: ContractIssue) -> Self {
        DavidsonError::ContractViolation { callback, issue }
    }
}
