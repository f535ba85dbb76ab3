//! Davidson diagonal preconditioner
//!
//! Correction vectors are `t[k] = r[k] / (θ - d[k])`, with `d` the operator diagonal or
//! a collaborator-supplied replacement. Denominators smaller than
//! [`DENOMINATOR_FLOOR`] in magnitude are clamped to `±DENOMINATOR_FLOOR`.

use crate::convergence::Residual;
use nalgebra::DVector;

/// Smallest magnitude allowed for `θ - d[k]`
pub const DENOMINATOR_FLOOR: f64 = 1e-8;

/// Where the preconditioner diagonal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionerSource {
    OperatorDiagonal,
    Collaborator,
}

/// Diagonal preconditioner, fixed for the whole run
#[derive(Debug, Clone)]
pub struct Preconditioner {
    diagonal: DVector<f64>,
    source: PreconditionerSource,
}

/// A correction vector waiting to be offered to the subspace
#[derive(Debug, Clone)]
pub struct Candidate {
    pub root: usize,
    pub vector: DVector<f64>,
}

impl Preconditioner {
    pub fn new(diagonal: DVector<f64>, source: PreconditionerSource) -> Self {
        Preconditioner { diagonal, source }
    }

    pub fn source(&self) -> PreconditionerSource {
        self.source
    }

    pub fn diagonal(&self) -> &DVector<f64> {
        &self.diagonal
    }

    /// Precondition one residual for Ritz value `theta`
    pub fn correction(&self, theta: f64, residual: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            residual.len(),
            residual
                .iter()
                .zip(self.diagonal.iter())
                .map(|(&r, &d)| r / guarded_denominator(theta - d)),
        )
    }

    /// One candidate per residual, in root order
    pub fn candidates(&self, residuals: &[Residual]) -> Vec<Candidate> {
        residuals
            .iter()
            .map(|residual| Candidate {
                root: residual.root,
                vector: self.correction(residual.value, &residual.vector),
            })
            .collect()
    }
}

fn guarded_denominator(denominator: f64) -> f64 {
    if denominator.abs() >= DENOMINATOR_FLOOR {
        denominator
    } else if denominator >= 0.0 {
        DENOMINATOR_FLOOR
    } else {
        -DENOMINATOR_FLOOR
    }
}
