//! Explicit symmetric matrix as a Davidson collaborator
//!
//! Useful for testing and for model problems small enough to store. The
//! matrix-vector product is parallelized over rows with rayon; every entry of the
//! result is reduced sequentially, so the output does not depend on thread count.

extern crate nalgebra as na;

use crate::error::{DavidsonError, Result};
use crate::provider::{lowest_diagonal_guess, DavidsonProvider};
use na::{DMatrix, DVector};
use rayon::prelude::*;

/// Dense symmetric operator
#[derive(Debug, Clone)]
pub struct DenseOperator {
    matrix: DMatrix<f64>,
    guess_count: usize,
    preconditioner: Option<DVector<f64>>,
}

impl DenseOperator {
    /// Wrap a symmetric matrix; the guess holds `guess_count` unit vectors
    pub fn new(matrix: DMatrix<f64>, guess_count: usize) -> Result<Self> {
        if !matrix.is_square() {
            return Err(DavidsonError::NonSquareOperator {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
            });
        }
        Ok(DenseOperator {
            matrix,
            guess_count,
            preconditioner: None,
        })
    }

    /// Use `diagonal` instead of the matrix diagonal for preconditioning
    pub fn with_preconditioner(mut self, diagonal: DVector<f64>) -> Self {
        self.preconditioner = Some(diagonal);
        self
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Largest asymmetry `|aᵢⱼ - aⱼᵢ|`
    pub fn asymmetry(&self) -> f64 {
        let n = self.dim();
        let mut largest: f64 = 0.0;
        for j in 0..n {
            for i in 0..j {
                largest = largest.max((self.matrix[(i, j)] - self.matrix[(j, i)]).abs());
            }
        }
        largest
    }

    /// `A x`; row `i` is read as column `i`, which is contiguous and equal by symmetry
    pub fn multiply(&self, x: &[f64]) -> Vec<f64> {
        (0..self.dim())
            .into_par_iter()
            .map(|i| {
                self.matrix
                    .column(i)
                    .iter()
                    .zip(x.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
            })
            .collect()
    }
}

impl DavidsonProvider for DenseOperator {
    fn diagonal(&mut self) -> Vec<f64> {
        self.matrix.diagonal().iter().copied().collect()
    }

    fn initial_guess(&mut self, diagonal: &[f64]) -> Vec<Vec<f64>> {
        lowest_diagonal_guess(diagonal, self.guess_count)
    }

    fn apply(&mut self, trial: &[f64]) -> Vec<f64> {
        self.multiply(trial)
    }

    fn preconditioner(&mut self) -> Option<Vec<f64>> {
        self.preconditioner
            .as_ref()
            .map(|diagonal| diagonal.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> DenseOperator {
        let matrix = DMatrix::from_row_slice(3, 3, &[2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0]);
        DenseOperator::new(matrix, 2).unwrap()
    }

    #[test]
    fn test_multiply_matches_nalgebra() {
        let op = sample();
        let x = [1.0, 2.0, 3.0];
        let expected = op.matrix() * DVector::from_column_slice(&x);
        for (value, reference) in op.multiply(&x).iter().zip(expected.iter()) {
            assert_relative_eq!(*value, *reference, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_provider_callbacks() {
        let mut op = sample();
        let diagonal = op.diagonal();
        assert_eq!(diagonal, vec![2.0, 2.0, 2.0]);
        assert_eq!(op.initial_guess(&diagonal).len(), 2);
        assert!(op.preconditioner().is_none());

        let mut shifted = sample().with_preconditioner(DVector::from_vec(vec![1.0, 1.0, 1.0]));
        assert_eq!(shifted.preconditioner(), Some(vec![1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_asymmetry() {
        assert_eq!(sample().asymmetry(), 0.0);
        let skewed =
            DenseOperator::new(DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]), 1).unwrap();
        assert_relative_eq!(skewed.asymmetry(), 0.5);
    }

    #[test]
    fn test_non_square_matrix_is_rejected() {
        let err = DenseOperator::new(DMatrix::zeros(2, 3), 1).unwrap_err();
        assert_eq!(err, DavidsonError::NonSquareOperator { rows: 2, cols: 3 });
    }
}
