//! Projected matrix `Tᵀ A T` and its dense diagonalization
//!
//! The matrix is grown incrementally: each update computes only the rows and columns of
//! trial vectors added since the previous update. After a collapse it is rebuilt from
//! scratch. Entries are symmetrized as `0.5 (tᵢ·σⱼ + tⱼ·σᵢ)`.

extern crate nalgebra as na;

use crate::subspace::Subspace;
use na::{DMatrix, DMatrixView, DVector, DVectorView};

/// Operator restricted to the paired part of a [`Subspace`]
#[derive(Debug, Clone)]
pub struct ProjectedMatrix {
    matrix: DMatrix<f64>,
    size: usize,
}

impl ProjectedMatrix {
    pub fn new() -> Self {
        ProjectedMatrix {
            matrix: DMatrix::zeros(0, 0),
            size: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn matrix(&self) -> DMatrixView<'_, f64> {
        self.matrix.view((0, 0), (self.size, self.size))
    }

    /// Forget every entry; the next update recomputes the whole matrix
    pub fn reset(&mut self) {
        self.size = 0;
    }

    /// Extend the matrix to the current paired subspace
    ///
    /// Returns the number of new rows/columns computed. A subspace that shrank since
    /// the last update triggers a full rebuild.
    pub fn update(&mut self, subspace: &Subspace) -> usize {
        let k = subspace.paired_len();
        if k < self.size {
            self.reset();
        }
        let previous = self.size;
        if k > self.matrix.nrows() {
            self.matrix.resize_mut(k, k, 0.0);
        }

        let trials = subspace.trials();
        let sigmas = subspace.sigmas();
        for j in previous..k {
            for i in 0..=j {
                let element =
                    0.5 * (trials.column(i).dot(&sigmas.column(j))
                        + trials.column(j).dot(&sigmas.column(i)));
                self.matrix[(i, j)] = element;
                self.matrix[(j, i)] = element;
            }
        }

        self.size = k;
        k - previous
    }

    /// Ritz values in ascending order with their subspace eigenvectors
    pub fn diagonalize(&self) -> RitzDecomposition {
        RitzDecomposition::from_symmetric(self.matrix().clone_owned())
    }
}

impl Default for ProjectedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Eigen-decomposition of the projected matrix
///
/// Eigenvalues ascend; ties keep the order produced by the dense solver. Every
/// eigenvector is signed so its largest-magnitude entry is positive.
#[derive(Debug, Clone)]
pub struct RitzDecomposition {
    pub values: DVector<f64>,
    pub vectors: DMatrix<f64>,
}

impl RitzDecomposition {
    pub fn from_symmetric(matrix: DMatrix<f64>) -> Self {
        let k = matrix.nrows();
        let eigen = matrix.symmetric_eigen();

        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| {
            eigen.eigenvalues[a]
                .total_cmp(&eigen.eigenvalues[b])
                .then(a.cmp(&b))
        });

        let values = DVector::from_iterator(k, order.iter().map(|&i| eigen.eigenvalues[i]));
        let mut vectors = DMatrix::zeros(k, k);
        for (target, &source) in order.iter().enumerate() {
            vectors.set_column(target, &eigen.eigenvectors.column(source));
        }

        RitzDecomposition {
            values,
            vectors: align_eigenvectors(vectors),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, root: usize) -> f64 {
        self.values[root]
    }

    /// Subspace coordinates of Ritz vector `root`
    pub fn coefficients(&self, root: usize) -> DVectorView<'_, f64> {
        self.vectors.column(root)
    }

    /// Coordinates of the `count` lowest Ritz vectors, one per column
    pub fn lowest(&self, count: usize) -> DMatrix<f64> {
        self.vectors.columns(0, count.min(self.len())).into_owned()
    }
}

/// Given a matrix where each column is an eigenvector, flip each column so that its
/// entry with the largest absolute value is positive. The first such entry wins ties.
pub fn align_eigenvectors(mut eigvecs: DMatrix<f64>) -> DMatrix<f64> {
    for j in 0..eigvecs.ncols() {
        let mut pivot = 0.0_f64;
        for &value in eigvecs.column(j).iter() {
            if value.abs() > pivot.abs() {
                pivot = value;
            }
        }
        if pivot < 0.0 {
            eigvecs.column_mut(j).neg_mut();
        }
    }
    eigvecs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subspace::Insertion;
    use approx::assert_relative_eq;

    fn filled_subspace(a: &DMatrix<f64>, vectors: &[Vec<f64>]) -> Subspace {
        let mut subspace = Subspace::new(a.nrows(), a.nrows(), 1e-7);
        for v in vectors {
            if let Insertion::Accepted(index) = subspace.add_vector(&DVector::from_vec(v.clone()))
            {
                let sigma = a * subspace.trial(index);
                subspace.pair_sigma(index, &sigma);
            }
        }
        subspace
    }

    fn sample_matrix() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            4,
            4,
            &[
                4.0, 1.0, 0.5, 0.0, //
                1.0, 3.0, 0.2, 0.1, //
                0.5, 0.2, 2.0, 0.3, //
                0.0, 0.1, 0.3, 1.0,
            ],
        )
    }

    #[test]
    fn test_incremental_update_matches_full_projection() {
        let a = sample_matrix();
        let mut subspace = filled_subspace(&a, &[vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 1.0, 0.0]]);
        let mut projected = ProjectedMatrix::new();
        assert_eq!(projected.update(&subspace), 2);

        if let Insertion::Accepted(index) =
            subspace.add_vector(&DVector::from_vec(vec![0.0, 0.0, 1.0, 1.0]))
        {
            let sigma = &a * subspace.trial(index);
            subspace.pair_sigma(index, &sigma);
        }
        assert_eq!(projected.update(&subspace), 1);
        assert_eq!(projected.size(), 3);

        let t = subspace.trials();
        let reference = t.transpose() * &a * t;
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(projected.matrix()[(i, j)], reference[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_update_without_new_vectors_is_noop() {
        let a = sample_matrix();
        let subspace = filled_subspace(&a, &[vec![1.0, 0.0, 0.0, 0.0]]);
        let mut projected = ProjectedMatrix::new();
        projected.update(&subspace);
        assert_eq!(projected.update(&subspace), 0);
    }

    #[test]
    fn test_rebuild_after_collapse() {
        let a = sample_matrix();
        let mut subspace = filled_subspace(
            &a,
            &[
                vec![1.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0],
            ],
        );
        let mut projected = ProjectedMatrix::new();
        projected.update(&subspace);
        let ritz = projected.diagonalize();

        subspace.collapse(&ritz.lowest(2));
        projected.reset();
        assert_eq!(projected.update(&subspace), 2);

        // the collapsed basis consists of Ritz vectors, so the projection is diagonal
        let m = projected.matrix();
        assert_relative_eq!(m[(0, 0)], ritz.value(0), epsilon = 1e-12);
        assert_relative_eq!(m[(1, 1)], ritz.value(1), epsilon = 1e-12);
        assert_relative_eq!(m[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_diagonalize_sorts_ascending() {
        let matrix = DMatrix::from_diagonal(&DVector::from_vec(vec![3.0, -1.0, 2.0]));
        let ritz = RitzDecomposition::from_symmetric(matrix);

        for (value, expected) in ritz.values.iter().zip([-1.0, 2.0, 3.0]) {
            assert_relative_eq!(*value, expected, epsilon = 1e-12);
        }
        assert_relative_eq!(ritz.coefficients(0)[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ritz.coefficients(1)[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ritz.coefficients(2)[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_diagonalize_is_deterministic() {
        let matrix = sample_matrix();
        let first = RitzDecomposition::from_symmetric(matrix.clone());
        let second = RitzDecomposition::from_symmetric(matrix);
        assert_eq!(first.values, second.values);
        assert_eq!(first.vectors, second.vectors);
    }

    #[test]
    fn test_align_eigenvectors_makes_pivot_positive() {
        let vectors = DMatrix::from_row_slice(2, 2, &[0.6, -0.8, -0.8, -0.6]);
        let aligned = align_eigenvectors(vectors);
        assert_relative_eq!(aligned[(0, 0)], -0.6);
        assert_relative_eq!(aligned[(1, 0)], 0.8);
        assert_relative_eq!(aligned[(0, 1)], 0.8);
        assert_relative_eq!(aligned[(1, 1)], 0.6);
    }
}
