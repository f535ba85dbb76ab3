//! Residuals and per-root convergence tracking
//!
//! Every requested root is re-evaluated against the current Ritz decomposition on each
//! iteration. A root whose residual is below the threshold counts as converged and gets
//! no correction vector; if a lower Ritz pair shows up later and displaces it, its
//! residual rises again and it goes back to receiving corrections.

use crate::projected::RitzDecomposition;
use crate::subspace::Subspace;
use nalgebra::DVector;

/// State of one requested root across iterations
#[derive(Debug, Clone, PartialEq)]
pub struct RootState {
    pub converged: bool,
    /// Residual norm from the last evaluation of this root
    pub residual_norm: f64,
    /// Latest Ritz value
    pub eigenvalue: f64,
    /// Ritz value change since the previous evaluation
    pub eigenvalue_change: f64,
    eigenvector: Option<DVector<f64>>,
}

impl RootState {
    fn new() -> Self {
        RootState {
            converged: false,
            residual_norm: f64::INFINITY,
            eigenvalue: 0.0,
            eigenvalue_change: 0.0,
            eigenvector: None,
        }
    }

    /// Latest Ritz vector, once the root has been evaluated
    pub fn eigenvector(&self) -> Option<&DVector<f64>> {
        self.eigenvector.as_ref()
    }
}

/// Residual of a root that is still unconverged after evaluation
#[derive(Debug, Clone)]
pub struct Residual {
    pub root: usize,
    /// Ritz value θ the residual belongs to
    pub value: f64,
    /// `S z - θ T z` in the full space
    pub vector: DVector<f64>,
    pub norm: f64,
}

/// Convergence bookkeeping for the `n_roots` lowest Ritz pairs
#[derive(Debug, Clone)]
pub struct RootTracker {
    roots: Vec<RootState>,
    threshold: f64,
}

impl RootTracker {
    pub fn new(n_roots: usize, threshold: f64) -> Self {
        RootTracker {
            roots: vec![RootState::new(); n_roots],
            threshold,
        }
    }

    pub fn roots(&self) -> &[RootState] {
        &self.roots
    }

    pub fn all_converged(&self) -> bool {
        self.roots.iter().all(|root| root.converged)
    }

    /// Indices of the roots that are not converged yet
    pub fn unconverged(&self) -> Vec<usize> {
        self.roots
            .iter()
            .enumerate()
            .filter(|(_, root)| !root.converged)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn max_residual_norm(&self) -> f64 {
        self.roots
            .iter()
            .filter(|root| !root.converged)
            .map(|root| root.residual_norm)
            .fold(0.0, f64::max)
    }

    /// Evaluate every root against the current Ritz decomposition
    ///
    /// For root `i` with Ritz value θ and coordinates `z`, the Ritz vector is `T z`,
    /// its image `S z` and the residual `S z - θ T z`. The residuals of roots at or
    /// above the threshold are returned in root order.
    pub fn evaluate(&mut self, subspace: &Subspace, ritz: &RitzDecomposition) -> Vec<Residual> {
        let trials = subspace.trials();
        let sigmas = subspace.sigmas();
        let mut residuals = Vec::new();

        for (index, root) in self.roots.iter_mut().enumerate() {
            let theta = ritz.value(index);
            let coefficients = ritz.coefficients(index);
            let ritz_vector = &trials * &coefficients;
            let ritz_sigma = &sigmas * &coefficients;
            let residual = ritz_sigma - &ritz_vector * theta;
            let norm = residual.norm();

            root.eigenvalue_change = theta - root.eigenvalue;
            root.eigenvalue = theta;
            root.residual_norm = norm;
            root.converged = norm < self.threshold;
            root.eigenvector = Some(ritz_vector);

            if !root.converged {
                residuals.push(Residual {
                    root: index,
                    value: theta,
                    vector: residual,
                    norm,
                });
            }
        }

        residuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projected::ProjectedMatrix;
    use crate::subspace::Insertion;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn subspace_for(a: &DMatrix<f64>, vectors: &[Vec<f64>]) -> Subspace {
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

    fn ritz_of(subspace: &Subspace) -> RitzDecomposition {
        let mut projected = ProjectedMatrix::new();
        projected.update(subspace);
        projected.diagonalize()
    }

    #[test]
    fn test_exact_eigenvectors_converge_immediately() {
        let a = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 2.0, 5.0]));
        let subspace = subspace_for(&a, &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
        let mut tracker = RootTracker::new(2, 1e-8);

        let residuals = tracker.evaluate(&subspace, &ritz_of(&subspace));
        assert!(residuals.is_empty());
        assert!(tracker.all_converged());
        assert_relative_eq!(tracker.roots()[0].eigenvalue, 1.0, epsilon = 1e-14);
        assert_relative_eq!(tracker.roots()[1].eigenvalue, 2.0, epsilon = 1e-14);
        assert!(tracker.roots()[0].eigenvector().is_some());
    }

    #[test]
    fn test_residual_matches_definition() {
        let a = DMatrix::from_row_slice(3, 3, &[2.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 4.0]);
        let subspace = subspace_for(&a, &[vec![1.0, 0.0, 0.0]]);
        let mut tracker = RootTracker::new(1, 1e-8);

        let residuals = tracker.evaluate(&subspace, &ritz_of(&subspace));
        assert_eq!(residuals.len(), 1);
        // θ = a₀₀ = 2, r = A e₀ - 2 e₀ = (0, 1, 0)
        assert_relative_eq!(residuals[0].value, 2.0, epsilon = 1e-14);
        assert_relative_eq!(residuals[0].vector[1], 1.0, epsilon = 1e-14);
        assert_relative_eq!(residuals[0].norm, 1.0, epsilon = 1e-14);
        assert_eq!(tracker.unconverged(), vec![0]);
        assert_relative_eq!(tracker.max_residual_norm(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_converged_root_follows_lower_ritz_pair() {
        // e₁ is an exact eigenvector (2), but the true second root lies in span{e₀, e₂}
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.0, 1.0, 0.0, 2.0, 0.0, 1.0, 0.0, 1.0],
        );
        let mut tracker = RootTracker::new(2, 1e-8);

        let small = subspace_for(&a, &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
        let residuals = tracker.evaluate(&small, &ritz_of(&small));
        assert!(tracker.roots()[1].converged);
        assert_eq!(residuals.len(), 1);
        assert_eq!(tracker.unconverged(), vec![0]);

        // the full space has eigenvalues 0, 2, 2: root 0 drops from 1 to 0
        let full = subspace_for(
            &a,
            &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
        );
        assert!(tracker.evaluate(&full, &ritz_of(&full)).is_empty());
        assert_relative_eq!(tracker.roots()[0].eigenvalue, 0.0, epsilon = 1e-12);
        assert_relative_eq!(tracker.roots()[1].eigenvalue, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_displaced_root_is_unflagged() {
        let a = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 2.0, 5.0]));
        let subspace = subspace_for(&a, &[vec![1.0, 0.0, 0.0]]);
        let mut tracker = RootTracker::new(1, 1e-8);
        tracker.evaluate(&subspace, &ritz_of(&subspace));
        assert!(tracker.all_converged());

        // a decomposition whose lowest pair is not an eigenpair of the operator
        let shifted = RitzDecomposition::from_symmetric(DMatrix::from_element(1, 1, 7.0));
        let residuals = tracker.evaluate(&subspace, &shifted);
        assert_eq!(residuals.len(), 1);
        assert!(!tracker.all_converged());
        assert_relative_eq!(tracker.roots()[0].eigenvalue, 7.0, epsilon = 1e-14);
        assert_relative_eq!(residuals[0].norm, 6.0, epsilon = 1e-14);
    }
}
