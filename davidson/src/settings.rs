//! Solver settings and their defaults

use crate::error::{DavidsonError, Result};

/// Default iteration budget
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default residual-norm cutoff for a root to count as converged
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-5;

/// Default norm below which an orthogonalized candidate is treated as linearly dependent
pub const DEFAULT_DISCARD_THRESHOLD: f64 = 1e-7;

/// Default subspace budget, in trial vectors per requested root
pub const TRIAL_VECTORS_PER_ROOT: usize = 10;

/// Configuration of a Davidson run
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSettings {
    /// Number of lowest eigenpairs requested
    pub n_roots: usize,
    pub max_iterations: usize,
    /// Residual-norm cutoff `‖Av - θv‖`
    pub convergence_threshold: f64,
    /// Upper bound on the number of trial vectors before a collapse
    pub max_subspace_size: usize,
    /// Number of Ritz vectors kept by a collapse (at least `n_roots`)
    pub collapse_size: usize,
    /// Absolute norm threshold for rejecting a unit candidate after orthogonalization
    pub discard_threshold: f64,
    /// Demote the per-iteration report from `info` to `debug`
    pub quiet: bool,
}

impl SolverSettings {
    /// Settings for `n_roots` roots with every other option at its default
    pub fn new(n_roots: usize) -> Self {
        SolverSettings {
            n_roots,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_subspace_size: TRIAL_VECTORS_PER_ROOT * n_roots,
            collapse_size: n_roots,
            discard_threshold: DEFAULT_DISCARD_THRESHOLD,
            quiet: false,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_max_subspace_size(mut self, size: usize) -> Self {
        self.max_subspace_size = size;
        self
    }

    pub fn with_collapse_size(mut self, size: usize) -> Self {
        self.collapse_size = size;
        self
    }

    pub fn with_discard_threshold(mut self, threshold: f64) -> Self {
        self.discard_threshold = threshold;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Check the settings for internal consistency
    ///
    /// A collapse must leave room for one correction vector per root, so
    /// `max_subspace_size >= collapse_size + n_roots`.
    pub fn validate(&self) -> Result<()> {
        if self.n_roots == 0 {
            return Err(invalid("n_roots must be at least 1".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations must be at least 1".to_string()));
        }
        if !(self.convergence_threshold.is_finite() && self.convergence_threshold > 0.0) {
            return Err(invalid(format!(
                "convergence_threshold must be a positive number, got {}",
                self.convergence_threshold
            )));
        }
        if !(self.discard_threshold.is_finite() && self.discard_threshold > 0.0) {
            return Err(invalid(format!(
                "discard_threshold must be a positive number, got {}",
                self.discard_threshold
            )));
        }
        if self.collapse_size < self.n_roots {
            return Err(invalid(format!(
                "collapse_size ({}) must not be smaller than n_roots ({})",
                self.collapse_size, self.n_roots
            )));
        }
        if self.max_subspace_size < self.collapse_size + self.n_roots {
            return Err(invalid(format!(
                "max_subspace_size ({}) must be at least collapse_size + n_roots ({})",
                self.max_subspace_size,
                self.collapse_size + self.n_roots
            )));
        }
        Ok(())
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings::new(1)
    }
}

fn invalid(message: String) -> DavidsonError {
    DavidsonError::InvalidSettings(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        for n_roots in 1..8 {
            let settings = SolverSettings::new(n_roots);
            assert!(settings.validate().is_ok());
            assert_eq!(settings.max_subspace_size, 10 * n_roots);
            assert_eq!(settings.collapse_size, n_roots);
        }
    }

    #[test]
    fn test_zero_roots_rejected() {
        let err = SolverSettings::new(0).validate().unwrap_err();
        assert!(matches!(err, DavidsonError::InvalidSettings(_)));
    }

    #[test]
    fn test_collapse_smaller_than_roots_rejected() {
        let settings = SolverSettings::new(3).with_collapse_size(2);
        assert!(matches!(
            settings.validate(),
            Err(DavidsonError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_subspace_must_fit_collapse_and_corrections() {
        let tight = SolverSettings::new(2).with_max_subspace_size(4);
        assert!(tight.validate().is_ok());

        let too_tight = SolverSettings::new(2).with_max_subspace_size(3);
        assert!(too_tight.validate().is_err());

        let wide_collapse = SolverSettings::new(2)
            .with_collapse_size(4)
            .with_max_subspace_size(5);
        assert!(wide_collapse.validate().is_err());
    }

    #[test]
    fn test_thresholds_must_be_positive() {
        assert!(SolverSettings::new(1)
            .with_convergence_threshold(0.0)
            .validate()
            .is_err());
        assert!(SolverSettings::new(1)
            .with_convergence_threshold(f64::NAN)
            .validate()
            .is_err());
        assert!(SolverSettings::new(1)
            .with_discard_threshold(-1e-7)
            .validate()
            .is_err());
        assert!(SolverSettings::new(1)
            .with_max_iterations(0)
            .validate()
            .is_err());
    }
}
