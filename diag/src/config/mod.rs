//! Configuration management for Davidson runs
//!
//! The YAML file describes the model operator and the solver parameters;
//! missing solver parameters fall back to the library defaults.

mod args;

pub use args::Args;

use davidson::settings::{
    DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_DISCARD_THRESHOLD, DEFAULT_MAX_ITERATIONS,
};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub operator: OperatorConfig,
    #[serde(default)]
    pub davidson: DavidsonParams,
    pub output: Option<OutputParams>,
}

/// Model operator handed to the solver
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type")]
pub enum OperatorConfig {
    /// Diagonally dominant random symmetric matrix
    #[serde(rename = "random")]
    Random {
        dimension: usize,
        /// Standard deviation of the off-diagonal couplings
        coupling: Option<f64>,
        /// Spacing of the diagonal entries
        spacing: Option<f64>,
        seed: Option<u64>,
    },
    /// Nearest-neighbour tight-binding chain in a linear field
    #[serde(rename = "chain")]
    Chain {
        sites: usize,
        hopping: Option<f64>,
        field: Option<f64>,
    },
    /// Matrix given row by row
    #[serde(rename = "explicit")]
    Explicit { matrix: Vec<Vec<f64>> },
}

/// Solver parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DavidsonParams {
    pub n_roots: Option<usize>,
    pub max_iterations: Option<usize>,
    pub convergence_threshold: Option<f64>,
    /// Defaults to 10 trial vectors per root
    pub max_subspace_size: Option<usize>,
    /// Defaults to the number of roots
    pub collapse_size: Option<usize>,
    pub discard_threshold: Option<f64>,
    /// Constant added to the diagonal to form a separate preconditioner
    pub preconditioner_shift: Option<f64>,
    pub quiet: Option<bool>,
}

impl Default for DavidsonParams {
    fn default() -> Self {
        DavidsonParams {
            n_roots: Some(1),
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            convergence_threshold: Some(DEFAULT_CONVERGENCE_THRESHOLD),
            max_subspace_size: None,
            collapse_size: None,
            discard_threshold: Some(DEFAULT_DISCARD_THRESHOLD),
            preconditioner_shift: None,
            quiet: Some(false),
        }
    }
}

impl DavidsonParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.n_roots.is_none() {
            self.n_roots = defaults.n_roots;
        }
        if self.max_iterations.is_none() {
            self.max_iterations = defaults.max_iterations;
        }
        if self.convergence_threshold.is_none() {
            self.convergence_threshold = defaults.convergence_threshold;
        }
        if self.discard_threshold.is_none() {
            self.discard_threshold = defaults.discard_threshold;
        }
        if self.quiet.is_none() {
            self.quiet = defaults.quiet;
        }
        // subspace bounds stay unset: they scale with the final root count
        self
    }
}

/// Where results go besides the log
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct OutputParams {
    pub results_file: Option<String>,
    pub eigenvectors: Option<bool>,
    /// Compare against a dense diagonalization of the same matrix
    pub verify: Option<bool>,
}

impl Config {
    /// Apply defaults to all configuration sections
    pub fn with_defaults(mut self) -> Self {
        self.davidson = self.davidson.with_defaults();
        self
    }

    /// Get the results file, if any
    pub fn results_file(&self) -> Option<String> {
        self.output.as_ref().and_then(|o| o.results_file.clone())
    }

    /// Check if eigenvectors should be written with the results
    pub fn write_eigenvectors(&self) -> bool {
        self.output
            .as_ref()
            .and_then(|o| o.eigenvectors)
            .unwrap_or(false)
    }

    /// Check if the dense reference comparison is enabled
    pub fn is_verify_enabled(&self) -> bool {
        self.output.as_ref().and_then(|o| o.verify).unwrap_or(false)
    }
}
