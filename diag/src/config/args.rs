//! Command-line argument parsing for Davidson runs

use clap::Parser;

/// Lowest eigenpairs of a model operator with the Davidson-Liu method
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Override number of roots
    #[arg(short, long)]
    pub n_roots: Option<usize>,

    /// Override maximum Davidson iterations
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Override residual convergence threshold
    #[arg(long)]
    pub convergence_threshold: Option<f64>,

    /// Override maximum subspace size
    #[arg(long)]
    pub max_subspace_size: Option<usize>,

    /// Override random seed of the model operator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write eigenvalues to this file
    #[arg(short, long)]
    pub results: Option<String>,

    /// Include eigenvectors in the results file
    #[arg(long)]
    pub eigenvectors: bool,

    /// Compare against a dense diagonalization
    #[arg(long)]
    pub verify: bool,

    /// Log the iteration table at debug level only
    #[arg(short, long)]
    pub quiet: bool,
}
