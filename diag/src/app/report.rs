use color_eyre::eyre::Result;
use davidson::{residual_norm, DenseOperator, Solution};
use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::info;

pub fn report_solution(solution: &Solution) {
    info!("\nDavidson diagonalization finished.");
    info!(
        "  Iterations: {}, sigma evaluations: {}, collapses: {}, discarded vectors: {}",
        solution.stats.iterations,
        solution.stats.sigma_evaluations,
        solution.stats.collapses,
        solution.stats.discarded_vectors
    );

    info!("\nFinal eigenvalues:");
    for (i, (value, norm)) in solution
        .eigenvalues
        .iter()
        .zip(solution.residual_norms.iter())
        .enumerate()
    {
        info!("  Root {:>3}: {:18.12}  |r| = {:.3e}", i, value, norm);
    }
}

/// Largest deviation from a dense diagonalization of the same matrix
pub fn verify_against_dense(matrix: &DMatrix<f64>, solution: &Solution) -> Result<f64> {
    let mut reference: Vec<f64> = matrix
        .clone()
        .symmetric_eigen()
        .eigenvalues
        .iter()
        .copied()
        .collect();
    reference.sort_by(f64::total_cmp);

    let operator = DenseOperator::new(matrix.clone(), 0)?;
    let residuals: Vec<f64> = solution
        .eigenvalues
        .par_iter()
        .zip(solution.eigenvectors.par_iter())
        .map(|(&value, vector)| residual_norm(|x| operator.multiply(x), value, vector))
        .collect();

    info!("\nComparison with dense diagonalization:");
    let mut max_deviation: f64 = 0.0;
    for (i, (value, expected)) in solution.eigenvalues.iter().zip(&reference).enumerate() {
        let deviation = (value - expected).abs();
        max_deviation = max_deviation.max(deviation);
        info!(
            "  Root {:>3}: dense {:18.12}  deviation {:.3e}  recomputed |r| = {:.3e}",
            i, expected, deviation, residuals[i]
        );
    }
    Ok(max_deviation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use davidson::SolveStats;

    #[test]
    fn test_verify_exact_solution() {
        let matrix = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let solution = Solution {
            eigenvalues: vec![1.0],
            eigenvectors: vec![vec![s, -s]],
            residual_norms: vec![0.0],
            stats: SolveStats::default(),
        };
        assert!(verify_against_dense(&matrix, &solution).unwrap() < 1e-12);
    }
}
