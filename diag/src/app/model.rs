//! Model operators built from the configuration

use crate::config::OperatorConfig;
use color_eyre::eyre::{eyre, Result};
use davidson::DenseOperator;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::info;

const DEFAULT_COUPLING: f64 = 0.01;
const DEFAULT_SPACING: f64 = 1.0;
const DEFAULT_HOPPING: f64 = 1.0;
const DEFAULT_FIELD: f64 = 0.1;

/// Largest tolerated `|aᵢⱼ - aⱼᵢ|` of an explicit matrix
const SYMMETRY_TOLERANCE: f64 = 1e-12;

/// Dense matrix of the configured model
pub fn build_matrix(config: &OperatorConfig, seed_override: Option<u64>) -> Result<DMatrix<f64>> {
    let matrix = match config {
        OperatorConfig::Random {
            dimension,
            coupling,
            spacing,
            seed,
        } => {
            let seed = seed_override.or(*seed);
            info!(
                "Random symmetric operator of dimension {} (seed {:?})",
                dimension, seed
            );
            random_symmetric(
                *dimension,
                coupling.unwrap_or(DEFAULT_COUPLING),
                spacing.unwrap_or(DEFAULT_SPACING),
                seed,
            )?
        }
        OperatorConfig::Chain {
            sites,
            hopping,
            field,
        } => {
            info!("Tight-binding chain with {} sites", sites);
            chain(
                *sites,
                hopping.unwrap_or(DEFAULT_HOPPING),
                field.unwrap_or(DEFAULT_FIELD),
            )?
        }
        OperatorConfig::Explicit { matrix } => {
            info!("Explicit {}x{} operator", matrix.len(), matrix.len());
            explicit(matrix)?
        }
    };
    Ok(matrix)
}

/// Dense collaborator for `n_roots` roots, with an optional shifted preconditioner
pub fn build_operator(
    matrix: DMatrix<f64>,
    n_roots: usize,
    preconditioner_shift: Option<f64>,
) -> Result<DenseOperator> {
    let operator = DenseOperator::new(matrix, n_roots)?;
    let operator = match preconditioner_shift {
        Some(shift) => {
            info!("Preconditioner: operator diagonal shifted by {:.4}", shift);
            let diagonal = operator.matrix().diagonal().add_scalar(shift);
            operator.with_preconditioner(diagonal)
        }
        None => operator,
    };
    Ok(operator)
}

/// `aᵢᵢ = spacing·(i + 1)`, off-diagonal entries drawn from `N(0, coupling²)`
fn random_symmetric(
    dimension: usize,
    coupling: f64,
    spacing: f64,
    seed: Option<u64>,
) -> Result<DMatrix<f64>> {
    if dimension == 0 {
        return Err(eyre!("Random operator needs a positive dimension"));
    }
    let normal =
        Normal::new(0.0, coupling).map_err(|err| eyre!("Invalid coupling {}: {}", coupling, err))?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut matrix = DMatrix::zeros(dimension, dimension);
    for i in 0..dimension {
        matrix[(i, i)] = spacing * (i + 1) as f64;
        for j in 0..i {
            let value = normal.sample(&mut rng);
            matrix[(i, j)] = value;
            matrix[(j, i)] = value;
        }
    }
    Ok(matrix)
}

/// Open chain `-t` between neighbours, on-site energy `field·i`
fn chain(sites: usize, hopping: f64, field: f64) -> Result<DMatrix<f64>> {
    if sites < 2 {
        return Err(eyre!("Chain needs at least two sites, got {}", sites));
    }
    let mut matrix = DMatrix::zeros(sites, sites);
    for i in 0..sites {
        matrix[(i, i)] = field * i as f64;
        if i + 1 < sites {
            matrix[(i, i + 1)] = -hopping;
            matrix[(i + 1, i)] = -hopping;
        }
    }
    Ok(matrix)
}

fn explicit(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let n = rows.len();
    if n == 0 {
        return Err(eyre!("Explicit operator matrix is empty"));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != n) {
        return Err(eyre!(
            "Explicit operator row {} has {} entries, expected {}",
            i,
            row.len(),
            n
        ));
    }

    let matrix = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
    let asymmetry = (&matrix - matrix.transpose()).amax();
    if asymmetry > SYMMETRY_TOLERANCE {
        return Err(eyre!(
            "Explicit operator is not symmetric (largest asymmetry {:.3e})",
            asymmetry
        ));
    }
    Ok(matrix)
}
