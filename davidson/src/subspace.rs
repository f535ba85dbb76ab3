//! Subspace store: trial vectors and their operator images
//!
//! Trial and sigma vectors live column-wise in two pre-sized `n × capacity` arenas and
//! are addressed by column index. The trial columns are kept orthonormal at all times.
//! A trial vector becomes visible to the projected-matrix builder only once its sigma
//! vector is paired, and only as part of the leading fully paired prefix.
//!
//! Orthogonalization is modified Gram-Schmidt in column order, repeated once when the
//! first sweep cancels more than three quarters of the vector.

use nalgebra::{DMatrix, DMatrixView, DVector, DVectorView};

/// Norm ratio after a sweep below which a second sweep is applied
pub const REORTHOGONALIZATION_RATIO: f64 = 0.25;

const MAX_SWEEPS: usize = 2;

/// Outcome of offering a candidate vector to the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Insertion {
    /// Appended at this column index
    Accepted(usize),
    /// Linearly dependent on the current basis; norm left after orthogonalization
    Dependent { norm: f64 },
    /// The arena has no free column
    Full,
}

/// Orthonormal trial basis with paired sigma vectors
#[derive(Debug, Clone)]
pub struct Subspace {
    trials: DMatrix<f64>,
    sigmas: DMatrix<f64>,
    has_sigma: Vec<bool>,
    len: usize,
    paired: usize,
    discard_threshold: f64,
}

impl Subspace {
    /// Allocate an empty store for vectors of length `dim`
    pub fn new(dim: usize, capacity: usize, discard_threshold: f64) -> Self {
        Subspace {
            trials: DMatrix::zeros(dim, capacity),
            sigmas: DMatrix::zeros(dim, capacity),
            has_sigma: vec![false; capacity],
            len: 0,
            paired: 0,
            discard_threshold,
        }
    }

    pub fn dim(&self) -> usize {
        self.trials.nrows()
    }

    pub fn capacity(&self) -> usize {
        self.trials.ncols()
    }

    /// Number of trial vectors, paired or not
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the leading prefix of trial vectors that have a sigma vector
    pub fn paired_len(&self) -> usize {
        self.paired
    }

    pub fn is_fully_paired(&self) -> bool {
        self.paired == self.len
    }

    /// Orthonormalize `candidate` against the basis and append it
    ///
    /// The candidate is scaled to unit norm first, so the dependency test compares the
    /// remaining norm against `discard_threshold` independently of the input scale.
    pub fn add_vector(&mut self, candidate: &DVector<f64>) -> Insertion {
        if self.len == self.capacity() {
            return Insertion::Full;
        }

        let mut vector = candidate.clone();
        if let Err(norm) = orthonormalize(
            &self.trials,
            None,
            self.len,
            &mut vector,
            None,
            self.discard_threshold,
        ) {
            return Insertion::Dependent { norm };
        }

        let index = self.len;
        self.trials.set_column(index, &vector);
        self.has_sigma[index] = false;
        self.len += 1;
        Insertion::Accepted(index)
    }

    /// Bind the operator image of trial vector `index`
    pub fn pair_sigma(&mut self, index: usize, sigma: &DVector<f64>) {
        assert!(
            index < self.len,
            "sigma paired with trial vector {} but the subspace holds {}",
            index,
            self.len
        );
        assert!(
            !self.has_sigma[index],
            "trial vector {} already has a sigma vector",
            index
        );
        self.sigmas.set_column(index, sigma);
        self.has_sigma[index] = true;
        while self.paired < self.len && self.has_sigma[self.paired] {
            self.paired += 1;
        }
    }

    pub fn trial(&self, index: usize) -> DVectorView<'_, f64> {
        self.trials.column(index)
    }

    /// Sigma vector of `index`, if one has been paired
    pub fn sigma(&self, index: usize) -> Option<DVectorView<'_, f64>> {
        if index < self.len && self.has_sigma[index] {
            Some(self.sigmas.column(index))
        } else {
            None
        }
    }

    /// Paired trial vectors as the columns of an `n × paired_len` view
    pub fn trials(&self) -> DMatrixView<'_, f64> {
        self.trials.columns(0, self.paired)
    }

    /// Sigma vectors matching [`trials`](Self::trials)
    pub fn sigmas(&self) -> DMatrixView<'_, f64> {
        self.sigmas.columns(0, self.paired)
    }

    /// Restart the basis from linear combinations of the current one
    ///
    /// Column `j` of `coefficients` (`paired_len × c`) defines the new vector
    /// `Σᵢ cᵢⱼ tᵢ`. The new vectors are re-orthonormalized in column order and every
    /// elimination and scaling step is replayed on the matching combination of sigma
    /// vectors, so the operator is never applied again. Returns the new basis size,
    /// which is below `c` only if some combinations turn out linearly dependent.
    pub fn collapse(&mut self, coefficients: &DMatrix<f64>) -> usize {
        assert!(
            self.is_fully_paired(),
            "collapse requested while {} trial vectors lack a sigma vector",
            self.len - self.paired
        );
        assert_eq!(
            coefficients.nrows(),
            self.paired,
            "collapse coefficients do not match the subspace size"
        );

        let combined_trials = self.trials() * coefficients;
        let combined_sigmas = self.sigmas() * coefficients;

        let mut basis = DMatrix::zeros(self.dim(), coefficients.ncols());
        let mut images = DMatrix::zeros(self.dim(), coefficients.ncols());
        let mut kept = 0;
        for j in 0..coefficients.ncols() {
            let mut vector = combined_trials.column(j).into_owned();
            let mut image = combined_sigmas.column(j).into_owned();
            if orthonormalize(
                &basis,
                Some(&images),
                kept,
                &mut vector,
                Some(&mut image),
                self.discard_threshold,
            )
            .is_ok()
            {
                basis.set_column(kept, &vector);
                images.set_column(kept, &image);
                kept += 1;
            }
        }

        self.trials
            .columns_mut(0, kept)
            .copy_from(&basis.columns(0, kept));
        self.sigmas
            .columns_mut(0, kept)
            .copy_from(&images.columns(0, kept));
        self.has_sigma.iter_mut().for_each(|flag| *flag = false);
        self.has_sigma[..kept].iter_mut().for_each(|flag| *flag = true);
        self.len = kept;
        self.paired = kept;
        kept
    }

    /// Largest deviation of the trial Gram matrix from the identity
    pub fn orthonormality_error(&self) -> f64 {
        let basis = self.trials.columns(0, self.len);
        let gram = basis.tr_mul(&basis);
        let mut error: f64 = 0.0;
        for i in 0..self.len {
            for j in 0..self.len {
                let target = if i == j { 1.0 } else { 0.0 };
                error = error.max((gram[(i, j)] - target).abs());
            }
        }
        error
    }
}

/// Scale `vector` to unit norm, project out the first `count` columns of `basis` and
/// normalize the remainder. `image` follows every step with `images` in place of
/// `basis`. On rejection returns the remaining norm.
fn orthonormalize(
    basis: &DMatrix<f64>,
    images: Option<&DMatrix<f64>>,
    count: usize,
    vector: &mut DVector<f64>,
    mut image: Option<&mut DVector<f64>>,
    discard_threshold: f64,
) -> Result<(), f64> {
    let norm = vector.norm();
    if norm == 0.0 {
        return Err(0.0);
    }
    rescale(vector, image.as_deref_mut(), norm);

    let mut before = 1.0;
    for _ in 0..MAX_SWEEPS {
        sweep(basis, images, count, vector, image.as_deref_mut());
        let after = vector.norm();
        if after >= REORTHOGONALIZATION_RATIO * before {
            break;
        }
        before = after;
    }

    let norm = vector.norm();
    if norm < discard_threshold {
        return Err(norm);
    }
    rescale(vector, image, norm);
    Ok(())
}

/// One modified Gram-Schmidt sweep in column order
fn sweep(
    basis: &DMatrix<f64>,
    images: Option<&DMatrix<f64>>,
    count: usize,
    vector: &mut DVector<f64>,
    mut image: Option<&mut DVector<f64>>,
) {
    for i in 0..count {
        let column = basis.column(i);
        let overlap = column.dot(&*vector);
        vector.axpy(-overlap, &column, 1.0);
        if let (Some(images), Some(image)) = (images, image.as_deref_mut()) {
            image.axpy(-overlap, &images.column(i), 1.0);
        }
    }
}

fn rescale(vector: &mut DVector<f64>, image: Option<&mut DVector<f64>>, norm: f64) {
    vector.unscale_mut(norm);
    if let Some(image) = image {
        image.unscale_mut(norm);
    }
}
