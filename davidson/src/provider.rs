//! Collaborator interface of the solver
//!
//! The solver never sees the operator itself. Everything it knows comes through the
//! four callbacks of [`DavidsonProvider`]:
//!
//! - `diagonal`: the operator diagonal, called exactly once
//! - `initial_guess`: at least `n_roots` seed vectors, called once after `diagonal`
//! - `apply`: the matrix-vector product, called once per accepted trial vector
//! - `preconditioner`: optional replacement for the diagonal in the correction step,
//!   called at most once
//!
//! Closures can be plugged in through [`FnProvider`].

use crate::error::{Callback, ContractIssue, DavidsonError, Result};
use nalgebra::DVector;
use std::cmp::Ordering;

/// Capability interface implemented by whatever owns the operator
pub trait DavidsonProvider {
    /// Diagonal of the operator; its length fixes the problem dimension
    fn diagonal(&mut self) -> Vec<f64>;

    /// Seed vectors for the subspace, built from the diagonal
    fn initial_guess(&mut self, diagonal: &[f64]) -> Vec<Vec<f64>>;

    /// Operator image of one trial vector
    ///
    /// Must be pure: the same trial vector always gives the same result.
    fn apply(&mut self, trial: &[f64]) -> Vec<f64>;

    /// Preconditioner diagonal used instead of [`diagonal`](Self::diagonal)
    fn preconditioner(&mut self) -> Option<Vec<f64>> {
        None
    }
}

impl<P: DavidsonProvider + ?Sized> DavidsonProvider for &mut P {
    fn diagonal(&mut self) -> Vec<f64> {
        (**self).diagonal()
    }

    fn initial_guess(&mut self, diagonal: &[f64]) -> Vec<Vec<f64>> {
        (**self).initial_guess(diagonal)
    }

    fn apply(&mut self, trial: &[f64]) -> Vec<f64> {
        (**self).apply(trial)
    }

    fn preconditioner(&mut self) -> Option<Vec<f64>> {
        (**self).preconditioner()
    }
}

/// Provider assembled from closures
///
/// ```rust,ignore
/// let provider = FnProvider::new(
///     || diag.clone(),
///     |d| lowest_diagonal_guess(d, 2),
///     |trial| sigma(trial),
/// );
/// ```
pub struct FnProvider<D, G, A, C = fn() -> Vec<f64>> {
    diagonal: D,
    guess: G,
    apply: A,
    preconditioner: Option<C>,
}

impl<D, G, A> FnProvider<D, G, A>
where
    D: FnMut() -> Vec<f64>,
    G: FnMut(&[f64]) -> Vec<Vec<f64>>,
    A: FnMut(&[f64]) -> Vec<f64>,
{
    pub fn new(diagonal: D, guess: G, apply: A) -> Self {
        FnProvider {
            diagonal,
            guess,
            apply,
            preconditioner: None,
        }
    }
}

impl<D, G, A, C> FnProvider<D, G, A, C> {
    /// Attach a preconditioner callback
    pub fn with_preconditioner<P>(self, preconditioner: P) -> FnProvider<D, G, A, P>
    where
        P: FnMut() -> Vec<f64>,
    {
        FnProvider {
            diagonal: self.diagonal,
            guess: self.guess,
            apply: self.apply,
            preconditioner: Some(preconditioner),
        }
    }
}

impl<D, G, A, C> DavidsonProvider for FnProvider<D, G, A, C>
where
    D: FnMut() -> Vec<f64>,
    G: FnMut(&[f64]) -> Vec<Vec<f64>>,
    A: FnMut(&[f64]) -> Vec<f64>,
    C: FnMut() -> Vec<f64>,
{
    fn diagonal(&mut self) -> Vec<f64> {
        (self.diagonal)()
    }

    fn initial_guess(&mut self, diagonal: &[f64]) -> Vec<Vec<f64>> {
        (self.guess)(diagonal)
    }

    fn apply(&mut self, trial: &[f64]) -> Vec<f64> {
        (self.apply)(trial)
    }

    fn preconditioner(&mut self) -> Option<Vec<f64>> {
        self.preconditioner.as_mut().map(|precond| precond())
    }
}

/// Unit vectors at the `count` smallest diagonal positions
///
/// Equal diagonal entries are taken in index order, so the guess is deterministic.
pub fn lowest_diagonal_guess(diagonal: &[f64], count: usize) -> Vec<Vec<f64>> {
    let mut order: Vec<usize> = (0..diagonal.len()).collect();
    order.sort_by(|&a, &b| {
        diagonal[a]
            .partial_cmp(&diagonal[b])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    order
        .into_iter()
        .take(count)
        .map(|position| {
            let mut unit = vec![0.0; diagonal.len()];
            unit[position] = 1.0;
            unit
        })
        .collect()
}

/// Validate the diagonal and fix the problem dimension from it
pub(crate) fn checked_diagonal(values: Vec<f64>) -> Result<DVector<f64>> {
    if values.is_empty() {
        return Err(DavidsonError::contract(
            Callback::Diagonal,
            ContractIssue::EmptyDimension,
        ));
    }
    let dim = values.len();
    checked_vector(Callback::Diagonal, 0, values, dim)
}

/// Validate one vector returned by a callback before it enters any arithmetic
pub(crate) fn checked_vector(
    callback: Callback,
    index: usize,
    values: Vec<f64>,
    expected: usize,
) -> Result<DVector<f64>> {
    if values.len() != expected {
        return Err(DavidsonError::contract(
            callback,
            ContractIssue::WrongLength {
                index,
                expected,
                actual: values.len(),
            },
        ));
    }
    if let Some((position, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(DavidsonError::contract(
            callback,
            ContractIssue::NonFinite {
                index,
                position,
                value,
            },
        ));
    }
    Ok(DVector::from_vec(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_diagonal_guess_picks_smallest_entries() {
        let diagonal = [3.0, -1.0, 2.0, -1.0, 0.5];
        let guess = lowest_diagonal_guess(&diagonal, 3);

        assert_eq!(guess.len(), 3);
        // ties resolved by index: position 1 before position 3
        assert_eq!(guess[0], vec![0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(guess[1], vec![0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(guess[2], vec![0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_lowest_diagonal_guess_caps_at_dimension() {
        let guess = lowest_diagonal_guess(&[1.0, 2.0], 5);
        assert_eq!(guess.len(), 2);
    }

    #[test]
    fn test_checked_vector_rejects_wrong_length() {
        let err = checked_vector(Callback::Apply, 2, vec![1.0, 2.0], 3).unwrap_err();
        assert_eq!(
            err,
            DavidsonError::ContractViolation {
                callback: Callback::Apply,
                issue: ContractIssue::WrongLength {
                    index: 2,
                    expected: 3,
                    actual: 2
                }
            }
        );
    }

    #[test]
    fn test_checked_vector_rejects_non_finite() {
        let err = checked_vector(Callback::Apply, 0, vec![1.0, f64::INFINITY], 2).unwrap_err();
        match err {
            DavidsonError::ContractViolation {
                callback: Callback::Apply,
                issue: ContractIssue::NonFinite { position, .. },
            } => assert_eq!(position, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_checked_diagonal_rejects_empty() {
        assert!(matches!(
            checked_diagonal(Vec::new()),
            Err(DavidsonError::ContractViolation {
                callback: Callback::Diagonal,
                issue: ContractIssue::EmptyDimension
            })
        ));
    }

    #[test]
    fn test_fn_provider_forwards_calls() {
        let mut applied = 0;
        let mut provider = FnProvider::new(
            || vec![1.0, 2.0],
            |d: &[f64]| lowest_diagonal_guess(d, 1),
            |trial: &[f64]| {
                applied += 1;
                trial.iter().map(|x| 2.0 * x).collect()
            },
        );

        assert_eq!(provider.diagonal(), vec![1.0, 2.0]);
        assert_eq!(provider.initial_guess(&[1.0, 2.0]), vec![vec![1.0, 0.0]]);
        assert_eq!(provider.apply(&[1.0, 3.0]), vec![2.0, 6.0]);
        assert!(provider.preconditioner().is_none());
        drop(provider);
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_fn_provider_with_preconditioner() {
        let mut provider = FnProvider::new(
            || vec![1.0],
            |d: &[f64]| lowest_diagonal_guess(d, 1),
            |trial: &[f64]| trial.to_vec(),
        )
        .with_preconditioner(|| vec![4.0]);

        assert_eq!(provider.preconditioner(), Some(vec![4.0]));
    }
}
