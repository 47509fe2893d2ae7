//! Helpers for the column-per-case matrices used inside the network.

use ndarray::{s, Array2, ArrayBase, Data, Ix2};
use ndarray_rand::RandomExt;
use rand::distributions::Distribution;
use rand::Rng;

/// Returns `activations` with a row of ones stacked beneath it.
///
/// Every layer sees its input through this, so that the last column of each
/// weight matrix acts as the bias.
pub fn augment<S>(activations: &ArrayBase<S, Ix2>) -> Array2<f64>
where
    S: Data<Elem = f64>,
{
    let (rows, cases) = activations.dim();
    let mut augmented = Array2::ones((rows + 1, cases));
    augmented.slice_mut(s![..rows, ..]).assign(activations);
    augmented
}

/// Samples a `rows` x `cols` matrix from `distribution`.
pub fn random<D, R>(distribution: D, rows: usize, cols: usize, rng: &mut R) -> Array2<f64>
where
    D: Distribution<f64>,
    R: Rng + ?Sized,
{
    Array2::random_using((rows, cols), distribution, rng)
}
