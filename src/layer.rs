use crate::activator::TransferFunction;
use crate::matrix;

use ndarray::{s, Array2, ArrayBase, Data, Ix2};
use rand::distributions::Distribution;
use rand::Rng;

/// A single fully connected, weight-bearing layer of the network.
///
/// The weights for every neuron are stored as one row of a matrix, with the
/// bias folded in as the final column.
#[derive(Clone, Debug)]
pub struct Layer {
    /// The transfer function applied to every neuron in the layer.
    transfer: TransferFunction,
    /// Shape `(outputs, inputs + 1)`.
    weights: Array2<f64>,
    /// The update applied on the previous epoch, kept for momentum.
    previous_delta: Array2<f64>,
}

impl Layer {
    /// Initializes a new, untrained layer.
    ///
    /// Arguments:
    ///
    ///  * `transfer` - the transfer function to be used for this layer's
    ///                 output.
    ///  * `inputs` - the number of inputs to this layer.
    ///  * `outputs` - the number of outputs from this layer.
    ///  * `distribution` - where the initial weights are drawn from.
    pub fn new<D, R>(
        transfer: TransferFunction,
        inputs: usize,
        outputs: usize,
        distribution: D,
        rng: &mut R,
    ) -> Self
    where
        D: Distribution<f64>,
        R: Rng + ?Sized,
    {
        Layer {
            transfer,
            weights: matrix::random(distribution, outputs, inputs + 1, rng),
            previous_delta: Array2::zeros((outputs, inputs + 1)),
        }
    }

    /// Rebuilds a layer from stored state. Callers check the shapes agree.
    pub fn from_parts(
        transfer: TransferFunction,
        weights: Array2<f64>,
        previous_delta: Array2<f64>,
    ) -> Self {
        debug_assert_eq!(weights.dim(), previous_delta.dim());
        Layer {
            transfer,
            weights,
            previous_delta,
        }
    }

    /// Returns the number of inputs to this layer, not counting the bias.
    pub fn input_len(&self) -> usize {
        self.weights.ncols() - 1
    }

    /// Returns the number of outputs from this layer.
    pub fn output_len(&self) -> usize {
        self.weights.nrows()
    }

    pub fn transfer(&self) -> TransferFunction {
        self.transfer
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    #[cfg(test)]
    pub fn weights_mut(&mut self) -> &mut Array2<f64> {
        &mut self.weights
    }

    pub fn previous_delta(&self) -> &Array2<f64> {
        &self.previous_delta
    }

    pub fn previous_delta_mut(&mut self) -> &mut Array2<f64> {
        &mut self.previous_delta
    }

    /// Feeds `inputs`, one case per column, forward through the layer.
    ///
    /// Returns the weighted sums before activation alongside the activated
    /// outputs.
    pub fn forward<S>(&self, inputs: &ArrayBase<S, Ix2>) -> (Array2<f64>, Array2<f64>)
    where
        S: Data<Elem = f64>,
    {
        debug_assert_eq!(inputs.nrows(), self.input_len());
        let layer_input = self.weights.dot(&matrix::augment(inputs));
        let layer_output = self.transfer.apply(&layer_input, false);
        (layer_input, layer_output)
    }

    /// Scales the error arriving at this layer's outputs by the transfer
    /// function's slope at `layer_input`.
    pub fn delta(&self, output_error: &Array2<f64>, layer_input: &Array2<f64>) -> Array2<f64> {
        output_error * &self.transfer.apply(layer_input, true)
    }

    /// Propagates `delta` back through the weights to the previous layer's
    /// outputs, dropping the row that belongs to the bias.
    pub fn pullback(&self, delta: &Array2<f64>) -> Array2<f64> {
        let pullback = self.weights.t().dot(delta);
        pullback.slice(s![..-1, ..]).to_owned()
    }

    /// Takes a gradient descent step, carrying `momentum` of the previous
    /// step along.
    pub fn apply_update(&mut self, rate: f64, momentum: f64, gradient: &Array2<f64>) {
        let weight_delta = momentum_step(gradient, &self.previous_delta, rate, momentum);
        self.weights -= &weight_delta;
        self.previous_delta = weight_delta;
    }
}

/// Computes `rate * gradient + momentum * previous`.
pub fn momentum_step(
    gradient: &Array2<f64>,
    previous: &Array2<f64>,
    rate: f64,
    momentum: f64,
) -> Array2<f64> {
    gradient * rate + previous * momentum
}
