//! A [Feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network) trained by
//! backpropagation with momentum.
//!
//! Matrices passed in and out of a `Network` hold one case per row.
//!
//! # Example
//!
//! Let's train a simple neural network to compute the XOR function:
//!
//! ```
//! # use backprop::feed_forward::*;
//! # use ndarray::arr2;
//! // Create examples of the XOR function
//! let input = arr2(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
//! let target = arr2(&[[0.0], [1.0], [1.0], [0.0]]);
//!
//! // Sigmoid hidden layer, linear output layer
//! let mut network = Network::new(&[2, 3, 1], None).unwrap();
//! for _ in 0..5000 {
//!     network.train_epoch(&input, &target, 0.2, 0.9).unwrap();
//! }
//!
//! // And verify the network correctly computes XOR!
//! let output = network.run(&input).unwrap();
//! let classes: Vec<bool> = output.iter().map(|&y| y > 0.5).collect();
//! assert_eq!(classes, vec![false, true, true, false]);
//! ```

pub use crate::activator::TransferFunction;
use crate::error::{Error, Result};
use crate::layer::Layer;
use crate::matrix;
use crate::trainer::Trainable;
use crate::utils::{Back, Front, ZeroOut};

use itertools::Itertools;
use ndarray::{Array2, ArrayBase, ArrayView2, Data, Ix2};
use rand::Rng;
use rand_distr::Normal;
use tracing::{debug, trace};

/// Standard deviation of the normal distribution initial weights are drawn
/// from.
pub const INIT_SCALE: f64 = 0.01;

/// Learning rate used when the caller has no preference.
pub const DEFAULT_TRAINING_RATE: f64 = 0.2;

/// Momentum used when the caller has no preference.
pub const DEFAULT_MOMENTUM: f64 = 0.5;

/// A feedforward neural network.
#[derive(Clone, Debug)]
pub struct Network {
    layers: Vec<Layer>,
}

/// The intermediate values of one forward pass, one case per column.
///
/// `layer_inputs[i]` holds the weighted sums of layer `i` before its transfer
/// function, `layer_outputs[i]` the values after it.
#[derive(Clone, Debug)]
pub struct ForwardTrace {
    layer_inputs: Vec<Array2<f64>>,
    layer_outputs: Vec<Array2<f64>>,
}

impl ForwardTrace {
    pub fn layer_inputs(&self) -> &[Array2<f64>] {
        &self.layer_inputs
    }

    pub fn layer_outputs(&self) -> &[Array2<f64>] {
        &self.layer_outputs
    }

    /// The output layer, shaped `(outputs, cases)`.
    pub fn output(&self) -> &Array2<f64> {
        self.layer_outputs.back()
    }

    /// Number of cases that went through the network.
    pub fn cases(&self) -> usize {
        self.output().ncols()
    }
}

impl Network {
    /// Creates a new, untrained neural network with randomly initialised
    /// weights.
    ///
    /// Arguments:
    ///  * `layer_sizes` - the number of neurons in each layer, input layer
    ///                    first. Must contain at least two entries.
    ///  * `transfer_functions` - one entry per layer. The input layer's entry
    ///                           must be `None`, every other entry `Some`. When
    ///                           omitted, hidden layers use a sigmoid and the
    ///                           output layer is linear.
    pub fn new(
        layer_sizes: &[usize],
        transfer_functions: Option<&[Option<TransferFunction>]>,
    ) -> Result<Self> {
        Network::with_rng(layer_sizes, transfer_functions, &mut rand::thread_rng())
    }

    /// Like `new`, drawing the initial weights from `rng`.
    pub fn with_rng<R>(
        layer_sizes: &[usize],
        transfer_functions: Option<&[Option<TransferFunction>]>,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let transfers = resolve_transfer_functions(layer_sizes, transfer_functions)?;
        let distribution =
            Normal::new(0.0, INIT_SCALE).map_err(|e| Error::Configuration(e.to_string()))?;

        let layers: Vec<Layer> = layer_sizes
            .iter()
            .tuple_windows()
            .zip(transfers)
            .map(|((&inputs, &outputs), transfer)| {
                Layer::new(transfer, inputs, outputs, distribution, rng)
            })
            .collect();
        debug!(?layer_sizes, "created network with {} layers", layers.len());
        Ok(Network { layers })
    }

    pub(crate) fn from_layers(layers: Vec<Layer>) -> Self {
        Network { layers }
    }

    pub(crate) fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> usize {
        self.layers.front().input_len()
    }

    /// Returns the size of the output layer from the network.
    pub fn output_len(&self) -> usize {
        self.layers.back().output_len()
    }

    /// Number of weight-bearing layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// The number of neurons in each layer, input layer first.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.layers.len() + 1);
        sizes.push(self.input_len());
        sizes.extend(self.layers.iter().map(Layer::output_len));
        sizes
    }

    /// The transfer function of each layer, with `None` for the input layer.
    pub fn transfer_functions(&self) -> Vec<Option<TransferFunction>> {
        let mut transfers = Vec::with_capacity(self.layers.len() + 1);
        transfers.push(None);
        transfers.extend(self.layers.iter().map(|layer| Some(layer.transfer())));
        transfers
    }

    /// The weights feeding layer `index + 1`, shaped `(outputs, inputs + 1)`
    /// with the bias in the last column.
    pub fn weights(&self, index: usize) -> Option<&Array2<f64>> {
        self.layers.get(index).map(Layer::weights)
    }

    /// Forgets the previous weight updates, so the next epoch takes a plain
    /// gradient descent step.
    pub fn reset_momentum(&mut self) {
        for layer in &mut self.layers {
            layer.previous_delta_mut().zero_out();
        }
    }

    /// Feeds `input`, shaped `(cases, inputs)`, through the network and
    /// returns the output layer, shaped `(cases, outputs)`.
    pub fn run<S>(&self, input: &ArrayBase<S, Ix2>) -> Result<Array2<f64>>
    where
        S: Data<Elem = f64>,
    {
        let trace = self.forward(input)?;
        Ok(trace.output().t().to_owned())
    }

    /// Feeds `input` through the network, keeping every layer's values for a
    /// later backward pass.
    pub fn forward<S>(&self, input: &ArrayBase<S, Ix2>) -> Result<ForwardTrace>
    where
        S: Data<Elem = f64>,
    {
        check_len("input columns", self.input_len(), input.ncols())?;
        let input = input.t();

        let mut layer_inputs = Vec::with_capacity(self.layers.len());
        let mut layer_outputs: Vec<Array2<f64>> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (layer_input, layer_output) = match layer_outputs.last() {
                Some(previous) => layer.forward(previous),
                None => layer.forward(&input),
            };
            layer_inputs.push(layer_input);
            layer_outputs.push(layer_output);
        }
        Ok(ForwardTrace {
            layer_inputs,
            layer_outputs,
        })
    }

    /// Propagates the difference between the traced output and `target`,
    /// shaped `(cases, outputs)`, back through the network.
    ///
    /// Returns the total squared error over the batch together with each
    /// layer's delta, indexed like the layers.
    pub fn backward<S>(
        &self,
        trace: &ForwardTrace,
        target: &ArrayBase<S, Ix2>,
    ) -> Result<(f64, Vec<Array2<f64>>)>
    where
        S: Data<Elem = f64>,
    {
        check_len("target rows", trace.cases(), target.nrows())?;
        check_len("target columns", self.output_len(), target.ncols())?;

        let output_delta = trace.output() - &target.t();
        let error: f64 = output_delta.iter().map(|d| d * d).sum();

        let mut deltas = Vec::with_capacity(self.layers.len());
        deltas.push(
            self.layers
                .back()
                .delta(&output_delta, trace.layer_inputs.back()),
        );
        for (index, layer) in self.layers.iter().enumerate().rev().skip(1) {
            let pullback = self.layers[index + 1].pullback(deltas.back());
            deltas.push(layer.delta(&pullback, &trace.layer_inputs[index]));
        }
        deltas.reverse();
        Ok((error, deltas))
    }

    /// Sums, over every case, the outer product of each layer's delta with the
    /// bias-augmented values that fed the layer.
    pub fn gradients<S>(
        &self,
        input: &ArrayBase<S, Ix2>,
        trace: &ForwardTrace,
        deltas: &[Array2<f64>],
    ) -> Vec<Array2<f64>>
    where
        S: Data<Elem = f64>,
    {
        deltas
            .iter()
            .enumerate()
            .map(|(index, delta)| {
                let fed: ArrayView2<f64> = if index == 0 {
                    input.t()
                } else {
                    trace.layer_outputs[index - 1].view()
                };
                delta.dot(&matrix::augment(&fed).t())
            })
            .collect()
    }

    /// Trains the network for one epoch over the whole batch: a forward pass,
    /// a backward pass and a weight update with momentum.
    ///
    /// Returns the total squared error of the forward pass, summed over every
    /// case and output. The weights are left untouched on error.
    pub fn train_epoch<S, T>(
        &mut self,
        input: &ArrayBase<S, Ix2>,
        target: &ArrayBase<T, Ix2>,
        training_rate: f64,
        momentum: f64,
    ) -> Result<f64>
    where
        S: Data<Elem = f64>,
        T: Data<Elem = f64>,
    {
        let trace = self.forward(input)?;
        let (error, deltas) = self.backward(&trace, target)?;
        let gradients = self.gradients(input, &trace, &deltas);
        for (layer, gradient) in self.layers.iter_mut().zip(&gradients) {
            layer.apply_update(training_rate, momentum, gradient);
        }
        trace!(error, cases = trace.cases(), "trained epoch");
        Ok(error)
    }
}

impl Trainable for Network {
    type Input = Array2<f64>;
    type Output = Array2<f64>;

    fn train_epoch(
        &mut self,
        input: &Self::Input,
        target: &Self::Output,
        rate: f64,
        momentum: f64,
    ) -> Result<f64> {
        Network::train_epoch(self, input, target, rate, momentum)
    }
}

/// Checks the layer sizes and expands `transfer_functions` into one transfer
/// function per weight-bearing layer.
fn resolve_transfer_functions(
    layer_sizes: &[usize],
    transfer_functions: Option<&[Option<TransferFunction>]>,
) -> Result<Vec<TransferFunction>> {
    if layer_sizes.len() < 2 {
        return Err(Error::Configuration(format!(
            "need at least an input and an output layer, got {} layer sizes",
            layer_sizes.len()
        )));
    }
    if let Some(index) = layer_sizes.iter().position(|&size| size == 0) {
        return Err(Error::Configuration(format!("layer {} has no neurons", index)));
    }

    let layer_count = layer_sizes.len() - 1;
    let transfer_functions = match transfer_functions {
        Some(functions) => functions,
        None => {
            return Ok((0..layer_count)
                .map(|i| {
                    if i == layer_count - 1 {
                        TransferFunction::Linear
                    } else {
                        TransferFunction::Sigmoid
                    }
                })
                .collect());
        }
    };

    if transfer_functions.len() != layer_sizes.len() {
        return Err(Error::Configuration(format!(
            "incompatible list of transfer functions: {} for {} layers",
            transfer_functions.len(),
            layer_sizes.len()
        )));
    }
    if transfer_functions[0].is_some() {
        return Err(Error::Configuration(
            "input layer cannot have a transfer function".into(),
        ));
    }
    transfer_functions[1..]
        .iter()
        .enumerate()
        .map(|(i, transfer)| {
            transfer.ok_or_else(|| {
                Error::Configuration(format!("layer {} has no transfer function", i + 1))
            })
        })
        .collect()
}

fn check_len(context: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            context,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::momentum_step;
    use ndarray::{arr2, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::activator::TransferFunction::*;

    fn seeded(
        layer_sizes: &[usize],
        transfers: Option<&[Option<TransferFunction>]>,
        seed: u64,
    ) -> Network {
        Network::with_rng(layer_sizes, transfers, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    fn xor() -> (Array2<f64>, Array2<f64>) {
        (
            arr2(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]),
            arr2(&[[0.0], [1.0], [1.0], [0.0]]),
        )
    }

    #[test]
    fn too_few_layers() {
        assert!(matches!(Network::new(&[3], None), Err(Error::Configuration(_))));
    }

    #[test]
    fn empty_layer() {
        assert!(matches!(Network::new(&[1, 0, 1], None), Err(Error::Configuration(_))));
    }

    #[test]
    fn transfer_function_count_mismatch() {
        let transfers = [None, Some(Sigmoid)];
        assert!(matches!(
            Network::new(&[2, 2, 1], Some(&transfers)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn input_layer_transfer_function() {
        let transfers = [Some(Sigmoid), Some(Sigmoid), Some(Linear)];
        assert!(matches!(
            Network::new(&[2, 2, 1], Some(&transfers)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn missing_hidden_transfer_function() {
        let transfers = [None, None, Some(Linear)];
        assert!(matches!(
            Network::new(&[2, 2, 1], Some(&transfers)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn default_transfer_functions() {
        let network = seeded(&[4, 3, 3, 2], None, 1);
        assert_eq!(
            network.transfer_functions(),
            vec![None, Some(Sigmoid), Some(Sigmoid), Some(Linear)]
        );
        assert_eq!(network.layer_sizes(), vec![4, 3, 3, 2]);
        assert_eq!(network.layer_count(), 3);
    }

    #[test]
    fn weight_shapes_include_bias() {
        let transfers = [None, Some(TanH), Some(Gaussian)];
        let network = seeded(&[3, 5, 2], Some(&transfers), 2);
        assert_eq!(network.weights(0).unwrap().dim(), (5, 4));
        assert_eq!(network.weights(1).unwrap().dim(), (2, 6));
        assert!(network.weights(2).is_none());
        for layer in network.layers() {
            assert!(layer.weights().iter().any(|&w| w != 0.0));
            assert!(layer.previous_delta().iter().all(|&d| d == 0.0));
        }
    }

    #[test]
    fn run_output_shape() {
        let network = seeded(&[3, 4, 2], None, 3);
        for &cases in &[0, 1, 7] {
            let input = Array2::from_elem((cases, 3), 0.5);
            assert_eq!(network.run(&input).unwrap().dim(), (cases, 2));
        }
    }

    #[test]
    fn run_wrong_input_size() {
        let network = seeded(&[3, 4, 2], None, 3);
        let input = Array2::zeros((5, 2));
        match network.run(&input) {
            Err(Error::ShapeMismatch { expected, found, .. }) => {
                assert_eq!((expected, found), (3, 2));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn run_is_repeatable() {
        let network = seeded(&[2, 3, 1], None, 4);
        let (input, _) = xor();
        let first = network.run(&input).unwrap();
        let second = network.run(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn run_matches_hand_computation() {
        let weights = vec![
            arr2(&[[1.0, -1.0, 0.5]]),
            arr2(&[[2.0, -1.0]]),
        ];
        let layers = vec![
            Layer::from_parts(Sigmoid, weights[0].clone(), Array2::zeros((1, 3))),
            Layer::from_parts(Linear, weights[1].clone(), Array2::zeros((1, 2))),
        ];
        let network = Network::from_layers(layers);
        let output = network.run(&arr2(&[[2.0, 1.0]])).unwrap();
        let hidden = Sigmoid.f(2.0 - 1.0 + 0.5);
        assert!((output[[0, 0]] - (2.0 * hidden - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn target_shape_mismatch() {
        let mut network = seeded(&[2, 3, 1], None, 5);
        let (input, _) = xor();
        let before = network.weights(0).unwrap().clone();
        assert!(matches!(
            network.train_epoch(&input, &Array2::zeros((3, 1)), 0.2, 0.5),
            Err(Error::ShapeMismatch { context: "target rows", .. })
        ));
        assert!(matches!(
            network.train_epoch(&input, &Array2::zeros((4, 2)), 0.2, 0.5),
            Err(Error::ShapeMismatch { context: "target columns", .. })
        ));
        assert_eq!(network.weights(0).unwrap(), &before);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let transfers = [None, Some(TanH), Some(Sigmoid), Some(Linear)];
        let network = seeded(&[2, 3, 2, 1], Some(&transfers), 6);
        let input = arr2(&[[0.3, -0.7], [1.2, 0.4], [-0.5, 0.9]]);
        let target = arr2(&[[0.5], [-1.0], [2.0]]);

        let trace = network.forward(&input).unwrap();
        let (_, deltas) = network.backward(&trace, &target).unwrap();
        let gradients = network.gradients(&input, &trace, &deltas);

        let error_of = |network: &Network| {
            let trace = network.forward(&input).unwrap();
            network.backward(&trace, &target).unwrap().0
        };
        let h = 1e-6;
        for (index, gradient) in gradients.iter().enumerate() {
            assert_eq!(gradient.dim(), network.weights(index).unwrap().dim());
            for ((row, col), &analytic) in gradient.indexed_iter() {
                let mut plus = network.clone();
                plus.layers[index].weights_mut()[[row, col]] += h;
                let mut minus = network.clone();
                minus.layers[index].weights_mut()[[row, col]] -= h;
                // The error is a sum of squares, so its slope is twice the gradient.
                let numeric = (error_of(&plus) - error_of(&minus)) / (2.0 * h) / 2.0;
                assert!(
                    (analytic - numeric).abs() < 1e-5,
                    "layer {} [{}, {}]: {} vs {}",
                    index,
                    row,
                    col,
                    analytic,
                    numeric
                );
            }
        }
    }

    #[test]
    fn zero_momentum_update_is_rate_times_gradient() {
        let mut network = seeded(&[2, 2, 1], None, 7);
        let (input, target) = xor();
        // Leave some previous delta behind first.
        network.train_epoch(&input, &target, 0.2, 0.5).unwrap();

        let before = network.clone();
        let trace = before.forward(&input).unwrap();
        let (_, deltas) = before.backward(&trace, &target).unwrap();
        let gradients = before.gradients(&input, &trace, &deltas);

        network.train_epoch(&input, &target, 0.2, 0.0).unwrap();
        for (index, gradient) in gradients.iter().enumerate() {
            let step = gradient * 0.2;
            assert_eq!(network.layers[index].previous_delta(), &step);
            assert_eq!(
                step,
                momentum_step(gradient, before.layers[index].previous_delta(), 0.2, 0.0)
            );
            assert_eq!(
                network.weights(index).unwrap(),
                &(before.weights(index).unwrap() - &step)
            );
        }
    }

    #[test]
    fn reset_momentum_clears_previous_deltas() {
        let mut network = seeded(&[2, 2, 1], None, 8);
        let (input, target) = xor();
        network.train_epoch(&input, &target, 0.2, 0.5).unwrap();
        let has_momentum = |network: &Network| {
            network
                .layers()
                .iter()
                .any(|l| l.previous_delta().iter().any(|&d| d != 0.0))
        };
        assert!(has_momentum(&network));
        network.reset_momentum();
        assert!(!has_momentum(&network));
    }

    #[test]
    fn error_is_non_negative_and_decreases() {
        let mut network = seeded(&[2, 3, 1], None, 9);
        let (input, target) = xor();
        let initial = network
            .train_epoch(&input, &target, DEFAULT_TRAINING_RATE, DEFAULT_MOMENTUM)
            .unwrap();
        let mut last = initial;
        for _ in 0..1000 {
            last = network
                .train_epoch(&input, &target, DEFAULT_TRAINING_RATE, DEFAULT_MOMENTUM)
                .unwrap();
            assert!(last >= 0.0);
        }
        assert!(last < initial, "{} >= {}", last, initial);
    }

    #[test]
    fn learns_xor() {
        let (input, target) = xor();
        let transfers = [None, Some(Sigmoid), Some(Linear)];
        let mut network = seeded(&[2, 2, 1], Some(&transfers), 0);
        let mut error = f64::INFINITY;
        for _ in 0..5000 {
            error = network.train_epoch(&input, &target, 0.2, 0.9).unwrap();
        }
        assert!(error < 0.05, "error {}", error);
    }
}
