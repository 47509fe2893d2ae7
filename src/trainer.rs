//! Utilities for training neural networks.

use std::time::{Duration, Instant};

use tracing::info;

use crate::error::Result;
use crate::feed_forward::{DEFAULT_MOMENTUM, DEFAULT_TRAINING_RATE};

/// Makes a model trainable using gradient descent with momentum.
pub trait Trainable {
    /// Input data format.
    type Input;

    /// Output data format.
    type Output;

    /// Runs one full forward, backward and update pass over the batch.
    /// Returns the total squared error of the batch before the update.
    fn train_epoch(
        &mut self,
        input: &Self::Input,
        target: &Self::Output,
        rate: f64,
        momentum: f64,
    ) -> Result<f64>;
}

/// A builder for training models.
#[derive(Debug)]
pub struct Trainer<T: Trainable> {
    model: T,
    learning_rate: f64,
    momentum: f64,
    logging: Logging,
    stop_conditions: Vec<StopCondition>,
}

impl<T: Trainable> Trainer<T> {
    /// Creates a new Trainer instance.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * A learning rate of 0.2.
    /// * A momentum of 0.5.
    /// * Stops after 1000 training iterations.
    /// * Logs on training completion.
    pub fn new(model: T) -> Self {
        Trainer {
            model,
            learning_rate: DEFAULT_TRAINING_RATE,
            momentum: DEFAULT_MOMENTUM,
            logging: Logging::Completion,
            stop_conditions: Vec::new(),
        }
    }

    /// Sets the learning rate to use during gradient descent.
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Sets the fraction of the previous weight update carried into the next.
    pub fn momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Adds a condition to finish training. Training stops as soon as any of
    /// the added conditions holds.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
    where
        C: Into<StopCondition>,
    {
        self.stop_conditions.push(condition.into());
        self
    }

    /// Trains the model on a batch of labelled data until a stop condition
    /// holds.
    ///
    /// Returns:
    ///   The trained model, or the first error an epoch ran into.
    pub fn train(mut self, input: &T::Input, target: &T::Output) -> Result<T> {
        if self.stop_conditions.is_empty() {
            self.stop_conditions.push(StopCondition::Iterations(1000));
        }

        let start_time = Instant::now();
        let mut iteration = 0;
        let mut training_error;
        loop {
            training_error = self.model.train_epoch(
                input,
                target,
                self.learning_rate,
                self.momentum,
            )?;
            iteration += 1;

            self.logging.iteration(iteration, training_error);
            let done = self
                .stop_conditions
                .iter()
                .any(|c| c.should_stop(iteration, training_error, start_time));
            if done {
                break;
            }
        }
        self.logging.completion(iteration, training_error, start_time);
        Ok(self.model)
    }
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` training iterations
    Iterations(usize),
}

impl Logging {
    /// Performs logging at the current `iteration` of training.
    fn iteration(&self, iteration: usize, training_error: f64) {
        if let Logging::Iterations(freq) = *self {
            if freq > 0 && iteration % freq == 0 {
                info!(iteration, error = training_error, "training progress");
            }
        }
    }

    /// Performs logging at the end of training.
    fn completion(&self, iterations: usize, training_error: f64, start_time: Instant) {
        if let Logging::Silent = *self {
            return;
        }
        info!(
            iterations,
            error = training_error,
            seconds = start_time.elapsed().as_secs_f64(),
            "training completed"
        );
    }
}

/// When to stop training
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StopCondition {
    /// Stops after the provided number of training iterations
    Iterations(usize),
    /// Stops once the training error is at or below the provided threshold
    ErrorThreshold(f64),
    /// Stops after the provided duration
    Duration(Duration),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl StopCondition {
    /// Returns true if training is complete.
    fn should_stop(&self, iteration: usize, training_error: f64, start_time: Instant) -> bool {
        match *self {
            StopCondition::Iterations(iterations) => iteration >= iterations,
            StopCondition::ErrorThreshold(threshold) => training_error <= threshold,
            StopCondition::Duration(duration) => start_time.elapsed() > duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::feed_forward::Network;
    use ndarray::{arr2, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Counts epochs and replays a fixed sequence of errors.
    struct Scripted {
        errors: Vec<f64>,
        epochs: usize,
        last_rate: f64,
        last_momentum: f64,
    }

    impl Scripted {
        fn new(errors: &[f64]) -> Self {
            Scripted {
                errors: errors.to_vec(),
                epochs: 0,
                last_rate: 0.0,
                last_momentum: 0.0,
            }
        }
    }

    impl Trainable for Scripted {
        type Input = ();
        type Output = ();

        fn train_epoch(&mut self, _: &(), _: &(), rate: f64, momentum: f64) -> Result<f64> {
            let error = self.errors[self.epochs.min(self.errors.len() - 1)];
            self.epochs += 1;
            self.last_rate = rate;
            self.last_momentum = momentum;
            Ok(error)
        }
    }

    #[test]
    fn defaults() {
        let model = Trainer::new(Scripted::new(&[1.0]))
            .logging(Logging::Silent)
            .train(&(), &())
            .unwrap();
        assert_eq!(model.epochs, 1000);
        assert_eq!(model.last_rate, 0.2);
        assert_eq!(model.last_momentum, 0.5);
    }

    #[test]
    fn stops_at_error_threshold() {
        let model = Trainer::new(Scripted::new(&[3.0, 2.0, 0.5, 0.1]))
            .stop_condition(StopCondition::ErrorThreshold(0.5))
            .stop_condition(StopCondition::Iterations(100))
            .train(&(), &())
            .unwrap();
        assert_eq!(model.epochs, 3);
    }

    #[test]
    fn first_condition_to_hold_wins() {
        let model = Trainer::new(Scripted::new(&[3.0]))
            .learning_rate(0.05)
            .momentum(0.9)
            .stop_condition(StopCondition::ErrorThreshold(1e-6))
            .stop_condition(StopCondition::Iterations(7))
            .logging(Logging::Iterations(2))
            .train(&(), &())
            .unwrap();
        assert_eq!(model.epochs, 7);
        assert_eq!(model.last_rate, 0.05);
        assert_eq!(model.last_momentum, 0.9);
    }

    #[test]
    fn duration_stop_condition() {
        let model = Trainer::new(Scripted::new(&[1.0]))
            .stop_condition(Duration::from_millis(0))
            .train(&(), &())
            .unwrap();
        assert!(model.epochs >= 1);
    }

    #[test]
    fn propagates_shape_errors() {
        let network =
            Network::with_rng(&[2, 2, 1], None, &mut StdRng::seed_from_u64(1)).unwrap();
        let result =
            Trainer::new(network).train(&Array2::zeros((4, 3)), &Array2::zeros((4, 1)));
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn trains_network_to_threshold() {
        let input = arr2(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
        let target = arr2(&[[0.0], [1.0], [1.0], [0.0]]);
        let network =
            Network::with_rng(&[2, 3, 1], None, &mut StdRng::seed_from_u64(11)).unwrap();
        let mut network = Trainer::new(network)
            .learning_rate(0.2)
            .momentum(0.9)
            .stop_condition(StopCondition::ErrorThreshold(1e-3))
            .stop_condition(StopCondition::Iterations(20_000))
            .logging(Logging::Iterations(1000))
            .train(&input, &target)
            .unwrap();
        let error = network.train_epoch(&input, &target, 0.0, 0.0).unwrap();
        assert!(error < 1e-2, "error {}", error);
    }
}
