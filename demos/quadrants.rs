//! Learns which diagonal quadrants noisy points on the unit circle fall in,
//! a smooth version of XOR on the signs of the coordinates.

use backprop::feed_forward::{Network, TransferFunction};
use backprop::trainer::{Logging, StopCondition, Trainer};
use ndarray::{Array2, Axis};
use rand::distributions::{Distribution, Uniform};
use rand_distr::Normal;

fn generate_data(num_samples: usize) -> (Array2<f64>, Array2<f64>) {
    let mut rng = rand::thread_rng();
    let radians = Uniform::new(0.0, 2.0 * std::f64::consts::PI);
    let noise = Normal::new(0.0, 0.1).unwrap();

    let mut input = Array2::zeros((num_samples, 2));
    let mut target = Array2::zeros((num_samples, 2));
    for i in 0..num_samples {
        let theta = radians.sample(&mut rng);
        let x = theta.cos() + noise.sample(&mut rng);
        let y = theta.sin() + noise.sample(&mut rng);
        input[[i, 0]] = x;
        input[[i, 1]] = y;
        let class = if x * y > 0.0 { 0 } else { 1 };
        target[[i, class]] = 1.0;
    }
    (input, target)
}

fn score(set_name: &str, network: &Network, input: &Array2<f64>, target: &Array2<f64>) {
    let output = network.run(input).unwrap();
    let num_correct = output
        .axis_iter(Axis(0))
        .zip(target.axis_iter(Axis(0)))
        .filter(|(out, expected)| {
            let class = if out[0] > out[1] { 0 } else { 1 };
            expected[class] == 1.0
        })
        .count();
    println!(
        "{} set results: {} of {} correct",
        set_name,
        num_correct,
        target.nrows()
    );
}

fn main() {
    tracing_subscriber::fmt().init();

    let (input, target) = generate_data(1_000);
    let transfers = [
        None,
        Some(TransferFunction::TanH),
        Some(TransferFunction::Sigmoid),
        Some(TransferFunction::Sigmoid),
    ];
    let network = Network::new(&[2, 5, 5, 2], Some(&transfers)).unwrap();
    let network = Trainer::new(network)
        .learning_rate(0.002)
        .momentum(0.9)
        .stop_condition(StopCondition::ErrorThreshold(10.0))
        .stop_condition(StopCondition::Iterations(20_000))
        .logging(Logging::Iterations(1000))
        .train(&input, &target)
        .unwrap();

    println!();
    score("Training", &network, &input, &target);
    let (test_input, test_target) = generate_data(1_000);
    score("Test", &network, &test_input, &test_target);
}
