//! Trains a network that maps the vectors of one file onto the vectors of
//! another, matching rows by id, and saves the result.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ndarray::Array2;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use backprop::feed_forward::{Network, TransferFunction};
use backprop::trainer::{Logging, StopCondition, Trainer};
use backprop::vectors::{self, VectorFile};

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train a backpropagation network on paired vector files", long_about = None)]
struct Cli {
    /// Vector file holding the network inputs
    #[arg(long)]
    inputs: PathBuf,

    /// Vector file holding the targets, matched to inputs by id
    #[arg(long)]
    targets: PathBuf,

    /// Hidden layer size (defaults to the input dimension)
    #[arg(long)]
    hidden: Option<usize>,

    /// Transfer function of the hidden layer
    #[arg(long, default_value = "sigmoid")]
    hidden_transfer: String,

    /// Transfer function of the output layer
    #[arg(long, default_value = "sigmoid")]
    output_transfer: String,

    /// Learning rate
    #[arg(long, default_value = "0.2")]
    rate: f64,

    /// Fraction of the previous update carried into the next
    #[arg(long, default_value = "0.9")]
    momentum: f64,

    /// Maximum number of epochs
    #[arg(long, default_value = "1000000")]
    max_epochs: usize,

    /// Stop once the total squared error drops to this value
    #[arg(long, default_value = "1e-6")]
    error_threshold: f64,

    /// Log progress every this many epochs (0 to disable)
    #[arg(long, default_value = "5000")]
    log_every: usize,

    /// Where to write the trained model
    #[arg(long, default_value = "model.bin")]
    model: PathBuf,

    /// Continue training the model stored at this path
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Comma separated input vector to run through the trained network
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    probe: Vec<f64>,

    /// Verbosity level: trace, debug, info, warn or error
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let inputs = VectorFile::read(&cli.inputs)
        .with_context(|| format!("reading {}", cli.inputs.display()))?;
    let targets = VectorFile::read(&cli.targets)
        .with_context(|| format!("reading {}", cli.targets.display()))?;
    let (input, target) = vectors::join(&inputs, &targets)?;
    info!(
        cases = input.nrows(),
        inputs = input.ncols(),
        outputs = target.ncols(),
        "loaded training data"
    );

    let network = match &cli.resume {
        Some(path) => Network::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let hidden = cli.hidden.unwrap_or_else(|| inputs.dimension());
            let transfers = [
                None,
                Some(cli.hidden_transfer.parse::<TransferFunction>()?),
                Some(cli.output_transfer.parse::<TransferFunction>()?),
            ];
            Network::new(
                &[inputs.dimension(), hidden, targets.dimension()],
                Some(&transfers),
            )?
        }
    };

    let network = Trainer::new(network)
        .learning_rate(cli.rate)
        .momentum(cli.momentum)
        .stop_condition(StopCondition::Iterations(cli.max_epochs))
        .stop_condition(StopCondition::ErrorThreshold(cli.error_threshold))
        .logging(Logging::Iterations(cli.log_every))
        .train(&input, &target)?;

    network
        .save(&cli.model)
        .with_context(|| format!("writing {}", cli.model.display()))?;

    if !cli.probe.is_empty() {
        if cli.probe.len() != network.input_len() {
            bail!(
                "probe has {} values, the network expects {}",
                cli.probe.len(),
                network.input_len()
            );
        }
        let probe = Array2::from_shape_vec((1, cli.probe.len()), cli.probe.clone())?;
        let output = network.run(&probe)?;
        println!("{}", output);
    }
    Ok(())
}
