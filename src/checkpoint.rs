//! Saving and restoring trained networks.
//!
//! A checkpoint is a `u32` format version followed by the network: its layer
//! sizes, one transfer function per weight-bearing layer, every weight matrix
//! and every previous weight update. Matrices are stored as their shape
//! followed by their values in row-major order. Everything is encoded with
//! fixed-width little-endian integers, so files are stable across platforms.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;
use ndarray::Array2;
use tracing::info;

use crate::activator::TransferFunction;
use crate::error::{Error, Result};
use crate::feed_forward::Network;
use crate::layer::Layer;

/// Version written at the start of every checkpoint.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    layer_sizes: Vec<usize>,
    transfer_functions: Vec<TransferFunction>,
    weights: Vec<Array2<f64>>,
    previous_deltas: Vec<Array2<f64>>,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

impl Network {
    /// Writes the network to `path`, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), layers = self.layer_count(), "saved network");
        Ok(())
    }

    /// Reads a network previously written by `save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Network> {
        let path = path.as_ref();
        let network = Network::read_from(BufReader::new(File::open(path)?))?;
        info!(path = %path.display(), sizes = ?network.layer_sizes(), "loaded network");
        Ok(network)
    }

    /// Encodes the network into `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let layers = self.layers();
        let snapshot = Snapshot {
            layer_sizes: self.layer_sizes(),
            transfer_functions: layers.iter().map(Layer::transfer).collect(),
            weights: layers.iter().map(|l| l.weights().clone()).collect(),
            previous_deltas: layers.iter().map(|l| l.previous_delta().clone()).collect(),
        };
        codec().serialize_into(&mut writer, &FORMAT_VERSION)?;
        codec().serialize_into(&mut writer, &snapshot)?;
        Ok(())
    }

    /// Decodes a network from `reader`, checking that the stored matrices fit
    /// the stored layer sizes.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Network> {
        let version: u32 = codec().deserialize_from(&mut reader)?;
        if version != FORMAT_VERSION {
            return Err(Error::VersionMismatch {
                expected: FORMAT_VERSION,
                found: version,
            });
        }
        let snapshot: Snapshot = codec().deserialize_from(&mut reader)?;
        snapshot.into_network()
    }
}

impl Snapshot {
    fn into_network(self) -> Result<Network> {
        let Snapshot {
            layer_sizes,
            transfer_functions,
            weights,
            previous_deltas,
        } = self;

        if layer_sizes.len() < 2 || layer_sizes.contains(&0) {
            return Err(Error::InvalidCheckpoint(format!(
                "unusable layer sizes {:?}",
                layer_sizes
            )));
        }
        let layer_count = layer_sizes.len() - 1;
        for (what, len) in &[
            ("transfer functions", transfer_functions.len()),
            ("weight matrices", weights.len()),
            ("weight deltas", previous_deltas.len()),
        ] {
            if *len != layer_count {
                return Err(Error::InvalidCheckpoint(format!(
                    "{} {} for {} layers",
                    len, what, layer_count
                )));
            }
        }

        let mut layers = Vec::with_capacity(layer_count);
        for (index, ((transfer, weights), previous_delta)) in transfer_functions
            .into_iter()
            .zip(weights)
            .zip(previous_deltas)
            .enumerate()
        {
            let columns = layer_sizes[index].checked_add(1).ok_or_else(|| {
                Error::InvalidCheckpoint(format!("layer {} is too wide", index))
            })?;
            let shape = (layer_sizes[index + 1], columns);
            if weights.dim() != shape || previous_delta.dim() != shape {
                return Err(Error::InvalidCheckpoint(format!(
                    "layer {} expected {:?} matrices, found {:?} and {:?}",
                    index,
                    shape,
                    weights.dim(),
                    previous_delta.dim()
                )));
            }
            layers.push(Layer::from_parts(transfer, weights, previous_delta));
        }
        Ok(Network::from_layers(layers))
    }
}
