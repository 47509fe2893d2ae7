//! Reading labelled vector files and pairing them into training batches.
//!
//! A vector file is plain text. The first line holds `<count> <dimension>`,
//! and every following line holds an id followed by `dimension` numbers, all
//! separated by whitespace:
//!
//! ```text
//! 2 3
//! doc_a 0.657 0.878 0.865
//! doc_b 0.120 -0.500 0.004
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// The contents of a vector file, in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorFile {
    dimension: usize,
    ids: Vec<String>,
    values: Vec<f64>,
}

impl VectorFile {
    /// Parses a vector file from `reader`.
    ///
    /// Blank lines are skipped and numbers past `dimension` on a line are
    /// ignored. A count in the header that disagrees with the number of rows
    /// read is only logged.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines().enumerate();

        let (declared, dimension) = loop {
            match lines.next() {
                Some((index, line)) => {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    break parse_header(index + 1, &line)?;
                }
                None => {
                    return Err(Error::Parse {
                        line: 1,
                        message: "missing `<count> <dimension>` header".into(),
                    })
                }
            }
        };

        // The header is only a hint; neither number sizes an allocation.
        let mut ids = Vec::new();
        let mut values = Vec::new();
        for (index, line) in lines {
            let line = line?;
            let mut fields = line.split_whitespace();
            let id = match fields.next() {
                Some(id) => id,
                None => continue,
            };
            for column in 0..dimension {
                let field = fields.next().ok_or_else(|| Error::Parse {
                    line: index + 1,
                    message: format!("expected {} values, found {}", dimension, column),
                })?;
                values.push(parse_field(index + 1, field)?);
            }
            ids.push(id.to_owned());
        }

        if ids.len() != declared {
            warn!(declared, read = ids.len(), "vector count disagrees with header");
        }
        debug!(vectors = ids.len(), dimension, "parsed vector file");
        Ok(VectorFile {
            dimension,
            ids,
            values,
        })
    }

    /// Reads and parses the vector file at `path`.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        VectorFile::parse(BufReader::new(File::open(path)?))
    }

    /// Number of values in each vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// The vector on row `index`, if there is one.
    pub fn vector(&self, index: usize) -> Option<&[f64]> {
        if index >= self.len() {
            return None;
        }
        let start = index * self.dimension;
        Some(&self.values[start..start + self.dimension])
    }

    /// Looks up a vector by id. With repeated ids the last one wins.
    pub fn get(&self, id: &str) -> Option<&[f64]> {
        self.ids
            .iter()
            .rposition(|candidate| candidate == id)
            .and_then(|index| self.vector(index))
    }

    /// All vectors as a `(len, dimension)` matrix, one vector per row.
    pub fn to_array(&self) -> Result<Array2<f64>> {
        Ok(Array2::from_shape_vec(
            (self.len(), self.dimension),
            self.values.clone(),
        )?)
    }
}

fn parse_header(line: usize, text: &str) -> Result<(usize, usize)> {
    let mut fields = text.split_whitespace();
    let mut next = |name: &str| -> Result<usize> {
        let field = fields.next().ok_or_else(|| Error::Parse {
            line,
            message: format!("header is missing the {}", name),
        })?;
        field.parse().map_err(|_| Error::Parse {
            line,
            message: format!("invalid {} `{}`", name, field),
        })
    };
    let count = next("vector count")?;
    let dimension = next("dimension")?;
    if dimension == 0 {
        return Err(Error::Parse {
            line,
            message: "dimension must be positive".into(),
        });
    }
    Ok((count, dimension))
}

fn parse_field(line: usize, field: &str) -> Result<f64> {
    field.parse().map_err(|_| Error::Parse {
        line,
        message: format!("invalid number `{}`", field),
    })
}

/// Pairs every input vector with the target vector of the same id.
///
/// Rows keep the order of `inputs`. Returns `(input, target)` matrices shaped
/// `(inputs.len(), inputs.dimension())` and `(inputs.len(),
/// targets.dimension())`.
pub fn join(inputs: &VectorFile, targets: &VectorFile) -> Result<(Array2<f64>, Array2<f64>)> {
    // Later rows overwrite earlier ones, matching `VectorFile::get`.
    let by_id: HashMap<&str, usize> = targets
        .ids
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index))
        .collect();

    let mut target_values = Vec::new();
    for id in &inputs.ids {
        let vector = by_id
            .get(id.as_str())
            .and_then(|&index| targets.vector(index))
            .ok_or_else(|| Error::MissingTarget(id.clone()))?;
        target_values.extend_from_slice(vector);
    }

    let input = inputs.to_array()?;
    let target = Array2::from_shape_vec((inputs.len(), targets.dimension), target_values)?;
    debug!(cases = inputs.len(), "joined input and target vectors");
    Ok((input, target))
}
