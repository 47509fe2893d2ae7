//! A fully connected feedforward neural network trained by backpropagation
//! with momentum.

#[macro_use]
extern crate serde_derive;

pub mod activator;
pub mod checkpoint;
pub mod error;
pub mod feed_forward;
pub mod trainer;
pub mod vectors;

mod layer;
mod matrix;
mod utils;

pub use crate::error::{Error, Result};
