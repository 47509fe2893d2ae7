//! Transfer (activation) function types.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array, ArrayBase, Data, Dimension};

use crate::error::Error;

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// types that can be assigned to a layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferFunction {
    /// Logistic sigmoid, `1 / (1 + e^-x)`
    Sigmoid,
    /// Identity
    Linear,
    /// Gaussian bump, `e^(-x^2)`
    Gaussian,
    /// Hyperbolic tan function
    TanH,
    /// Linear with negative values clamped to zero.
    ///
    /// Training treats the derivative as the constant 1 everywhere, including
    /// for negative inputs.
    TruncatedLinear,
}

impl TransferFunction {
    /// Evaluates `f(x)` for the selected transfer function.
    pub fn f(&self, x: f64) -> f64 {
        match *self {
            TransferFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            TransferFunction::Linear => x,
            TransferFunction::Gaussian => (-x * x).exp(),
            TransferFunction::TanH => x.tanh(),
            TransferFunction::TruncatedLinear => if x < 0.0 { 0.0 } else { x },
        }
    }

    /// Evaluates the derivative `f'(x)`.
    ///
    /// Unlike the output-based shortcut some networks use, this takes the
    /// layer *input* `x`, i.e. the value before activation.
    pub fn fprime(&self, x: f64) -> f64 {
        match *self {
            TransferFunction::Sigmoid => {
                let y = TransferFunction::Sigmoid.f(x);
                y * (1.0 - y)
            }
            TransferFunction::Linear => 1.0,
            TransferFunction::Gaussian => -2.0 * x * (-x * x).exp(),
            TransferFunction::TanH => 1.0 - x.tanh().powi(2),
            TransferFunction::TruncatedLinear => 1.0,
        }
    }

    /// Applies the function elementwise to an array of any shape, in value
    /// mode or derivative mode. The input is left untouched.
    pub fn apply<S, D>(&self, x: &ArrayBase<S, D>, derivative: bool) -> Array<f64, D>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        if derivative {
            x.mapv(|v| self.fprime(v))
        } else {
            x.mapv(|v| self.f(v))
        }
    }

    fn name(&self) -> &'static str {
        match *self {
            TransferFunction::Sigmoid => "sigmoid",
            TransferFunction::Linear => "linear",
            TransferFunction::Gaussian => "gaussian",
            TransferFunction::TanH => "tanh",
            TransferFunction::TruncatedLinear => "truncated-linear",
        }
    }
}

impl fmt::Display for TransferFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransferFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sigmoid" | "sgm" => Ok(TransferFunction::Sigmoid),
            "linear" => Ok(TransferFunction::Linear),
            "gaussian" => Ok(TransferFunction::Gaussian),
            "tanh" => Ok(TransferFunction::TanH),
            "truncated-linear" | "trunclinear" | "relu" => {
                Ok(TransferFunction::TruncatedLinear)
            }
            other => Err(Error::Configuration(format!(
                "unknown transfer function `{}`",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    const ALL: [TransferFunction; 5] = [
        TransferFunction::Sigmoid,
        TransferFunction::Linear,
        TransferFunction::Gaussian,
        TransferFunction::TanH,
        TransferFunction::TruncatedLinear,
    ];

    fn finite_difference(function: TransferFunction, x: f64) -> f64 {
        let h = 1e-5;
        (function.f(x + h) - function.f(x - h)) / (2.0 * h)
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let smooth = [
            TransferFunction::Sigmoid,
            TransferFunction::Linear,
            TransferFunction::Gaussian,
            TransferFunction::TanH,
        ];
        for function in &smooth {
            for &x in &[-30.0, -2.5, -0.3, 0.0, 0.4, 1.7, 30.0] {
                let analytic = function.fprime(x);
                let numeric = finite_difference(*function, x);
                assert!(
                    (analytic - numeric).abs() < 1e-6,
                    "{} at {}: {} vs {}",
                    function,
                    x,
                    analytic,
                    numeric
                );
            }
        }
    }

    #[test]
    fn truncated_linear_derivative_is_constant() {
        let function = TransferFunction::TruncatedLinear;
        for &x in &[0.5, 3.0, 30.0] {
            assert!((function.fprime(x) - finite_difference(function, x)).abs() < 1e-6);
        }
        // Negative inputs keep the constant derivative of the identity.
        assert_eq!(function.fprime(-4.0), 1.0);
    }

    #[test]
    fn truncated_linear_clamps_negatives() {
        let x = arr1(&[-2.0, -0.5, 0.0, 1.0, 3.0]);
        let y = TransferFunction::TruncatedLinear.apply(&x, false);
        assert_eq!(y, arr1(&[0.0, 0.0, 0.0, 1.0, 3.0]));
        assert_eq!(x, arr1(&[-2.0, -0.5, 0.0, 1.0, 3.0]));
    }

    #[test]
    fn apply_preserves_shape() {
        let x = arr2(&[[0.0, 1.0, -1.0], [2.0, -2.0, 0.5]]);
        for function in &ALL {
            assert_eq!(function.apply(&x, false).dim(), (2, 3));
            assert_eq!(function.apply(&x, true).dim(), (2, 3));
        }
    }

    #[test]
    fn sigmoid_saturates_without_overflow() {
        let sigmoid = TransferFunction::Sigmoid;
        assert_eq!(sigmoid.f(-1000.0), 0.0);
        assert_eq!(sigmoid.f(1000.0), 1.0);
        assert_eq!(sigmoid.fprime(-1000.0), 0.0);
        assert!((sigmoid.f(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn names_round_trip() {
        for function in &ALL {
            assert_eq!(function.to_string().parse::<TransferFunction>().unwrap(), *function);
        }
        assert_eq!("sgm".parse::<TransferFunction>().unwrap(), TransferFunction::Sigmoid);
        assert!("softmax".parse::<TransferFunction>().is_err());
    }
}
