//! Activation functions for phenotype nodes.
//!
//! Hidden nodes use the configured hidden activation, output nodes use the
//! configured output activation (a steepened logistic curve by default).

use serde::{Deserialize, Serialize};

/// Slope applied by [`Activation::SteepenedSigmoid`].
pub const SIGMOID_SLOPE: f32 = 4.924_273;

/// Leak factor applied by [`Activation::LeakyReLU`] to negative inputs.
pub const LEAKINESS: f32 = 0.01;

/// Activation function types supported by network nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Activation {
    /// Identity function: f(x) = x
    #[serde(alias = "linear", alias = "linearActivation")]
    Identity,
    /// Logistic sigmoid: f(x) = 1 / (1 + e^(-x))
    #[default]
    #[serde(alias = "logistic")]
    Sigmoid,
    /// Logistic sigmoid with a steep slope: f(x) = 1 / (1 + e^(-4.924273 x))
    SteepenedSigmoid,
    /// Hyperbolic tangent: f(x) = tanh(x)
    #[serde(alias = "TanH")]
    Tanh,
    /// Rectified Linear Unit: f(x) = max(0, x)
    #[serde(rename = "relu", alias = "ReLU")]
    ReLU,
    /// Binary step: f(x) = 0 if x < 0 else 1
    #[serde(alias = "binaryStep")]
    Step,
    /// Leaky ReLU: `f(x) = x` if `x >= 0` else `0.01x`
    #[serde(rename = "leakyRelu", alias = "leakyReLU")]
    LeakyReLU,
}

impl Activation {
    /// All available activation functions.
    pub const ALL: [Self; 7] = [
        Self::Identity,
        Self::Sigmoid,
        Self::SteepenedSigmoid,
        Self::Tanh,
        Self::ReLU,
        Self::Step,
        Self::LeakyReLU,
    ];

    /// Look up an activation by name.
    ///
    /// Accepts the canonical serialized names as well as the common aliases
    /// (`linearActivation`, `binaryStep`, `TanH`, `leakyReLU`, ...), ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        let activation = match lowered.as_str() {
            "identity" | "linear" | "linearactivation" => Self::Identity,
            "sigmoid" | "logistic" => Self::Sigmoid,
            "steepenedsigmoid" | "steepened_sigmoid" => Self::SteepenedSigmoid,
            "tanh" => Self::Tanh,
            "relu" => Self::ReLU,
            "step" | "binarystep" => Self::Step,
            "leakyrelu" | "leaky_relu" => Self::LeakyReLU,
            _ => return None,
        };
        Some(activation)
    }

    /// Apply this activation function to an input value.
    ///
    /// NaN propagates; infinities map to the function's limit where one exists.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        if x.is_nan() {
            return f32::NAN;
        }

        match self {
            Self::Identity => x,
            Self::Sigmoid => logistic(x),
            Self::SteepenedSigmoid => logistic(SIGMOID_SLOPE * x),
            Self::Tanh => {
                if x == f32::INFINITY {
                    return 1.0;
                }
                if x == f32::NEG_INFINITY {
                    return -1.0;
                }
                x.tanh()
            }
            Self::ReLU => {
                if x < 0.0 {
                    0.0
                } else {
                    x
                }
            }
            Self::Step => {
                if x < 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            Self::LeakyReLU => {
                if x < 0.0 {
                    x * LEAKINESS
                } else {
                    x
                }
            }
        }
    }
}

#[inline]
fn logistic(x: f32) -> f32 {
    if x == f32::INFINITY {
        return 1.0;
    }
    if x == f32::NEG_INFINITY {
        return 0.0;
    }
    // sigmoid(-88) ≈ 0, sigmoid(88) ≈ 1; clamping keeps exp() finite
    let clamped = x.clamp(-88.0, 88.0);
    1.0 / (1.0 + (-clamped).exp())
}
