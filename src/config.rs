//! Mutation, network and population settings.
//!
//! [`NeatConfig`] is a plain serde record. Every section and field has a
//! documented default, so a partial JSON document is enough:
//!
//! ```rust
//! use neat_evolver::NeatConfig;
//!
//! let config = NeatConfig::from_json_str(
//!     r#"{ "network": { "inputs": 2, "outputs": 1 }, "population": { "size": 50 } }"#,
//! )
//! .unwrap();
//! assert_eq!(config.population.size, 50);
//! assert!((config.mutation.weight.power - 2.5).abs() < 1e-6);
//! ```
//!
//! Values of the wrong type or outside their valid range never abort
//! loading: [`NeatConfig::sanitize`] swaps them for the default and logs a
//! warning.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::activation::Activation;

/// Errors raised while loading a configuration document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON or has the wrong overall shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level configuration consumed by [`Population`](crate::Population).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeatConfig {
    /// Mutation probabilities and magnitudes.
    pub mutation: MutationConfig,
    /// Network shape and activation functions.
    pub network: NetworkConfig,
    /// Population sizing.
    pub population: PopulationConfig,
}

/// Groups the three mutation classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub node: NodeMutationConfig,
    pub connection: ConnectionMutationConfig,
    pub weight: WeightMutationConfig,
}

/// Settings for the add-node (connection split) mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeMutationConfig {
    /// Probability that a mutation call splits a connection.
    #[serde(deserialize_with = "lenient_f32")]
    pub probability: f32,
    /// Pick the split gene uniformly instead of preferring older genes.
    #[serde(deserialize_with = "lenient_bool")]
    pub random: bool,
    /// Draws allowed when `random` is set.
    #[serde(deserialize_with = "lenient_usize")]
    pub random_tries: usize,
}

impl Default for NodeMutationConfig {
    fn default() -> Self {
        Self {
            probability: 0.03,
            random: false,
            random_tries: 20,
        }
    }
}

/// Settings for the add-connection mutation and the enable/disable tweaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionMutationConfig {
    /// Probability that a mutation call adds a connection.
    #[serde(deserialize_with = "lenient_f32")]
    pub probability: f32,
    /// Probability of re-enabling the oldest disabled gene.
    #[serde(deserialize_with = "lenient_f32")]
    pub reenable_prob: f32,
    /// Probability of toggling one random gene.
    #[serde(deserialize_with = "lenient_f32")]
    pub toggle_enable_prob: f32,
    /// Probability that a new connection is required to be recurrent.
    #[serde(deserialize_with = "lenient_f32")]
    pub recurrent_prob: f32,
    /// Candidate pairs sampled before giving up.
    #[serde(deserialize_with = "lenient_usize")]
    pub tries: usize,
}

impl Default for ConnectionMutationConfig {
    fn default() -> Self {
        Self {
            probability: 0.05,
            reenable_prob: 0.025,
            toggle_enable_prob: 0.03,
            recurrent_prob: 0.0,
            tries: 20,
        }
    }
}

/// Settings for weight perturbation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeightMutationConfig {
    /// Probability that the weight bundle perturbs weights.
    #[serde(deserialize_with = "lenient_f32")]
    pub probability: f32,
    /// Half-width of the uniform range used for new weights and offsets.
    #[serde(deserialize_with = "lenient_f32")]
    pub power: f32,
    /// Weights are clamped to `[-cap, cap]`.
    #[serde(deserialize_with = "lenient_f32")]
    pub cap: f32,
    /// Per-gene probability of replacing rather than offsetting the weight.
    #[serde(deserialize_with = "lenient_f32")]
    pub randomize_prob: f32,
}

impl Default for WeightMutationConfig {
    fn default() -> Self {
        Self {
            probability: 0.8,
            power: 2.5,
            cap: 8.0,
            randomize_prob: 0.1,
        }
    }
}

/// Network shape and activation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Number of input nodes (excluding bias).
    #[serde(deserialize_with = "lenient_usize")]
    pub inputs: usize,
    /// Number of output nodes.
    #[serde(deserialize_with = "lenient_usize")]
    pub outputs: usize,
    /// Activation applied by hidden nodes.
    #[serde(deserialize_with = "lenient_activation")]
    pub hidden_activation: Activation,
    /// Activation applied by output nodes.
    #[serde(deserialize_with = "lenient_activation")]
    pub output_activation: Activation,
    /// Probability that each candidate pair is connected in generation 0.
    #[serde(deserialize_with = "lenient_f32")]
    pub initial_connectivity: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            inputs: 0,
            outputs: 0,
            hidden_activation: Activation::Sigmoid,
            output_activation: Activation::SteepenedSigmoid,
            initial_connectivity: 1.0,
        }
    }
}

/// Population sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Number of entities per generation.
    #[serde(deserialize_with = "lenient_usize")]
    pub size: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self { size: 100 }
    }
}

impl NeatConfig {
    /// Default settings for a network with the given shape.
    #[must_use]
    pub fn minimal(inputs: usize, outputs: usize) -> Self {
        Self {
            network: NetworkConfig {
                inputs,
                outputs,
                ..NetworkConfig::default()
            },
            ..Self::default()
        }
    }

    /// Parse a JSON document and sanitize the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not a JSON object of
    /// the expected shape. Individual bad values are not errors.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitize())
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it cannot be parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Replace every out-of-range value with its default.
    ///
    /// Probabilities must lie in `[0, 1]`, `power` and `cap` must be positive
    /// and finite, retry budgets and the population size must be non-zero.
    /// Each substitution is logged at `warn` level. A zero input or output
    /// count is kept but warned about, since such networks cannot do
    /// anything useful.
    #[must_use]
    pub fn sanitize(mut self) -> Self {
        let node = NodeMutationConfig::default();
        let conn = ConnectionMutationConfig::default();
        let weight = WeightMutationConfig::default();
        let network = NetworkConfig::default();
        let population = PopulationConfig::default();

        let m = &mut self.mutation;
        probability(&mut m.node.probability, node.probability, "mutation.node.probability");
        positive_count(&mut m.node.random_tries, node.random_tries, "mutation.node.randomTries");

        probability(&mut m.connection.probability, conn.probability, "mutation.connection.probability");
        probability(&mut m.connection.reenable_prob, conn.reenable_prob, "mutation.connection.reenableProb");
        probability(
            &mut m.connection.toggle_enable_prob,
            conn.toggle_enable_prob,
            "mutation.connection.toggleEnableProb",
        );
        probability(&mut m.connection.recurrent_prob, conn.recurrent_prob, "mutation.connection.recurrentProb");
        positive_count(&mut m.connection.tries, conn.tries, "mutation.connection.tries");

        probability(&mut m.weight.probability, weight.probability, "mutation.weight.probability");
        positive_real(&mut m.weight.power, weight.power, "mutation.weight.power");
        positive_real(&mut m.weight.cap, weight.cap, "mutation.weight.cap");
        probability(&mut m.weight.randomize_prob, weight.randomize_prob, "mutation.weight.randomizeProb");

        probability(
            &mut self.network.initial_connectivity,
            network.initial_connectivity,
            "network.initialConnectivity",
        );
        if self.network.inputs == 0 {
            log::warn!("network.inputs is missing or zero; networks will have no sensory inputs");
        }
        if self.network.outputs == 0 {
            log::warn!("network.outputs is missing or zero; networks will have no outputs");
        }

        positive_count(&mut self.population.size, population.size, "population.size");
        self
    }
}

fn probability(value: &mut f32, default: f32, name: &str) {
    if !(0.0..=1.0).contains(value) {
        log::warn!("{name} = {value} is not a probability; using default {default}");
        *value = default;
    }
}

fn positive_real(value: &mut f32, default: f32, name: &str) {
    if !(value.is_finite() && *value > 0.0) {
        log::warn!("{name} = {value} must be a positive number; using default {default}");
        *value = default;
    }
}

fn positive_count(value: &mut usize, default: usize, name: &str) {
    if *value == 0 {
        log::warn!("{name} must be a positive integer; using default {default}");
        *value = default;
    }
}

// Wrong-typed values deserialize to an out-of-range sentinel so that
// `sanitize` substitutes the default instead of the whole parse failing.

#[allow(clippy::cast_possible_truncation)]
fn lenient_f32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().map_or(f32::NAN, |v| v as f32))
}

fn lenient_usize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(0))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(false))
}

fn lenient_activation<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Activation, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let activation = value.as_str().and_then(Activation::from_name);
    Ok(activation.unwrap_or_else(|| {
        log::warn!("unrecognised activation {value}; falling back to logistic sigmoid");
        Activation::Sigmoid
    }))
}
