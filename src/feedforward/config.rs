use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error;

use super::activation::{ActivationKind, ActivationParams};

/// Network configuration.
///
/// Every field has a default, so a JSON document only needs the fields it changes:
///
/// ```json
/// {
///   "init_low": -0.5,
///   "init_high": 0.5,
///   "randomize_output_biases": false,
///   "default_activation": "sigmoid",
///   "leaky_relu_alpha": 0.01,
///   "softmax_derivative": "diagonal_approx"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Lower (inclusive) bound for randomized weights and biases.
    pub init_low: f64,

    /// Upper (exclusive) bound for randomized weights and biases.
    pub init_high: f64,

    /// Whether randomization also covers the output layer biases.
    /// Off by default: output biases start at zero even for a randomized network.
    pub randomize_output_biases: bool,

    /// Activation function every layer gets at construction.
    pub default_activation: ActivationKind,

    #[serde(flatten)]
    pub activation: ActivationParams,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            init_low: -0.5,
            init_high: 0.5,
            randomize_output_biases: false,
            default_activation: ActivationKind::default(),
            activation: ActivationParams::default(),
        }
    }
}

impl NetConfig {
    /// Parses and validates a configuration from JSON text.
    ///
    /// # Examples
    /// ```
    /// # use layernet::feedforward::{NetConfig, SoftmaxDerivative};
    /// let config = NetConfig::from_json(r#"{ "softmax_derivative": "exact_jacobian" }"#).unwrap();
    /// assert_eq!(config.activation.softmax_derivative, SoftmaxDerivative::ExactJacobian);
    /// assert_eq!(config.init_low, -0.5);
    /// ```
    pub fn from_json(json: &str) -> Result<NetConfig, ConfigError> {
        let config: NetConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the file at `path` and parses it with `NetConfig::from_json`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<NetConfig, ConfigError> {
        let json = fs::read_to_string(path)?;
        NetConfig::from_json(&json)
    }

    /// Checks that the initialization range is non-empty with finite bounds and width,
    /// and that the LeakyReLU slope is finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Uniform sampling also needs the width of the range to be finite
        let width = self.init_high - self.init_low;
        if !(self.init_low.is_finite()
            && self.init_high.is_finite()
            && self.init_low < self.init_high
            && width.is_finite())
        {
            return Err(ConfigError::InvalidRange {
                low: self.init_low,
                high: self.init_high,
            });
        }
        if !self.activation.leaky_relu_alpha.is_finite() {
            return Err(ConfigError::InvalidAlpha(self.activation.leaky_relu_alpha));
        }
        Ok(())
    }
}

/// Error structure for `NetConfig` loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Initialization range must be finite with low < high, but got [{low}, {high})!")]
    InvalidRange { low: f64, high: f64 },

    #[error("LeakyReLU alpha must be finite, but got {0}!")]
    InvalidAlpha(f64),
}
