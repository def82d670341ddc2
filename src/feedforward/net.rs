use log::debug;
use rand::{distributions::Uniform, prelude::Distribution, Rng};
use std::fmt;
use thiserror::Error;

use super::activation::{activate_into, ActivationKind, ActivationParams, Derivatives};
use super::config::{ConfigError, NetConfig};
use super::trainer::Trainer;

/// Fully connected feedforward network.
pub struct Net {
    /// The number of neurons in each layer.
    pub(super) geometry: Box<[usize]>,

    /// Array of coefficients (weights & biases) of all connection layers.
    ///
    /// `coeffs = [layer_1][layer_2] ... [layer_N]`
    /// `layer = [neuron_1][neuron_2] ... [neuron_N]`
    /// `neuron = [weights]bias`
    /// So `weight[i][j][k]` (layer `i` neuron `k` -> layer `i+1` neuron `j`) lives at
    /// `coeff_offsets[i] + j * (geometry[i] + 1) + k`, and the bias of that neuron right after
    /// its weights. The input layer has no stored biases; they are always zero.
    pub(super) coeffs: Box<[f64]>,

    /// Where each connection layer starts in `coeffs`, plus `coeffs.len()` at the end.
    pub(super) coeff_offsets: Box<[usize]>,

    /// Activation function of each layer. The input layer's entry is never applied.
    pub(super) functions: Box<[ActivationKind]>,

    pub(super) params: ActivationParams,

    /// Activations of all layers, joined: `[layer_0][layer_1] ... [layer_N]`.
    /// Layer 0 holds a copy of the last input, the last layer holds the prediction.
    pub(super) outputs: Box<[f64]>,

    /// Weighted sums of all layers, same layout as `outputs` (layer 0 unused).
    pub(super) sums: Box<[f64]>,

    /// Where each layer starts in `outputs` and `sums`, plus the total size at the end.
    pub(super) layer_offsets: Box<[usize]>,

    /// Derivatives of each layer (layer 0 unused), shaped for the layer's function.
    pub(super) derivatives: Box<[Derivatives]>,

    /// Whether the last forward pass filled `derivatives`.
    pub(super) has_gradients: bool,
}

impl Net {
    /// Returns network for given geometry, using the default `NetConfig`.
    ///
    /// With `randomize`, weights and hidden layer biases are drawn uniformly from `[-0.5, 0.5)`;
    /// output layer biases stay zero. Otherwise every coefficient is zero.
    /// All layers use the sigmoid function.
    ///
    /// # Arguments
    /// * `geometry` - number of neurons in each layer, at least two layers of at least one neuron;
    /// * `randomize` - whether coefficients should be random.
    ///
    /// # Examples
    /// ```
    /// # use layernet::feedforward::Net;
    /// let mut net = Net::new(&[2, 3, 1], false).unwrap();
    /// assert_eq!(net.process(&[0.3, -7.0]).unwrap(), &[0.5]);
    ///
    /// assert!(Net::new(&[3], true).is_err());
    /// assert!(Net::new(&[0, 2], true).is_err());
    /// ```
    pub fn new(geometry: &[usize], randomize: bool) -> Result<Net, NewNetError> {
        Net::with_config(geometry, randomize, &NetConfig::default())
    }

    /// Same as `Net::new`, with explicit configuration.
    pub fn with_config(
        geometry: &[usize],
        randomize: bool,
        config: &NetConfig,
    ) -> Result<Net, NewNetError> {
        Net::with_rng(geometry, randomize, config, &mut rand::thread_rng())
    }

    /// Same as `Net::with_config`, drawing random coefficients from `rng`.
    ///
    /// # Examples
    /// ```
    /// # use layernet::feedforward::{Net, NetConfig};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let config = NetConfig::default();
    /// let a = Net::with_rng(&[4, 3, 2], true, &config, &mut StdRng::seed_from_u64(7)).unwrap();
    /// let b = Net::with_rng(&[4, 3, 2], true, &config, &mut StdRng::seed_from_u64(7)).unwrap();
    /// assert_eq!(a.export(), b.export());
    /// ```
    pub fn with_rng<R: Rng + ?Sized>(
        geometry: &[usize],
        randomize: bool,
        config: &NetConfig,
        rng: &mut R,
    ) -> Result<Net, NewNetError> {
        config.validate()?;
        check_geometry(geometry)?;

        let coeff_offsets = coeff_offsets(geometry);
        let mut coeffs = vec![0.0; coeff_offsets[coeff_offsets.len() - 1]].into_boxed_slice();

        if randomize {
            let between = Uniform::from(config.init_low..config.init_high);
            let connections = geometry.len() - 1;

            for i in 0..connections {
                let old_layer_size = geometry[i];
                // Output biases are left at zero unless configured otherwise
                let randomize_biases = i + 1 < connections || config.randomize_output_biases;

                for neuron in coeffs[coeff_offsets[i]..coeff_offsets[i + 1]]
                    .chunks_mut(old_layer_size + 1)
                {
                    let (weights, bias) = neuron.split_at_mut(old_layer_size);
                    for w in weights.iter_mut() {
                        *w = between.sample(rng);
                    }
                    if randomize_biases {
                        bias[0] = between.sample(rng);
                    }
                }
            }
        }

        debug!(
            "built net: geometry={:?} randomize={} coefficients={}",
            geometry,
            randomize,
            coeffs.len()
        );

        Ok(Net::assemble(geometry, coeffs, coeff_offsets, config))
    }

    /// Returns network for given geometry and coefficients (see `Net::export` for the layout).
    ///
    /// # Examples
    /// ```
    /// # use layernet::feedforward::{ActivationKind, Net, NetConfig};
    /// // 2 -> 2 identity: each output neuron has [weight, weight, bias]
    /// let coefficients = vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mut net = Net::with_coefficients(&[2, 2], coefficients, &NetConfig::default()).unwrap();
    /// net.set_activation(1, ActivationKind::Linear).unwrap();
    /// assert_eq!(net.process(&[1.0, 2.0]).unwrap(), &[1.0, 2.0]);
    /// ```
    pub fn with_coefficients<C: Into<Box<[f64]>>>(
        geometry: &[usize],
        coefficients: C,
        config: &NetConfig,
    ) -> Result<Net, NewNetError> {
        config.validate()?;
        check_geometry(geometry)?;

        let coeff_offsets = coeff_offsets(geometry);
        let coeffs_total = coeff_offsets[coeff_offsets.len() - 1];
        let coeffs: Box<[f64]> = coefficients.into();
        if coeffs.len() != coeffs_total {
            return Err(NewNetError::BadCoefficients(SizeMismatch {
                expected: coeffs_total,
                got: coeffs.len(),
            }));
        }

        debug!("built net from coefficients: geometry={:?}", geometry);

        Ok(Net::assemble(geometry, coeffs, coeff_offsets, config))
    }

    /// Allocates scratch buffers around already checked coefficients.
    fn assemble(
        geometry: &[usize],
        coeffs: Box<[f64]>,
        coeff_offsets: Box<[usize]>,
        config: &NetConfig,
    ) -> Net {
        let mut layer_offsets = Vec::with_capacity(geometry.len() + 1);
        let mut total = 0;
        layer_offsets.push(total);
        for &layer_size in geometry {
            total += layer_size;
            layer_offsets.push(total);
        }

        let kind = config.default_activation;
        let params = config.activation;

        Net {
            geometry: geometry.to_owned().into_boxed_slice(),
            coeffs,
            coeff_offsets,
            functions: vec![kind; geometry.len()].into_boxed_slice(),
            params,
            outputs: vec![0.0; total].into_boxed_slice(),
            sums: vec![0.0; total].into_boxed_slice(),
            layer_offsets: layer_offsets.into_boxed_slice(),
            derivatives: geometry
                .iter()
                .map(|&layer_size| Derivatives::for_kind(kind, &params, layer_size))
                .collect(),
            has_gradients: false,
        }
    }

    pub fn geometry(&self) -> &[usize] {
        &self.geometry
    }

    pub fn layer_count(&self) -> usize {
        self.geometry.len()
    }

    pub fn input_count(&self) -> usize {
        self.geometry[0]
    }

    pub fn output_count(&self) -> usize {
        self.geometry[self.geometry.len() - 1]
    }

    pub fn params(&self) -> &ActivationParams {
        &self.params
    }

    /// Activation function of `layer`, if it exists.
    pub fn activation(&self, layer: usize) -> Option<ActivationKind> {
        self.functions.get(layer).copied()
    }

    /// Sets the activation function of one layer.
    ///
    /// Derivatives of the previous forward pass are dropped.
    ///
    /// # Returns
    /// * `Ok(())` if `layer` is in `0..layer_count`;
    /// * `Err(InvalidLayerIndex)` otherwise.
    pub fn set_activation(
        &mut self,
        layer: usize,
        kind: ActivationKind,
    ) -> Result<(), InvalidLayerIndex> {
        if layer >= self.geometry.len() {
            return Err(InvalidLayerIndex {
                index: layer,
                layer_count: self.geometry.len(),
            });
        }

        self.functions[layer] = kind;
        self.derivatives[layer] = Derivatives::for_kind(kind, &self.params, self.geometry[layer]);
        self.has_gradients = false;

        debug!("layer {} activation set to {}", layer, kind);
        Ok(())
    }

    /// Exports geometry and coefficients from network.
    ///
    /// # Returns
    /// `(geometry, coefficients)`, where coefficients are laid out per target neuron as
    /// `[weights...]bias`, connection layers in order.
    pub fn export(&self) -> (&[usize], &[f64]) {
        (&self.geometry, &self.coeffs)
    }

    /// Weight from neuron `source` of layer `layer` to neuron `target` of layer `layer + 1`.
    pub fn weight(&self, layer: usize, target: usize, source: usize) -> Option<f64> {
        let old_layer_size = *self.geometry.get(layer)?;
        let layer_size = *self.geometry.get(layer + 1)?;
        if target >= layer_size || source >= old_layer_size {
            return None;
        }
        Some(self.coeffs[self.coeff_offsets[layer] + target * (old_layer_size + 1) + source])
    }

    /// Bias of `neuron` in `layer`. Input layer biases are always zero.
    pub fn bias(&self, layer: usize, neuron: usize) -> Option<f64> {
        if neuron >= *self.geometry.get(layer)? {
            return None;
        }
        if layer == 0 {
            return Some(0.0);
        }
        let old_layer_size = self.geometry[layer - 1];
        Some(self.coeffs[self.coeff_offsets[layer - 1] + neuron * (old_layer_size + 1) + old_layer_size])
    }

    /// Activations of the output layer from the last forward pass.
    pub fn output(&self) -> &[f64] {
        &self.outputs[self.layer_offsets[self.geometry.len() - 1]..]
    }

    /// Activations of `layer` from the last forward pass.
    pub fn layer_outputs(&self, layer: usize) -> Option<&[f64]> {
        if layer >= self.geometry.len() {
            return None;
        }
        Some(&self.outputs[self.layer_offsets[layer]..self.layer_offsets[layer + 1]])
    }

    /// Derivatives of `layer`, only if the last forward pass requested gradients.
    pub fn derivatives(&self, layer: usize) -> Option<&Derivatives> {
        if !self.has_gradients || layer == 0 {
            return None;
        }
        self.derivatives.get(layer)
    }

    /// Neuron weighted sum.
    ///
    /// Implements the formula:
    /// `bias + (prev_activations . weights)`.
    ///
    /// # Arguments
    /// * `prev_layer_activations` - slice that holds activations of previous layer;
    /// * `coeffs` - slice that holds weights coefficients & bias (see `Net::coeffs` documentation).
    fn weighted_sum(prev_layer_activations: &[f64], coeffs: &[f64]) -> f64 {
        let (weights, bias) = coeffs.split_at(prev_layer_activations.len());
        weights
            .iter()
            .zip(prev_layer_activations.iter())
            .fold(bias[0], |sum, (w, a)| sum + w * a)
    }

    /// Forward pass shared by `Net::process` and `Trainer::train`. `inputs` must already be checked.
    ///
    /// Every layer's weighted sums and activations are stored; derivatives are stored only
    /// when `gradients` is set.
    pub(super) fn feed_forward(&mut self, inputs: &[f64], gradients: bool) {
        self.outputs[..self.geometry[0]].copy_from_slice(inputs);

        for i in 0..self.geometry.len() - 1 {
            let old_layer_size = self.geometry[i];
            let (start, end) = (self.layer_offsets[i + 1], self.layer_offsets[i + 2]);

            // [.. old activations][new activations ..]
            let (old_buffer, buffer) = self.outputs.split_at_mut(start);
            let old_activations = &old_buffer[self.layer_offsets[i]..];
            let activations = &mut buffer[..end - start];
            let sums = &mut self.sums[start..end];

            let layer_coeffs = &self.coeffs[self.coeff_offsets[i]..self.coeff_offsets[i + 1]];
            for (sum, neuron_coeffs) in sums.iter_mut().zip(layer_coeffs.chunks(old_layer_size + 1)) {
                *sum = Net::weighted_sum(old_activations, neuron_coeffs);
            }

            let derivatives = if gradients {
                Some(&mut self.derivatives[i + 1])
            } else {
                None
            };
            activate_into(self.functions[i + 1], &self.params, sums, activations, derivatives);
        }

        self.has_gradients = gradients;
    }

    /// Calculates output of the network using given input.
    ///
    /// The returned slice is the network's own output buffer; the next forward pass
    /// overwrites it.
    ///
    /// # Returns
    /// * `Ok(&[f64])` with activations of output neurons if amount of inputs is right;
    /// * `Err(ProcessError)` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use layernet::feedforward::Net;
    /// let mut net = Net::new(&[10, 20, 20, 3], true).unwrap();
    /// let outputs = net.process(&[1.0; 10]).unwrap();
    /// assert_eq!(outputs.len(), 3);
    /// ```
    pub fn process(&mut self, inputs: &[f64]) -> Result<&[f64], ProcessError> {
        if inputs.len() != self.geometry[0] {
            return Err(ProcessError::BadInputs(SizeMismatch {
                expected: self.geometry[0],
                got: inputs.len(),
            }));
        }

        self.feed_forward(inputs, false);
        Ok(self.output())
    }

    /// Calculates cost function of an output values given the desired values.
    /// Implements the formula:
    /// `Σ (output - desired)²`
    ///
    /// # Returns
    /// * `Ok(f64)` if `outputs` and `desired_outputs` have the same size;
    /// * `SizeMismatch` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use layernet::feedforward::Net;
    /// let outputs = [10.0; 1000];
    /// let desired_outputs = [10.25; 1000];
    /// let cost = Net::calc_cost(&outputs, &desired_outputs).unwrap();
    /// assert_eq!(cost, 62.5);
    /// ```
    pub fn calc_cost(outputs: &[f64], desired_outputs: &[f64]) -> Result<f64, SizeMismatch> {
        if outputs.len() != desired_outputs.len() {
            return Err(SizeMismatch {
                expected: outputs.len(),
                got: desired_outputs.len(),
            });
        };

        Ok(outputs
            .iter()
            .zip(desired_outputs.iter())
            .map(|(&a, &b)| (a - b) * (a - b))
            .sum())
    }

    /// Consumes `Net` and builds `Trainer` object containing it.
    /// See `Trainer`'s documentation for details.
    pub fn build_trainer(self) -> Trainer {
        Trainer::build(self)
    }
}

impl fmt::Display for Net {
    /// Human-readable dump of all weights and biases.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sizes: Vec<String> = self.geometry.iter().map(|n| format!("[{}]", n)).collect();
        writeln!(f, "{} layers: {}", self.geometry.len(), sizes.join(" "))?;

        let functions: Vec<&str> = self.functions.iter().map(|kind| kind.name()).collect();
        writeln!(f, "activations: {}", functions.join(" "))?;

        for i in 0..self.geometry.len() - 1 {
            for j in 0..self.geometry[i + 1] {
                for k in 0..self.geometry[i] {
                    if let Some(w) = self.weight(i, j, k) {
                        writeln!(f, "layer {} -> {}, neuron {} <- {}: weight = {}", i, i + 1, j, k, w)?;
                    }
                }
            }
        }

        for (i, &layer_size) in self.geometry.iter().enumerate() {
            for j in 0..layer_size {
                if let Some(b) = self.bias(i, j) {
                    writeln!(f, "layer {} neuron {}: bias = {}", i, j, b)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Net")
            .field("geometry", &self.geometry)
            .field("functions", &self.functions)
            .field("params", &self.params)
            .field("coeffs", &self.coeffs)
            .finish()
    }
}

fn check_geometry(geometry: &[usize]) -> Result<(), TopologyError> {
    if geometry.len() < 2 {
        return Err(TopologyError::TooFewLayers(geometry.len()));
    }
    if let Some(index) = geometry.iter().position(|&layer_size| layer_size == 0) {
        return Err(TopologyError::EmptyLayer { index });
    }
    Ok(())
}

/// Start of every connection layer in `Net::coeffs`, with the total count appended.
fn coeff_offsets(geometry: &[usize]) -> Box<[usize]> {
    let mut offsets = Vec::with_capacity(geometry.len());
    let mut coeffs_total = 0;
    offsets.push(coeffs_total);
    for pair in geometry.windows(2) {
        coeffs_total += pair[1] // Each of [layer_size] neurons has
            * (pair[0] + 1); // [old_layer_size] weights + 1 bias
        offsets.push(coeffs_total);
    }
    offsets.into_boxed_slice()
}

/// Error structure for `Net` constructors
#[derive(Debug, Error)]
pub enum NewNetError {
    #[error("Invalid topology: {0}")]
    InvalidTopology(#[from] TopologyError),

    #[error("Bad coefficients for the provided geometry: {0}")]
    BadCoefficients(SizeMismatch),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("Net must have at least two layers (input and output), but got geometry with len {0}!")]
    TooFewLayers(usize),

    #[error("Layer {index} must have at least one neuron!")]
    EmptyLayer { index: usize },
}

/// Error structure for `Net::set_activation`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid layer index {index}, net has {layer_count} layers!")]
pub struct InvalidLayerIndex {
    pub index: usize,
    pub layer_count: usize,
}

/// Error structure for `Net::process`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("Bad inputs: {0}")]
    BadInputs(SizeMismatch),
}

/// Error structure for collections size mismatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Expected {expected} values, but got {got}!")]
pub struct SizeMismatch {
    pub expected: usize,
    pub got: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedforward::SoftmaxDerivative;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn rejects_bad_topologies() {
        assert!(matches!(
            Net::new(&[3], false),
            Err(NewNetError::InvalidTopology(TopologyError::TooFewLayers(1)))
        ));
        assert!(matches!(
            Net::new(&[], true),
            Err(NewNetError::InvalidTopology(TopologyError::TooFewLayers(0)))
        ));
        assert!(matches!(
            Net::new(&[0, 2], false),
            Err(NewNetError::InvalidTopology(TopologyError::EmptyLayer { index: 0 }))
        ));
        assert!(matches!(
            Net::new(&[2, 4, 0], true),
            Err(NewNetError::InvalidTopology(TopologyError::EmptyLayer { index: 2 }))
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = NetConfig {
            init_low: 1.0,
            init_high: 1.0,
            ..NetConfig::default()
        };
        assert!(matches!(
            Net::with_config(&[1, 1], true, &config),
            Err(NewNetError::Config(ConfigError::InvalidRange { .. }))
        ));
    }

    #[test]
    fn overflowing_range_fails_before_sampling() {
        let config = NetConfig {
            init_low: -1e308,
            init_high: 1e308,
            ..NetConfig::default()
        };
        assert!(matches!(
            Net::with_config(&[2, 2], true, &config),
            Err(NewNetError::Config(ConfigError::InvalidRange { .. }))
        ));
    }

    #[test]
    fn configured_params_drive_activations() {
        let config = NetConfig {
            activation: ActivationParams {
                leaky_relu_alpha: 0.2,
                ..ActivationParams::default()
            },
            ..NetConfig::default()
        };
        let mut net = Net::with_coefficients(&[1, 1], vec![1.0, 0.0], &config).unwrap();
        assert_eq!(net.params().leaky_relu_alpha, 0.2);
        assert_eq!(net.params().softmax_derivative, SoftmaxDerivative::DiagonalApprox);

        net.set_activation(1, ActivationKind::LeakyReLU).unwrap();
        assert_relative_eq!(net.process(&[-5.0]).unwrap()[0], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn coefficient_count_matches_geometry() {
        let net = Net::new(&[3, 4, 2], false).unwrap();
        // 4 * (3 + 1) + 2 * (4 + 1)
        assert_eq!(net.export().1.len(), 26);

        let err = Net::with_coefficients(&[3, 4, 2], vec![0.0; 25], &NetConfig::default());
        assert!(matches!(
            err,
            Err(NewNetError::BadCoefficients(SizeMismatch { expected: 26, got: 25 }))
        ));
    }

    #[test]
    fn zero_net_outputs_half() {
        let mut net = Net::new(&[2, 3, 1], false).unwrap();
        assert_eq!(net.process(&[5.0, -3.0]).unwrap(), &[0.5]);

        let mut net = Net::new(&[4, 2, 3], false).unwrap();
        assert_eq!(net.process(&[1.0, 2.0, 3.0, 4.0]).unwrap(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn zero_nets_are_deterministic() {
        let mut a = Net::new(&[3, 5, 2], false).unwrap();
        let mut b = Net::new(&[3, 5, 2], false).unwrap();
        let input = [0.25, -1.5, 3.0];
        assert_eq!(a.process(&input).unwrap(), b.process(&input).unwrap());
    }

    #[test]
    fn linear_net_is_matrix_product() {
        // 2 -> 3 -> 1, no biases
        let coefficients = vec![
            1.0, 2.0, 0.0, //
            -1.0, 0.5, 0.0, //
            0.0, 3.0, 0.0, //
            1.0, 1.0, 1.0, 0.0,
        ];
        let mut net = Net::with_coefficients(&[2, 3, 1], coefficients, &NetConfig::default()).unwrap();
        for layer in 0..3 {
            net.set_activation(layer, ActivationKind::Linear).unwrap();
        }

        // hidden = [1 + 4, -1 + 1, 6] = [5, 0, 6]
        assert_eq!(net.process(&[1.0, 2.0]).unwrap(), &[11.0]);
        assert_eq!(net.layer_outputs(1).unwrap(), &[5.0, 0.0, 6.0]);
        assert_eq!(net.layer_outputs(0).unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn biases_are_added() {
        let coefficients = vec![2.0, 0.5, -1.0, 1.0];
        let mut net = Net::with_coefficients(&[1, 2], coefficients, &NetConfig::default()).unwrap();
        net.set_activation(1, ActivationKind::Linear).unwrap();
        assert_eq!(net.process(&[3.0]).unwrap(), &[6.5, -2.0]);
        assert_eq!(net.bias(1, 0), Some(0.5));
        assert_eq!(net.bias(1, 1), Some(1.0));
        assert_eq!(net.bias(0, 0), Some(0.0));
        assert_eq!(net.weight(0, 1, 0), Some(-1.0));
        assert_eq!(net.weight(0, 2, 0), None);
        assert_eq!(net.bias(2, 0), None);
    }

    #[test]
    fn process_checks_input_size() {
        let mut net = Net::new(&[2, 1], false).unwrap();
        assert_eq!(
            net.process(&[1.0]),
            Err(ProcessError::BadInputs(SizeMismatch { expected: 2, got: 1 }))
        );
    }

    #[test]
    fn set_activation_checks_index() {
        let mut net = Net::new(&[2, 3, 1], false).unwrap();
        assert_eq!(net.activation(2), Some(ActivationKind::Sigmoid));
        assert_eq!(
            net.set_activation(3, ActivationKind::ReLU),
            Err(InvalidLayerIndex {
                index: 3,
                layer_count: 3
            })
        );
        assert!(net.set_activation(usize::MAX, ActivationKind::ReLU).is_err());
        assert!(net.set_activation(0, ActivationKind::Tanh).is_ok());
        assert_eq!(net.activation(0), Some(ActivationKind::Tanh));
    }

    #[test]
    fn randomized_coefficients_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let net = Net::with_rng(&[5, 8, 8, 3], true, &NetConfig::default(), &mut rng).unwrap();

        let (_, coeffs) = net.export();
        assert!(coeffs.iter().all(|&c| (-0.5..0.5).contains(&c)));
        assert!(coeffs.iter().any(|&c| c != 0.0));

        for layer in 1..3 {
            assert!((0..8).any(|j| net.bias(layer, j) != Some(0.0)));
        }
        for j in 0..3 {
            assert_eq!(net.bias(3, j), Some(0.0));
        }
    }

    #[test]
    fn output_biases_randomized_when_configured() {
        let config = NetConfig {
            randomize_output_biases: true,
            ..NetConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let net = Net::with_rng(&[2, 16], true, &config, &mut rng).unwrap();
        assert!((0..16).any(|j| net.bias(1, j) != Some(0.0)));
    }

    #[test]
    fn derivatives_only_after_gradient_pass() {
        let mut net = Net::new(&[2, 2], false).unwrap();
        net.process(&[1.0, 1.0]).unwrap();
        assert!(net.derivatives(1).is_none());

        net.feed_forward(&[1.0, 1.0], true);
        let derivatives = net.derivatives(1).unwrap();
        assert_eq!(derivatives.values(), &[0.25, 0.25]);
        assert!(net.derivatives(0).is_none());

        net.process(&[1.0, 1.0]).unwrap();
        assert!(net.derivatives(1).is_none());
    }

    #[test]
    fn softmax_output_layer() {
        let config = NetConfig {
            activation: ActivationParams {
                softmax_derivative: SoftmaxDerivative::ExactJacobian,
                ..ActivationParams::default()
            },
            ..NetConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut net = Net::with_rng(&[3, 4, 3], true, &config, &mut rng).unwrap();
        net.set_activation(2, ActivationKind::SoftMax).unwrap();

        let sum: f64 = net.process(&[100.0, -50.0, 900.0]).unwrap().iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);

        net.feed_forward(&[0.1, 0.2, 0.3], true);
        assert!(matches!(net.derivatives(2), Some(Derivatives::Jacobian { size: 3, .. })));
    }

    #[test]
    fn display_lists_everything() {
        let net = Net::with_coefficients(&[1, 2], vec![0.5, 0.0, -0.25, 1.0], &NetConfig::default())
            .unwrap();
        let text = net.to_string();
        assert!(text.starts_with("2 layers: [1] [2]\n"));
        assert!(text.contains("activations: sigmoid sigmoid\n"));
        assert!(text.contains("layer 0 -> 1, neuron 1 <- 0: weight = -0.25\n"));
        assert!(text.contains("layer 0 neuron 0: bias = 0\n"));
        assert!(text.contains("layer 1 neuron 1: bias = 1\n"));
    }
}
