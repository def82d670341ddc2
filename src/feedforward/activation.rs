use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Slope of `LeakyReLU` for negative inputs, unless configured otherwise.
pub const DEFAULT_LEAKY_RELU_ALPHA: f64 = 0.01;

/// Activation function applied to every neuron of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationKind {
    #[serde(rename = "sigmoid")]
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "tanh")]
    Tanh,
    #[serde(rename = "leaky_relu")]
    LeakyReLU,
    #[serde(rename = "linear")]
    Linear,
    #[serde(rename = "softmax")]
    SoftMax,
}

impl ActivationKind {
    pub const ALL: [ActivationKind; 6] = [
        ActivationKind::Sigmoid,
        ActivationKind::ReLU,
        ActivationKind::Tanh,
        ActivationKind::LeakyReLU,
        ActivationKind::Linear,
        ActivationKind::SoftMax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActivationKind::Sigmoid => "sigmoid",
            ActivationKind::ReLU => "relu",
            ActivationKind::Tanh => "tanh",
            ActivationKind::LeakyReLU => "leaky_relu",
            ActivationKind::Linear => "linear",
            ActivationKind::SoftMax => "softmax",
        }
    }
}

impl Default for ActivationKind {
    fn default() -> Self {
        ActivationKind::Sigmoid
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationKind {
    type Err = UnknownActivation;

    /// Parses the snake_case name, ignoring case (`"LeakyReLU"` is accepted too).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "");
        ActivationKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().replace('_', "") == normalized)
            .ok_or_else(|| UnknownActivation(s.to_owned()))
    }
}

/// How the `SoftMax` derivative is exposed to backpropagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftmaxDerivative {
    /// Only the diagonal term `a_i * (1 - a_i)`, as an elementwise vector.
    ///
    /// This is an approximation: the cross terms `-a_i * a_j` of the true Jacobian are dropped,
    /// so only the diagonal is exact. Backpropagation treats it like the derivative vector of
    /// any other kind.
    DiagonalApprox,
    /// Full Jacobian `a_i * (δ_ij - a_j)`. Backpropagation multiplies the error vector by it.
    ExactJacobian,
}

impl Default for SoftmaxDerivative {
    fn default() -> Self {
        SoftmaxDerivative::DiagonalApprox
    }
}

/// Tunables shared by all layers of one network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationParams {
    pub leaky_relu_alpha: f64,
    pub softmax_derivative: SoftmaxDerivative,
}

impl Default for ActivationParams {
    fn default() -> Self {
        ActivationParams {
            leaky_relu_alpha: DEFAULT_LEAKY_RELU_ALPHA,
            softmax_derivative: SoftmaxDerivative::default(),
        }
    }
}

/// Derivatives of a layer's activations with respect to its weighted sums.
#[derive(Debug, Clone, PartialEq)]
pub enum Derivatives {
    /// `d a_i / d x_i` for every neuron.
    Elementwise(Box<[f64]>),
    /// Row-major `size x size` matrix of `d a_i / d x_j`.
    Jacobian { size: usize, values: Box<[f64]> },
}

impl Derivatives {
    /// Allocates a zeroed structure of the shape `kind` produces for a layer of `size` neurons.
    pub fn for_kind(kind: ActivationKind, params: &ActivationParams, size: usize) -> Derivatives {
        match (kind, params.softmax_derivative) {
            (ActivationKind::SoftMax, SoftmaxDerivative::ExactJacobian) => Derivatives::Jacobian {
                size,
                values: vec![0.0; size * size].into_boxed_slice(),
            },
            _ => Derivatives::Elementwise(vec![0.0; size].into_boxed_slice()),
        }
    }

    /// Number of neurons covered.
    pub fn len(&self) -> usize {
        match self {
            Derivatives::Elementwise(values) => values.len(),
            Derivatives::Jacobian { size, .. } => *size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw values: the vector, or the matrix in row-major order.
    pub fn values(&self) -> &[f64] {
        match self {
            Derivatives::Elementwise(values) => values,
            Derivatives::Jacobian { values, .. } => values,
        }
    }

    /// Chain rule through the activation: `deltas[j] = Σ_i (d a_i / d x_j) * errors[i]`.
    ///
    /// For the elementwise shape this is just `derivative[j] * errors[j]`.
    pub fn chain(&self, errors: &[f64], deltas: &mut [f64]) {
        match self {
            Derivatives::Elementwise(values) => {
                for ((delta, &d), &e) in deltas.iter_mut().zip(values.iter()).zip(errors.iter()) {
                    *delta = d * e;
                }
            }
            Derivatives::Jacobian { size, values } => {
                for (j, delta) in deltas[..*size].iter_mut().enumerate() {
                    *delta = errors[..*size]
                        .iter()
                        .enumerate()
                        .map(|(i, &e)| values[i * size + j] * e)
                        .sum();
                }
            }
        }
    }

    /// Stores an elementwise derivative. For the matrix shape it lands on the diagonal.
    fn fill_elementwise<F>(&mut self, input: &[f64], activations: &[f64], der: F)
    where
        F: Fn(f64, f64) -> f64,
    {
        match self {
            Derivatives::Elementwise(values) => {
                for ((d, &x), &a) in values.iter_mut().zip(input.iter()).zip(activations.iter()) {
                    *d = der(x, a);
                }
            }
            Derivatives::Jacobian { size, values } => {
                for v in values.iter_mut() {
                    *v = 0.0;
                }
                for (i, (&x, &a)) in input.iter().zip(activations.iter()).enumerate() {
                    values[i * *size + i] = der(x, a);
                }
            }
        }
    }
}

/// Result of the standalone `activate`.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub activations: Vec<f64>,
    pub derivatives: Option<Derivatives>,
}

/// Applies `kind` to a whole vector of weighted sums.
///
/// # Arguments
/// * `kind` - activation function;
/// * `params` - shared tunables (LeakyReLU slope, SoftMax derivative shape);
/// * `input` - weighted sums, must not be empty;
/// * `gradients` - whether derivatives should be computed too.
///
/// NaN and infinite inputs are not checked and propagate as IEEE-754 says.
///
/// # Examples
/// ```
/// # use layernet::feedforward::{activate, ActivationKind, ActivationParams};
/// let res = activate(ActivationKind::Sigmoid, &ActivationParams::default(), &[0.0], true).unwrap();
/// assert_eq!(res.activations, vec![0.5]);
/// assert_eq!(res.derivatives.unwrap().values(), &[0.25]);
/// ```
pub fn activate(
    kind: ActivationKind,
    params: &ActivationParams,
    input: &[f64],
    gradients: bool,
) -> Result<Activation, ActivationError> {
    if input.is_empty() {
        return Err(ActivationError::EmptyInput);
    }

    let mut activations = vec![0.0; input.len()];
    let mut derivatives = if gradients {
        Some(Derivatives::for_kind(kind, params, input.len()))
    } else {
        None
    };
    activate_into(kind, params, input, &mut activations, derivatives.as_mut());

    Ok(Activation {
        activations,
        derivatives,
    })
}

/// Same as `activate`, but writes into caller-owned buffers.
/// `activations` must have the length of `input`, and `derivatives` (if any) must cover it.
pub(crate) fn activate_into(
    kind: ActivationKind,
    params: &ActivationParams,
    input: &[f64],
    activations: &mut [f64],
    derivatives: Option<&mut Derivatives>,
) {
    match kind {
        ActivationKind::Sigmoid => {
            for (a, &x) in activations.iter_mut().zip(input.iter()) {
                *a = sigmoid(x);
            }
            if let Some(d) = derivatives {
                d.fill_elementwise(input, activations, |_, a| sigmoid_der_s(a));
            }
        }
        ActivationKind::ReLU => {
            for (a, &x) in activations.iter_mut().zip(input.iter()) {
                *a = x.max(0.0);
            }
            if let Some(d) = derivatives {
                d.fill_elementwise(input, activations, |x, _| if x >= 0.0 { 1.0 } else { 0.0 });
            }
        }
        ActivationKind::Tanh => {
            for (a, &x) in activations.iter_mut().zip(input.iter()) {
                *a = x.tanh();
            }
            if let Some(d) = derivatives {
                d.fill_elementwise(input, activations, |_, a| 1.0 - a * a);
            }
        }
        ActivationKind::LeakyReLU => {
            let alpha = params.leaky_relu_alpha;
            for (a, &x) in activations.iter_mut().zip(input.iter()) {
                *a = if x >= 0.0 { x } else { alpha * x };
            }
            if let Some(d) = derivatives {
                d.fill_elementwise(input, activations, |x, _| if x >= 0.0 { 1.0 } else { alpha });
            }
        }
        ActivationKind::Linear => {
            activations.copy_from_slice(input);
            if let Some(d) = derivatives {
                d.fill_elementwise(input, activations, |_, _| 1.0);
            }
        }
        ActivationKind::SoftMax => {
            softmax(input, activations);
            match derivatives {
                None => {}
                Some(Derivatives::Elementwise(values)) => {
                    for (d, &a) in values.iter_mut().zip(activations.iter()) {
                        *d = a * (1.0 - a);
                    }
                }
                Some(Derivatives::Jacobian { size, values }) => {
                    let size = *size;
                    for (i, &a_i) in activations.iter().enumerate() {
                        for (j, &a_j) in activations.iter().enumerate() {
                            let delta = if i == j { 1.0 } else { 0.0 };
                            values[i * size + j] = a_i * (delta - a_j);
                        }
                    }
                }
            }
        }
    }
}

/// Sigmoid function.
/// Implements the formula:
/// `1 / (1 + exp(-x))`.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative function, expressed in terms of sigmoid itself.
/// Implements the formula:
/// `s * (1 - s)`.
pub fn sigmoid_der_s(s: f64) -> f64 {
    s * (1.0 - s)
}

/// Max-shifted softmax, so `exp` never overflows and the sum is at least 1.
fn softmax(input: &[f64], outputs: &mut [f64]) {
    let max = input.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut sum = 0.0;
    for (o, &x) in outputs.iter_mut().zip(input.iter()) {
        *o = (x - max).exp();
        sum += *o;
    }
    for o in outputs.iter_mut() {
        *o /= sum;
    }
}

/// Error for `activate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    #[error("Activation input must not be empty!")]
    EmptyInput,
}

/// Error for parsing `ActivationKind`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown activation function {0:?}, expected one of sigmoid, relu, tanh, leaky_relu, linear, softmax!")]
pub struct UnknownActivation(pub String);
