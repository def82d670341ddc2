use log::{debug, trace};
use thiserror::Error;

use super::example::TrainingExample;
use super::net::{Net, SizeMismatch};

/// Net trainer structure.
///
/// To train Net, additional buffers are needed. We will contain them in this structure.
/// Training procedure will look like this:
/// * One allocates additional buffers by calling `Net::build_trainer`, which will consume `Net`
/// and return `Trainer` object.
/// * Every call to `Trainer::train` is one stochastic gradient descent step on one example;
/// parameters are updated before it returns. `Trainer::train_epoch` does this for a whole
/// slice of examples, in order.
/// Also, at any time one can call `Trainer::net_mut` to get access to `Net::process`.
/// * Once finished training, one can use `Trainer::teardown` to free the additional buffers
/// and get `Net` object back.
pub struct Trainer {
    /// The network object trainer posesses.
    pub(crate) net: Net,

    /// Hidden errors of all layers, same layout as the net's activations:
    /// `errors = [layer_0][layer_1] ... [layer_N]`
    pub(crate) errors: Box<[f64]>,

    /// Local gradients (`derivative * error`) of the layer being updated.
    /// Sized to the biggest layer.
    pub(crate) deltas: Box<[f64]>,

    /// Number of steps done so far.
    pub(crate) steps: usize,
}

impl Trainer {
    /// Consumes `Net` and builds `Trainer` object containing it.
    pub(super) fn build(net: Net) -> Trainer {
        let max_layer_size = net.geometry.iter().copied().max().unwrap_or(0);

        Trainer {
            errors: vec![0.0; net.outputs.len()].into_boxed_slice(),
            deltas: vec![0.0; max_layer_size].into_boxed_slice(),
            net,
            steps: 0,
        }
    }

    /// Returns reference to contained `Net`.
    pub fn net_ref(&self) -> &Net {
        &self.net
    }

    /// Returns mutable reference to contained `Net`, allowing the use of `Net::process`.
    pub fn net_mut(&mut self) -> &mut Net {
        &mut self.net
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Performs one backpropagation step on a given example, updating the net's coefficients.
    ///
    /// # Arguments
    /// * `example` - input and desired output, sized for the net;
    /// * `learning_rate` - gradient multiplier, not checked.
    ///
    /// # Returns
    /// * The sum of the output residuals `output - target`. It is signed and not squared, so
    /// positive and negative residuals cancel out; use `Net::calc_cost` to monitor convergence.
    /// * `Err(TrainError)` if the example does not fit the net. Nothing is updated then.
    ///
    /// # Examples
    /// ```
    /// # use layernet::feedforward::{Net, TrainingExample};
    /// let mut trainer = Net::new(&[2, 3, 1], false).unwrap().build_trainer();
    /// let example = TrainingExample::new(vec![1.0, 0.0], vec![0.25]).unwrap();
    /// let error = trainer.train(&example, 0.1).unwrap();
    /// assert_eq!(error, 0.25);
    /// ```
    pub fn train(&mut self, example: &TrainingExample, learning_rate: f64) -> Result<f64, TrainError> {
        let (input_count, output_count) = (self.net.input_count(), self.net.output_count());

        if example.input().len() != input_count {
            return Err(TrainError::BadInputs(SizeMismatch {
                expected: input_count,
                got: example.input().len(),
            }));
        }
        if example.target().len() != output_count {
            return Err(TrainError::BadTargets(SizeMismatch {
                expected: output_count,
                got: example.target().len(),
            }));
        }

        let total_error = self.backpropagate(example.input(), example.target(), learning_rate);
        self.steps += 1;

        trace!("step {}: error={}", self.steps, total_error);
        Ok(total_error)
    }

    /// Forward pass with gradients, then one backward sweep updating every connection layer.
    /// Sizes must already be checked.
    fn backpropagate(&mut self, inputs: &[f64], targets: &[f64], learning_rate: f64) -> f64 {
        self.net.feed_forward(inputs, true);

        let net = &mut self.net;
        let layers_count = net.geometry.len();

        // Output layer error is the plain residual
        let outputs_start = net.layer_offsets[layers_count - 1];
        let mut total_error = 0.0;
        for ((e, &o), &t) in self.errors[outputs_start..]
            .iter_mut()
            .zip(net.outputs[outputs_start..].iter())
            .zip(targets.iter())
        {
            *e = o - t;
            total_error += *e;
        }

        // For each connection layer in reverse: layer i -> layer i + 1
        for i in (0..layers_count - 1).rev() {
            let old_layer_size = net.geometry[i];
            let layer_size = net.geometry[i + 1];
            let (start, end) = (net.layer_offsets[i], net.layer_offsets[i + 1]);

            // [.. old errors][new errors ..]
            let (old_errors, new_errors) = self.errors.split_at_mut(end);
            let old_errors = &mut old_errors[start..];
            let new_errors = &new_errors[..layer_size];
            let deltas = &mut self.deltas[..layer_size];

            net.derivatives[i + 1].chain(new_errors, deltas);

            let layer_coeffs = &mut net.coeffs[net.coeff_offsets[i]..net.coeff_offsets[i + 1]];

            // Errors of layer i have to see the weights before this layer's update
            for e in old_errors.iter_mut() {
                *e = 0.0;
            }
            for (neuron_coeffs, &delta) in layer_coeffs.chunks(old_layer_size + 1).zip(deltas.iter()) {
                for (e, &w) in old_errors.iter_mut().zip(neuron_coeffs[..old_layer_size].iter()) {
                    *e += w * delta;
                }
            }

            let old_activations = &net.outputs[start..end];
            for (neuron_coeffs, &delta) in layer_coeffs
                .chunks_mut(old_layer_size + 1)
                .zip(deltas.iter())
            {
                let (weights, bias) = neuron_coeffs.split_at_mut(old_layer_size);
                for (w, &a) in weights.iter_mut().zip(old_activations.iter()) {
                    *w -= learning_rate * delta * a;
                }
                bias[0] -= learning_rate * delta;
            }
        }

        total_error
    }

    /// Performs `Trainer::train` for every example, in order.
    ///
    /// All examples are checked against the net before the first step, so a bad example
    /// leaves the net untouched.
    ///
    /// # Returns
    /// * The average of the values returned by `Trainer::train` (`0.0` for no examples);
    /// * `Err(TrainError)` if any example does not fit the net.
    pub fn train_epoch(
        &mut self,
        examples: &[TrainingExample],
        learning_rate: f64,
    ) -> Result<f64, TrainError> {
        let (input_count, output_count) = (self.net.input_count(), self.net.output_count());

        for (index, example) in examples.iter().enumerate() {
            if example.input().len() != input_count {
                return Err(TrainError::WrongSampleInputs {
                    index,
                    expected: input_count,
                    got: example.input().len(),
                });
            }
            if example.target().len() != output_count {
                return Err(TrainError::WrongSampleTargets {
                    index,
                    expected: output_count,
                    got: example.target().len(),
                });
            }
        }

        if examples.is_empty() {
            return Ok(0.0);
        }

        let mut errors_sum = 0.0;
        for example in examples {
            errors_sum += self.backpropagate(example.input(), example.target(), learning_rate);
            self.steps += 1;
        }
        let mean_error = errors_sum / examples.len() as f64;

        debug!(
            "epoch done: examples={} steps={} mean_error={}",
            examples.len(),
            self.steps,
            mean_error
        );
        Ok(mean_error)
    }

    /// Frees training buffers, consuming `Trainer` object, and returns contained `Net` back.
    pub fn teardown(self) -> Net {
        self.net
    }
}

/// Error structure for `Trainer::train` and `Trainer::train_epoch`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrainError {
    #[error("Bad inputs: {0}")]
    BadInputs(SizeMismatch),

    #[error("Bad targets: {0}")]
    BadTargets(SizeMismatch),

    #[error("Expected {expected} input(s), but examples[{index}] got {got}!")]
    WrongSampleInputs {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("Expected {expected} target(s), but examples[{index}] got {got}!")]
    WrongSampleTargets {
        index: usize,
        expected: usize,
        got: usize,
    },
}
