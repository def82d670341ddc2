use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use thiserror::Error;

/// One `(input, target)` pair for a single backpropagation step.
///
/// Both vectors are non-empty and hold only finite values; this is checked once, when the
/// example is built (or deserialized), so training never sees invalid data.
///
/// Serialized form uses the field names `Input` and `Target`:
/// ```json
/// { "Input": [0.1, 0.2], "Target": [0.9] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExample")]
pub struct TrainingExample {
    #[serde(rename = "Input")]
    input: Box<[f64]>,
    #[serde(rename = "Target")]
    target: Box<[f64]>,
}

impl TrainingExample {
    /// # Examples
    /// ```
    /// # use layernet::feedforward::{InvalidExample, TrainingExample};
    /// let example = TrainingExample::new(vec![0.1, 0.2], vec![0.9]).unwrap();
    /// assert_eq!(example.target(), &[0.9]);
    ///
    /// let err = TrainingExample::new(vec![f64::NAN], vec![0.9]).unwrap_err();
    /// assert_eq!(err, InvalidExample::NonFiniteInput { index: 0 });
    /// ```
    pub fn new<I, T>(input: I, target: T) -> Result<TrainingExample, InvalidExample>
    where
        I: Into<Box<[f64]>>,
        T: Into<Box<[f64]>>,
    {
        let (input, target) = (input.into(), target.into());

        if input.is_empty() {
            return Err(InvalidExample::EmptyInput);
        }
        if target.is_empty() {
            return Err(InvalidExample::EmptyTarget);
        }
        if let Some(index) = input.iter().position(|x| !x.is_finite()) {
            return Err(InvalidExample::NonFiniteInput { index });
        }
        if let Some(index) = target.iter().position(|x| !x.is_finite()) {
            return Err(InvalidExample::NonFiniteTarget { index });
        }

        Ok(TrainingExample { input, target })
    }

    pub fn input(&self) -> &[f64] {
        &self.input
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }
}

/// Unchecked wire shape, validated into `TrainingExample`.
#[derive(Deserialize)]
struct RawExample {
    #[serde(rename = "Input")]
    input: Vec<f64>,
    #[serde(rename = "Target")]
    target: Vec<f64>,
}

impl TryFrom<RawExample> for TrainingExample {
    type Error = InvalidExample;

    fn try_from(raw: RawExample) -> Result<Self, Self::Error> {
        TrainingExample::new(raw.input, raw.target)
    }
}

/// Error structure for `TrainingExample::new`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidExample {
    #[error("Training input must not be empty!")]
    EmptyInput,
    #[error("Training target must not be empty!")]
    EmptyTarget,
    #[error("Training input[{index}] is NaN or infinite!")]
    NonFiniteInput { index: usize },
    #[error("Training target[{index}] is NaN or infinite!")]
    NonFiniteTarget { index: usize },
}
