//! Small supervised-learning engine: a layered feedforward network with per-layer
//! activation functions, trained by backpropagation with plain stochastic gradient descent.
//!
//! ```
//! use layernet::feedforward::{ActivationKind, Net, TrainingExample};
//!
//! let mut net = Net::new(&[2, 4, 1], true).unwrap();
//! net.set_activation(2, ActivationKind::Linear).unwrap();
//!
//! let mut trainer = net.build_trainer();
//! let example = TrainingExample::new(vec![0.5, -0.5], vec![1.0]).unwrap();
//! for _ in 0..100 {
//!     trainer.train(&example, 0.05).unwrap();
//! }
//! let prediction = trainer.net_mut().process(&[0.5, -0.5]).unwrap();
//! assert!((prediction[0] - 1.0).abs() < 0.1);
//! ```

pub mod feedforward;

#[cfg(feature = "python")]
pub mod python_ffi;
