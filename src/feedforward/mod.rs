//! Fully connected feedforward network trained by per-example backpropagation

mod activation;
mod config;
mod example;
mod net;
mod trainer;

pub use activation::*;
pub use config::*;
pub use example::*;
pub use net::*;
pub use trainer::*;
