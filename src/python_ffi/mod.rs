//! Python FFI
use pyo3::prelude::*;

use crate::feedforward::{
    ConfigError, InvalidExample, InvalidLayerIndex, NewNetError, ProcessError, SizeMismatch,
    TrainError, UnknownActivation,
};

mod consumable;
pub mod feedforward;

macro_rules! impl_to_py_err {
    (for $($t:ty),+) => {
        $(impl From<$t> for PyErr {
            fn from(err: $t) -> Self {
                pyo3::exceptions::PyValueError::new_err(err.to_string())
            }
        })+
    }
}

impl_to_py_err!(
    for NewNetError,
    ConfigError,
    InvalidLayerIndex,
    ProcessError,
    TrainError,
    InvalidExample,
    SizeMismatch,
    UnknownActivation
);

#[pymodule]
fn layernet(_py: Python, m: &PyModule) -> PyResult<()> {
    feedforward::construct_module(m)?;
    Ok(())
}
