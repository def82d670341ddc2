use pyo3::{exceptions::PyValueError, prelude::*};
use std::convert::TryFrom;

use super::trainer::Trainer;
use crate::feedforward::{ActivationKind, Net as InnerNet, NetConfig};
use crate::python_ffi::consumable::Consumable;

#[pyclass]
pub struct Net {
    pub(super) net: Consumable<InnerNet>,
}

impl Net {
    pub(super) fn wrap(net: InnerNet) -> Self {
        Self {
            net: Consumable::acquire(net, "Net"),
        }
    }
}

#[pymethods]
impl Net {
    #[new]
    pub fn new(geometry: Vec<usize>, randomize: bool) -> PyResult<Self> {
        Ok(Net::wrap(InnerNet::new(&geometry, randomize)?))
    }

    /// Same as the constructor, with a JSON `NetConfig` document.
    #[staticmethod]
    pub fn with_config(geometry: Vec<usize>, randomize: bool, config: &str) -> PyResult<Self> {
        let config = NetConfig::from_json(config)?;
        Ok(Net::wrap(InnerNet::with_config(&geometry, randomize, &config)?))
    }

    #[staticmethod]
    pub fn from_coefficients(geometry: Vec<usize>, coefficients: Vec<f64>) -> PyResult<Self> {
        let net = InnerNet::with_coefficients(&geometry, coefficients, &NetConfig::default())?;
        Ok(Net::wrap(net))
    }

    pub fn geometry(&self) -> PyResult<Vec<usize>> {
        Ok(self.net.get()?.geometry().to_vec())
    }

    pub fn activations(&self) -> PyResult<Vec<String>> {
        let net = self.net.get()?;
        Ok((0..net.layer_count())
            .filter_map(|layer| net.activation(layer))
            .map(|kind| kind.to_string())
            .collect())
    }

    pub fn set_activation(&mut self, layer: i64, kind: &str) -> PyResult<()> {
        let kind: ActivationKind = kind.parse()?;
        let net = self.net.get_mut()?;
        let layer = usize::try_from(layer).map_err(|_| {
            PyValueError::new_err(format!(
                "Invalid layer index {}, net has {} layers!",
                layer,
                net.layer_count()
            ))
        })?;
        Ok(net.set_activation(layer, kind)?)
    }

    pub fn export(&self) -> PyResult<(Vec<usize>, Vec<f64>)> {
        let (geometry, coeffs) = self.net.get()?.export();
        Ok((geometry.to_owned(), coeffs.to_owned()))
    }

    pub fn process(&mut self, inputs: Vec<f64>) -> PyResult<Vec<f64>> {
        Ok(self.net.get_mut()?.process(&inputs)?.to_vec())
    }

    pub fn render(&self) -> PyResult<String> {
        Ok(self.net.get()?.to_string())
    }

    pub fn build_trainer(&mut self) -> PyResult<Trainer> {
        Ok(Trainer::wrap(self.net.release()?.build_trainer()))
    }

    #[staticmethod]
    pub fn calc_cost(outputs: Vec<f64>, desired_outputs: Vec<f64>) -> PyResult<f64> {
        Ok(InnerNet::calc_cost(&outputs, &desired_outputs)?)
    }
}
