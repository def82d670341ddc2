use pyo3::prelude::*;

use super::net::Net;
use crate::feedforward::{TrainingExample, Trainer as InnerTrainer};
use crate::python_ffi::consumable::Consumable;

#[pyclass]
pub struct Trainer {
    pub(super) trainer: Consumable<InnerTrainer>,
}

impl Trainer {
    pub(super) fn wrap(trainer: InnerTrainer) -> Self {
        Self {
            trainer: Consumable::acquire(trainer, "Trainer"),
        }
    }
}

#[pymethods]
impl Trainer {
    pub fn geometry(&self) -> PyResult<Vec<usize>> {
        Ok(self.trainer.get()?.net_ref().geometry().to_vec())
    }

    pub fn export_net(&self) -> PyResult<(Vec<usize>, Vec<f64>)> {
        let (geometry, coeffs) = self.trainer.get()?.net_ref().export();
        Ok((geometry.to_owned(), coeffs.to_owned()))
    }

    pub fn render(&self) -> PyResult<String> {
        Ok(self.trainer.get()?.net_ref().to_string())
    }

    pub fn steps(&self) -> PyResult<usize> {
        Ok(self.trainer.get()?.steps())
    }

    pub fn process(&mut self, inputs: Vec<f64>) -> PyResult<Vec<f64>> {
        Ok(self.trainer.get_mut()?.net_mut().process(&inputs)?.to_vec())
    }

    /// One backpropagation step; returns the signed sum of output residuals.
    pub fn train(&mut self, inputs: Vec<f64>, targets: Vec<f64>, learning_rate: f64) -> PyResult<f64> {
        let example = TrainingExample::new(inputs, targets)?;
        Ok(self.trainer.get_mut()?.train(&example, learning_rate)?)
    }

    /// One step per `(inputs, targets)` sample, in order; returns the mean of the step results.
    pub fn train_epoch(
        &mut self,
        samples: Vec<(Vec<f64>, Vec<f64>)>,
        learning_rate: f64,
    ) -> PyResult<f64> {
        let examples = samples
            .into_iter()
            .map(|(inputs, targets)| TrainingExample::new(inputs, targets))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.trainer.get_mut()?.train_epoch(&examples, learning_rate)?)
    }

    pub fn teardown(&mut self) -> PyResult<Net> {
        Ok(Net::wrap(self.trainer.release()?.teardown()))
    }
}
