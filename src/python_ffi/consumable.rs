use pyo3::{exceptions::PyRuntimeError, PyErr, PyResult};

/// Python object wrapper around a value that can be moved out exactly once,
/// e.g. a `Net` consumed by `build_trainer`.
pub(super) struct Consumable<T> {
    obj: Option<T>,
    name: &'static str,
}

impl<T> Consumable<T> {
    pub(super) fn acquire(obj: T, name: &'static str) -> Self {
        Self {
            obj: Some(obj),
            name,
        }
    }

    pub(super) fn get(&self) -> PyResult<&T> {
        let name = self.name;
        self.obj.as_ref().ok_or_else(|| consumed(name))
    }

    pub(super) fn get_mut(&mut self) -> PyResult<&mut T> {
        let name = self.name;
        self.obj.as_mut().ok_or_else(|| consumed(name))
    }

    pub(super) fn release(&mut self) -> PyResult<T> {
        let name = self.name;
        self.obj.take().ok_or_else(|| consumed(name))
    }
}

fn consumed(name: &str) -> PyErr {
    PyRuntimeError::new_err(format!(
        "This {} object is consumed and cannot be used",
        name
    ))
}
