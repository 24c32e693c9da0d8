//! The shared before/after hook pair

use crate::error::PatchError;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Before,
    After,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Before => f.write_str("before"),
            Stage::After => f.write_str("after"),
        }
    }
}

/// Two zero-argument callables run around every patched call.
///
/// One pair is shared by all wrappers installed in a run; each wrapper
/// holds its own strong reference to the same two objects.
#[derive(Debug)]
pub struct HookPair {
    before: Py<PyAny>,
    after: Py<PyAny>,
}

impl HookPair {
    pub fn new(before: &Bound<'_, PyAny>, after: &Bound<'_, PyAny>) -> Result<Self, PatchError> {
        if !before.is_callable() {
            return Err(PatchError::HookNotCallable(Stage::Before));
        }
        if !after.is_callable() {
            return Err(PatchError::HookNotCallable(Stage::After));
        }

        Ok(Self {
            before: before.clone().unbind(),
            after: after.clone().unbind(),
        })
    }

    pub fn clone_ref(&self, py: Python<'_>) -> Self {
        Self {
            before: self.before.clone_ref(py),
            after: self.after.clone_ref(py),
        }
    }

    pub fn hook<'py>(&self, py: Python<'py>, stage: Stage) -> &Bound<'py, PyAny> {
        match stage {
            Stage::Before => self.before.bind(py),
            Stage::After => self.after.bind(py),
        }
    }

    /// Run one hook, absorbing any `Exception` it raises.
    ///
    /// Only `BaseException`-only errors (KeyboardInterrupt, SystemExit)
    /// come back as `Err`.
    pub fn run(&self, py: Python<'_>, stage: Stage) -> PyResult<()> {
        match self.hook(py, stage).call0() {
            Ok(_) => Ok(()),
            Err(err) if err.is_instance_of::<PyException>(py) => {
                tracing::debug!(%stage, error = %err, "failed to run hook function");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
