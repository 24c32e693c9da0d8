//! mlnotify hooks - train start/finish interception for Python ML libraries
//!
//! Replaces training entry points (`xgboost.train`, `keras.Model.fit`,
//! scikit-learn `fit` methods, ...) with wrappers that call a shared
//! before/after hook pair around the original call.

pub mod error;
pub mod hooks;
pub mod integrations;
pub mod logging;
pub mod patching;
pub mod settings;

use pyo3::prelude::*;

/// Main module
#[pymodule]
fn mlnotify_hooks(m: &Bound<'_, PyModule>) -> PyResult<()> {
    logging::try_init(None)?;

    m.add_function(wrap_pyfunction!(patching::patch, m)?)?;
    m.add_function(wrap_pyfunction!(integrations::apply_hooks, m)?)?;
    m.add_class::<patching::PatchedCall>()?;

    // Version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
