//! Error types for patch installation and logging setup

use crate::hooks::Stage;
use pyo3::exceptions::{PyRuntimeError, PyTypeError, PyValueError};
use pyo3::PyErr;

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("{destination} has no attribute '{attribute}'")]
    MissingAttribute {
        destination: String,
        attribute: String,
        #[source]
        source: PyErr,
    },

    #[error("{destination}.{attribute} is not callable")]
    NotCallable {
        destination: String,
        attribute: String,
    },

    #[error("{destination}.{attribute} is already patched")]
    AlreadyPatched {
        destination: String,
        attribute: String,
    },

    #[error("{0} hook is not callable")]
    HookNotCallable(Stage),

    #[error(transparent)]
    Python(#[from] PyErr),
}

impl From<PatchError> for PyErr {
    fn from(err: PatchError) -> PyErr {
        match err {
            // Keep the interpreter's own AttributeError
            PatchError::MissingAttribute { source, .. } => source,
            PatchError::Python(err) => err,
            err @ PatchError::NotCallable { .. } => PyTypeError::new_err(err.to_string()),
            err @ PatchError::HookNotCallable(_) => PyTypeError::new_err(err.to_string()),
            err @ PatchError::AlreadyPatched { .. } => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
}

impl From<LoggingError> for PyErr {
    fn from(err: LoggingError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
