//! Tracing layer that hands diagnostics to Python's `logging`.
//!
//! ```text
//! tracing::debug!(integration = "xgboost", "could not import integration")
//!        |
//!        v
//!   tracing_subscriber::registry()
//!        |
//!        +-- EnvFilter (MLNOTIFY_LOG, default mlnotify_hooks=debug)
//!        |
//!        \-- PythonLogLayer
//!                \-- logging.getLogger("mlnotify").log(10, ...)
//! ```
//!
//! The host application decides what is shown by configuring the
//! `mlnotify` logger; this module never writes to stdout or stderr.

use crate::error::LoggingError;
use crate::settings::{DEFAULT_LOG_DIRECTIVES, LOGGER_NAME, LOG_ENV};
use pyo3::prelude::*;
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Numeric level understood by Python's `logging` module
pub fn python_level(level: Level) -> i32 {
    match level {
        Level::TRACE => 5,
        Level::DEBUG => 10,
        Level::INFO => 20,
        Level::WARN => 30,
        _ => 40,
    }
}

/// Collects an event's message and fields into one line.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }

    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}

/// Forwards every event to a named Python logger.
pub struct PythonLogLayer {
    logger: &'static str,
}

impl PythonLogLayer {
    pub fn new(logger: &'static str) -> Self {
        Self { logger }
    }

    fn emit(&self, py: Python<'_>, level: i32, line: &str) -> PyResult<()> {
        let logger = py.import("logging")?.getattr("getLogger")?.call1((self.logger,))?;
        if logger.call_method1("isEnabledFor", (level,))?.is_truthy()? {
            logger.call_method1("log", (level, line))?;
        }
        Ok(())
    }
}

impl<S: Subscriber> Layer<S> for PythonLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = visitor.finish();
        let level = python_level(*event.metadata().level());

        Python::attach(|py| {
            // Logging must not raise into the instrumented call
            let _ = self.emit(py, level, &line);
        });
    }
}

fn filter(directives: Option<&str>) -> Result<EnvFilter, LoggingError> {
    match directives {
        Some(directives) => Ok(EnvFilter::try_new(directives)?),
        None => Ok(EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))),
    }
}

/// Install the global subscriber. Returns `false` when one already exists.
pub fn try_init(directives: Option<&str>) -> Result<bool, LoggingError> {
    let installed = tracing_subscriber::registry()
        .with(filter(directives)?)
        .with(PythonLogLayer::new(LOGGER_NAME))
        .try_init()
        .is_ok();
    Ok(installed)
}
