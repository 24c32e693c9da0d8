#![allow(dead_code)]

use mlnotify_hooks::hooks::HookPair;
use pyo3::prelude::*;
use std::ffi::CString;

const RECORDER: &str = r#"
calls = {"before": 0, "after": 0, "order": []}

def before():
    calls["before"] += 1
    calls["order"].append("before")

def after():
    calls["after"] += 1
    calls["order"].append("after")

def failing():
    raise RuntimeError("hook failed")

def interrupting():
    raise KeyboardInterrupt()
"#;

/// Compile `code` as module `name` and register it in `sys.modules`.
pub fn stub_module<'py>(py: Python<'py>, name: &str, code: &str) -> Bound<'py, PyModule> {
    let module_name = CString::new(name).unwrap();
    let file_name = CString::new(format!("{name}.py")).unwrap();
    let code = CString::new(code).unwrap();

    let module = PyModule::from_code(py, &code, &file_name, &module_name).unwrap();
    py.import("sys")
        .unwrap()
        .getattr("modules")
        .unwrap()
        .set_item(name, &module)
        .unwrap();
    module
}

/// A module whose `before`/`after` functions count their calls.
pub fn recorder<'py>(py: Python<'py>, name: &str) -> Bound<'py, PyModule> {
    stub_module(py, name, RECORDER)
}

pub fn hooks(recorder: &Bound<'_, PyModule>, before: &str, after: &str) -> HookPair {
    HookPair::new(
        &recorder.getattr(before).unwrap(),
        &recorder.getattr(after).unwrap(),
    )
    .unwrap()
}

pub fn counting_hooks(recorder: &Bound<'_, PyModule>) -> HookPair {
    hooks(recorder, "before", "after")
}

pub fn count(recorder: &Bound<'_, PyModule>, stage: &str) -> usize {
    recorder
        .getattr("calls")
        .unwrap()
        .get_item(stage)
        .unwrap()
        .extract()
        .unwrap()
}

pub fn order(recorder: &Bound<'_, PyModule>) -> Vec<String> {
    recorder
        .getattr("calls")
        .unwrap()
        .get_item("order")
        .unwrap()
        .extract()
        .unwrap()
}

/// A module whose `Capture` handler records `(levelno, message)` from `logger`.
pub fn log_capture<'py>(py: Python<'py>, name: &str, logger: &str, level: u32) -> Bound<'py, PyModule> {
    let code = format!(
        r#"
import logging

records = []

class Capture(logging.Handler):
    def emit(self, record):
        records.append((record.levelno, record.getMessage()))

logger = logging.getLogger("{logger}")
logger.setLevel({level})
logger.propagate = False
logger.addHandler(Capture())
"#
    );
    stub_module(py, name, &code)
}

pub fn records(capture: &Bound<'_, PyModule>) -> Vec<(u32, String)> {
    capture.getattr("records").unwrap().extract().unwrap()
}
