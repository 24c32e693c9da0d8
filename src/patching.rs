//! Patch engine: replace a named callable with a hook-running wrapper
//!
//! The wrapper is a PyO3 class. On a namespace it behaves as a plain
//! function. On a class it is a descriptor, so `instance.fit(...)` binds
//! the instance exactly like the function it replaced, and a patched
//! `classmethod` receives whichever class it was looked up on.

use crate::error::PatchError;
use crate::hooks::{HookPair, Stage};
use crate::settings::{HookConfig, PatchSettings};
use pyo3::intern;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyTuple, PyType};

/// How the captured original expects to be invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Called as-is, no implicit first argument
    Plain,
    /// Instance method on a class: the instance is forwarded as `self`
    Method,
    /// `classmethod` on a class: the accessing class is forwarded as `cls`
    Class,
}

impl Binding {
    /// Pick the callable to capture and how the wrapper must bind it.
    ///
    /// `raw` is the attribute as stored in the class namespace, before any
    /// descriptor protocol ran.
    fn classify(
        destination: &Bound<'_, PyAny>,
        current: Bound<'_, PyAny>,
        raw: &Bound<'_, PyAny>,
    ) -> PyResult<(Py<PyAny>, Self)> {
        if !destination.is_instance_of::<PyType>() {
            return Ok((current.unbind(), Binding::Plain));
        }

        let py = destination.py();
        let builtins = py.import("builtins")?;
        if raw.is_instance(&builtins.getattr("classmethod")?)? {
            // Keep the bare function so every subclass gets its own `cls`
            let function = raw.getattr(intern!(py, "__func__"))?;
            return Ok((function.unbind(), Binding::Class));
        }
        if raw.is_instance(&builtins.getattr("staticmethod")?)? {
            return Ok((current.unbind(), Binding::Plain));
        }

        // Only descriptors bind on attribute access
        let binding = if raw.get_type().hasattr(intern!(py, "__get__"))? {
            Binding::Method
        } else {
            Binding::Plain
        };
        Ok((current.unbind(), binding))
    }
}

/// Attribute as stored on `destination`, skipping descriptor binding on classes.
fn raw_attribute<'py>(
    destination: &Bound<'py, PyAny>,
    name: &str,
    current: &Bound<'py, PyAny>,
) -> PyResult<Bound<'py, PyAny>> {
    if !destination.is_instance_of::<PyType>() {
        return Ok(current.clone());
    }
    destination
        .py()
        .import("inspect")?
        .getattr("getattr_static")?
        .call1((destination, name))
}

/// Whether `key` lives in `destination`'s own namespace, ignoring base classes.
fn owns_attribute(destination: &Bound<'_, PyAny>, key: &str) -> PyResult<bool> {
    let py = destination.py();
    match destination.getattr(intern!(py, "__dict__")) {
        Ok(namespace) => namespace.contains(key),
        Err(_) => destination.hasattr(key),
    }
}

/// Replacement callable installed by [`install_wrapper`].
#[pyclass(module = "mlnotify_hooks", frozen)]
pub struct PatchedCall {
    original: Py<PyAny>,
    hooks: HookPair,
    binding: Binding,
    label: String,
}

impl PatchedCall {
    pub fn binding(&self) -> Binding {
        self.binding
    }
}

#[pymethods]
impl PatchedCall {
    #[pyo3(signature = (*args, **kwargs))]
    fn __call__<'py>(
        &self,
        py: Python<'py>,
        args: &Bound<'py, PyTuple>,
        kwargs: Option<&Bound<'py, PyDict>>,
    ) -> PyResult<Py<PyAny>> {
        tracing::trace!(site = %self.label, "running patched call");

        self.hooks.run(py, Stage::Before)?;
        // A failing original skips the after hook and surfaces unchanged
        let result = self.original.bind(py).call(args, kwargs)?;
        self.hooks.run(py, Stage::After)?;

        Ok(result.unbind())
    }

    fn __get__<'py>(
        slf: Bound<'py, Self>,
        instance: Option<&Bound<'py, PyAny>>,
        owner: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<Bound<'py, PyAny>> {
        let instance = instance.filter(|instance| !instance.is_none()).cloned();
        let owner = owner.filter(|owner| !owner.is_none()).cloned();

        let receiver = match slf.get().binding {
            Binding::Plain => None,
            Binding::Method => instance,
            Binding::Class => owner.or_else(|| instance.map(|instance| instance.get_type().into_any())),
        };
        let Some(receiver) = receiver else {
            return Ok(slf.into_any());
        };

        let py = slf.py();
        py.import("types")?
            .getattr("MethodType")?
            .call1((slf, receiver))
    }

    #[getter(__wrapped__)]
    fn wrapped(&self, py: Python<'_>) -> Py<PyAny> {
        self.original.clone_ref(py)
    }

    fn __repr__(&self) -> String {
        format!("<patched {}>", self.label)
    }
}

/// Human-readable name of a patch destination
pub(crate) fn describe(obj: &Bound<'_, PyAny>) -> String {
    let py = obj.py();
    obj.getattr(intern!(py, "__name__"))
        .and_then(|name| name.extract::<String>())
        .or_else(|_| obj.get_type().name().map(|name| name.to_string()))
        .unwrap_or_else(|_| "<object>".to_string())
}

/// Replace `destination.<name>` with a wrapper around its current value.
///
/// Target-resolution failures are returned, never logged and dropped;
/// the caller decides whether to skip.
pub fn install_wrapper(
    destination: &Bound<'_, PyAny>,
    name: &str,
    hooks: &HookPair,
    settings: &PatchSettings,
) -> Result<(), PatchError> {
    let py = destination.py();
    let label = format!("{}.{}", describe(destination), name);

    let current = destination
        .getattr(name)
        .map_err(|source| PatchError::MissingAttribute {
            destination: describe(destination),
            attribute: name.to_string(),
            source,
        })?;

    let raw = raw_attribute(destination, name, &current)?;
    let previous = raw.cast::<PatchedCall>().ok().map(|wrapper| {
        let wrapper = wrapper.get();
        (wrapper.original.clone_ref(py), wrapper.binding)
    });

    let (original, binding) = match previous {
        Some(_) if !settings.allow_hit => {
            return Err(PatchError::AlreadyPatched {
                destination: describe(destination),
                attribute: name.to_string(),
            });
        }
        // Re-patching replaces the old wrapper instead of wrapping it
        Some(previous) => previous,
        None => {
            if !current.is_callable() {
                return Err(PatchError::NotCallable {
                    destination: describe(destination),
                    attribute: name.to_string(),
                });
            }
            Binding::classify(destination, current, &raw)?
        }
    };

    tracing::debug!(site = %label, ?binding, "installing wrapper");

    let stored = settings.store_hit.then(|| original.clone_ref(py));
    let wrapper = Bound::new(
        py,
        PatchedCall {
            original,
            hooks: hooks.clone_ref(py),
            binding,
            label,
        },
    )?;
    destination.setattr(name, wrapper)?;

    // Only the destination's own namespace counts; a base class may hold its own original
    if let Some(stored) = stored {
        let key = PatchSettings::original_attribute(name);
        if !owns_attribute(destination, &key)? {
            destination.setattr(key.as_str(), stored)?;
        }
    }

    Ok(())
}

/// Patch `destination.<name>` so `before()` and `after()` run around it
#[pyfunction]
pub fn patch(
    destination: &Bound<'_, PyAny>,
    name: &str,
    before: &Bound<'_, PyAny>,
    after: &Bound<'_, PyAny>,
) -> PyResult<()> {
    let hooks = HookPair::new(before, after)?;
    let config = HookConfig::from_env();
    install_wrapper(destination, name, &hooks, &config.patch)?;
    Ok(())
}
