//! Hook orchestrator: best-effort patching of optional ML libraries
//!
//! Each group is resolved independently. A missing package skips its
//! group, a missing attribute skips that one site, and nothing escapes
//! to the caller except the returned [`InstallReport`].

use crate::error::PatchError;
use crate::hooks::HookPair;
use crate::patching::{describe, install_wrapper};
use crate::settings::HookConfig;
use pyo3::prelude::*;
use std::fmt;

/// One attribute to patch, addressed from a group's package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSite {
    /// Dotted attribute path below the package; empty for the package itself.
    pub path: &'static str,
    pub attribute: &'static str,
}

impl PatchSite {
    pub const fn new(path: &'static str, attribute: &'static str) -> Self {
        Self { path, attribute }
    }

    /// Walk `path` from the package to the object that owns `attribute`.
    pub fn destination<'py>(&self, package: &Bound<'py, PyModule>) -> Result<Bound<'py, PyAny>, PatchError> {
        let mut current = package.clone().into_any();
        for segment in self.path.split('.').filter(|segment| !segment.is_empty()) {
            current = current
                .getattr(segment)
                .map_err(|source| PatchError::MissingAttribute {
                    destination: describe(&current),
                    attribute: segment.to_string(),
                    source,
                })?;
        }
        Ok(current)
    }
}

/// An optional third-party library and the sites patched inside it.
#[derive(Debug)]
pub struct IntegrationGroup {
    pub name: &'static str,
    pub package: &'static str,
    /// Imported before the package so their attributes exist on it.
    pub submodules: &'static [&'static str],
    pub sites: &'static [PatchSite],
    /// Tried when this group is unavailable or a site fails.
    pub fallback: Option<&'static IntegrationGroup>,
}

/// Outcome of importing a group's package
pub enum Resolution<'py> {
    Available(Bound<'py, PyModule>),
    Unavailable(PyErr),
}

impl IntegrationGroup {
    pub fn resolve<'py>(&self, py: Python<'py>) -> Resolution<'py> {
        let imported = self
            .submodules
            .iter()
            .try_for_each(|module| py.import(*module).map(drop))
            .and_then(|()| py.import(self.package));

        match imported {
            Ok(package) => Resolution::Available(package),
            Err(err) => Resolution::Unavailable(err),
        }
    }

    pub fn site_label(&self, site: &PatchSite) -> String {
        SiteLabel {
            package: self.package,
            site,
        }
        .to_string()
    }
}

struct SiteLabel<'a> {
    package: &'static str,
    site: &'a PatchSite,
}

impl fmt::Display for SiteLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.package)?;
        if !self.site.path.is_empty() {
            write!(f, ".{}", self.site.path)?;
        }
        write!(f, ".{}", self.site.attribute)
    }
}

/// What a run of the orchestrator did
#[derive(Debug, Default, Clone)]
pub struct InstallReport {
    pub patched: Vec<String>,
    pub failed: Vec<String>,
    pub unavailable: Vec<&'static str>,
    pub disabled: Vec<&'static str>,
}

const KERAS: IntegrationGroup = IntegrationGroup {
    name: "keras",
    package: "keras",
    submodules: &[],
    sites: &[
        PatchSite::new("Model", "fit"),
        PatchSite::new("Model", "train_on_batch"),
    ],
    fallback: None,
};

/// Built-in integrations, in the order they are attempted.
pub static CATALOG: &[IntegrationGroup] = &[
    IntegrationGroup {
        name: "lightgbm",
        package: "lightgbm",
        submodules: &[],
        sites: &[PatchSite::new("", "train"), PatchSite::new("sklearn", "train")],
        fallback: None,
    },
    IntegrationGroup {
        name: "xgboost",
        package: "xgboost",
        submodules: &[],
        sites: &[PatchSite::new("", "train"), PatchSite::new("sklearn", "train")],
        fallback: None,
    },
    IntegrationGroup {
        name: "tensorflow.keras",
        package: "tensorflow",
        submodules: &[],
        sites: &[
            PatchSite::new("keras.Model", "fit"),
            PatchSite::new("keras.Model", "train_on_batch"),
        ],
        fallback: Some(&KERAS),
    },
    IntegrationGroup {
        name: "sklearn",
        package: "sklearn",
        submodules: &["sklearn.svm", "sklearn.tree"],
        sites: &[
            PatchSite::new("svm.SVC", "fit"),
            PatchSite::new("svm.SVR", "fit"),
            PatchSite::new("svm.OneClassSVM", "fit"),
            PatchSite::new("svm.NuSVC", "fit"),
            PatchSite::new("svm.NuSVR", "fit"),
            PatchSite::new("svm.LinearSVR", "fit"),
            PatchSite::new("svm.LinearSVC", "fit"),
            PatchSite::new("tree.DecisionTreeClassifier", "fit"),
            PatchSite::new("tree.DecisionTreeRegressor", "fit"),
        ],
        fallback: None,
    },
];

/// Install one group; returns whether every site was patched.
fn install_group(
    py: Python<'_>,
    group: &'static IntegrationGroup,
    hooks: &HookPair,
    config: &HookConfig,
    report: &mut InstallReport,
) -> bool {
    if config.is_disabled(group.name) {
        tracing::debug!(integration = group.name, "integration disabled by configuration");
        report.disabled.push(group.name);
        return true;
    }

    let package = match group.resolve(py) {
        Resolution::Available(package) => package,
        Resolution::Unavailable(err) => {
            tracing::debug!(integration = group.name, error = %err, "could not import integration");
            report.unavailable.push(group.name);
            return false;
        }
    };

    let mut complete = true;
    for site in group.sites {
        let label = group.site_label(site);
        let outcome = site
            .destination(&package)
            .and_then(|destination| install_wrapper(&destination, site.attribute, hooks, &config.patch));

        match outcome {
            Ok(()) => report.patched.push(label),
            Err(err) => {
                tracing::debug!(integration = group.name, site = %label, error = %err, "could not patch");
                report.failed.push(label);
                complete = false;
            }
        }
    }
    complete
}

/// Patch every site of every group in `catalog` with one shared hook pair.
pub fn install_catalog(
    py: Python<'_>,
    catalog: &'static [IntegrationGroup],
    hooks: &HookPair,
    config: &HookConfig,
) -> InstallReport {
    let mut report = InstallReport::default();

    for group in catalog {
        let mut current = group;
        while !install_group(py, current, hooks, config, &mut report) {
            let Some(fallback) = current.fallback else {
                break;
            };
            tracing::debug!(integration = current.name, fallback = fallback.name, "trying fallback integration");
            current = fallback;
        }
    }

    tracing::debug!(
        patched = report.patched.len(),
        failed = report.failed.len(),
        unavailable = report.unavailable.len(),
        "hooks applied"
    );
    report
}

pub fn install_all_integrations(py: Python<'_>, hooks: &HookPair, config: &HookConfig) -> InstallReport {
    tracing::debug!("applying hooks");
    install_catalog(py, CATALOG, hooks, config)
}

/// Patch every installed library in the built-in catalog
#[pyfunction]
pub fn apply_hooks(py: Python<'_>, before: &Bound<'_, PyAny>, after: &Bound<'_, PyAny>) -> PyResult<()> {
    let hooks = HookPair::new(before, after)?;
    install_all_integrations(py, &hooks, &HookConfig::from_env());
    Ok(())
}
