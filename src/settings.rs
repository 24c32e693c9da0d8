//! Runtime configuration for patching and integration selection

use std::env;

/// Python logger that receives every diagnostic line
pub const LOGGER_NAME: &str = "mlnotify";

/// Tracing filter directives
pub const LOG_ENV: &str = "MLNOTIFY_LOG";

/// Comma-separated integration group names to skip
pub const DISABLE_ENV: &str = "MLNOTIFY_DISABLE";

/// `0`/`false`/`no`/`off` makes patching an existing wrapper an error
pub const ALLOW_HIT_ENV: &str = "MLNOTIFY_ALLOW_HIT";

pub const DEFAULT_LOG_DIRECTIVES: &str = "mlnotify_hooks=debug";

/// Prefix of the attribute holding the first-seen original callable
pub const ORIGINAL_PREFIX: &str = "_mlnotify_original_";

/// How a single patch treats what it finds on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSettings {
    /// Allow replacing an attribute that is already a wrapper.
    pub allow_hit: bool,
    /// Keep the first original callable reachable on the destination.
    pub store_hit: bool,
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            allow_hit: true,
            store_hit: true,
        }
    }
}

impl PatchSettings {
    pub fn original_attribute(name: &str) -> String {
        format!("{ORIGINAL_PREFIX}{name}")
    }
}

/// Configuration for a full orchestrator run
#[derive(Debug, Clone, Default)]
pub struct HookConfig {
    pub patch: PatchSettings,
    /// Lowercased integration group names that are skipped.
    pub disabled: Vec<String>,
}

impl HookConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let disabled = lookup(DISABLE_ENV)
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        let mut patch = PatchSettings::default();
        if let Some(allow_hit) = lookup(ALLOW_HIT_ENV).as_deref().and_then(parse_flag) {
            patch.allow_hit = allow_hit;
        }

        Self { patch, disabled }
    }

    pub fn is_disabled(&self, group: &str) -> bool {
        self.disabled.iter().any(|name| name.eq_ignore_ascii_case(group))
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Unrecognised values keep the default.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_allow_overwrite_and_store() {
        let settings = PatchSettings::default();
        assert!(settings.allow_hit);
        assert!(settings.store_hit);
    }

    #[test]
    fn test_disable_list_parsing() {
        let config = HookConfig::from_lookup(|key| {
            (key == DISABLE_ENV).then(|| " XGBoost, ,sklearn,".to_string())
        });
        assert_eq!(config.disabled, vec!["xgboost", "sklearn"]);
        assert!(config.is_disabled("xgboost"));
        assert!(config.is_disabled("SKLEARN"));
        assert!(!config.is_disabled("lightgbm"));
    }

    #[test]
    fn test_missing_env_disables_nothing() {
        let config = HookConfig::from_lookup(|_| None);
        assert!(config.disabled.is_empty());
        assert_eq!(config.patch, PatchSettings::default());
    }

    #[test]
    fn test_original_attribute_name() {
        assert_eq!(PatchSettings::original_attribute("fit"), "_mlnotify_original_fit");
    }

    #[test]
    fn test_allow_hit_from_env() {
        for value in ["0", "false", " Off ", "NO"] {
            let config = HookConfig::from_lookup(|key| (key == ALLOW_HIT_ENV).then(|| value.to_string()));
            assert!(!config.patch.allow_hit, "{value:?} should disallow hits");
            assert!(config.patch.store_hit);
        }

        let config = HookConfig::from_lookup(|key| (key == ALLOW_HIT_ENV).then(|| "yes".to_string()));
        assert!(config.patch.allow_hit);

        let config = HookConfig::from_lookup(|key| (key == ALLOW_HIT_ENV).then(|| "maybe".to_string()));
        assert!(config.patch.allow_hit);
    }
}
