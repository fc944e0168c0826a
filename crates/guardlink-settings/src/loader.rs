//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GuardlinkSettings::default()`]
//! 2. If `~/.guardlink/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Reject values that parsed but cannot work (zero timeouts, empty model)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::GuardlinkSettings;

/// Resolve the path to the settings file (`~/.guardlink/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".guardlink").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<GuardlinkSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
pub fn load_settings_from_path(path: &Path) -> Result<GuardlinkSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<GuardlinkSettings> {
    let defaults = serde_json::to_value(GuardlinkSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

fn validate(settings: &GuardlinkSettings) -> Result<()> {
    if settings.model.model.trim().is_empty() {
        return Err(SettingsError::InvalidValue("model.model must not be empty".into()));
    }
    if settings.model.request_timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "model.requestTimeoutMs must be greater than 0".into(),
        ));
    }
    if settings.model.connect_timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "model.connectTimeoutMs must be greater than 0".into(),
        ));
    }
    if !(0.0..=1.0).contains(&settings.retry.jitter_factor) {
        return Err(SettingsError::InvalidValue(format!(
            "retry.jitterFactor must be within 0.0..=1.0, got {}",
            settings.retry.jitter_factor
        )));
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut GuardlinkSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` to read variables.
///
/// Invalid values are ignored with a warning (fall back to file/default).
/// `GEMINI_API_KEY` wins over `GOOGLE_API_KEY`.
pub fn apply_overrides_from(
    settings: &mut GuardlinkSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let env = EnvReader { lookup };

    // ── Model ───────────────────────────────────────────────────────
    if let Some(v) = env.string("GUARDLINK_MODEL") {
        settings.model.model = v;
    }
    if let Some(v) = env.string("GUARDLINK_BASE_URL") {
        settings.model.base_url = v;
    }
    if let Some(v) = env
        .string("GEMINI_API_KEY")
        .or_else(|| env.string("GOOGLE_API_KEY"))
    {
        settings.model.api_key = Some(v);
    }
    if let Some(v) = env.u64_range("GUARDLINK_REQUEST_TIMEOUT_MS", 100, 600_000) {
        settings.model.request_timeout_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("GUARDLINK_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("GUARDLINK_LOG_JSON") {
        settings.logging.json = v;
    }

    // ── Retry ───────────────────────────────────────────────────────
    if let Some(v) = env.bool("GUARDLINK_RETRY_ENABLED") {
        settings.retry.enabled = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64_range(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, min, max, "invalid u64 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn write_settings(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let merged = deep_merge(
            json!({ "model": { "model": "a", "requestTimeoutMs": 1 } }),
            json!({ "model": { "model": "b" } }),
        );
        assert_eq!(merged["model"]["model"], "b");
        assert_eq!(merged["model"]["requestTimeoutMs"], 1);
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(json!({ "a": 1 }), json!({ "a": null }));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_and_primitive_replace() {
        let merged = deep_merge(
            json!({ "a": [1, 2], "b": { "c": 1 } }),
            json!({ "a": [3], "b": 4 }),
        );
        assert_eq!(merged["a"], json!([3]));
        assert_eq!(merged["b"], 4);
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, GuardlinkSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let (_dir, path) = write_settings(
            r#"{
                "model": {"model": "gemini-2.5-flash", "temperature": 0.3},
                "retry": {"enabled": true}
            }"#,
        );
        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.model.model, "gemini-2.5-flash");
        assert_eq!(settings.model.temperature, Some(0.3));
        assert_eq!(settings.model.request_timeout_ms, 60_000);
        assert!(settings.retry.enabled);
        assert_eq!(settings.retry.max_retries, 3);
    }

    #[test]
    fn invalid_json_is_error() {
        let (_dir, path) = write_settings("not valid json");
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn wrong_type_is_error() {
        let (_dir, path) = write_settings(r#"{"model": {"requestTimeoutMs": "fast"}}"#);
        assert!(matches!(load_file_layer(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn zero_timeout_is_invalid_value() {
        let mut settings = GuardlinkSettings::default();
        settings.model.request_timeout_ms = 0;
        assert!(matches!(
            validate(&settings),
            Err(SettingsError::InvalidValue(msg)) if msg.contains("requestTimeoutMs")
        ));
    }

    #[test]
    fn out_of_range_jitter_is_invalid_value() {
        let mut settings = GuardlinkSettings::default();
        settings.retry.jitter_factor = 1.5;
        assert!(matches!(validate(&settings), Err(SettingsError::InvalidValue(_))));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_every_key() {
        let mut settings = GuardlinkSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("GUARDLINK_MODEL", "gemini-2.5-pro"),
                ("GUARDLINK_BASE_URL", "http://localhost:9000/v1beta"),
                ("GEMINI_API_KEY", "gemini-key"),
                ("GUARDLINK_REQUEST_TIMEOUT_MS", "15000"),
                ("GUARDLINK_LOG_LEVEL", "debug"),
                ("GUARDLINK_LOG_JSON", "yes"),
                ("GUARDLINK_RETRY_ENABLED", "1"),
            ]),
        );
        assert_eq!(settings.model.model, "gemini-2.5-pro");
        assert_eq!(settings.model.base_url, "http://localhost:9000/v1beta");
        assert_eq!(settings.model.api_key.as_deref(), Some("gemini-key"));
        assert_eq!(settings.model.request_timeout_ms, 15_000);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
        assert!(settings.retry.enabled);
    }

    #[test]
    fn gemini_key_wins_over_google_key() {
        let mut settings = GuardlinkSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[("GEMINI_API_KEY", "g1"), ("GOOGLE_API_KEY", "g2")]),
        );
        assert_eq!(settings.model.api_key.as_deref(), Some("g1"));

        let mut settings = GuardlinkSettings::default();
        apply_overrides_from(&mut settings, env(&[("GOOGLE_API_KEY", "g2")]));
        assert_eq!(settings.model.api_key.as_deref(), Some("g2"));
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = GuardlinkSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("GUARDLINK_REQUEST_TIMEOUT_MS", "0"),
                ("GUARDLINK_LOG_JSON", "maybe"),
                ("GUARDLINK_MODEL", ""),
            ]),
        );
        assert_eq!(settings, GuardlinkSettings::default());
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for v in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["false", "0", "No", "off"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("100", 100, 200), Some(100));
        assert_eq!(parse_u64_range("200", 100, 200), Some(200));
        assert_eq!(parse_u64_range("99", 100, 200), None);
        assert_eq!(parse_u64_range("-1", 0, 200), None);
        assert_eq!(parse_u64_range("abc", 0, 200), None);
    }
}
