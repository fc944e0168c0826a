//! Settings type definitions.
//!
//! Field names are camelCase on disk. Every section is `#[serde(default)]`,
//! so a settings file only needs the keys it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings.
///
/// ```json
/// {
///   "model": { "model": "gemini-2.0-flash", "requestTimeoutMs": 30000 },
///   "logging": { "level": "debug" },
///   "retry": { "enabled": true }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardlinkSettings {
    /// Model endpoint settings.
    pub model: ModelSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Opt-in retry configuration.
    pub retry: RetrySettings,
}

/// Model endpoint settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// Model identifier.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// API key. Usually supplied through `GEMINI_API_KEY` rather than the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Whole-request deadline in milliseconds.
    pub request_timeout_ms: u64,
    /// Connect deadline in milliseconds.
    pub connect_timeout_ms: u64,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Output token cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl ModelSettings {
    /// Request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Connect deadline.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            request_timeout_ms: 60_000,
            connect_timeout_ms: 10_000,
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl std::fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSettings")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive (`RUST_LOG` takes precedence).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Retry configuration. Off unless enabled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// Wrap façade calls in the retry layer.
    pub enabled: bool,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// First backoff in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds.
    pub max_delay_ms: u64,
    /// Relative jitter, `0.0..=1.0`.
    pub jitter_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_camel_case_without_secrets() {
        let value = serde_json::to_value(GuardlinkSettings::default()).unwrap();
        assert_eq!(value["model"]["requestTimeoutMs"], 60_000);
        assert_eq!(value["retry"]["baseDelayMs"], 1000);
        assert!(value["model"].get("apiKey").is_none());
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let settings: GuardlinkSettings =
            serde_json::from_str(r#"{"logging": {"json": true}}"#).unwrap();
        assert!(settings.logging.json);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.model, ModelSettings::default());
    }

    #[test]
    fn debug_hides_api_key() {
        let settings = ModelSettings {
            api_key: Some("AIza-secret".into()),
            ..ModelSettings::default()
        };
        assert!(!format!("{settings:?}").contains("AIza-secret"));
    }

    #[test]
    fn timeouts_as_durations() {
        let settings = ModelSettings::default();
        assert_eq!(settings.request_timeout(), Duration::from_secs(60));
        assert_eq!(settings.connect_timeout(), Duration::from_secs(10));
    }
}
