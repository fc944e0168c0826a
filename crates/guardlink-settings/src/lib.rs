//! # guardlink-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`GuardlinkSettings::default()`]
//! 2. **User file**: `~/.guardlink/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `GUARDLINK_*` and the Gemini key variables
//!
//! A missing file is not an error; malformed JSON is.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::{GuardlinkSettings, LoggingSettings, ModelSettings, RetrySettings};
