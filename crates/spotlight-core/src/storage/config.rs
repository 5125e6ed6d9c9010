//! TOML-based application configuration.
//!
//! Stores:
//! - Popup timing (interval, poll period, storage key) and copy
//! - Typewriter phrases and delays
//! - Log level for hosts
//!
//! Configuration is stored at `~/.config/spotlight/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, ValidationError};
use crate::popup::{PopupSettings, DEFAULT_STORAGE_KEY};
use crate::typewriter::TypewriterSettings;

/// Promotional popup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cooldown between displays.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default)]
    pub content: PopupContent,
}

/// Text shown inside the popup. Rendering is up to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupContent {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_subtitle")]
    pub subtitle: String,
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default = "default_call_to_action")]
    pub call_to_action: String,
}

/// Typewriter animation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypewriterConfig {
    #[serde(default = "default_phrases")]
    pub phrases: Vec<String>,
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,
    #[serde(default = "default_deleting_delay_ms")]
    pub deleting_delay_ms: u64,
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

/// Host logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/spotlight/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub popup: PopupConfig,
    #[serde(default)]
    pub typewriter: TypewriterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_interval_ms() -> u64 {
    30 * 60 * 1000
}
fn default_poll_interval_ms() -> u64 {
    60 * 1000
}
fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.into()
}
fn default_title() -> String {
    "Grab Your December Offer Now".into()
}
fn default_subtitle() -> String {
    "and Enjoy the Holidays!".into()
}
fn default_body() -> String {
    "Special deals are waiting for you. Don't miss out!".into()
}
fn default_call_to_action() -> String {
    "Explore Offers".into()
}
fn default_phrases() -> Vec<String> {
    [
        "Frontend Developer",
        "UI/UX Designer",
        "React Specialist",
        "Next.js Expert",
        "Creative Coder",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_typing_delay_ms() -> u64 {
    100
}
fn default_deleting_delay_ms() -> u64 {
    50
}
fn default_pause_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            storage_key: default_storage_key(),
            content: PopupContent::default(),
        }
    }
}

impl Default for PopupContent {
    fn default() -> Self {
        Self {
            title: default_title(),
            subtitle: default_subtitle(),
            body: default_body(),
            call_to_action: default_call_to_action(),
        }
    }
}

impl Default for TypewriterConfig {
    fn default() -> Self {
        Self {
            phrases: default_phrases(),
            typing_delay_ms: default_typing_delay_ms(),
            deleting_delay_ms: default_deleting_delay_ms(),
            pause_ms: default_pause_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("~/.config/spotlight"),
                message: e.to_string(),
            })
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path; a missing file is created with defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// as the key's existing type.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// # Errors
    ///
    /// Returns an error if the poll interval is zero.
    pub fn popup_settings(&self) -> Result<PopupSettings, ValidationError> {
        if self.popup.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidValue {
                field: "popup.poll_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(PopupSettings {
            interval: Duration::from_millis(self.popup.interval_ms),
            poll_period: Duration::from_millis(self.popup.poll_interval_ms),
            storage_key: self.popup.storage_key.clone(),
            content: self.popup.content.clone(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the phrase list is empty or a delay is zero.
    pub fn typewriter_settings(&self) -> Result<TypewriterSettings, ValidationError> {
        let tw = &self.typewriter;
        for (field, value) in [
            ("typewriter.typing_delay_ms", tw.typing_delay_ms),
            ("typewriter.deleting_delay_ms", tw.deleting_delay_ms),
        ] {
            if value == 0 {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: "must be greater than zero".into(),
                });
            }
        }
        if tw.phrases.is_empty() {
            return Err(ValidationError::EmptyCollection("typewriter.phrases".into()));
        }
        Ok(TypewriterSettings {
            phrases: tw.phrases.clone(),
            typing_delay: Duration::from_millis(tw.typing_delay_ms),
            deleting_delay: Duration::from_millis(tw.deleting_delay_ms),
            pause_duration: Duration::from_millis(tw.pause_ms),
        })
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
