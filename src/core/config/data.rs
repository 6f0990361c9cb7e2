use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Persistent user settings, stored as TOML.
///
/// Every field is optional; unset fields fall back to built-in defaults when
/// the runtime settings are resolved.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// JSON file mapping character names to descriptors
    pub characters_file: Option<PathBuf>,
    /// Character selected when a chat starts
    pub default_character: Option<String>,
    /// Model identifier sent with every completion request
    pub model: Option<String>,
    /// Root of the OpenAI-compatible API (e.g. "https://api.groq.com/openai/v1")
    pub base_url: Option<String>,
    /// Number of history messages replayed into each prompt (0 = all)
    pub history_window: Option<usize>,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Keys accepted by `charchat set` / `charchat unset`.
pub const CONFIG_KEYS: &[&str] = &[
    "characters-file",
    "default-character",
    "model",
    "base-url",
    "history-window",
    "request-timeout-secs",
];

/// Rejected `set`/`unset` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigKeyError {
    UnknownKey(String),
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKeyError::UnknownKey(key) => {
                write!(
                    f,
                    "Unknown config key: {key} (expected one of: {})",
                    CONFIG_KEYS.join(", ")
                )
            }
            ConfigKeyError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {key}: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigKeyError {}

impl Config {
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigKeyError> {
        let invalid = || ConfigKeyError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "characters-file" => self.characters_file = Some(PathBuf::from(value)),
            "default-character" => self.default_character = Some(value.to_string()),
            "model" => self.model = Some(value.to_string()),
            "base-url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid());
                }
                self.base_url = Some(value.to_string());
            }
            "history-window" => {
                self.history_window = Some(value.parse().map_err(|_| invalid())?);
            }
            "request-timeout-secs" => {
                let secs: u64 = value.parse().map_err(|_| invalid())?;
                if secs == 0 {
                    return Err(invalid());
                }
                self.request_timeout_secs = Some(secs);
            }
            _ => return Err(ConfigKeyError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), ConfigKeyError> {
        match key {
            "characters-file" => self.characters_file = None,
            "default-character" => self.default_character = None,
            "model" => self.model = None,
            "base-url" => self.base_url = None,
            "history-window" => self.history_window = None,
            "request-timeout-secs" => self.request_timeout_secs = None,
            _ => return Err(ConfigKeyError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        fn show<T: fmt::Display>(value: Option<T>) -> String {
            value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "(unset)".to_string())
        }

        println!("Current configuration:");
        println!(
            "  characters-file: {}",
            show(self.characters_file.as_deref().map(path_display))
        );
        println!(
            "  default-character: {}",
            show(self.default_character.as_deref())
        );
        println!("  model: {}", show(self.model.as_deref()));
        println!("  base-url: {}", show(self.base_url.as_deref()));
        println!("  history-window: {}", show(self.history_window));
        println!(
            "  request-timeout-secs: {}",
            show(self.request_timeout_secs)
        );
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths under the home directory to `~` notation on Unix
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
