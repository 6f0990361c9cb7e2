//! Turns flags and the config file into the pieces a chat needs.
//!
//! Flags win over config values, which win over built-in defaults.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::character::{CharacterCatalog, UnknownCharacterError, DEFAULT_CATALOG_FILE};
use crate::core::chat_client::{ChatClient, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::core::config::{path_display, Config};
use crate::core::credentials::resolve_api_key;
use crate::core::pipeline::{CompletionPipeline, HistoryWindow, DEFAULT_MODEL};
use crate::core::session::ChatSession;

/// Command-line overrides shared by `chat`, `say` and `characters`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub characters: Option<PathBuf>,
    pub character: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub catalog_path: PathBuf,
    pub character: Option<String>,
    pub model: String,
    pub base_url: String,
    pub window: HistoryWindow,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn resolve(overrides: &Overrides, config: &Config) -> Self {
        Settings {
            catalog_path: overrides
                .characters
                .clone()
                .or_else(|| config.characters_file.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_FILE)),
            character: overrides
                .character
                .clone()
                .or_else(|| config.default_character.clone()),
            model: overrides
                .model
                .clone()
                .or_else(|| config.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: overrides
                .base_url
                .clone()
                .or_else(|| config.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            window: HistoryWindow::from_setting(config.history_window),
            request_timeout: Duration::from_secs(
                config
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        }
    }
}

/// Loads the catalog. A failure here is fatal; there is no fallback character.
pub fn load_catalog(settings: &Settings) -> Result<Arc<CharacterCatalog>, Box<dyn Error>> {
    let catalog = CharacterCatalog::load(&settings.catalog_path)
        .map_err(|err| format!("Failed to load characters: {err}"))?;
    info!(
        path = %path_display(&settings.catalog_path),
        characters = catalog.len(),
        "Loaded character catalog"
    );
    Ok(Arc::new(catalog))
}

pub fn build_pipeline(settings: &Settings) -> Result<CompletionPipeline<ChatClient>, Box<dyn Error>> {
    let (api_key, source) = resolve_api_key()?;
    debug!(%source, base_url = %settings.base_url, "Resolved API key");

    let client = ChatClient::new(&settings.base_url, api_key, settings.request_timeout)?;
    Ok(CompletionPipeline::new(client, &settings.model).with_window(settings.window))
}

pub fn open_session(
    catalog: Arc<CharacterCatalog>,
    settings: &Settings,
) -> Result<ChatSession, Box<dyn Error>> {
    ChatSession::new(Arc::clone(&catalog), settings.character.as_deref())
        .map_err(|err| unknown_character_message(&err, &catalog).into())
}

/// The error text for `-c` with a name the catalog lacks, listing the valid names.
pub fn unknown_character_message(err: &UnknownCharacterError, catalog: &CharacterCatalog) -> String {
    let available = catalog.names().collect::<Vec<_>>().join(", ");
    format!("{err}. Available characters: {available}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::resolve(&Overrides::default(), &Config::default());

        assert_eq!(settings.catalog_path, PathBuf::from("character-details.json"));
        assert_eq!(settings.character, None);
        assert_eq!(settings.model, "llama3-70b-8192");
        assert_eq!(settings.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(settings.window, HistoryWindow::LastMessages(40));
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn flags_override_config_values() {
        let config = Config {
            characters_file: Some(PathBuf::from("/etc/cast.json")),
            default_character: Some("Watson".to_string()),
            model: Some("llama3-8b-8192".to_string()),
            base_url: Some("http://localhost:1234/v1".to_string()),
            history_window: Some(0),
            request_timeout_secs: Some(15),
        };
        let overrides = Overrides {
            characters: Some(PathBuf::from("local.json")),
            character: Some("Holmes".to_string()),
            model: None,
            base_url: None,
        };

        let settings = Settings::resolve(&overrides, &config);
        assert_eq!(settings.catalog_path, PathBuf::from("local.json"));
        assert_eq!(settings.character.as_deref(), Some("Holmes"));
        assert_eq!(settings.model, "llama3-8b-8192");
        assert_eq!(settings.base_url, "http://localhost:1234/v1");
        assert_eq!(settings.window, HistoryWindow::Unbounded);
        assert_eq!(settings.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn catalog_failure_is_reported_with_context() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cast.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        let settings = Settings::resolve(
            &Overrides {
                characters: Some(path),
                ..Overrides::default()
            },
            &Config::default(),
        );

        let err = load_catalog(&settings).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load characters: "));
    }

    #[test]
    fn unknown_character_lists_available_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cast.json");
        fs::write(&path, r#"{"Holmes": "a detective", "Watson": "a doctor"}"#).unwrap();
        let settings = Settings::resolve(
            &Overrides {
                characters: Some(path),
                character: Some("Moriarty".to_string()),
                ..Overrides::default()
            },
            &Config::default(),
        );

        let catalog = load_catalog(&settings).unwrap();
        let err = open_session(catalog, &settings).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Unknown character 'Moriarty'. Available characters: Holmes, Watson"
        );
    }
}
