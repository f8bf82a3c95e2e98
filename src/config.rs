//! Layered configuration: defaults, then `config.toml`, then
//! `CAMPUS_CHAT__SECTION__KEY` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ChatError, Result};

const ENV_PREFIX: &str = "CAMPUS_CHAT";
const CONFIG_PATH_ENV: &str = "CAMPUS_CHAT_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .map(|p| p.join("campus-chat"))
                .unwrap_or_else(|| PathBuf::from(".campus-chat")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Max message body size in bytes
    pub max_message_size: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_message_size: 4096,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub chat: ChatSettings,
}

impl AppConfig {
    /// Default location: `$CAMPUS_CHAT_CONFIG`, else `{config_dir}/campus-chat/config.toml`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .map(|p| p.join("campus-chat"))
            .unwrap_or_else(|| PathBuf::from(".campus-chat"))
            .join("config.toml")
    }

    /// Load from `path` (optional) with environment overrides applied on top.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let loaded: AppConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Write this configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ChatError::Config(format!("Create config dir: {}", e)))?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|e| ChatError::Config(format!("Serialize config: {}", e)))?;
        std::fs::write(path, data)
            .map_err(|e| ChatError::Config(format!("Write config: {}", e)))
    }

    fn validate(&self) -> Result<()> {
        if self.chat.max_message_size == 0 {
            return Err(ChatError::Config(
                "chat.max_message_size must be greater than zero".to_string(),
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err(ChatError::Config("server.host must be set".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = AppConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.chat.max_message_size, 4096);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8123\n\n[chat]\nmax_message_size = 16\n",
        )
        .unwrap();

        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.server.port, 8123);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.chat.max_message_size, 16);
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.storage.data_dir = tmp.path().join("data");
        cfg.server.port = 9001;
        cfg.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.server.port, 9001);
        assert_eq!(loaded.storage.data_dir, tmp.path().join("data"));
    }

    #[test]
    fn test_zero_message_size_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[chat]\nmax_message_size = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ChatError::Config(_))
        ));
    }
}
