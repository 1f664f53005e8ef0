//! Persisted application settings.
//! Stored in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings that survive restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Model provider ("openai" or "gemini")
    pub provider: String,
    /// Model API key
    pub api_key: String,
    /// Model name (empty means the provider's default)
    pub model: String,
    /// Maximum model round trips per task
    pub max_steps: u32,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: String::new(),
            model: String::new(),
            max_steps: 40,
            request_timeout_secs: 120,
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "pocketagent", "pocket-agent")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file.
    pub fn load() -> Self {
        let defaults = Self::default();

        let mut loaded: Self = Self::settings_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        // Backfill fields when loading older config files
        if loaded.provider.is_empty() {
            loaded.provider = defaults.provider;
        }
        if loaded.max_steps == 0 {
            loaded.max_steps = defaults.max_steps;
        }
        if loaded.request_timeout_secs == 0 {
            loaded.request_timeout_secs = defaults.request_timeout_secs;
        }

        loaded
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir().ok_or("Cannot determine config directory")?;
        self.save_to(&dir)
    }

    /// Save settings as `settings.json` under the given directory.
    pub fn save_to(&self, dir: &Path) -> Result<(), String> {
        fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        let path = dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.provider, "openai");
        assert_eq!(settings.max_steps, 40);
        assert_eq!(settings.request_timeout_secs, 120);
        assert!(settings.api_key.is_empty());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = std::env::temp_dir().join(format!("pocket-agent-settings-{}", std::process::id()));

        let mut settings = AppSettings::default();
        settings.api_key = "sk-test".to_string();
        settings.max_steps = 7;
        settings.save_to(&dir).unwrap();

        let content = fs::read_to_string(dir.join("settings.json")).unwrap();
        let loaded: AppSettings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.api_key, "sk-test");
        assert_eq!(loaded.max_steps, 7);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_partial_config_fills_missing_fields() {
        let settings: AppSettings = serde_json::from_str(r#"{"api_key":"sk-test"}"#).unwrap();
        assert_eq!(settings.provider, "openai");
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.max_steps, 40);
    }
}
