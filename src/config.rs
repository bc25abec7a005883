use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use directories::ProjectDirs;
use once_cell::sync::Lazy; // Use Lazy for thread-safe static initialization
use std::sync::Mutex;
use toml;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrainerSettings {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
    /// "remote" for the inference server, "local" for a whisper.cpp binary.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_whisper_binary_path")]
    pub whisper_binary_path: String,
    #[serde(default = "default_whisper_model_path")]
    pub whisper_model_path: String,
}

fn default_language() -> String {
    "ar".to_string()
}

fn default_pass_threshold() -> f64 {
    crate::verification::DEFAULT_PASS_THRESHOLD
}

fn default_provider() -> String {
    "remote".to_string()
}

fn default_server_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_whisper_binary_path() -> String {
    String::new()
}

fn default_whisper_model_path() -> String {
    String::new()
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            pass_threshold: default_pass_threshold(),
            provider: default_provider(),
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
            whisper_binary_path: default_whisper_binary_path(),
            whisper_model_path: default_whisper_model_path(),
        }
    }
}

// Use Lazy<Mutex<TrainerSettings>> for thread-safe static config
pub static SETTINGS: Lazy<Mutex<TrainerSettings>> = Lazy::new(|| {
    Mutex::new(load_settings())
});

// Helper function to get project directories
fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "murattil", "Murattil")
}

// Helper function to get the config file path
fn get_config_path() -> Option<PathBuf> {
    get_project_dirs().map(|proj_dirs| {
        let config_dir = proj_dirs.config_dir();
        config_dir.join("config.toml")
    })
}

// Function to load settings from TOML file or create default
fn load_settings() -> TrainerSettings {
    if let Some(config_path) = get_config_path() {
        log::info!("[Config] Trying to load settings from: {}", config_path.display());
        match fs::read_to_string(&config_path) {
            Ok(contents) => {
                match toml::from_str::<TrainerSettings>(&contents) {
                    Ok(settings) => {
                        log::info!(
                            "[Config] Settings loaded: provider='{}', lang='{}', threshold={}",
                            settings.provider, settings.language, settings.pass_threshold
                        );
                        return settings;
                    },
                    Err(e) => {
                        log::error!("[Config] Failed to parse config file '{}': {}", config_path.display(), e);
                        // Fall through to create default if parsing fails
                    }
                }
            },
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("[Config] Config file not found. Creating default.");
                // Fall through to create default
            },
            Err(e) => {
                log::error!("[Config] Failed to read config file '{}': {}", config_path.display(), e);
                // Fall through to create default on other read errors
            }
        }
    } else {
        log::error!("[Config] Could not determine project directories. Using default settings.");
    }

    // --- Create or use Default Settings ---
    let default_settings = TrainerSettings::default();
    if let Some(config_path) = get_config_path() {
        // Ensure the config directory exists
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                log::info!("[Config] Creating config directory: {}", config_dir.display());
                if let Err(e) = fs::create_dir_all(config_dir) {
                    log::error!("[Config] Failed to create config directory: {}", e);
                    // Proceed with default settings in memory anyway
                    return default_settings;
                }
            }
        }

        // Try to save the default config file
        match toml::to_string_pretty(&default_settings) {
            Ok(toml_string) => {
                log::info!("[Config] Saving default settings to: {}", config_path.display());
                if let Err(e) = fs::write(&config_path, toml_string) {
                    log::error!("[Config] Failed to write default config file: {}", e);
                } else {
                    log::info!("[Config] Default config file created successfully.");
                }
            },
            Err(e) => {
                log::error!("[Config] Failed to serialize default settings: {}", e);
            }
        }
    }

    default_settings // Return defaults if loading/saving failed
}

// Implementation for saving settings
impl TrainerSettings {
    pub fn config_path() -> Result<PathBuf, String> {
        get_config_path().ok_or_else(|| "Could not determine config path".to_string())
    }

    pub fn save(&self) -> Result<(), String> {
        let config_path = Self::config_path()?;
        log::info!("[Config] Attempting to save settings to: {}", config_path.display());

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir).map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let config_content = toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize: {}", e))?;
        fs::write(&config_path, config_content).map_err(|e| format!("Failed to write config: {}", e))?;

        log::info!("[Config] Settings saved successfully.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = TrainerSettings::default();
        assert_eq!(settings.language, "ar");
        assert_eq!(settings.pass_threshold, 70.0);
        assert_eq!(settings.provider, "remote");
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: TrainerSettings = toml::from_str("pass_threshold = 85.0").unwrap();
        assert_eq!(settings.pass_threshold, 85.0);
        assert_eq!(settings.language, "ar");
        assert_eq!(settings.server_url, "http://127.0.0.1:8000");
    }
}
