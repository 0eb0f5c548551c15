use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::settings::DEFAULT_MODEL;
use crate::slider::EngineConfig;

pub const BACKEND_ENV: &str = "LLM_PLAYGROUND_BACKEND";
pub const MODEL_ENV: &str = "LLM_PLAYGROUND_MODEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub default_model: String,
    /// Coalescing delay for the temperature slider's fill recompute.
    pub primary_debounce_ms: u64,
    /// Debounce every slider like the temperature slider.
    pub debounce_all_channels: bool,
    pub drag_grace_ms: u64,
    /// Where exports land; the working directory when unset.
    pub export_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5001".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            primary_debounce_ms: 10,
            debounce_all_channels: false,
            drag_grace_ms: 50,
            export_dir: None,
            request_timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// Overlay `LLM_PLAYGROUND_*` variables as read by `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BACKEND_ENV).filter(|v| !v.trim().is_empty()) {
            self.backend_url = url.trim().to_string();
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.default_model = model.trim().to_string();
        }
        self
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            primary_delay: Duration::from_millis(self.primary_debounce_ms),
            debounce_all: self.debounce_all_channels,
            drag_grace: Duration::from_millis(self.drag_grace_ms),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Base directory: ~/.config/llm-playground/
pub fn base_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("llm-playground")
}

pub fn config_path() -> PathBuf {
    base_dir().join("config.json")
}

pub fn log_dir() -> PathBuf {
    base_dir().join("logs")
}

/// Read a config file. Missing keys take their defaults.
pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// The stored config, or defaults when it is absent or unreadable.
pub fn load_config() -> AppConfig {
    let path = config_path();
    if !path.exists() {
        return AppConfig::default();
    }
    read_config(&path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
        AppConfig::default()
    })
}

pub fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
