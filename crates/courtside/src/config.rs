// Configuration loading and validation (config/courtside.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Name of the single configuration file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "courtside.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub bridge: BridgeConfig,
    pub widget: WidgetConfig,
    pub popout: PopoutConfig,
    pub video: VideoConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub db_path: String,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub seed_demo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub port: u16,
}

/// How the widget narrows a snapshot before priority selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Priority tiers over the whole collection.
    Priority,
    /// Today / this week / last 7 days first, then priority tiers.
    Recent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    pub selection: SelectionMode,
    pub auto_refresh: bool,
    pub refresh_interval_secs: u64,
    pub sound_enabled: bool,
    #[serde(default)]
    pub demo_fallback: bool,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl WidgetConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// The club's local offset. Falls back to UTC for out-of-range values,
    /// which `validate` rejects anyway.
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopoutConfig {
    pub width: u32,
    pub height: u32,
    pub open_timeout_secs: u64,
}

impl PopoutConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoConfig {
    pub columns: u16,
    pub rows: u16,
    pub frame_interval_ms: u64,
    pub ready_timeout_secs: u64,
}

impl VideoConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn fps(&self) -> u32 {
        u32::try_from(1000 / self.frame_interval_ms.max(1)).unwrap_or(1).max(1)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/courtside.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config = parse_config(&text).map_err(|source| ConfigError::ParseError {
        path: path.clone(),
        source,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Parse configuration text without validating it.
pub fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

/// Ensure `config/` holds every file from `defaults/`, copying missing ones.
/// Returns the files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the crate directory or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            if config.store.db_path.trim().is_empty() {
                return Err(invalid("store.db_path", "must not be empty"));
            }
        }
        StoreBackend::Remote => {
            let url = config.store.remote_url.as_deref().unwrap_or("").trim();
            if url.is_empty() {
                return Err(invalid(
                    "store.remote_url",
                    "required when store.backend = \"remote\"",
                ));
            }
        }
    }

    if config.bridge.port == 0 {
        return Err(invalid("bridge.port", "must be greater than 0"));
    }

    if config.widget.refresh_interval_secs == 0 {
        return Err(invalid("widget.refresh_interval_secs", "must be greater than 0"));
    }

    // chrono accepts offsets strictly inside one day.
    if config.widget.utc_offset_minutes.abs() >= 24 * 60 {
        return Err(invalid(
            "widget.utc_offset_minutes",
            format!(
                "must be within +/-1439, got {}",
                config.widget.utc_offset_minutes
            ),
        ));
    }

    let sizes: &[(&str, u64)] = &[
        ("popout.width", u64::from(config.popout.width)),
        ("popout.height", u64::from(config.popout.height)),
        ("popout.open_timeout_secs", config.popout.open_timeout_secs),
        ("video.columns", u64::from(config.video.columns)),
        ("video.rows", u64::from(config.video.rows)),
        ("video.frame_interval_ms", config.video.frame_interval_ms),
        ("video.ready_timeout_secs", config.video.ready_timeout_secs),
    ];
    for (name, val) in sizes {
        if *val == 0 {
            return Err(invalid(name, "must be greater than 0"));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
