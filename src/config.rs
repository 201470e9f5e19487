use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the exif-edit tool.
///
/// Every field has a default, so a partial file (or none at all) is valid.
///
/// ```rust,no_run
/// use exif_edit::config::Config;
///
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
/// assert!(config.download.timeout_secs > 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP download behaviour.
    pub download: DownloadConfig,
    /// Where and how edited images are written.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Abort downloads larger than this many bytes. `None` means unlimited.
    pub max_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the source file stem, e.g. `photo` -> `photo_modified.jpg`.
    pub suffix: String,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0".to_string(),
            max_bytes: Some(50 * 1024 * 1024),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "_modified".to_string(),
            jpeg_quality: 90,
        }
    }
}

impl OutputConfig {
    /// Quality clamped to the range the JPEG encoder accepts.
    pub fn quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

impl Config {
    /// Resolve the config file path, in the same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        log::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
