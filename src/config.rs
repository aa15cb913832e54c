use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::AnalysisType;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level configuration for the image-analyzer library.
///
/// # Loading
///
/// ```rust,no_run
/// use image_analyzer::config::Config;
///
/// // From a JSON file
/// let mut config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Fill in the API key from GEMINI_API_KEY if the file has none
/// config.apply_env();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Google Gemini connection settings.
    pub gemini: GeminiConfig,
    /// How image files are prepared before submission.
    pub image: ImageConfig,
    /// Analysis type used when none is given on the command line.
    pub default_type: AnalysisType,
}

/// Google Gemini service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Image preparation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Re-encode PNG/WebP/GIF/BMP files as JPEG before upload.
    pub transcode_to_jpeg: bool,
    /// JPEG quality used when transcoding (1-100).
    pub jpeg_quality: u8,
    /// Files larger than this are rejected before upload.
    pub max_bytes: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            max_output_tokens: None,
            temperature: None,
            timeout_secs: 60,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            transcode_to_jpeg: true,
            jpeg_quality: 85,
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            image: ImageConfig::default(),
            default_type: AnalysisType::Detailed,
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
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

    /// Fill an empty API key from `GEMINI_API_KEY`.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Same as [`Config::apply_env`] with an explicit variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.gemini.api_key.trim().is_empty() {
            return;
        }
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            log::debug!("Using API key from {API_KEY_ENV}");
            self.gemini.api_key = key.trim().to_string();
        }
    }

    /// Whether an API key is available.
    pub fn has_api_key(&self) -> bool {
        !self.gemini.api_key.trim().is_empty()
    }
}
