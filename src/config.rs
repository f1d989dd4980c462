use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::profile::{Profile, ProfileKind};
use crate::prompt::PromptTemplate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Which built-in translator flavour to use
    #[serde(default)]
    pub profile: ProfileKind,

    /// Preselected target language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,

    /// Preselected tone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    /// Preselected model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TOML file holding `GOOGLE_API_KEY`, consulted when the variable is unset
    #[serde(default = "default_secrets_path")]
    pub secrets_path: PathBuf,

    /// Replaces the profile's prompt wording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<PromptTemplate>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_secrets_path() -> PathBuf {
    PathBuf::from(".streamlit").join("secrets.toml")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: ProfileKind::default(),
            target_language: None,
            tone: None,
            model: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            secrets_path: default_secrets_path(),
            prompt_template: None,
        }
    }
}

impl Config {
    /// Get the default config file path: ~/.config/gemini-translator/config.toml
    pub fn default_config_path() -> Result<PathBuf> {
        let home_dir = std::env::home_dir().context("Could not determine home directory")?;

        Ok(home_dir
            .join(".config")
            .join("gemini-translator")
            .join("config.toml"))
    }

    /// Load config from a file path, creating default config if file doesn't exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            Ok(config)
        } else {
            let config = Config::default();
            config.save_to_path(path)?;
            Ok(config)
        }
    }

    /// Resolve the config path, falling back to the working directory when
    /// the home directory is unknown.
    pub fn resolve_path(config_path_override: Option<PathBuf>) -> PathBuf {
        config_path_override.unwrap_or_else(|| {
            Self::default_config_path().unwrap_or_else(|_| PathBuf::from("config.toml"))
        })
    }

    /// Save config to a file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// The active profile with any template override applied.
    pub fn profile(&self) -> Profile {
        let profile = Profile::for_kind(self.profile);
        match &self.prompt_template {
            Some(template) => profile.with_template(template.clone()),
            None => profile,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Secrets path, relative paths taken from the working directory.
    pub fn secrets_path(&self) -> &Path {
        &self.secrets_path
    }
}
