use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable (and secrets-file key) holding the Google API key.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    SecretsFile,
    Manual,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "environment ({API_KEY_VAR})"),
            Self::SecretsFile => write!(f, "secrets file"),
            Self::Manual => write!(f, "manual entry"),
        }
    }
}

/// An API key together with where it came from.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    key: String,
    source: CredentialSource,
}

impl Credential {
    /// Returns `None` for a blank key.
    pub fn new(key: impl Into<String>, source: CredentialSource) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(Self { key, source })
        }
    }

    pub fn manual(key: impl Into<String>) -> Option<Self> {
        Self::new(key, CredentialSource::Manual)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Find an API key without user interaction.
///
/// Tries `env(GOOGLE_API_KEY)` first, then the `GOOGLE_API_KEY` entry of the
/// TOML secrets file. `Ok(None)` means the user has to type the key in.
pub fn resolve_credential<F>(env: F, secrets_path: Option<&Path>) -> Result<Option<Credential>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(credential) =
        env(API_KEY_VAR).and_then(|key| Credential::new(key, CredentialSource::Environment))
    {
        info!("Using API key from {}", credential.source());
        return Ok(Some(credential));
    }

    if let Some(path) = secrets_path {
        if let Some(key) = read_secrets_file(path)? {
            if let Some(credential) = Credential::new(key, CredentialSource::SecretsFile) {
                info!("Using API key from secrets file: {}", path.display());
                return Ok(Some(credential));
            }
        }
    }

    info!("No API key found, waiting for manual entry");
    Ok(None)
}

/// Resolve against the real process environment, after loading `.env`.
pub fn resolve_from_process(secrets_path: Option<&Path>) -> Result<Option<Credential>> {
    match dotenv::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }

    resolve_credential(|name| std::env::var(name).ok(), secrets_path)
}

fn read_secrets_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        debug!("Secrets file not found: {}", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read secrets file: {}", path.display()))?;
    let table: toml::Table = toml::from_str(&content)
        .with_context(|| format!("Failed to parse secrets file: {}", path.display()))?;

    Ok(table
        .get(API_KEY_VAR)
        .and_then(|value| value.as_str())
        .map(str::to_string))
}
