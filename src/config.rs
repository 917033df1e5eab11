use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Upstream data source backing the restaurant tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Google,
    Yelp,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Yelp => "yelp",
        }
    }

    /// Environment variable holding the API key
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::Google => "GOOGLE_MAPS_API_KEY",
            ProviderKind::Yelp => "YELP_API_KEY",
        }
    }

    /// Key file in the user's home directory, containing only the key
    pub fn key_file_name(&self) -> &'static str {
        match self {
            ProviderKind::Google => ".env.googleapi",
            ProviderKind::Yelp => ".env.yelpapi",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Google => "Google Maps",
            ProviderKind::Yelp => "Yelp",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" | "google-maps" => Ok(ProviderKind::Google),
            "yelp" => Ok(ProviderKind::Yelp),
            other => anyhow::bail!("Unknown provider: {} (expected 'google' or 'yelp')", other),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "{} API key not found. Please either:\n\
         1. Set the {env_var} environment variable, or\n\
         2. Create {} containing only your API key, or\n\
         3. Run `restaurant-finder config --provider {} --api-key <KEY>`",
        provider.display_name(),
        key_file.display(),
        provider.as_str()
    )]
    MissingApiKey {
        provider: ProviderKind,
        env_var: &'static str,
        key_file: PathBuf,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider used by `serve` when none is given on the command line
    #[serde(default)]
    pub default_provider: ProviderKind,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub yelp: YelpConfig,
}

/// Response cache settings shared by both providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a cached response stays valid (default: 24 hours)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Cache root (default: the platform cache dir + `restaurant-finder`)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_ttl_secs() -> u64 {
    86_400
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Track calls against the free tier (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override for the Maps web service root, for proxies and tests
    #[serde(default)]
    pub base_url: Option<String>,
    /// Monthly free credit in US dollars
    #[serde(default = "default_monthly_credit")]
    pub monthly_credit: f64,
}

fn default_monthly_credit() -> f64 {
    200.0
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            monthly_credit: default_monthly_credit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YelpConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u64,
}

fn default_daily_limit() -> u64 {
    500
}

impl Default for YelpConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            daily_limit: default_daily_limit(),
        }
    }
}

/// Where one provider keeps its durable state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPaths {
    pub cache_dir: PathBuf,
    pub usage_file: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;
        Ok(config_dir.join("restaurant-finder").join("config.toml"))
    }

    /// Root under which every provider keeps its cache and usage files
    pub fn cache_root(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache.directory {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .context("Could not determine cache directory")?;
        Ok(cache_dir.join("restaurant-finder"))
    }

    pub fn provider_paths(&self, kind: ProviderKind) -> Result<ProviderPaths> {
        let root = self.cache_root()?.join(kind.as_str());
        Ok(ProviderPaths {
            cache_dir: root.join("responses"),
            usage_file: root.join("usage.json"),
        })
    }

    pub fn set_api_key(&mut self, kind: ProviderKind, api_key: String) {
        match kind {
            ProviderKind::Google => self.google.api_key = Some(api_key),
            ProviderKind::Yelp => self.yelp.api_key = Some(api_key),
        }
    }

    fn configured_api_key(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Google => self.google.api_key.as_deref(),
            ProviderKind::Yelp => self.yelp.api_key.as_deref(),
        }
    }

    /// Resolve the API key from the environment, the config file, then the home key file
    pub fn api_key(&self, kind: ProviderKind) -> Result<String> {
        let home = dirs::home_dir().unwrap_or_default();
        Ok(self.resolve_api_key(kind, &home)?)
    }

    pub fn resolve_api_key(&self, kind: ProviderKind, home: &Path) -> Result<String, ConfigError> {
        if let Ok(key) = std::env::var(kind.env_var()) {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        if let Some(key) = self.configured_api_key(kind) {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        let key_file = home.join(kind.key_file_name());
        match std::fs::read_to_string(&key_file) {
            Ok(content) if !content.trim().is_empty() => {
                tracing::debug!("Using {} API key from {}", kind.display_name(), key_file.display());
                return Ok(content.trim().to_string());
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Error reading {}: {}", key_file.display(), e),
        }

        Err(ConfigError::MissingApiKey {
            provider: kind,
            env_var: kind.env_var(),
            key_file,
        })
    }
}
