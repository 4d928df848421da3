use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::error::Error;
use crate::render::{LayoutConfig, MAX_DIMENSION};
use crate::retry::RetryConfig;
use crate::types::RepoIdentity;

/// Run configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    /// Bearer credential for the forge API
    pub token: String,
    /// Repository to build the roster for
    pub repo: RepoIdentity,
    /// Forge API base URL
    pub base_url: String,
    /// Retry and per-request timeout policy
    pub retry: RetryConfig,
    /// Image grid dimensions
    pub layout: LayoutConfig,
    /// Directory the SVG is written to
    pub output_dir: PathBuf,
    /// Directory holding persisted contributor orders
    pub state_dir: PathBuf,
    /// Inline avatars as data URIs
    pub embed_avatars: bool,
    /// Skip rendering when the ranking matches the persisted one
    pub skip_unchanged: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = var("FORGE_TOKEN")
            .or_else(|| var("GITHUB_TOKEN"))
            .ok_or(ConfigError::MissingEnvVar("FORGE_TOKEN"))?;
        let owner = var("ROSTER_OWNER").ok_or(ConfigError::MissingEnvVar("ROSTER_OWNER"))?;
        let name = var("ROSTER_REPO").ok_or(ConfigError::MissingEnvVar("ROSTER_REPO"))?;
        if !is_path_segment(&owner) {
            return Err(ConfigError::InvalidValue("ROSTER_OWNER"));
        }
        if !is_path_segment(&name) {
            return Err(ConfigError::InvalidValue("ROSTER_REPO"));
        }
        let repo = RepoIdentity::new(&owner, &name).map_err(|_| ConfigError::InvalidValue("ROSTER_REPO"))?;

        let base_url = var("FORGE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs: u64 = parse_or(var("FORGE_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS, "FORGE_TIMEOUT_SECS")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("FORGE_TIMEOUT_SECS"));
        }
        let max_retries: u32 = parse_or(var("FORGE_MAX_RETRIES"), 3, "FORGE_MAX_RETRIES")?;
        let retry = RetryConfig {
            max_retries,
            attempt_timeout: Duration::from_secs(timeout_secs),
            ..Default::default()
        };

        let defaults = LayoutConfig::default();
        let layout = LayoutConfig {
            image_width: parse_or(var("ROSTER_IMAGE_WIDTH"), defaults.image_width, "ROSTER_IMAGE_WIDTH")?,
            block_size: parse_or(var("ROSTER_BLOCK_SIZE"), defaults.block_size, "ROSTER_BLOCK_SIZE")?,
            items_per_row: parse_or(var("ROSTER_ITEMS_PER_ROW"), defaults.items_per_row, "ROSTER_ITEMS_PER_ROW")?,
        };
        for (key, value) in [
            ("ROSTER_IMAGE_WIDTH", layout.image_width),
            ("ROSTER_BLOCK_SIZE", layout.block_size),
            ("ROSTER_ITEMS_PER_ROW", layout.items_per_row),
        ] {
            if value == 0 || value > MAX_DIMENSION {
                return Err(ConfigError::InvalidValue(key));
            }
        }

        let output_dir = PathBuf::from(var("ROSTER_OUTPUT_DIR").unwrap_or_else(|| "dist".to_string()));
        let state_dir = PathBuf::from(var("ROSTER_STATE_DIR").unwrap_or_else(|| ".contributors".to_string()));

        let embed_avatars = parse_flag(var("ROSTER_EMBED_AVATARS"), true, "ROSTER_EMBED_AVATARS")?;
        let skip_unchanged = parse_flag(var("ROSTER_SKIP_UNCHANGED"), false, "ROSTER_SKIP_UNCHANGED")?;

        Ok(Self {
            token,
            repo,
            base_url,
            retry,
            layout,
            output_dir,
            state_dir,
            embed_avatars,
            skip_unchanged,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("repo", &self.repo)
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("layout", &self.layout)
            .field("output_dir", &self.output_dir)
            .field("state_dir", &self.state_dir)
            .field("embed_avatars", &self.embed_avatars)
            .field("skip_unchanged", &self.skip_unchanged)
            .finish()
    }
}

fn is_path_segment(value: &str) -> bool {
    !value.contains('/') && !value.contains('\\')
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T, key: &'static str) -> Result<T, ConfigError> {
    raw.map_or(Ok(default), |v| v.parse().map_err(|_| ConfigError::InvalidValue(key)))
}

fn parse_flag(raw: Option<String>, default: bool, key: &'static str) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue(key)),
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Configuration(e.to_string())
    }
}
