use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Directory name under the user's home that holds all job-search state.
pub const CONFIG_DIR_NAME: &str = ".job_search";

/// Optional overrides file inside the config directory.
pub const SETTINGS_FILE: &str = "settings.yaml";

/// Env var that relocates the config directory.
pub const HOME_ENV: &str = "JOB_SEARCH_HOME";

/// Env var that overrides the API endpoint (proxies, tests).
pub const BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// Runtime settings for a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub model: String,
    pub max_tokens: u32,
    /// Cap on how many web searches the service may run per request.
    #[serde(default)]
    pub max_searches: Option<u32>,
    pub base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_searches: None,
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

impl Settings {
    /// Load settings with deep merge: built-in defaults + `settings.yaml`
    /// overrides from `config_dir`, then the base URL env override.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let mut settings = Self::load_file(config_dir)?;
        if let Ok(url) = std::env::var(BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            settings.base_url = url.trim().to_string();
        }
        Ok(settings)
    }

    /// Defaults merged with `settings.yaml`, ignoring the environment.
    pub fn load_file(config_dir: &Path) -> Result<Self> {
        let mut settings = Self::default();

        let override_path = config_dir.join(SETTINGS_FILE);
        if !override_path.exists() {
            return Ok(settings);
        }

        let contents = std::fs::read_to_string(&override_path)
            .map_err(|e| Error::Config(format!("failed to read settings: {e}")))?;

        // A YAML file with only comments parses to Null — skip in that case.
        let overrides: serde_yaml::Value = serde_yaml::from_str(&contents)?;

        if !overrides.is_null() {
            let base = serde_yaml::to_value(&settings)
                .map_err(|e| Error::Config(format!("failed to serialize defaults: {e}")))?;
            let merged = deep_merge(base, overrides);
            settings = serde_yaml::from_value(merged)
                .map_err(|e| Error::Config(format!("failed to parse merged settings: {e}")))?;
        }

        Ok(settings)
    }
}

/// Recursively merge override into base (override wins on conflict).
fn deep_merge(base: serde_yaml::Value, over: serde_yaml::Value) -> serde_yaml::Value {
    match (base, over) {
        (serde_yaml::Value::Mapping(mut base_map), serde_yaml::Value::Mapping(over_map)) => {
            for (key, over_val) in over_map {
                let merged = if let Some(base_val) = base_map.remove(&key) {
                    deep_merge(base_val, over_val)
                } else {
                    over_val
                };
                base_map.insert(key, merged);
            }
            serde_yaml::Value::Mapping(base_map)
        }
        (_, over) => over,
    }
}

/// Pick the config directory: explicit path, then `JOB_SEARCH_HOME`,
/// then `~/.job_search`.
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(HOME_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir.trim()));
    }
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .ok_or_else(|| Error::Config("could not determine home directory".into()))
}
