//! `$TALLY_HOME/config.toml` and API key loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_core::{Rate, RateTable};
use tally_extract::ClientConfig;
use thiserror::Error;

use crate::state::{ensure_tally_home, tally_home};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set. Set it in a .env file or the environment.")]
    MissingApiKey,

    #[error("parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{0}")]
    Io(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub session: SessionSection,
    /// Overrides the built-in per-model rates when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<PricingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Extra attempts when a reply fails schema validation
    pub repair_attempts: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-4-0125-preview".to_string(),
            base_url: tally_extract::openai::DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            repair_attempts: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    /// Defaults to `$TALLY_HOME/sessions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricingSection {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Config {
    pub fn parse(s: &str, path: PathBuf) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn client_config(&self, api_key: String) -> ClientConfig {
        ClientConfig {
            api_key,
            base_url: self.llm.base_url.clone(),
            temperature: self.llm.temperature,
            timeout: Duration::from_secs(self.llm.timeout_secs),
            repair_attempts: self.llm.repair_attempts,
        }
    }

    pub fn rate_table(&self) -> RateTable {
        let table = RateTable::default();
        match self.pricing {
            Some(p) => table.with_override(Rate::new(p.input_per_million, p.output_per_million)),
            None => table,
        }
    }

    pub fn sessions_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.session.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(tally_home().map_err(|e| ConfigError::Io(e.to_string()))?.join("sessions")),
        }
    }
}

/// Location of the config file; does not touch the filesystem.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_in(&tally_home().map_err(|e| ConfigError::Io(e.to_string()))?))
}

fn config_path_in(home: &Path) -> PathBuf {
    home.join("config.toml")
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&tally_home().map_err(|e| ConfigError::Io(e.to_string()))?)
}

/// Read `config.toml` under `home`, or defaults when it is absent.
pub fn load_config_from(home: &Path) -> Result<Config, ConfigError> {
    let p = config_path_in(home);
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).map_err(|e| ConfigError::Io(format!("read {}: {e}", p.display())))?;
    Config::parse(&s, p)
}

pub fn save_config(cfg: &Config) -> anyhow::Result<PathBuf> {
    let p = config_path_in(&ensure_tally_home()?);
    let s = toml::to_string_pretty(cfg)?;
    fs::write(&p, s).map_err(|e| ConfigError::Io(format!("write {}: {e}", p.display())))?;
    Ok(p)
}

pub fn init_config() -> anyhow::Result<()> {
    let p = config_path_in(&ensure_tally_home()?);
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let p = save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

/// Read the API key, loading `./.env` first when present.
pub fn load_api_key() -> Result<String, ConfigError> {
    dotenv::dotenv().ok();
    api_key_from(std::env::var(API_KEY_VAR).ok())
}

fn api_key_from(value: Option<String>) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingApiKey)
}
