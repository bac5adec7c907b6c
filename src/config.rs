use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::endpoints::{DEFAULT_BASE_URL, DEFAULT_FACILITY, Endpoints};
use crate::error::SpotError;
use crate::files::DEFAULT_ARCHIVE_ROOT;

pub const CONFIG_FILE: &str = "spot.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub archive_root: Option<String>,
    #[serde(default)]
    pub archive_account: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_url: String,
    pub facility: String,
    pub archive_root: Utf8PathBuf,
    pub archive_account: Option<String>,
    pub username: Option<String>,
    pub timeout: Option<Duration>,
}

impl ResolvedConfig {
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.base_url, &self.facility)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SpotError> {
        let config = Self::load(path.map(Path::new), &Self::candidates())?;
        let mut resolved = Self::resolve_config(config);
        Self::apply_env(&mut resolved, |key| std::env::var(key).ok());
        Ok(resolved)
    }

    pub fn load(path: Option<&Path>, candidates: &[PathBuf]) -> Result<Config, SpotError> {
        match path {
            Some(path) => Self::read(path),
            None => match candidates.iter().find(|candidate| candidate.exists()) {
                Some(found) => Self::read(found),
                None => Ok(Config::default()),
            },
        }
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            facility: config
                .facility
                .unwrap_or_else(|| DEFAULT_FACILITY.to_string()),
            archive_root: Utf8PathBuf::from(
                config
                    .archive_root
                    .unwrap_or_else(|| DEFAULT_ARCHIVE_ROOT.to_string()),
            ),
            archive_account: config.archive_account,
            username: config.username,
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn apply_env<F>(resolved: &mut ResolvedConfig, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|value| !value.trim().is_empty());
        if let Some(value) = var("SPOT_BASE_URL") {
            resolved.base_url = value;
        }
        if let Some(value) = var("SPOT_FACILITY") {
            resolved.facility = value;
        }
        if let Some(value) = var("SPOT_ARCHIVE_ROOT") {
            resolved.archive_root = Utf8PathBuf::from(value);
        }
        if let Some(value) = var("SPOT_ARCHIVE_ACCOUNT") {
            resolved.archive_account = Some(value);
        }
        if let Some(value) = var("SPOT_USERNAME") {
            resolved.username = Some(value);
        }
    }

    fn read(path: &Path) -> Result<Config, SpotError> {
        let content =
            fs::read_to_string(path).map_err(|_| SpotError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| SpotError::ConfigParse(err.to_string()))
    }

    fn candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(CONFIG_FILE));
        }
        if let Some(dirs) = BaseDirs::new() {
            candidates.push(dirs.config_dir().join("als-spot").join(CONFIG_FILE));
        }
        candidates
    }
}
