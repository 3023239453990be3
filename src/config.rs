use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, io::Write, path::PathBuf, time::Duration};

use crate::constants::{
    CACHE_FILE_NAME, COMPANY_NAME, CONFIG_FILE_NAME, DEFAULT_GRACE_MS, DEFAULT_WATCHDOG_MS,
    PRODUCT_NAME, PROJECT_QUALIFIER,
};
use crate::solver::{SearchOptions, StrategyKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub strategy: StrategyKind,
    pub search: SearchOptions,
    pub grace_ms: u64,
    /// Run ceiling for searches without `search.timeout_ms`.
    pub watchdog_ms: u64,
    /// Overrides the learned-depth cache location under the data directory.
    pub cache_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            search: SearchOptions::default(),
            grace_ms: DEFAULT_GRACE_MS,
            watchdog_ms: DEFAULT_WATCHDOG_MS,
            cache_file: None,
        }
    }
}

impl Config {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    pub fn cache_path(&self, paths: &Paths) -> PathBuf {
        self.cache_file
            .clone()
            .unwrap_or_else(|| paths.cache_file.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub cfg_file: PathBuf,
    pub cfg_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub cache_file: PathBuf,
}

pub fn project_paths() -> Result<Paths> {
    let dirs = ProjectDirs::from(PROJECT_QUALIFIER, COMPANY_NAME, PRODUCT_NAME)
        .context("Failed to determine project directories")?;
    let cfg_dir = dirs.config_dir().to_path_buf();
    let data_dir = dirs.data_local_dir().to_path_buf();
    Ok(Paths {
        cfg_file: cfg_dir.join(CONFIG_FILE_NAME),
        cfg_dir,
        log_dir: data_dir.join("logs"),
        cache_file: data_dir.join(CACHE_FILE_NAME),
        data_dir,
    })
}

pub fn load_or_default() -> Result<(Config, Paths)> {
    let paths = project_paths()?;
    fs::create_dir_all(&paths.cfg_dir).ok();
    fs::create_dir_all(&paths.data_dir).ok();
    fs::create_dir_all(&paths.log_dir).ok();
    Ok((load_from(&paths), paths))
}

/// Reads the config at `paths.cfg_file`; a missing or malformed file gives
/// the defaults.
pub fn load_from(paths: &Paths) -> Config {
    match fs::read_to_string(&paths.cfg_file) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(error = %e, path = ?paths.cfg_file, "malformed config; using defaults");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn save_atomic(cfg: &Config, paths: &Paths) -> Result<()> {
    fs::create_dir_all(&paths.cfg_dir).ok();
    let tmp = paths.cfg_file.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(cfg)?;
    {
        let mut f = fs::File::create(&tmp).context("create temp cfg")?;
        f.write_all(&data).context("write temp cfg")?;
        f.sync_all().ok();
    }
    fs::rename(&tmp, &paths.cfg_file).context("rename temp to final")?;
    Ok(())
}
