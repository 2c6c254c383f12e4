use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;

/// Base directory from the environment, if set.
pub fn base_path() -> Option<PathBuf> {
    std::env::var("STARSDB_BASE_PATH").ok().map(PathBuf::from)
}

pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
    cache_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        if let Some(base) = base_path() {
            return Ok(Self::from_base(&base));
        }

        let base = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
            .join("starsdb");
        Ok(Self::from_base(&base))
    }

    /// Everything under one root: config at the top, data/cache/logs in subdirs.
    pub fn from_base(base: &Path) -> Self {
        Self {
            config_dir: base.to_path_buf(),
            data_dir: base.join("data"),
            cache_dir: base.join("cache"),
            log_dir: base.join("logs"),
        }
    }

    /// Apply the directory overrides from a loaded config.
    pub fn with_overrides(mut self, config: &Config) -> Self {
        if let Some(ref data_dir) = config.store.data_dir {
            self.data_dir = data_dir.clone();
        }
        if let Some(ref root) = config.cache.root {
            self.cache_dir = root.clone();
        }
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn image_dir(&self) -> PathBuf {
        self.data_dir.join("Images")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("starsdb.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        std::fs::create_dir_all(self.image_dir())?;
        debug!("Ensured starsdb directories under {:?}", self.config_dir);
        Ok(())
    }
}
