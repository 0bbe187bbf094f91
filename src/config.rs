use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

pub const DB_PATH_ENV: &str = "DB_PATH";
pub const INPUT_DIR_ENV: &str = "INPUT_DIR";
pub const BACKUP_DIR_ENV: &str = "BACKUP_DIR";

pub const DEFAULT_DB_PATH: &str = "data/db/database.db";
pub const DEFAULT_INPUT_DIR: &str = "data/raw";
pub const DEFAULT_BACKUP_DIR: &str = "data/backups";

/// Paths every command works against, resolved once per process from
/// command-line flags, then environment variables, then defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input_dir: PathBuf,
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        Self::resolve_with(overrides, |key| std::env::var_os(key))
    }

    pub fn resolve_with<F>(overrides: ConfigOverrides, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let pick = |explicit: Option<PathBuf>, key: &str, default: &str| {
            explicit
                .or_else(|| {
                    lookup(key)
                        .filter(|value| !value.is_empty())
                        .map(PathBuf::from)
                })
                .unwrap_or_else(|| PathBuf::from(default))
        };

        Self {
            input_dir: pick(overrides.input_dir, INPUT_DIR_ENV, DEFAULT_INPUT_DIR),
            db_path: pick(overrides.db_path, DB_PATH_ENV, DEFAULT_DB_PATH),
            backup_dir: pick(overrides.backup_dir, BACKUP_DIR_ENV, DEFAULT_BACKUP_DIR),
        }
    }

    pub fn require_input_dir(&self) -> Result<&Path> {
        if !self.input_dir.is_dir() {
            bail!("input directory not found: {}", self.input_dir.display());
        }
        Ok(&self.input_dir)
    }

    pub fn require_store(&self) -> Result<&Path> {
        if !self.db_path.is_file() {
            bail!("database file not found: {}", self.db_path.display());
        }
        Ok(&self.db_path)
    }
}
