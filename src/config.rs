use std::{
    env,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Environment variable naming the workspace directory.
pub const WORKSPACE_ENV: &str = "WORKSPACE";

/// File name of the catalog inside the workspace.
pub const CATALOG_FILE_NAME: &str = "general.sfs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WORKSPACE is not set")]
    Unset,
    #[error("workspace {} not found", .0.display())]
    NotFound(PathBuf),
    #[error("workspace {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

/// Where disks and the catalog live. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    root: PathBuf,
}

impl WorkspaceConfig {
    /// Uses `root` as is, without checking it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let root = env::var_os(WORKSPACE_ENV)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Unset)?;
        Self::validated(PathBuf::from(root))
    }

    pub fn validated(root: PathBuf) -> Result<Self, ConfigError> {
        match root.metadata() {
            Ok(meta) if meta.is_dir() => Ok(Self { root }),
            Ok(_) => Err(ConfigError::NotADirectory(root)),
            Err(_) => Err(ConfigError::NotFound(root)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE_NAME)
    }

    /// Backing file of `name`. The name must already be validated.
    pub fn disk_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
