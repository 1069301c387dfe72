//! Per-user runtime paths.
//!
//! Everything ezviewer persists lives in one directory, `~/.ezviewer` by
//! default. Setting `EZVIEWER_HOME` relocates it, which is how tests and
//! side-by-side installs keep their state apart.

use std::path::PathBuf;

/// Environment variable that overrides the application directory.
pub const HOME_ENV: &str = "EZVIEWER_HOME";

const APP_DIR_NAME: &str = ".ezviewer";
const REGISTRY_FILE_NAME: &str = "tracked_logs.json";
const CONFIG_FILE_NAME: &str = "ezviewer.toml";
const PID_FILE_NAME: &str = "ezviewer.pid";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PathError {
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Application directory (`~/.ezviewer` or `$EZVIEWER_HOME`).
pub fn app_dir() -> Result<PathBuf, PathError> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let base = directories::BaseDirs::new().ok_or(PathError::NoHomeDir)?;
    Ok(base.home_dir().join(APP_DIR_NAME))
}

/// Application directory, created if it does not exist yet.
pub fn ensure_app_dir() -> Result<PathBuf, PathError> {
    let dir = app_dir()?;
    std::fs::create_dir_all(&dir).map_err(|source| PathError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

pub fn registry_path() -> Result<PathBuf, PathError> {
    Ok(app_dir()?.join(REGISTRY_FILE_NAME))
}

pub fn config_path() -> Result<PathBuf, PathError> {
    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}

/// PID file of the background server started with `ezviewer start`.
pub fn pid_file_path() -> Result<PathBuf, PathError> {
    Ok(app_dir()?.join(PID_FILE_NAME))
}
