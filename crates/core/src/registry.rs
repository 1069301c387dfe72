//! Alias registry: alias → absolute log file path, persisted as JSON.
//!
//! The document is the only source of truth. Every operation re-reads it, so
//! edits made by the CLI while a server is running become visible to the
//! next connection without any coordination. Mutations rewrite the whole
//! document through a temp file and a rename.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// One registered log: alias plus the absolute path it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedLog {
    pub alias: String,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("Alias '{0}' already exists")]
    DuplicateAlias(String),
    #[error("Alias '{0}' does not exist")]
    UnknownAlias(String),
    #[error("Log file '{0}' not found")]
    FileNotFound(String),
    #[error("registry I/O error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("registry document {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Path(#[from] crate::paths::PathError),
}

/// Data-access handle over a single registry document.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    /// Registry at the default per-user location.
    pub fn open_default() -> Result<Self, RegistryError> {
        crate::paths::ensure_app_dir()?;
        Ok(Self::open(crate::paths::registry_path()?))
    }

    /// Registry backed by an explicit document path.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current mapping, ordered by alias.
    pub fn list(&self) -> Result<BTreeMap<String, PathBuf>, RegistryError> {
        self.load()
    }

    /// Resolve a single alias against the current document.
    pub fn get(&self, alias: &str) -> Result<Option<PathBuf>, RegistryError> {
        Ok(self.load()?.remove(alias))
    }

    pub fn add(&self, alias: &str, path: &Path) -> Result<TrackedLog, RegistryError> {
        let mut logs = self.load()?;
        if logs.contains_key(alias) {
            return Err(RegistryError::DuplicateAlias(alias.to_string()));
        }
        let resolved = resolve_log_file(path)?;
        logs.insert(alias.to_string(), resolved.clone());
        self.save(&logs)?;
        tracing::debug!("registered {} -> {}", alias, resolved.display());
        Ok(TrackedLog {
            alias: alias.to_string(),
            path: resolved,
        })
    }

    pub fn update(&self, alias: &str, path: &Path) -> Result<TrackedLog, RegistryError> {
        let mut logs = self.load()?;
        if !logs.contains_key(alias) {
            return Err(RegistryError::UnknownAlias(alias.to_string()));
        }
        let resolved = resolve_log_file(path)?;
        logs.insert(alias.to_string(), resolved.clone());
        self.save(&logs)?;
        tracing::debug!("updated {} -> {}", alias, resolved.display());
        Ok(TrackedLog {
            alias: alias.to_string(),
            path: resolved,
        })
    }

    pub fn remove(&self, alias: &str) -> Result<(), RegistryError> {
        let mut logs = self.load()?;
        if logs.remove(alias).is_none() {
            return Err(RegistryError::UnknownAlias(alias.to_string()));
        }
        self.save(&logs)?;
        tracing::debug!("removed {}", alias);
        Ok(())
    }

    fn load(&self) -> Result<BTreeMap<String, PathBuf>, RegistryError> {
        if !self.path.exists() {
            self.save(&BTreeMap::new())?;
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| self.io_err(source))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|source| RegistryError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, logs: &BTreeMap<String, PathBuf>) -> Result<(), RegistryError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|source| self.io_err(source))?;
        let mut body = serde_json::to_string_pretty(logs).map_err(|source| RegistryError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        body.push('\n');

        // Unique temp name per writer, renamed over the document.
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| self.io_err(source))?;
        tmp.write_all(body.as_bytes())
            .map_err(|source| self.io_err(source))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_err(e.error))?;
        Ok(())
    }

    fn io_err(&self, source: io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Canonical absolute path of `path`, which must be an existing regular file.
fn resolve_log_file(path: &Path) -> Result<PathBuf, RegistryError> {
    let not_found = || RegistryError::FileNotFound(path.display().to_string());
    if !path.is_file() {
        return Err(not_found());
    }
    std::fs::canonicalize(path).map_err(|_| not_found())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Registry, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("app").join("tracked_logs.json"));
        let log = dir.path().join("app.log");
        std::fs::write(&log, "hello\n").unwrap();
        (dir, registry, log)
    }

    #[test]
    fn test_missing_document_is_created_empty() {
        let (_dir, registry, _log) = setup();
        assert!(registry.list().unwrap().is_empty());
        assert!(registry.path().exists());
        assert_eq!(
            std::fs::read_to_string(registry.path()).unwrap().trim(),
            "{}"
        );
    }

    #[test]
    fn test_add_then_list_has_canonical_path() {
        let (_dir, registry, log) = setup();
        registry.add("api", &log).unwrap();

        let logs = registry.list().unwrap();
        assert_eq!(logs.get("api"), Some(&std::fs::canonicalize(&log).unwrap()));
        assert!(logs["api"].is_absolute());
    }

    #[test]
    fn test_duplicate_add_leaves_registry_unchanged() {
        let (dir, registry, log) = setup();
        registry.add("api", &log).unwrap();
        let before = std::fs::read(registry.path()).unwrap();

        let other = dir.path().join("other.log");
        std::fs::write(&other, "").unwrap();
        let err = registry.add("api", &other).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAlias(a) if a == "api"));
        assert_eq!(std::fs::read(registry.path()).unwrap(), before);
    }

    #[test]
    fn test_add_missing_file_fails() {
        let (dir, registry, _log) = setup();
        let err = registry.add("ghost", &dir.path().join("ghost.log")).unwrap_err();
        assert!(matches!(err, RegistryError::FileNotFound(_)));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_add_directory_fails() {
        let (dir, registry, _log) = setup();
        let err = registry.add("dir", dir.path()).unwrap_err();
        assert!(matches!(err, RegistryError::FileNotFound(_)));
    }

    #[test]
    fn test_update_changes_path() {
        let (dir, registry, log) = setup();
        registry.add("api", &log).unwrap();
        let rotated = dir.path().join("rotated.log");
        std::fs::write(&rotated, "").unwrap();

        let tracked = registry.update("api", &rotated).unwrap();
        assert_eq!(tracked.path, std::fs::canonicalize(&rotated).unwrap());
        assert_eq!(registry.get("api").unwrap(), Some(tracked.path));
    }

    #[test]
    fn test_update_unknown_alias_fails() {
        let (_dir, registry, log) = setup();
        let err = registry.update("nope", &log).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownAlias(_)));
    }

    #[test]
    fn test_remove_unknown_alias_leaves_document_untouched() {
        let (_dir, registry, log) = setup();
        registry.add("api", &log).unwrap();
        let before = std::fs::read(registry.path()).unwrap();

        let err = registry.remove("nope").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownAlias(a) if a == "nope"));
        assert_eq!(std::fs::read(registry.path()).unwrap(), before);
    }

    #[test]
    fn test_remove_deletes_alias() {
        let (_dir, registry, log) = setup();
        registry.add("api", &log).unwrap();
        registry.remove("api").unwrap();
        assert_eq!(registry.get("api").unwrap(), None);
    }

    #[test]
    fn test_document_is_indented_json_object() {
        let (_dir, registry, log) = setup();
        registry.add("api", &log).unwrap();
        let raw = std::fs::read_to_string(registry.path()).unwrap();
        assert!(raw.starts_with("{\n  \"api\": "));
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["api"].is_string());
    }

    #[test]
    fn test_concurrent_writers_each_succeed() {
        let (dir, registry, log) = setup();
        registry.add("api", &log).unwrap();
        let targets: Vec<PathBuf> = (0..8)
            .map(|i| {
                let path = dir.path().join(format!("rotated-{i}.log"));
                std::fs::write(&path, "").unwrap();
                path
            })
            .collect();

        std::thread::scope(|scope| {
            for target in &targets {
                let registry = registry.clone();
                scope.spawn(move || {
                    for _ in 0..25 {
                        registry.update("api", target).unwrap();
                    }
                });
            }
        });

        let path = registry.get("api").unwrap().unwrap();
        assert!(targets
            .iter()
            .any(|t| std::fs::canonicalize(t).unwrap() == path));
        let leftovers: Vec<_> = std::fs::read_dir(registry.path().parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("tracked_logs.json")]);
    }

    #[test]
    fn test_external_edits_are_visible() {
        let (_dir, registry, log) = setup();
        registry.add("api", &log).unwrap();
        let other_handle = Registry::open(registry.path());
        other_handle.remove("api").unwrap();
        assert!(registry.list().unwrap().is_empty());
    }
}
