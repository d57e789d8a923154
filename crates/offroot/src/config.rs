//! Runner configuration
//!
//! Loaded from JSON or built in code; the CLI layers its flags on top.

use offroot_core::{ExecError, PrivilegeMode, Result};
use offroot_namespace::PrivilegeMapper;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Directory to chroot helpers into. Passed through as-is; it is not
    /// checked until the child tries to chroot.
    pub offline_root: Option<PathBuf>,
    /// When to enter a user namespace before chroot
    pub privilege_mode: PrivilegeMode,
    /// Where procfs is mounted
    pub proc_root: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            offline_root: None,
            privilege_mode: PrivilegeMode::Auto,
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl RunnerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExecError::InvalidConfig(format!("Invalid runner config: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn with_offline_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.offline_root = Some(root.into());
        self
    }

    pub fn with_privilege_mode(mut self, mode: PrivilegeMode) -> Self {
        self.privilege_mode = mode;
        self
    }

    pub fn offline_root(&self) -> Option<&Path> {
        self.offline_root.as_deref()
    }

    pub fn mapper(&self) -> Result<PrivilegeMapper> {
        PrivilegeMapper::with_proc_root(&self.proc_root).map_err(|e| {
            ExecError::InvalidConfig(format!(
                "Invalid proc root {}: {}",
                self.proc_root.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_on_host() {
        let config = RunnerConfig::default();
        assert!(config.offline_root().is_none());
        assert_eq!(config.privilege_mode, PrivilegeMode::Auto);
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
    }

    #[test]
    fn parses_partial_json() {
        let config = RunnerConfig::from_json_str(
            r#"{ "offline_root": "/srv/rootfs", "privilege_mode": "unprivileged" }"#,
        )
        .unwrap();
        assert_eq!(config.offline_root(), Some(Path::new("/srv/rootfs")));
        assert_eq!(config.privilege_mode, PrivilegeMode::Unprivileged);
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = RunnerConfig::from_json_str(r#"{ "offline_rot": "/srv" }"#).unwrap_err();
        assert!(matches!(err, ExecError::InvalidConfig(_)));
    }

    #[test]
    fn offline_root_is_not_checked_for_existence() {
        let config = RunnerConfig::default().with_offline_root("/does/not/exist");
        assert_eq!(config.offline_root(), Some(Path::new("/does/not/exist")));
        assert!(config.mapper().is_ok());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.json");
        fs::write(&path, r#"{ "privilege_mode": "privileged" }"#).unwrap();

        let config = RunnerConfig::from_file(&path).unwrap();
        assert_eq!(config.privilege_mode, PrivilegeMode::Privileged);

        let missing = RunnerConfig::from_file(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ExecError::Io(_))));
    }
}
