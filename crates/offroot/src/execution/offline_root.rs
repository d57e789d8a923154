//! Running helpers chrooted into an offline root without real root
//!
//! Order of operations in the child, before exec:
//! 1. Enter a user namespace as namespace-root (unless already root)
//! 2. Chroot into the offline root
//! 3. Exec, with `PATH` resolved inside the new root
//!
//! The working directory is left as inherited.

use log::{debug, error};
use nix::errno::Errno;
use nix::unistd::{chroot, geteuid};
use offroot_core::{PrivilegeMode, Result};
use offroot_namespace::PrivilegeMapper;
use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use super::process::{PreExec, ProcessRunner, ProcessSpec};
use super::report::ChildFailure;
use super::result::ExecutionResult;
use crate::config::RunnerConfig;

/// Runs commands either on the host or inside an offline root
#[derive(Debug, Clone, Default)]
pub struct OfflineRootRunner {
    runner: ProcessRunner,
    mapper: PrivilegeMapper,
    mode: PrivilegeMode,
}

impl OfflineRootRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        Ok(Self {
            runner: ProcessRunner::new(),
            mapper: config.mapper()?,
            mode: config.privilege_mode,
        })
    }

    pub fn with_privilege_mode(mut self, mode: PrivilegeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_mapper(mut self, mapper: PrivilegeMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn privilege_mode(&self) -> PrivilegeMode {
        self.mode
    }

    /// Run `spec`, chrooted into `root` when one is given.
    ///
    /// With `root = None` this is exactly [`ProcessRunner::run`]. The root is
    /// not checked up front; a missing directory shows up as `ChrootFailed`.
    pub fn run(&self, spec: &ProcessSpec, root: Option<&Path>) -> ExecutionResult {
        let Some(root) = root else {
            return self.runner.run(spec);
        };

        let root = match CString::new(root.as_os_str().as_bytes()) {
            Ok(root) => root,
            Err(_) => {
                error!("Failed to chroot to offline root: path contains a NUL byte");
                return ExecutionResult::ChrootFailed(Errno::EINVAL);
            }
        };

        debug!(
            "Running {} in offline root {} ({:?})",
            spec.program_lossy(),
            root.to_string_lossy(),
            self.mode
        );

        let step = EnterOfflineRoot {
            root: &root,
            mapper: &self.mapper,
            mode: self.mode,
        };
        self.runner.run_with(spec, Some(&step))
    }
}

/// Pre-exec step: namespace-root first, then chroot
struct EnterOfflineRoot<'a> {
    root: &'a CStr,
    mapper: &'a PrivilegeMapper,
    mode: PrivilegeMode,
}

// SAFETY: geteuid, PrivilegeMapper::enter and chroot are plain syscalls over
// stack buffers and parent-prepared C strings.
unsafe impl PreExec for EnterOfflineRoot<'_> {
    fn pre_exec(&self) -> std::result::Result<(), ChildFailure> {
        // An unprivileged chroot always fails; never attempt it without
        // namespace-root.
        if self.mode.resolve(geteuid().is_root()).needs_user_namespace() {
            self.mapper.enter().map_err(ChildFailure::Mapping)?;
        }

        chroot(self.root).map_err(ChildFailure::Chroot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serial_guard;
    use offroot_namespace::{ControlSurface, MappingError};

    fn touch(path: &Path) -> ProcessSpec {
        ProcessSpec::new(["/bin/sh", "-c", &format!("touch {}", path.display())]).unwrap()
    }

    #[test]
    fn no_root_behaves_like_plain_runner() {
        let _guard = serial_guard();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");

        let result = OfflineRootRunner::new().run(&touch(&marker), None);

        assert_eq!(result, ExecutionResult::Success);
        assert!(marker.exists());
    }

    #[test]
    fn mapping_failure_skips_chroot_and_exec() {
        let _guard = serial_guard();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let runner = OfflineRootRunner::new()
            .with_privilege_mode(PrivilegeMode::Unprivileged)
            .with_mapper(PrivilegeMapper::with_proc_root(dir.path().join("no-proc")).unwrap());

        let result = runner.run(&touch(&marker), Some(dir.path()));

        match result {
            ExecutionResult::MappingFailed(MappingError::Unshare(_)) => {}
            ExecutionResult::MappingFailed(MappingError::Open { surface, errno }) => {
                assert_eq!(surface, ControlSurface::UidMap);
                assert_eq!(errno, Errno::ENOENT);
            }
            other => panic!("expected mapping failure, got {:?}", other),
        }
        assert!(!marker.exists());
    }

    #[test]
    fn privileged_mode_without_root_fails_at_chroot() {
        if offroot_core::util::is_root() {
            return;
        }
        let _guard = serial_guard();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let runner = OfflineRootRunner::new().with_privilege_mode(PrivilegeMode::Privileged);

        let result = runner.run(&touch(&marker), Some(dir.path()));

        assert_eq!(result, ExecutionResult::ChrootFailed(Errno::EPERM));
        assert!(!marker.exists());
    }

    #[test]
    fn nul_in_root_is_rejected_without_spawning() {
        let spec = ProcessSpec::new(["true"]).unwrap();
        let root = Path::new(std::ffi::OsStr::from_bytes(b"/srv/im\0age"));
        assert_eq!(
            OfflineRootRunner::new().run(&spec, Some(root)),
            ExecutionResult::ChrootFailed(Errno::EINVAL)
        );
    }

    #[test]
    fn from_config_takes_mode_and_proc_root() {
        let config = RunnerConfig::default().with_privilege_mode(PrivilegeMode::Privileged);
        let runner = OfflineRootRunner::from_config(&config).unwrap();
        assert_eq!(runner.privilege_mode(), PrivilegeMode::Privileged);
    }
}
