//! User namespace entry and UID/GID mapping from inside the child
//!
//! Unlike a supervisor that writes `/proc/{pid}/uid_map` for its child, the
//! child here maps itself: it unshares a fresh user namespace and then writes
//! its own control files, so the caller's effective UID/GID become 0 inside.
//! The kernel only accepts the group mapping from an unprivileged writer after
//! `setgroups` has been set to `deny`, which fixes the write order to
//! uid_map, setgroups, gid_map.

use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::sched::{unshare, CloneFlags};
use nix::sys::stat::Mode;
use nix::unistd::{getegid, geteuid, getpid, Gid, Pid, Uid};
use std::ffi::{CStr, CString};
use std::fmt::{self, Write as _};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use thiserror::Error;

use crate::stack_buf::StackBuf;

pub const DEFAULT_PROC_ROOT: &CStr = c"/proc";

const PATH_CAPACITY: usize = 256;
const LINE_CAPACITY: usize = 64;
/// Room left after the proc root for "/<pid>/<control file>"
const PATH_SUFFIX_RESERVE: usize = 40;

/// A per-process file under `/proc/<pid>/` that controls the user namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSurface {
    UidMap,
    SetGroups,
    GidMap,
}

impl ControlSurface {
    /// The only order in which the kernel accepts an unprivileged mapping
    pub const ORDERED: [ControlSurface; 3] = [
        ControlSurface::UidMap,
        ControlSurface::SetGroups,
        ControlSurface::GidMap,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ControlSurface::UidMap => "uid_map",
            ControlSurface::SetGroups => "setgroups",
            ControlSurface::GidMap => "gid_map",
        }
    }

    pub fn index(self) -> u8 {
        match self {
            ControlSurface::UidMap => 0,
            ControlSurface::SetGroups => 1,
            ControlSurface::GidMap => 2,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ORDERED.get(usize::from(index)).copied()
    }
}

impl fmt::Display for ControlSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Failure of one step of the mapping sequence.
///
/// `Copy` and allocation-free so a child can hand it to its parent through a
/// fixed-size report.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    #[error("failed to unshare the user namespace: {0}")]
    Unshare(Errno),

    #[error("failed to open {surface}: {errno}")]
    Open { surface: ControlSurface, errno: Errno },

    #[error("failed to write {surface}: {errno}")]
    Write { surface: ControlSurface, errno: Errno },
}

impl MappingError {
    pub fn errno(&self) -> Errno {
        match *self {
            MappingError::Unshare(errno)
            | MappingError::Open { errno, .. }
            | MappingError::Write { errno, .. } => errno,
        }
    }

    /// The control surface involved, if the failure happened after unshare
    pub fn surface(&self) -> Option<ControlSurface> {
        match *self {
            MappingError::Unshare(_) => None,
            MappingError::Open { surface, .. } | MappingError::Write { surface, .. } => {
                Some(surface)
            }
        }
    }
}

/// The child's identity captured before it leaves the parent's user namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityMapping {
    pub pid: Pid,
    pub uid: Uid,
    pub gid: Gid,
}

impl IdentityMapping {
    pub fn capture() -> Self {
        Self {
            pid: getpid(),
            uid: geteuid(),
            gid: getegid(),
        }
    }

    /// Format the exact bytes written to `surface`
    pub fn write_line<const N: usize>(
        &self,
        surface: ControlSurface,
        out: &mut StackBuf<N>,
    ) -> fmt::Result {
        match surface {
            ControlSurface::UidMap => writeln!(out, "0 {} 1", self.uid.as_raw()),
            ControlSurface::SetGroups => out.push_bytes(b"deny"),
            ControlSurface::GidMap => writeln!(out, "0 {} 1", self.gid.as_raw()),
        }
    }
}

/// Maps the calling identity to root inside a new user namespace.
#[derive(Debug, Clone)]
pub struct PrivilegeMapper {
    proc_root: CString,
}

impl Default for PrivilegeMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegeMapper {
    pub fn new() -> Self {
        Self {
            proc_root: DEFAULT_PROC_ROOT.to_owned(),
        }
    }

    /// Use a procfs mounted somewhere other than `/proc`.
    ///
    /// Fails with `EINVAL` for paths containing NUL and `ENAMETOOLONG` for
    /// paths that leave no room for the per-process suffix.
    pub fn with_proc_root(path: impl AsRef<Path>) -> Result<Self, Errno> {
        let bytes = path.as_ref().as_os_str().as_bytes();
        if bytes.len() + PATH_SUFFIX_RESERVE >= PATH_CAPACITY {
            return Err(Errno::ENAMETOOLONG);
        }
        let proc_root = CString::new(bytes).map_err(|_| Errno::EINVAL)?;
        Ok(Self { proc_root })
    }

    pub fn proc_root(&self) -> &CStr {
        &self.proc_root
    }

    /// Enter a new user namespace as root.
    ///
    /// Only call this from a freshly duplicated, single-threaded child that
    /// is about to exec: it changes the namespace of the calling process and
    /// performs no cleanup if a later step fails. Nothing here allocates.
    pub fn enter(&self) -> Result<IdentityMapping, MappingError> {
        let identity = IdentityMapping::capture();

        unshare(CloneFlags::CLONE_NEWUSER).map_err(MappingError::Unshare)?;

        for surface in ControlSurface::ORDERED {
            self.write_surface(&identity, surface)?;
        }

        Ok(identity)
    }

    fn write_surface(
        &self,
        identity: &IdentityMapping,
        surface: ControlSurface,
    ) -> Result<(), MappingError> {
        let open_failed = |errno| MappingError::Open { surface, errno };
        let write_failed = |errno| MappingError::Write { surface, errno };

        let mut path = StackBuf::<PATH_CAPACITY>::new();
        path.push_bytes(self.proc_root.to_bytes())
            .and_then(|_| write!(path, "/{}/{}", identity.pid.as_raw(), surface.file_name()))
            .map_err(|_| open_failed(Errno::ENAMETOOLONG))?;
        let path = path.as_cstr().ok_or(open_failed(Errno::EINVAL))?;

        let raw = open(path, OFlag::O_RDWR | OFlag::O_CLOEXEC, Mode::empty()).map_err(open_failed)?;
        // SAFETY: `open` just returned this descriptor and nothing else owns it
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut line = StackBuf::<LINE_CAPACITY>::new();
        identity
            .write_line(surface, &mut line)
            .map_err(|_| write_failed(Errno::EOVERFLOW))?;

        let bytes = line.as_bytes();
        // SAFETY: `fd` is open for the duration of the call and `bytes` is a
        // live stack buffer.
        let rc = unsafe { libc::write(fd.as_raw_fd(), bytes.as_ptr().cast(), bytes.len()) };
        let written = Errno::result(rc).map_err(write_failed)?;
        if written as usize != bytes.len() {
            return Err(write_failed(Errno::EIO));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(uid: u32, gid: u32) -> IdentityMapping {
        IdentityMapping {
            pid: Pid::from_raw(4242),
            uid: Uid::from_raw(uid),
            gid: Gid::from_raw(gid),
        }
    }

    fn line(identity: &IdentityMapping, surface: ControlSurface) -> Vec<u8> {
        let mut buf = StackBuf::<LINE_CAPACITY>::new();
        identity.write_line(surface, &mut buf).unwrap();
        buf.as_bytes().to_vec()
    }

    #[test]
    fn map_lines_point_namespace_root_at_caller() {
        let id = identity(1000, 1001);
        assert_eq!(line(&id, ControlSurface::UidMap), b"0 1000 1\n");
        assert_eq!(line(&id, ControlSurface::SetGroups), b"deny");
        assert_eq!(line(&id, ControlSurface::GidMap), b"0 1001 1\n");
    }

    #[test]
    fn setgroups_comes_between_uid_and_gid_maps() {
        assert_eq!(
            ControlSurface::ORDERED,
            [
                ControlSurface::UidMap,
                ControlSurface::SetGroups,
                ControlSurface::GidMap
            ]
        );
    }

    #[test]
    fn surface_index_round_trips() {
        for surface in ControlSurface::ORDERED {
            assert_eq!(ControlSurface::from_index(surface.index()), Some(surface));
        }
        assert_eq!(ControlSurface::from_index(3), None);
    }

    #[test]
    fn error_names_surface_and_operation() {
        let err = MappingError::Write {
            surface: ControlSurface::GidMap,
            errno: Errno::EPERM,
        };
        assert!(err.to_string().contains("write gid_map"));
        assert_eq!(err.errno(), Errno::EPERM);
        assert_eq!(err.surface(), Some(ControlSurface::GidMap));

        let err = MappingError::Unshare(Errno::EINVAL);
        assert_eq!(err.surface(), None);
    }

    #[test]
    fn proc_root_rejects_nul_and_long_paths() {
        assert_eq!(
            PrivilegeMapper::with_proc_root("/pr\0oc").unwrap_err(),
            Errno::EINVAL
        );
        let long = format!("/{}", "p".repeat(PATH_CAPACITY));
        assert_eq!(
            PrivilegeMapper::with_proc_root(long).unwrap_err(),
            Errno::ENAMETOOLONG
        );
        let mapper = PrivilegeMapper::with_proc_root("/mnt/proc").unwrap();
        assert_eq!(mapper.proc_root().to_bytes(), b"/mnt/proc");
        assert_eq!(PrivilegeMapper::default().proc_root(), DEFAULT_PROC_ROOT);
    }

    /// Run `f` in a forked child and return its exit code
    fn in_child(f: impl FnOnce() -> i32) -> i32 {
        unsafe {
            let pid = libc::fork();
            assert!(pid >= 0, "fork failed: {}", std::io::Error::last_os_error());
            if pid == 0 {
                let code = f();
                libc::_exit(code);
            }
            let mut status: i32 = 0;
            libc::waitpid(pid, &mut status, 0);
            assert!(libc::WIFEXITED(status), "child should exit normally");
            libc::WEXITSTATUS(status)
        }
    }

    #[test]
    fn missing_control_surface_stops_at_uid_map() {
        let dir = tempfile::tempdir().unwrap();
        let mapper = PrivilegeMapper::with_proc_root(dir.path().join("absent")).unwrap();

        let code = in_child(|| match mapper.enter() {
            // Kernels without unprivileged user namespaces refuse before any
            // control surface is touched.
            Err(MappingError::Unshare(_)) => 10,
            Err(MappingError::Open {
                surface: ControlSurface::UidMap,
                errno: Errno::ENOENT,
            }) => 11,
            Err(_) => 2,
            Ok(_) => 3,
        });

        assert!(code == 10 || code == 11, "unexpected child code {code}");
    }

    #[test]
    fn enter_makes_caller_namespace_root() {
        let code = in_child(|| match PrivilegeMapper::new().enter() {
            Ok(_) => {
                if geteuid().is_root() && getegid().as_raw() == 0 {
                    0
                } else {
                    1
                }
            }
            Err(_) => 77,
        });

        if code == 77 {
            eprintln!("skipping: unprivileged user namespaces unavailable");
            return;
        }
        assert_eq!(code, 0);
    }
}
