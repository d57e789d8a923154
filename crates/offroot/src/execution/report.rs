//! Fixed-size failure report sent from a child to its parent before `_exit`
//!
//! The child writes one report to a close-on-exec pipe when anything between
//! clone and exec fails. A successful exec closes the pipe with nothing
//! written, so the parent never has to guess from the sentinel exit code.

use nix::errno::Errno;
use offroot_namespace::{ControlSurface, MappingError};

use super::result::ExecutionResult;

pub(crate) const REPORT_LEN: usize = 8;

const KIND_EXEC: u8 = 1;
const KIND_MAPPING: u8 = 2;
const KIND_CHROOT: u8 = 3;

const STEP_UNSHARE: u8 = 0;
const STEP_OPEN: u8 = 1;
const STEP_WRITE: u8 = 2;

/// Why a child gave up before (or instead of) running its target program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildFailure {
    Exec(Errno),
    Mapping(MappingError),
    Chroot(Errno),
}

impl ChildFailure {
    /// Layout: kind, mapping step, control surface, padding, errno (LE i32)
    pub(crate) fn encode(self) -> [u8; REPORT_LEN] {
        let (kind, step, surface, errno) = match self {
            ChildFailure::Exec(errno) => (KIND_EXEC, 0, 0, errno),
            ChildFailure::Chroot(errno) => (KIND_CHROOT, 0, 0, errno),
            ChildFailure::Mapping(err) => {
                let step = match err {
                    MappingError::Unshare(_) => STEP_UNSHARE,
                    MappingError::Open { .. } => STEP_OPEN,
                    MappingError::Write { .. } => STEP_WRITE,
                };
                let surface = err.surface().map_or(0, ControlSurface::index);
                (KIND_MAPPING, step, surface, err.errno())
            }
        };

        let mut report = [0u8; REPORT_LEN];
        report[0] = kind;
        report[1] = step;
        report[2] = surface;
        report[4..].copy_from_slice(&(errno as i32).to_le_bytes());
        report
    }

    pub(crate) fn decode(bytes: &[u8]) -> Option<Self> {
        let report: [u8; REPORT_LEN] = bytes.try_into().ok()?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&report[4..]);
        let errno = Errno::from_raw(i32::from_le_bytes(raw));

        match report[0] {
            KIND_EXEC => Some(ChildFailure::Exec(errno)),
            KIND_CHROOT => Some(ChildFailure::Chroot(errno)),
            KIND_MAPPING => {
                let err = match report[1] {
                    STEP_UNSHARE => MappingError::Unshare(errno),
                    STEP_OPEN => MappingError::Open {
                        surface: ControlSurface::from_index(report[2])?,
                        errno,
                    },
                    STEP_WRITE => MappingError::Write {
                        surface: ControlSurface::from_index(report[2])?,
                        errno,
                    },
                    _ => return None,
                };
                Some(ChildFailure::Mapping(err))
            }
            _ => None,
        }
    }
}

impl From<ChildFailure> for ExecutionResult {
    fn from(failure: ChildFailure) -> Self {
        match failure {
            ChildFailure::Exec(errno) => ExecutionResult::ExecFailed(errno),
            ChildFailure::Mapping(err) => ExecutionResult::MappingFailed(err),
            ChildFailure::Chroot(errno) => ExecutionResult::ChrootFailed(errno),
        }
    }
}
