//! Structured outcome of one child process

use nix::errno::Errno;
use nix::sys::signal::Signal;
use offroot_core::{ExecError, Result};
use offroot_namespace::MappingError;
use std::fmt;

/// What happened to a spawned command. Exactly one variant per invocation.
///
/// Only `Success` and `NonZeroExit` mean the target program actually ran to
/// completion; everything else is a failure of the launch itself or a kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Exited with code 0
    Success,
    /// Exited normally with a code in 1..=255
    NonZeroExit(u8),
    /// Terminated by the given signal number
    Signaled(i32),
    /// The duplication primitive failed
    SpawnFailed(Errno),
    /// The program image could not be replaced (missing, not executable, ...)
    ExecFailed(Errno),
    /// Entering the user namespace failed; chroot and exec were skipped
    MappingFailed(MappingError),
    /// Changing the root failed; exec was skipped
    ChrootFailed(Errno),
    /// waitpid failed or returned a status that is neither exit nor signal
    WaitFailed,
}

impl ExecutionResult {
    /// Classify an 8-bit exit code
    pub fn from_exit_code(code: u8) -> Self {
        match code {
            0 => ExecutionResult::Success,
            code => ExecutionResult::NonZeroExit(code),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success)
    }

    /// The program's own exit code, when it ran to a normal exit
    pub fn exit_code(&self) -> Option<u8> {
        match *self {
            ExecutionResult::Success => Some(0),
            ExecutionResult::NonZeroExit(code) => Some(code),
            _ => None,
        }
    }

    /// Collapse into a `Result`, naming `program` in the error
    pub fn into_result(self, program: &str) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ExecError::CommandFailed(format!("{}: {}", program, self)))
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionResult::Success => write!(f, "exited successfully"),
            ExecutionResult::NonZeroExit(code) => write!(f, "exited with code {}", code),
            ExecutionResult::Signaled(signal) => match Signal::try_from(*signal) {
                Ok(sig) => write!(f, "killed by signal {} ({})", signal, sig.as_str()),
                Err(_) => write!(f, "killed by signal {}", signal),
            },
            ExecutionResult::SpawnFailed(errno) => write!(f, "spawn failed: {}", errno),
            ExecutionResult::ExecFailed(errno) => write!(f, "exec failed: {}", errno),
            ExecutionResult::MappingFailed(err) => {
                write!(f, "user namespace mapping failed: {}", err)
            }
            ExecutionResult::ChrootFailed(errno) => {
                write!(f, "failed to chroot to offline root: {}", errno)
            }
            ExecutionResult::WaitFailed => write!(f, "waitpid failed"),
        }
    }
}
