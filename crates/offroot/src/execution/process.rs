//! Process execution: clone, exec, wait
//!
//! The child is created with `CLONE_VM | CLONE_VFORK` on its own stack, so it
//! shares the parent's memory until it either execs or exits. Everything the
//! child touches (argv pointers, the report pipe, pre-exec state) is prepared
//! by the parent beforehand; the child itself only makes syscalls.

use log::{debug, error, warn};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sched::{clone, CloneFlags};
use nix::unistd::{pipe2, Pid};
use std::borrow::Cow;
use std::ffi::{CStr, CString, OsStr};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::raw::{c_char, c_int};
use std::os::unix::ffi::OsStrExt;

use offroot_core::{ExecError, Result};

use super::report::{ChildFailure, REPORT_LEN};
use super::result::ExecutionResult;

/// Exit code of a child that could not exec its target.
///
/// The parent learns the actual reason from the report pipe; the code only
/// matters to anyone else reaping or tracing the child.
pub const EXEC_FAILED_EXIT_CODE: c_int = 255;

const CHILD_STACK_SIZE: usize = 128 * 1024;

/// A non-empty argument vector. Element 0 is looked up through `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    args: Vec<CString>,
}

impl ProcessSpec {
    pub fn new<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args = args
            .into_iter()
            .enumerate()
            .map(|(i, arg)| {
                CString::new(arg.as_ref().as_bytes()).map_err(|_| {
                    ExecError::InvalidCommand(format!("argument {} contains a NUL byte", i))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if args.is_empty() {
            return Err(ExecError::InvalidCommand(
                "empty argument vector".to_string(),
            ));
        }

        Ok(Self { args })
    }

    pub fn program(&self) -> &CStr {
        &self.args[0]
    }

    /// Program name for diagnostics
    pub fn program_lossy(&self) -> Cow<'_, str> {
        self.program().to_string_lossy()
    }

    pub fn args(&self) -> &[CString] {
        &self.args
    }

    /// NULL-terminated pointer array for `execvp`, valid while `self` lives
    fn argv(&self) -> Vec<*const c_char> {
        self.args
            .iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect()
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arg in &self.args {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            f.write_str(&arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Work run inside the child between clone and exec.
///
/// # Safety
///
/// The child shares memory with the suspended parent. Implementations must
/// only make async-signal-safe calls: no allocation, no locks, no buffered
/// I/O, no logging, and no panics.
pub unsafe trait PreExec {
    fn pre_exec(&self) -> std::result::Result<(), ChildFailure>;
}

/// The spawn boundary: something that runs a command to completion
pub trait Launcher {
    fn launch(&self, spec: &ProcessSpec) -> ExecutionResult;
}

impl<L: Launcher + ?Sized> Launcher for &L {
    fn launch(&self, spec: &ProcessSpec) -> ExecutionResult {
        (**self).launch(spec)
    }
}

/// A child that has exec'd (or failed to) and still has to be reaped
#[must_use = "a spawned child must be waited on"]
#[derive(Debug)]
pub struct SpawnedChild {
    pid: Pid,
    program: String,
    failure: Option<ChildFailure>,
}

impl SpawnedChild {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Block until the child terminates and classify how it ended
    pub fn wait(self) -> ExecutionResult {
        let status = match wait_for_child(self.pid) {
            Ok(status) => status,
            Err(e) => {
                error!("{}: waitpid: {}", self.program, e);
                return ExecutionResult::WaitFailed;
            }
        };

        if let Some(failure) = self.failure {
            let result = ExecutionResult::from(failure);
            error!("{}: {}", self.program, result);
            return result;
        }

        classify_status(&self.program, status)
    }
}

/// Runs commands directly on the host
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Spawn `spec` and wait for it
    pub fn run(&self, spec: &ProcessSpec) -> ExecutionResult {
        self.run_with(spec, None)
    }

    /// Spawn `spec` with an optional pre-exec step and wait for it
    pub fn run_with(&self, spec: &ProcessSpec, pre_exec: Option<&dyn PreExec>) -> ExecutionResult {
        match self.spawn(spec, pre_exec) {
            Ok(child) => child.wait(),
            Err(e) => {
                error!("{}: clone: {}", spec.program_lossy(), e);
                ExecutionResult::SpawnFailed(e)
            }
        }
    }

    /// Clone a child that runs `pre_exec` (if any) and then execs `spec`.
    ///
    /// Returns once the child has exec'd or exited; the caller reaps it with
    /// [`SpawnedChild::wait`].
    pub fn spawn(
        &self,
        spec: &ProcessSpec,
        pre_exec: Option<&dyn PreExec>,
    ) -> std::result::Result<SpawnedChild, Errno> {
        let argv = spec.argv();
        let program = spec.program();
        let (report_read, report_write) = pipe2(OFlag::O_CLOEXEC)?;
        let mut stack = vec![0u8; CHILD_STACK_SIZE];

        debug!("Spawning: {}", spec);

        let report_fd = report_write.as_raw_fd();
        let child = Box::new(move || -> isize {
            // The Rust runtime ignores SIGPIPE and exec keeps ignored
            // dispositions, so put it back before running anything.
            // SAFETY: signal(2) only touches the child's own handler table,
            // which CLONE_VM without CLONE_SIGHAND does not share.
            unsafe { libc::signal(libc::SIGPIPE, libc::SIG_DFL) };

            let failure = match pre_exec.map_or(Ok(()), |step| step.pre_exec()) {
                Err(failure) => failure,
                Ok(()) => {
                    // SAFETY: `program` and `argv` are NUL-terminated and
                    // outlive the child, which shares our memory.
                    unsafe { libc::execvp(program.as_ptr(), argv.as_ptr()) };
                    ChildFailure::Exec(Errno::last())
                }
            };
            let report = failure.encode();
            // SAFETY: plain write(2) of a stack buffer. Nothing useful is
            // left to do if the parent can't hear us.
            unsafe { libc::write(report_fd, report.as_ptr().cast(), report.len()) };
            // SAFETY: terminate without running atexit handlers or unwinding
            // into frames that belong to the parent.
            unsafe { libc::_exit(EXEC_FAILED_EXIT_CODE) }
        });

        let flags = CloneFlags::CLONE_VM | CloneFlags::CLONE_VFORK;
        // SAFETY: the child closure only makes async-signal-safe calls and
        // always ends in exec or _exit.
        let pid = unsafe { clone(child, &mut stack, flags, Some(libc::SIGCHLD)) };

        drop(report_write);
        let pid = pid?;

        Ok(SpawnedChild {
            pid,
            program: spec.program_lossy().into_owned(),
            failure: read_report(report_read),
        })
    }
}

impl Launcher for ProcessRunner {
    fn launch(&self, spec: &ProcessSpec) -> ExecutionResult {
        self.run(spec)
    }
}

/// Read the child's failure report; EOF with no bytes means exec succeeded
fn read_report(fd: OwnedFd) -> Option<ChildFailure> {
    let mut bytes = Vec::with_capacity(REPORT_LEN);
    if let Err(e) = File::from(fd).read_to_end(&mut bytes) {
        warn!("Failed to read child report: {}", e);
        return None;
    }
    if bytes.is_empty() {
        return None;
    }
    let failure = ChildFailure::decode(&bytes);
    if failure.is_none() {
        warn!("Ignoring malformed child report of {} bytes", bytes.len());
    }
    failure
}

/// Wait for child process and return the raw wait status.
///
/// Raw status rather than `nix::sys::wait::WaitStatus` so that real-time
/// signals still classify as `Signaled`.
fn wait_for_child(pid: Pid) -> std::result::Result<c_int, Errno> {
    let mut status: c_int = 0;
    loop {
        // SAFETY: `status` is a valid out-pointer
        let rc = unsafe { libc::waitpid(pid.as_raw(), &mut status, 0) };
        match Errno::result(rc) {
            Ok(_) => return Ok(status),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
}

fn classify_status(program: &str, status: c_int) -> ExecutionResult {
    if libc::WIFSIGNALED(status) {
        let signal = libc::WTERMSIG(status);
        error!("{}: Child killed by signal {}.", program, signal);
        return ExecutionResult::Signaled(signal);
    }

    if !libc::WIFEXITED(status) {
        // shouldn't happen without WUNTRACED
        error!(
            "{}: Your system is broken: got status {} from waitpid.",
            program, status
        );
        return ExecutionResult::WaitFailed;
    }

    ExecutionResult::from_exit_code(libc::WEXITSTATUS(status) as u8)
}
