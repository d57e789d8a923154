//! offroot: run helper programs inside an offline root
//!
//! Package maintainer scripts and similar helpers often have to run against
//! a target system image rather than the host. This crate spawns them
//! chrooted into that image, using an unprivileged user namespace when the
//! caller is not root, and verifies package-index signatures with `usign`.
//!
//! # Modules
//!
//! - **execution**: clone/exec/wait, optionally inside an offline root
//! - **verify**: usign signature verification with fail-closed verdicts
//! - **config**: runner configuration
//!
//! # Example
//!
//! ```ignore
//! use offroot::{OfflineRootRunner, ProcessSpec, RunnerConfig};
//!
//! let config = RunnerConfig::default().with_offline_root("/srv/image");
//! let runner = OfflineRootRunner::from_config(&config)?;
//! let spec = ProcessSpec::new(["/usr/sbin/update-alternatives", "--auto", "vi"])?;
//! runner.run(&spec, config.offline_root()).into_result("update-alternatives")?;
//! ```

pub mod config;
pub mod execution;
pub mod verify;

pub use config::RunnerConfig;
pub use execution::{
    ExecutionResult, Launcher, OfflineRootRunner, ProcessRunner, ProcessSpec, SpawnedChild,
};
pub use offroot_core::{ExecError, PrivilegeMode, Result};
pub use verify::{SignatureCheckResult, TrustVerifier};
