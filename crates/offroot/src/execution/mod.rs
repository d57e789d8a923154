//! Execution layer: spawning helper programs
//!
//! - **process**: clone/exec/wait with a structured result
//! - **offline_root**: the same, but rooted in an alternate filesystem tree
//!
//! # Examples
//!
//! ```ignore
//! use offroot::execution::{OfflineRootRunner, ProcessSpec};
//! use std::path::Path;
//!
//! let spec = ProcessSpec::new(["/bin/sh", "-c", "ls /"])?;
//! let result = OfflineRootRunner::new().run(&spec, Some(Path::new("/srv/image")));
//! ```

pub mod offline_root;
pub mod process;
pub mod report;
pub mod result;

pub use offline_root::OfflineRootRunner;
pub use process::{Launcher, PreExec, ProcessRunner, ProcessSpec, SpawnedChild};
pub use report::ChildFailure;
pub use result::ExecutionResult;
