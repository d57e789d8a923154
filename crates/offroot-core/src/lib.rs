//! offroot-core: shared types, errors, and capability detection for offroot
//!
//! This crate provides the foundational types used by the other offroot crates:
//! - Error types and Result alias
//! - Effective UID/GID queries
//! - Runtime capability detection (root, unprivileged user namespaces)
//! - Privilege mode configuration

pub mod capabilities;
pub mod error;
pub mod privilege;
pub mod util;

pub use capabilities::SystemCapabilities;
pub use error::{ExecError, Result};
pub use privilege::{PrivilegeMode, ResolvedMode};
