//! offroot-namespace: in-child user namespace entry with UID/GID mapping
//!
//! Everything here is meant to run between process duplication and exec, so
//! nothing in the mapping path allocates: paths and map lines are formatted
//! into fixed stack buffers.

pub mod stack_buf;
pub mod user_ns;

pub use stack_buf::StackBuf;
pub use user_ns::{ControlSurface, IdentityMapping, MappingError, PrivilegeMapper};
