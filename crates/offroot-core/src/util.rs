//! Identity helpers

/// Check if the effective user is root
pub fn is_root() -> bool {
    get_uid() == 0
}

/// Get the effective UID
pub fn get_uid() -> u32 {
    unsafe { libc::geteuid() }
}

/// Get the effective GID
pub fn get_gid() -> u32 {
    unsafe { libc::getegid() }
}
