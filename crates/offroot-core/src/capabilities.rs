//! Runtime detection of available system capabilities
//!
//! Probes the running kernel to determine whether offline-root execution can
//! work for the current user.

/// Detected system capabilities relevant to offline-root execution
#[derive(Debug, Clone)]
pub struct SystemCapabilities {
    /// Running as root (euid == 0)
    pub has_root: bool,
    /// Unprivileged user namespaces are available
    pub has_user_namespaces: bool,
}

impl SystemCapabilities {
    /// Detect all capabilities on the current system
    pub fn detect() -> Self {
        Self {
            has_root: crate::util::is_root(),
            has_user_namespaces: detect_user_namespaces(),
        }
    }

    /// Whether an offline root can be entered by this caller
    pub fn can_enter_offline_root(&self) -> bool {
        self.has_root || self.has_user_namespaces
    }

    /// Get a human-readable summary of capabilities
    pub fn summary(&self) -> String {
        let check = |available: bool| if available { "[ok]" } else { "[--]" };

        [
            format!("{} Root privileges", check(self.has_root)),
            format!("{} User namespaces", check(self.has_user_namespaces)),
        ]
        .join("\n")
    }
}

fn detect_user_namespaces() -> bool {
    // Debian/Ubuntu knob
    if let Ok(content) = std::fs::read_to_string("/proc/sys/kernel/unprivileged_userns_clone") {
        if content.trim() == "0" {
            return false;
        }
    }

    if let Ok(content) = std::fs::read_to_string("/proc/sys/user/max_user_namespaces") {
        if let Ok(max) = content.trim().parse::<u64>() {
            return max > 0;
        }
    }

    // If we can't read the files, assume available on modern kernels
    true
}
