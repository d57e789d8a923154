//! Privilege mode configuration for offline-root execution

use serde::{Deserialize, Serialize};

/// Determines whether a child entering an offline root first acquires
/// namespace-root through a private user namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeMode {
    /// Always enter a user namespace before chroot, even when running as root.
    Unprivileged,

    /// Never enter a user namespace. chroot fails unless the caller is root.
    Privileged,

    /// Enter a user namespace only when the effective UID is not 0.
    #[default]
    Auto,
}

impl PrivilegeMode {
    /// Resolve Auto mode to a concrete mode for a caller whose effective
    /// root status is `has_root`.
    ///
    /// Cheap enough to evaluate inside a freshly cloned child.
    pub fn resolve(self, has_root: bool) -> ResolvedMode {
        match self {
            PrivilegeMode::Privileged => ResolvedMode::Privileged,
            PrivilegeMode::Unprivileged => ResolvedMode::Unprivileged,
            PrivilegeMode::Auto => {
                if has_root {
                    ResolvedMode::Privileged
                } else {
                    ResolvedMode::Unprivileged
                }
            }
        }
    }

    pub fn all() -> [PrivilegeMode; 3] {
        [
            PrivilegeMode::Auto,
            PrivilegeMode::Unprivileged,
            PrivilegeMode::Privileged,
        ]
    }

    pub fn description(self) -> &'static str {
        match self {
            PrivilegeMode::Auto => "map to namespace-root only when not running as root",
            PrivilegeMode::Unprivileged => "always map to namespace-root in a new user namespace",
            PrivilegeMode::Privileged => "chroot directly, requires real root",
        }
    }
}

/// A resolved (non-Auto) privilege mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedMode {
    Unprivileged,
    Privileged,
}

impl ResolvedMode {
    /// The child must enter a user namespace before chroot
    pub fn needs_user_namespace(&self) -> bool {
        matches!(self, ResolvedMode::Unprivileged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_auto() {
        assert_eq!(PrivilegeMode::default(), PrivilegeMode::Auto);
    }

    #[test]
    fn privileged_always_resolves_to_privileged() {
        assert_eq!(PrivilegeMode::Privileged.resolve(false), ResolvedMode::Privileged);
        assert_eq!(PrivilegeMode::Privileged.resolve(true), ResolvedMode::Privileged);
    }

    #[test]
    fn unprivileged_always_resolves_to_unprivileged() {
        assert_eq!(
            PrivilegeMode::Unprivileged.resolve(true),
            ResolvedMode::Unprivileged
        );
        assert_eq!(
            PrivilegeMode::Unprivileged.resolve(false),
            ResolvedMode::Unprivileged
        );
    }

    #[test]
    fn auto_follows_effective_root() {
        assert_eq!(PrivilegeMode::Auto.resolve(true), ResolvedMode::Privileged);
        assert_eq!(PrivilegeMode::Auto.resolve(false), ResolvedMode::Unprivileged);
    }

    #[test]
    fn resolved_mode_helpers() {
        assert!(!ResolvedMode::Privileged.needs_user_namespace());
        assert!(ResolvedMode::Unprivileged.needs_user_namespace());
    }

    #[test]
    fn mode_names_round_trip_through_serde() {
        let mode: PrivilegeMode = serde_json::from_str("\"unprivileged\"").unwrap();
        assert_eq!(mode, PrivilegeMode::Unprivileged);
        assert_eq!(
            serde_json::to_string(&PrivilegeMode::Auto).unwrap(),
            "\"auto\""
        );
    }
}
