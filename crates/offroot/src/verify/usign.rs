//! usign signature verification
//!
//! The verifier binary is taken from a fixed list of install locations, never
//! from `PATH` or caller input, and the trust database path is fixed too.
//! Anything short of usign exiting 0 is treated as a failed check.

use log::{debug, error};
use offroot_core::{ExecError, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::execution::{Launcher, ProcessRunner, ProcessSpec};

/// Install locations searched in order
pub const USIGN_CANDIDATES: [&str; 2] = ["/tools/bin/usign", "/usr/bin/usign"];

/// Directory of trusted public keys
pub const USIGN_TRUSTDB: &str = "/etc/opkg/usign/trustdb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheckResult {
    Trusted,
    Untrusted,
    VerifierUnavailable,
}

impl SignatureCheckResult {
    /// `VerifierUnavailable` is as untrusted as an explicit rejection
    pub fn is_trusted(&self) -> bool {
        matches!(self, SignatureCheckResult::Trusted)
    }

    pub fn into_result(self, file: &Path) -> Result<()> {
        match self {
            SignatureCheckResult::Trusted => Ok(()),
            SignatureCheckResult::Untrusted => Err(ExecError::SignatureRejected(
                file.display().to_string(),
            )),
            SignatureCheckResult::VerifierUnavailable => Err(ExecError::SignatureRejected(
                format!("{}: usign not found", file.display()),
            )),
        }
    }
}

/// Checks detached usign signatures against the system trust database
#[derive(Debug)]
pub struct TrustVerifier<L = ProcessRunner> {
    launcher: L,
    candidates: Vec<PathBuf>,
    trustdb: PathBuf,
    /// First candidate found present; absence is re-probed on every call
    resolved: OnceLock<PathBuf>,
}

impl TrustVerifier<ProcessRunner> {
    pub fn new() -> Self {
        Self::with_launcher(ProcessRunner::new())
    }
}

impl Default for TrustVerifier<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Launcher> TrustVerifier<L> {
    pub fn with_launcher(launcher: L) -> Self {
        Self {
            launcher,
            candidates: USIGN_CANDIDATES.iter().map(PathBuf::from).collect(),
            trustdb: PathBuf::from(USIGN_TRUSTDB),
            resolved: OnceLock::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_candidates(launcher: L, candidates: Vec<PathBuf>, trustdb: PathBuf) -> Self {
        Self {
            launcher,
            candidates,
            trustdb,
            resolved: OnceLock::new(),
        }
    }

    /// The usign binary to run, if any candidate exists.
    ///
    /// Presence is checked with `lstat`, so a symlink counts as present even
    /// if it dangles; running it then fails and the check is untrusted.
    pub fn locate(&self) -> Option<&Path> {
        if let Some(path) = self.resolved.get() {
            return Some(path.as_path());
        }

        let found = self
            .candidates
            .iter()
            .find(|candidate| fs::symlink_metadata(candidate).is_ok())?;

        debug!("Using usign at {}", found.display());
        Some(self.resolved.get_or_init(|| found.clone()).as_path())
    }

    /// Verify `sigfile` as a signature over `file`
    pub fn verify(&self, file: &Path, sigfile: &Path) -> SignatureCheckResult {
        let Some(usign) = self.locate() else {
            error!("Could not find usign executable");
            return SignatureCheckResult::VerifierUnavailable;
        };

        let spec = match ProcessSpec::new(verifier_args(usign, &self.trustdb, file, sigfile)) {
            Ok(spec) => spec,
            Err(e) => {
                error!("Cannot verify {}: {}", file.display(), e);
                return SignatureCheckResult::Untrusted;
            }
        };

        let result = self.launcher.launch(&spec);
        if result.is_success() {
            SignatureCheckResult::Trusted
        } else {
            error!(
                "Signature verification failed for {}: usign {}",
                file.display(),
                result
            );
            SignatureCheckResult::Untrusted
        }
    }
}

/// `usign -q -V -P <trustdb> -m <file> -x <sigfile>`
fn verifier_args<'a>(
    usign: &'a Path,
    trustdb: &'a Path,
    file: &'a Path,
    sigfile: &'a Path,
) -> [&'a OsStr; 9] {
    [
        usign.as_os_str(),
        OsStr::new("-q"),
        OsStr::new("-V"),
        OsStr::new("-P"),
        trustdb.as_os_str(),
        OsStr::new("-m"),
        file.as_os_str(),
        OsStr::new("-x"),
        sigfile.as_os_str(),
    ]
}
