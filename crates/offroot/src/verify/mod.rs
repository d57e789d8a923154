//! Signature verification through an external usign binary

pub mod usign;

pub use usign::{SignatureCheckResult, TrustVerifier, USIGN_CANDIDATES, USIGN_TRUSTDB};
