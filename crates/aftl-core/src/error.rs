// crates/aftl-core/src/error.rs

//! Error taxonomy shared by every crate in the workspace.
//!
//! Codec failures (`Framing`, `Magic`, `FieldRange`, ...) surface
//! immediately from the parsers; operational failures (`Transport`,
//! `Signing`, ...) surface from the submission path. Verification outcomes
//! are deliberately *not* errors: the verifier answers with a plain `bool`
//! so that a Merkle mismatch and a bad signature are indistinguishable to
//! the caller.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T, E = AftlError> = std::result::Result<T, E>;

/// Every failure the AFTL tooling can report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AftlError {
    /// Input bytes are too short, or length fields disagree with the
    /// payloads they describe.
    #[error("malformed structure: {0}")]
    Framing(String),

    /// A container carried the wrong magic value.
    #[error("bad magic: expected {expected:?}, got {got:?}")]
    Magic {
        /// The magic the format requires.
        expected: [u8; 4],
        /// The magic actually present.
        got: [u8; 4],
    },

    /// The image requires a newer AVB version than this implementation
    /// supports.
    #[error("unsupported required version {major}.{minor}")]
    VersionUnsupported {
        /// Required major version from the image.
        major: u32,
        /// Required minor version from the image.
        minor: u32,
    },

    /// A size or numeric field lies outside its allowed bounds.
    #[error("field out of range: {0}")]
    FieldRange(String),

    /// The firmware-info leaf JSON is missing the expected path or carries
    /// unrecognized keys.
    #[error("firmware info leaf: {0}")]
    JsonShape(String),

    /// The manufacturer key does not meet the RSA-4096 requirement.
    #[error("manufacturer key is not RSA-4096: {bits} bits")]
    KeyStrength {
        /// Actual modulus size of the offered key.
        bits: usize,
    },

    /// Key material could not be read or is of an unsupported kind.
    #[error("unusable key material: {0}")]
    KeyFormat(String),

    /// The signing capability failed to produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The transparency log could not be reached or answered with an error.
    #[error("transparency log transport: {0}")]
    Transport(String),

    /// The transparency log did not answer within the caller's deadline.
    #[error("transparency log request timed out after {0:?}")]
    TransportTimeout(Duration),

    /// The image carries a footer (chained partition), which this tool
    /// does not log.
    #[error("image has a footer and ICP for this format is not implemented")]
    ChainedPartitionUnsupported,

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
