// crates/aftl-crypto/src/lib.rs

//! Crypto substrate for the AFTL tooling.
//!
//! Two concerns live here:
//! - [`LogPublicKey`]: a transparency log's public key (RSA or ECDSA P-256,
//!   decided by the SPKI algorithm identifier) and detached SHA-256
//!   signature verification over signed log roots.
//! - [`ManufacturerKey`]: the RSA key that signs firmware-info submissions,
//!   either in-process or through an external signing-helper program.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

pub mod pubkey;
pub mod signer;

pub use pubkey::LogPublicKey;
pub use signer::{ManufacturerKey, SigningHelper, ALGORITHM_SHA256_RSA4096};

use sha2::{Digest, Sha256};

/// SHA-256 convenience wrapper used throughout the workspace.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}
