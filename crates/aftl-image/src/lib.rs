// crates/aftl-image/src/lib.rs

//! The AFTL image container appended to vbmeta images.
//!
//! Layout, big-endian throughout, no alignment padding:
//!
//! ```text
//! [ AftlImageHeader (18 B) ][ AftlIcpEntry ] ... [ AftlIcpEntry ]
//! ```
//!
//! Each entry carries everything needed to check one inclusion proof
//! offline: the log URL, the Trillian signed log root descriptor, the
//! firmware-info leaf exactly as the log stored it, the detached log-root
//! signature, and the audit path. Serialization is total: a parsed image
//! re-serializes to its input byte for byte.

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

pub mod descriptor;
pub mod entry;
pub mod image;
pub mod leaf;
pub mod verify;

mod wire;

pub use descriptor::TrillianLogRootDescriptor;
pub use entry::{AftlIcpEntry, ENTRY_HEADER_SIZE};
pub use image::{AftlImage, AftlImageHeader, AFTL_MAGIC, IMAGE_HEADER_SIZE};
pub use leaf::FirmwareInfoLeaf;
pub use verify::{verify_entry, verify_entry_against_vbmeta, verify_image};
