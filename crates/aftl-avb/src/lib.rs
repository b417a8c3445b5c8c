// crates/aftl-avb/src/lib.rs

//! Just enough AVB parsing to lift a vbmeta byte slice out of an image.
//!
//! Two structures matter here, both big-endian:
//! - the 256-byte vbmeta header (`AVB0`), whose authentication and
//!   auxiliary block sizes determine the total vbmeta length;
//! - the 64-byte footer (`AVBf`) found at the very end of partition
//!   images, which points at an embedded vbmeta and marks the image as a
//!   chained partition.
//!
//! Everything else in the AVB format (descriptors, algorithms, hashes) is
//! deliberately out of scope.

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

use std::fs;
use std::path::Path;

use aftl_core::{AftlError, Result, AVB_VERSION_MAJOR};

/// vbmeta header magic.
pub const VBMETA_MAGIC: [u8; 4] = *b"AVB0";

/// Footer magic.
pub const FOOTER_MAGIC: [u8; 4] = *b"AVBf";

/// Fixed size of the vbmeta image header.
pub const VBMETA_HEADER_SIZE: usize = 256;

/// Fixed size of the AVB footer.
pub const FOOTER_SIZE: usize = 64;

/// The vbmeta header fields this tool needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VbmetaHeader {
    /// Minimum libavb major version required to parse the image.
    pub required_libavb_version_major: u32,
    /// Minimum libavb minor version required to parse the image.
    pub required_libavb_version_minor: u32,
    /// Size of the authentication data block.
    pub authentication_data_block_size: u64,
    /// Size of the auxiliary data block.
    pub auxiliary_data_block_size: u64,
}

impl VbmetaHeader {
    /// Parses the leading fields of a 256-byte vbmeta header.
    ///
    /// # Errors
    /// [`AftlError::Framing`] on short input, [`AftlError::Magic`] on the
    /// wrong magic, [`AftlError::VersionUnsupported`] when the image
    /// requires a newer libavb major version.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < VBMETA_HEADER_SIZE {
            return Err(AftlError::Framing(format!(
                "vbmeta header needs {VBMETA_HEADER_SIZE} bytes, have {}",
                data.len()
            )));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&data[0..4]);
        if magic != VBMETA_MAGIC {
            return Err(AftlError::Magic {
                expected: VBMETA_MAGIC,
                got: magic,
            });
        }
        let major = be_u32(&data[4..8]);
        let minor = be_u32(&data[8..12]);
        if major > AVB_VERSION_MAJOR {
            return Err(AftlError::VersionUnsupported { major, minor });
        }
        Ok(Self {
            required_libavb_version_major: major,
            required_libavb_version_minor: minor,
            authentication_data_block_size: be_u64(&data[12..20]),
            auxiliary_data_block_size: be_u64(&data[20..28]),
        })
    }

    /// Total size of the vbmeta structure this header describes.
    #[must_use]
    pub const fn vbmeta_size(&self) -> u64 {
        VBMETA_HEADER_SIZE as u64
            + self.authentication_data_block_size
            + self.auxiliary_data_block_size
    }
}

/// The AVB footer appended to partition images carrying a vbmeta struct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AvbFooter {
    /// Footer format major version.
    pub version_major: u32,
    /// Footer format minor version.
    pub version_minor: u32,
    /// Size of the partition image before AVB data was appended.
    pub original_image_size: u64,
    /// Offset of the embedded vbmeta structure.
    pub vbmeta_offset: u64,
    /// Size of the embedded vbmeta structure.
    pub vbmeta_size: u64,
}

impl AvbFooter {
    /// Parses a 64-byte footer blob.
    ///
    /// # Errors
    /// [`AftlError::Framing`] on short input, [`AftlError::Magic`] when the
    /// blob is not a footer.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < FOOTER_SIZE {
            return Err(AftlError::Framing(format!(
                "footer needs {FOOTER_SIZE} bytes, have {}",
                data.len()
            )));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&data[0..4]);
        if magic != FOOTER_MAGIC {
            return Err(AftlError::Magic {
                expected: FOOTER_MAGIC,
                got: magic,
            });
        }
        Ok(Self {
            version_major: be_u32(&data[4..8]),
            version_minor: be_u32(&data[8..12]),
            original_image_size: be_u64(&data[12..20]),
            vbmeta_offset: be_u64(&data[20..28]),
            vbmeta_size: be_u64(&data[28..36]),
        })
    }
}

/// Reads `image_path` and returns the raw vbmeta bytes plus the footer, if
/// the image carries one (i.e. is a chained partition image).
///
/// # Errors
/// [`AftlError::Io`] on read failure; header errors as in
/// [`VbmetaHeader::decode`]; [`AftlError::Framing`] when the declared
/// vbmeta size overruns the file.
pub fn get_vbmeta_image<P: AsRef<Path>>(image_path: P) -> Result<(Vec<u8>, Option<AvbFooter>)> {
    let data = fs::read(image_path.as_ref())?;

    // A partition image ends in a footer pointing at its embedded vbmeta;
    // a bare vbmeta image starts with the header directly.
    let footer = if data.len() >= FOOTER_SIZE {
        AvbFooter::decode(&data[data.len() - FOOTER_SIZE..]).ok()
    } else {
        None
    };
    let offset = footer.map_or(0, |f| f.vbmeta_offset) as usize;

    let header_slice = data
        .get(offset..)
        .ok_or_else(|| AftlError::Framing(format!("vbmeta offset {offset} beyond file end")))?;
    let header = VbmetaHeader::decode(header_slice)?;

    let size = usize::try_from(header.vbmeta_size())
        .map_err(|_| AftlError::FieldRange("vbmeta size overflows usize".into()))?;
    let end = offset
        .checked_add(size)
        .ok_or_else(|| AftlError::FieldRange("vbmeta extent overflows usize".into()))?;
    let vbmeta = data
        .get(offset..end)
        .ok_or_else(|| {
            AftlError::Framing(format!(
                "vbmeta declares {size} bytes at offset {offset}, file has {}",
                data.len()
            ))
        })?
        .to_vec();
    Ok((vbmeta, footer))
}

#[inline]
fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

#[inline]
fn be_u64(b: &[u8]) -> u64 {
    u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}
