// crates/aftl-image/src/descriptor.rs

//! The Trillian `log_root` descriptor embedded in each ICP entry.
//!
//! This is the exact byte sequence the transparency log signs; any change
//! to field order, width, or endianness breaks signature verification.
//!
//! Packed layout (big-endian):
//!
//! ```text
//! u16 version | u64 tree_size | u8 root_hash_size | root_hash
//! u64 timestamp | u64 revision | u16 metadata_size | metadata
//! ```

use std::io::Write;

use aftl_core::{AftlError, Result};

use crate::wire::ByteReader;

/// Only `log_root` version 1 exists.
pub const LOG_ROOT_VERSION: u16 = 1;

/// Upper bound on `root_hash_size`.
const MAX_ROOT_HASH_SIZE: usize = 128;

/// A signed commitment to a tree state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrillianLogRootDescriptor {
    /// Descriptor version; must be [`LOG_ROOT_VERSION`].
    pub version: u16,
    /// Number of leaves in the tree.
    pub tree_size: u64,
    /// Root hash, up to 128 bytes.
    pub root_hash: Vec<u8>,
    /// Log timestamp in nanoseconds.
    pub timestamp: u64,
    /// Log revision.
    pub revision: u64,
    /// Opaque metadata, up to 65535 bytes.
    pub metadata: Vec<u8>,
}

impl Default for TrillianLogRootDescriptor {
    fn default() -> Self {
        Self {
            version: LOG_ROOT_VERSION,
            tree_size: 0,
            root_hash: Vec::new(),
            timestamp: 0,
            revision: 0,
            metadata: Vec::new(),
        }
    }
}

impl TrillianLogRootDescriptor {
    /// Parses a descriptor, consuming the whole input.
    ///
    /// # Errors
    /// [`AftlError::Framing`] on short or oversize input,
    /// [`AftlError::FieldRange`] on a bad version or `root_hash_size`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        let version = r.read_u16()?;
        if version != LOG_ROOT_VERSION {
            return Err(AftlError::FieldRange(format!(
                "log_root version {version}, expected {LOG_ROOT_VERSION}"
            )));
        }
        let tree_size = r.read_u64()?;
        let root_hash_size = usize::from(r.read_u8()?);
        if root_hash_size > MAX_ROOT_HASH_SIZE {
            return Err(AftlError::FieldRange(format!(
                "root_hash_size {root_hash_size} exceeds {MAX_ROOT_HASH_SIZE}"
            )));
        }
        let root_hash = r.take(root_hash_size)?.to_vec();
        let timestamp = r.read_u64()?;
        let revision = r.read_u64()?;
        let metadata_size = usize::from(r.read_u16()?);
        let metadata = r.take(metadata_size)?.to_vec();
        r.finish()?;
        Ok(Self {
            version,
            tree_size,
            root_hash,
            timestamp,
            revision,
            metadata,
        })
    }

    /// Serialized size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        2 + 8 + 1 + self.root_hash.len() + 8 + 8 + 2 + self.metadata.len()
    }

    /// Serializes the descriptor.
    ///
    /// # Errors
    /// [`AftlError::FieldRange`] when a field violates its bounds.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.check()?;
        let mut out = Vec::with_capacity(self.size());
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&self.tree_size.to_be_bytes());
        out.push(self.root_hash.len() as u8);
        out.extend_from_slice(&self.root_hash);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.revision.to_be_bytes());
        out.extend_from_slice(&(self.metadata.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.metadata);
        Ok(out)
    }

    /// Bounds checks shared by encode and the entry validator.
    pub(crate) fn check(&self) -> Result<()> {
        if self.version != LOG_ROOT_VERSION {
            return Err(AftlError::FieldRange(format!(
                "log_root version {}, expected {LOG_ROOT_VERSION}",
                self.version
            )));
        }
        if self.root_hash.len() > MAX_ROOT_HASH_SIZE {
            return Err(AftlError::FieldRange(format!(
                "root_hash length {} exceeds {MAX_ROOT_HASH_SIZE}",
                self.root_hash.len()
            )));
        }
        if self.metadata.len() > usize::from(u16::MAX) {
            return Err(AftlError::FieldRange(format!(
                "metadata length {} exceeds {}",
                self.metadata.len(),
                u16::MAX
            )));
        }
        Ok(())
    }

    /// Writes the human-readable description used by `info_image_icp`.
    ///
    /// # Errors
    /// Propagates writer failures.
    pub fn print_desc<W: Write>(&self, o: &mut W) -> std::io::Result<()> {
        writeln!(o, "    Log Root Descriptor:")?;
        let i = " ".repeat(6);
        writeln!(o, "{i}{:<23}{}", "Version:", self.version)?;
        writeln!(o, "{i}{:<23}{}", "Tree size:", self.tree_size)?;
        writeln!(o, "{i}{:<23}{}", "Root hash size:", self.root_hash.len())?;
        if !self.root_hash.is_empty() {
            writeln!(o, "{i}{:<23}{}", "Root hash:", hex::encode(&self.root_hash))?;
        }
        writeln!(o, "{i}{:<23}{}", "Timestamp (ns):", self.timestamp)?;
        writeln!(o, "{i}{:<23}{}", "Revision:", self.revision)?;
        writeln!(o, "{i}{:<23}{}", "Metadata size:", self.metadata.len())?;
        if !self.metadata.is_empty() {
            writeln!(o, "{i}{:<23}{}", "Metadata:", hex::encode(&self.metadata))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrillianLogRootDescriptor {
        TrillianLogRootDescriptor {
            version: 1,
            tree_size: 4,
            root_hash: vec![0xab; 32],
            timestamp: 1_580_000_000_000_000_000,
            revision: 7,
            metadata: b"meta".to_vec(),
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let d = sample();
        let bytes = d.encode().unwrap();
        assert_eq!(bytes.len(), d.size());
        let back = TrillianLogRootDescriptor::decode(&bytes).unwrap();
        assert_eq!(back, d);
        assert_eq!(back.encode().unwrap(), bytes);
    }

    #[test]
    fn golden_layout() {
        let d = TrillianLogRootDescriptor {
            version: 1,
            tree_size: 2,
            root_hash: vec![0x11, 0x22],
            timestamp: 3,
            revision: 4,
            metadata: Vec::new(),
        };
        let bytes = d.encode().unwrap();
        #[rustfmt::skip]
        let want: &[u8] = &[
            0x00, 0x01,                                     // version
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, // tree_size
            0x02,                                           // root_hash_size
            0x11, 0x22,                                     // root_hash
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, // timestamp
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, // revision
            0x00, 0x00,                                     // metadata_size
        ];
        assert_eq!(bytes, want);
    }

    #[test]
    fn rejects_bad_version() {
        let mut bytes = sample().encode().unwrap();
        bytes[1] = 2;
        assert!(matches!(
            TrillianLogRootDescriptor::decode(&bytes),
            Err(AftlError::FieldRange(_))
        ));
    }

    #[test]
    fn rejects_oversize_root_hash() {
        // root_hash_size = 200 is rejected before any payload is read.
        let mut bytes = sample().encode().unwrap();
        bytes[10] = 200;
        assert!(matches!(
            TrillianLogRootDescriptor::decode(&bytes),
            Err(AftlError::FieldRange(_))
        ));

        let mut d = sample();
        d.root_hash = vec![0; 200];
        assert!(d.encode().is_err());
    }

    #[test]
    fn rejects_truncation_and_trailing_bytes() {
        let bytes = sample().encode().unwrap();
        assert!(matches!(
            TrillianLogRootDescriptor::decode(&bytes[..bytes.len() - 1]),
            Err(AftlError::Framing(_))
        ));

        let mut extended = bytes;
        extended.push(0);
        assert!(matches!(
            TrillianLogRootDescriptor::decode(&extended),
            Err(AftlError::Framing(_))
        ));
    }

    #[test]
    fn default_is_empty_v1() {
        let d = TrillianLogRootDescriptor::default();
        assert_eq!(d.version, 1);
        assert_eq!(d.size(), 29);
        let bytes = d.encode().unwrap();
        assert_eq!(TrillianLogRootDescriptor::decode(&bytes).unwrap(), d);
    }
}
