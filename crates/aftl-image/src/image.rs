// crates/aftl-image/src/image.rs

//! The AFTL image: an 18-byte header followed by the ICP entries.

use std::io::Write;

use aftl_core::{AftlError, Result, AVB_VERSION_MAJOR, AVB_VERSION_MINOR};

use crate::entry::AftlIcpEntry;
use crate::wire::ByteReader;

/// Container magic.
pub const AFTL_MAGIC: [u8; 4] = *b"AFTL";

/// Fixed size of [`AftlImageHeader`], in bytes.
pub const IMAGE_HEADER_SIZE: usize = 18;

/// Header of the AFTL image.
///
/// Wire layout, big-endian: magic, `u32` required major version, `u32`
/// required minor version, `u32` total image size, `u16` entry count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AftlImageHeader {
    /// Major AVB version required to read this image.
    pub required_icp_version_major: u32,
    /// Minor AVB version required to read this image.
    pub required_icp_version_minor: u32,
    /// Total size of header plus all entries, in bytes.
    pub aftl_image_size: u32,
    /// Number of ICP entries that follow.
    pub icp_count: u16,
}

impl Default for AftlImageHeader {
    fn default() -> Self {
        Self {
            required_icp_version_major: AVB_VERSION_MAJOR,
            required_icp_version_minor: AVB_VERSION_MINOR,
            aftl_image_size: IMAGE_HEADER_SIZE as u32,
            icp_count: 0,
        }
    }
}

impl AftlImageHeader {
    /// Parses the fixed header from the front of `data`.
    ///
    /// # Errors
    /// [`AftlError::Framing`] on short input, [`AftlError::Magic`] on the
    /// wrong magic, [`AftlError::VersionUnsupported`] when the image
    /// requires a newer AVB than this implementation,
    /// [`AftlError::FieldRange`] on an impossible image size.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        let magic_bytes = r.take(4)?;
        let mut magic = [0u8; 4];
        magic.copy_from_slice(magic_bytes);
        if magic != AFTL_MAGIC {
            return Err(AftlError::Magic {
                expected: AFTL_MAGIC,
                got: magic,
            });
        }
        let required_icp_version_major = r.read_u32()?;
        let required_icp_version_minor = r.read_u32()?;
        if required_icp_version_major > AVB_VERSION_MAJOR
            || (required_icp_version_major == AVB_VERSION_MAJOR
                && required_icp_version_minor > AVB_VERSION_MINOR)
        {
            return Err(AftlError::VersionUnsupported {
                major: required_icp_version_major,
                minor: required_icp_version_minor,
            });
        }
        let aftl_image_size = r.read_u32()?;
        if (aftl_image_size as usize) < IMAGE_HEADER_SIZE {
            return Err(AftlError::FieldRange(format!(
                "aftl_image_size {aftl_image_size} below header size"
            )));
        }
        let icp_count = r.read_u16()?;
        Ok(Self {
            required_icp_version_major,
            required_icp_version_minor,
            aftl_image_size,
            icp_count,
        })
    }

    /// Serializes the header.
    #[must_use]
    pub fn encode(&self) -> [u8; IMAGE_HEADER_SIZE] {
        let mut out = [0u8; IMAGE_HEADER_SIZE];
        out[0..4].copy_from_slice(&AFTL_MAGIC);
        out[4..8].copy_from_slice(&self.required_icp_version_major.to_be_bytes());
        out[8..12].copy_from_slice(&self.required_icp_version_minor.to_be_bytes());
        out[12..16].copy_from_slice(&self.aftl_image_size.to_be_bytes());
        out[16..18].copy_from_slice(&self.icp_count.to_be_bytes());
        out
    }

    /// Writes the human-readable description used by `info_image_icp`.
    ///
    /// # Errors
    /// Propagates writer failures.
    pub fn print_desc<W: Write>(&self, o: &mut W) -> std::io::Result<()> {
        writeln!(o, "  AFTL image header:")?;
        let i = " ".repeat(4);
        writeln!(o, "{i}{:<25}{}", "Major version:", self.required_icp_version_major)?;
        writeln!(o, "{i}{:<25}{}", "Minor version:", self.required_icp_version_minor)?;
        writeln!(o, "{i}{:<25}{}", "Image size:", self.aftl_image_size)?;
        writeln!(o, "{i}{:<25}{}", "ICP entries count:", self.icp_count)?;
        Ok(())
    }
}

/// The complete AFTL image: header plus ordered entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AftlImage {
    /// Container header; count and size track the entry list.
    pub header: AftlImageHeader,
    /// The inclusion-proof entries, in append order.
    pub entries: Vec<AftlIcpEntry>,
}

impl AftlImage {
    /// An empty image: 18-byte header, zero entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, updating the header's count and aggregate size in
    /// the same step.
    ///
    /// # Errors
    /// [`AftlError::FieldRange`] when the count or size field would
    /// overflow.
    pub fn add_entry(&mut self, entry: AftlIcpEntry) -> Result<()> {
        let new_count = self
            .header
            .icp_count
            .checked_add(1)
            .ok_or_else(|| AftlError::FieldRange("icp_count overflow".into()))?;
        let new_size = u32::try_from(entry.size())
            .ok()
            .and_then(|s| self.header.aftl_image_size.checked_add(s))
            .ok_or_else(|| AftlError::FieldRange("aftl_image_size overflow".into()))?;
        self.entries.push(entry);
        self.header.icp_count = new_count;
        self.header.aftl_image_size = new_size;
        Ok(())
    }

    /// Parses a whole image; `data` must be exactly the image bytes.
    ///
    /// # Errors
    /// Header errors as in [`AftlImageHeader::decode`]; an entry error is
    /// reported with the index of the entry that failed; a size field that
    /// disagrees with the parsed entries is [`AftlError::Framing`].
    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = AftlImageHeader::decode(data)?;
        let mut offset = IMAGE_HEADER_SIZE;
        let mut entries = Vec::with_capacity(usize::from(header.icp_count));
        for i in 0..header.icp_count {
            let entry = AftlIcpEntry::decode(&data[offset..]).map_err(|e| {
                match e {
                    AftlError::Framing(m) => AftlError::Framing(format!("ICP entry {i}: {m}")),
                    other => other,
                }
            })?;
            offset += entry.size();
            entries.push(entry);
        }
        if offset != data.len() || offset != header.aftl_image_size as usize {
            return Err(AftlError::Framing(format!(
                "aftl_image_size {} disagrees with parsed size {offset} (input {})",
                header.aftl_image_size,
                data.len()
            )));
        }
        Ok(Self { header, entries })
    }

    /// Serializes header and entries in order.
    ///
    /// # Errors
    /// [`AftlError::Framing`] when the header count disagrees with the
    /// entry list; entry validation errors otherwise.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if usize::from(self.header.icp_count) != self.entries.len() {
            return Err(AftlError::Framing(format!(
                "icp_count {} disagrees with {} entries",
                self.header.icp_count,
                self.entries.len()
            )));
        }
        let mut out = Vec::with_capacity(self.header.aftl_image_size as usize);
        out.extend_from_slice(&self.header.encode());
        for entry in &self.entries {
            out.extend_from_slice(&entry.encode()?);
        }
        Ok(out)
    }

    /// Writes the human-readable description used by `info_image_icp`.
    ///
    /// # Errors
    /// Propagates writer failures.
    pub fn print_desc<W: Write>(&self, o: &mut W) -> std::io::Result<()> {
        writeln!(o, "Android Firmware Transparency Image:")?;
        self.header.print_desc(o)?;
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(o, "  Entry #{}:", i + 1)?;
            entry.print_desc(o)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TrillianLogRootDescriptor;
    use crate::leaf::FirmwareInfoLeaf;

    fn sample_entry(url: &str) -> AftlIcpEntry {
        let leaf = serde_json::to_vec(&serde_json::json!({
            "Value": {"FwInfo": {"info": {"info": {"version_incremental": "7"}}}}
        }))
        .unwrap();
        AftlIcpEntry {
            log_url: url.into(),
            leaf_index: 1,
            log_root_descriptor: TrillianLogRootDescriptor {
                tree_size: 2,
                root_hash: vec![0x33; 32],
                ..TrillianLogRootDescriptor::default()
            },
            fw_info_leaf: FirmwareInfoLeaf::from_bytes(&leaf).unwrap(),
            log_root_signature: vec![0x44; 72],
            proofs: vec![[0x55; 32]],
        }
    }

    #[test]
    fn empty_image_is_18_bytes_of_header() {
        let image = AftlImage::new();
        let bytes = image.encode().unwrap();
        assert_eq!(bytes.len(), IMAGE_HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"AFTL");
        assert_eq!(&bytes[16..18], &[0, 0]);

        let back = AftlImage::decode(&bytes).unwrap();
        assert_eq!(back.header.icp_count, 0);
        assert_eq!(back, image);
    }

    #[test]
    fn add_entry_tracks_count_and_size() {
        let mut image = AftlImage::new();
        let e1 = sample_entry("log-one.example:9000");
        let e2 = sample_entry("log-two.example:9000");
        let expected = IMAGE_HEADER_SIZE + e1.size() + e2.size();

        image.add_entry(e1).unwrap();
        image.add_entry(e2).unwrap();
        assert_eq!(image.header.icp_count, 2);
        assert_eq!(image.header.aftl_image_size as usize, expected);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut image = AftlImage::new();
        image.add_entry(sample_entry("log-one.example:9000")).unwrap();
        image.add_entry(sample_entry("log-two.example:9000")).unwrap();

        let bytes = image.encode().unwrap();
        assert_eq!(bytes.len(), image.header.aftl_image_size as usize);
        let back = AftlImage::decode(&bytes).unwrap();
        assert_eq!(back, image);
        assert_eq!(back.encode().unwrap(), bytes);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = AftlImage::new().encode().unwrap();
        bytes[0] = b'B';
        assert!(matches!(
            AftlImage::decode(&bytes),
            Err(AftlError::Magic { .. })
        ));
    }

    #[test]
    fn rejects_future_version() {
        let header = AftlImageHeader {
            required_icp_version_major: AVB_VERSION_MAJOR + 1,
            ..AftlImageHeader::default()
        };
        assert!(matches!(
            AftlImageHeader::decode(&header.encode()),
            Err(AftlError::VersionUnsupported { .. })
        ));

        let minor = AftlImageHeader {
            required_icp_version_minor: AVB_VERSION_MINOR + 1,
            ..AftlImageHeader::default()
        };
        assert!(matches!(
            AftlImageHeader::decode(&minor.encode()),
            Err(AftlError::VersionUnsupported { .. })
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = AftlImage::new().encode().unwrap();
        assert!(matches!(
            AftlImage::decode(&bytes[..IMAGE_HEADER_SIZE - 2]),
            Err(AftlError::Framing(_))
        ));
    }

    #[test]
    fn rejects_undersize_image_field() {
        let mut bytes = AftlImage::new().encode().unwrap();
        bytes[12..16].copy_from_slice(&4u32.to_be_bytes());
        assert!(matches!(
            AftlImage::decode(&bytes),
            Err(AftlError::FieldRange(_))
        ));
    }

    #[test]
    fn entry_error_names_the_failing_index() {
        let mut image = AftlImage::new();
        image.add_entry(sample_entry("log-one.example:9000")).unwrap();
        let mut bytes = image.encode().unwrap();
        // Truncate inside the single entry.
        bytes.truncate(bytes.len() - 4);
        let err = AftlImage::decode(&bytes).unwrap_err();
        match err {
            AftlError::Framing(m) => assert!(m.contains("ICP entry 0"), "message: {m}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn count_size_mismatch_is_framing() {
        let mut image = AftlImage::new();
        image.add_entry(sample_entry("log-one.example:9000")).unwrap();
        image.header.icp_count = 2;
        assert!(matches!(image.encode(), Err(AftlError::Framing(_))));
    }
}
