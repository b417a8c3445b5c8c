// crates/aftl-image/src/entry.rs

//! One transparency-log inclusion-proof entry.
//!
//! Wire layout: a fixed 27-byte header followed by five variable-length
//! payloads in declared order.
//!
//! ```text
//! u32 log_url_size | u64 leaf_index | u32 log_root_descriptor_size |
//! u32 fw_info_leaf_size | u16 log_root_sig_size | u8 proof_hash_count |
//! u32 inc_proof_size
//! log_url | log_root_descriptor | fw_info_leaf | log_root_signature | proofs
//! ```
//!
//! Audit-path hashes are SHA-256, so `inc_proof_size` must be exactly
//! `32 * proof_hash_count`.

use std::io::Write;

use aftl_core::{AftlError, Result};
use aftl_merkle::HASH_SIZE;

use crate::descriptor::TrillianLogRootDescriptor;
use crate::leaf::FirmwareInfoLeaf;
use crate::wire::ByteReader;

/// Fixed size of the entry header, in bytes.
pub const ENTRY_HEADER_SIZE: usize = 27;

/// An inclusion proof for one firmware-info leaf in one log.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AftlIcpEntry {
    /// URL of the log that issued this proof.
    pub log_url: String,
    /// Index of the leaf in the log's Merkle tree.
    pub leaf_index: u64,
    /// The signed tree head this proof chains up to.
    pub log_root_descriptor: TrillianLogRootDescriptor,
    /// The leaf as stored by the log, bytes preserved.
    pub fw_info_leaf: FirmwareInfoLeaf,
    /// Detached signature over the descriptor bytes.
    pub log_root_signature: Vec<u8>,
    /// Audit path, leaf-to-root order.
    pub proofs: Vec<[u8; HASH_SIZE]>,
}

impl AftlIcpEntry {
    /// Parses one entry from the front of `data`; trailing bytes beyond the
    /// entry's self-reported size are left untouched for the caller.
    ///
    /// # Errors
    /// [`AftlError::Framing`] on truncation, a non-ASCII URL, or an
    /// inconsistent proof-size pair; [`AftlError::FieldRange`] when the
    /// implied hash width is not SHA-256; plus whatever the descriptor and
    /// leaf codecs reject.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        let log_url_size = r.read_u32()? as usize;
        let leaf_index = r.read_u64()?;
        let log_root_descriptor_size = r.read_u32()? as usize;
        let fw_info_leaf_size = r.read_u32()? as usize;
        let log_root_sig_size = usize::from(r.read_u16()?);
        let proof_hash_count = usize::from(r.read_u8()?);
        let inc_proof_size = r.read_u32()? as usize;

        let url_bytes = r.take(log_url_size)?;
        if !url_bytes.is_ascii() {
            return Err(AftlError::Framing("log_url is not ASCII".into()));
        }
        let log_url = String::from_utf8_lossy(url_bytes).into_owned();

        let log_root_descriptor = TrillianLogRootDescriptor::decode(r.take(log_root_descriptor_size)?)?;
        let fw_info_leaf = FirmwareInfoLeaf::from_bytes(r.take(fw_info_leaf_size)?)?;
        let log_root_signature = r.take(log_root_sig_size)?.to_vec();

        let proof_bytes = r.take(inc_proof_size)?;
        let proofs = split_proofs(proof_bytes, proof_hash_count)?;

        Ok(Self {
            log_url,
            leaf_index,
            log_root_descriptor,
            fw_info_leaf,
            log_root_signature,
            proofs,
        })
    }

    /// Serialized size: header plus the five payloads.
    #[must_use]
    pub fn size(&self) -> usize {
        ENTRY_HEADER_SIZE
            + self.log_url.len()
            + self.log_root_descriptor.size()
            + self.fw_info_leaf.size()
            + self.log_root_signature.len()
            + self.proofs.len() * HASH_SIZE
    }

    /// Checks the bounds the header fields impose on the live payloads.
    ///
    /// # Errors
    /// [`AftlError::Framing`] or [`AftlError::FieldRange`] naming the
    /// offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.log_url.is_ascii() {
            return Err(AftlError::Framing("log_url is not ASCII".into()));
        }
        if u32::try_from(self.log_url.len()).is_err() {
            return Err(AftlError::FieldRange("log_url too long".into()));
        }
        if u16::try_from(self.log_root_signature.len()).is_err() {
            return Err(AftlError::FieldRange("log_root_signature too long".into()));
        }
        if u8::try_from(self.proofs.len()).is_err() {
            return Err(AftlError::FieldRange(format!(
                "{} proof hashes exceed the u8 count field",
                self.proofs.len()
            )));
        }
        self.log_root_descriptor.check()
    }

    /// Serializes the entry; header lengths are recomputed from the live
    /// payloads, so a parsed entry re-encodes byte-exactly.
    ///
    /// # Errors
    /// Whatever [`Self::validate`] rejects.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let descriptor = self.log_root_descriptor.encode()?;
        let mut out = Vec::with_capacity(self.size());
        out.extend_from_slice(&(self.log_url.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.leaf_index.to_be_bytes());
        out.extend_from_slice(&(descriptor.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.fw_info_leaf.size() as u32).to_be_bytes());
        out.extend_from_slice(&(self.log_root_signature.len() as u16).to_be_bytes());
        out.push(self.proofs.len() as u8);
        out.extend_from_slice(&((self.proofs.len() * HASH_SIZE) as u32).to_be_bytes());
        out.extend_from_slice(self.log_url.as_bytes());
        out.extend_from_slice(&descriptor);
        out.extend_from_slice(self.fw_info_leaf.encode());
        out.extend_from_slice(&self.log_root_signature);
        for proof in &self.proofs {
            out.extend_from_slice(proof);
        }
        Ok(out)
    }

    /// Writes the human-readable description used by `info_image_icp`.
    ///
    /// # Errors
    /// Propagates writer failures.
    pub fn print_desc<W: Write>(&self, o: &mut W) -> std::io::Result<()> {
        let i = " ".repeat(4);
        writeln!(o, "{i}{:<25}{}", "Transparency Log:", self.log_url)?;
        writeln!(o, "{i}{:<25}{}", "Leaf index:", self.leaf_index)?;
        write!(o, "    ICP hashes:              ")?;
        for (n, proof) in self.proofs.iter().enumerate() {
            if n != 0 {
                write!(o, "{}", " ".repeat(29))?;
            }
            writeln!(o, "{}", hex::encode(proof))?;
        }
        if self.proofs.is_empty() {
            writeln!(o)?;
        }
        self.log_root_descriptor.print_desc(o)?;
        self.fw_info_leaf.print_desc(o)?;
        Ok(())
    }
}

/// Splits the concatenated audit-path bytes into fixed-width hashes.
fn split_proofs(proof_bytes: &[u8], count: usize) -> Result<Vec<[u8; HASH_SIZE]>> {
    if count == 0 {
        if !proof_bytes.is_empty() {
            return Err(AftlError::Framing(format!(
                "{} proof bytes with proof_hash_count 0",
                proof_bytes.len()
            )));
        }
        return Ok(Vec::new());
    }
    if proof_bytes.len() % count != 0 {
        return Err(AftlError::Framing(format!(
            "inc_proof_size {} not divisible by proof_hash_count {count}",
            proof_bytes.len()
        )));
    }
    let hash_size = proof_bytes.len() / count;
    if hash_size != HASH_SIZE {
        return Err(AftlError::FieldRange(format!(
            "proof hash size {hash_size}, expected {HASH_SIZE}"
        )));
    }
    Ok(proof_bytes
        .chunks_exact(HASH_SIZE)
        .map(|c| {
            let mut h = [0u8; HASH_SIZE];
            h.copy_from_slice(c);
            h
        })
        .collect())
}
