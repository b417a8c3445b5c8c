// crates/aftl-image/src/verify.rs

//! Offline verification of ICP entries and whole images.
//!
//! All verification outcomes collapse to a boolean: a Merkle mismatch, a
//! bad signature, and an inconsistent structure are indistinguishable to
//! the caller, so no step leaks which part of an entry failed.

use aftl_crypto::{sha256, LogPublicKey};
use aftl_merkle::{hash_leaf, root_from_icp};

use crate::entry::AftlIcpEntry;
use crate::image::AftlImage;

/// Checks one entry against the log's public key.
///
/// Four conditions must all hold: the leaf hash chains through the audit
/// path to the descriptor's root hash, and the detached signature over the
/// descriptor bytes verifies under `pub_key`.
#[must_use]
pub fn verify_entry(entry: &AftlIcpEntry, pub_key: &LogPublicKey) -> bool {
    let leaf_hash = hash_leaf(entry.fw_info_leaf.encode());
    let Ok(root) = root_from_icp(
        entry.leaf_index,
        entry.log_root_descriptor.tree_size,
        &entry.proofs,
        leaf_hash,
    ) else {
        return false;
    };
    if root[..] != entry.log_root_descriptor.root_hash[..] {
        return false;
    }
    let Ok(descriptor_bytes) = entry.log_root_descriptor.encode() else {
        return false;
    };
    pub_key.verify_sha256(&descriptor_bytes, &entry.log_root_signature)
}

/// [`verify_entry`] plus the vbmeta binding: the leaf's `vbmeta_hash` must
/// equal SHA-256 of `vbmeta_image`.
#[must_use]
pub fn verify_entry_against_vbmeta(
    entry: &AftlIcpEntry,
    vbmeta_image: &[u8],
    pub_key: &LogPublicKey,
) -> bool {
    if vbmeta_image.is_empty() {
        return false;
    }
    verify_entry(entry, pub_key)
        && entry.fw_info_leaf.vbmeta_hash().as_deref() == Some(&sha256(vbmeta_image)[..])
}

/// Checks a whole image: every entry must verify, against the vbmeta and
/// at least one of the provided keys. Empty entry or key lists never
/// verify.
#[must_use]
pub fn verify_image(image: &AftlImage, vbmeta_image: &[u8], pub_keys: &[LogPublicKey]) -> bool {
    if pub_keys.is_empty() || image.entries.is_empty() {
        return false;
    }
    image.entries.iter().all(|entry| {
        pub_keys
            .iter()
            .any(|key| verify_entry_against_vbmeta(entry, vbmeta_image, key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TrillianLogRootDescriptor;
    use crate::leaf::FirmwareInfoLeaf;
    use base64::prelude::{Engine as _, BASE64_STANDARD};
    use rand::rngs::OsRng;
    use serde_json::json;
    use signature::Signer;

    struct LogFixture {
        signing: p256::ecdsa::SigningKey,
        pub_key: LogPublicKey,
    }

    impl LogFixture {
        fn new() -> Self {
            let signing = p256::ecdsa::SigningKey::random(&mut OsRng);
            let pub_key = LogPublicKey::EcdsaP256(*signing.verifying_key());
            Self { signing, pub_key }
        }

        fn sign(&self, message: &[u8]) -> Vec<u8> {
            let sig: p256::ecdsa::Signature = self.signing.sign(message);
            sig.to_der().as_bytes().to_vec()
        }
    }

    fn leaf_for(vbmeta: &[u8]) -> FirmwareInfoLeaf {
        let bytes = serde_json::to_vec(&json!({
            "Value": {"FwInfo": {"info": {"info": {
                "vbmeta_hash": BASE64_STANDARD.encode(sha256(vbmeta)),
                "version_incremental": "5524043",
            }}}}
        }))
        .unwrap();
        FirmwareInfoLeaf::from_bytes(&bytes).unwrap()
    }

    /// A size-one tree: the root is the leaf hash, the audit path is empty.
    fn single_leaf_entry(log: &LogFixture, vbmeta: &[u8]) -> AftlIcpEntry {
        let leaf = leaf_for(vbmeta);
        let descriptor = TrillianLogRootDescriptor {
            tree_size: 1,
            root_hash: hash_leaf(leaf.encode()).to_vec(),
            timestamp: 1_600_000_000_000_000_000,
            revision: 1,
            ..TrillianLogRootDescriptor::default()
        };
        let signature = log.sign(&descriptor.encode().unwrap());
        AftlIcpEntry {
            log_url: "aftl.example:9000".into(),
            leaf_index: 0,
            log_root_descriptor: descriptor,
            fw_info_leaf: leaf,
            log_root_signature: signature,
            proofs: Vec::new(),
        }
    }

    #[test]
    fn single_entry_verifies_and_roundtrips() {
        let log = LogFixture::new();
        let vbmeta = b"vbmeta image bytes";
        let entry = single_leaf_entry(&log, vbmeta);

        assert!(verify_entry(&entry, &log.pub_key));
        assert!(verify_entry_against_vbmeta(&entry, vbmeta, &log.pub_key));

        let bytes = entry.encode().unwrap();
        let back = AftlIcpEntry::decode(&bytes).unwrap();
        assert_eq!(back, entry);
        assert!(verify_entry(&back, &log.pub_key));
    }

    #[test]
    fn four_leaf_tree_with_audit_path_verifies() {
        let log = LogFixture::new();
        let vbmeta = b"the vbmeta under proof";
        let leaf = leaf_for(vbmeta);

        // Tree of four leaves; ours is index 2.
        let l0 = hash_leaf(b"other leaf 0");
        let l1 = hash_leaf(b"other leaf 1");
        let l2 = hash_leaf(leaf.encode());
        let l3 = hash_leaf(b"other leaf 3");
        let n01 = aftl_merkle::hash_children(&l0, &l1);
        let n23 = aftl_merkle::hash_children(&l2, &l3);
        let root = aftl_merkle::hash_children(&n01, &n23);

        let descriptor = TrillianLogRootDescriptor {
            tree_size: 4,
            root_hash: root.to_vec(),
            ..TrillianLogRootDescriptor::default()
        };
        let signature = log.sign(&descriptor.encode().unwrap());
        let entry = AftlIcpEntry {
            log_url: "aftl.example:9000".into(),
            leaf_index: 2,
            log_root_descriptor: descriptor,
            fw_info_leaf: leaf,
            log_root_signature: signature,
            proofs: vec![l3, n01],
        };

        assert!(verify_entry(&entry, &log.pub_key));

        // Flipping one audit-path byte kills it.
        let mut bad = entry.clone();
        bad.proofs[0][0] ^= 0x01;
        assert!(!verify_entry(&bad, &log.pub_key));
    }

    #[test]
    fn signature_failures_read_as_false() {
        let log = LogFixture::new();
        let entry = single_leaf_entry(&log, b"vbmeta");

        let mut truncated = entry.clone();
        truncated.log_root_signature.truncate(8);
        assert!(!verify_entry(&truncated, &log.pub_key));

        let other = LogFixture::new();
        assert!(!verify_entry(&entry, &other.pub_key));
    }

    #[test]
    fn vbmeta_binding_failure_reads_as_false() {
        let log = LogFixture::new();
        let entry = single_leaf_entry(&log, b"the real vbmeta");

        // Proof and signature are valid...
        assert!(verify_entry(&entry, &log.pub_key));
        // ...but the image bytes do not match the leaf's hash.
        assert!(!verify_entry_against_vbmeta(
            &entry,
            b"some other vbmeta",
            &log.pub_key
        ));
    }

    #[test]
    fn image_requires_all_entries_and_any_key() {
        let log_a = LogFixture::new();
        let log_b = LogFixture::new();
        let vbmeta = b"vbmeta";

        let mut image = AftlImage::new();
        image.add_entry(single_leaf_entry(&log_a, vbmeta)).unwrap();
        image.add_entry(single_leaf_entry(&log_b, vbmeta)).unwrap();

        let both = [log_a.pub_key.clone(), log_b.pub_key.clone()];
        assert!(verify_image(&image, vbmeta, &both));

        // One key missing: the other entry cannot verify.
        assert!(!verify_image(&image, vbmeta, &[log_a.pub_key.clone()]));

        // Empty key list and empty image never verify.
        assert!(!verify_image(&image, vbmeta, &[]));
        assert!(!verify_image(&AftlImage::new(), vbmeta, &both));
    }
}
