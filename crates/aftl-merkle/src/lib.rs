// crates/aftl-merkle/src/lib.rs

//! RFC 6962 Merkle-tree primitives for AFTL inclusion proofs.
//!
//! - Leaf hash: SHA-256 over `0x00 ‖ data`.
//! - Node hash: SHA-256 over `0x01 ‖ left ‖ right`.
//! - [`root_from_icp`] recomputes the expected tree root from a leaf hash
//!   and an audit path, which the caller then compares against the signed
//!   log root.
//!
//! The `0x00`/`0x01` prefixes are the RFC 6962 domain separators; both are
//! load-bearing for second-preimage resistance.

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

use aftl_core::{AftlError, Result};
use sha2::{Digest, Sha256};

/// Width of every hash in an audit path.
pub const HASH_SIZE: usize = 32;

/// RFC 6962 leaf hash: SHA-256 of `0x00 ‖ leaf`.
#[must_use]
pub fn hash_leaf(leaf: &[u8]) -> [u8; HASH_SIZE] {
    let mut h = Sha256::new();
    h.update([0x00]);
    h.update(leaf);
    h.finalize().into()
}

/// RFC 6962 interior-node hash: SHA-256 of `0x01 ‖ l ‖ r`.
#[must_use]
pub fn hash_children(l: &[u8], r: &[u8]) -> [u8; HASH_SIZE] {
    let mut h = Sha256::new();
    h.update([0x01]);
    h.update(l);
    h.update(r);
    h.finalize().into()
}

/// Folds a subtree hash along the left-side tree border.
#[inline]
#[must_use]
pub fn chain_border_right(seed: [u8; HASH_SIZE], proof: &[[u8; HASH_SIZE]]) -> [u8; HASH_SIZE] {
    let mut seed = seed;
    for h in proof {
        seed = hash_children(h, &seed);
    }
    seed
}

/// Folds a subtree hash on or below the tree's right border.
///
/// Bit `i` of `leaf_index` decides whether the sibling at step `i` sits to
/// the right (bit clear) or to the left (bit set) of the running hash.
#[inline]
#[must_use]
pub fn chain_inner(
    seed: [u8; HASH_SIZE],
    proof: &[[u8; HASH_SIZE]],
    leaf_index: u64,
) -> [u8; HASH_SIZE] {
    let mut seed = seed;
    for (i, h) in proof.iter().enumerate() {
        if leaf_index >> i & 1 == 0 {
            seed = hash_children(&seed, h);
        } else {
            seed = hash_children(h, &seed);
        }
    }
    seed
}

/// Recomputes the expected Merkle root for `leaf_hash` at `leaf_index` in a
/// tree of `tree_size` leaves, given the audit path `proof`.
///
/// The split point between the inner and border phases is where the paths
/// to the leaf and to the last leaf of the tree diverge. An audit path of
/// the wrong length is not rejected here: it yields a root that will not
/// match the signed one, and the caller detects that by comparison.
///
/// # Errors
/// Returns [`AftlError::FieldRange`] when `tree_size` is zero or
/// `leaf_index` does not address a leaf of the tree.
pub fn root_from_icp(
    leaf_index: u64,
    tree_size: u64,
    proof: &[[u8; HASH_SIZE]],
    leaf_hash: [u8; HASH_SIZE],
) -> Result<[u8; HASH_SIZE]> {
    if tree_size == 0 {
        return Err(AftlError::FieldRange("tree_size must be positive".into()));
    }
    if leaf_index >= tree_size {
        return Err(AftlError::FieldRange(format!(
            "leaf_index {leaf_index} not below tree_size {tree_size}"
        )));
    }
    let inner = u64::BITS as usize - (leaf_index ^ (tree_size - 1)).leading_zeros() as usize;
    let split = inner.min(proof.len());
    let result = chain_inner(leaf_hash, &proof[..split], leaf_index);
    Ok(chain_border_right(result, &proof[split..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RFC 6962 MTH over in-memory leaves, used as the reference.
    fn mth(leaves: &[&[u8]]) -> [u8; HASH_SIZE] {
        match leaves.len() {
            0 => Sha256::digest(b"").into(),
            1 => hash_leaf(leaves[0]),
            n => {
                // Largest power of two strictly below n.
                let k = n.next_power_of_two() / 2;
                hash_children(&mth(&leaves[..k]), &mth(&leaves[k..]))
            }
        }
    }

    /// Reference audit-path construction (RFC 6962 PATH).
    fn path(m: usize, leaves: &[&[u8]]) -> Vec<[u8; HASH_SIZE]> {
        let n = leaves.len();
        if n <= 1 {
            return Vec::new();
        }
        let k = n.next_power_of_two() / 2;
        if m < k {
            let mut p = path(m, &leaves[..k]);
            p.push(mth(&leaves[k..]));
            p
        } else {
            let mut p = path(m - k, &leaves[k..]);
            p.push(mth(&leaves[..k]));
            p
        }
    }

    /// Leaf inputs from the certificate-transparency reference vectors.
    const CT_LEAVES: [&[u8]; 8] = [
        b"",
        b"\x00",
        b"\x10",
        b"\x20\x21",
        b"\x30\x31",
        b"\x40\x41\x42\x43",
        b"\x50\x51\x52\x53\x54\x55\x56\x57",
        b"\x60\x61\x62\x63\x64\x65\x66\x67\x68\x69\x6a\x6b\x6c\x6d\x6e\x6f",
    ];

    #[test]
    fn leaf_hash_prepends_zero_byte() {
        let mut h = Sha256::new();
        h.update([0u8]);
        h.update(b"abc");
        let want: [u8; 32] = h.finalize().into();
        assert_eq!(hash_leaf(b"abc"), want);

        // Known vector: the hash of the empty leaf.
        assert_eq!(
            hex::encode(hash_leaf(b"")),
            "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d"
        );
    }

    #[test]
    fn children_hash_prepends_one_byte() {
        let l = [0xaau8; 32];
        let r = [0xbbu8; 32];
        let mut h = Sha256::new();
        h.update([1u8]);
        h.update(l);
        h.update(r);
        let want: [u8; 32] = h.finalize().into();
        assert_eq!(hash_children(&l, &r), want);
    }

    #[test]
    fn ct_reference_root() {
        assert_eq!(
            hex::encode(mth(&CT_LEAVES)),
            "5dc9da79a70659a9ad559cb701ded9a2ab9d823aad2f4960cfe370eff4604328"
        );
    }

    #[test]
    fn inclusion_index_two_of_four() {
        // Audit path for L2 of {L0..L3}: [hash_leaf(L3), node(L0, L1)].
        let leaves: [&[u8]; 4] = [b"L0", b"L1", b"L2", b"L3"];
        let proof = [
            hash_leaf(b"L3"),
            hash_children(&hash_leaf(b"L0"), &hash_leaf(b"L1")),
        ];
        let root = root_from_icp(2, 4, &proof, hash_leaf(b"L2")).unwrap();
        assert_eq!(root, mth(&leaves));
    }

    #[test]
    fn inclusion_all_indices_all_sizes() {
        for n in 1..=CT_LEAVES.len() {
            let leaves = &CT_LEAVES[..n];
            let root = mth(leaves);
            for (i, leaf) in leaves.iter().enumerate() {
                let proof = path(i, leaves);
                let got = root_from_icp(i as u64, n as u64, &proof, hash_leaf(leaf)).unwrap();
                assert_eq!(got, root, "inclusion failed for index {i} of {n}");
            }
        }
    }

    #[test]
    fn single_leaf_tree_has_empty_path() {
        let leaf = hash_leaf(b"only");
        assert_eq!(root_from_icp(0, 1, &[], leaf).unwrap(), leaf);
    }

    #[test]
    fn mutations_change_the_root() {
        let leaves = &CT_LEAVES[..];
        let root = mth(leaves);
        let proof = path(5, leaves);

        // Flip one byte of the audit path.
        let mut bad = proof.clone();
        bad[0][7] ^= 0x01;
        assert_ne!(
            root_from_icp(5, 8, &bad, hash_leaf(CT_LEAVES[5])).unwrap(),
            root
        );

        // Wrong leaf bytes.
        assert_ne!(
            root_from_icp(5, 8, &proof, hash_leaf(b"not the leaf")).unwrap(),
            root
        );

        // Wrong index.
        assert_ne!(
            root_from_icp(4, 8, &proof, hash_leaf(CT_LEAVES[5])).unwrap(),
            root
        );

        // Wrong tree size.
        assert_ne!(
            root_from_icp(5, 7, &proof, hash_leaf(CT_LEAVES[5])).unwrap(),
            root
        );
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let leaf = hash_leaf(b"x");
        assert!(matches!(
            root_from_icp(0, 0, &[], leaf),
            Err(AftlError::FieldRange(_))
        ));
        assert!(matches!(
            root_from_icp(4, 4, &[], leaf),
            Err(AftlError::FieldRange(_))
        ));
    }
}
