//! # Merkle Digest Engine
//!
//! This module reduces an unordered collection of file entries to a single
//! SHA-256 Merkle root. The root summarizes the whole snapshot: any change to
//! a path or content hash, and any added or removed entry, changes it.
//!
//! ## Threat Model
//!
//! The Merkle root provides:
//!
//! - **Tamper Evidence**: Any modification to a leaf changes the root hash.
//! - **Order Independence**: Entries are sorted before hashing, so callers
//!   cannot produce two roots for the same snapshot by reordering input.
//! - **Selective Disclosure**: Inclusion proofs show that one file was part of
//!   a stamped tree without revealing the other entries.
//!
//! ## Tree Construction
//!
//! ```text
//!                    Root Hash
//!                   /         \
//!           H(H1+H2)           H(H3+H3)      <- odd level: last node pairs with itself
//!            /    \             /
//!          H1     H2          H3
//!          |      |           |
//!      "a:h1"  "b:h2"      "c:h3"           <- leaf = H(path + ":" + content_hash)
//! ```
//!
//! Every node is a lowercase hex string, and parents hash the concatenation
//! of the two child hex strings. An empty snapshot has the fixed root
//! [`EMPTY_TREE_ROOT`], the SHA-256 of the empty byte string.
//!
//! ## References
//!
//! - **Merkle, R. C. (1987)** - "A Digital Signature Based on a Conventional
//!   Encryption Function". CRYPTO '87. <https://doi.org/10.1007/3-540-48184-2_32>
//! - **NIST FIPS 180-4** - Secure Hash Standard (SHA-256).

use crate::models::{FileEntry, MerkleProof, MerkleProofNode};
use sha2::{Digest, Sha256};

/// Root of an empty snapshot: SHA-256 of the empty byte string.
pub const EMPTY_TREE_ROOT: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Computes the Merkle root of a set of file entries.
///
/// The caller's slice is not reordered. Entries are sorted by path (byte
/// order), then by content hash for entries that share a path, so the result
/// depends only on the multiset of `(path, content_hash)` pairs.
///
/// # Example
///
/// ```rust
/// use mip_core::{merkle::compute_merkle_root, FileEntry};
///
/// let forward = vec![FileEntry::new("a", "h1"), FileEntry::new("b", "h2")];
/// let reverse = vec![FileEntry::new("b", "h2"), FileEntry::new("a", "h1")];
///
/// assert_eq!(compute_merkle_root(&forward), compute_merkle_root(&reverse));
/// ```
pub fn compute_merkle_root(entries: &[FileEntry]) -> String {
    if entries.is_empty() {
        return EMPTY_TREE_ROOT.to_string();
    }

    let mut level: Vec<String> = sorted_entries(entries).into_iter().map(leaf_hash).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }

    level.swap_remove(0)
}

/// Generates an inclusion proof for the entry at `path`.
///
/// # Returns
///
/// `None` if no entry has that path. When several entries share the path,
/// the proof covers the first one in sorted order.
///
/// # Example
///
/// ```rust
/// use mip_core::{merkle, FileEntry};
///
/// let entries = vec![
///     FileEntry::new("a", "h1"),
///     FileEntry::new("b", "h2"),
///     FileEntry::new("c", "h3"),
/// ];
///
/// let root = merkle::compute_merkle_root(&entries);
/// let proof = merkle::merkle_proof(&entries, "b").unwrap();
/// assert!(merkle::verify_merkle_proof(&proof, &root));
/// ```
pub fn merkle_proof(entries: &[FileEntry], path: &str) -> Option<MerkleProof> {
    let sorted = sorted_entries(entries);
    let mut index = sorted.iter().position(|e| e.path == path)?;
    let entry = sorted[index].clone();

    let mut level: Vec<String> = sorted.into_iter().map(leaf_hash).collect();
    let mut proof_path = Vec::new();

    while level.len() > 1 {
        let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };

        // Odd count: the last node is its own sibling
        let sibling = level.get(sibling_index).unwrap_or(&level[index]).clone();

        proof_path.push(MerkleProofNode {
            hash: sibling,
            is_left: index % 2 == 1,
        });

        level = next_level(&level);
        index /= 2;
    }

    Some(MerkleProof {
        entry,
        path: proof_path,
        root: level.swap_remove(0),
    })
}

/// Verifies an inclusion proof against a trusted root.
///
/// The leaf is recomputed from the proof's entry and folded up the sibling
/// path. The proof's own `root` field is ignored; only `expected_root` is
/// trusted.
pub fn verify_merkle_proof(proof: &MerkleProof, expected_root: &str) -> bool {
    let mut current = leaf_hash(&proof.entry);

    for node in &proof.path {
        current = if node.is_left {
            hash_pair(&node.hash, &current)
        } else {
            hash_pair(&current, &node.hash)
        };
    }

    current == expected_root
}

/// SHA-256 of `data`, lowercase hex.
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn sorted_entries(entries: &[FileEntry]) -> Vec<&FileEntry> {
    let mut sorted: Vec<&FileEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        a.path
            .as_bytes()
            .cmp(b.path.as_bytes())
            .then_with(|| a.content_hash.as_bytes().cmp(b.content_hash.as_bytes()))
    });
    sorted
}

/// Leaf hash: `H(path + ":" + content_hash)`.
fn leaf_hash(entry: &FileEntry) -> String {
    sha256_hex(format!("{}:{}", entry.path, entry.content_hash).as_bytes())
}

/// Parent hash: `H(left_hex + right_hex)`.
fn hash_pair(left: &str, right: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}

fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|chunk| {
            let left = &chunk[0];
            let right = chunk.get(1).unwrap_or(left);
            hash_pair(left, right)
        })
        .collect()
}
