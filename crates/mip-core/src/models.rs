//! # Core Data Models for MIP
//!
//! This module defines the records that flow through the stamp pipeline:
//! the [`FileEntry`] inputs of the Merkle engine, the [`MipStamp`] chain
//! unit, and the [`ChainVerification`] verdict.
//!
//! ## Threat Model
//!
//! The types in this module help defend against:
//!
//! - **Type Confusion**: Stamp identifiers are `Uuid`s, never bare strings, so a
//!   parent reference cannot be confused with a commit SHA.
//! - **Silent Tampering**: Every field that feeds the signature is listed in
//!   [`SIGNED_FIELDS`] and covered by the canonical payload.
//! - **Ambiguous Verdicts**: `ChainVerification` always names the first broken
//!   stamp when the chain is invalid.
//!
//! ## References
//!
//! - RFC 8032 - Edwards-Curve Digital Signature Algorithm (key and signature sizes)
//! - RFC 4122 - UUID version 4 for stamp identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Ed25519 secret key (seed) size in bytes.
pub const PRIVATE_KEY_SIZE: usize = ed25519_dalek::SECRET_KEY_LENGTH;

/// Ed25519 public key size in bytes.
pub const PUBLIC_KEY_SIZE: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;

/// Ed25519 signature size in bytes.
pub const SIGNATURE_SIZE: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// Names of the stamp fields covered by the signature, in payload order.
pub const SIGNED_FIELDS: [&str; 6] = [
    "commit_sha",
    "merkle_root",
    "tree_hash",
    "author_id",
    "parent_stamp_id",
    "timestamp",
];

/// A file in a repository snapshot, as seen by the Merkle engine.
///
/// Identity is the path alone. Entries are ephemeral inputs and are never
/// persisted by this crate.
///
/// # Example
///
/// ```rust
/// use mip_core::FileEntry;
///
/// let entry = FileEntry::new("src/main.rs", "9f86d081884c7d65");
/// assert_eq!(entry.path, "src/main.rs");
///
/// let hashed = FileEntry::from_contents("README.md", b"hello");
/// assert_eq!(hashed.content_hash.len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Repository-relative path.
    pub path: String,

    /// Hex digest of the file contents.
    #[serde(rename = "hash")]
    pub content_hash: String,
}

impl FileEntry {
    /// Creates an entry from a path and an already computed content hash.
    pub fn new(path: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
        }
    }

    /// Creates an entry by hashing raw file contents with SHA-256.
    pub fn from_contents(path: impl Into<String>, contents: &[u8]) -> Self {
        Self {
            path: path.into(),
            content_hash: hex::encode(Sha256::digest(contents)),
        }
    }
}

/// A cryptographic integrity stamp for one commit.
///
/// Stamps are created unsigned by [`MipStamp::new`], signed once with
/// [`MipStamp::sign`], and are read-only input to verification afterwards.
///
/// # Fields
///
/// The six signable fields are `commit_sha`, `merkle_root`, `tree_hash`,
/// `author_id`, `parent_stamp_id` and `created_at`. Changing any of them after
/// signing makes [`MipStamp::verify_signature`] return `Ok(false)`.
///
/// `id`, `repo_id` and `verified` are not signed. `verified` belongs to the
/// caller; nothing in this crate writes it.
///
/// # Example
///
/// ```rust
/// use mip_core::MipStamp;
///
/// let stamp = MipStamp::new(1, "abc123", "root", "tree", 10, None);
/// assert!(stamp.signature.is_empty());
/// assert!(!stamp.verified);
/// assert!(stamp.is_chain_start());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MipStamp {
    /// Unique identifier assigned at creation.
    pub id: Uuid,

    /// Owning repository.
    pub repo_id: i64,

    /// Commit this stamp attests.
    pub commit_sha: String,

    /// Hex Merkle root over the commit's file entries.
    pub merkle_root: String,

    /// Independent tree-content hash supplied by the caller.
    pub tree_hash: String,

    /// Author of the commit.
    pub author_id: i64,

    /// Previous stamp in this repository's chain. `None` only for the first stamp.
    pub parent_stamp_id: Option<Uuid>,

    /// Hex-encoded Ed25519 signature. Empty until signed.
    #[serde(default)]
    pub signature: String,

    /// Caller-managed cache of the last verification outcome.
    #[serde(default)]
    pub verified: bool,

    /// Creation instant (UTC). The chain order key.
    pub created_at: DateTime<Utc>,
}

impl MipStamp {
    /// Returns true if this stamp claims to start a chain (no parent).
    pub fn is_chain_start(&self) -> bool {
        self.parent_stamp_id.is_none()
    }

    /// Returns true once a signature has been attached.
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Result of verifying a chain of stamps.
///
/// A fresh value is produced per call. When `valid` is false, `broken_at`
/// names the first stamp (in chain order) where verification failed and
/// `error` carries a human-readable diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    /// Whether the whole chain verified.
    pub valid: bool,

    /// First stamp at which verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broken_at: Option<Uuid>,

    /// Diagnostic for the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChainVerification {
    /// A passing verdict.
    pub fn valid() -> Self {
        Self {
            valid: true,
            broken_at: None,
            error: None,
        }
    }

    /// A failing verdict located at `stamp_id`.
    pub fn broken(stamp_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            broken_at: Some(stamp_id),
            error: Some(error.into()),
        }
    }

    /// Returns true if the chain verified.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// A node in a Merkle inclusion proof.
///
/// Holds the sibling hash at one tree level and the side it sits on when
/// the parent is recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProofNode {
    /// Hex hash of the sibling at this level.
    pub hash: String,

    /// Whether the sibling is concatenated on the left.
    pub is_left: bool,
}

/// Proof that one file entry is part of a Merkle root.
///
/// The leaf is recomputed from `entry` during verification, so a proof
/// cannot be replayed for a different path or content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The entry being proven.
    pub entry: FileEntry,

    /// Sibling hashes from leaf to root.
    pub path: Vec<MerkleProofNode>,

    /// Root the proof was generated against.
    pub root: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_entry_serializes_hash_field() {
        let entry = FileEntry::new("a.txt", "h1");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"path":"a.txt","hash":"h1"}"#);

        let parsed: FileEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_file_entry_from_contents() {
        let entry = FileEntry::from_contents("empty", b"");
        assert_eq!(
            entry.content_hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_unsigned_stamp_deserializes_without_signature() {
        let json = r#"{
            "id": "7f1d8a4e-3c1b-4f5a-9a55-0b7c6d2e1f00",
            "repo_id": 3,
            "commit_sha": "c1",
            "merkle_root": "r1",
            "tree_hash": "t1",
            "author_id": 9,
            "parent_stamp_id": null,
            "created_at": "2026-01-02T03:04:05.123456789Z"
        }"#;

        let stamp: MipStamp = serde_json::from_str(json).unwrap();
        assert!(!stamp.is_signed());
        assert!(!stamp.verified);
        assert!(stamp.is_chain_start());
        assert_eq!(stamp.created_at.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_chain_verification_omits_empty_fields() {
        let json = serde_json::to_string(&ChainVerification::valid()).unwrap();
        assert_eq!(json, r#"{"valid":true}"#);

        let id = Uuid::new_v4();
        let broken = ChainVerification::broken(id, "bad link");
        assert!(!broken.is_valid());
        assert_eq!(broken.broken_at, Some(id));
        assert_eq!(broken.error.as_deref(), Some("bad link"));
    }

    #[test]
    fn test_key_sizes() {
        assert_eq!(PRIVATE_KEY_SIZE, 32);
        assert_eq!(PUBLIC_KEY_SIZE, 32);
        assert_eq!(SIGNATURE_SIZE, 64);
    }
}
