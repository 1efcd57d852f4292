//! # MIP Core - Mutable Integrity Proofs
//!
//! MIP produces tamper-evident, Ed25519-signed stamps attesting to the state of
//! a repository commit, and links successive stamps into a verifiable chain of
//! custody.
//!
//! ## Purpose
//!
//! This crate implements the five parts of the stamp pipeline:
//!
//! 1. **Merkle Digest Engine** - Reduces an unordered set of `(path, content hash)`
//!    pairs to one deterministic SHA-256 root.
//!
//! 2. **Canonical Payload Builder** - Fixes the exact bytes that are signed for a
//!    stamp, so signer and verifiers always agree.
//!
//! 3. **Stamp Factory** - Allocates new stamps with a fresh id and timestamp.
//!
//! 4. **Signer / Verifier** - Signs the canonical payload and checks signatures
//!    against the stamp's current field values.
//!
//! 5. **Chain Verifier** - Orders a repository's stamps by creation time and
//!    verifies every signature and parent link, reporting the first break.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | Content tampering | Files changed after stamping | Merkle root mismatch |
//! | Metadata tampering | Signed field edited in storage | Payload rebuilt at verify time |
//! | History rewrite | Stamp removed, inserted or reordered | Parent linkage check |
//! | Forgery | Stamp signed by another key | Ed25519 verification |
//! | Input reordering | Caller supplies stamps or files out of order | Order always derived |
//!
//! Out of scope: storing stamps, key management or rotation, transport,
//! revocation, and multi-signer consensus.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              MIP CORE                               │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  file entries ──▶ ┌──────────────┐  root  ┌──────────────┐          │
//! │                   │    MERKLE    │──────▶ │    STAMP     │          │
//! │                   │    ENGINE    │        │   FACTORY    │          │
//! │                   └──────────────┘        └──────┬───────┘          │
//! │                                                  │ unsigned stamp   │
//! │                                                  ▼                  │
//! │                   ┌──────────────┐ bytes  ┌──────────────┐          │
//! │                   │  CANONICAL   │──────▶ │   SIGNER /   │──▶ stamp │
//! │                   │   PAYLOAD    │        │   VERIFIER   │          │
//! │                   └──────────────┘        └──────┬───────┘          │
//! │                                                  │                  │
//! │  stored stamps ─────────────────────────▶ ┌──────▼───────┐          │
//! │                                           │    CHAIN     │──▶ verdict
//! │                                           │   VERIFIER   │          │
//! │                                           └──────────────┘          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every component is a pure function of its arguments. Nothing here holds
//! shared state, performs I/O on the hot path, or blocks, so all operations can
//! run concurrently without coordination. Key material is passed in on every
//! call and is never stored or logged.
//!
//! ## Usage
//!
//! ```rust
//! use mip_core::{compute_merkle_root, verify_chain, FileEntry, MipStamp, StampKeyPair};
//!
//! let keys = StampKeyPair::generate();
//!
//! // Summarize the commit's files
//! let files = vec![
//!     FileEntry::from_contents("src/lib.rs", b"pub fn hello() {}"),
//!     FileEntry::from_contents("README.md", b"# hello"),
//! ];
//! let root = compute_merkle_root(&files);
//!
//! // Stamp and sign the first commit
//! let mut first = MipStamp::new(1, "3f2a9c1", &root, "tree-1", 42, None);
//! first.created_at = first.created_at - chrono::Duration::minutes(5);
//! first.sign(&keys.secret_key_bytes()).unwrap();
//!
//! // Stamp the next commit, linked to the first
//! let mut second = first.next_in_chain("8b71d0e", &root, "tree-2", 42);
//! second.sign(&keys.secret_key_bytes()).unwrap();
//!
//! // Later: verify what came back from storage
//! let verdict = verify_chain(&[second, first], &keys.public_key_bytes());
//! assert!(verdict.valid);
//! ```
//!
//! ## Security Considerations
//!
//! - **Ordering Trust**: Chain order comes from `created_at`, which the stamp's
//!   creator chooses before signing. A signer can position its own stamps but
//!   cannot re-sign anyone else's. Enable
//!   [`ChainPolicy::reject_duplicate_timestamps`] to refuse ambiguous ordering.
//!
//! - **Unsigned Fields**: `id`, `repo_id` and `verified` are not covered by the
//!   signature. Identity is protected indirectly through the parent links of
//!   later stamps; enable [`ChainPolicy::require_single_repository`] to reject
//!   mixed-repository input.
//!
//! ## References
//!
//! - **RFC 8032** - Edwards-Curve Digital Signature Algorithm (EdDSA).
//!   <https://www.rfc-editor.org/rfc/rfc8032>
//! - **Merkle, R. C. (1987)** - "A Digital Signature Based on a Conventional
//!   Encryption Function". CRYPTO '87.
//! - **NIST FIPS 180-4** - Secure Hash Standard (SHA-256).

pub mod chain;
pub mod config;
pub mod error;
pub mod marks;
pub mod merkle;
pub mod models;
pub mod payload;
pub mod signer;
pub mod stamp;

pub use chain::{verify_chain, verify_chain_with_policy, ChainBreak, ChainPolicy};
pub use config::{KeyConfig, MipConfig};
pub use error::{MipError, Result};
pub use marks::VerificationMarks;
pub use merkle::{compute_merkle_root, merkle_proof, verify_merkle_proof, EMPTY_TREE_ROOT};
pub use models::{ChainVerification, FileEntry, MerkleProof, MerkleProofNode, MipStamp};
pub use signer::{verify_stamp, StampKeyPair};
pub use stamp::create_stamp;
