//! # Chain Verifier
//!
//! Verifies that a repository's stamps form an unbroken, correctly ordered,
//! correctly signed chain of custody.
//!
//! ## Algorithm
//!
//! 1. Copy the input and stable-sort it by `created_at` ascending. Chain order
//!    is always derived; the caller's sequence order is never trusted.
//! 2. Walk the sorted stamps. For each stamp, verify its signature. For every
//!    stamp after the first, require `parent_stamp_id` to name the stamp
//!    immediately before it.
//! 3. Stop at the first failure and report the stamp where it occurred.
//!
//! ```text
//!   s1 (parent: none) ◀── s2 (parent: s1) ◀── s3 (parent: s2)
//!   t=0                   t=1                  t=2
//! ```
//!
//! ## Threat Model
//!
//! | Threat | Detection |
//! |--------|-----------|
//! | Edited stamp | Signature mismatch at that stamp |
//! | Stamp forged with another key | Signature mismatch at that stamp |
//! | Stamp removed from the middle | Successor's parent no longer matches |
//! | Stamp spliced in | Its parent, or its successor's, does not match |
//! | Orphan appended | Missing parent on a non-first stamp |
//!
//! `created_at` is the only ordering key and is not authenticated beyond being
//! part of the signed payload. A signer can choose its own stamp's position by
//! choosing its timestamp, but cannot re-sign anyone else's stamp. Stamps with
//! identical timestamps keep their input order unless
//! [`ChainPolicy::reject_duplicate_timestamps`] is set.

use crate::models::{ChainVerification, MipStamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Optional hardening checks for chain verification.
///
/// Both checks are off by default, in which case [`verify_chain_with_policy`]
/// behaves exactly like [`verify_chain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainPolicy {
    /// Break the chain at a stamp whose `created_at` equals its predecessor's.
    pub reject_duplicate_timestamps: bool,

    /// Break the chain at a stamp whose `repo_id` differs from the first stamp's.
    pub require_single_repository: bool,
}

impl ChainPolicy {
    /// Policy with every optional check enabled.
    pub fn strict() -> Self {
        Self {
            reject_duplicate_timestamps: true,
            require_single_repository: true,
        }
    }
}

/// Why a chain broke. Renders the diagnostic in [`ChainVerification::error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainBreak {
    /// Signature is well-formed but does not match.
    #[error("stamp {stamp_id}: invalid signature")]
    InvalidSignature {
        /// Offending stamp
        stamp_id: Uuid,
    },

    /// Signature could not be checked (missing, malformed, bad key).
    #[error("stamp {stamp_id}: {reason}")]
    SignatureError {
        /// Offending stamp
        stamp_id: Uuid,
        /// Verifier error text
        reason: String,
    },

    /// Non-first stamp has no parent.
    #[error("stamp {stamp_id} has no parent, but is not the first in chain (prev: {previous})")]
    MissingParent {
        /// Offending stamp
        stamp_id: Uuid,
        /// Stamp that precedes it in chain order
        previous: Uuid,
    },

    /// Parent does not name the immediate predecessor.
    #[error("stamp {stamp_id} parent mismatch: expected {expected}, got {actual}")]
    ParentMismatch {
        /// Offending stamp
        stamp_id: Uuid,
        /// Id of the immediate predecessor
        expected: Uuid,
        /// Parent id carried by the stamp
        actual: Uuid,
    },

    /// Two consecutive stamps share a creation instant.
    #[error("stamp {stamp_id} has the same created_at ({created_at}) as {previous}")]
    DuplicateTimestamp {
        /// Offending stamp
        stamp_id: Uuid,
        /// Stamp that precedes it in chain order
        previous: Uuid,
        /// Shared timestamp
        created_at: DateTime<Utc>,
    },

    /// Stamp belongs to a different repository than the chain start.
    #[error("stamp {stamp_id} belongs to repository {actual}, chain starts in repository {expected}")]
    ForeignRepository {
        /// Offending stamp
        stamp_id: Uuid,
        /// Repository of the first stamp
        expected: i64,
        /// Repository of the offending stamp
        actual: i64,
    },
}

impl ChainBreak {
    /// The stamp at which the chain broke.
    pub fn stamp_id(&self) -> Uuid {
        match self {
            Self::InvalidSignature { stamp_id }
            | Self::SignatureError { stamp_id, .. }
            | Self::MissingParent { stamp_id, .. }
            | Self::ParentMismatch { stamp_id, .. }
            | Self::DuplicateTimestamp { stamp_id, .. }
            | Self::ForeignRepository { stamp_id, .. } => *stamp_id,
        }
    }
}

impl From<ChainBreak> for ChainVerification {
    fn from(brk: ChainBreak) -> Self {
        ChainVerification::broken(brk.stamp_id(), brk.to_string())
    }
}

/// Verifies a chain of stamps with the default policy.
///
/// # Returns
///
/// - `{valid: true}` for an empty input or an intact chain
/// - `{valid: false, broken_at, error}` naming the first failing stamp
///
/// # Example
///
/// ```rust
/// use mip_core::{chain::verify_chain, MipStamp, StampKeyPair};
///
/// let keys = StampKeyPair::generate();
///
/// let mut s1 = MipStamp::new(1, "c1", "r1", "t1", 1, None);
/// s1.created_at = s1.created_at - chrono::Duration::hours(1);
/// s1.sign(&keys.secret_key_bytes()).unwrap();
///
/// let mut s2 = s1.next_in_chain("c2", "r2", "t2", 1);
/// s2.sign(&keys.secret_key_bytes()).unwrap();
///
/// // Input order does not matter
/// let result = verify_chain(&[s2, s1], &keys.public_key_bytes());
/// assert!(result.valid);
/// ```
pub fn verify_chain(stamps: &[MipStamp], public_key: &[u8]) -> ChainVerification {
    verify_chain_with_policy(stamps, public_key, &ChainPolicy::default())
}

/// Verifies a chain of stamps, applying the optional checks in `policy`.
pub fn verify_chain_with_policy(
    stamps: &[MipStamp],
    public_key: &[u8],
    policy: &ChainPolicy,
) -> ChainVerification {
    debug!(stamps = stamps.len(), "verifying stamp chain");

    match find_chain_break(stamps, public_key, policy) {
        None => {
            debug!(stamps = stamps.len(), "stamp chain intact");
            ChainVerification::valid()
        }
        Some(brk) => {
            warn!(stamp_id = %brk.stamp_id(), error = %brk, "stamp chain broken");
            brk.into()
        }
    }
}

/// Returns the first break in the chain, or `None` if the chain is intact.
pub fn find_chain_break(
    stamps: &[MipStamp],
    public_key: &[u8],
    policy: &ChainPolicy,
) -> Option<ChainBreak> {
    let sorted = chain_order(stamps);
    let first = *sorted.first()?;

    for (i, stamp) in sorted.iter().enumerate() {
        match stamp.verify_signature(public_key) {
            Ok(true) => {}
            Ok(false) => return Some(ChainBreak::InvalidSignature { stamp_id: stamp.id }),
            Err(e) => {
                return Some(ChainBreak::SignatureError {
                    stamp_id: stamp.id,
                    reason: e.to_string(),
                })
            }
        }

        if policy.require_single_repository && stamp.repo_id != first.repo_id {
            return Some(ChainBreak::ForeignRepository {
                stamp_id: stamp.id,
                expected: first.repo_id,
                actual: stamp.repo_id,
            });
        }

        if i == 0 {
            continue;
        }
        let prev = sorted[i - 1];

        if policy.reject_duplicate_timestamps && stamp.created_at == prev.created_at {
            return Some(ChainBreak::DuplicateTimestamp {
                stamp_id: stamp.id,
                previous: prev.id,
                created_at: stamp.created_at,
            });
        }

        match stamp.parent_stamp_id {
            None => {
                return Some(ChainBreak::MissingParent {
                    stamp_id: stamp.id,
                    previous: prev.id,
                })
            }
            Some(parent) if parent != prev.id => {
                return Some(ChainBreak::ParentMismatch {
                    stamp_id: stamp.id,
                    expected: prev.id,
                    actual: parent,
                })
            }
            Some(_) => {}
        }
    }

    None
}

/// Stamps in chain order: stable sort by `created_at` ascending.
pub fn chain_order(stamps: &[MipStamp]) -> Vec<&MipStamp> {
    let mut sorted: Vec<&MipStamp> = stamps.iter().collect();
    sorted.sort_by_key(|s| s.created_at);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::StampKeyPair;
    use chrono::Duration;

    /// Builds a signed chain of `n` stamps, one hour apart, oldest first.
    fn signed_chain(keys: &StampKeyPair, n: usize) -> Vec<MipStamp> {
        let base = Utc::now() - Duration::hours(n as i64);
        let mut chain: Vec<MipStamp> = Vec::with_capacity(n);

        for i in 0..n {
            let parent = chain.last().map(|s| s.id);
            let mut stamp = MipStamp::new(1, format!("c{}", i), format!("r{}", i), "t", 1, parent);
            stamp.created_at = base + Duration::hours(i as i64);
            stamp.sign(&keys.secret_key_bytes()).unwrap();
            chain.push(stamp);
        }

        chain
    }

    #[test]
    fn test_empty_chain_valid() {
        let keys = StampKeyPair::generate();
        assert_eq!(verify_chain(&[], &keys.public_key_bytes()), ChainVerification::valid());
    }

    #[test]
    fn test_single_stamp_valid() {
        let keys = StampKeyPair::generate();
        let chain = signed_chain(&keys, 1);
        assert!(verify_chain(&chain, &keys.public_key_bytes()).valid);
    }

    #[test]
    fn test_first_stamp_parent_not_checked() {
        let keys = StampKeyPair::generate();
        let mut stamp = MipStamp::new(1, "c", "r", "t", 1, Some(Uuid::new_v4()));
        stamp.sign(&keys.secret_key_bytes()).unwrap();

        assert!(verify_chain(&[stamp], &keys.public_key_bytes()).valid);
    }

    #[test]
    fn test_reverse_order_valid() {
        let keys = StampKeyPair::generate();
        let mut chain = signed_chain(&keys, 4);
        chain.reverse();
        assert!(verify_chain(&chain, &keys.public_key_bytes()).valid);
    }

    #[test]
    fn test_missing_parent_breaks_at_current() {
        let keys = StampKeyPair::generate();
        let mut chain = signed_chain(&keys, 3);
        chain[2].parent_stamp_id = None;
        chain[2].sign(&keys.secret_key_bytes()).unwrap();

        let brk = find_chain_break(&chain, &keys.public_key_bytes(), &ChainPolicy::default()).unwrap();
        assert_eq!(
            brk,
            ChainBreak::MissingParent {
                stamp_id: chain[2].id,
                previous: chain[1].id,
            }
        );
    }

    #[test]
    fn test_skipped_parent_breaks_at_current() {
        let keys = StampKeyPair::generate();
        let mut chain = signed_chain(&keys, 3);
        chain[2].parent_stamp_id = Some(chain[0].id);
        chain[2].sign(&keys.secret_key_bytes()).unwrap();

        let result = verify_chain(&chain, &keys.public_key_bytes());
        assert!(!result.valid);
        assert_eq!(result.broken_at, Some(chain[2].id));
        assert!(result.error.unwrap().contains("parent mismatch"));
    }

    #[test]
    fn test_bad_signature_reported_like_mismatch() {
        let keys = StampKeyPair::generate();
        let mut chain = signed_chain(&keys, 2);
        chain[0].signature = hex::encode(b"bad");

        let result = verify_chain(&chain, &keys.public_key_bytes());
        assert!(!result.valid);
        assert_eq!(result.broken_at, Some(chain[0].id));
        assert!(result.error.unwrap().contains("malformed signature"));
    }

    #[test]
    fn test_unsigned_stamp_breaks_chain() {
        let keys = StampKeyPair::generate();
        let mut chain = signed_chain(&keys, 2);
        chain[1].signature.clear();

        let result = verify_chain(&chain, &keys.public_key_bytes());
        assert_eq!(result.broken_at, Some(chain[1].id));
        assert!(result.error.unwrap().contains("signature is missing"));
    }

    #[test]
    fn test_signature_checked_before_linkage() {
        let keys = StampKeyPair::generate();
        let mut chain = signed_chain(&keys, 2);
        // Tampered parent without re-signing: reported as a signature failure
        chain[1].parent_stamp_id = Some(Uuid::new_v4());

        let brk = find_chain_break(&chain, &keys.public_key_bytes(), &ChainPolicy::default()).unwrap();
        assert_eq!(brk, ChainBreak::InvalidSignature { stamp_id: chain[1].id });
    }

    #[test]
    fn test_invalid_key_breaks_at_first_stamp() {
        let keys = StampKeyPair::generate();
        let chain = signed_chain(&keys, 2);

        let result = verify_chain(&chain, &[0u8; 5]);
        assert_eq!(result.broken_at, Some(chain[0].id));
        assert!(result.error.unwrap().contains("invalid key size"));
    }

    #[test]
    fn test_duplicate_timestamps_follow_input_order_by_default() {
        let keys = StampKeyPair::generate();
        let mut chain = signed_chain(&keys, 2);
        chain[1].created_at = chain[0].created_at;
        chain[1].sign(&keys.secret_key_bytes()).unwrap();

        // Input order s1, s2 matches the links
        assert!(verify_chain(&chain, &keys.public_key_bytes()).valid);

        // Reversed input puts s2 first, so s1 appears to lack a parent
        let reversed = vec![chain[1].clone(), chain[0].clone()];
        let result = verify_chain(&reversed, &keys.public_key_bytes());
        assert_eq!(result.broken_at, Some(chain[0].id));
    }

    #[test]
    fn test_duplicate_timestamps_rejected_by_policy() {
        let keys = StampKeyPair::generate();
        let mut chain = signed_chain(&keys, 2);
        chain[1].created_at = chain[0].created_at;
        chain[1].sign(&keys.secret_key_bytes()).unwrap();

        let policy = ChainPolicy {
            reject_duplicate_timestamps: true,
            ..ChainPolicy::default()
        };
        let brk = find_chain_break(&chain, &keys.public_key_bytes(), &policy).unwrap();
        assert!(matches!(brk, ChainBreak::DuplicateTimestamp { stamp_id, .. } if stamp_id == chain[1].id));
    }

    #[test]
    fn test_foreign_repository_rejected_by_policy() {
        let keys = StampKeyPair::generate();
        let mut chain = signed_chain(&keys, 3);
        // repo_id is not signed, so the signature still holds
        chain[1].repo_id = 2;

        assert!(verify_chain(&chain, &keys.public_key_bytes()).valid);

        let result = verify_chain_with_policy(&chain, &keys.public_key_bytes(), &ChainPolicy::strict());
        assert_eq!(result.broken_at, Some(chain[1].id));
        assert!(result.error.unwrap().contains("repository 2"));
    }

    #[test]
    fn test_chain_order_is_stable() {
        let a = MipStamp::new(1, "a", "r", "t", 1, None);
        let mut b = MipStamp::new(1, "b", "r", "t", 1, None);
        b.created_at = a.created_at;

        let input = vec![a.clone(), b.clone()];
        let order: Vec<Uuid> = chain_order(&input).iter().map(|s| s.id).collect();
        assert_eq!(order, vec![a.id, b.id]);
    }
}
