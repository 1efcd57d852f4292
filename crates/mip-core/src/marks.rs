//! Caller-owned verification marks.
//!
//! A stamp's `verified` flag is a cache the caller keeps next to its stored
//! records. The verifiers never write it. This module derives that cache from
//! a [`ChainVerification`] as a side record keyed by stamp id, which the caller
//! can persist directly or copy back onto its stamps with [`VerificationMarks::apply`].

use crate::chain::chain_order;
use crate::models::{ChainVerification, MipStamp};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Per-stamp outcome of the last chain verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationMarks {
    marks: BTreeMap<Uuid, bool>,
}

impl VerificationMarks {
    /// Derives marks from a chain verification over `stamps`.
    ///
    /// In chain order, every stamp before the break point passed both its
    /// signature and linkage checks and is marked verified. The stamp at the
    /// break point and everything after it are not. A valid verdict marks
    /// every stamp. A verdict whose `broken_at` is not among `stamps` marks
    /// nothing as verified.
    pub fn from_verification(stamps: &[MipStamp], verification: &ChainVerification) -> Self {
        let known_break = verification
            .broken_at
            .filter(|id| stamps.iter().any(|s| s.id == *id));

        let mut marks = BTreeMap::new();
        let mut passing = verification.valid || known_break.is_some();

        for stamp in chain_order(stamps) {
            if Some(stamp.id) == known_break {
                passing = false;
            }
            marks.insert(stamp.id, passing);
        }

        Self { marks }
    }

    /// The recorded outcome for a stamp, if it was part of the verification.
    pub fn get(&self, stamp_id: &Uuid) -> Option<bool> {
        self.marks.get(stamp_id).copied()
    }

    /// Returns true if the stamp is marked verified.
    pub fn is_verified(&self, stamp_id: &Uuid) -> bool {
        self.get(stamp_id).unwrap_or(false)
    }

    /// Number of stamps marked verified.
    pub fn verified_count(&self) -> usize {
        self.marks.values().filter(|v| **v).count()
    }

    /// Number of stamps recorded.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Returns true if no stamps are recorded.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Iterates over `(stamp_id, verified)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &bool)> {
        self.marks.iter()
    }

    /// Copies the marks onto the caller's stamps.
    ///
    /// Stamps without a mark are left untouched.
    ///
    /// # Returns
    ///
    /// The number of stamps whose `verified` flag changed.
    pub fn apply(&self, stamps: &mut [MipStamp]) -> usize {
        let mut changed = 0;
        for stamp in stamps.iter_mut() {
            if let Some(verified) = self.get(&stamp.id) {
                if stamp.verified != verified {
                    stamp.verified = verified;
                    changed += 1;
                }
            }
        }
        changed
    }
}
