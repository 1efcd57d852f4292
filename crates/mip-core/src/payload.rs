//! # Canonical Signing Payload
//!
//! This module builds the exact byte sequence that is signed and verified for
//! a stamp. Signer and every verifier must derive identical bytes from
//! identical field values, so the encoding is fixed down to the field order,
//! the null representation and the timestamp precision.
//!
//! ## Encoding
//!
//! A compact JSON object, no insignificant whitespace, keys in this order:
//!
//! | Key | Source field | Encoding |
//! |-----|--------------|----------|
//! | `commit_sha` | `commit_sha` | JSON string |
//! | `merkle_root` | `merkle_root` | JSON string |
//! | `tree_hash` | `tree_hash` | JSON string |
//! | `author_id` | `author_id` | JSON integer |
//! | `parent_stamp_id` | `parent_stamp_id` | lowercase hyphenated UUID string, or `null` |
//! | `timestamp` | `created_at` | RFC 3339, UTC, nine fractional digits, `Z` suffix |
//!
//! ## Threat Model
//!
//! - **Encoding Drift**: a verifier that renders the timestamp with a different
//!   precision or zone suffix would reject every honest stamp. The timestamp is
//!   therefore formatted explicitly instead of relying on a default `Display`.
//! - **Stale Payloads**: payloads are never cached. Each call rebuilds the bytes
//!   from the stamp's current field values, which is what makes edits to any
//!   signed field detectable.
//!
//! ## Example
//!
//! ```rust
//! use mip_core::{payload::canonical_payload, MipStamp};
//! use chrono::{TimeZone, Utc};
//!
//! let mut stamp = MipStamp::new(1, "abc", "root", "tree", 7, None);
//! stamp.created_at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
//!
//! let bytes = canonical_payload(&stamp).unwrap();
//! assert_eq!(
//!     String::from_utf8(bytes).unwrap(),
//!     r#"{"commit_sha":"abc","merkle_root":"root","tree_hash":"tree","author_id":7,"parent_stamp_id":null,"timestamp":"2026-01-02T03:04:05.000000000Z"}"#
//! );
//! ```

use crate::error::Result;
use crate::models::MipStamp;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// The signable view of a stamp. Field order is the wire order.
#[derive(Serialize)]
struct SignablePayload<'a> {
    commit_sha: &'a str,
    merkle_root: &'a str,
    tree_hash: &'a str,
    author_id: i64,
    parent_stamp_id: Option<Uuid>,
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: &'a DateTime<Utc>,
}

/// Builds the canonical payload bytes for a stamp's current field values.
///
/// # Errors
///
/// Returns [`MipError::PayloadSerialization`](crate::MipError::PayloadSerialization)
/// if JSON encoding fails. This does not happen for well-formed stamps.
pub fn canonical_payload(stamp: &MipStamp) -> Result<Vec<u8>> {
    let payload = SignablePayload {
        commit_sha: &stamp.commit_sha,
        merkle_root: &stamp.merkle_root,
        tree_hash: &stamp.tree_hash,
        author_id: stamp.author_id,
        parent_stamp_id: stamp.parent_stamp_id,
        timestamp: &stamp.created_at,
    };

    Ok(serde_json::to_vec(&payload)?)
}

/// Renders a timestamp the way it appears in the payload.
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn serialize_timestamp<S>(
    timestamp: &&DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&canonical_timestamp(timestamp))
}
