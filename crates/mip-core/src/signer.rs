//! # Stamp Signer and Verifier
//!
//! Ed25519 signatures over the canonical payload of a stamp.
//!
//! ## Threat Model
//!
//! | Threat | Defense |
//! |--------|---------|
//! | Field tampering after signing | Payload rebuilt from live fields at verify time |
//! | Signature substitution | Signature bound to one key; wrong key yields `false` |
//! | Truncated or garbled signature | Rejected as `MalformedSignature` before any crypto |
//! | Wrong-size key material | Rejected as `InvalidKeySize` |
//!
//! Key material is passed in by the caller on every call. Nothing in this
//! module stores or logs it.
//!
//! ## References
//!
//! - **RFC 8032** - Edwards-Curve Digital Signature Algorithm (EdDSA).
//!   <https://www.rfc-editor.org/rfc/rfc8032>

use crate::error::{MipError, Result};
use crate::models::{MipStamp, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
use crate::payload::canonical_payload;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use tracing::debug;

impl MipStamp {
    /// Signs the stamp with a raw 32-byte Ed25519 secret key.
    ///
    /// Builds the canonical payload from the current field values and stores
    /// the hex-encoded signature in `signature`. No other field is touched.
    ///
    /// # Errors
    ///
    /// - `InvalidKeySize` if `private_key` is not 32 bytes
    /// - `PayloadSerialization` if the payload cannot be built
    ///
    /// # Example
    ///
    /// ```rust
    /// use mip_core::{MipStamp, StampKeyPair};
    ///
    /// let keys = StampKeyPair::generate();
    /// let mut stamp = MipStamp::new(1, "sha", "root", "tree", 1, None);
    ///
    /// stamp.sign(&keys.secret_key_bytes()).unwrap();
    /// assert!(stamp.verify_signature(&keys.public_key_bytes()).unwrap());
    /// ```
    pub fn sign(&mut self, private_key: &[u8]) -> Result<()> {
        let signing_key = SigningKey::from_bytes(sized_key::<PRIVATE_KEY_SIZE>(private_key)?);
        let payload = canonical_payload(self)?;
        let signature = signing_key.sign(&payload);

        self.signature = hex::encode(signature.to_bytes());
        debug!(stamp_id = %self.id, "stamp signed");
        Ok(())
    }

    /// Verifies the stamp's signature against a raw 32-byte public key.
    ///
    /// The payload is rebuilt from the stamp's current fields, so any edit to
    /// a signed field after signing yields `Ok(false)`.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the signature matches, `Ok(false)` on a well-formed
    /// mismatch (wrong key, altered fields, or a 32-byte key that is not a
    /// curve point).
    ///
    /// # Errors
    ///
    /// - `InvalidKeySize` if `public_key` is not 32 bytes
    /// - `MissingSignature` if the stamp is unsigned
    /// - `MalformedSignature` if the signature is not hex or not 64 bytes
    pub fn verify_signature(&self, public_key: &[u8]) -> Result<bool> {
        let key_bytes = sized_key::<PUBLIC_KEY_SIZE>(public_key)?;

        if self.signature.is_empty() {
            return Err(MipError::MissingSignature);
        }

        let signature = decode_signature(&self.signature)?;

        let Ok(verifying_key) = VerifyingKey::from_bytes(key_bytes) else {
            debug!(stamp_id = %self.id, "public key is not a curve point");
            return Ok(false);
        };
        let payload = canonical_payload(self)?;

        let valid = verifying_key.verify(&payload, &signature).is_ok();
        if !valid {
            debug!(stamp_id = %self.id, "signature mismatch");
        }
        Ok(valid)
    }
}

/// Verifies a single stamp. Free-function form of [`MipStamp::verify_signature`].
pub fn verify_stamp(stamp: &MipStamp, public_key: &[u8]) -> Result<bool> {
    stamp.verify_signature(public_key)
}

fn sized_key<const N: usize>(bytes: &[u8]) -> Result<&[u8; N]> {
    bytes.try_into().map_err(|_| MipError::InvalidKeySize {
        expected: N,
        actual: bytes.len(),
    })
}

fn decode_signature(text: &str) -> Result<Signature> {
    let bytes = hex::decode(text)
        .map_err(|e| MipError::MalformedSignature(format!("invalid hex: {}", e)))?;

    if bytes.len() != SIGNATURE_SIZE {
        return Err(MipError::MalformedSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_SIZE,
            bytes.len()
        )));
    }

    Signature::from_slice(&bytes).map_err(|e| MipError::MalformedSignature(e.to_string()))
}

/// An Ed25519 key pair for signing stamps.
///
/// Convenience for callers that provision keys themselves. The signing and
/// verification functions still take raw byte buffers, so a key pair is
/// never required.
#[derive(Clone)]
pub struct StampKeyPair {
    signing_key: SigningKey,
}

impl std::fmt::Debug for StampKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampKeyPair")
            .field("public_key", &self.public_key_hex())
            .field("secret_key", &"[redacted]")
            .finish()
    }
}

impl StampKeyPair {
    /// Generates a new random key pair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuilds a key pair from a raw 32-byte secret key.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            signing_key: SigningKey::from_bytes(sized_key::<PRIVATE_KEY_SIZE>(bytes)?),
        })
    }

    /// Rebuilds a key pair from a hex-encoded secret key.
    pub fn from_secret_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| MipError::Config(format!("secret key is not hex: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Raw secret key bytes, for passing to [`MipStamp::sign`].
    pub fn secret_key_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.signing_key.to_bytes()
    }

    /// Raw public key bytes, for passing to the verifiers.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Hex-encoded secret key.
    pub fn to_secret_hex(&self) -> String {
        hex::encode(self.secret_key_bytes())
    }

    /// Hex-encoded public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }
}

/// Decodes a hex-encoded public key and checks its length.
pub fn public_key_from_hex(text: &str) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| MipError::Config(format!("public key is not hex: {}", e)))?;

    Ok(*sized_key::<PUBLIC_KEY_SIZE>(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn signed_stamp(keys: &StampKeyPair) -> MipStamp {
        let mut stamp = MipStamp::new(1, "sha", "root", "tree", 1, None);
        stamp.sign(&keys.secret_key_bytes()).unwrap();
        stamp
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let keys = StampKeyPair::generate();
        let stamp = signed_stamp(&keys);

        assert_eq!(stamp.signature.len(), SIGNATURE_SIZE * 2);
        assert!(verify_stamp(&stamp, &keys.public_key_bytes()).unwrap());
    }

    #[test]
    fn test_sign_only_touches_signature() {
        let keys = StampKeyPair::generate();
        let original = MipStamp::new(3, "sha", "root", "tree", 4, Some(Uuid::new_v4()));

        let mut stamp = original.clone();
        stamp.sign(&keys.secret_key_bytes()).unwrap();

        stamp.signature.clear();
        assert_eq!(stamp, original);
    }

    #[test]
    fn test_signing_is_deterministic() {
        let keys = StampKeyPair::generate();
        let mut a = MipStamp::new(1, "sha", "root", "tree", 1, None);
        let mut b = a.clone();

        a.sign(&keys.secret_key_bytes()).unwrap();
        b.sign(&keys.secret_key_bytes()).unwrap();
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn test_tampered_fields_fail() {
        let keys = StampKeyPair::generate();
        let public = keys.public_key_bytes();

        let mutations: [fn(&mut MipStamp); 6] = [
            |s| s.commit_sha = "tampered".to_string(),
            |s| s.merkle_root = "tampered".to_string(),
            |s| s.tree_hash = "tampered".to_string(),
            |s| s.author_id = 999,
            |s| s.parent_stamp_id = Some(Uuid::new_v4()),
            |s| s.created_at = s.created_at + chrono::Duration::seconds(1),
        ];

        for mutate in mutations {
            let mut stamp = signed_stamp(&keys);
            mutate(&mut stamp);
            assert!(!stamp.verify_signature(&public).unwrap());
        }
    }

    #[test]
    fn test_unsigned_fields_do_not_affect_signature() {
        let keys = StampKeyPair::generate();
        let mut stamp = signed_stamp(&keys);

        stamp.repo_id = 42;
        stamp.verified = true;
        assert!(stamp.verify_signature(&keys.public_key_bytes()).unwrap());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let keys = StampKeyPair::generate();
        let other = StampKeyPair::generate();
        let stamp = signed_stamp(&keys);

        assert!(!stamp.verify_signature(&other.public_key_bytes()).unwrap());
    }

    #[test]
    fn test_invalid_private_key_size() {
        let mut stamp = MipStamp::new(1, "sha", "root", "tree", 1, None);
        let err = stamp.sign(&[0u8; 16]).unwrap_err();

        assert!(matches!(err, MipError::InvalidKeySize { expected: 32, actual: 16 }));
        assert!(stamp.signature.is_empty());
    }

    #[test]
    fn test_invalid_public_key_size() {
        let keys = StampKeyPair::generate();
        let stamp = signed_stamp(&keys);

        let err = stamp.verify_signature(&[1u8; 31]).unwrap_err();
        assert!(matches!(err, MipError::InvalidKeySize { expected: 32, actual: 31 }));
    }

    #[test]
    fn test_off_curve_public_key_is_mismatch() {
        let keys = StampKeyPair::generate();
        let off_curve = [0x02u8; PUBLIC_KEY_SIZE];
        assert!(VerifyingKey::from_bytes(&off_curve).is_err());

        let stamp = signed_stamp(&keys);
        assert!(!stamp.verify_signature(&off_curve).unwrap());

        // error precedence is unchanged for such keys
        let unsigned = MipStamp::new(1, "sha", "root", "tree", 1, None);
        let err = unsigned.verify_signature(&off_curve).unwrap_err();
        assert!(matches!(err, MipError::MissingSignature));

        let mut garbled = signed_stamp(&keys);
        garbled.signature = "zz".to_string();
        let err = garbled.verify_signature(&off_curve).unwrap_err();
        assert!(matches!(err, MipError::MalformedSignature(_)));
    }

    #[test]
    fn test_missing_signature() {
        let keys = StampKeyPair::generate();
        let stamp = MipStamp::new(1, "sha", "root", "tree", 1, None);

        let err = stamp.verify_signature(&keys.public_key_bytes()).unwrap_err();
        assert!(matches!(err, MipError::MissingSignature));
    }

    #[test]
    fn test_non_hex_signature() {
        let keys = StampKeyPair::generate();
        let mut stamp = MipStamp::new(1, "sha", "root", "tree", 1, None);
        stamp.signature = "invalid-hex".to_string();

        let err = stamp.verify_signature(&keys.public_key_bytes()).unwrap_err();
        assert!(matches!(err, MipError::MalformedSignature(_)));
    }

    #[test]
    fn test_wrong_length_signature() {
        let keys = StampKeyPair::generate();
        let mut stamp = MipStamp::new(1, "sha", "root", "tree", 1, None);
        stamp.signature = hex::encode(b"bad");

        let err = stamp.verify_signature(&keys.public_key_bytes()).unwrap_err();
        assert!(matches!(err, MipError::MalformedSignature(_)));
    }

    #[test]
    fn test_key_pair_hex_roundtrip() {
        let keys = StampKeyPair::generate();
        let restored = StampKeyPair::from_secret_hex(&keys.to_secret_hex()).unwrap();

        assert_eq!(restored.public_key_bytes(), keys.public_key_bytes());
        assert_eq!(public_key_from_hex(&keys.public_key_hex()).unwrap(), keys.public_key_bytes());
    }

    #[test]
    fn test_key_pair_debug_redacts_secret() {
        let keys = StampKeyPair::generate();
        let rendered = format!("{:?}", keys);

        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains(&keys.to_secret_hex()));
    }

    #[test]
    fn test_public_key_from_hex_rejects_bad_input() {
        assert!(matches!(public_key_from_hex("zz"), Err(MipError::Config(_))));
        assert!(matches!(
            public_key_from_hex("abcd"),
            Err(MipError::InvalidKeySize { expected: 32, actual: 2 })
        ));
    }
}
