//! Error types for MIP stamp operations.
//!
//! A broken chain is not an error: it is reported through
//! [`ChainVerification`](crate::ChainVerification) with `valid == false`.

use thiserror::Error;

/// Result type alias for MIP operations.
pub type Result<T> = std::result::Result<T, MipError>;

/// Errors that can occur while signing or verifying stamps.
///
/// Every variant is a deterministic function of its inputs. Retrying the
/// same call without changing the stamp or the key yields the same error.
#[derive(Debug, Error)]
pub enum MipError {
    /// Signing or verifying key has the wrong byte length.
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Length required by Ed25519
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Verification attempted on a stamp that was never signed.
    #[error("signature is missing")]
    MissingSignature,

    /// Signature text is not hex, or decodes to the wrong length.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The canonical payload could not be built.
    ///
    /// Should not occur for well-formed stamps.
    #[error("failed to serialize canonical payload: {0}")]
    PayloadSerialization(#[from] serde_json::Error),

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}
