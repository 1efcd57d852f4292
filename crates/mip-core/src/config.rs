//! Configuration types for MIP.
//!
//! The library functions take their keys and policy as explicit arguments.
//! [`MipConfig`] is the file-level shape a caller (such as the `mip` binary)
//! loads to decide which arguments to pass.
//!
//! ```toml
//! [chain]
//! reject_duplicate_timestamps = true
//! require_single_repository = true
//!
//! [keys]
//! signing_key_path = "/etc/mip/signing.key"
//! verifying_key_path = "/etc/mip/verifying.key"
//! ```

use crate::chain::ChainPolicy;
use crate::error::{MipError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding a hex signing key. Takes precedence over
/// [`KeyConfig::signing_key_path`].
pub const SIGNING_KEY_ENV: &str = "MIP_SIGNING_KEY";

/// Environment variable holding a hex verifying key. Takes precedence over
/// [`KeyConfig::verifying_key_path`].
pub const VERIFYING_KEY_ENV: &str = "MIP_VERIFYING_KEY";

/// Top-level MIP configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MipConfig {
    /// Optional chain verification checks.
    pub chain: ChainPolicy,

    /// Where key material is provisioned from.
    pub keys: KeyConfig,
}

/// Key provisioning locations. Files hold a single hex-encoded key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// File containing the hex Ed25519 secret key.
    pub signing_key_path: Option<PathBuf>,

    /// File containing the hex Ed25519 public key.
    pub verifying_key_path: Option<PathBuf>,
}

impl MipConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `MipError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MipError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text. Missing sections take defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| MipError::Config(e.to_string()))
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MipError::Config(e.to_string()))
    }
}
