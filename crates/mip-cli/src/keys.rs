//! Key provisioning for the `mip` binary.
//!
//! A hex key from the environment wins over a key file named in the config.
//! Resolvers take the environment value as an argument so they can be tested
//! without touching process state.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mip_core::config::{SIGNING_KEY_ENV, VERIFYING_KEY_ENV};
use mip_core::models::PUBLIC_KEY_SIZE;
use mip_core::signer::public_key_from_hex;
use mip_core::StampKeyPair;

/// File name for the hex secret key written by `mip keygen`.
pub const SIGNING_KEY_FILE: &str = "signing.key";

/// File name for the hex public key written by `mip keygen`.
pub const VERIFYING_KEY_FILE: &str = "verifying.key";

/// Resolves the signing key from an environment value or a key file.
pub fn resolve_signing_key(env_value: Option<String>, path: Option<&Path>) -> Result<StampKeyPair> {
    let text = key_text(env_value, path, SIGNING_KEY_ENV, "signing_key_path")?;
    StampKeyPair::from_secret_hex(&text).context("invalid signing key")
}

/// Resolves the verifying key from an environment value or a key file.
pub fn resolve_verifying_key(
    env_value: Option<String>,
    path: Option<&Path>,
) -> Result<[u8; PUBLIC_KEY_SIZE]> {
    let text = key_text(env_value, path, VERIFYING_KEY_ENV, "verifying_key_path")?;
    public_key_from_hex(&text).context("invalid verifying key")
}

/// Reads an environment variable, treating an empty value as unset.
pub fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Writes both halves of a key pair into `dir` as hex text.
///
/// # Returns
///
/// The paths of the signing and verifying key files.
pub fn write_key_pair(keys: &StampKeyPair, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let signing = dir.join(SIGNING_KEY_FILE);
    let verifying = dir.join(VERIFYING_KEY_FILE);

    if signing.exists() {
        bail!("refusing to overwrite {}", signing.display());
    }

    write_secret(&signing, &keys.to_secret_hex())?;
    std::fs::write(&verifying, format!("{}\n", keys.public_key_hex()))
        .with_context(|| format!("failed to write {}", verifying.display()))?;

    Ok((signing, verifying))
}

fn key_text(env_value: Option<String>, path: Option<&Path>, env_name: &str, config_key: &str) -> Result<String> {
    if let Some(value) = env_value {
        return Ok(value.trim().to_string());
    }

    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read key file {}", path.display()))?;
            Ok(text.trim().to_string())
        }
        None => bail!("no key configured: set {} or keys.{} in the config file", env_name, config_key),
    }
}

#[cfg(unix)]
fn write_secret(path: &Path, hex_key: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writeln!(file, "{}", hex_key).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(not(unix))]
fn write_secret(path: &Path, hex_key: &str) -> Result<()> {
    std::fs::write(path, format!("{}\n", hex_key))
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_value_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let from_file = StampKeyPair::generate();
        let from_env = StampKeyPair::generate();
        let (signing, _) = write_key_pair(&from_file, dir.path()).unwrap();

        let resolved = resolve_signing_key(Some(from_env.to_secret_hex()), Some(&signing)).unwrap();
        assert_eq!(resolved.public_key_bytes(), from_env.public_key_bytes());
    }

    #[test]
    fn test_written_pair_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let keys = StampKeyPair::generate();
        let (signing, verifying) = write_key_pair(&keys, dir.path()).unwrap();

        let secret = resolve_signing_key(None, Some(&signing)).unwrap();
        let public = resolve_verifying_key(None, Some(&verifying)).unwrap();

        assert_eq!(secret.public_key_bytes(), keys.public_key_bytes());
        assert_eq!(public, keys.public_key_bytes());
    }

    #[test]
    fn test_keygen_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        write_key_pair(&StampKeyPair::generate(), dir.path()).unwrap();
        assert!(write_key_pair(&StampKeyPair::generate(), dir.path()).is_err());
    }

    #[test]
    fn test_missing_key_names_sources() {
        let err = resolve_verifying_key(None, None).unwrap_err().to_string();
        assert!(err.contains(VERIFYING_KEY_ENV));
        assert!(err.contains("verifying_key_path"));
    }

    #[test]
    fn test_bad_key_text_rejected() {
        assert!(resolve_signing_key(Some("zz".to_string()), None).is_err());
        assert!(resolve_verifying_key(Some("abcd".to_string()), None).is_err());
    }
}
