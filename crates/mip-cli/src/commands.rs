//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mip_core::{
    compute_merkle_root, create_stamp, verify_chain_with_policy, verify_stamp, ChainPolicy,
    ChainVerification, MipConfig, MipStamp, VerificationMarks,
};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::keys;
use crate::tree;

/// Where a stamp's Merkle root comes from.
#[derive(Debug, Clone)]
pub enum RootSource {
    Dir(PathBuf),
    Manifest(PathBuf),
    Root(String),
}

/// Commit metadata for a new stamp.
#[derive(Debug, Clone)]
pub struct StampRequest {
    pub repo_id: i64,
    pub commit_sha: String,
    pub tree_hash: String,
    pub author_id: i64,
    pub parent: Option<Uuid>,
    pub root: RootSource,
}

/// Verdict for one chain file.
#[derive(Debug, Serialize)]
pub struct ChainReport {
    pub file: String,
    pub stamps: usize,
    pub verified: usize,
    #[serde(flatten)]
    pub verification: ChainVerification,
}

pub fn keygen(out_dir: Option<&Path>) -> Result<()> {
    let keys = mip_core::StampKeyPair::generate();

    match out_dir {
        Some(dir) => {
            let (signing, verifying) = keys::write_key_pair(&keys, dir)?;
            info!(public_key = %keys.public_key_hex(), "generated key pair");
            println!("signing key:   {}", signing.display());
            println!("verifying key: {}", verifying.display());
        }
        None => {
            println!("{}={}", mip_core::config::SIGNING_KEY_ENV, keys.to_secret_hex());
            println!("{}={}", mip_core::config::VERIFYING_KEY_ENV, keys.public_key_hex());
        }
    }

    Ok(())
}

pub fn merkle(dir: Option<&Path>, manifest: Option<&Path>) -> Result<()> {
    let entries = match (dir, manifest) {
        (Some(dir), None) => tree::entries_from_dir(dir)?,
        (None, Some(manifest)) => tree::entries_from_manifest(manifest)?,
        _ => bail!("pass either a directory or --manifest"),
    };

    println!("{}", compute_merkle_root(&entries));
    Ok(())
}

pub fn stamp(config: &MipConfig, request: StampRequest) -> Result<()> {
    let merkle_root = match &request.root {
        RootSource::Dir(dir) => compute_merkle_root(&tree::entries_from_dir(dir)?),
        RootSource::Manifest(path) => compute_merkle_root(&tree::entries_from_manifest(path)?),
        RootSource::Root(root) => root.clone(),
    };

    let keys = keys::resolve_signing_key(
        keys::env_key(mip_core::config::SIGNING_KEY_ENV),
        config.keys.signing_key_path.as_deref(),
    )?;

    let mut stamp = create_stamp(
        request.repo_id,
        &request.commit_sha,
        &merkle_root,
        &request.tree_hash,
        request.author_id,
        request.parent,
    );
    stamp.sign(&keys.secret_key_bytes()).context("failed to sign stamp")?;

    info!(stamp_id = %stamp.id, commit = %stamp.commit_sha, "stamp created");
    println!("{}", serde_json::to_string_pretty(&stamp)?);
    Ok(())
}

/// Verifies a single stamp file. Returns true if the signature is valid.
pub fn verify_stamp_file(config: &MipConfig, path: &Path) -> Result<bool> {
    let public_key = verifying_key(config)?;
    let stamp: MipStamp = read_json(path)?;

    let verdict = match verify_stamp(&stamp, &public_key) {
        Ok(true) => ChainVerification::valid(),
        Ok(false) => ChainVerification::broken(stamp.id, format!("stamp {}: invalid signature", stamp.id)),
        Err(e) => ChainVerification::broken(stamp.id, format!("stamp {}: {}", stamp.id, e)),
    };

    println!("{}", serde_json::to_string(&verdict)?);
    Ok(verdict.is_valid())
}

/// Verifies each chain file on the blocking pool. Returns true if every chain is valid.
pub async fn verify_chain_files(config: &MipConfig, files: Vec<PathBuf>) -> Result<bool> {
    let public_key = verifying_key(config)?;
    let mut tasks = JoinSet::new();

    for (index, file) in files.into_iter().enumerate() {
        let policy = config.chain;
        tasks.spawn_blocking(move || (index, check_chain_file(&file, &public_key, &policy)));
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, report) = joined.context("chain verification task failed")?;
        reports.push((index, report?));
    }
    reports.sort_by_key(|(index, _)| *index);

    let mut all_valid = true;
    for (_, report) in &reports {
        if !report.verification.valid {
            warn!(file = %report.file, "chain invalid");
            all_valid = false;
        }
        println!("{}", serde_json::to_string(report)?);
    }

    Ok(all_valid)
}

fn check_chain_file(path: &Path, public_key: &[u8], policy: &ChainPolicy) -> Result<ChainReport> {
    let stamps: Vec<MipStamp> = read_json(path)?;
    let verification = verify_chain_with_policy(&stamps, public_key, policy);
    let marks = VerificationMarks::from_verification(&stamps, &verification);

    Ok(ChainReport {
        file: path.display().to_string(),
        stamps: stamps.len(),
        verified: marks.verified_count(),
        verification,
    })
}

fn verifying_key(config: &MipConfig) -> Result<[u8; mip_core::models::PUBLIC_KEY_SIZE]> {
    keys::resolve_verifying_key(
        keys::env_key(mip_core::config::VERIFYING_KEY_ENV),
        config.keys.verifying_key_path.as_deref(),
    )
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}
