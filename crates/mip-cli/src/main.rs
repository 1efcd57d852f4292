//! mip - Mutable Integrity Proof CLI
//!
//! Generates keys, computes Merkle roots, creates signed stamps and verifies
//! stamp chains.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use mip_core::MipConfig;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;
mod keys;
mod tree;

use commands::{RootSource, StampRequest};

/// mip - signed commit stamps and chain-of-custody verification
#[derive(Parser, Debug)]
#[command(name = "mip")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "mip.toml", global = true)]
    config: PathBuf,

    /// Log filter (trace, debug, info, warn, error, or EnvFilter directives)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 key pair
    Keygen {
        /// Write signing.key and verifying.key here instead of printing
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the Merkle root of a directory or manifest
    #[command(group(ArgGroup::new("source").required(true).args(["dir", "manifest"])))]
    Merkle {
        /// Directory to hash
        dir: Option<PathBuf>,

        /// JSON array of {"path", "hash"} entries
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Create and sign a stamp for a commit
    #[command(group(ArgGroup::new("root").required(true).args(["dir", "manifest", "merkle_root"])))]
    Stamp {
        /// Repository the stamp belongs to
        #[arg(long)]
        repo_id: i64,

        /// Commit SHA being attested
        #[arg(long)]
        commit: String,

        /// Tree-content hash of the commit
        #[arg(long)]
        tree_hash: String,

        /// Author of the commit
        #[arg(long)]
        author_id: i64,

        /// Id of the previous stamp in this repository's chain
        #[arg(long)]
        parent: Option<Uuid>,

        /// Hash this directory for the Merkle root
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Read file entries from this manifest
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Use a precomputed Merkle root
        #[arg(long)]
        merkle_root: Option<String>,
    },

    /// Verify the signature of one stamp file
    VerifyStamp {
        /// JSON file holding one stamp
        file: PathBuf,
    },

    /// Verify one or more chain files (JSON arrays of stamps)
    VerifyChain {
        /// JSON files, each holding one repository's stamps
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let config = load_config(&cli.config)?;

    let ok = match cli.command {
        Commands::Keygen { out_dir } => commands::keygen(out_dir.as_deref()).map(|()| true)?,
        Commands::Merkle { dir, manifest } => {
            commands::merkle(dir.as_deref(), manifest.as_deref()).map(|()| true)?
        }
        Commands::Stamp {
            repo_id,
            commit,
            tree_hash,
            author_id,
            parent,
            dir,
            manifest,
            merkle_root,
        } => {
            let root = match (dir, manifest, merkle_root) {
                (Some(dir), _, _) => RootSource::Dir(dir),
                (_, Some(manifest), _) => RootSource::Manifest(manifest),
                (_, _, Some(root)) => RootSource::Root(root),
                (None, None, None) => anyhow::bail!("a Merkle root source is required"),
            };
            let request = StampRequest {
                repo_id,
                commit_sha: commit,
                tree_hash,
                author_id,
                parent,
                root,
            };
            commands::stamp(&config, request).map(|()| true)?
        }
        Commands::VerifyStamp { file } => commands::verify_stamp_file(&config, &file)?,
        Commands::VerifyChain { files } => commands::verify_chain_files(&config, files).await?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Loads the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> Result<MipConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(MipConfig::default());
    }
    MipConfig::from_file(path).with_context(|| format!("failed to load config {}", path.display()))
}
