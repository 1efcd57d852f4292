//! File entries from a working tree or a manifest.

use std::path::Path;

use anyhow::{Context, Result};
use mip_core::FileEntry;
use tracing::debug;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &[".git"];

/// Hashes every regular file under `root`.
///
/// Paths are relative to `root` and use `/` separators on every platform.
/// Symbolic links are not followed.
pub fn entries_from_dir(root: &Path) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    walk(root, root, &mut entries)?;
    debug!(root = %root.display(), files = entries.len(), "hashed working tree");
    Ok(entries)
}

/// Reads a JSON array of `{"path", "hash"}` objects.
pub fn entries_from_manifest(path: &Path) -> Result<Vec<FileEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid manifest {}", path.display()))
}

fn walk(root: &Path, dir: &Path, entries: &mut Vec<FileEntry>) -> Result<()> {
    let listing = std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;

    for item in listing {
        let item = item.with_context(|| format!("failed to list {}", dir.display()))?;
        let file_type = item.file_type()?;
        let path = item.path();

        if file_type.is_dir() {
            if SKIPPED_DIRS.iter().any(|s| item.file_name() == *s) {
                continue;
            }
            walk(root, &path, entries)?;
        } else if file_type.is_file() {
            let contents = std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            entries.push(FileEntry::from_contents(relative_path(root, &path)?, &contents));
        }
    }

    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;

    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .with_context(|| format!("path is not valid UTF-8: {}", path.display()))
        })
        .collect::<Result<Vec<&str>>>()?;
    Ok(parts.join("/"))
}
