//! Stamp factory.
//!
//! Allocates new, unsigned stamps. Signing is a separate step
//! (see [`MipStamp::sign`]).

use crate::models::MipStamp;
use chrono::Utc;
use uuid::Uuid;

impl MipStamp {
    /// Creates a new unsigned stamp.
    ///
    /// Assigns a fresh random id and sets `created_at` to the current UTC
    /// instant. `signature` starts empty and `verified` false.
    ///
    /// # Arguments
    ///
    /// * `repo_id` - Owning repository
    /// * `commit_sha` - Commit being attested
    /// * `merkle_root` - Root from [`compute_merkle_root`](crate::merkle::compute_merkle_root)
    /// * `tree_hash` - Independent tree hash supplied by the caller
    /// * `author_id` - Commit author
    /// * `parent_stamp_id` - Previous stamp in the chain, `None` for the first
    pub fn new(
        repo_id: i64,
        commit_sha: impl Into<String>,
        merkle_root: impl Into<String>,
        tree_hash: impl Into<String>,
        author_id: i64,
        parent_stamp_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            repo_id,
            commit_sha: commit_sha.into(),
            merkle_root: merkle_root.into(),
            tree_hash: tree_hash.into(),
            author_id,
            parent_stamp_id,
            signature: String::new(),
            verified: false,
            created_at: Utc::now(),
        }
    }

    /// Creates the stamp that follows `self` in the same repository's chain.
    pub fn next_in_chain(
        &self,
        commit_sha: impl Into<String>,
        merkle_root: impl Into<String>,
        tree_hash: impl Into<String>,
        author_id: i64,
    ) -> Self {
        Self::new(
            self.repo_id,
            commit_sha,
            merkle_root,
            tree_hash,
            author_id,
            Some(self.id),
        )
    }
}

/// Creates a new unsigned stamp. Free-function form of [`MipStamp::new`].
pub fn create_stamp(
    repo_id: i64,
    commit_sha: &str,
    merkle_root: &str,
    tree_hash: &str,
    author_id: i64,
    parent_stamp_id: Option<Uuid>,
) -> MipStamp {
    MipStamp::new(repo_id, commit_sha, merkle_root, tree_hash, author_id, parent_stamp_id)
}
