// src/git/mod.rs
//! Repository access used by the dependency hash fetcher.
//!
//! This module provides functionality to:
//! - Shallow-clone a remote repository into a working directory.
//! - Partially clone only a set of paths (blob filter + non-cone sparse checkout).
//! - Hash files from a checked-out working tree.
//! - Classify file extensions as binary.
//!
//! Everything goes through the [`RepositoryAccess`] trait so callers can be
//! tested against an in-memory implementation.

mod binary;
mod ops;

pub use binary::is_binary_file;
pub use ops::{content_hash, sparse_pattern, GitCli};

use crate::errors::GitError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// The narrow set of git capabilities the pipeline needs.
///
/// Work directories handed to these methods are expected to be ephemeral:
/// a failed multi-stage operation is not rolled back.
#[async_trait]
pub trait RepositoryAccess: Send + Sync {
    /// Shallow (depth 1) clone of `url` into `work_dir`, optionally on `branch`.
    async fn clone_full(
        &self,
        url: &str,
        work_dir: &Path,
        branch: Option<&str>,
        timeout: Duration,
    ) -> Result<(), GitError>;

    /// Partial clone that materializes only `sparse_paths`.
    ///
    /// With an empty `sparse_paths` this behaves exactly like [`clone_full`](Self::clone_full).
    async fn clone_sparse(
        &self,
        url: &str,
        work_dir: &Path,
        branch: Option<&str>,
        sparse_paths: &[String],
        timeout: Duration,
    ) -> Result<(), GitError>;

    /// Content hash of the checked-out file at the repository-relative `path`.
    async fn read_blob_hash(&self, work_dir: &Path, path: &str) -> Result<String, GitError>;
}
