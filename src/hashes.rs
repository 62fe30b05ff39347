//! Fetches content hashes for a document's dependencies.
//!
//! All requested paths are materialized by a single sparse clone; hashing a
//! hundred files costs one clone, not a hundred.

use crate::constants::CLONE_DIR_PREFIX;
use crate::errors::GitError;
use crate::git::RepositoryAccess;
use crate::provider::{authenticated_url, redact_url, ProviderAuth};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::Builder as TempDirBuilder;

/// Content fingerprint of one repository file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyHash {
    pub path: String,
    pub hash: String,
}

/// Computes dependency hashes through a [`RepositoryAccess`].
#[derive(Clone)]
pub struct DependencyHashFetcher {
    repo: Arc<dyn RepositoryAccess>,
    clone_timeout: Duration,
}

impl DependencyHashFetcher {
    pub fn new(repo: Arc<dyn RepositoryAccess>, clone_timeout: Duration) -> Self {
        Self {
            repo,
            clone_timeout,
        }
    }

    /// Returns `path -> hash` for every requested path that could be hashed.
    ///
    /// Paths that cannot be resolved are left out of the map and logged; they
    /// never fail the batch. An empty `paths` returns immediately without
    /// cloning. The clone itself failing is reported as an error.
    pub async fn fetch_hashes(
        &self,
        git_url: &str,
        branch: Option<&str>,
        paths: &[String],
        auth: Option<&ProviderAuth>,
    ) -> Result<BTreeMap<String, String>, GitError> {
        if paths.is_empty() {
            return Ok(BTreeMap::new());
        }

        // Removed on drop, on every exit path including cancellation.
        let work_root = TempDirBuilder::new()
            .prefix(CLONE_DIR_PREFIX)
            .tempdir()
            .map_err(|source| GitError::WorkTree {
                path: std::env::temp_dir().display().to_string(),
                source,
            })?;
        let work_dir = work_root.path().join("repo");
        let url = authenticated_url(git_url, auth);

        log::debug!(
            "Fetching hashes for {} path(s) from '{}'",
            paths.len(),
            redact_url(git_url)
        );
        self.repo
            .clone_sparse(&url, &work_dir, branch, paths, self.clone_timeout)
            .await?;

        let mut hashes = BTreeMap::new();
        for path in paths {
            if hashes.contains_key(path) {
                continue;
            }
            match self.repo.read_blob_hash(&work_dir, path).await {
                Ok(hash) => {
                    hashes.insert(path.clone(), hash);
                }
                Err(e) => log::warn!("No hash for dependency '{}': {}", path, e),
            }
        }
        log::info!("Hashed {}/{} dependencies", hashes.len(), paths.len());
        Ok(hashes)
    }
}

/// Converts a hash map back into request order, dropping paths without a hash.
///
/// # Examples
/// ```
/// use papersync::hashes::{order_hashes, DependencyHash};
/// use std::collections::BTreeMap;
///
/// let paths = vec!["main.tex".to_string(), "missing.tex".to_string(), "a.bib".to_string()];
/// let map = BTreeMap::from([
///     ("a.bib".to_string(), "h2".to_string()),
///     ("main.tex".to_string(), "h1".to_string()),
/// ]);
/// let ordered = order_hashes(&paths, &map);
/// assert_eq!(ordered, vec![
///     DependencyHash { path: "main.tex".into(), hash: "h1".into() },
///     DependencyHash { path: "a.bib".into(), hash: "h2".into() },
/// ]);
/// ```
pub fn order_hashes(paths: &[String], hashes: &BTreeMap<String, String>) -> Vec<DependencyHash> {
    let mut seen = std::collections::HashSet::new();
    paths
        .iter()
        .filter(|path| seen.insert(path.as_str()))
        .filter_map(|path| {
            hashes.get(path).map(|hash| DependencyHash {
                path: path.clone(),
                hash: hash.clone(),
            })
        })
        .collect()
}
