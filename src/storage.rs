//! Persistence of compiled artifacts.

use crate::git::content_hash;
use anyhow::Context;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Stores raw artifact bytes and hands back an opaque identifier.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String>;
}

/// Content-addressed artifact store on the local filesystem.
///
/// Each artifact is written to `<root>/<sha256>.<ext>` through a temporary
/// file in the same directory, so a reader never sees a partial file.
///
/// # Examples
///
/// ```no_run
/// use papersync::storage::{ArtifactStore, FsArtifactStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = FsArtifactStore::new("/var/lib/papersync/artifacts")?;
/// let id = store.store(b"%PDF-1.7 ...".to_vec(), "application/pdf").await?;
/// println!("stored as {}", id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates the store, creating `root` if necessary.
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create artifact directory '{}'", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a previously stored artifact.
    pub fn path_of(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "application/pdf" => "pdf",
        "application/json" => "json",
        "text/plain" => "txt",
        _ => "bin",
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        let id = format!("{}.{}", content_hash(&bytes), extension_for(content_type));
        let root = self.root.clone();
        let target = root.join(&id);

        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&root)
                .with_context(|| format!("Failed to create temporary file in '{}'", root.display()))?;
            tmp.write_all(&bytes).context("Failed to write artifact")?;
            tmp.as_file().sync_all().context("Failed to flush artifact")?;
            tmp.persist(&target)
                .with_context(|| format!("Failed to move artifact into '{}'", target.display()))?;
            Ok(())
        })
        .await
        .context("Artifact writer task failed")??;

        log::debug!("Stored artifact {}", id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_store_is_content_addressed() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = FsArtifactStore::new(dir.path().join("artifacts"))?;

        let id = store.store(b"%PDF-1.5 one".to_vec(), "application/pdf").await?;
        assert!(id.ends_with(".pdf"));
        assert_eq!(std::fs::read(store.path_of(&id))?, b"%PDF-1.5 one");

        let again = store.store(b"%PDF-1.5 one".to_vec(), "application/pdf").await?;
        assert_eq!(id, again);
        let other = store.store(b"%PDF-1.5 two".to_vec(), "application/pdf").await?;
        assert_ne!(id, other);

        // Only the two artifacts remain; no temporary files are left behind.
        assert_eq!(std::fs::read_dir(store.root())?.count(), 2);
        Ok(())
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("application/pdf"), "pdf");
        assert_eq!(extension_for("Application/PDF; charset=binary"), "pdf");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }
}
