// src/git/ops.rs
//! Git operations driven through the `git` executable.

use super::{is_binary_file, RepositoryAccess};
use crate::errors::{Error, GitError};
use crate::provider::redact_url;
use async_trait::async_trait;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;

/// [`RepositoryAccess`] backed by the system `git` binary.
///
/// Every invocation runs with `kill_on_drop`, so dropping the returned future
/// (on timeout or cancellation) terminates the subprocess.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    /// Locates `git` on the `PATH`.
    pub fn new() -> crate::errors::Result<Self> {
        let program = which::which("git").map_err(|e| {
            Error::ConfigurationMissing(format!("git executable not found on PATH: {}", e))
        })?;
        debug!("Using git at {}", program.display());
        Ok(Self { program })
    }

    /// Uses an explicit git executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs one git stage, failing on spawn error, timeout or non-zero exit.
    async fn run(
        &self,
        stage: &'static str,
        args: Vec<OsString>,
        cwd: Option<&Path>,
        deadline: Instant,
    ) -> Result<(), GitError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            // Never block waiting for interactive credentials.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let timeout = deadline.saturating_duration_since(Instant::now());
        let output = match tokio::time::timeout_at(deadline, cmd.output()).await {
            Ok(result) => result.map_err(|source| GitError::Spawn { stage, source })?,
            Err(_) => {
                warn!("git {} timed out after {:?}", stage, timeout);
                return Err(GitError::Timeout { stage, timeout });
            }
        };

        if output.status.success() {
            debug!("git {} finished", stage);
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!("git {} failed ({}): {}", stage, output.status, stderr);
        Err(GitError::CommandFailed {
            stage,
            status: output.status.to_string(),
            stderr,
        })
    }
}

fn clone_args(url: &str, work_dir: &Path, branch: Option<&str>, sparse: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["clone".into(), "--depth".into(), "1".into()];
    if sparse {
        args.push("--filter=blob:none".into());
        args.push("--sparse".into());
    }
    if let Some(branch) = branch {
        args.push("--branch".into());
        args.push(branch.into());
    }
    args.push("--".into());
    args.push(url.into());
    args.push(work_dir.as_os_str().to_owned());
    args
}

/// Turns a repository-relative path into an anchored, literal non-cone
/// sparse-checkout pattern.
///
/// # Examples
/// ```
/// use papersync::git::sparse_pattern;
///
/// assert_eq!(sparse_pattern("chapters/intro.tex"), "/chapters/intro.tex");
/// assert_eq!(sparse_pattern("./fig[1].tex"), "/fig\\[1\\].tex");
/// ```
pub fn sparse_pattern(path: &str) -> String {
    let trimmed = path.trim_start_matches("./").trim_start_matches('/');
    let mut pattern = String::with_capacity(trimmed.len() + 1);
    pattern.push('/');
    for (i, ch) in trimmed.chars().enumerate() {
        let leading = i == 0 && matches!(ch, '!' | '#');
        if leading || matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    if pattern.ends_with(' ') {
        let len = pattern.len();
        pattern.insert(len - 1, '\\');
    }
    pattern
}

/// SHA-256 (hex) of a file's bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn hash_file_streaming(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Joins a repository-relative path onto `work_dir`, refusing anything that
/// could escape it.
fn resolve_in_tree(work_dir: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches("./"));
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    (safe && !path.is_empty()).then(|| work_dir.join(relative))
}

#[async_trait]
impl RepositoryAccess for GitCli {
    async fn clone_full(
        &self,
        url: &str,
        work_dir: &Path,
        branch: Option<&str>,
        timeout: Duration,
    ) -> Result<(), GitError> {
        debug!(
            "Cloning '{}' (branch {:?}) into '{}'",
            redact_url(url),
            branch,
            work_dir.display()
        );
        let deadline = Instant::now() + timeout;
        self.run("clone", clone_args(url, work_dir, branch, false), None, deadline)
            .await
    }

    async fn clone_sparse(
        &self,
        url: &str,
        work_dir: &Path,
        branch: Option<&str>,
        sparse_paths: &[String],
        timeout: Duration,
    ) -> Result<(), GitError> {
        if sparse_paths.is_empty() {
            return self.clone_full(url, work_dir, branch, timeout).await;
        }
        debug!(
            "Sparse-cloning {} path(s) of '{}' (branch {:?}) into '{}'",
            sparse_paths.len(),
            redact_url(url),
            branch,
            work_dir.display()
        );
        // One deadline for all stages: the timeout bounds the whole operation.
        let deadline = Instant::now() + timeout;

        self.run("clone", clone_args(url, work_dir, branch, true), None, deadline)
            .await?;
        self.run(
            "sparse-checkout init",
            vec!["sparse-checkout".into(), "init".into(), "--no-cone".into()],
            Some(work_dir),
            deadline,
        )
        .await?;

        let info_dir = work_dir.join(".git").join("info");
        let config_path = info_dir.join("sparse-checkout");
        let mut patterns = sparse_paths
            .iter()
            .map(|p| sparse_pattern(p))
            .collect::<Vec<_>>()
            .join("\n");
        patterns.push('\n');
        let write = async {
            tokio::fs::create_dir_all(&info_dir).await?;
            tokio::fs::write(&config_path, patterns).await
        };
        write.await.map_err(|source| GitError::WorkTree {
            path: config_path.display().to_string(),
            source,
        })?;

        self.run(
            "sparse-checkout reapply",
            vec!["sparse-checkout".into(), "reapply".into()],
            Some(work_dir),
            deadline,
        )
        .await
    }

    async fn read_blob_hash(&self, work_dir: &Path, path: &str) -> Result<String, GitError> {
        let full_path = resolve_in_tree(work_dir, path).ok_or_else(|| GitError::WorkTree {
            path: path.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path is not repository-relative",
            ),
        })?;
        let to_error = |source: std::io::Error| GitError::WorkTree {
            path: path.to_string(),
            source,
        };

        // Binary assets can be large; hash them without holding the whole file.
        if is_binary_file(&full_path) {
            return tokio::task::spawn_blocking(move || hash_file_streaming(&full_path))
                .await
                .map_err(|e| to_error(std::io::Error::new(std::io::ErrorKind::Other, e)))?
                .map_err(to_error);
        }
        let bytes = tokio::fs::read(&full_path).await.map_err(to_error)?;
        Ok(content_hash(&bytes))
    }
}
