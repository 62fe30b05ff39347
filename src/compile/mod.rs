//! The compile pipeline: from a repository URL to a stored PDF plus the
//! dependency hashes needed to detect real changes on the next build.
//!
//! A compile moves through `Starting -> Compiling -> Succeeded -> Caching ->
//! Done`, or `Failed` from any stage. Progress is cleared on every exit path,
//! including cancellation, before the outcome reaches the caller.

mod classify;
mod client;
mod deps;

pub use classify::{classify_failure, looks_like_html, truncate_log, truncate_raw, FailureKind};
pub use client::{CacheClearOutcome, CompilePayload, CompiledDocument, ProgressCallback, WorkerClient};
pub use deps::{
    dedup_preserving_order, dependency_paths, parse_dependency_header, reusable_hashes,
    same_dependency_set,
};

use crate::cache_mode::CacheSettings;
use crate::cancellation::CancellationToken;
use crate::config::Config;
use crate::constants::{PROGRESS_HASHING, PROGRESS_STARTING};
use crate::errors::{Error, Result};
use crate::git::RepositoryAccess;
use crate::hashes::{order_hashes, DependencyHash, DependencyHashFetcher};
use crate::progress::Progress;
use crate::provider::{redact_url, resolve_source, CredentialStore, ProviderAuth};
use crate::storage::ArtifactStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// TeX engine the worker runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compiler {
    #[default]
    Pdflatex,
    Xelatex,
    Lualatex,
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compiler::Pdflatex => "pdflatex",
            Compiler::Xelatex => "xelatex",
            Compiler::Lualatex => "lualatex",
        })
    }
}

impl FromStr for Compiler {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdflatex" => Ok(Compiler::Pdflatex),
            "xelatex" => Ok(Compiler::Xelatex),
            "lualatex" => Ok(Compiler::Lualatex),
            other => Err(format!(
                "unknown compiler '{}' (expected pdflatex, xelatex or lualatex)",
                other
            )),
        }
    }
}

/// One build trigger.
#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    pub git_url: String,
    /// Repository-relative path of the document to compile.
    pub file_path: String,
    pub branch: Option<String>,
    pub compiler: Compiler,
    /// Explicit credentials. When absent they are resolved from the credential store.
    pub auth: Option<ProviderAuth>,
    /// Whose stored credentials to use. `None` asks the store for its default.
    pub identity: Option<String>,
    /// Identifies the paper for progress callbacks and worker-side caching.
    pub paper_id: Option<String>,
    pub cache: CacheSettings,
    /// Dependency paths already known from earlier builds.
    pub known_dependencies: Vec<String>,
}

impl CompileRequest {
    pub fn new(git_url: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            git_url: git_url.into(),
            file_path: file_path.into(),
            ..Self::default()
        }
    }
}

/// The outcome of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub storage_id: String,
    pub size: u64,
    pub dependencies: Vec<DependencyHash>,
    /// Deduplicated, in worker order, always including the compile target.
    pub dependency_paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Starting,
    Compiling,
    Succeeded,
    Caching,
    Done,
}

/// Drives compiles against the external worker.
pub struct CompileOrchestrator {
    config: Config,
    client: WorkerClient,
    hashes: DependencyHashFetcher,
    credentials: Arc<dyn CredentialStore>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl CompileOrchestrator {
    pub fn new(
        config: Config,
        repo: Arc<dyn RepositoryAccess>,
        credentials: Arc<dyn CredentialStore>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Result<Self> {
        let client = WorkerClient::new(&config)?;
        let hashes = DependencyHashFetcher::new(repo, config.clone_timeout);
        Ok(Self {
            config,
            client,
            hashes,
            credentials,
            artifacts,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compiles `request`, reusing the dependency hashes of `previous` when
    /// the dependency set has not changed.
    ///
    /// Cancelling `cancel` aborts whatever is in flight (the worker request or
    /// a git subprocess) and returns [`Error::Interrupted`]; nothing from the
    /// aborted attempt is returned.
    #[tracing::instrument(skip_all, fields(file = %request.file_path))]
    pub async fn compile(
        &self,
        request: &CompileRequest,
        previous: Option<&BuildResult>,
        progress: &Progress,
        cancel: &CancellationToken,
    ) -> Result<BuildResult> {
        let clear = progress.clear_on_drop();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Interrupted),
            result = self.run(request, previous, progress) => result,
        };
        drop(clear);

        match &outcome {
            Ok(result) => log::info!(
                "Built '{}': {} ({} bytes, {} dependencies)",
                request.file_path,
                result.storage_id,
                result.size,
                result.dependency_paths.len()
            ),
            Err(e) => log::warn!("Compile of '{}' failed: {}", request.file_path, e),
        }
        outcome
    }

    async fn run(
        &self,
        request: &CompileRequest,
        previous: Option<&BuildResult>,
        progress: &Progress,
    ) -> Result<BuildResult> {
        enter(Stage::Starting);
        self.config.require_worker_url()?;
        progress.set(PROGRESS_STARTING);

        let source = resolve_source(
            &request.git_url,
            &self.config.self_hosted,
            request.identity.as_deref(),
            self.credentials.as_ref(),
        )
        .await;
        let auth = request.auth.clone().or(source.auth);
        let branch = request.branch.as_deref().filter(|b| !b.is_empty());

        let known = if request.known_dependencies.is_empty() {
            previous.map(|p| p.dependency_paths.clone()).unwrap_or_default()
        } else {
            request.known_dependencies.clone()
        };
        let payload = CompilePayload {
            git_url: source.clone_url.clone(),
            branch: branch.map(str::to_string),
            auth: auth.clone(),
            target: request.file_path.clone(),
            compiler: request.compiler,
            progress_callback: ProgressCallback::from_parts(
                self.config.progress_callback_url().as_ref(),
                request.paper_id.as_deref(),
                self.config.callback_secret.as_deref(),
            ),
            paper_id: request.paper_id.clone(),
            cache_mode: request.cache.resolve(),
            known_dependencies: (!known.is_empty()).then_some(known),
        };
        log::debug!(
            "Compiling '{}' from '{}' with {} (cache {})",
            payload.target,
            redact_url(&payload.git_url),
            payload.compiler,
            payload.cache_mode
        );

        enter(Stage::Compiling);
        let document = self.client.compile(&payload).await?;

        enter(Stage::Succeeded);
        let paths = dependency_paths(document.dependency_header.as_deref(), &request.file_path);
        let size = document.bytes.len() as u64;
        let storage_id = self
            .artifacts
            .store(document.bytes, &document.content_type)
            .await
            .map_err(Error::Storage)?;

        enter(Stage::Caching);
        let dependencies = self
            .dependency_hashes(&source.clone_url, branch, &paths, auth.as_ref(), previous, progress)
            .await;

        enter(Stage::Done);
        Ok(BuildResult {
            storage_id,
            size,
            dependencies,
            dependency_paths: paths,
        })
    }

    /// Reuses or refetches dependency hashes. A failed clone is logged and
    /// leaves the hash set empty so that the next build refetches.
    async fn dependency_hashes(
        &self,
        clone_url: &str,
        branch: Option<&str>,
        paths: &[String],
        auth: Option<&ProviderAuth>,
        previous: Option<&BuildResult>,
        progress: &Progress,
    ) -> Vec<DependencyHash> {
        if let Some(reused) = reusable_hashes(previous, paths) {
            log::info!("Dependency set unchanged; reusing {} hash(es)", reused.len());
            return reused.to_vec();
        }
        if paths.is_empty() {
            return Vec::new();
        }

        progress.set(PROGRESS_HASHING);
        match self.hashes.fetch_hashes(clone_url, branch, paths, auth).await {
            Ok(map) => order_hashes(paths, &map),
            Err(e) => {
                log::warn!("Could not hash dependencies: {}", e);
                Vec::new()
            }
        }
    }

    /// Drops worker-side cached state for `paper_ids`.
    pub async fn clear_cache(&self, paper_ids: &[String]) -> Result<CacheClearOutcome> {
        self.client.clear_cache(paper_ids).await
    }
}

fn enter(stage: Stage) {
    log::debug!("Compile stage: {:?}", stage);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_parsing() {
        assert_eq!("XeLaTeX".parse::<Compiler>(), Ok(Compiler::Xelatex));
        assert_eq!(Compiler::default(), Compiler::Pdflatex);
        assert!("context".parse::<Compiler>().is_err());
        assert_eq!(Compiler::Lualatex.to_string(), "lualatex");
    }

    #[test]
    fn test_build_result_json_shape() {
        let result = BuildResult {
            storage_id: "abc.pdf".into(),
            size: 42,
            dependencies: vec![DependencyHash {
                path: "main.tex".into(),
                hash: "h".into(),
            }],
            dependency_paths: vec!["main.tex".into()],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "storageId": "abc.pdf",
                "size": 42,
                "dependencies": [{ "path": "main.tex", "hash": "h" }],
                "dependencyPaths": ["main.tex"],
            })
        );
        let back: BuildResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }
}
