//! The `papersync` prelude for convenient library usage.
//!
//! This module re-exports the types needed to drive a compile: configuration,
//! the orchestrator and its collaborator traits, and the result types.
//!
//! # Example
//!
//! ```no_run
//! use papersync::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let config = ConfigBuilder::from_env().build()?;
//! let orchestrator = CompileOrchestrator::new(
//!     config,
//!     Arc::new(GitCli::new()?),
//!     Arc::new(EnvCredentialStore),
//!     Arc::new(FsArtifactStore::new("out").map_err(Error::Storage)?),
//! )?;
//! let request = CompileRequest::new("https://github.com/user/thesis.git", "main.tex");
//! let result = orchestrator
//!     .compile(&request, None, &Progress::default(), &CancellationToken::new())
//!     .await?;
//! println!("stored as {}", result.storage_id);
//! # Ok(())
//! # }
//! ```

pub use crate::cache_mode::{resolve_cache_mode, CacheMode, CacheSettings};
pub use crate::cancellation::CancellationToken;
pub use crate::compile::{
    BuildResult, CacheClearOutcome, CompileOrchestrator, CompileRequest, Compiler,
};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::errors::{Error, GitError, Result};
pub use crate::git::{GitCli, RepositoryAccess};
pub use crate::hashes::{DependencyHash, DependencyHashFetcher};
pub use crate::progress::{NoOpProgress, Progress, StatusSink};
pub use crate::provider::{
    CredentialStore, EnvCredentialStore, NoCredentials, ProviderAuth, ProviderKind,
    SelfHostedInstance,
};
pub use crate::storage::{ArtifactStore, FsArtifactStore};
