//! `papersync` is a library and command-line tool that builds LaTeX documents
//! hosted in git repositories (GitHub, GitLab, self-hosted GitLab or Overleaf)
//! through an external compile worker.
//!
//! The library provides the compile pipeline and its building blocks:
//! 1.  **Resolve**: detect the hosting provider, rewrite Overleaf links and look
//!     up credentials.
//! 2.  **Compile**: call the worker with a bounded retry and classify any
//!     failure (missing target, HTML error page, structured compiler error or
//!     raw text).
//! 3.  **Track**: record the document's dependency paths and their content
//!     hashes, fetched with a single sparse clone and reused while the
//!     dependency set is unchanged.
//!
//! Collaborators sit behind traits so they can be swapped out:
//! [`git::RepositoryAccess`] for git, [`provider::CredentialStore`] for
//! tokens, [`storage::ArtifactStore`] for PDFs and [`progress::StatusSink`]
//! for progress text.
//!
//! # Example: Library Usage
//!
//! ```
//! use papersync::cache_mode::{CacheMode, CacheSettings};
//! use papersync::compile::dependency_paths;
//!
//! // Administrative "no cache" beats any preference.
//! let settings = CacheSettings {
//!     repo_mode: Some(CacheMode::Aux),
//!     user_mode: Some(CacheMode::Aux),
//!     cache_allowed: Some(false),
//! };
//! assert_eq!(settings.resolve(), CacheMode::Off);
//!
//! // The compile target is always part of the dependency list.
//! let paths = dependency_paths(Some(r#"["chapters/intro.tex"]"#), "main.tex");
//! assert_eq!(paths, vec!["chapters/intro.tex", "main.tex"]);
//! ```

pub mod cache_mode;
pub mod cancellation;
pub mod cli;
pub mod compile;
pub mod config;
pub mod constants;
pub mod errors;
pub mod git;
pub mod hashes;
pub mod prelude;
pub mod progress;
pub mod provider;
pub mod signal;
pub mod storage;

// Re-export key public types for easier use as a library
pub use cancellation::CancellationToken;
pub use compile::{BuildResult, CacheClearOutcome, CompileOrchestrator, CompileRequest, Compiler};
pub use config::{Config, ConfigBuilder};
pub use errors::{Error, Result};
