//! Defines application-specific error types.
//!
//! `Error` is what a caller of the compile pipeline receives: either a
//! configuration problem, a transport failure, or one of the classified
//! failure shapes returned by the compile worker. `GitError` covers the
//! subprocess-driven git stages.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the compile pipeline.
#[derive(Error, Debug)]
pub enum Error {
    // --- Configuration Errors ---
    /// A required setting (e.g. the worker URL) is absent or unparsable. Never retried.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    // --- Transport Errors ---
    /// The compile worker could not be reached after the retry budget was spent.
    #[error("Compile service unavailable: {0}")]
    ServiceUnavailable(String),

    // --- Classified Worker Responses ---
    /// The worker (or something in front of it) answered with an HTML page.
    #[error("Compile service returned an HTML error page (status {status}); the service may be down, behind a misconfigured proxy, or the worker URL may be wrong")]
    ServiceUnavailableHtml {
        /// HTTP status of the response.
        status: u16,
    },

    /// The compile target does not exist in the repository.
    #[error("Target file not found: {path}")]
    FileNotFound {
        /// The requested compile target.
        path: String,
    },

    /// The worker reported a structured compile failure.
    #[error("Compilation failed: {message}")]
    StructuredCompile {
        /// Human-readable failure message.
        message: String,
        /// Compiler log excerpt, already truncated.
        log: Option<String>,
    },

    /// The worker failed with a body that is neither JSON nor HTML.
    #[error("Compile service error (status {status}): {text}")]
    RawService {
        /// HTTP status of the response.
        status: u16,
        /// Response text, already truncated.
        text: String,
    },

    // --- Collaborator Errors ---
    #[error(transparent)]
    Git(#[from] GitError),

    /// The artifact store rejected the compiled document.
    #[error("Failed to store compiled artifact: {0:#}")]
    Storage(anyhow::Error),

    /// Error occurring during file or directory access.
    #[error("I/O error accessing path '{path}': {source}")]
    Io {
        /// The path that caused the I/O error.
        path: String,
        /// The underlying `std::io::Error`.
        #[source]
        source: std::io::Error,
    },

    // --- Signal Handling ---
    /// The operation was cancelled by the caller (e.g., Ctrl+C).
    #[error("Operation cancelled")]
    Interrupted,
}

impl Error {
    /// Whether the failure is one the user can fix by changing their project
    /// (as opposed to an outage or misconfiguration on our side).
    pub fn is_user_actionable(&self) -> bool {
        matches!(self, Error::FileNotFound { .. } | Error::StructuredCompile { .. })
    }
}

/// Failures of a single git stage.
#[derive(Error, Debug)]
pub enum GitError {
    /// The git process could not be started.
    #[error("git {stage} could not be started: {source}")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The git process did not finish within its timeout and was killed.
    #[error("git {stage} timed out after {}s", .timeout.as_secs())]
    Timeout { stage: &'static str, timeout: Duration },

    /// The git process exited unsuccessfully.
    #[error("git {stage} failed ({status}): {stderr}")]
    CommandFailed {
        stage: &'static str,
        status: String,
        stderr: String,
    },

    /// A file in the working tree could not be read or written.
    #[error("Failed to access '{path}' in working tree: {source}")]
    WorkTree {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Helper function to create an `Error::Io` with path context.
pub fn io_error_with_path<P: AsRef<std::path::Path>>(source: std::io::Error, path: P) -> Error {
    Error::Io {
        path: path.as_ref().display().to_string(),
        source,
    }
}
