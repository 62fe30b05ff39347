//! Defines the `Config` struct that parameterizes the compile pipeline.
//!
//! Everything the pipeline would otherwise read from the environment (worker
//! URL, site URL, callback secret, retry budget, timeouts) lives here and is
//! passed in at construction.

use crate::errors::{Error, Result};
use crate::provider::SelfHostedInstance;
use std::fmt;
use std::time::Duration;
use url::Url;

pub use builder::ConfigBuilder;
mod builder;

/// Environment variable holding the compile worker base URL.
pub const ENV_WORKER_URL: &str = "PAPERSYNC_WORKER_URL";
/// Environment variable holding the public site base URL.
pub const ENV_SITE_URL: &str = "PAPERSYNC_SITE_URL";
/// Environment variable holding the cloud deployment URL the site URL can be derived from.
pub const ENV_CLOUD_URL: &str = "PAPERSYNC_CLOUD_URL";
/// Environment variable holding the shared secret for progress callbacks.
pub const ENV_CALLBACK_SECRET: &str = "PAPERSYNC_CALLBACK_SECRET";

/// Settings for the compile pipeline.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the compile worker. Required for compiles; optional for cache clears.
    pub worker_url: Option<Url>,
    /// Base URL of the site that receives progress callbacks.
    pub site_url: Option<Url>,
    /// Shared secret the worker presents when pushing progress.
    pub callback_secret: Option<String>,
    /// Total attempts for one compile request.
    pub retry_budget: u32,
    /// Bound on one compile request.
    pub compile_timeout: Duration,
    /// Bound on one dependency clone.
    pub clone_timeout: Duration,
    /// Known self-hosted GitLab origins.
    pub self_hosted: Vec<SelfHostedInstance>,
}

// Custom Debug implementation so the secret never reaches logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("worker_url", &self.worker_url.as_ref().map(Url::as_str))
            .field("site_url", &self.site_url.as_ref().map(Url::as_str))
            .field(
                "callback_secret",
                &self.callback_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("retry_budget", &self.retry_budget)
            .field("compile_timeout", &self.compile_timeout)
            .field("clone_timeout", &self.clone_timeout)
            .field("self_hosted", &self.self_hosted)
            .finish()
    }
}

impl Config {
    /// The worker URL, or `ConfigurationMissing` if it is not set.
    pub fn require_worker_url(&self) -> Result<&Url> {
        self.worker_url.as_ref().ok_or_else(|| {
            Error::ConfigurationMissing(format!(
                "compile worker URL is not set (set {} or pass --worker-url)",
                ENV_WORKER_URL
            ))
        })
    }

    /// URL of the site endpoint the worker pushes progress to, if a site is known.
    pub fn progress_callback_url(&self) -> Option<Url> {
        self.site_url
            .as_ref()
            .and_then(|site| join_path(site, crate::constants::PROGRESS_CALLBACK_PATH).ok())
    }
}

/// Appends `path` to `base`, keeping any path `base` already has.
///
/// # Examples
/// ```
/// use papersync::config::join_path;
/// use url::Url;
///
/// let base = Url::parse("https://worker.example.com/v1").unwrap();
/// assert_eq!(
///     join_path(&base, "compile-from-git").unwrap().as_str(),
///     "https://worker.example.com/v1/compile-from-git"
/// );
/// ```
pub fn join_path(base: &Url, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
        .map_err(|e| Error::ConfigurationMissing(format!("invalid endpoint URL '{}': {}", joined, e)))
}
