use super::{Config, ENV_CALLBACK_SECRET, ENV_CLOUD_URL, ENV_SITE_URL, ENV_WORKER_URL};
use crate::constants::{DEFAULT_CLONE_TIMEOUT, DEFAULT_COMPILE_TIMEOUT, DEFAULT_RETRY_BUDGET};
use crate::errors::{Error, Result};
use crate::provider::SelfHostedInstance;
use std::time::Duration;
use url::Url;

/// A builder for creating a [`Config`] programmatically or from the environment.
///
/// # Examples
///
/// ```
/// use papersync::ConfigBuilder;
/// use std::time::Duration;
///
/// let config = ConfigBuilder::new()
///     .worker_url("https://worker.example.com")
///     .cloud_url("https://happy-otter-123.example.cloud")
///     .callback_secret("s3cret")
///     .compile_timeout(Duration::from_secs(300))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.site_url.unwrap().as_str(), "https://happy-otter-123.example.site/");
/// assert_eq!(config.retry_budget, 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    worker_url: Option<String>,
    site_url: Option<String>,
    cloud_url: Option<String>,
    callback_secret: Option<String>,
    retry_budget: Option<u32>,
    compile_timeout: Option<Duration>,
    clone_timeout: Option<Duration>,
    self_hosted: Vec<SelfHostedInstance>,
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ConfigBuilder {
    /// Creates a builder with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder pre-populated from the `PAPERSYNC_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            worker_url: env_value(ENV_WORKER_URL),
            site_url: env_value(ENV_SITE_URL),
            cloud_url: env_value(ENV_CLOUD_URL),
            callback_secret: env_value(ENV_CALLBACK_SECRET),
            ..Self::default()
        }
    }

    pub fn worker_url(mut self, url: impl Into<String>) -> Self {
        self.worker_url = Some(url.into());
        self
    }

    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = Some(url.into());
        self
    }

    /// Deployment URL to derive the site URL from when no site URL is given.
    pub fn cloud_url(mut self, url: impl Into<String>) -> Self {
        self.cloud_url = Some(url.into());
        self
    }

    pub fn callback_secret(mut self, secret: impl Into<String>) -> Self {
        self.callback_secret = Some(secret.into());
        self
    }

    /// Total attempts for the compile request. Values below 1 are raised to 1.
    pub fn retry_budget(mut self, attempts: u32) -> Self {
        self.retry_budget = Some(attempts);
        self
    }

    pub fn compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = Some(timeout);
        self
    }

    pub fn clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = Some(timeout);
        self
    }

    /// Registers a self-hosted GitLab origin and its token.
    pub fn self_hosted_instance(mut self, url: impl Into<String>, token: impl Into<String>) -> Self {
        self.self_hosted.push(SelfHostedInstance {
            url: url.into(),
            token: token.into(),
        });
        self
    }

    /// Validates the URLs and produces the final [`Config`].
    pub fn build(self) -> Result<Config> {
        let worker_url = parse_url("worker URL", self.worker_url.as_deref())?;
        let site_url = match parse_url("site URL", self.site_url.as_deref())? {
            Some(url) => Some(url),
            None => match parse_url("cloud URL", self.cloud_url.as_deref())? {
                Some(cloud) => derive_site_url(&cloud),
                None => None,
            },
        };
        let config = Config {
            worker_url,
            site_url,
            callback_secret: self.callback_secret.filter(|s| !s.is_empty()),
            retry_budget: self.retry_budget.unwrap_or(DEFAULT_RETRY_BUDGET).max(1),
            compile_timeout: self.compile_timeout.unwrap_or(DEFAULT_COMPILE_TIMEOUT),
            clone_timeout: self.clone_timeout.unwrap_or(DEFAULT_CLONE_TIMEOUT),
            self_hosted: self.self_hosted,
        };
        log::debug!("Built configuration: {:?}", config);
        Ok(config)
    }
}

fn parse_url(what: &str, value: Option<&str>) -> Result<Option<Url>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let url = Url::parse(value)
        .map_err(|e| Error::ConfigurationMissing(format!("invalid {} '{}': {}", what, value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::ConfigurationMissing(format!(
            "invalid {} '{}': expected an http(s) URL",
            what, value
        )));
    }
    Ok(Some(url))
}

/// `https://name.example.cloud` -> `https://name.example.site`.
fn derive_site_url(cloud: &Url) -> Option<Url> {
    let host = cloud.host_str()?;
    let stem = host.strip_suffix(".cloud")?;
    let mut site = cloud.clone();
    site.set_host(Some(&format!("{}.site", stem))).ok()?;
    Some(site)
}
