//! HTTP client for the external compile worker.

use super::classify::classify_failure;
use super::Compiler;
use crate::cache_mode::CacheMode;
use crate::config::{join_path, Config};
use crate::constants::{DEPENDENCIES_HEADER, PDF_CONTENT_TYPE};
use crate::errors::{Error, Result};
use crate::provider::ProviderAuth;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Where the worker pushes progress text while it builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCallback {
    pub url: String,
    pub paper_id: String,
    pub secret: String,
}

impl ProgressCallback {
    /// Builds the descriptor only when all three parts are known.
    pub fn from_parts(url: Option<&Url>, paper_id: Option<&str>, secret: Option<&str>) -> Option<Self> {
        let paper_id = paper_id.filter(|p| !p.is_empty())?;
        let secret = secret.filter(|s| !s.is_empty())?;
        Some(Self {
            url: url?.to_string(),
            paper_id: paper_id.to_string(),
            secret: secret.to_string(),
        })
    }
}

/// JSON body of `POST /compile-from-git`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilePayload {
    pub git_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<ProviderAuth>,
    pub target: String,
    pub compiler: Compiler,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_callback: Option<ProgressCallback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
    pub cache_mode: CacheMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_dependencies: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheClearPayload<'a> {
    paper_ids: &'a [String],
}

/// A successful compile: the document plus the raw dependency header.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub dependency_header: Option<String>,
}

/// Result of a cache invalidation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CacheClearOutcome {
    Cleared { count: usize },
    /// No worker is configured; nothing was sent.
    Skipped,
}

/// Talks to the compile worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WorkerClient {
    http: Client,
    base: Option<Url>,
    retry_budget: u32,
}

impl WorkerClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.compile_timeout)
            .build()
            .map_err(|e| Error::ConfigurationMissing(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base: config.worker_url.clone(),
            retry_budget: config.retry_budget.max(1),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base.as_ref().ok_or_else(|| {
            Error::ConfigurationMissing(format!(
                "compile worker URL is not set (set {})",
                crate::config::ENV_WORKER_URL
            ))
        })?;
        join_path(base, path)
    }

    /// Sends the compile request, retrying transport failures only.
    ///
    /// Any HTTP response, successful or not, ends the retry loop. Non-2xx
    /// responses are classified against `payload.target`.
    pub async fn compile(&self, payload: &CompilePayload) -> Result<CompiledDocument> {
        let url = self.endpoint("compile-from-git")?;

        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            log::debug!("POST {} (attempt {}/{})", url, attempt, self.retry_budget);
            match self
                .http
                .post(url.clone())
                .header(USER_AGENT, user_agent())
                .json(payload)
                .send()
                .await
            {
                Ok(response) => break response,
                Err(e) if attempt < self.retry_budget => {
                    log::warn!("Compile request attempt {} failed: {}; retrying", attempt, e);
                }
                Err(e) => {
                    return Err(Error::ServiceUnavailable(format!(
                        "compile worker unreachable after {} attempt(s): {}",
                        attempt, e
                    )));
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            log::debug!("Compile worker answered {} ({} bytes)", status, body.len());
            return Err(
                classify_failure(status.as_u16(), &body, Some(&payload.target))
                    .into_error(status.as_u16()),
            );
        }

        let header_text = |name: &str| {
            response
                .headers()
                .get(name)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        };
        let dependency_header = header_text(DEPENDENCIES_HEADER);
        let content_type = header_text(CONTENT_TYPE.as_str())
            .unwrap_or_else(|| PDF_CONTENT_TYPE.to_string());

        let bytes = response.bytes().await.map_err(|e| {
            Error::ServiceUnavailable(format!("failed to read compiled document: {}", e))
        })?;
        log::info!("Compile worker returned {} bytes", bytes.len());
        Ok(CompiledDocument {
            bytes: bytes.to_vec(),
            content_type,
            dependency_header,
        })
    }

    /// Asks the worker to drop cached auxiliary state for `paper_ids`.
    pub async fn clear_cache(&self, paper_ids: &[String]) -> Result<CacheClearOutcome> {
        if self.base.is_none() {
            log::info!("No compile worker configured; skipping cache clear");
            return Ok(CacheClearOutcome::Skipped);
        }
        if paper_ids.is_empty() {
            return Ok(CacheClearOutcome::Cleared { count: 0 });
        }
        let url = self.endpoint("cache/clear")?;
        let response = self
            .http
            .post(url)
            .header(USER_AGENT, user_agent())
            .json(&CacheClearPayload { paper_ids })
            .send()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("cache clear failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(classify_failure(status.as_u16(), &body, None).into_error(status.as_u16()));
        }
        log::info!("Cleared worker cache for {} paper(s)", paper_ids.len());
        Ok(CacheClearOutcome::Cleared {
            count: paper_ids.len(),
        })
    }
}

fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Reads a failed response's body. An unreadable body classifies as empty.
async fn error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => {
            log::debug!("Failed to read error response body: {}", e);
            String::new()
        }
    }
}
