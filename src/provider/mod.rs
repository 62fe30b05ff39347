//! Maps repository URLs to hosting providers and resolves credentials for them.
//!
//! This module provides functionality to:
//! - Detect whether a URL points at GitHub, GitLab, a self-hosted GitLab
//!   instance or Overleaf.
//! - Rewrite Overleaf project links into git remotes.
//! - Look up provider credentials through a [`CredentialStore`].
//!
//! Missing credentials are never an error: public repositories can still be
//! cloned without them.

mod links;

pub use links::{authenticated_url, host_of, overleaf_git_url, overleaf_project_id, redact_url};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hosting provider of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Github,
    Gitlab,
    #[serde(rename = "selfhosted-gitlab")]
    SelfHostedGitlab,
    Overleaf,
    /// Any host we have no credentials for.
    Other,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::Github => "github",
            ProviderKind::Gitlab => "gitlab",
            ProviderKind::SelfHostedGitlab => "selfhosted-gitlab",
            ProviderKind::Overleaf => "overleaf",
            ProviderKind::Other => "other",
        })
    }
}

/// A username/password pair handed to git or the compile worker.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAuth {
    pub username: String,
    pub password: String,
}

impl ProviderAuth {
    /// GitHub tokens are sent as the password of the `x-access-token` user.
    pub fn github(token: impl Into<String>) -> Self {
        Self {
            username: "x-access-token".to_string(),
            password: token.into(),
        }
    }

    /// GitLab (public or self-hosted) OAuth tokens use the `oauth2` user.
    pub fn gitlab(token: impl Into<String>) -> Self {
        Self {
            username: "oauth2".to_string(),
            password: token.into(),
        }
    }
}

// Never print the secret half.
impl fmt::Debug for ProviderAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A self-hosted GitLab origin together with the token to use for it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfHostedInstance {
    pub url: String,
    pub token: String,
}

impl fmt::Debug for SelfHostedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfHostedInstance")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Per-provider token stores, keyed by the identity of the requesting user.
///
/// Each method returns `Ok(None)` when nothing is stored. Errors are logged by
/// the resolver and treated the same as `None`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn github_token(&self, identity: &str) -> anyhow::Result<Option<String>>;
    async fn gitlab_token(&self, identity: &str) -> anyhow::Result<Option<String>>;
    async fn overleaf_credentials(&self, identity: &str) -> anyhow::Result<Option<ProviderAuth>>;
}

/// A store with no credentials at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

#[async_trait]
impl CredentialStore for NoCredentials {
    async fn github_token(&self, _identity: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
    async fn gitlab_token(&self, _identity: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
    async fn overleaf_credentials(&self, _identity: &str) -> anyhow::Result<Option<ProviderAuth>> {
        Ok(None)
    }
}

/// Reads credentials from `GITHUB_TOKEN`, `GITLAB_TOKEN`, `OVERLEAF_USERNAME`
/// and `OVERLEAF_PASSWORD`. The identity is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialStore;

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl CredentialStore for EnvCredentialStore {
    async fn github_token(&self, _identity: &str) -> anyhow::Result<Option<String>> {
        Ok(non_empty_env("GITHUB_TOKEN"))
    }
    async fn gitlab_token(&self, _identity: &str) -> anyhow::Result<Option<String>> {
        Ok(non_empty_env("GITLAB_TOKEN"))
    }
    async fn overleaf_credentials(&self, _identity: &str) -> anyhow::Result<Option<ProviderAuth>> {
        Ok(non_empty_env("OVERLEAF_USERNAME")
            .zip(non_empty_env("OVERLEAF_PASSWORD"))
            .map(|(username, password)| ProviderAuth { username, password }))
    }
}

/// Finds the self-hosted instance whose URL is the longest prefix of `git_url`.
///
/// A prefix only matches on a path boundary, so `https://git.example.com`
/// does not match `https://git.example.community/...`.
pub fn match_self_hosted<'a>(
    git_url: &str,
    instances: &'a [SelfHostedInstance],
) -> Option<&'a SelfHostedInstance> {
    let target = links::normalize_origin(git_url);
    instances
        .iter()
        .filter_map(|instance| {
            let prefix = links::normalize_origin(&instance.url);
            if prefix.is_empty() {
                return None;
            }
            let rest = target.strip_prefix(&prefix)?;
            (rest.is_empty() || rest.starts_with('/')).then_some((prefix.len(), instance))
        })
        // max_by_key keeps the last maximum; reverse so the first listed wins ties
        .rev()
        .max_by_key(|(len, _)| *len)
        .map(|(_, instance)| instance)
}

/// Determines which provider hosts `git_url`.
///
/// # Examples
/// ```
/// use papersync::provider::{resolve_provider, ProviderKind, SelfHostedInstance};
///
/// let instances = vec![SelfHostedInstance {
///     url: "https://git.example.edu".to_string(),
///     token: "t".to_string(),
/// }];
/// assert_eq!(resolve_provider("https://github.com/u/p.git", &instances), ProviderKind::Github);
/// assert_eq!(resolve_provider("https://gitlab.com/u/p.git", &instances), ProviderKind::Gitlab);
/// assert_eq!(
///     resolve_provider("https://git.example.edu/u/p.git", &instances),
///     ProviderKind::SelfHostedGitlab
/// );
/// ```
pub fn resolve_provider(git_url: &str, instances: &[SelfHostedInstance]) -> ProviderKind {
    let host = host_of(git_url).unwrap_or_default();
    if host == "overleaf.com" || host.ends_with(".overleaf.com") {
        return ProviderKind::Overleaf;
    }
    if host == "github.com" || host == "www.github.com" {
        return ProviderKind::Github;
    }
    if match_self_hosted(git_url, instances).is_some() {
        return ProviderKind::SelfHostedGitlab;
    }
    if host == "gitlab.com" || host == "www.gitlab.com" {
        return ProviderKind::Gitlab;
    }
    ProviderKind::Other
}

/// Looks up credentials for `provider`. `None` means "try unauthenticated".
pub async fn resolve_auth(
    provider: ProviderKind,
    git_url: &str,
    instances: &[SelfHostedInstance],
    identity: &str,
    store: &dyn CredentialStore,
) -> Option<ProviderAuth> {
    let lookup = match provider {
        ProviderKind::Github => store
            .github_token(identity)
            .await
            .map(|t| t.map(ProviderAuth::github)),
        ProviderKind::Gitlab => store
            .gitlab_token(identity)
            .await
            .map(|t| t.map(ProviderAuth::gitlab)),
        ProviderKind::SelfHostedGitlab => Ok(match_self_hosted(git_url, instances)
            .filter(|instance| !instance.token.is_empty())
            .map(|instance| ProviderAuth::gitlab(instance.token.clone()))),
        ProviderKind::Overleaf => {
            if overleaf_project_id(git_url).is_none() {
                log::warn!(
                    "'{}' is not an Overleaf project reference; continuing without credentials",
                    redact_url(git_url)
                );
                return None;
            }
            store.overleaf_credentials(identity).await
        }
        ProviderKind::Other => Ok(None),
    };

    match lookup {
        Ok(Some(auth)) => {
            log::debug!("Using stored {} credentials", provider);
            Some(auth)
        }
        Ok(None) => {
            log::debug!("No {} credentials stored; continuing unauthenticated", provider);
            None
        }
        Err(e) => {
            log::warn!(
                "Credential lookup for {} failed, continuing unauthenticated: {:#}",
                provider,
                e
            );
            None
        }
    }
}

/// The outcome of provider resolution for one compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub provider: ProviderKind,
    /// The URL to clone from (Overleaf project links rewritten to git remotes).
    pub clone_url: String,
    pub auth: Option<ProviderAuth>,
}

/// Resolves the provider, the clone URL and the credentials for `git_url`.
pub async fn resolve_source(
    git_url: &str,
    instances: &[SelfHostedInstance],
    identity: Option<&str>,
    store: &dyn CredentialStore,
) -> ResolvedSource {
    let provider = resolve_provider(git_url, instances);
    let clone_url = match provider {
        ProviderKind::Overleaf => overleaf_git_url(git_url).unwrap_or_else(|| git_url.to_string()),
        _ => git_url.to_string(),
    };
    // An absent identity asks the store for its default credentials.
    let auth = resolve_auth(
        provider,
        git_url,
        instances,
        identity.unwrap_or_default(),
        store,
    )
    .await;
    log::info!(
        "Resolved '{}' as {} ({})",
        redact_url(git_url),
        provider,
        if auth.is_some() {
            "authenticated"
        } else {
            "unauthenticated"
        }
    );
    ResolvedSource {
        provider,
        clone_url,
        auth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn instances() -> Vec<SelfHostedInstance> {
        vec![
            SelfHostedInstance {
                url: "https://git.example.edu".to_string(),
                token: "edu-token".to_string(),
            },
            SelfHostedInstance {
                url: "https://git.example.edu/physics/".to_string(),
                token: "physics-token".to_string(),
            },
        ]
    }

    #[derive(Default)]
    struct RecordingStore {
        github: Option<String>,
        overleaf: Option<ProviderAuth>,
        fail: bool,
        identities: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CredentialStore for RecordingStore {
        async fn github_token(&self, identity: &str) -> anyhow::Result<Option<String>> {
            self.identities.lock().unwrap().push(identity.to_string());
            if self.fail {
                anyhow::bail!("token store offline");
            }
            Ok(self.github.clone())
        }
        async fn gitlab_token(&self, _identity: &str) -> anyhow::Result<Option<String>> {
            Ok(Some("gl-token".to_string()))
        }
        async fn overleaf_credentials(&self, _identity: &str) -> anyhow::Result<Option<ProviderAuth>> {
            Ok(self.overleaf.clone())
        }
    }

    #[test]
    fn test_resolve_provider_kinds() {
        let inst = instances();
        assert_eq!(
            resolve_provider("git@github.com:u/p.git", &inst),
            ProviderKind::Github
        );
        assert_eq!(
            resolve_provider("https://www.overleaf.com/project/5f1e2d3c4b5a69788796a5b4", &inst),
            ProviderKind::Overleaf
        );
        assert_eq!(
            resolve_provider("https://git.overleaf.com/5f1e2d3c4b5a69788796a5b4", &inst),
            ProviderKind::Overleaf
        );
        assert_eq!(
            resolve_provider("https://bitbucket.org/u/p.git", &inst),
            ProviderKind::Other
        );
        assert_eq!(
            resolve_provider("https://git.example.education/u/p.git", &inst),
            ProviderKind::Other
        );
    }

    #[test]
    fn test_longest_self_hosted_prefix_wins() {
        let inst = instances();
        let matched = match_self_hosted("https://git.example.edu/physics/thesis.git", &inst);
        assert_eq!(matched.map(|i| i.token.as_str()), Some("physics-token"));
        let matched = match_self_hosted("https://GIT.example.edu/chem/thesis.git", &inst);
        assert_eq!(matched.map(|i| i.token.as_str()), Some("edu-token"));
    }

    #[test]
    fn test_first_listed_wins_equal_prefixes() {
        let inst = vec![
            SelfHostedInstance {
                url: "https://git.example.edu".to_string(),
                token: "first".to_string(),
            },
            SelfHostedInstance {
                url: "https://git.example.edu/".to_string(),
                token: "second".to_string(),
            },
        ];
        let matched = match_self_hosted("https://git.example.edu/u/p.git", &inst);
        assert_eq!(matched.map(|i| i.token.as_str()), Some("first"));
    }

    #[tokio::test]
    async fn test_github_token_maps_to_access_token_user() {
        let store = RecordingStore {
            github: Some("ghp_abc".to_string()),
            ..Default::default()
        };
        let auth = resolve_auth(ProviderKind::Github, "https://github.com/u/p", &[], "user-1", &store)
            .await
            .unwrap();
        assert_eq!(auth.username, "x-access-token");
        assert_eq!(auth.password, "ghp_abc");
        assert_eq!(*store.identities.lock().unwrap(), vec!["user-1".to_string()]);
    }

    #[tokio::test]
    async fn test_gitlab_and_self_hosted_use_oauth2() {
        let store = RecordingStore::default();
        let auth = resolve_auth(ProviderKind::Gitlab, "https://gitlab.com/u/p", &[], "u", &store)
            .await
            .unwrap();
        assert_eq!(auth, ProviderAuth::gitlab("gl-token"));

        let auth = resolve_auth(
            ProviderKind::SelfHostedGitlab,
            "https://git.example.edu/u/p.git",
            &instances(),
            "u",
            &store,
        )
        .await
        .unwrap();
        assert_eq!(auth, ProviderAuth::gitlab("edu-token"));
    }

    #[tokio::test]
    async fn test_missing_or_failing_store_yields_none() {
        let store = RecordingStore::default();
        assert!(resolve_auth(ProviderKind::Github, "https://github.com/u/p", &[], "u", &store)
            .await
            .is_none());

        let failing = RecordingStore {
            fail: true,
            github: Some("ignored".to_string()),
            ..Default::default()
        };
        assert!(
            resolve_auth(ProviderKind::Github, "https://github.com/u/p", &[], "u", &failing)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_overleaf_requires_project_reference() {
        let creds = ProviderAuth {
            username: "me@example.com".to_string(),
            password: "pw".to_string(),
        };
        let store = RecordingStore {
            overleaf: Some(creds.clone()),
            ..Default::default()
        };
        assert!(resolve_auth(
            ProviderKind::Overleaf,
            "https://www.overleaf.com/learn",
            &[],
            "u",
            &store
        )
        .await
        .is_none());

        let auth = resolve_auth(
            ProviderKind::Overleaf,
            "https://www.overleaf.com/project/5f1e2d3c4b5a69788796a5b4",
            &[],
            "u",
            &store,
        )
        .await;
        assert_eq!(auth, Some(creds));
    }

    #[tokio::test]
    async fn test_resolve_source_rewrites_overleaf() {
        let source = resolve_source(
            "https://www.overleaf.com/project/5f1e2d3c4b5a69788796a5b4",
            &[],
            None,
            &NoCredentials,
        )
        .await;
        assert_eq!(source.provider, ProviderKind::Overleaf);
        assert_eq!(
            source.clone_url,
            "https://git.overleaf.com/5f1e2d3c4b5a69788796a5b4"
        );
        assert!(source.auth.is_none());
    }

    #[tokio::test]
    async fn test_resolve_source_without_identity_uses_store_default() {
        let store = RecordingStore {
            github: Some("ghp_default".to_string()),
            ..Default::default()
        };
        let source = resolve_source("https://github.com/u/private.git", &[], None, &store).await;
        assert_eq!(source.auth, Some(ProviderAuth::github("ghp_default")));
        assert_eq!(*store.identities.lock().unwrap(), vec![String::new()]);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", ProviderAuth::github("ghp_secret"));
        assert!(!rendered.contains("ghp_secret"));
        let rendered = format!("{:?}", instances()[0]);
        assert!(!rendered.contains("edu-token"));
    }

    #[test]
    fn test_provider_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::SelfHostedGitlab).unwrap(),
            "\"selfhosted-gitlab\""
        );
        assert_eq!(serde_json::to_string(&ProviderKind::Github).unwrap(), "\"github\"");
    }
}
