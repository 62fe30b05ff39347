//! Handles parsing and rewriting of repository URLs.

use super::ProviderAuth;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Overleaf project page or git remote: `.../project/<id>` or `git.overleaf.com/<id>`.
static OVERLEAF_PROJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https?://(?:www\.)?(?:overleaf\.com/(?:read/)?project|git\.overleaf\.com)/([0-9a-f]{24})(?:\.git)?/?(?:[?#].*)?$",
    )
    .unwrap()
});

/// scp-like remotes, e.g. `git@github.com:user/repo.git`.
static SCP_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[^@/]+@)?([^:/]+):[^/].*$").unwrap());

/// Extracts the lowercase host of a repository URL, including scp-like remotes.
///
/// # Examples
/// ```
/// use papersync::provider::host_of;
///
/// assert_eq!(host_of("https://GitHub.com/user/paper.git").as_deref(), Some("github.com"));
/// assert_eq!(host_of("git@gitlab.com:user/paper.git").as_deref(), Some("gitlab.com"));
/// assert_eq!(host_of("not a url"), None);
/// ```
pub fn host_of(git_url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(git_url) {
        return parsed.host_str().map(|h| h.to_ascii_lowercase());
    }
    SCP_LIKE_RE
        .captures(git_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Extracts the project id from an Overleaf project or git URL.
pub fn overleaf_project_id(url: &str) -> Option<String> {
    OVERLEAF_PROJECT_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Rewrites an Overleaf project reference into its git remote.
///
/// # Examples
/// ```
/// use papersync::provider::overleaf_git_url;
///
/// assert_eq!(
///     overleaf_git_url("https://www.overleaf.com/project/5f1e2d3c4b5a69788796a5b4").as_deref(),
///     Some("https://git.overleaf.com/5f1e2d3c4b5a69788796a5b4")
/// );
/// assert_eq!(overleaf_git_url("https://www.overleaf.com/learn"), None);
/// ```
pub fn overleaf_git_url(url: &str) -> Option<String> {
    overleaf_project_id(url).map(|id| format!("https://git.overleaf.com/{}", id))
}

/// Embeds credentials into an `http(s)` URL.
///
/// Anything that is not an `http(s)` URL (scp-like remotes, `file://`) is
/// returned unchanged, as is any URL when `auth` is `None`.
pub fn authenticated_url(git_url: &str, auth: Option<&ProviderAuth>) -> String {
    let Some(auth) = auth else {
        return git_url.to_string();
    };
    let Ok(mut parsed) = Url::parse(git_url) else {
        return git_url.to_string();
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return git_url.to_string();
    }
    if parsed.set_username(&auth.username).is_err()
        || parsed.set_password(Some(&auth.password)).is_err()
    {
        return git_url.to_string();
    }
    parsed.to_string()
}

/// Replaces any embedded password with `***` so the URL can be logged.
pub fn redact_url(git_url: &str) -> String {
    match Url::parse(git_url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            // set_password only fails for cannot-be-a-base URLs, which carry no password
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => git_url.to_string(),
    }
}

/// Normalizes an origin for prefix comparison: lowercase scheme and host,
/// no trailing slash.
pub(super) fn normalize_origin(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(parsed) => {
            let mut out = format!(
                "{}://{}",
                parsed.scheme(),
                parsed.host_str().unwrap_or_default().to_ascii_lowercase()
            );
            if let Some(port) = parsed.port() {
                out.push_str(&format!(":{}", port));
            }
            out.push_str(parsed.path().trim_end_matches('/'));
            out
        }
        Err(_) => trimmed.to_ascii_lowercase(),
    }
}
