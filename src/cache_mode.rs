//! Resolves the effective auxiliary-cache policy for a compile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether the compile worker may reuse auxiliary build state across invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// No compiler-side auxiliary caching.
    #[default]
    Off,
    /// Auxiliary files (`.aux`, `.bbl`, ...) may be reused.
    Aux,
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheMode::Off => "off",
            CacheMode::Aux => "aux",
        })
    }
}

impl FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(CacheMode::Off),
            "aux" => Ok(CacheMode::Aux),
            other => Err(format!("Unknown cache mode '{}' (expected 'off' or 'aux')", other)),
        }
    }
}

/// The three settings that feed the cache decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    /// Per-repository preference.
    pub repo_mode: Option<CacheMode>,
    /// Per-user preference.
    pub user_mode: Option<CacheMode>,
    /// Administrative switch. `Some(false)` forces caching off.
    pub cache_allowed: Option<bool>,
}

impl CacheSettings {
    pub fn resolve(&self) -> CacheMode {
        resolve_cache_mode(self.repo_mode, self.user_mode, self.cache_allowed)
    }
}

/// Combines repository, user and administrative settings into one mode.
///
/// An explicit `cache_allowed == Some(false)` wins over everything. Otherwise
/// the repository setting beats the user setting, and with neither set the
/// result is [`CacheMode::Off`].
///
/// # Examples
/// ```
/// use papersync::cache_mode::{resolve_cache_mode, CacheMode};
///
/// assert_eq!(resolve_cache_mode(Some(CacheMode::Aux), Some(CacheMode::Aux), Some(false)), CacheMode::Off);
/// assert_eq!(resolve_cache_mode(None, Some(CacheMode::Aux), None), CacheMode::Aux);
/// assert_eq!(resolve_cache_mode(None, None, None), CacheMode::Off);
/// ```
pub fn resolve_cache_mode(
    repo_mode: Option<CacheMode>,
    user_mode: Option<CacheMode>,
    cache_allowed: Option<bool>,
) -> CacheMode {
    if cache_allowed == Some(false) {
        return CacheMode::Off;
    }
    repo_mode.or(user_mode).unwrap_or(CacheMode::Off)
}
