// src/constants.rs

use std::time::Duration;

/// Prefix of the temporary directories used for dependency clones.
pub const CLONE_DIR_PREFIX: &str = "papersync-clone-";

/// Response header carrying the JSON array of dependency paths.
pub const DEPENDENCIES_HEADER: &str = "x-dependencies";

/// Substring the worker uses when the compile target is missing.
pub const TARGET_NOT_FOUND_MARKER: &str = "Target file not found";

/// Maximum number of characters of a compiler log kept in an error.
pub const MAX_LOG_CHARS: usize = 20_000;

/// Appended to a compiler log that was cut at [`MAX_LOG_CHARS`].
pub const LOG_TRUNCATION_MARKER: &str = "\n\n... [log truncated]";

/// Maximum number of characters of an unstructured error body kept in an error.
pub const MAX_RAW_ERROR_CHARS: usize = 500;

/// Content type of compiled artifacts.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Total attempts for the compile request (first try included).
pub const DEFAULT_RETRY_BUDGET: u32 = 2;

/// Bound on one compile request: clone plus compile of a large tree.
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(600);

/// Bound on one dependency clone.
pub const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Path of the progress endpoint on the site, relative to the site URL.
pub const PROGRESS_CALLBACK_PATH: &str = "compile-progress";

/// Progress text published when a compile begins.
pub const PROGRESS_STARTING: &str = "Starting...";

/// Progress text published while dependency hashes are computed.
pub const PROGRESS_HASHING: &str = "Checking dependencies...";
