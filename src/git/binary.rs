// src/git/binary.rs

use std::path::Path;

/// Extensions (lowercase, without the dot) whose content is never read as text.
const BINARY_EXTENSIONS: &[&str] = &[
    // Images
    "png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "ico", "webp", "eps", "psd", "heic",
    // Documents that are binary on disk
    "pdf",
    // Archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "zst",
    // Executables and libraries
    "exe", "dll", "so", "dylib", "bin", "o", "a", "class", "jar", "wasm",
    // Audio / video
    "mp3", "wav", "ogg", "flac", "m4a", "mp4", "mov", "avi", "mkv", "webm",
    // Fonts
    "ttf", "otf", "woff", "woff2", "eot", "pfb",
];

/// Checks whether a path names a binary file, judged by extension only.
///
/// Binary files are hashed by streaming rather than read into memory. This
/// never decides whether a file gets hashed.
///
/// # Examples
/// ```
/// use papersync::git::is_binary_file;
///
/// assert!(is_binary_file("figures/plot.PNG"));
/// assert!(!is_binary_file("chapters/intro.tex"));
/// assert!(!is_binary_file("Makefile"));
/// ```
pub fn is_binary_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            BINARY_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
