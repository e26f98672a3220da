//! Centralized naming for rendered variants.
//!
//! Every variant lands at a path derived only from content and arguments, so
//! identical renders share one file and a changed argument never overwrites
//! an older variant:
//!
//! ```text
//! {public_dir}/static/{contentDigest}/{argsDigest}/{name}.{format}
//!                     └────────── output root ───┘└─ relative path ─┘
//! ```
//!
//! ## Examples
//! - `photos/My Sunset.jpg`, args digest `3fa1c`, webp →
//!   `3fa1c/My%20Sunset.webp`
//! - with `path_prefix = "/blog"` the public `src` becomes
//!   `/blog/static/{contentDigest}/3fa1c/My%20Sunset.webp`

use std::path::Path;

/// Directory under the public root that holds every rendered variant.
pub const STATIC_DIR: &str = "static";

/// Split a source path into its stem and lowercase extension.
///
/// - `"photos/sunset.JPG"` → `("sunset", "jpg")`
/// - `"archive.tar.gz"` → `("archive.tar", "gz")`
/// - `"README"` → `("README", "")`
pub fn split_file_name(path: &Path) -> (String, String) {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    (name, extension)
}

/// Percent-encode everything except the unreserved URI characters
/// (`A-Z a-z 0-9 - _ . ! ~ * ' ( )`), byte by byte over UTF-8.
pub fn url_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Relative output path of one variant: `{args_digest}/{encoded name}.{ext}`.
pub fn output_relative_path(args_digest: &str, name: &str, extension: &str) -> String {
    format!("{}/{}.{}", args_digest, url_encode(name), extension)
}

/// Public URL of a variant.
///
/// `path_prefix` is joined without doubling slashes; an empty prefix gives a
/// root-relative URL.
pub fn static_src(path_prefix: &str, content_digest: &str, relative_path: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        path_prefix.trim_end_matches('/'),
        STATIC_DIR,
        content_digest,
        relative_path
    )
}

/// Filesystem directory receiving every variant of one source.
pub fn output_root(public_dir: &Path, content_digest: &str) -> std::path::PathBuf {
    public_dir.join(STATIC_DIR).join(content_digest)
}
