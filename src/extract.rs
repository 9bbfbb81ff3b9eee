//! Attachment URL extraction from a package directory tree.
//!
//! The pattern is fixed: `https://cdn.discordapp.com/` followed by any run of
//! non-space characters. Matching is line-oriented, so a match never crosses a
//! line break, and every match is reported, duplicates included.

use std::path::Path;
use std::sync::LazyLock;

use ignore::WalkBuilder;
use regex::bytes::Regex;
use tracing::{debug, trace, warn};

/// Pattern for attachment URLs in package files.
/// The path class is byte-oriented so invalid UTF-8 does not end a match.
pub const ATTACHMENT_URL_PATTERN: &str = r"https://cdn\.discordapp\.com/(?-u:[^ \r\n])+";

#[allow(clippy::expect_used)]
static ATTACHMENT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ATTACHMENT_URL_PATTERN).expect("attachment URL regex is valid") // Static pattern, safe to panic
});

/// Yields every attachment URL found in `content`, in order of appearance.
///
/// Content is treated as an opaque byte blob; invalid UTF-8 inside a match is
/// replaced rather than rejected.
///
/// # Examples
///
/// ```
/// use harvester_core::extract::extract_candidates;
///
/// let text = b"see https://cdn.discordapp.com/a/1/x.png and https://example.com/y.png";
/// let urls: Vec<String> = extract_candidates(text).collect();
/// assert_eq!(urls, vec!["https://cdn.discordapp.com/a/1/x.png"]);
/// ```
pub fn extract_candidates(content: &[u8]) -> impl Iterator<Item = String> + '_ {
    ATTACHMENT_URL
        .find_iter(content)
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

/// Lazily scans every regular file under `root`, recursively.
///
/// Hidden files and ignore files are not honored: every file is scanned.
/// Entries are visited in file-name order within each directory so repeated
/// scans of the same tree yield the same sequence. Unreadable entries are
/// logged and skipped.
pub fn scan_tree(root: &Path) -> impl Iterator<Item = String> + use<> {
    WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable package entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|kind| kind.is_file()))
        .flat_map(|entry| scan_file(entry.path()))
}

/// Reads one file and returns its candidates; unreadable files yield none.
fn scan_file(path: &Path) -> Vec<String> {
    match std::fs::read(path) {
        Ok(content) => {
            let found: Vec<String> = extract_candidates(&content).collect();
            if found.is_empty() {
                trace!(path = %path.display(), "no attachment URLs");
            } else {
                debug!(path = %path.display(), count = found.len(), "attachment URLs found");
            }
            found
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable file");
            Vec::new()
        }
    }
}
