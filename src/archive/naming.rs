use std::collections::HashSet;

use reqwest::Url;

/// Entry name for the source at `index`
///
/// Uses the last non-empty path segment; falls back to `file_<index>` when the
/// URL has no usable segment.
pub fn entry_name(url: &str, index: usize) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .filter(|name| name != "." && name != "..")
        .unwrap_or_else(|| format!("file_{index}"))
}

/// Qualify `base` with the source index if an earlier entry already took it
pub fn unique_name(base: String, index: usize, used: &HashSet<String>) -> String {
    if !used.contains(&base) {
        return base;
    }

    let mut candidate = format!("{index}_{base}");
    let mut attempt = 1;
    while used.contains(&candidate) {
        candidate = format!("{index}_{attempt}_{base}");
        attempt += 1;
    }
    candidate
}
