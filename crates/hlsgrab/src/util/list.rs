//! Helpers for newline-separated lists of captured manifest URLs.

use std::collections::HashSet;

use reqwest::Url;

/// Splits an exported URL list into entries, dropping blank lines.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reduces a URL to `origin + path`, so that the same media requested with
/// different query strings compares equal.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!("{}{}", parsed.origin().ascii_serialization(), parsed.path()),
        Err(_) => url.split('?').next().unwrap_or_default().to_string(),
    }
}

/// Keeps the first URL of every group sharing the same [normalize_url] key.
pub fn dedup_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(Into::into)
        .filter(|url| seen.insert(normalize_url(url)))
        .collect()
}

pub fn is_manifest_url(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split('?').next().unwrap_or_default().to_string(),
    };
    path.to_lowercase().ends_with(".m3u8")
}
