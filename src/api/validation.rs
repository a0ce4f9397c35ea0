use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("a task accepts at most {0} files")]
    TooManyFiles(usize),
    #[error("'{0}' is not an http/https url")]
    InvalidUrl(String),
}

/// Check a single source location
pub fn validate_url(url: &str) -> Result<(), UrlValidationError> {
    let invalid = || UrlValidationError::InvalidUrl(url.to_string());
    let parsed = Url::parse(url).map_err(|_| invalid())?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }

    Ok(())
}

/// Check a full source list against the per-task limit
pub fn validate_urls(urls: &[String], max_files: usize) -> Result<(), UrlValidationError> {
    if urls.len() > max_files {
        return Err(UrlValidationError::TooManyFiles(max_files));
    }

    urls.iter().try_for_each(|url| validate_url(url))
}
