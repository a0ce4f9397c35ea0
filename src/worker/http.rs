//! HTTP client for fetching archive sources

use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::FetchConfig;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{0}")]
    RequestFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DownloadError::Timeout
        } else if e.is_redirect() {
            DownloadError::TooManyRedirects
        } else if e.is_builder() {
            DownloadError::InvalidUrl(e.to_string())
        } else {
            DownloadError::RequestFailed(e.to_string())
        }
    }
}

/// HTTP fetcher, one instance shared by all processors
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| DownloadError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }

    /// Send a GET and return the response once its status is a success
    ///
    /// The body is left unread so the caller can stream it.
    pub async fn open(&self, url: &str) -> Result<Response> {
        debug!(url, "Starting download");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_builds_from_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert!(HttpFetcher::new(&config).is_ok());
    }

    #[test]
    fn test_status_error_message() {
        let err = DownloadError::Status {
            code: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }

    #[tokio::test]
    async fn test_open_rejects_malformed_url() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.open("not a url").await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl(_)));
    }
}
