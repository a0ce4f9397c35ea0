//! Archive worker
//!
//! [`TaskProcessor`] claims a pending task, optionally waits on the readiness
//! gate, streams its sources into a zip through [`crate::archive`] and
//! persists the terminal state. [`http::HttpFetcher`] is the network side.

pub mod http;
pub mod runner;

pub use http::{DownloadError, HttpFetcher};
pub use runner::TaskProcessor;
