//! Archive builder
//!
//! Streams a task's sources, in order, into one zip container. Every source is
//! isolated: a failed download, entry or copy is recorded in the
//! [`ArchiveReport`] and the builder moves on to the next source, so the final
//! archive holds exactly the sources that succeeded.
//!
//! Network reads stay on the runtime; compression and disk writes happen in
//! [`writer`] on the blocking pool.

mod naming;
mod writer;

pub use naming::{entry_name, unique_name};
pub use writer::ArchiveSink;

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Response;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::humanize::ByteSize;
use crate::ledger::FileError;
use crate::worker::http::{DownloadError, HttpFetcher};
use writer::ZipSink;

/// Why a single source was skipped
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("create archive entry failed: {0}")]
    CreateEntry(String),

    #[error("copy to archive failed: {0}")]
    Copy(String),
}

/// Failure of the container itself
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to finalize archive: {0}")]
    Finish(#[from] zip::result::ZipError),

    #[error("failed to flush archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive writer crashed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}

/// Outcome of one archive run
#[derive(Debug, Default, Clone)]
pub struct ArchiveReport {
    /// Entry names, in archive order
    pub entries: Vec<String>,
    /// One entry per skipped source, in input order
    pub failures: Vec<FileError>,
}

impl ArchiveReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    fetcher: HttpFetcher,
    pacing: Duration,
    max_file_bytes: Option<ByteSize>,
}

impl ArchiveBuilder {
    pub fn new(fetcher: HttpFetcher, config: &FetchConfig) -> Self {
        Self {
            fetcher,
            pacing: Duration::from_millis(config.pacing_delay_ms),
            max_file_bytes: config.max_file_bytes,
        }
    }

    /// Download `urls` in order into a zip written to `sink`
    ///
    /// Per-source failures end up in the report; only finalizing the
    /// container can fail the whole run.
    pub async fn build<W: ArchiveSink>(
        &self,
        urls: &[String],
        sink: W,
    ) -> Result<ArchiveReport, ArchiveError> {
        let zip = ZipSink::spawn(sink);

        let mut report = ArchiveReport::default();
        let mut used = HashSet::new();

        for (index, url) in urls.iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            match self.add_entry(&zip, url, index, &used).await {
                Ok(name) => {
                    debug!(url, entry = %name, "Entry archived");
                    used.insert(name.clone());
                    report.entries.push(name);
                }
                Err(e) => {
                    warn!(url, error = %e, "Source skipped");
                    report.failures.push(FileError::new(url.as_str(), e.to_string()));
                }
            }
        }

        zip.finish().await?;

        info!(
            entries = report.entries.len(),
            failures = report.failures.len(),
            "Archive finalized"
        );

        Ok(report)
    }

    async fn add_entry(
        &self,
        zip: &ZipSink,
        url: &str,
        index: usize,
        used: &HashSet<String>,
    ) -> Result<String, EntryError> {
        let mut response = self.fetcher.open(url).await?;

        let name = unique_name(entry_name(url, index), index, used);
        zip.start_entry(&name).await?;

        if let Err(e) = self.copy_body(&mut response, zip).await {
            zip.abort_entry().await;
            return Err(e);
        }
        zip.end_entry().await?;

        Ok(name)
    }

    async fn copy_body(
        &self,
        response: &mut Response,
        zip: &ZipSink,
    ) -> Result<u64, EntryError> {
        let mut written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| EntryError::Copy(e.to_string()))?
        {
            written += chunk.len() as u64;
            if let Some(limit) = self.max_file_bytes {
                if written > limit.as_u64() {
                    return Err(EntryError::Copy(format!(
                        "file exceeds {} limit",
                        limit.to_human_readable()
                    )));
                }
            }

            zip.write(chunk).await?;
        }

        Ok(written)
    }
}
