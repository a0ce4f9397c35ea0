use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    #[serde(default = "default_max_files_per_task")]
    pub max_files_per_task: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_payload_bytes: default_max_payload_bytes(),
            max_files_per_task: default_max_files_per_task(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize::mib(1)
}

fn default_max_files_per_task() -> usize {
    1000
}

/// Scheduler and readiness gate configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Delay between scans of the ledger
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on a gate wait before processing proceeds anyway
    #[serde(default = "default_gate_timeout_secs")]
    pub gate_timeout_secs: u64,
    /// Wait for an explicit release before downloading
    #[serde(default)]
    pub await_gate: bool,
    /// Start scanning at boot instead of waiting for the activation call
    #[serde(default)]
    pub autostart: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            gate_timeout_secs: default_gate_timeout_secs(),
            await_gate: false,
            autostart: false,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_gate_timeout_secs() -> u64 {
    60
}

/// Source download configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Pause between two sources of the same task
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
    /// Per-source size cap, unlimited when unset
    #[serde(default)]
    pub max_file_bytes: Option<ByteSize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            pacing_delay_ms: default_pacing_delay_ms(),
            max_file_bytes: None,
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("zipbox/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_pacing_delay_ms() -> u64 {
    100
}

/// Archive output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_dir")]
    pub dir: PathBuf,
    /// Public path prefix of the download endpoint
    #[serde(default = "default_download_prefix")]
    pub download_prefix: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: default_archive_dir(),
            download_prefix: default_download_prefix(),
        }
    }
}

fn default_archive_dir() -> PathBuf {
    std::env::temp_dir().join("zipbox")
}

fn default_download_prefix() -> String {
    "/download/".to_string()
}

impl ArchiveConfig {
    /// Public location of a task's archive
    pub fn download_url(&self, task_id: &str) -> String {
        format!("{}{}", self.download_prefix, task_id)
    }
}
