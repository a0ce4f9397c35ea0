use std::sync::Arc;

use thiserror::Error;

use crate::archive::ArchiveBuilder;
use crate::config::Config;
use crate::gate::ReadinessGate;
use crate::ledger::{MemoryLedger, TaskStore};
use crate::observability::Metrics;
use crate::scheduler::Scheduler;
use crate::storage::{ArchiveStorage, StorageError};
use crate::worker::{DownloadError, HttpFetcher, TaskProcessor};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open archive storage: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to build http client: {0}")]
    Http(#[from] DownloadError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TaskStore>,
    pub gate: Arc<ReadinessGate>,
    pub storage: ArchiveStorage,
    pub scheduler: Arc<Scheduler>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire the ledger, gate, processor and scheduler together
    pub fn new(config: Config) -> Result<Self, StateError> {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryLedger::new());
        let gate = Arc::new(ReadinessGate::new());
        let metrics = Arc::new(Metrics::new());
        let storage = ArchiveStorage::open(&config.archive.dir)?;

        let builder = ArchiveBuilder::new(HttpFetcher::new(&config.fetch)?, &config.fetch);
        let processor = TaskProcessor::new(
            store.clone(),
            gate.clone(),
            builder,
            storage.clone(),
            metrics.clone(),
            config.archive.clone(),
            &config.scheduler,
        );
        let scheduler = Arc::new(Scheduler::new(Arc::new(processor), &config.scheduler));

        Ok(Self {
            config: Arc::new(config),
            store,
            gate,
            storage,
            scheduler,
            metrics,
        })
    }
}
