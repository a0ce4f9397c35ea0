/// Volatile task ledger
///
/// Holds every [`Task`] record for the lifetime of the process. The ledger is
/// the single source of truth for task state: the API, the scheduler and the
/// task processor all read and mutate tasks through the [`TaskStore`] trait.
///
/// ## Usage
///
/// ```rust,ignore
/// use zipbox::ledger::{MemoryLedger, Task, TaskStore};
///
/// let ledger = MemoryLedger::new();
/// ledger.create(Task::new("task-1", vec![])).await?;
/// let task = ledger.get("task-1").await?;
/// ```

pub mod error;
pub mod models;
pub mod store;

pub use error::{LedgerError, Result};
pub use models::{FileError, Task, TaskStatus};
pub use store::{MemoryLedger, TaskStore};
