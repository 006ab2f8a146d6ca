use thiserror::Error;

/// Why a task was not accepted. Never surfaced to submitters through
/// `BackgroundWorker::perform`; only logged and counted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },
    #[error("Worker pool is shut down")]
    ShutDown,
}
