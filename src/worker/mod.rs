//! Background task dispatch.
//!
//! `BackgroundWorker` picks one execution mode at construction and keeps it
//! for its lifetime: inline on the caller (`Executor::Immediate`) or on a
//! bounded thread pool (`Executor::Pool`).

pub mod error;
pub mod immediate;
pub mod metrics;
pub mod pool;

pub use error::DispatchError;
pub use immediate::ImmediateExecutor;
pub use metrics::WorkerMetrics;
pub use pool::{DEFAULT_MAX_QUEUE, OverflowPolicy, PoolState, ThreadPoolExecutor};

use crate::LOG_TARGET;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A unit of deferred work. Errors are logged by the pool or returned to the
/// caller in immediate mode.
pub type Task = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub background_worker_threads: usize,
    pub async_disabled: bool,
    pub max_queue: usize,
    #[serde(with = "crate::app::serde_helpers::duration_millis")]
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            background_worker_threads: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
            async_disabled: false,
            max_queue: DEFAULT_MAX_QUEUE,
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub enum Executor {
    Immediate(ImmediateExecutor),
    Pool(ThreadPoolExecutor),
}

#[derive(Debug)]
pub struct BackgroundWorker {
    executor: Executor,
    number_of_threads: usize,
    max_queue: usize,
    shutdown_timeout: Duration,
}

impl BackgroundWorker {
    pub fn new(config: &WorkerConfig) -> Self {
        let number_of_threads = config.background_worker_threads;

        let executor = if config.async_disabled {
            debug!(target: LOG_TARGET, "async delivery is disabled, BackgroundWorker runs tasks inline");
            Executor::Immediate(ImmediateExecutor::new())
        } else if number_of_threads == 0 {
            debug!(
                target: LOG_TARGET,
                "background_worker_threads is set to 0, all events will be sent synchronously"
            );
            Executor::Immediate(ImmediateExecutor::new())
        } else {
            debug!(
                target: LOG_TARGET,
                "initialized a background worker with {} threads", number_of_threads
            );
            Executor::Pool(ThreadPoolExecutor::new(number_of_threads, config.max_queue))
        };

        Self {
            executor,
            number_of_threads,
            max_queue: config.max_queue,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// Submits `task` without waiting for it.
    ///
    /// In pooled mode this always returns `Ok`: discarded tasks are logged and
    /// task failures are handled on the worker thread. In immediate mode the
    /// task has already run when this returns, and its error is returned here.
    pub fn perform<F>(&self, task: F) -> anyhow::Result<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        match &self.executor {
            Executor::Immediate(executor) => executor.post(Box::new(task)),
            Executor::Pool(pool) => {
                if let Err(reason) = pool.post(Box::new(task)) {
                    warn!(target: LOG_TARGET, reason = %reason, "background task discarded");
                }
                Ok(())
            }
        }
    }

    /// Waits up to the shutdown timeout for pending work. No-op in immediate
    /// mode and on repeated calls.
    pub fn shutdown(&self) {
        if let Executor::Pool(pool) = &self.executor {
            pool.shutdown(self.shutdown_timeout);
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self.executor, Executor::Pool(_))
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn number_of_threads(&self) -> usize {
        self.number_of_threads
    }

    pub fn max_queue(&self) -> usize {
        self.max_queue
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn state(&self) -> Option<PoolState> {
        match &self.executor {
            Executor::Pool(pool) => Some(pool.state()),
            Executor::Immediate(_) => None,
        }
    }

    pub fn metrics(&self) -> Option<WorkerMetrics> {
        match &self.executor {
            Executor::Pool(pool) => Some(pool.metrics()),
            Executor::Immediate(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threads: usize, async_disabled: bool) -> WorkerConfig {
        WorkerConfig {
            background_worker_threads: threads,
            async_disabled,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert!(config.background_worker_threads >= 1);
        assert_eq!(config.max_queue, 30);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_mode_selection() {
        assert!(BackgroundWorker::new(&config(4, false)).is_async());
        assert!(!BackgroundWorker::new(&config(0, false)).is_async());
        assert!(!BackgroundWorker::new(&config(4, true)).is_async());
    }

    #[test]
    fn test_immediate_mode_has_no_pool_state() {
        let worker = BackgroundWorker::new(&config(0, false));
        assert!(worker.state().is_none());
        assert!(worker.metrics().is_none());
        worker.shutdown();
        worker.shutdown();
    }

    #[test]
    fn test_pool_shutdown_is_idempotent() {
        let worker = BackgroundWorker::new(&config(2, false));
        worker.perform(|| Ok(())).unwrap();
        worker.shutdown();
        worker.shutdown();
        assert_eq!(worker.state(), Some(PoolState::Terminated));
    }
}
