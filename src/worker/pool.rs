//! Bounded worker-thread pool.
//!
//! Threads are spawned lazily, up to `max_threads`, and live until shutdown.
//! Pending tasks wait in a FIFO queue that never holds more than `capacity`
//! entries; anything submitted past that is discarded.

use super::Task;
use super::error::DispatchError;
use super::metrics::{WorkerCounters, WorkerMetrics};
use crate::LOG_TARGET;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

pub const DEFAULT_MAX_QUEUE: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Idle,
    Running,
    ShuttingDown,
    Terminated,
}

impl PoolState {
    fn accepts_work(self) -> bool {
        matches!(self, PoolState::Idle | PoolState::Running)
    }
}

/// What happens to a task submitted while the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the newest task
    #[default]
    Discard,
}

struct PoolInner {
    queue: VecDeque<Task>,
    state: PoolState,
    threads: usize,
    idle: usize,
    active: usize,
    spawned: usize,
}

struct Shared {
    inner: Mutex<PoolInner>,
    work_ready: Condvar,
    worker_exited: Condvar,
    counters: WorkerCounters,
    max_threads: usize,
    capacity: usize,
}

pub struct ThreadPoolExecutor {
    shared: Arc<Shared>,
    overflow_policy: OverflowPolicy,
}

impl ThreadPoolExecutor {
    /// `max_threads` and `capacity` are clamped to at least 1.
    pub fn new(max_threads: usize, capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(PoolInner {
                    queue: VecDeque::with_capacity(capacity.max(1)),
                    state: PoolState::Idle,
                    threads: 0,
                    idle: 0,
                    active: 0,
                    spawned: 0,
                }),
                work_ready: Condvar::new(),
                worker_exited: Condvar::new(),
                counters: WorkerCounters::default(),
                max_threads: max_threads.max(1),
                capacity: capacity.max(1),
            }),
            overflow_policy: OverflowPolicy::Discard,
        }
    }

    pub fn max_threads(&self) -> usize {
        self.shared.max_threads
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    pub fn state(&self) -> PoolState {
        self.shared.inner.lock().state
    }

    /// Enqueues without blocking. A rejected task is dropped before returning.
    pub fn post(&self, task: Task) -> Result<(), DispatchError> {
        let counters = &self.shared.counters;
        let mut inner = self.shared.inner.lock();

        if !inner.state.accepts_work() {
            drop(inner);
            WorkerCounters::incr(&counters.dropped);
            return Err(DispatchError::ShutDown);
        }

        if inner.queue.len() >= self.shared.capacity {
            drop(inner);
            WorkerCounters::incr(&counters.dropped);
            return match self.overflow_policy {
                OverflowPolicy::Discard => Err(DispatchError::QueueFull {
                    capacity: self.shared.capacity,
                }),
            };
        }

        inner.state = PoolState::Running;
        inner.queue.push_back(task);
        WorkerCounters::incr(&counters.submitted);

        if inner.idle < inner.queue.len() && inner.threads < self.shared.max_threads {
            self.spawn_worker(&mut inner);
        }
        drop(inner);

        self.shared.work_ready.notify_one();
        Ok(())
    }

    fn spawn_worker(&self, inner: &mut PoolInner) {
        let worker_id = inner.spawned;
        let shared = Arc::clone(&self.shared);

        let spawned = thread::Builder::new()
            .name(format!("sentry-worker-{worker_id}"))
            .spawn(move || worker_loop(&shared, worker_id));

        match spawned {
            Ok(_) => {
                inner.threads += 1;
                inner.spawned += 1;
                debug!(target: LOG_TARGET, worker_id, threads = inner.threads, "spawned background worker thread");
            }
            Err(e) => {
                error!(target: LOG_TARGET, error = %e, "failed to spawn background worker thread");
            }
        }
    }

    /// Stops accepting work and waits up to `timeout` for queued and running
    /// tasks. Whatever is still queued at the deadline is dropped; threads
    /// still busy are detached and exit after their current task.
    ///
    /// Returns `true` when every worker exited before the deadline. Calls after
    /// the first return immediately.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.inner.lock();

        if !inner.state.accepts_work() {
            return inner.threads == 0;
        }

        inner.state = PoolState::ShuttingDown;
        self.shared.work_ready.notify_all();

        while inner.threads > 0 {
            if self
                .shared
                .worker_exited
                .wait_until(&mut inner, deadline)
                .timed_out()
            {
                break;
            }
        }

        let abandoned: Vec<Task> = inner.queue.drain(..).collect();
        let detached = inner.threads;
        inner.state = PoolState::Terminated;
        drop(inner);

        let abandoned_count = abandoned.len();
        drop(abandoned);
        WorkerCounters::add(&self.shared.counters.abandoned, abandoned_count as u64);

        if abandoned_count > 0 || detached > 0 {
            warn!(
                target: LOG_TARGET,
                abandoned = abandoned_count,
                detached_workers = detached,
                "background worker shutdown timed out after {:?}",
                timeout
            );
            false
        } else {
            debug!(target: LOG_TARGET, "background worker shut down");
            true
        }
    }

    pub fn metrics(&self) -> WorkerMetrics {
        let (queue_len, threads, active) = {
            let inner = self.shared.inner.lock();
            (inner.queue.len(), inner.threads, inner.active)
        };
        let counters = &self.shared.counters;

        WorkerMetrics {
            capacity: self.shared.capacity,
            queue_len,
            threads,
            active,
            submitted: WorkerCounters::load(&counters.submitted),
            completed: WorkerCounters::load(&counters.completed),
            failed: WorkerCounters::load(&counters.failed),
            dropped: WorkerCounters::load(&counters.dropped),
            abandoned: WorkerCounters::load(&counters.abandoned),
        }
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        if inner.state.accepts_work() {
            inner.state = PoolState::ShuttingDown;
            drop(inner);
            self.shared.work_ready.notify_all();
        }
    }
}

impl std::fmt::Debug for ThreadPoolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolExecutor")
            .field("max_threads", &self.shared.max_threads)
            .field("capacity", &self.shared.capacity)
            .field("overflow_policy", &self.overflow_policy)
            .field("state", &self.state())
            .finish()
    }
}

fn worker_loop(shared: &Shared, worker_id: usize) {
    loop {
        let task = {
            let mut inner = shared.inner.lock();
            loop {
                if let Some(task) = inner.queue.pop_front() {
                    inner.active += 1;
                    break Some(task);
                }
                if !inner.state.accepts_work() {
                    break None;
                }
                inner.idle += 1;
                shared.work_ready.wait(&mut inner);
                inner.idle -= 1;
            }
        };

        let Some(task) = task else {
            let mut inner = shared.inner.lock();
            inner.threads -= 1;
            drop(inner);
            shared.worker_exited.notify_all();
            debug!(target: LOG_TARGET, worker_id, "background worker thread exiting");
            return;
        };

        run_task(shared, worker_id, task);
        shared.inner.lock().active -= 1;
    }
}

fn run_task(shared: &Shared, worker_id: usize, task: Task) {
    let counters = &shared.counters;
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(())) => WorkerCounters::incr(&counters.completed),
        Ok(Err(e)) => {
            WorkerCounters::incr(&counters.failed);
            let message = format!("{e:#}");
            warn!(target: LOG_TARGET, worker_id, error = %message, "background task failed");
        }
        Err(payload) => {
            WorkerCounters::incr(&counters.failed);
            error!(
                target: LOG_TARGET,
                worker_id,
                panic = panic_message(&*payload),
                "background task panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_starts_idle_without_threads() {
        let pool = ThreadPoolExecutor::new(4, DEFAULT_MAX_QUEUE);
        let metrics = pool.metrics();

        assert_eq!(pool.state(), PoolState::Idle);
        assert_eq!(metrics.threads, 0);
        assert_eq!(metrics.capacity, 30);
        assert_eq!(pool.overflow_policy(), OverflowPolicy::Discard);
    }

    #[test]
    fn test_runs_tasks_and_shuts_down() {
        let pool = ThreadPoolExecutor::new(2, 10);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            pool.post(counting_task(&counter)).unwrap();
        }
        assert_eq!(pool.state(), PoolState::Running);

        assert!(pool.shutdown(Duration::from_secs(5)));
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(pool.state(), PoolState::Terminated);
        assert_eq!(pool.metrics().threads, 0);
        assert_eq!(pool.metrics().completed, 5);
    }

    #[test]
    fn test_threads_never_exceed_max() {
        let pool = ThreadPoolExecutor::new(2, 30);
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));

        for _ in 0..10 {
            let rx = Arc::clone(&release_rx);
            pool.post(Box::new(move || {
                let _ = rx.lock().recv_timeout(Duration::from_secs(5));
                Ok(())
            }))
            .unwrap();
        }
        assert!(pool.metrics().threads <= 2);

        for _ in 0..10 {
            release_tx.send(()).unwrap();
        }
        assert!(pool.shutdown(Duration::from_secs(5)));
    }

    #[test]
    fn test_failing_and_panicking_tasks_do_not_kill_worker() {
        let pool = ThreadPoolExecutor::new(1, 10);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.post(Box::new(|| Err(anyhow::anyhow!("delivery failed"))))
            .unwrap();
        pool.post(Box::new(|| -> anyhow::Result<()> { panic!("task exploded") }))
            .unwrap();
        pool.post(counting_task(&counter)).unwrap();

        assert!(pool.shutdown(Duration::from_secs(5)));
        let metrics = pool.metrics();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.failed, 2);
        assert_eq!(metrics.completed, 1);
        assert_eq!(metrics.threads, 0);
    }

    #[test]
    fn test_post_after_shutdown_is_rejected() {
        let pool = ThreadPoolExecutor::new(1, 10);
        assert!(pool.shutdown(Duration::from_millis(100)));

        let counter = Arc::new(AtomicUsize::new(0));
        assert_eq!(
            pool.post(counting_task(&counter)),
            Err(DispatchError::ShutDown)
        );
        assert_eq!(pool.metrics().dropped, 1);
        assert!(pool.shutdown(Duration::from_millis(100)));
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*boxed), "static message");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*boxed), "non-string panic payload");
    }
}
