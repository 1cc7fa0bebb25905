//! Ordered job queue that delivers a session's notifications.
//!
//! Each [`crate::TrackerSession`] owns one [`DispatchContext`]. Decoded
//! samples are posted as jobs and run strictly in post order, either by a
//! background tokio task ([`DispatchContext::spawn`]) or by whoever calls
//! [`DispatchContext::run_pending`] ([`DispatchContext::manual`]).
//!
//! [`DispatchContext::cancel_pending`] drops every queued job. Jobs carry the
//! generation they were posted in, so a job the worker already dequeued is
//! still skipped if a cancel lands before it runs.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default backlog size above which posting logs a warning.
pub const DEFAULT_BACKLOG_WARN_THRESHOLD: usize = 256;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queued {
    generation: u64,
    job: Job,
}

struct Shared {
    queue: Mutex<VecDeque<Queued>>,
    generation: AtomicU64,
    notify: Notify,
    backlog_warn_threshold: AtomicUsize,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<Queued>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run queued jobs until the queue is empty. Returns how many ran.
    fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            // The lock is released before the job runs so jobs may post or
            // cancel on this same context.
            let Some(queued) = self.queue().pop_front() else {
                break;
            };
            if queued.generation != self.generation.load(Ordering::Acquire) {
                debug!("Skipping job from cancelled generation {}", queued.generation);
                continue;
            }
            (queued.job)();
            ran += 1;
        }
        ran
    }
}

struct Worker {
    cancel: CancellationToken,
}

/// An ordered, cancellable job queue.
pub struct DispatchContext {
    shared: Arc<Shared>,
    worker: Option<Worker>,
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("pending", &self.pending())
            .field("generation", &self.generation())
            .field("spawned", &self.worker.is_some())
            .finish()
    }
}

impl DispatchContext {
    fn new_shared() -> Arc<Shared> {
        Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            generation: AtomicU64::new(0),
            notify: Notify::new(),
            backlog_warn_threshold: AtomicUsize::new(DEFAULT_BACKLOG_WARN_THRESHOLD),
        })
    }

    /// A context that only runs jobs when [`run_pending`](Self::run_pending) is called.
    pub fn manual() -> Self {
        Self {
            shared: Self::new_shared(),
            worker: None,
        }
    }

    /// A context drained by a background task on the given runtime.
    ///
    /// The task stops when the context is dropped.
    pub fn spawn(runtime: &Handle) -> Self {
        let shared = Self::new_shared();
        let cancel = CancellationToken::new();

        let task_shared = Arc::clone(&shared);
        let task_token = cancel.clone();
        runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!("Dispatch worker cancelled, stopping");
                        break;
                    }
                    _ = task_shared.notify.notified() => {
                        task_shared.drain();
                    }
                }
            }
        });

        Self {
            shared,
            worker: Some(Worker { cancel }),
        }
    }

    /// Set the backlog size above which [`post`](Self::post) logs a warning.
    #[must_use]
    pub fn backlog_warn_threshold(self, threshold: usize) -> Self {
        self.shared
            .backlog_warn_threshold
            .store(threshold, Ordering::Relaxed);
        self
    }

    /// Backlog size above which [`post`](Self::post) logs a warning.
    pub fn backlog_threshold(&self) -> usize {
        self.shared.backlog_warn_threshold.load(Ordering::Relaxed)
    }

    /// Queue a job behind every job posted before it.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        let backlog = {
            let mut queue = self.shared.queue();
            queue.push_back(Queued {
                generation: self.shared.generation.load(Ordering::Acquire),
                job: Box::new(job),
            });
            queue.len()
        };
        let threshold = self.shared.backlog_warn_threshold.load(Ordering::Relaxed);
        if backlog > threshold {
            warn!("Dispatch backlog at {} jobs (threshold {})", backlog, threshold);
        }
        self.shared.notify.notify_one();
    }

    /// Drop every queued job and invalidate jobs already dequeued.
    ///
    /// Returns the number of queued jobs dropped.
    pub fn cancel_pending(&self) -> usize {
        let mut queue = self.shared.queue();
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    /// Run queued jobs on the calling thread. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        self.shared.drain()
    }

    /// Number of queued jobs.
    pub fn pending(&self) -> usize {
        self.shared.queue().len()
    }

    /// Current generation; bumped by every [`cancel_pending`](Self::cancel_pending).
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }
}

impl Drop for DispatchContext {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel.cancel();
        }
    }
}
