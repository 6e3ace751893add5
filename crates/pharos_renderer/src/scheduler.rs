//! Work-stealing task pool with joinable handles.
//!
//! Render tasks block on tasks they submitted to the same pool (a pixel
//! waits for its shadow rays, a mirror for its reflection). A fixed pool of
//! blocking threads would deadlock once every worker is waiting, so a worker
//! that joins a handle keeps running queued jobs until the result arrives.
//! Intersection tasks never block, which guarantees every join eventually
//! completes.

use crate::error::{RenderError, Result};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Worker stack size. Helping while blocked nests tasks on one stack.
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// How long an idle helper sleeps before looking for work again.
const IDLE_BACKOFF: Duration = Duration::from_micros(200);

/// Shared worker pool for one render.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    outstanding: Arc<AtomicUsize>,
}

impl Scheduler {
    /// A pool with `threads` workers; 0 uses the available parallelism.
    pub fn new(threads: usize) -> Result<Self> {
        let available = thread::available_parallelism().map_or(1, |n| n.get());
        if threads > available {
            log::warn!("Requested {threads} worker threads but only {available} cores are available");
        }
        let threads = if threads == 0 { available } else { threads };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("pharos-worker-{i}"))
            .stack_size(WORKER_STACK_SIZE)
            .build()
            .map_err(|e| RenderError::InvalidConfig(format!("cannot start worker pool: {e}")))?;

        log::debug!("Started worker pool with {} threads", pool.current_num_threads());
        Ok(Self {
            pool,
            outstanding: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Tasks submitted but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Queue `task` on the pool. A panic inside it is captured and reported
    /// by [`TaskHandle::join`].
    pub fn spawn<T, F>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let slot = Arc::new(Slot {
            result: Mutex::new(None),
            ready: Condvar::new(),
        });
        let handle = TaskHandle { slot: slot.clone() };

        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let outstanding = self.outstanding.clone();
        self.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task));
            // Counted as finished before anyone can observe the result
            outstanding.fetch_sub(1, Ordering::AcqRel);
            let mut guard = slot.result.lock();
            *guard = Some(result);
            slot.ready.notify_all();
        });
        handle
    }
}

struct Slot<T> {
    result: Mutex<Option<thread::Result<T>>>,
    ready: Condvar,
}

/// The pending result of a spawned task.
pub struct TaskHandle<T> {
    slot: Arc<Slot<T>>,
}

impl<T> TaskHandle<T> {
    pub fn is_ready(&self) -> bool {
        self.slot.result.lock().is_some()
    }

    /// Block for at most `timeout`. Returns whether the result is in.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.slot.result.lock();
        if guard.is_none() {
            self.slot.ready.wait_for(&mut guard, timeout);
        }
        guard.is_some()
    }

    /// Wait for the task and take its result.
    ///
    /// On a worker thread this runs other queued jobs while waiting; off the
    /// pool it simply blocks.
    pub fn join(self) -> Result<T> {
        loop {
            if let Some(result) = self.slot.result.lock().take() {
                return result.map_err(|payload| RenderError::TaskPanicked(panic_message(payload)));
            }

            match rayon::yield_now() {
                Some(rayon::Yield::Executed) => {}
                Some(rayon::Yield::Idle) => {
                    self.wait_timeout(IDLE_BACKOFF);
                }
                None => {
                    let mut guard = self.slot.result.lock();
                    while guard.is_none() {
                        self.slot.ready.wait(&mut guard);
                    }
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
