// Wed Jul 29 2026 - Alex

use crate::engine::queue::WorkStealingQueue;
use log::debug;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct PoolShared {
    queues: Vec<WorkStealingQueue<Task>>,
    stop: AtomicBool,
    active: AtomicUsize,
    next_queue: AtomicUsize,
    sleep_lock: Mutex<()>,
    wake: Condvar,
}

impl PoolShared {
    fn any_queue_nonempty(&self) -> bool {
        self.queues.iter().any(|q| !q.is_empty())
    }
}

/// Fixed-size pool of workers, one task deque per worker.
///
/// Submissions are spread round-robin across the deques. An idle worker
/// first drains its own queue, then tries to steal the oldest task from
/// every other queue, and only then parks on the condition variable.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let shared = Arc::new(PoolShared {
            queues: (0..worker_count).map(|_| WorkStealingQueue::new()).collect(),
            stop: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            next_queue: AtomicUsize::new(0),
            sleep_lock: Mutex::new(()),
            wake: Condvar::new(),
        });

        let workers = (0..worker_count)
            .map(|id| {
                let shared = shared.clone();
                thread::spawn(move || worker_loop(shared, id))
            })
            .collect();

        debug!("worker pool started with {} workers", worker_count);
        Self { shared, workers }
    }

    /// The process-wide pool, created on first use and sized to the
    /// hardware parallelism. Lives until process exit.
    pub fn global() -> &'static WorkerPool {
        static POOL: OnceLock<WorkerPool> = OnceLock::new();
        POOL.get_or_init(|| {
            let workers = thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            WorkerPool::new(workers)
        })
    }

    pub fn worker_count(&self) -> usize {
        self.shared.queues.len()
    }

    /// Queue a task on the next deque in round-robin order and wake a
    /// worker. When every worker is already busy all of them are notified,
    /// so whichever frees up first sees the new task.
    pub fn submit(&self, task: Task) {
        assert!(
            !self.shared.stop.load(Ordering::SeqCst),
            "submit on stopped worker pool"
        );

        let count = self.shared.queues.len();
        let idx = self.shared.next_queue.fetch_add(1, Ordering::Relaxed) % count;
        self.shared.queues[idx].push(task);

        // Taking the sleep lock orders this notify after any in-progress
        // predicate check, so the wakeup cannot be missed.
        let _guard = self.shared.sleep_lock.lock();
        if self.shared.active.load(Ordering::SeqCst) < count {
            self.shared.wake.notify_one();
        } else {
            self.shared.wake.notify_all();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        {
            let _guard = self.shared.sleep_lock.lock();
        }
        self.shared.wake.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("worker pool stopped");
    }
}

fn worker_loop(shared: Arc<PoolShared>, id: usize) {
    let count = shared.queues.len();

    while !shared.stop.load(Ordering::SeqCst) {
        shared.active.fetch_add(1, Ordering::SeqCst);
        let task = shared.queues[id].pop().or_else(|| {
            (0..count)
                .filter(|&other| other != id)
                .find_map(|other| shared.queues[other].steal())
        });
        shared.active.fetch_sub(1, Ordering::SeqCst);

        match task {
            Some(task) => task(),
            None => {
                let mut guard = shared.sleep_lock.lock();
                shared
                    .wake
                    .wait_while(&mut guard, |_| {
                        !shared.stop.load(Ordering::SeqCst) && !shared.any_queue_nonempty()
                    });
            }
        }
    }
}
