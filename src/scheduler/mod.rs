//! Background task runner
//!
//! One dedicated thread runs delayed and fixed rate callbacks in order of
//! their due time. New work wakes the thread through a crossbeam channel;
//! while idle it polls at the configured interval.
//!
//! A panicking callback is caught and logged, and a repeating task keeps
//! its schedule. Dropping the scheduler stops the thread: tasks that are due
//! but not yet started are abandoned.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error};

/// Handle returned by `schedule`, used to cancel a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

type Callback = Box<dyn FnMut() + Send>;

struct ScheduledTask {
    id: TimerId,
    at: Instant,
    /// Zero for one shot tasks
    interval: Duration,
    callback: Callback,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.at.cmp(&other.at).then(self.id.cmp(&other.id))
    }
}

/// The task currently executing on the worker thread
struct Running {
    id: TimerId,
    repeating: bool,
    cancelled: bool,
}

#[derive(Default)]
struct Queue {
    /// Earliest due task on top
    heap: BinaryHeap<Reverse<ScheduledTask>>,
    running: Option<Running>,
}

struct Shared {
    queue: Mutex<Queue>,
    stop: AtomicBool,
    next_id: AtomicU64,
    runs: AtomicU64,
}

pub struct ThreadScheduler {
    shared: Arc<Shared>,
    wake: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadScheduler {
    /// Default idle poll interval of the worker thread
    pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new() -> Self {
        Self::with_idle_interval(Self::DEFAULT_IDLE_INTERVAL)
    }

    pub fn with_idle_interval(idle: Duration) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            stop: AtomicBool::new(false),
            next_id: AtomicU64::new(0),
            runs: AtomicU64::new(0),
        });
        let (wake, signal) = bounded(1);
        let worker_shared = shared.clone();
        let idle = idle.max(Duration::from_micros(100));
        let worker = thread::spawn(move || run_worker(worker_shared, signal, idle));

        Self {
            shared,
            wake,
            worker: Some(worker),
        }
    }

    /// Run `callback` once after `delay`
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnMut() + Send + 'static,
    {
        self.schedule_at_fixed_rate(delay, Duration::ZERO, callback)
    }

    /// Run `callback` after `initial_delay`, then every `interval`
    ///
    /// A zero interval schedules a one shot task.
    pub fn schedule_at_fixed_rate<F>(
        &self,
        initial_delay: Duration,
        interval: Duration,
        callback: F,
    ) -> TimerId
    where
        F: FnMut() + Send + 'static,
    {
        let id = TimerId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let task = ScheduledTask {
            id,
            at: Instant::now() + initial_delay,
            interval,
            callback: Box::new(callback),
        };
        self.shared.queue.lock().heap.push(Reverse(task));
        // A full channel already carries a pending wake-up
        let _ = self.wake.try_send(());
        id
    }

    /// Cancel a pending task, or stop a running repeating task from being
    /// rescheduled
    ///
    /// Returns false for unknown ids and for one shot tasks that already
    /// started. Safe to call from inside a callback.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut queue = self.shared.queue.lock();
        let before = queue.heap.len();
        queue.heap.retain(|task| task.0.id != id);
        if queue.heap.len() != before {
            return true;
        }
        match queue.running.as_mut() {
            Some(running) if running.id == id && running.repeating && !running.cancelled => {
                running.cancelled = true;
                true
            }
            _ => false,
        }
    }

    /// Number of tasks waiting for their due time
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().heap.len()
    }

    /// Number of callbacks executed so far
    pub fn runs(&self) -> u64 {
        self.shared.runs.load(Ordering::Relaxed)
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        let _ = self.wake.try_send(());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Scheduler thread terminated abnormally");
            }
        }
    }
}

/// Take the next due task and mark it running, or report how long to wait
fn next_due(shared: &Shared, now: Instant) -> Result<ScheduledTask, Option<Duration>> {
    let mut queue = shared.queue.lock();
    let due = queue.heap.peek().map(|task| task.0.at);
    match due {
        Some(at) if at <= now => match queue.heap.pop() {
            Some(Reverse(task)) => {
                queue.running = Some(Running {
                    id: task.id,
                    repeating: !task.interval.is_zero(),
                    cancelled: false,
                });
                Ok(task)
            }
            None => Err(None),
        },
        Some(at) => Err(Some(at - now)),
        None => Err(None),
    }
}

fn run_worker(shared: Arc<Shared>, signal: Receiver<()>, idle: Duration) {
    debug!("Scheduler thread started");
    while !shared.stop.load(Ordering::Acquire) {
        let mut task = match next_due(&shared, Instant::now()) {
            Ok(task) => task,
            Err(wait) => {
                let wait = wait.map_or(idle, |w| w.min(idle));
                match signal.recv_timeout(wait) {
                    Ok(()) | Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        };

        if catch_unwind(AssertUnwindSafe(|| (task.callback)())).is_err() {
            error!("Scheduled task {} panicked", task.id);
        }
        shared.runs.fetch_add(1, Ordering::Relaxed);

        let mut queue = shared.queue.lock();
        let cancelled = queue.running.take().is_some_and(|r| r.cancelled);
        if !task.interval.is_zero() && !cancelled && !shared.stop.load(Ordering::Acquire) {
            task.at += task.interval;
            queue.heap.push(Reverse(task));
        }
    }
    debug!("Scheduler thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        (count, move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_one_shot_runs_once() {
        let scheduler = ThreadScheduler::new();
        let (count, callback) = counter();
        scheduler.schedule(Duration::from_millis(50), callback);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_fixed_rate_until_cancelled() {
        let scheduler = ThreadScheduler::new();
        let (count, callback) = counter();
        let id = scheduler.schedule_at_fixed_rate(Duration::ZERO, Duration::from_millis(10), callback);

        thread::sleep(Duration::from_millis(55));
        assert!(scheduler.cancel(id));
        let runs = count.load(Ordering::SeqCst);
        assert!((4..=7).contains(&runs), "ran {} times", runs);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), runs);
    }

    #[test]
    fn test_cancel_before_due() {
        let scheduler = ThreadScheduler::new();
        let (count, callback) = counter();
        let id = scheduler.schedule(Duration::from_millis(30), callback);

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_fired_or_unknown() {
        let scheduler = ThreadScheduler::new();
        let (count, callback) = counter();
        let id = scheduler.schedule(Duration::ZERO, callback);
        thread::sleep(Duration::from_millis(30));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.cancel(id));
        assert!(!scheduler.cancel(TimerId(9999)));
    }

    #[test]
    fn test_cancel_from_inside_callback() {
        let scheduler = Arc::new(ThreadScheduler::new());
        let count = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(Mutex::new(None::<TimerId>));

        let weak = Arc::downgrade(&scheduler);
        let seen = count.clone();
        let slot = own_id.clone();
        let id = scheduler.schedule_at_fixed_rate(
            Duration::from_millis(5),
            Duration::from_millis(5),
            move || {
                seen.fetch_add(1, Ordering::SeqCst);
                let id = *slot.lock();
                if let (Some(scheduler), Some(id)) = (weak.upgrade(), id) {
                    scheduler.cancel(id);
                }
            },
        );
        *own_id.lock() = Some(id);

        thread::sleep(Duration::from_millis(80));
        assert!(count.load(Ordering::SeqCst) <= 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_panicking_task_keeps_schedule() {
        let scheduler = ThreadScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        scheduler.schedule_at_fixed_rate(Duration::ZERO, Duration::from_millis(5), move || {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                panic!("first run fails");
            }
        });
        let (other, callback) = counter();
        scheduler.schedule(Duration::from_millis(10), callback);

        thread::sleep(Duration::from_millis(60));
        assert!(count.load(Ordering::SeqCst) >= 2);
        assert_eq!(other.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_runs_in_due_order() {
        let scheduler = ThreadScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (tag, delay) in [(3, 30u64), (1, 10), (2, 20)] {
            let order = order.clone();
            scheduler.schedule(Duration::from_millis(delay), move || order.lock().push(tag));
        }

        thread::sleep(Duration::from_millis(80));
        assert_eq!(*order.lock(), vec![1, 2, 3]);
        assert_eq!(scheduler.runs(), 3);
    }

    #[test]
    fn test_drop_joins_worker() {
        let (count, callback) = counter();
        {
            let scheduler = ThreadScheduler::new();
            scheduler.schedule(Duration::from_secs(10), callback);
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
