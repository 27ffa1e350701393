//! Timer collaborator and the debounced, cancellable task handle built on it.

use crate::guarded::GuardedCell;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Work to run when a scheduled task fires.
pub type ScheduledAction = Box<dyn FnOnce() + Send + 'static>;

/// Cancellation handle of a scheduled task.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    /// A fresh, live handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prevent the task from running if it has not fired yet.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs actions after a delay.
pub trait Timer: Send + Sync {
    /// Schedule `action` to run once after `delay`, unless the returned handle is cancelled first.
    fn schedule(&self, delay: Duration, action: ScheduledAction) -> TaskHandle;
}

struct ThreadTask {
    due: Instant,
    handle: TaskHandle,
    action: ScheduledAction,
}

#[derive(Default)]
struct TimerQueue {
    tasks: Vec<ThreadTask>,
    shutdown: bool,
}

#[derive(Default)]
struct TimerWorker {
    queue: Mutex<TimerQueue>,
    wake: Condvar,
}

impl TimerWorker {
    fn run(&self) {
        let mut queue = self.queue.lock();
        loop {
            if queue.shutdown {
                return;
            }
            queue.tasks.retain(|task| !task.handle.is_cancelled());

            let now = Instant::now();
            if let Some(index) = queue.tasks.iter().position(|task| task.due <= now) {
                let task = queue.tasks.swap_remove(index);
                MutexGuard::unlocked(&mut queue, || {
                    if !task.handle.is_cancelled() {
                        (task.action)();
                    }
                });
                continue;
            }

            match queue.tasks.iter().map(|task| task.due).min() {
                Some(deadline) => {
                    self.wake.wait_until(&mut queue, deadline);
                }
                None => self.wake.wait(&mut queue),
            }
        }
    }
}

/// Timer backed by one long-lived worker thread that sleeps until the earliest deadline.
///
/// Cancelled tasks are dropped the next time the worker wakes. Dropping the timer stops the
/// worker; tasks still queued never run.
pub struct ThreadTimer {
    worker: Arc<TimerWorker>,
}

impl std::fmt::Debug for ThreadTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadTimer")
            .field("queued", &self.worker.queue.lock().tasks.len())
            .finish()
    }
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadTimer {
    /// Start the worker thread.
    pub fn new() -> Self {
        let worker = Arc::new(TimerWorker::default());
        let runner = Arc::clone(&worker);
        let spawned = std::thread::Builder::new()
            .name("codeline-timer".into())
            .spawn(move || runner.run());
        if let Err(err) = spawned {
            tracing::error!(%err, "timer thread failed to start");
        }
        Self { worker }
    }
}

impl Timer for ThreadTimer {
    fn schedule(&self, delay: Duration, action: ScheduledAction) -> TaskHandle {
        let handle = TaskHandle::new();
        self.worker.queue.lock().tasks.push(ThreadTask {
            due: Instant::now() + delay,
            handle: handle.clone(),
            action,
        });
        self.worker.wake.notify_one();
        handle
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.worker.queue.lock().shutdown = true;
        self.worker.wake.notify_one();
    }
}

struct ManualTask {
    due: Duration,
    handle: TaskHandle,
    action: ScheduledAction,
}

/// Deterministic timer driven by the caller; tasks run on the thread calling
/// [`advance`](Self::advance) or [`run_pending`](Self::run_pending).
#[derive(Default)]
pub struct ManualTimer {
    now: GuardedCell<Duration>,
    tasks: GuardedCell<Vec<ManualTask>>,
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTimer")
            .field("now", &self.now.get())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl ManualTimer {
    /// A timer at time zero with nothing scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scheduled, not yet cancelled tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|task| !task.handle.is_cancelled())
            .count()
    }

    /// Advance the clock and run every task that became due. Returns how many ran.
    pub fn advance(&self, by: Duration) -> usize {
        let now = self.now.with(|now| {
            *now += by;
            *now
        });
        self.run_where(|task| task.due <= now)
    }

    /// Run every scheduled task regardless of its delay. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        self.run_where(|_| true)
    }

    fn run_where(&self, due: impl Fn(&ManualTask) -> bool) -> usize {
        let ready: Vec<ManualTask> = self.tasks.with(|tasks| {
            tasks.retain(|task| !task.handle.is_cancelled());
            let (ready, waiting) = std::mem::take(tasks).into_iter().partition(|t| due(t));
            *tasks = waiting;
            ready
        });

        let mut ran = 0;
        for task in ready {
            if !task.handle.is_cancelled() {
                (task.action)();
                ran += 1;
            }
        }
        ran
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, action: ScheduledAction) -> TaskHandle {
        let handle = TaskHandle::new();
        let due = self.now.get() + delay;
        self.tasks.lock().push(ManualTask {
            due,
            handle: handle.clone(),
            action,
        });
        handle
    }
}

struct Outstanding {
    handle: TaskHandle,
    fired: Arc<AtomicBool>,
}

impl Outstanding {
    fn is_live(&self) -> bool {
        !self.handle.is_cancelled() && !self.fired.load(Ordering::SeqCst)
    }
}

/// A single re-armable delayed task: arming cancels the outstanding one first.
pub struct Debouncer {
    timer: Arc<dyn Timer>,
    delay: Duration,
    outstanding: GuardedCell<Option<Outstanding>>,
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl Debouncer {
    /// Create a debouncer firing `delay` after the last [`arm`](Self::arm).
    pub fn new(timer: Arc<dyn Timer>, delay: Duration) -> Self {
        Self {
            timer,
            delay,
            outstanding: GuardedCell::new(None),
        }
    }

    /// Configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel the outstanding task, if any, and schedule `action`.
    pub fn arm(&self, action: ScheduledAction) {
        let mut outstanding = self.outstanding.lock();
        if let Some(previous) = outstanding.take() {
            previous.handle.cancel();
        }
        tracing::trace!(delay_ms = self.delay.as_millis() as u64, "debounce armed");

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let handle = self.timer.schedule(
            self.delay,
            Box::new(move || {
                flag.store(true, Ordering::SeqCst);
                action();
            }),
        );
        *outstanding = Some(Outstanding { handle, fired });
    }

    /// Cancel the outstanding task without scheduling a new one.
    pub fn cancel(&self) {
        if let Some(previous) = self.outstanding.lock().take() {
            previous.handle.cancel();
        }
    }

    /// Returns `true` if a task is scheduled and has neither fired nor been cancelled.
    pub fn is_armed(&self) -> bool {
        self.outstanding
            .lock()
            .as_ref()
            .is_some_and(Outstanding::is_live)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
