//! Run loops: where delayed probes execute.
//!
//! Probes must run one at a time, in the order their timers elapse, on the
//! executor that owns the UI. Hosts with their own UI thread implement
//! [`RunLoop`] over it; otherwise [`TokioRunLoop`] serializes probes on a
//! single consumer task.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::error::{DetectorError, DetectorResult};

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs after a delay, serially.
pub trait RunLoop: Send + Sync {
    /// Run `job` once `delay` has elapsed.
    ///
    /// Jobs never run concurrently with each other. Dropping a job without
    /// running it is allowed; the probe's handle then reports it as dropped.
    fn run_after(&self, delay: Duration, job: Job);
}

/// Serial executor on a tokio runtime.
///
/// Timers are tokio sleeps; when one elapses its job is queued to a single
/// consumer task, which runs queued jobs to completion one after another.
/// A job that panics is logged and the consumer moves on to the next one.
pub struct TokioRunLoop {
    handle: Handle,
    queue: mpsc::UnboundedSender<Job>,
}

impl TokioRunLoop {
    /// Start a run loop on the given runtime.
    pub fn new(handle: Handle) -> Self {
        let (queue, mut jobs) = mpsc::unbounded_channel::<Job>();

        handle.spawn(async move {
            while let Some(job) = jobs.recv().await {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("Run loop job panicked; continuing with the next job");
                }
            }
            debug!("Run loop queue closed");
        });

        Self { handle, queue }
    }

    /// Start a run loop on the runtime of the calling context.
    pub fn current() -> DetectorResult<Self> {
        let handle = Handle::try_current().map_err(|e| DetectorError::Runtime(e.to_string()))?;
        Ok(Self::new(handle))
    }
}

impl RunLoop for TokioRunLoop {
    fn run_after(&self, delay: Duration, job: Job) {
        let queue = self.queue.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if queue.send(job).is_err() {
                warn!("Run loop stopped; dropping probe");
            }
        });
    }
}

impl fmt::Debug for TokioRunLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioRunLoop")
            .field("closed", &self.queue.is_closed())
            .finish()
    }
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    pending: BTreeMap<(Duration, u64), Job>,
}

/// Deterministic run loop driven by an explicit virtual clock.
///
/// Nothing runs until [`advance`](Self::advance) or
/// [`run_all`](Self::run_all) is called, and jobs run on the calling thread.
/// Jobs due at the same instant run in submission order.
#[derive(Default)]
pub struct ManualRunLoop {
    state: Mutex<ManualState>,
}

impl ManualRunLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since construction.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Jobs waiting for their deadline.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Deadlines of waiting jobs, earliest first.
    pub fn pending_deadlines(&self) -> Vec<Duration> {
        self.lock()
            .pending
            .keys()
            .map(|(deadline, _)| *deadline)
            .collect()
    }

    /// Move the clock forward by `by`, running every job that falls due.
    ///
    /// Jobs scheduled by a running job are picked up if they fall due within
    /// the same window. Returns the number of jobs run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.lock().now + by;
        let ran = self.drain(Some(target));
        self.lock().now = target;
        ran
    }

    /// Run every pending job, moving the clock to each deadline in turn.
    pub fn run_all(&self) -> usize {
        self.drain(None)
    }

    fn drain(&self, until: Option<Duration>) -> usize {
        let mut ran = 0;
        loop {
            let job = {
                let mut state = self.lock();
                let due = match state.pending.first_key_value() {
                    Some((&(deadline, _), _)) => until.map_or(true, |limit| deadline <= limit),
                    None => false,
                };
                if !due {
                    break;
                }
                match state.pending.pop_first() {
                    Some(((deadline, _), job)) => {
                        state.now = state.now.max(deadline);
                        job
                    }
                    None => break,
                }
            };

            // Lock released: the job may schedule more work.
            job();
            ran += 1;
        }

        trace!(ran, "Manual run loop drained");
        ran
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RunLoop for ManualRunLoop {
    fn run_after(&self, delay: Duration, job: Job) {
        let mut state = self.lock();
        let deadline = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.insert((deadline, seq), job);
    }
}

impl fmt::Debug for ManualRunLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ManualRunLoop")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish()
    }
}
