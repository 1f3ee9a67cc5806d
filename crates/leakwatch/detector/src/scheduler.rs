//! Detection scheduler.
//!
//! Turns detach events into delayed probes and decides, when each probe
//! fires, whether the node leaked. Each candidate is scheduled once and
//! probed once; there is no retry.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use leakwatch_types::{CandidateId, DetectorStats, LeakVerdict, NodeKind, ProbeOutcome};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, error, info, instrument, warn};

use crate::candidate::Candidate;
use crate::capture::SnapshotCapturer;
use crate::error::{DetectorError, DetectorResult};
use crate::host::{AlertPresenter, NodeRef};
use crate::ignore::IgnoreRegistry;
use crate::ledger::{LateDeallocation, LeakLedger};
use crate::prober::LivenessProber;
use crate::registry::CallbackRegistry;
use crate::report::LeakReport;
use crate::runloop::RunLoop;

/// Handle to one scheduled probe.
///
/// Awaiting it is optional. Dropping it does not cancel the probe.
#[derive(Debug)]
pub struct ProbeHandle {
    candidate: CandidateId,
    outcome: oneshot::Receiver<DetectorResult<ProbeOutcome>>,
}

impl ProbeHandle {
    pub fn candidate(&self) -> CandidateId {
        self.candidate
    }

    /// Wait for the probe to fire.
    pub async fn outcome(self) -> DetectorResult<ProbeOutcome> {
        self.outcome
            .await
            .unwrap_or_else(|_| Err(DetectorError::ProbeDropped))
    }

    /// Take the outcome if the probe has fired.
    ///
    /// The outcome can be taken once; later calls report the probe as dropped.
    pub fn try_outcome(&mut self) -> Option<DetectorResult<ProbeOutcome>> {
        match self.outcome.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(DetectorError::ProbeDropped)),
        }
    }
}

#[derive(Default)]
struct Counters {
    scheduled: AtomicU64,
    suppressed_on_detach: AtomicU64,
    disabled: AtomicU64,
    deallocated: AtomicU64,
    reattached: AtomicU64,
    suppressed_on_fire: AtomicU64,
    deduplicated: AtomicU64,
    reported: AtomicU64,
    handler_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> DetectorStats {
        DetectorStats {
            scheduled: self.scheduled.load(Ordering::SeqCst),
            suppressed_on_detach: self.suppressed_on_detach.load(Ordering::SeqCst),
            disabled: self.disabled.load(Ordering::SeqCst),
            deallocated: self.deallocated.load(Ordering::SeqCst),
            reattached: self.reattached.load(Ordering::SeqCst),
            suppressed_on_fire: self.suppressed_on_fire.load(Ordering::SeqCst),
            deduplicated: self.deduplicated.load(Ordering::SeqCst),
            reported: self.reported.load(Ordering::SeqCst),
            handler_failures: self.handler_failures.load(Ordering::SeqCst),
        }
    }
}

/// Orchestrates candidates from detach to verdict.
pub struct DetectionScheduler {
    registry: CallbackRegistry,
    ignore: IgnoreRegistry,
    prober: LivenessProber,
    capturer: SnapshotCapturer,
    ledger: Option<LeakLedger>,
    run_loop: Arc<dyn RunLoop>,
    presenter: Arc<dyn AlertPresenter>,
    counters: Counters,
}

impl DetectionScheduler {
    pub fn new(
        registry: CallbackRegistry,
        ignore: IgnoreRegistry,
        capturer: SnapshotCapturer,
        ledger: Option<LeakLedger>,
        run_loop: Arc<dyn RunLoop>,
        presenter: Arc<dyn AlertPresenter>,
    ) -> Self {
        Self {
            registry,
            ignore,
            prober: LivenessProber::new(),
            capturer,
            ledger,
            run_loop,
            presenter,
            counters: Counters::default(),
        }
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    pub fn ignore(&self) -> &IgnoreRegistry {
        &self.ignore
    }

    /// Schedule a probe for a node that just left its parent.
    ///
    /// Returns `None` when the node's class is ignored.
    pub fn schedule(self: &Arc<Self>, node: &impl NodeRef) -> Option<ProbeHandle> {
        let class_name = node.node().class_name();
        let kind = node.node().kind();

        if self.ignore.contains(&class_name, kind) {
            Counters::bump(&self.counters.suppressed_on_detach);
            debug!(class_name = %class_name, kind = %kind, "Ignored class detached");
            return None;
        }

        let delay = self.registry.current_delay();
        let candidate = Candidate::new(node, delay);
        let id = candidate.id();
        let (tx, rx) = oneshot::channel();

        info!(
            candidate = %id,
            class_name = %class_name,
            kind = %kind,
            delay_ms = delay.as_millis() as u64,
            "Leak probe scheduled"
        );

        Counters::bump(&self.counters.scheduled);
        let scheduler = Arc::clone(self);
        self.run_loop.run_after(
            delay,
            Box::new(move || {
                let result = scheduler.fire(candidate);
                // The host may not be waiting.
                let _ = tx.send(result);
            }),
        );

        Some(ProbeHandle {
            candidate: id,
            outcome: rx,
        })
    }

    /// Schedule a probe for the container a root just let go of.
    ///
    /// Returns `None` when the root's class or the outgoing container's
    /// class is ignored.
    pub fn schedule_replaced(
        self: &Arc<Self>,
        root: &impl NodeRef,
        outgoing: &impl NodeRef,
    ) -> Option<ProbeHandle> {
        let root_class = root.node().class_name();
        if self.ignore.contains(&root_class, NodeKind::RootContainer) {
            Counters::bump(&self.counters.suppressed_on_detach);
            debug!(root_class = %root_class, "Ignored root container replaced its content");
            return None;
        }

        self.schedule(outgoing)
    }

    #[instrument(
        skip(self, candidate),
        fields(candidate = %candidate.id(), class_name = %candidate.class_name())
    )]
    fn fire(&self, candidate: Candidate) -> DetectorResult<ProbeOutcome> {
        let Some(handler) = self.registry.current_handler() else {
            Counters::bump(&self.counters.disabled);
            debug!("Detection disabled; probe discarded");
            return Ok(ProbeOutcome::Disabled);
        };

        let Some(node) = self.prober.resolve(&candidate) else {
            Counters::bump(&self.counters.deallocated);
            return Ok(ProbeOutcome::Deallocated);
        };

        if node.is_attached() {
            Counters::bump(&self.counters.reattached);
            debug!("Node back in a hierarchy");
            return Ok(ProbeOutcome::Reattached);
        }

        let current_class = node.class_name();
        if self.ignore.contains(&current_class, candidate.kind()) {
            Counters::bump(&self.counters.suppressed_on_fire);
            debug!(current_class = %current_class, "Ignored class still alive");
            return Ok(ProbeOutcome::Suppressed);
        }

        if let Some(first) = self.ledger.as_ref().and_then(|l| l.reported_by(&candidate)) {
            Counters::bump(&self.counters.deduplicated);
            return Ok(ProbeOutcome::AlreadyReported { first });
        }

        let snapshot = self.capturer.capture(node.as_ref());
        let report = LeakReport::new(
            candidate.id(),
            candidate.kind(),
            node,
            candidate.detached_at().elapsed(),
            snapshot,
        );

        warn!(kind = %report.kind(), "Detached node still in memory");

        let verdict = match panic::catch_unwind(AssertUnwindSafe(|| handler.call(&report))) {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                Counters::bump(&self.counters.handler_failures);
                error!(error = %e, "Leak handler failed");
                return Err(DetectorError::Handler(e));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                Counters::bump(&self.counters.handler_failures);
                error!(panic = %message, "Leak handler panicked");
                return Err(DetectorError::HandlerPanicked(message));
            }
        };

        // Only delivered reports count toward dedup.
        if let Some(ledger) = &self.ledger {
            ledger.record(&candidate);
        }

        match verdict {
            LeakVerdict::ShowAlert => self.presenter.present(&report),
            LeakVerdict::SuppressAlert => {}
            LeakVerdict::DisableDetection => {
                self.registry.disable_generation(handler.generation());
            }
        }

        Counters::bump(&self.counters.reported);
        Ok(ProbeOutcome::Reported {
            candidate: candidate.id(),
            verdict,
        })
    }

    pub fn stats(&self) -> DetectorStats {
        self.counters.snapshot()
    }

    /// Collect reported nodes that have since been released.
    pub fn sweep_ledger(&self) -> Vec<LateDeallocation> {
        self.ledger
            .as_ref()
            .map(LeakLedger::sweep)
            .unwrap_or_default()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl fmt::Debug for DetectionScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionScheduler")
            .field("registry", &self.registry)
            .field("capturer", &self.capturer)
            .field("ledger", &self.ledger.as_ref().map(LeakLedger::len))
            .field("stats", &self.stats())
            .finish()
    }
}
