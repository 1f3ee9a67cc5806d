//! The `LeakDetector` facade and its builder.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use leakwatch_types::{DetectorStats, LeakVerdict, NodeKind};

use crate::capture::SnapshotCapturer;
use crate::config::DetectorConfig;
use crate::error::{DetectorResult, HandlerError};
use crate::host::{AlertPresenter, LogAlertPresenter, NodeRef};
use crate::ignore::IgnoreRegistry;
use crate::ledger::{LateDeallocation, LeakLedger};
use crate::registry::{fallible_handler, infallible_handler, CallbackRegistry};
use crate::report::LeakReport;
use crate::runloop::{RunLoop, TokioRunLoop};
use crate::scheduler::{DetectionScheduler, ProbeHandle};

/// Runtime leak detector for detached UI nodes.
///
/// Cloning is cheap; clones share configuration, ignore lists and probes.
/// Detection is off until [`configure`](Self::configure) registers a handler.
#[derive(Debug, Clone)]
pub struct LeakDetector {
    scheduler: Arc<DetectionScheduler>,
}

impl LeakDetector {
    pub fn builder() -> LeakDetectorBuilder {
        LeakDetectorBuilder::new()
    }

    /// Detector with default configuration on the current tokio runtime.
    pub fn new() -> DetectorResult<Self> {
        Self::builder().build()
    }

    /// Register the handler and the delay for probes scheduled from now on.
    ///
    /// Replaces any previous configuration and re-enables detection after a
    /// [`LeakVerdict::DisableDetection`]. Probes already scheduled keep their
    /// delay but report to this handler. A panicking handler is caught and
    /// surfaces on the probe's handle as `DetectorError::HandlerPanicked`.
    pub fn configure<F>(&self, delay: Duration, handler: F)
    where
        F: Fn(&LeakReport) -> LeakVerdict + Send + Sync + 'static,
    {
        self.scheduler
            .registry()
            .configure(delay, infallible_handler(handler));
    }

    /// Like [`configure`](Self::configure), for a handler that can fail.
    ///
    /// Errors reach the probe's [`ProbeHandle`] as `DetectorError::Handler`.
    pub fn try_configure<F>(&self, delay: Duration, handler: F)
    where
        F: Fn(&LeakReport) -> Result<LeakVerdict, HandlerError> + Send + Sync + 'static,
    {
        self.scheduler
            .registry()
            .configure(delay, fallible_handler(handler));
    }

    pub fn is_enabled(&self) -> bool {
        self.scheduler.registry().is_enabled()
    }

    /// Delay that the next detach will be probed with.
    pub fn delay(&self) -> Duration {
        self.scheduler.registry().current_delay()
    }

    pub fn ignored_container_class_names(&self) -> BTreeSet<String> {
        self.scheduler.ignore().containers()
    }

    pub fn ignored_leaf_class_names(&self) -> BTreeSet<String> {
        self.scheduler.ignore().leaves()
    }

    pub fn ignored_root_container_class_names(&self) -> BTreeSet<String> {
        self.scheduler.ignore().root_containers()
    }

    /// Add a class name to the ignore list for `kind`.
    ///
    /// Returns `false` if it was already present.
    pub fn ignore_class_name(&self, kind: NodeKind, class_name: impl Into<String>) -> bool {
        self.scheduler.ignore().insert(kind, class_name)
    }

    /// Notify the detector that `node` has been removed from its parent.
    ///
    /// Returns `None` when the node's class is ignored.
    pub fn node_detached(&self, node: &impl NodeRef) -> Option<ProbeHandle> {
        self.scheduler.schedule(node)
    }

    /// Notify the detector that `root` replaced its top-level container,
    /// letting go of `outgoing`.
    ///
    /// Skipped entirely when the root's class is on the root-container
    /// ignore list.
    pub fn root_container_replaced(
        &self,
        root: &impl NodeRef,
        outgoing: &impl NodeRef,
    ) -> Option<ProbeHandle> {
        self.scheduler.schedule_replaced(root, outgoing)
    }

    pub fn stats(&self) -> DetectorStats {
        self.scheduler.stats()
    }

    /// Reported nodes released since the last sweep.
    ///
    /// Always empty when late-deallocation tracking is off.
    pub fn sweep_ledger(&self) -> Vec<LateDeallocation> {
        self.scheduler.sweep_ledger()
    }
}

/// Builder for [`LeakDetector`].
#[derive(Default)]
pub struct LeakDetectorBuilder {
    config: Option<DetectorConfig>,
    run_loop: Option<Arc<dyn RunLoop>>,
    presenter: Option<Arc<dyn AlertPresenter>>,
}

impl LeakDetectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the detector configuration
    pub fn with_config(mut self, config: DetectorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the run loop probes execute on
    pub fn with_run_loop(mut self, run_loop: Arc<dyn RunLoop>) -> Self {
        self.run_loop = Some(run_loop);
        self
    }

    /// Set the presenter used for `ShowAlert` verdicts
    pub fn with_alert_presenter(mut self, presenter: Arc<dyn AlertPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Build the detector.
    ///
    /// Without an explicit run loop this starts a [`TokioRunLoop`] on the
    /// current runtime and fails outside of one.
    pub fn build(self) -> DetectorResult<LeakDetector> {
        let config = self.config.unwrap_or_default();

        let run_loop = match self.run_loop {
            Some(run_loop) => run_loop,
            None => Arc::new(TokioRunLoop::current()?),
        };
        let presenter = self
            .presenter
            .unwrap_or_else(|| Arc::new(LogAlertPresenter));

        let ledger = config.track_late_deallocation.then(LeakLedger::new);

        let scheduler = DetectionScheduler::new(
            CallbackRegistry::new(config.delay()),
            IgnoreRegistry::from_config(&config.ignore),
            SnapshotCapturer::new(config.capture_snapshots),
            ledger,
            run_loop,
            presenter,
        );

        Ok(LeakDetector {
            scheduler: Arc::new(scheduler),
        })
    }
}
