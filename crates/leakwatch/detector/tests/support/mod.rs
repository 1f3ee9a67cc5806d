//! A small mock UI hierarchy for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use leakwatch_detector::{
    AlertPresenter, Bounds, CaptureError, Detachable, LeakDetector,
    LeakReport, LeakVerdict, ManualRunLoop, NodeKind, NodeRef, ProbeHandle, Snapshot, UiNode,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leakwatch_detector=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer().without_time())
        .try_init();
}

/// A leaf node with a parent link.
pub struct TestView {
    class_name: String,
    bounds: Bounds,
    superview: Mutex<Weak<TestView>>,
    subviews: Mutex<Vec<Arc<TestView>>>,
}

impl TestView {
    pub fn new() -> Arc<Self> {
        Self::named("TestView")
    }

    pub fn named(class_name: &str) -> Arc<Self> {
        Arc::new(Self {
            class_name: class_name.to_string(),
            bounds: Bounds::new(4, 4),
            superview: Mutex::new(Weak::new()),
            subviews: Mutex::new(Vec::new()),
        })
    }

    pub fn add_subview(self: &Arc<Self>, child: Arc<TestView>) {
        *child.superview.lock().unwrap() = Arc::downgrade(self);
        self.subviews.lock().unwrap().push(child);
    }

    pub fn subview_count(&self) -> usize {
        self.subviews.lock().unwrap().len()
    }
}

impl UiNode for TestView {
    fn kind(&self) -> NodeKind {
        NodeKind::Leaf
    }

    fn class_name(&self) -> String {
        self.class_name.clone()
    }

    fn is_attached(&self) -> bool {
        self.superview.lock().unwrap().upgrade().is_some()
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn render(&self) -> Result<Snapshot, CaptureError> {
        Snapshot::solid(self.bounds, [200, 40, 40, 255])
    }
}

impl Detachable for TestView {
    fn detach_from_parent(&self) {
        let parent = std::mem::take(&mut *self.superview.lock().unwrap());
        if let Some(parent) = parent.upgrade() {
            parent
                .subviews
                .lock()
                .unwrap()
                .retain(|child| !std::ptr::eq(Arc::as_ptr(child), self));
        }
    }
}

/// A screen-level container owning a root view.
pub struct TestController {
    class_name: String,
    view: Arc<TestView>,
    presented: AtomicBool,
}

impl TestController {
    pub fn named(class_name: &str) -> Arc<Self> {
        Arc::new(Self {
            class_name: class_name.to_string(),
            view: TestView::new(),
            presented: AtomicBool::new(false),
        })
    }

    pub fn view(&self) -> &Arc<TestView> {
        &self.view
    }
}

impl UiNode for TestController {
    fn kind(&self) -> NodeKind {
        NodeKind::Container
    }

    fn class_name(&self) -> String {
        self.class_name.clone()
    }

    fn is_attached(&self) -> bool {
        self.presented.load(Ordering::SeqCst)
    }
}

impl Detachable for TestController {
    fn detach_from_parent(&self) {
        self.presented.store(false, Ordering::SeqCst);
    }
}

/// A root container that swaps its top-level controller.
pub struct TestWindow {
    class_name: String,
    root: Mutex<Option<Arc<TestController>>>,
}

impl TestWindow {
    pub fn named(class_name: &str) -> Arc<Self> {
        Arc::new(Self {
            class_name: class_name.to_string(),
            root: Mutex::new(None),
        })
    }

    /// Replace the root controller, notifying the detector about the old one.
    pub fn set_root(
        self: &Arc<Self>,
        detector: &LeakDetector,
        controller: Option<Arc<TestController>>,
    ) -> Option<ProbeHandle> {
        if let Some(incoming) = &controller {
            incoming.presented.store(true, Ordering::SeqCst);
        }

        let outgoing = std::mem::replace(&mut *self.root.lock().unwrap(), controller)?;
        outgoing.presented.store(false, Ordering::SeqCst);
        detector.root_container_replaced(self, &outgoing)
    }
}

impl UiNode for TestWindow {
    fn kind(&self) -> NodeKind {
        NodeKind::RootContainer
    }

    fn class_name(&self) -> String {
        self.class_name.clone()
    }

    fn is_attached(&self) -> bool {
        true
    }
}

/// What a handler saw, minus the strong references.
#[derive(Debug, Clone)]
pub struct Seen {
    pub class_name: String,
    pub kind: NodeKind,
    pub has_container: bool,
    pub has_leaf: bool,
    pub has_snapshot: bool,
    pub message: String,
}

/// Records every report and answers with a fixed verdict.
#[derive(Clone, Default)]
pub struct ReportLog {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl ReportLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, report: &LeakReport) {
        self.seen.lock().unwrap().push(Seen {
            class_name: report.class_name().to_string(),
            kind: report.kind(),
            has_container: report.container().is_some(),
            has_leaf: report.leaf().is_some(),
            has_snapshot: report.snapshot().is_some(),
            message: report.message().to_string(),
        });
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Configure `detector` to record into this log and answer `verdict`.
    pub fn install(&self, detector: &LeakDetector, delay: Duration, verdict: LeakVerdict) {
        let log = self.clone();
        detector.configure(delay, move |report| {
            log.record(report);
            verdict
        });
    }
}

/// Alert presenter that counts presentations.
#[derive(Default)]
pub struct CountingPresenter {
    presented: Mutex<Vec<String>>,
}

impl CountingPresenter {
    pub fn presented(&self) -> Vec<String> {
        self.presented.lock().unwrap().clone()
    }
}

impl AlertPresenter for CountingPresenter {
    fn present(&self, report: &LeakReport) {
        self.presented
            .lock()
            .unwrap()
            .push(report.class_name().to_string());
    }
}

/// Detector on a manual run loop with default configuration.
pub fn manual_detector() -> (LeakDetector, Arc<ManualRunLoop>) {
    let run_loop = Arc::new(ManualRunLoop::new());
    let detector = LeakDetector::builder()
        .with_run_loop(run_loop.clone())
        .build()
        .unwrap();
    (detector, run_loop)
}

/// Detach `node` as a host would, without a parent to leave.
pub fn detached(detector: &LeakDetector, node: &impl NodeRef) -> ProbeHandle {
    detector
        .node_detached(node)
        .expect("node class should not be ignored")
}
