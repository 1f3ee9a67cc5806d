//! Callback registry: the single active `{delay, handler}` pair.
//!
//! The delay is read when a probe is scheduled; the handler is read when it
//! fires. Replacing the configuration therefore never moves a probe that is
//! already scheduled, but does change who receives its report.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use leakwatch_types::LeakVerdict;
use tracing::info;

use crate::error::HandlerError;
use crate::report::LeakReport;

/// Handler invoked once per confirmed leak.
pub type LeakHandler =
    Arc<dyn Fn(&LeakReport) -> Result<LeakVerdict, HandlerError> + Send + Sync + 'static>;

/// Wrap an infallible handler.
pub fn infallible_handler<F>(handler: F) -> LeakHandler
where
    F: Fn(&LeakReport) -> LeakVerdict + Send + Sync + 'static,
{
    Arc::new(
        move |report: &LeakReport| -> Result<LeakVerdict, HandlerError> { Ok(handler(report)) },
    )
}

/// Wrap a fallible handler.
pub fn fallible_handler<F>(handler: F) -> LeakHandler
where
    F: Fn(&LeakReport) -> Result<LeakVerdict, HandlerError> + Send + Sync + 'static,
{
    Arc::new(handler)
}

struct Registration {
    delay: Duration,
    handler: Option<LeakHandler>,
    generation: u64,
}

/// Process-wide detection configuration. Last writer wins.
pub struct CallbackRegistry {
    inner: RwLock<Registration>,
}

/// Handler read at fire time, tagged with the configuration it came from.
#[derive(Clone)]
pub struct ActiveHandler {
    handler: LeakHandler,
    generation: u64,
}

impl ActiveHandler {
    pub fn call(&self, report: &LeakReport) -> Result<LeakVerdict, HandlerError> {
        (self.handler)(report)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl CallbackRegistry {
    /// A registry with no handler; detection is off until configured.
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: RwLock::new(Registration {
                delay,
                handler: None,
                generation: 0,
            }),
        }
    }

    /// Replace the active configuration.
    pub fn configure(&self, delay: Duration, handler: LeakHandler) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.delay = delay;
        inner.handler = Some(handler);
        inner.generation += 1;

        info!(
            delay_ms = delay.as_millis() as u64,
            generation = inner.generation,
            "Leak detection configured"
        );
    }

    /// Delay for probes scheduled from now on.
    pub fn current_delay(&self) -> Duration {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .delay
    }

    /// Handler for probes firing now, if detection is enabled.
    pub fn current_handler(&self) -> Option<ActiveHandler> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.handler.as_ref().map(|handler| ActiveHandler {
            handler: Arc::clone(handler),
            generation: inner.generation,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handler
            .is_some()
    }

    /// Clear the handler unconditionally.
    pub fn disable(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.handler.take().is_some() {
            info!(generation = inner.generation, "Leak detection disabled");
        }
    }

    /// Clear the handler only if it still belongs to `generation`.
    ///
    /// A handler that reconfigures the detector and then asks to disable it
    /// leaves the new configuration in place. Returns whether it was cleared.
    pub fn disable_generation(&self, generation: u64) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.generation != generation || inner.handler.is_none() {
            return false;
        }

        inner.handler = None;
        info!(generation, "Leak detection disabled by handler");
        true
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("CallbackRegistry")
            .field("delay", &inner.delay)
            .field("enabled", &inner.handler.is_some())
            .field("generation", &inner.generation)
            .finish()
    }
}
