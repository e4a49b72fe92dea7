//! tokio-backed [`Timer`]: one sleeping task per armed job.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use remindful_core::{ScheduleDescriptor, Timer, TimerCallback, TimerHandle};
use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::AbortHandle;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct TokioTimer {
    handle: Handle,
}

impl TokioTimer {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Timer on the runtime the caller is running in.
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

struct TokioTimerHandle {
    stopped: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl TimerHandle for TokioTimerHandle {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.abort.abort();
    }
}

impl Timer for TokioTimer {
    fn schedule(
        &self,
        descriptor: ScheduleDescriptor,
        callback: TimerCallback,
    ) -> Box<dyn TimerHandle> {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        // Instants already behind us fire on the next tick.
        let delay = (descriptor.fire_at() - Utc::now())
            .to_std()
            .unwrap_or_default();

        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if flag.load(Ordering::SeqCst) {
                return;
            }
            debug!(%descriptor, "timer elapsed");
            // The callback touches the store and may run a notifier command.
            // It usually stops its own job, which aborts this task, so it is
            // detached and reports its own failure.
            tokio::task::spawn_blocking(move || {
                if let Err(e) = callback() {
                    error!(%descriptor, error = %e, "reminder trigger failed");
                }
            });
        });

        Box::new(TokioTimerHandle {
            stopped,
            abort: task.abort_handle(),
        })
    }
}
