//! Cancellable slot for the pending token refresh of a session.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// Holds at most one pending refresh task.
///
/// Scheduling a new task cancels the pending one. Every task carries a
/// generation number so that a task which has started running can detach
/// itself from the slot without cancelling a newer task, and without being
/// cancelled by the reschedule it triggers.
///
/// Once cancelled, the slot refuses new tasks until [`RefreshSlot::resume`]
/// is called, so a refresh that is already running cannot re-arm itself.
#[derive(Debug, Default)]
pub(crate) struct RefreshSlot {
    pending: Mutex<Pending>,
}

#[derive(Debug, Default)]
struct Pending {
    generation: u64,
    handle: Option<JoinHandle<()>>,
    stopped: bool,
}

impl RefreshSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `job` after `delay`, replacing any pending task.
    ///
    /// `job` receives the generation assigned to it. Does nothing after
    /// [`RefreshSlot::cancel`]. Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, delay: Duration, job: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.lock();
        if pending.stopped {
            trace!("refresh slot stopped, not scheduling");
            return;
        }
        pending.generation = pending.generation.wrapping_add(1);
        let generation = pending.generation;

        let work = job(generation);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        });

        if let Some(previous) = pending.handle.replace(handle) {
            trace!("cancelling superseded refresh");
            previous.abort();
        }
    }

    /// Release the handle of the running task with `generation`.
    ///
    /// Returns false if a newer task has replaced it in the meantime.
    pub fn detach(&self, generation: u64) -> bool {
        let mut pending = self.lock();
        if pending.generation != generation {
            return false;
        }
        pending.handle.take();
        true
    }

    /// Cancel the pending task, if any, and refuse new ones.
    pub fn cancel(&self) {
        let mut pending = self.lock();
        pending.stopped = true;
        if let Some(handle) = pending.handle.take() {
            handle.abort();
        }
    }

    /// Accept new tasks again after [`RefreshSlot::cancel`].
    pub fn resume(&self) {
        self.lock().stopped = false;
    }

    /// Returns true while a task is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.lock()
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Pending> {
        // The guarded data stays consistent even if a holder panicked
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for RefreshSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
