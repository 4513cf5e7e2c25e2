//! Renewable idle-shutdown timer.
//!
//! At most one deferred `stop` is outstanding. Each renewal bumps a
//! generation counter and replaces the task under the same lock the
//! expiring task takes before publishing, so a renewal racing an expiry
//! either lands first (the stale task sees a newer generation and exits)
//! or lands after `stop` already fired. It never yields two firings or a
//! lost renewal.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::domain::signal::REASON_IDLE_TIMEOUT;
use crate::domain::{EventBus, Topic};

#[derive(Debug, Default)]
struct TimerSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

/// Publishes `stop` after a period without renewals.
#[derive(Debug)]
pub struct IdleShutdownTimer {
    bus: EventBus,
    slot: Arc<Mutex<TimerSlot>>,
}

impl IdleShutdownTimer {
    /// Creates a timer with nothing scheduled.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            slot: Arc::new(Mutex::new(TimerSlot::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restarts the countdown: `stop` fires `duration_ms` after this call
    /// unless renewed or cancelled first.
    ///
    /// Negative durations are rejected with a warning and leave any pending
    /// timer untouched. Zero schedules `stop` for the next scheduler turn,
    /// never synchronously. Returns `true` if a timer was scheduled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn renew(&self, duration_ms: i64) -> bool {
        if duration_ms < 0 {
            tracing::warn!(duration_ms, "invalid idle timeout, renewal skipped");
            return false;
        }
        if self.bus.is_fired(&Topic::STOP) {
            tracing::debug!(duration_ms, "stop already fired, renewal skipped");
            return false;
        }

        let delay = Duration::from_millis(duration_ms.unsigned_abs());
        let mut slot = self.lock();
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        if let Some(previous) = slot.handle.take() {
            previous.abort();
            tracing::trace!("idle timer revoked");
        }

        let bus = self.bus.clone();
        let shared = Arc::clone(&self.slot);
        slot.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.generation != generation {
                return;
            }
            slot.handle = None;
            tracing::info!("idle timeout elapsed, stopping");
            bus.publish(&Topic::STOP, Some(REASON_IDLE_TIMEOUT.to_string()));
        }));

        tracing::debug!(duration_ms, "idle timeout extended");
        true
    }

    /// Cancels the pending timer, if any.
    ///
    /// Returns `true` if a timer was pending.
    pub fn cancel(&self) -> bool {
        let mut slot = self.lock();
        slot.generation = slot.generation.wrapping_add(1);
        let Some(handle) = slot.handle.take() else {
            return false;
        };
        let pending = !handle.is_finished();
        handle.abort();
        if pending {
            tracing::debug!("idle timer revoked");
        }
        pending
    }

    /// Returns `true` while a timer is scheduled and has not fired.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock()
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for IdleShutdownTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.lock().handle.take() {
            handle.abort();
        }
    }
}
