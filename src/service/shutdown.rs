//! Graceful teardown when `stop` fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use super::{ServiceRegistry, ServiceState};
use crate::components::Teardown;
use crate::domain::{EventBus, InstanceId, Topic};

/// Result of closing one collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownOutcome {
    /// Collaborator name.
    pub service: &'static str,
    /// Failure description, `None` on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TeardownOutcome {
    /// Returns `true` if the collaborator closed cleanly.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of the single teardown pass of a process instance.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    /// Instance that was torn down.
    pub instance_id: InstanceId,
    /// Detail carried by the `stop` signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// One entry per teardown hook, in invocation order.
    pub outcomes: Vec<TeardownOutcome>,
    /// When the pass completed.
    pub finished_at: DateTime<Utc>,
}

/// Releases long-lived resources once per process instance.
///
/// Failures are logged and recorded, never retried, and never prevent the
/// remaining hooks from running.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    instance_id: InstanceId,
    bus: EventBus,
    registry: Arc<ServiceRegistry>,
    started: AtomicBool,
    report: OnceLock<TeardownReport>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator tearing down the collaborators of `registry`.
    #[must_use]
    pub fn new(instance_id: InstanceId, bus: EventBus, registry: Arc<ServiceRegistry>) -> Self {
        Self {
            instance_id,
            bus,
            registry,
            started: AtomicBool::new(false),
            report: OnceLock::new(),
        }
    }

    /// Spawns the task that waits for `stop` and then tears down.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let stop = self.bus.subscribe(&Topic::STOP);
        tokio::spawn(async move {
            let signal = stop.wait().await;
            coordinator.teardown(signal.detail()).await;
        })
    }

    /// Closes every collaborator that owns an external resource, then
    /// publishes `closed`.
    ///
    /// Only the first call does anything; later calls return `None`.
    ///
    /// The registry is halted first, so a `ready` arriving later builds
    /// nothing. If construction is already running, teardown waits for it
    /// to settle and closes whatever it built. A registry that never became
    /// ready leaves nothing to close and the report is empty.
    pub async fn teardown(&self, reason: Option<&str>) -> Option<&TeardownReport> {
        if self.started.swap(true, Ordering::AcqRel) {
            tracing::debug!(instance_id = %self.instance_id, "teardown already ran");
            return None;
        }

        tracing::info!(instance_id = %self.instance_id, reason, "svc stop, releasing resources");

        if self.registry.halt() == ServiceState::Initializing {
            tracing::debug!(instance_id = %self.instance_id, "waiting for construction to settle");
            if let Err(err) = self.registry.settled().await {
                tracing::debug!(code = err.error_code(), "construction failed during stop");
            }
        }

        let outcomes: Vec<TeardownOutcome> = match self.registry.services() {
            Some(services) => services
                .teardown_hooks()
                .iter()
                .map(|hook| close_hook(hook.as_ref()))
                .collect(),
            None => {
                tracing::debug!(
                    instance_id = %self.instance_id,
                    state = ?self.registry.state(),
                    "no services to tear down"
                );
                Vec::new()
            }
        };

        let report = self.report.get_or_init(|| TeardownReport {
            instance_id: self.instance_id,
            reason: reason.map(str::to_string),
            outcomes,
            finished_at: Utc::now(),
        });
        match serde_json::to_string(report) {
            Ok(json) => tracing::info!(report = %json, "teardown finished"),
            Err(err) => tracing::warn!(error = %err, "teardown report not serializable"),
        }

        self.bus.publish(&Topic::CLOSED, reason.map(str::to_string));
        Some(report)
    }

    /// The teardown report, once teardown has run.
    #[must_use]
    pub fn report(&self) -> Option<&TeardownReport> {
        self.report.get()
    }
}

fn close_hook(hook: &dyn Teardown) -> TeardownOutcome {
    let service = hook.name();
    match hook.close() {
        Ok(()) => {
            tracing::debug!(service, "closed");
            TeardownOutcome {
                service,
                error: None,
            }
        }
        Err(err) => {
            tracing::warn!(service, code = err.error_code(), error = %err, "teardown failed");
            TeardownOutcome {
                service,
                error: Some(err.to_string()),
            }
        }
    }
}
