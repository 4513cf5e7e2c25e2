//! Payload recorded when a topic fires.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Topic;

/// Detail attached to `stop` when the idle timer expires.
pub const REASON_IDLE_TIMEOUT: &str = "idle-timeout";

/// Detail attached to `stop` when the host requests termination.
pub const REASON_HOST: &str = "host-signal";

/// The value every subscriber of a fired topic observes.
///
/// Recorded once by the first publish and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal {
    /// Topic that fired.
    pub topic: Topic,
    /// Optional publisher-supplied detail (e.g. the stop reason).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// When the topic fired.
    pub fired_at: DateTime<Utc>,
}

impl Signal {
    /// Creates a signal stamped with the current time.
    #[must_use]
    pub fn new(topic: Topic, detail: Option<String>) -> Self {
        Self {
            topic,
            detail,
            fired_at: Utc::now(),
        }
    }

    /// Returns the detail string, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_empty_detail() {
        let signal = Signal::new(Topic::READY, None);
        let json = serde_json::to_value(&signal).unwrap_or_default();
        assert_eq!(json["topic"], "ready");
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn detail_is_exposed() {
        let signal = Signal::new(Topic::STOP, Some(REASON_IDLE_TIMEOUT.to_string()));
        assert_eq!(signal.detail(), Some("idle-timeout"));
    }
}
