//! One-shot topics with replay for late subscribers.
//!
//! Each [`Topic`] is backed by a [`tokio::sync::watch`] channel holding
//! `Option<Signal>`. The first publish swaps `None` for `Some(signal)`
//! under the channel's own lock, so a subscriber registering concurrently
//! either sees the value on its first check or is woken by the send.
//!
//! Publishes are also serialized by the topic map lock. That gives every
//! pair of topics a single firing order, which
//! [`EventBus::publish_unless`] relies on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use super::{Signal, Topic};

type Slot = Arc<watch::Sender<Option<Signal>>>;

/// Bus of named one-shot topics.
///
/// Cheap to clone; all clones share the same topics. A topic moves from
/// not-fired to fired at most once and keeps the first payload forever.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    topics: Arc<Mutex<HashMap<Topic, Slot>>>,
}

impl EventBus {
    /// Creates a bus with no topics. Topics are created on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Topic, Slot>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, topic: &Topic) -> Slot {
        let mut topics = self.lock();
        Arc::clone(
            topics
                .entry(topic.clone())
                .or_insert_with(|| Arc::new(watch::channel(None).0)),
        )
    }

    /// Looks `topic` up without creating it.
    fn existing(&self, topic: &Topic) -> Option<Slot> {
        self.lock().get(topic).map(Arc::clone)
    }

    fn fire(topics: &mut HashMap<Topic, Slot>, topic: &Topic, detail: Option<String>) -> bool {
        let slot = topics
            .entry(topic.clone())
            .or_insert_with(|| Arc::new(watch::channel(None).0));
        let fired = slot.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(Signal::new(topic.clone(), detail));
            true
        });
        if fired {
            tracing::debug!(%topic, "topic fired");
        } else {
            tracing::trace!(%topic, "topic already fired, publish ignored");
        }
        fired
    }

    /// Registers interest in `topic`.
    ///
    /// Registration happens here, not when the returned [`Subscription`] is
    /// awaited, so a publish that lands in between is still observed.
    #[must_use]
    pub fn subscribe(&self, topic: &Topic) -> Subscription {
        Subscription {
            topic: topic.clone(),
            rx: self.slot(topic).subscribe(),
        }
    }

    /// Subscribes to `topic` and waits for it to fire.
    ///
    /// Resolves immediately if the topic already fired. Never resolves for
    /// a topic that is never published.
    pub async fn when(&self, topic: &Topic) -> Signal {
        self.subscribe(topic).wait().await
    }

    /// Fires `topic` with an optional detail.
    ///
    /// Returns `true` if this call fired the topic. Later calls are no-ops:
    /// they neither wake anyone nor replace the recorded payload.
    pub fn publish(&self, topic: &Topic, detail: Option<String>) -> bool {
        Self::fire(&mut self.lock(), topic, detail)
    }

    /// Fires `topic` unless `blocker` has already fired.
    ///
    /// The check and the publish happen under one lock, so `topic` can
    /// never be observed firing after `blocker`.
    pub fn publish_unless(&self, topic: &Topic, detail: Option<String>, blocker: &Topic) -> bool {
        let mut topics = self.lock();
        if topics
            .get(blocker)
            .is_some_and(|slot| slot.borrow().is_some())
        {
            tracing::debug!(%topic, %blocker, "blocker already fired, publish withheld");
            return false;
        }
        Self::fire(&mut topics, topic, detail)
    }

    /// Returns `true` if `topic` has fired.
    #[must_use]
    pub fn is_fired(&self, topic: &Topic) -> bool {
        self.existing(topic)
            .is_some_and(|slot| slot.borrow().is_some())
    }

    /// Returns the recorded payload of `topic`, if it fired.
    #[must_use]
    pub fn signal(&self, topic: &Topic) -> Option<Signal> {
        self.existing(topic).and_then(|slot| slot.borrow().clone())
    }
}

/// A registered, not yet resolved interest in one topic.
///
/// Subscriptions cannot be cancelled individually; dropping one simply
/// stops listening.
#[derive(Debug)]
pub struct Subscription {
    topic: Topic,
    rx: watch::Receiver<Option<Signal>>,
}

impl Subscription {
    /// Returns the topic this subscription listens to.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Suspends until the topic fires and returns its payload.
    pub async fn wait(mut self) -> Signal {
        let fired = match self.rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        match fired {
            Some(signal) => signal,
            // Bus dropped before firing: the topic can never fire now.
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unpublished_topic_never_resolves() {
        let bus = EventBus::new();
        let waited = tokio::time::timeout(Duration::from_secs(5), bus.when(&Topic::STEADY)).await;
        assert!(waited.is_err());
    }

    #[test]
    fn pending_until_published() {
        let bus = EventBus::new();
        let topic = Topic::READY;
        let mut waiter = task::spawn(bus.when(&topic));
        assert_pending!(waiter.poll());

        assert!(bus.publish(&topic, Some("go".to_string())));
        assert!(waiter.is_woken());
        let signal = assert_ready!(waiter.poll());
        assert_eq!(signal.detail(), Some("go"));
    }

    #[tokio::test]
    async fn late_subscriber_sees_recorded_payload() {
        let bus = EventBus::new();
        let early = bus.subscribe(&Topic::STOP);
        bus.publish(&Topic::STOP, Some("first".to_string()));

        let late = bus.when(&Topic::STOP).await;
        let early = early.wait().await;
        assert_eq!(early, late);
        assert_eq!(late.detail(), Some("first"));
    }

    #[tokio::test]
    async fn second_publish_is_ignored() {
        let bus = EventBus::new();
        assert!(bus.publish(&Topic::STOP, Some("first".to_string())));
        assert!(!bus.publish(&Topic::STOP, Some("second".to_string())));

        let Some(signal) = bus.signal(&Topic::STOP) else {
            panic!("stop should have fired");
        };
        assert_eq!(signal.detail(), Some("first"));
    }

    #[tokio::test]
    async fn topics_are_independent() {
        let bus = EventBus::new();
        bus.publish(&Topic::READY, None);
        assert!(bus.is_fired(&Topic::READY));
        assert!(!bus.is_fired(&Topic::STEADY));
        assert!(bus.signal(&Topic::new("custom")).is_none());
    }

    #[test]
    fn inspection_does_not_create_topics() {
        let bus = EventBus::new();
        for i in 0..32 {
            let topic = Topic::new(format!("lookup-{i}"));
            assert!(!bus.is_fired(&topic));
            assert!(bus.signal(&topic).is_none());
        }
        assert!(bus.lock().is_empty());

        bus.publish(&Topic::READY, None);
        assert_eq!(bus.lock().len(), 1);
    }

    #[test]
    fn publish_unless_withholds_after_blocker() {
        let bus = EventBus::new();
        assert!(bus.publish_unless(&Topic::STEADY, None, &Topic::STOP));
        assert!(bus.is_fired(&Topic::STEADY));

        let bus = EventBus::new();
        assert!(bus.publish(&Topic::STOP, None));
        assert!(!bus.publish_unless(&Topic::STEADY, None, &Topic::STOP));
        assert!(!bus.is_fired(&Topic::STEADY));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_subscribers_all_wake() {
        let bus = EventBus::new();
        let topic = Topic::new("race");

        let waiters: Vec<_> = (0..64)
            .map(|_| {
                let bus = bus.clone();
                let topic = topic.clone();
                tokio::spawn(async move { bus.when(&topic).await })
            })
            .collect();
        let publisher = {
            let bus = bus.clone();
            let topic = topic.clone();
            tokio::spawn(async move { bus.publish(&topic, Some("v".to_string())) })
        };

        let results = tokio::time::timeout(
            Duration::from_secs(5),
            futures_util::future::join_all(waiters),
        )
        .await;
        let Ok(results) = results else {
            panic!("a subscriber lost its wake-up");
        };
        for result in results {
            let Ok(signal) = result else {
                panic!("waiter task failed");
            };
            assert_eq!(signal.detail(), Some("v"));
        }
        assert!(matches!(publisher.await, Ok(true)));
    }
}
