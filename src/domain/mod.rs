//! Domain layer: topics, signals and the one-shot event bus.
//!
//! This module contains the coordination vocabulary shared by every
//! lifecycle component: topic names, the payload recorded when a topic
//! fires, the process-instance identifier, and the bus itself.

pub mod event_bus;
pub mod instance_id;
pub mod signal;
pub mod topic;

pub use event_bus::{EventBus, Subscription};
pub use instance_id::InstanceId;
pub use signal::Signal;
pub use topic::Topic;
