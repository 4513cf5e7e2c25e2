//! Service layer: lifecycle orchestration.
//!
//! [`ServiceRegistry`] builds the collaborators when `ready` fires,
//! [`IdleShutdownTimer`] requests `stop` after inactivity, and
//! [`ShutdownCoordinator`] releases resources once `stop` fires.

pub mod factory;
pub mod idle_timer;
pub mod registry;
pub mod shutdown;

pub use factory::{DefaultServiceFactory, ServiceFactory, ServiceSettings, Services};
pub use idle_timer::IdleShutdownTimer;
pub use registry::{ServiceRegistry, ServiceState};
pub use shutdown::{ShutdownCoordinator, TeardownOutcome, TeardownReport};
