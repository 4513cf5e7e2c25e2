//! # dns-svc-lifecycle
//!
//! Process-lifecycle coordinator for a DNS resolver running on a
//! request-scoped execution environment, where timers, randomness and
//! network I/O are only allowed while a request is being serviced.
//!
//! The crate gates construction of the resolver's singleton collaborators
//! behind an external `ready` signal, lets the instance request its own
//! termination after a renewable idle period, and tears down long-lived
//! resources when `stop` fires.
//!
//! ## Architecture
//!
//! ```text
//! Host ── start hook ──► EventBus["ready"]
//!                            │
//!                            ▼
//!                     ServiceRegistry (CAS: Uninitialized → Initializing)
//!                            │ builds, leaves first:
//!                            │   BlocklistMatcher, DnsCache
//!                            │   DnsCacheResponder, DnsResolver
//!                            │   UserOp
//!                            │   CommandControl
//!                            ▼
//!                     EventBus["steady"] ──► request handlers
//!                                                 │ renew_idle_timeout(ms)
//!                                                 ▼
//!                                          IdleShutdownTimer
//!                                                 │ expiry
//! Host ── stop hook ──► EventBus["stop"] ◄────────┘
//!                            │
//!                            ▼
//!                     ShutdownCoordinator ── close() ──► DnsResolver
//!                            │
//!                            ▼
//!                     EventBus["closed"]
//! ```

pub mod app_state;
pub mod components;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
