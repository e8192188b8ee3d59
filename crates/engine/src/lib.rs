#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

//! A fixed pool of worker threads cooperatively executing long-lived services.
//!
//! Each [`Service`] runs on exactly one [`Worker`] for its lifetime; the owning
//! [`Scheduler`] places services (pinned or least-loaded), routes messages between them by
//! logical name, and reclaims completed services. Workers are dedicated OS threads: a
//! blocking user callback stalls only its own worker, never the rest of the pool.

pub mod inbox;
pub mod metrics;
pub mod scheduler;
pub mod service;
pub mod worker;

pub use inbox::Inbox;
pub use metrics::{Metrics, MetricsSnapshot};
pub use scheduler::{Scheduler, ServiceHandle};
pub use service::{MessageSender, SchedulerHandle, Service, ServiceContext, ServiceError};
pub use svcrun_core::config::Placement;
pub use worker::Worker;
