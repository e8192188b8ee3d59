#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

//! Shared types for `svcrun`: configuration, messages, and error kinds used by both the
//! engine and the CLI driver.

pub mod config;
pub mod error;
pub mod message;

pub use config::{Placement, RuntimeConfig, ServiceConfig};
pub use error::ConfigError;
pub use message::Message;
