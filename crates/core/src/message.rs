use std::any::Any;
use std::fmt;

use chrono::{DateTime, Utc};

/// An opaque message routed between services.
///
/// Messages are immutable once enqueued: nothing past the point of construction mutates
/// `created_at` or the payload a message carries.
pub trait Message: Any + Send {
    /// A short, stable tag identifying the concrete message kind, used in diagnostics.
    fn type_tag(&self) -> &'static str;

    /// When this message was constructed.
    fn created_at(&self) -> DateTime<Utc>;

    /// Upcast for downstream downcasting via [`Any::downcast_ref`].
    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type_tag", &self.type_tag())
            .field("created_at", &self.created_at())
            .finish()
    }
}

/// A convenience wrapper that stamps an arbitrary payload with a creation time and tag,
/// implementing [`Message`] for it.
pub struct Envelope<T> {
    created_at: DateTime<Utc>,
    tag: &'static str,
    payload: T,
}

impl<T> Envelope<T> {
    pub fn new(tag: &'static str, payload: T) -> Self {
        Self {
            created_at: Utc::now(),
            tag,
            payload,
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T: Send + 'static> Message for Envelope<T> {
    fn type_tag(&self) -> &'static str {
        self.tag
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
