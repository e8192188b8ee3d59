use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use svcrun_core::Message;
use thiserror::Error;

use crate::inbox::Inbox;

/// Error a user callback may return. The engine never lets this escape the worker loop or a
/// router call; it is always converted into a logged diagnostic plus a metrics update.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

impl ServiceError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Sends a message to another service by logical name, without exposing the rest of the
/// scheduler's API to service code.
pub trait MessageSender: Send + Sync {
    fn send(&self, target: &str, message: Box<dyn Message>) -> bool;
}

/// A non-owning handle services use to reach the scheduler, typically only to call `send`.
#[derive(Clone)]
pub struct SchedulerHandle(pub(crate) Arc<dyn MessageSender>);

impl SchedulerHandle {
    pub fn send(&self, target: &str, message: Box<dyn Message>) -> bool {
        self.0.send(target, message)
    }
}

/// Everything a service's callbacks see besides their own state: its logical name, its
/// inbox, its running flag, and a handle back to the scheduler for outbound messages.
pub struct ServiceContext {
    name: String,
    inbox: Arc<Inbox>,
    running: Arc<AtomicBool>,
    scheduler: SchedulerHandle,
}

impl ServiceContext {
    pub(crate) fn new(
        name: String,
        inbox: Arc<Inbox>,
        running: Arc<AtomicBool>,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            name,
            inbox,
            running,
            scheduler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Cooperative stop: the worker observes this before its next step.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }
}

/// The lifecycle contract every runtime service implements: `setup` runs once, `work_step`
/// runs repeatedly while due, `cleanup` runs once after the service is removed.
pub trait Service: Send {
    /// Requested minimum interval between work steps, in milliseconds. Non-positive values
    /// are replaced by [`crate::worker::DEFAULT_SERVICE_PERIOD_MS`] at registration time.
    fn period_ms(&self) -> u64 {
        crate::worker::DEFAULT_SERVICE_PERIOD_MS
    }

    /// Capacity of this service's inbox. Non-positive values fall back to
    /// [`crate::inbox::DEFAULT_CAPACITY`].
    fn inbox_capacity(&self) -> usize {
        crate::inbox::DEFAULT_CAPACITY
    }

    /// Called at most once, before the first work step.
    fn setup(&mut self, _ctx: &ServiceContext) -> Result<(), ServiceError> {
        Ok(())
    }

    /// One unit of work. The default implementation drains the inbox, dispatching each
    /// message to [`Service::handle`] until empty or the service is stopped mid-drain.
    fn work_step(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
        while ctx.is_running() {
            match ctx.inbox().poll() {
                Some(message) => self.handle(message, ctx)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Invoked by the default `work_step` for each dequeued message.
    fn handle(&mut self, _message: Box<dyn Message>, _ctx: &ServiceContext) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Called at most once, after the service has stopped and left its worker.
    fn cleanup(&mut self, _ctx: &ServiceContext) {}

    /// Whether this service should be swept on the next `reap_completed`. Defaults to
    /// "no longer running".
    fn is_complete(&self, ctx: &ServiceContext) -> bool {
        !ctx.is_running()
    }
}
