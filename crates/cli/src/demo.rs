use svcrun_core::message::Envelope;
use svcrun_core::Message;
use svcrun_engine::{Service, ServiceContext, ServiceError};
use tracing::info;

/// A periodic, non-message-driven service: ticks on its own schedule and logs a heartbeat.
/// Stands in for the kind of always-on monitoring service the runtime is meant to host.
pub struct Heartbeat {
    period_ms: u64,
    ticks: u64,
}

impl Heartbeat {
    pub fn new(period_ms: u64) -> Self {
        Self { period_ms, ticks: 0 }
    }
}

impl Service for Heartbeat {
    fn period_ms(&self) -> u64 {
        self.period_ms
    }

    fn work_step(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
        self.ticks += 1;
        info!(service = ctx.name(), ticks = self.ticks, "heartbeat");
        Ok(())
    }
}

/// A message-driven service: logs whatever arrives in its inbox. Stands in for the
/// out-of-scope concrete services (a parser, a network logger) that would otherwise
/// consume routed messages.
pub struct Relay {
    period_ms: u64,
    received: u64,
}

impl Relay {
    pub fn new(period_ms: u64) -> Self {
        Self { period_ms, received: 0 }
    }
}

impl Service for Relay {
    fn period_ms(&self) -> u64 {
        self.period_ms
    }

    fn handle(&mut self, message: Box<dyn Message>, ctx: &ServiceContext) -> Result<(), ServiceError> {
        self.received += 1;
        info!(
            service = ctx.name(),
            type_tag = message.type_tag(),
            received = self.received,
            "relay received message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcrun_engine::{Placement, Scheduler};

    #[test]
    fn relay_counts_received_messages() {
        let scheduler = Scheduler::new(1);
        scheduler.register("relay", Box::new(Relay::new(10)), Placement::Balanced);
        scheduler.start_all();
        assert!(scheduler.send("relay", Box::new(Envelope::new("ping", ()))));
        std::thread::sleep(std::time::Duration::from_millis(100));
        scheduler.stop_all();
    }
}
