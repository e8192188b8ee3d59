use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use svcrun_core::Message;

/// Default inbox capacity used when a service does not request a specific one.
pub const DEFAULT_CAPACITY: usize = 256;

/// A bounded, non-blocking FIFO of messages addressed to a single service.
///
/// Safe for concurrent producers; intended to be drained by a single consumer (the owning
/// worker). `offer` never blocks: a full inbox simply rejects the message.
pub struct Inbox {
    tx: Sender<Box<dyn Message>>,
    rx: Receiver<Box<dyn Message>>,
    capacity: usize,
}

impl Inbox {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity > 0 { capacity } else { DEFAULT_CAPACITY };
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Attempts to enqueue `message`. Returns `false` if the inbox is full.
    pub fn offer(&self, message: Box<dyn Message>) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Dequeues the head message, if any, without blocking.
    pub fn poll(&self) -> Option<Box<dyn Message>> {
        match self.rx.try_recv() {
            Ok(m) => Some(m),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcrun_core::message::Envelope;

    fn msg(tag: &'static str, payload: u32) -> Box<dyn Message> {
        Box::new(Envelope::new(tag, payload))
    }

    #[test]
    fn offer_then_poll_preserves_order() {
        let inbox = Inbox::new(4);
        assert!(inbox.offer(msg("a", 1)));
        assert!(inbox.offer(msg("a", 2)));
        let first = inbox.poll().unwrap();
        let second = inbox.poll().unwrap();
        assert_eq!(
            first.as_any().downcast_ref::<Envelope<u32>>().unwrap().payload(),
            &1
        );
        assert_eq!(
            second.as_any().downcast_ref::<Envelope<u32>>().unwrap().payload(),
            &2
        );
    }

    #[test]
    fn full_inbox_rejects_offer() {
        let inbox = Inbox::new(1);
        assert!(inbox.offer(msg("a", 1)));
        assert!(!inbox.offer(msg("a", 2)));
        assert_eq!(inbox.len(), 1);
    }

    #[test]
    fn draining_one_message_frees_exactly_one_slot() {
        let inbox = Inbox::new(2);
        assert!(inbox.offer(msg("a", 1)));
        assert!(inbox.offer(msg("a", 2)));
        assert!(!inbox.offer(msg("a", 3)));
        assert!(inbox.poll().is_some());
        assert!(inbox.offer(msg("a", 4)));
        assert!(!inbox.offer(msg("a", 5)));
    }

    #[test]
    fn poll_on_empty_inbox_returns_none() {
        let inbox = Inbox::new(4);
        assert!(inbox.poll().is_none());
    }
}
