//! State-change notification relay.
//!
//! Presentation surfaces subscribe for a payload-free "state changed" tag
//! and re-read the store when it arrives. Delivery is fire-and-forget:
//! a surface that went away is dropped silently on the next broadcast.

use std::sync::mpsc;

/// The broadcast tag. Carries no payload beyond its purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanged;

/// Fan-out relay over std mpsc channels.
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<mpsc::Sender<StateChanged>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; the receiver sees every future broadcast.
    pub fn subscribe(&mut self) -> mpsc::Receiver<StateChanged> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    /// Broadcast to all live listeners, dropping disconnected ones.
    pub fn notify(&mut self) {
        self.listeners.retain(|tx| tx.send(StateChanged).is_ok());
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_to_every_subscriber() {
        let mut notifier = Notifier::new();
        let rx1 = notifier.subscribe();
        let rx2 = notifier.subscribe();

        notifier.notify();
        assert_eq!(rx1.try_recv(), Ok(StateChanged));
        assert_eq!(rx2.try_recv(), Ok(StateChanged));
    }

    #[test]
    fn dropped_listeners_are_pruned_silently() {
        let mut notifier = Notifier::new();
        let rx1 = notifier.subscribe();
        {
            let _rx2 = notifier.subscribe();
        } // rx2 gone

        notifier.notify(); // must not fail
        assert_eq!(rx1.try_recv(), Ok(StateChanged));
        assert_eq!(notifier.listener_count(), 1);
    }

    #[test]
    fn notify_without_listeners_is_a_no_op() {
        let mut notifier = Notifier::new();
        notifier.notify();
        assert_eq!(notifier.listener_count(), 0);
    }
}
