//! Events emitted by the lifecycle engine for subscribers.

use cairn_types::{Amount, Signature, TransactionType, ValidationResult};

/// Ledger-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A transaction entered the unconfirmed pool. Fired after the admission
    /// commit, once per transaction.
    TransactionAccepted {
        signature: Signature,
        tx_type: TransactionType,
        fee: Amount,
    },
    /// A sweep dropped an unconfirmed transaction.
    TransactionEvicted {
        signature: Signature,
        result: ValidationResult,
    },
    BlockApplied { height: u32, count: usize },
    BlockOrphaned { height: u32 },
}

/// Synchronous fan-out event bus for ledger events.
///
/// Listeners are invoked inline on the emitting thread, after the blockchain
/// lock has been released; keep handlers fast anyway.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&LedgerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));

        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&LedgerEvent::BlockOrphaned { height: 3 });
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let bus = EventBus::default();
        assert!(bus.listeners.is_empty());
        bus.emit(&LedgerEvent::BlockApplied {
            height: 2,
            count: 0,
        });
    }

    #[test]
    fn listener_sees_each_variant() {
        let accepted = Arc::new(AtomicUsize::new(0));
        let evicted = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let a = Arc::clone(&accepted);
        let e = Arc::clone(&evicted);
        bus.subscribe(Box::new(move |event| match event {
            LedgerEvent::TransactionAccepted { .. } => {
                a.fetch_add(1, Ordering::SeqCst);
            }
            LedgerEvent::TransactionEvicted { .. } => {
                e.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }));

        bus.emit(&LedgerEvent::TransactionAccepted {
            signature: Signature::ZERO,
            tx_type: TransactionType::Payment,
            fee: Amount::whole(1),
        });
        bus.emit(&LedgerEvent::TransactionEvicted {
            signature: Signature::ZERO,
            result: ValidationResult::TimestampTooOld,
        });

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(evicted.load(Ordering::SeqCst), 1);
    }
}
