use std::sync::Arc;

use parking_lot::Mutex;

/// Mailbox
///
/// Single-slot handoff between a producer thread and the tick loop. Publishing
/// overwrites whatever is waiting, so the reader only ever sees the freshest
/// value and neither side blocks on the other for longer than a swap.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self { slot: Arc::clone(&self.slot) }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self { slot: Arc::new(Mutex::new(None)) }
    }
}

impl<T> Mailbox<T> {
    /// Replace the pending value, returning the one that was never read.
    pub fn publish(&self, value: T) -> Option<T> {
        self.slot.lock().replace(value)
    }

    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn latest_value_wins() {
        let mb = Mailbox::default();
        assert_eq!(mb.publish(1), None);
        assert_eq!(mb.publish(2), Some(1));
        assert!(!mb.is_empty());
        assert_eq!(mb.take(), Some(2));
        assert!(mb.is_empty());
        assert_eq!(mb.take(), None);
    }

    #[test]
    fn across_threads() {
        let mb = Mailbox::default();
        let tx = mb.clone();
        thread::spawn(move || {
            for i in 0..100 {
                tx.publish(i);
            }
        })
        .join()
        .unwrap();
        assert_eq!(mb.take(), Some(99));
    }
}
