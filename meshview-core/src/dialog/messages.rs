//! Queue of user-facing messages shown one at a time in a modal.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// FIFO of pending messages.
///
/// Clones share the same queue, so producers anywhere in the program can
/// push while the render thread drains.
#[derive(Clone, Debug, Default)]
pub struct MessageQueue {
    inner: Arc<Mutex<VecDeque<String>>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A panic while holding the lock leaves the queue itself intact.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, message: impl Into<String>) {
        self.lock().push_back(message.into());
    }

    /// The message currently on display.
    pub fn front(&self) -> Option<String> {
        self.lock().front().cloned()
    }

    /// Dismisses the front message.
    pub fn pop(&self) -> Option<String> {
        self.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_fifo_across_clones() {
        let queue = MessageQueue::new();
        let producer = queue.clone();
        producer.push("first");
        queue.push("second");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.front().as_deref(), Some("first"));
        assert_eq!(queue.pop().as_deref(), Some("first"));
        assert_eq!(producer.pop().as_deref(), Some("second"));
        assert!(queue.is_empty());
    }

    #[test]
    fn producers_on_other_threads() {
        let queue = MessageQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let queue = queue.clone();
                std::thread::spawn(move || queue.push(format!("worker {i}")))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 4);
    }
}
