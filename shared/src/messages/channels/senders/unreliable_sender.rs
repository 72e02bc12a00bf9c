use std::collections::VecDeque;

use crate::messages::{channels::channel_config::OverflowPolicy, message::MessageRef};

/// Bounded best-effort send queue of an unreliable channel
pub struct UnreliableSender {
    queue: VecDeque<MessageRef>,
    capacity: usize,
    overflow: OverflowPolicy,
}

impl UnreliableSender {
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            overflow,
        }
    }

    pub fn reset(&mut self) {
        self.queue.clear();
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Queues `message`. When the queue is full, one message is dropped
    /// according to the overflow policy and returned.
    pub fn push(&mut self, message: MessageRef) -> Option<MessageRef> {
        if !self.is_full() {
            self.queue.push_back(message);
            return None;
        }
        match self.overflow {
            OverflowPolicy::DropNewest => Some(message),
            OverflowPolicy::DropOldest => {
                let dropped = self.queue.pop_front();
                self.queue.push_back(message);
                dropped
            }
        }
    }

    pub fn pop(&mut self) -> Option<MessageRef> {
        self.queue.pop_front()
    }
}
