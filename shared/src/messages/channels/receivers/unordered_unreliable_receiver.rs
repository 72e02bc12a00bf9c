use std::collections::VecDeque;

use crate::messages::message::MessageRef;

/// Bounded queue of messages received on an unreliable channel, handed out
/// in arrival order
pub struct UnorderedUnreliableReceiver {
    incoming_messages: VecDeque<MessageRef>,
    capacity: usize,
}

impl UnorderedUnreliableReceiver {
    pub fn new(capacity: usize) -> Self {
        Self {
            incoming_messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn reset(&mut self) {
        self.incoming_messages.clear();
    }

    /// Queues `message`, or returns it if the queue is full
    pub fn buffer_message(&mut self, message: MessageRef) -> Result<(), MessageRef> {
        if self.incoming_messages.len() >= self.capacity {
            return Err(message);
        }
        self.incoming_messages.push_back(message);
        Ok(())
    }

    pub fn receive_message(&mut self) -> Option<MessageRef> {
        self.incoming_messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.incoming_messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incoming_messages.is_empty()
    }
}
