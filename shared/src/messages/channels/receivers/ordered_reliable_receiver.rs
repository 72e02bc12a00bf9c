use log::warn;

use crate::{
    allocator::{Allocator, AllocatorError},
    messages::{
        channels::{
            channel_config::ChannelConfig,
            channel_packet_data::{BlockFragment, IndexedMessage},
            receivers::{
                error::ReceiverError,
                fragment_receiver::{FragmentOutcome, FragmentReceiver},
            },
        },
        error::ChannelError,
        message::MessageRef,
    },
    sequence_buffer::SequenceBuffer,
    sequence_less_than,
    types::MessageIndex,
};

/// Where a received message id falls relative to the receive window
enum WindowPosition {
    /// Already delivered, or too far ahead for the peer to have sent it
    /// since, which only a long-delayed duplicate can be
    Behind,
    Inside,
    Ahead,
}

/// Receive side of a reliable ordered channel.
///
/// Messages are buffered by id until every earlier message has been handed
/// out, so the application sees each message once, in send order, however
/// the packets carrying them were lost, duplicated or reordered.
pub struct OrderedReliableReceiver {
    /// Id of the next message to hand out
    receive_message_index: MessageIndex,
    receive_queue: SequenceBuffer<MessageRef>,
    fragment_receiver: FragmentReceiver,
    /// Furthest past `receive_message_index` that a peer with the same
    /// configuration can send: its send window may start as far ahead as our
    /// receive window reaches
    max_lead: usize,
}

impl OrderedReliableReceiver {
    pub fn new(config: &ChannelConfig, allocator: &Allocator) -> Result<Self, AllocatorError> {
        Ok(Self {
            receive_message_index: 0,
            receive_queue: SequenceBuffer::with_capacity(config.receive_queue_size),
            fragment_receiver: FragmentReceiver::new(config, allocator)?,
            max_lead: config.receive_queue_size + config.send_queue_size,
        })
    }

    pub fn reset(&mut self) {
        self.receive_message_index = 0;
        self.receive_queue.reset();
        self.fragment_receiver.reset();
    }

    fn window_end(&self) -> MessageIndex {
        // receive queue size is at most 32768
        let size = self.receive_queue.size() as u16;
        self.receive_message_index.wrapping_add(size - 1)
    }

    fn position(&self, message_index: MessageIndex) -> WindowPosition {
        let distance = usize::from(message_index.wrapping_sub(self.receive_message_index));
        if distance < self.receive_queue.size() {
            WindowPosition::Inside
        } else if sequence_less_than(message_index, self.receive_message_index)
            || distance >= self.max_lead
        {
            WindowPosition::Behind
        } else {
            WindowPosition::Ahead
        }
    }

    fn window_exceeded(&self, message_index: MessageIndex) -> ReceiverError {
        ReceiverError::ReceiveWindowExceeded {
            message_index,
            window_start: self.receive_message_index,
            window_end: self.window_end(),
        }
    }

    /// Rejects a packet entry carrying any message id the sender could not
    /// have sent yet
    pub fn validate_messages(&self, messages: &[IndexedMessage]) -> Result<(), ReceiverError> {
        for indexed in messages {
            if let WindowPosition::Ahead = self.position(indexed.index) {
                return Err(self.window_exceeded(indexed.index));
            }
        }
        Ok(())
    }

    /// Buffers every message inside the window that isn't already buffered.
    /// Returns how many were new.
    pub fn receive_messages(&mut self, messages: Vec<IndexedMessage>) -> usize {
        let mut received = 0;
        for IndexedMessage { index, message } in messages {
            if !matches!(self.position(index), WindowPosition::Inside)
                || self.receive_queue.exists(index)
            {
                continue;
            }
            message.set_id(index);
            match self.receive_queue.insert(index, message) {
                Ok(_) => received += 1,
                Err(err) => warn!("Dropped received message {}: {}", index, err),
            }
        }
        received
    }

    /// Fragments are only taken for the message right after the newest one
    /// buffered, and only while it is inside the window
    fn expects_fragment(&self, fragment: &BlockFragment) -> bool {
        fragment.message_index == self.receive_queue.sequence()
            && matches!(self.position(fragment.message_index), WindowPosition::Inside)
    }

    pub fn validate_fragment(&self, fragment: &BlockFragment) -> Result<(), ReceiverError> {
        if !self.expects_fragment(fragment) {
            return Ok(());
        }
        self.fragment_receiver.validate(fragment)
    }

    /// Stores a fragment. Once its block is complete, the block message is
    /// buffered like any other message.
    pub fn receive_fragment(
        &mut self,
        fragment: BlockFragment,
        allocator: &Allocator,
    ) -> Result<FragmentOutcome, ChannelError> {
        if !self.expects_fragment(&fragment) {
            return Ok(FragmentOutcome::Ignored);
        }
        let outcome = self.fragment_receiver.receive(fragment, allocator)?;
        if let FragmentOutcome::Completed(message) = &outcome {
            let index = message.id();
            if let Err(err) = self.receive_queue.insert(index, message.clone()) {
                warn!("Dropped received block message {}: {}", index, err);
            }
        }
        Ok(outcome)
    }

    /// Hands out the next message in order, if it has arrived
    pub fn receive_message(&mut self) -> Option<MessageRef> {
        let message = self.receive_queue.remove(self.receive_message_index)?;
        self.receive_message_index = self.receive_message_index.wrapping_add(1);
        Some(message)
    }

    pub fn has_message(&self) -> bool {
        self.receive_queue.exists(self.receive_message_index)
    }
}
