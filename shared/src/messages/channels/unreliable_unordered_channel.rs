use log::debug;

use crate::{
    constants::{CONSERVATIVE_CHANNEL_HEADER_BITS, CONSERVATIVE_MESSAGE_HEADER_BITS, GIVE_UP_BITS},
    messages::{
        channels::{
            channel::ChannelCounters,
            channel_config::{ChannelConfig, OverflowPolicy},
            channel_packet_data::{
                inline_block_bits, kind_bits, ChannelPacketData, ChannelPayload, IndexedMessage,
            },
            receivers::{
                error::ReceiverError, unordered_unreliable_receiver::UnorderedUnreliableReceiver,
            },
            senders::{error::SenderError, unreliable_sender::UnreliableSender},
        },
        error::ChannelError,
        message::MessageRef,
        message_factory::MessageFactory,
    },
    types::{ChannelIndex, PacketIndex},
};

/// A best-effort channel. Messages go out at most once, in queue order, and
/// are handed out on arrival. Anything that doesn't fit the packet it was
/// picked for is dropped rather than queued again.
pub struct UnreliableUnorderedChannel {
    channel_index: ChannelIndex,
    config: ChannelConfig,
    max_message_bits: u32,
    kind_bits: u32,
    sender: UnreliableSender,
    receiver: UnorderedUnreliableReceiver,
    counters: ChannelCounters,
}

impl UnreliableUnorderedChannel {
    pub fn new(
        channel_index: ChannelIndex,
        config: &ChannelConfig,
        max_message_bits: u32,
        factory: &MessageFactory,
    ) -> Self {
        Self {
            channel_index,
            config: config.clone(),
            max_message_bits,
            kind_bits: kind_bits(factory.kinds()),
            sender: UnreliableSender::new(config.send_queue_size, config.overflow),
            receiver: UnorderedUnreliableReceiver::new(config.receive_queue_size),
            counters: ChannelCounters::default(),
        }
    }

    pub fn channel_index(&self) -> ChannelIndex {
        self.channel_index
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn counters(&self) -> &ChannelCounters {
        &self.counters
    }

    pub fn reset(&mut self) {
        self.sender.reset();
        self.receiver.reset();
        self.counters = ChannelCounters::default();
    }

    pub fn can_send_message(&self) -> bool {
        !self.sender.is_full()
    }

    fn message_bits(&self, message: &MessageRef) -> u32 {
        let mut bits = self.kind_bits.saturating_add(message.payload_bit_length());
        if message.is_block() {
            bits = bits.saturating_add(inline_block_bits(&self.config, message.block_size()));
        }
        bits
    }

    /// Queues `message`. A full queue drops a message according to the
    /// channel's overflow policy, which is counted but not an error.
    pub fn send_message(&mut self, message: MessageRef) -> Result<(), ChannelError> {
        if message.is_block() {
            if self.config.disable_blocks {
                return Err(SenderError::BlocksDisabled.into());
            }
            let Some(block) = message.block() else {
                return Err(SenderError::MissingBlock {
                    kind: message.kind().net_id(),
                }
                .into());
            };
            if block.len() > self.config.max_block_size {
                return Err(SenderError::BlockTooLarge {
                    block_size: block.len(),
                    max_block_size: self.config.max_block_size,
                }
                .into());
            }
        }

        let bits_needed =
            CONSERVATIVE_MESSAGE_HEADER_BITS.saturating_add(self.message_bits(&message));
        if bits_needed > self.max_message_bits {
            return Err(SenderError::MessageTooLarge {
                bits_needed,
                bits_free: self.max_message_bits,
            }
            .into());
        }

        if let Some(dropped) = self.sender.push(message) {
            self.counters.messages_dropped += 1;
            debug!(
                "Channel {} send queue full, dropped a message of kind {}",
                self.channel_index,
                dropped.kind().net_id()
            );
            if self.config.overflow == OverflowPolicy::DropNewest {
                return Ok(());
            }
        }
        self.counters.messages_sent += 1;
        Ok(())
    }

    pub fn receive_message(&mut self) -> Option<MessageRef> {
        let message = self.receiver.receive_message()?;
        self.counters.messages_received += 1;
        Some(message)
    }

    fn cap_budget(&self, budget_bits: u32) -> u32 {
        match self.config.packet_budget {
            Some(budget) => {
                let channel_bits = u32::try_from(budget.saturating_mul(8)).unwrap_or(u32::MAX);
                budget_bits.min(channel_bits.saturating_sub(CONSERVATIVE_CHANNEL_HEADER_BITS))
            }
            None => budget_bits,
        }
    }

    pub fn get_packet_data(
        &mut self,
        _packet_index: PacketIndex,
        budget_bits: u32,
    ) -> Option<(ChannelPacketData, u32)> {
        if self.sender.is_empty() {
            return None;
        }
        let budget_bits = self.cap_budget(budget_bits);

        let mut used_bits = CONSERVATIVE_MESSAGE_HEADER_BITS;
        let mut messages = Vec::new();
        while messages.len() < self.config.max_messages_per_packet {
            if budget_bits.saturating_sub(used_bits) < GIVE_UP_BITS {
                break;
            }
            let Some(message) = self.sender.pop() else {
                break;
            };

            let message_bits = self.message_bits(&message);
            if used_bits.saturating_add(message_bits) > budget_bits {
                self.counters.messages_dropped += 1;
                debug!(
                    "Channel {} dropped a message of {} bits that didn't fit the packet",
                    self.channel_index, message_bits
                );
                continue;
            }
            used_bits += message_bits;
            messages.push(IndexedMessage::new(0, message));
        }

        if messages.is_empty() {
            return None;
        }
        Some((
            ChannelPacketData::messages(self.channel_index, messages),
            used_bits,
        ))
    }

    pub fn validate_packet_data(&self, entry: &ChannelPacketData) -> Result<(), ChannelError> {
        match entry.payload {
            ChannelPayload::Messages(_) => Ok(()),
            ChannelPayload::Fragment(_) => Err(ReceiverError::InvalidFragment {
                reason: "fragment on an unreliable channel",
            }
            .into()),
        }
    }

    /// Queues every received message for delivery, stamped with the index
    /// of the packet it came in. Messages beyond the receive queue's capacity
    /// are dropped.
    pub fn process_packet_data(
        &mut self,
        entry: ChannelPacketData,
        packet_index: PacketIndex,
    ) -> Result<(), ChannelError> {
        self.validate_packet_data(&entry)?;
        let ChannelPayload::Messages(messages) = entry.payload else {
            return Ok(());
        };
        for IndexedMessage { message, .. } in messages {
            message.set_id(packet_index);
            if self.receiver.buffer_message(message).is_err() {
                self.counters.messages_dropped += 1;
            }
        }
        Ok(())
    }
}
