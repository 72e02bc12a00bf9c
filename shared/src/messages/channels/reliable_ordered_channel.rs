use std::time::Duration;

use log::debug;

use crate::{
    allocator::Allocator,
    constants::{
        CONSERVATIVE_CHANNEL_HEADER_BITS, CONSERVATIVE_FRAGMENT_HEADER_BITS,
        CONSERVATIVE_MESSAGE_HEADER_BITS,
    },
    messages::{
        channels::{
            channel::ChannelCounters,
            channel_config::ChannelConfig,
            channel_packet_data::{kind_bits, ChannelPacketData, ChannelPayload},
            receivers::{
                fragment_receiver::FragmentOutcome,
                ordered_reliable_receiver::OrderedReliableReceiver,
            },
            senders::{error::SenderError, reliable_sender::ReliableSender},
        },
        error::ChannelError,
        message::MessageRef,
        message_factory::MessageFactory,
    },
    types::{ChannelIndex, PacketIndex},
};

/// A channel delivering every message exactly once and in send order.
///
/// Unacknowledged messages are resent once `message_resend_time` has passed.
/// A block message is sent one fragment per packet, and nothing queued behind
/// it goes out until every fragment has been acknowledged.
pub struct ReliableOrderedChannel {
    channel_index: ChannelIndex,
    config: ChannelConfig,
    max_message_bits: u32,
    kind_bits: u32,
    allocator: Allocator,
    time: Duration,
    sender: ReliableSender,
    receiver: OrderedReliableReceiver,
    counters: ChannelCounters,
}

impl ReliableOrderedChannel {
    pub fn new(
        channel_index: ChannelIndex,
        config: &ChannelConfig,
        max_message_bits: u32,
        factory: &MessageFactory,
    ) -> Result<Self, ChannelError> {
        let allocator = factory.allocator().clone();
        let receiver = OrderedReliableReceiver::new(config, &allocator)?;
        Ok(Self {
            channel_index,
            config: config.clone(),
            max_message_bits,
            kind_bits: kind_bits(factory.kinds()),
            allocator,
            time: Duration::ZERO,
            sender: ReliableSender::new(config),
            receiver,
            counters: ChannelCounters::default(),
        })
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
        self.time = Duration::ZERO;
    }

    pub fn can_send_message(&self) -> bool {
        self.sender.can_send()
    }

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

        let measured_bits = message.payload_bit_length();
        let bits_needed = if message.is_block() {
            // fragment 0 carries the message alongside a full fragment
            let fragment_bits =
                u32::try_from(self.config.block_fragment_size * 8).unwrap_or(u32::MAX);
            CONSERVATIVE_FRAGMENT_HEADER_BITS
                .saturating_add(fragment_bits)
                .saturating_add(self.kind_bits)
                .saturating_add(measured_bits)
        } else {
            CONSERVATIVE_MESSAGE_HEADER_BITS
                .saturating_add(16)
                .saturating_add(self.kind_bits)
                .saturating_add(measured_bits)
        };
        if bits_needed > self.max_message_bits {
            return Err(SenderError::MessageTooLarge {
                bits_needed,
                bits_free: self.max_message_bits,
            }
            .into());
        }

        let index = self.sender.send(message, measured_bits)?;
        self.counters.messages_sent += 1;
        debug!(
            "Channel {} queued reliable message {}",
            self.channel_index, index
        );
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
        packet_index: PacketIndex,
        budget_bits: u32,
    ) -> Option<(ChannelPacketData, u32)> {
        if !self.sender.has_messages_to_send() {
            return None;
        }
        let budget_bits = self.cap_budget(budget_bits);

        if self.sender.sending_block() {
            let (fragment, bits) = self.sender.collect_fragment(
                packet_index,
                self.time,
                budget_bits,
                &self.config,
                self.kind_bits,
                &mut self.counters,
            )?;
            Some((ChannelPacketData::fragment(self.channel_index, fragment), bits))
        } else {
            let (messages, bits) = self.sender.collect_messages(
                packet_index,
                self.time,
                budget_bits,
                &self.config,
                self.kind_bits,
                &mut self.counters,
            )?;
            Some((ChannelPacketData::messages(self.channel_index, messages), bits))
        }
    }

    pub fn validate_packet_data(&self, entry: &ChannelPacketData) -> Result<(), ChannelError> {
        match &entry.payload {
            ChannelPayload::Messages(messages) => self.receiver.validate_messages(messages)?,
            ChannelPayload::Fragment(fragment) => self.receiver.validate_fragment(fragment)?,
        }
        Ok(())
    }

    pub fn process_packet_data(
        &mut self,
        entry: ChannelPacketData,
        _packet_index: PacketIndex,
    ) -> Result<(), ChannelError> {
        self.validate_packet_data(&entry)?;
        match entry.payload {
            ChannelPayload::Messages(messages) => {
                self.receiver.receive_messages(messages);
            }
            ChannelPayload::Fragment(fragment) => {
                match self.receiver.receive_fragment(fragment, &self.allocator)? {
                    FragmentOutcome::Ignored => {}
                    FragmentOutcome::Stored | FragmentOutcome::Completed(_) => {
                        self.counters.fragments_received += 1;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn process_ack(&mut self, packet_index: PacketIndex) -> bool {
        self.sender.process_ack(packet_index, &mut self.counters)
    }

    pub fn advance_time(&mut self, now: Duration) {
        self.time = self.time.max(now);
    }

    /// Messages sent and not yet acknowledged
    pub fn num_unacked(&self) -> usize {
        self.sender.num_unacked()
    }
}
