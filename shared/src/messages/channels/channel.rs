use std::time::Duration;

use crate::{
    messages::{
        channels::{
            channel_config::{ChannelConfig, ChannelMode},
            channel_packet_data::ChannelPacketData,
            reliable_ordered_channel::ReliableOrderedChannel,
            unreliable_unordered_channel::UnreliableUnorderedChannel,
        },
        error::ChannelError,
        message::MessageRef,
        message_factory::MessageFactory,
    },
    types::{ChannelIndex, PacketIndex},
};

/// Running totals kept by each channel. Cleared by [`Channel::reset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelCounters {
    /// Messages accepted by `send_message`
    pub messages_sent: u64,
    /// Messages handed out by `receive_message`
    pub messages_received: u64,
    /// Messages discarded by a full queue or because they didn't fit a packet
    pub messages_dropped: u64,
    pub messages_acked: u64,
    /// Messages and block fragments sent again after their resend time
    pub messages_resent: u64,
    pub fragments_sent: u64,
    pub fragments_received: u64,
}

/// One logical message stream of a connection
pub enum Channel {
    ReliableOrdered(ReliableOrderedChannel),
    UnreliableUnordered(UnreliableUnorderedChannel),
}

impl Channel {
    /// Creates the channel `config.mode` asks for. `max_message_bits` is the
    /// most one message may take in a packet; larger messages are refused on
    /// send.
    pub fn new(
        channel_index: ChannelIndex,
        config: &ChannelConfig,
        max_message_bits: u32,
        factory: &MessageFactory,
    ) -> Result<Self, ChannelError> {
        Ok(match config.mode {
            ChannelMode::ReliableOrdered => Channel::ReliableOrdered(ReliableOrderedChannel::new(
                channel_index,
                config,
                max_message_bits,
                factory,
            )?),
            ChannelMode::UnreliableUnordered => Channel::UnreliableUnordered(
                UnreliableUnorderedChannel::new(channel_index, config, max_message_bits, factory),
            ),
        })
    }

    pub fn mode(&self) -> ChannelMode {
        self.config().mode
    }

    pub fn channel_index(&self) -> ChannelIndex {
        match self {
            Channel::ReliableOrdered(channel) => channel.channel_index(),
            Channel::UnreliableUnordered(channel) => channel.channel_index(),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        match self {
            Channel::ReliableOrdered(channel) => channel.config(),
            Channel::UnreliableUnordered(channel) => channel.config(),
        }
    }

    pub fn counters(&self) -> &ChannelCounters {
        match self {
            Channel::ReliableOrdered(channel) => channel.counters(),
            Channel::UnreliableUnordered(channel) => channel.counters(),
        }
    }

    /// Drops everything queued, in flight or partially received, and clears
    /// the counters
    pub fn reset(&mut self) {
        match self {
            Channel::ReliableOrdered(channel) => channel.reset(),
            Channel::UnreliableUnordered(channel) => channel.reset(),
        }
    }

    pub fn can_send_message(&self) -> bool {
        match self {
            Channel::ReliableOrdered(channel) => channel.can_send_message(),
            Channel::UnreliableUnordered(channel) => channel.can_send_message(),
        }
    }

    pub fn send_message(&mut self, message: MessageRef) -> Result<(), ChannelError> {
        match self {
            Channel::ReliableOrdered(channel) => channel.send_message(message),
            Channel::UnreliableUnordered(channel) => channel.send_message(message),
        }
    }

    pub fn receive_message(&mut self) -> Option<MessageRef> {
        match self {
            Channel::ReliableOrdered(channel) => channel.receive_message(),
            Channel::UnreliableUnordered(channel) => channel.receive_message(),
        }
    }

    /// This channel's contribution to packet `packet_index`, using at most
    /// `budget_bits` (channel header excluded). Returns the entry and the bits
    /// it was estimated to take, or `None` if nothing is pending or fits.
    pub fn get_packet_data(
        &mut self,
        packet_index: PacketIndex,
        budget_bits: u32,
    ) -> Option<(ChannelPacketData, u32)> {
        match self {
            Channel::ReliableOrdered(channel) => channel.get_packet_data(packet_index, budget_bits),
            Channel::UnreliableUnordered(channel) => {
                channel.get_packet_data(packet_index, budget_bits)
            }
        }
    }

    /// Checks a received entry without changing any state
    pub fn validate_packet_data(&self, entry: &ChannelPacketData) -> Result<(), ChannelError> {
        match self {
            Channel::ReliableOrdered(channel) => channel.validate_packet_data(entry),
            Channel::UnreliableUnordered(channel) => channel.validate_packet_data(entry),
        }
    }

    pub fn process_packet_data(
        &mut self,
        entry: ChannelPacketData,
        packet_index: PacketIndex,
    ) -> Result<(), ChannelError> {
        match self {
            Channel::ReliableOrdered(channel) => channel.process_packet_data(entry, packet_index),
            Channel::UnreliableUnordered(channel) => {
                channel.process_packet_data(entry, packet_index)
            }
        }
    }

    /// Returns whether the ack retired anything on this channel for the
    /// first time
    pub fn process_ack(&mut self, packet_index: PacketIndex) -> bool {
        match self {
            Channel::ReliableOrdered(channel) => channel.process_ack(packet_index),
            Channel::UnreliableUnordered(_) => false,
        }
    }

    /// Sets the channel's clock. `now` only moves forward.
    pub fn advance_time(&mut self, now: Duration) {
        match self {
            Channel::ReliableOrdered(channel) => channel.advance_time(now),
            Channel::UnreliableUnordered(_) => {}
        }
    }
}
