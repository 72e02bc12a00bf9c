use std::time::Duration;

use log::{debug, warn};

use crate::{
    connection::{
        connection_config::ConnectionConfig, connection_packet::ConnectionPacket,
        error::ConnectionError,
    },
    constants::{CONSERVATIVE_CHANNEL_HEADER_BITS, CONSERVATIVE_PACKET_HEADER_BITS},
    messages::{
        channels::channel::{Channel, ChannelCounters},
        error::ChannelError,
        message::MessageRef,
        message_factory::MessageFactory,
    },
    types::{ChannelIndex, PacketIndex},
};

/// Running totals kept by a connection. Cleared by [`Connection::reset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionCounters {
    pub packets_generated: u64,
    pub packets_processed: u64,
    pub packets_rejected: u64,
    /// Acks that retired something on at least one channel
    pub acks_processed: u64,
}

/// Multiplexes the channels of one peer into packets and back.
///
/// A connection doesn't send anything itself. Each tick, the owner asks it to
/// [`generate_packet`](Connection::generate_packet) and hands the bytes to the
/// transport, feeds it every received packet through
/// [`process_packet`](Connection::process_packet), reports which packets the
/// peer acknowledged through [`process_acks`](Connection::process_acks), and
/// moves its clock with [`advance_time`](Connection::advance_time).
pub struct Connection {
    config: ConnectionConfig,
    channels: Vec<Channel>,
    counters: ConnectionCounters,
    // declared last, so it outlives every message the channels hold
    message_factory: MessageFactory,
}

impl Connection {
    /// Create a new Connection. Panics if the configuration is invalid.
    pub fn new(config: ConnectionConfig, message_factory: MessageFactory) -> Self {
        match Self::try_new(config, message_factory) {
            Ok(connection) => connection,
            Err(err) => panic!("Failed to create connection: {}", err),
        }
    }

    pub fn try_new(
        config: ConnectionConfig,
        message_factory: MessageFactory,
    ) -> Result<Self, ConnectionError> {
        config.validate()?;

        let mut channels = Vec::with_capacity(config.num_channels());
        for (index, channel_config) in config.channels.iter().enumerate() {
            let max_message_bits = config.max_message_bits(channel_config);
            let channel = Channel::new(index, channel_config, max_message_bits, &message_factory)
                .map_err(|err| ConnectionError::from_channel(index, err))?;
            channels.push(channel);
        }

        Ok(Self {
            config,
            channels,
            counters: ConnectionCounters::default(),
            message_factory,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn message_factory(&self) -> &MessageFactory {
        &self.message_factory
    }

    pub fn counters(&self) -> &ConnectionCounters {
        &self.counters
    }

    pub fn channel_counters(&self, channel: ChannelIndex) -> &ChannelCounters {
        self.channel(channel).counters()
    }

    /// Clears every channel and the counters, so the connection can be
    /// reused for a new session
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
        self.counters = ConnectionCounters::default();
    }

    fn channel(&self, channel: ChannelIndex) -> &Channel {
        match self.channels.get(channel) {
            Some(channel) => channel,
            None => panic!(
                "Channel index {} is out of range for a connection with {} channels",
                channel,
                self.channels.len()
            ),
        }
    }

    fn channel_mut(&mut self, channel: ChannelIndex) -> &mut Channel {
        let num_channels = self.channels.len();
        match self.channels.get_mut(channel) {
            Some(channel) => channel,
            None => panic!(
                "Channel index {} is out of range for a connection with {} channels",
                channel, num_channels
            ),
        }
    }

    // Messages

    pub fn can_send_message(&self, channel: ChannelIndex) -> bool {
        self.channel(channel).can_send_message()
    }

    /// Queues `message` on `channel`. The channel keeps its own reference
    /// until the message is acknowledged or dropped.
    pub fn send_message(
        &mut self,
        channel: ChannelIndex,
        message: MessageRef,
    ) -> Result<(), ChannelError> {
        debug_assert!(
            self.message_factory.created(&message),
            "message was created by another connection's factory"
        );
        self.channel_mut(channel).send_message(message)
    }

    pub fn receive_message(&mut self, channel: ChannelIndex) -> Option<MessageRef> {
        self.channel_mut(channel).receive_message()
    }

    // Packets

    /// Fills `out` with the next packet, numbered `packet_index`, and returns
    /// its length. Channels take their share of the budget in channel order.
    ///
    /// The packet is never longer than the smaller of `out` and the configured
    /// maximum packet size. A packet with no entries is still a valid packet.
    pub fn generate_packet(
        &mut self,
        packet_index: PacketIndex,
        out: &mut [u8],
    ) -> Result<usize, ConnectionError> {
        let max_bytes = out.len().min(self.config.max_packet_size);
        let max_bits = u32::try_from(max_bytes.saturating_mul(8)).unwrap_or(u32::MAX);
        if max_bits < CONSERVATIVE_PACKET_HEADER_BITS {
            return Err(ConnectionError::PacketBudgetTooSmall {
                available_bits: max_bits,
                required_bits: CONSERVATIVE_PACKET_HEADER_BITS,
            });
        }

        let allocation = self
            .message_factory
            .allocator()
            .try_allocate(ConnectionPacket::entry_bytes(self.channels.len()))?;

        let mut available_bits = max_bits - CONSERVATIVE_PACKET_HEADER_BITS;
        let mut entries = Vec::with_capacity(self.channels.len());
        for channel in &mut self.channels {
            if available_bits <= CONSERVATIVE_CHANNEL_HEADER_BITS {
                break;
            }
            let budget_bits = available_bits - CONSERVATIVE_CHANNEL_HEADER_BITS;
            if let Some((entry, used_bits)) = channel.get_packet_data(packet_index, budget_bits) {
                available_bits =
                    available_bits.saturating_sub(CONSERVATIVE_CHANNEL_HEADER_BITS + used_bits);
                entries.push(entry);
            }
        }

        let packet = ConnectionPacket::with_allocation(entries, allocation);
        let written =
            packet.write(&self.config, self.message_factory.kinds(), &mut out[..max_bytes])?;
        self.counters.packets_generated += 1;
        debug!(
            "Generated packet {} with {} channel entries, {} bytes",
            packet_index,
            packet.len(),
            written
        );
        Ok(written)
    }

    /// Reads packet `packet_index` and hands each entry to its channel.
    ///
    /// A packet that fails to read or that any channel rejects is dropped
    /// whole, before any channel sees it. Running out of memory while a
    /// channel applies its entry stops processing there; entries already
    /// applied stay applied, and the sender's retransmission covers the rest.
    pub fn process_packet(
        &mut self,
        packet_index: PacketIndex,
        data: &[u8],
    ) -> Result<(), ConnectionError> {
        let packet = match ConnectionPacket::read(data, &self.config, &self.message_factory) {
            Ok(packet) => packet,
            Err(err) => return self.reject(packet_index, err),
        };

        for entry in packet.entries() {
            let channel = entry.channel_index;
            if let Err(err) = self.channels[channel].validate_packet_data(entry) {
                return self.reject(packet_index, ConnectionError::from_channel(channel, err));
            }
        }

        for entry in packet.into_entries() {
            let channel = entry.channel_index;
            if let Err(err) = self.channels[channel].process_packet_data(entry, packet_index) {
                return self.reject(packet_index, ConnectionError::from_channel(channel, err));
            }
        }

        self.counters.packets_processed += 1;
        debug!("Processed packet {}", packet_index);
        Ok(())
    }

    fn reject(
        &mut self,
        packet_index: PacketIndex,
        err: ConnectionError,
    ) -> Result<(), ConnectionError> {
        self.counters.packets_rejected += 1;
        warn!("Rejected packet {}: {}", packet_index, err);
        Err(err)
    }

    /// Tells every channel which packets the peer acknowledged. Acks for
    /// packets already acknowledged, or never sent, change nothing.
    pub fn process_acks(&mut self, acks: &[PacketIndex]) {
        for &packet_index in acks {
            let mut retired = false;
            for channel in &mut self.channels {
                retired |= channel.process_ack(packet_index);
            }
            if retired {
                self.counters.acks_processed += 1;
            }
        }
    }

    pub fn advance_time(&mut self, now: Duration) {
        for channel in &mut self.channels {
            channel.advance_time(now);
        }
    }
}
