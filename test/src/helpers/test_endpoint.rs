use std::{collections::VecDeque, time::Duration};

use channelwire::{
    Allocator, ChannelError, ChannelIndex, Connection, ConnectionConfig, ConnectionError,
    MessageFactory, PacketIndex,
};

use crate::{
    helpers::test_protocol::{test_block_message, test_factory, test_message, Received},
    local_socket::Datagram,
};

/// How many recently received packets are acked on every outgoing packet
pub const ACK_WINDOW: usize = 32;

/// One side of a connection: numbers outgoing packets, piggybacks acks for
/// the packets it accepted, and drains every channel as packets arrive.
pub struct TestEndpoint {
    connection: Connection,
    next_packet_index: PacketIndex,
    time: Duration,
    recent_packets: VecDeque<PacketIndex>,
    received: Vec<Vec<Received>>,
    rejected: u64,
}

impl TestEndpoint {
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_allocator(config, Allocator::unbounded())
    }

    pub fn with_allocator(config: ConnectionConfig, allocator: Allocator) -> Self {
        let num_channels = config.num_channels();
        Self {
            connection: Connection::new(config, test_factory(allocator)),
            next_packet_index: 0,
            time: Duration::ZERO,
            recent_packets: VecDeque::with_capacity(ACK_WINDOW),
            received: vec![Vec::new(); num_channels],
            rejected: 0,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub fn factory(&self) -> &MessageFactory {
        self.connection.message_factory()
    }

    pub fn time(&self) -> Duration {
        self.time
    }

    pub fn send_message(
        &mut self,
        channel: ChannelIndex,
        sequence: u16,
        value: u32,
    ) -> Result<(), ChannelError> {
        let message = test_message(self.factory(), sequence, value);
        self.connection.send_message(channel, message)
    }

    pub fn send_block(
        &mut self,
        channel: ChannelIndex,
        sequence: u16,
        size: usize,
    ) -> Result<(), ChannelError> {
        let message = test_block_message(self.factory(), sequence, size);
        self.connection.send_message(channel, message)
    }

    pub fn advance_time(&mut self, delta: Duration) {
        self.time += delta;
        self.connection.advance_time(self.time);
    }

    /// Generates the next packet at the configured maximum size
    pub fn generate(&mut self) -> Result<Datagram, ConnectionError> {
        self.generate_with_buffer(self.connection.config().max_packet_size)
    }

    pub fn generate_with_buffer(
        &mut self,
        buffer_size: usize,
    ) -> Result<Datagram, ConnectionError> {
        let packet_index = self.next_packet_index;
        let mut buffer = vec![0u8; buffer_size];
        let written = self.connection.generate_packet(packet_index, &mut buffer)?;
        buffer.truncate(written);
        self.next_packet_index = self.next_packet_index.wrapping_add(1);
        Ok(Datagram {
            packet_index,
            acks: self.recent_packets.iter().copied().collect(),
            payload: buffer,
        })
    }

    /// Applies the datagram's acks, then its packet. Only packets the
    /// connection accepted are acked back.
    pub fn receive(&mut self, datagram: &Datagram) -> Result<(), ConnectionError> {
        self.connection.process_acks(&datagram.acks);
        let result = self
            .connection
            .process_packet(datagram.packet_index, &datagram.payload);
        match &result {
            Ok(()) => self.remember(datagram.packet_index),
            Err(_) => self.rejected += 1,
        }
        self.drain();
        result
    }

    fn remember(&mut self, packet_index: PacketIndex) {
        if self.recent_packets.contains(&packet_index) {
            return;
        }
        if self.recent_packets.len() == ACK_WINDOW {
            self.recent_packets.pop_front();
        }
        self.recent_packets.push_back(packet_index);
    }

    fn drain(&mut self) {
        for (channel, received) in self.received.iter_mut().enumerate() {
            while let Some(message) = self.connection.receive_message(channel) {
                received.push(Received::from_message(&message));
            }
        }
    }

    pub fn received(&self, channel: ChannelIndex) -> &[Received] {
        &self.received[channel]
    }

    pub fn received_sequences(&self, channel: ChannelIndex) -> Vec<u16> {
        self.received[channel].iter().map(Received::sequence).collect()
    }

    pub fn take_received(&mut self, channel: ChannelIndex) -> Vec<Received> {
        std::mem::take(&mut self.received[channel])
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn num_live_messages(&self) -> usize {
        self.factory().num_live_messages()
    }

    pub fn reset(&mut self) {
        self.connection.reset();
        self.recent_packets.clear();
        for received in &mut self.received {
            received.clear();
        }
    }
}
