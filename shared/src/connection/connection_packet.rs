use std::mem::size_of;

use channelwire_serde::{
    bits_required, de_check, de_ranged, ser_check, ser_ranged, BitReader, BitWrite, BitWriter,
};

use crate::{
    allocator::{Allocation, Allocator, AllocatorError},
    connection::{connection_config::ConnectionConfig, error::ConnectionError},
    constants::MAX_CHANNELS,
    messages::{
        channels::channel_packet_data::ChannelPacketData, message_factory::MessageFactory,
        message_kinds::MessageKinds,
    },
};

/// The contents of one packet: at most one [`ChannelPacketData`] per channel,
/// in ascending channel order when generated by a connection.
///
/// Entry storage is charged to the peer's allocator for as long as the packet
/// lives.
pub struct ConnectionPacket {
    entries: Vec<ChannelPacketData>,
    _allocation: Option<Allocation>,
}

impl ConnectionPacket {
    /// A packet with no entries
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            _allocation: None,
        }
    }

    /// Charges storage for `entries` to `allocator`
    pub fn try_new(
        entries: Vec<ChannelPacketData>,
        allocator: &Allocator,
    ) -> Result<Self, AllocatorError> {
        let allocation = allocator.try_allocate(Self::entry_bytes(entries.len()))?;
        Ok(Self::with_allocation(entries, allocation))
    }

    pub(crate) fn with_allocation(entries: Vec<ChannelPacketData>, allocation: Allocation) -> Self {
        Self {
            entries,
            _allocation: Some(allocation),
        }
    }

    /// Bytes charged for storing `count` entries
    pub(crate) fn entry_bytes(count: usize) -> usize {
        count.saturating_mul(size_of::<ChannelPacketData>())
    }

    pub fn entries(&self) -> &[ChannelPacketData] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ChannelPacketData> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the packet, including its terminal check value. Also used with a
    /// [`channelwire_serde::BitCounter`] to measure it.
    pub(crate) fn ser(
        &self,
        writer: &mut dyn BitWrite,
        config: &ConnectionConfig,
        kinds: &MessageKinds,
    ) {
        // at most 64 channels
        let num_channels = config.num_channels() as u32;
        ser_ranged(writer, self.entries.len() as u32, 0, num_channels);
        let index_bits = bits_required(0, num_channels - 1);
        for entry in &self.entries {
            writer.write_bits(entry.channel_index as u32, index_bits);
            entry.ser(writer, &config.channels[entry.channel_index], kinds);
        }
        ser_check(writer);
    }

    /// Writes the packet into `out`, returning the number of bytes written
    pub fn write(
        &self,
        config: &ConnectionConfig,
        kinds: &MessageKinds,
        out: &mut [u8],
    ) -> Result<usize, ConnectionError> {
        let mut writer = BitWriter::with_max_bytes(out.len().min(config.max_packet_size));
        self.ser(&mut writer, config, kinds);
        let bytes = writer.finish().map_err(|_| ConnectionError::PacketWriteFailed {
            reason: "packet exceeds the output buffer",
        })?;
        out[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Reads a whole packet. Any malformed count, channel index or entry, a
    /// bad check value, or bytes left over after it reject the packet.
    pub fn read(
        data: &[u8],
        config: &ConnectionConfig,
        factory: &MessageFactory,
    ) -> Result<Self, ConnectionError> {
        let mut reader = BitReader::new(data);
        let num_channels = config.num_channels();
        // at most 64 channels
        let count = de_ranged(&mut reader, 0, num_channels as u32).map_err(|_| {
            ConnectionError::PacketReadFailed {
                reason: "entry count",
            }
        })? as usize;

        let allocation = factory.allocator().try_allocate(Self::entry_bytes(count))?;
        let mut entries = Vec::with_capacity(count);
        let index_bits = bits_required(0, num_channels as u32 - 1);
        let mut seen: u64 = 0;
        debug_assert!(num_channels <= MAX_CHANNELS);

        for _ in 0..count {
            let channel = reader
                .read_bits(index_bits)
                .map_err(|_| ConnectionError::PacketReadFailed {
                    reason: "channel index",
                })? as usize;
            if channel >= num_channels {
                return Err(ConnectionError::ChannelIndexOutOfRange {
                    channel,
                    num_channels,
                });
            }
            if seen & (1 << channel) != 0 {
                return Err(ConnectionError::DuplicateChannelEntry { channel });
            }
            seen |= 1 << channel;

            let entry =
                ChannelPacketData::de(&mut reader, channel, &config.channels[channel], factory)
                    .map_err(|err| ConnectionError::from_channel(channel, err))?;
            entries.push(entry);
        }

        de_check(&mut reader).map_err(|_| ConnectionError::CheckValueMismatch)?;
        if reader.bits_remaining() != 0 {
            return Err(ConnectionError::PacketReadFailed {
                reason: "trailing bytes after check value",
            });
        }
        Ok(Self::with_allocation(entries, allocation))
    }
}
