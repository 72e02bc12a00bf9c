use thiserror::Error;

use crate::{allocator::AllocatorError, messages::error::ChannelError, types::ChannelIndex};

/// Errors that can occur during connection packet operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The connection configuration is invalid
    #[error("Invalid connection configuration: {0}")]
    InvalidConfig(#[from] ConnectionConfigError),

    /// The output buffer can't even hold the packet header
    #[error("Packet budget of {available_bits} bits is smaller than the {required_bits} bit packet header")]
    PacketBudgetTooSmall {
        available_bits: u32,
        required_bits: u32,
    },

    /// The per-peer allocator is exhausted
    #[error("Allocation failed while building or reading a packet: {0}")]
    AllocationFailed(#[from] AllocatorError),

    /// Serializing the packet failed
    #[error("Failed to write packet: {reason}")]
    PacketWriteFailed {
        reason: &'static str,
    },

    /// Deserializing the packet failed (SECURITY: potentially malicious payload)
    #[error("Failed to read packet: {reason}. Packet data may be corrupted or malicious")]
    PacketReadFailed {
        reason: &'static str,
    },

    /// The packet addresses a channel this connection doesn't have
    #[error("Packet entry addresses channel {channel}, but the connection has {num_channels} channels")]
    ChannelIndexOutOfRange {
        channel: usize,
        num_channels: usize,
    },

    /// The packet carries two entries for the same channel
    #[error("Packet carries more than one entry for channel {channel}")]
    DuplicateChannelEntry {
        channel: ChannelIndex,
    },

    /// The terminal check value is missing or wrong
    #[error("Packet check value mismatch. Writer and reader disagree on the packet layout")]
    CheckValueMismatch,

    /// A channel rejected its entry or message
    #[error("Channel {channel} error: {source}")]
    Channel {
        channel: ChannelIndex,
        source: ChannelError,
    },
}

impl ConnectionError {
    /// Wraps a channel error, lifting allocation failures to
    /// [`ConnectionError::AllocationFailed`] and read failures to
    /// [`ConnectionError::PacketReadFailed`]
    pub(crate) fn from_channel(channel: ChannelIndex, error: ChannelError) -> Self {
        match error {
            ChannelError::Allocation(error) => ConnectionError::AllocationFailed(error),
            ChannelError::Message(crate::MessageFactoryError::Allocation(error)) => {
                ConnectionError::AllocationFailed(error)
            }
            ChannelError::ReadFailed { reason } => ConnectionError::PacketReadFailed { reason },
            source => ConnectionError::Channel { channel, source },
        }
    }

    /// Whether the packet was rejected as untrusted input
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ConnectionError::PacketReadFailed { .. }
                | ConnectionError::ChannelIndexOutOfRange { .. }
                | ConnectionError::DuplicateChannelEntry { .. }
                | ConnectionError::CheckValueMismatch
                | ConnectionError::Channel {
                    source: ChannelError::Receiver(_),
                    ..
                }
        )
    }
}

/// Errors that can occur during connection configuration validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionConfigError {
    /// A connection needs at least one channel
    #[error("Connection must have at least one channel")]
    NoChannels,

    /// Too many channels configured
    #[error("Connection has {count} channels, but at most {max} are supported")]
    TooManyChannels {
        count: usize,
        max: usize,
    },

    /// Packets must be able to hold their own header
    #[error("Max packet size of {max_packet_size} bytes can't hold the {min} byte packet and channel headers")]
    PacketSizeTooSmall {
        max_packet_size: usize,
        min: usize,
    },

    /// Queue and window sizes must be powers of two within the id space
    #[error("Channel {channel} {field} of {size} must be a power of two no larger than {max}")]
    InvalidQueueSize {
        channel: ChannelIndex,
        field: &'static str,
        size: usize,
        max: usize,
    },

    /// Messages per packet out of range
    #[error("Channel {channel} max_messages_per_packet of {value} must be in 1..={max}")]
    InvalidMaxMessagesPerPacket {
        channel: ChannelIndex,
        value: usize,
        max: usize,
    },

    /// Per-channel packet budget can't hold the channel header
    #[error("Channel {channel} packet budget of {budget} bytes can't hold the channel header")]
    PacketBudgetTooSmall {
        channel: ChannelIndex,
        budget: usize,
    },

    /// Fragment size out of range
    #[error("Channel {channel} block_fragment_size of {size} must be in 1..=65535")]
    InvalidFragmentSize {
        channel: ChannelIndex,
        size: usize,
    },

    /// A block must be able to hold at least one full fragment
    #[error("Channel {channel} max_block_size of {max_block_size} is smaller than its block_fragment_size of {block_fragment_size}")]
    BlockSmallerThanFragment {
        channel: ChannelIndex,
        max_block_size: usize,
        block_fragment_size: usize,
    },

    /// Blocks would need more fragments than a fragment id can address
    #[error("Channel {channel} blocks may need {fragments} fragments, but at most {max} are supported")]
    TooManyFragments {
        channel: ChannelIndex,
        fragments: usize,
        max: usize,
    },
}
