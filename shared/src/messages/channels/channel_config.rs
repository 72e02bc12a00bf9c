use std::time::Duration;

use crate::{
    connection::error::ConnectionConfigError,
    constants::{
        CONSERVATIVE_CHANNEL_HEADER_BITS, MAX_FRAGMENTS_PER_BLOCK, MAX_MESSAGES_PER_PACKET,
        MAX_QUEUE_SIZE,
    },
    types::ChannelIndex,
};

/// Delivery guarantee of a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    /// Every message is delivered exactly once, in send order. Large block
    /// messages are fragmented.
    ReliableOrdered,
    /// Messages are delivered at most once, in arrival order. Nothing is
    /// resent.
    UnreliableUnordered,
}

impl ChannelMode {
    pub fn is_reliable(&self) -> bool {
        matches!(self, ChannelMode::ReliableOrdered)
    }
}

/// What an unreliable channel does with a message sent while its send queue
/// is full
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OverflowPolicy {
    /// The message being sent is dropped
    #[default]
    DropNewest,
    /// The oldest queued message is dropped to make room
    DropOldest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    pub mode: ChannelMode,
    /// Reject block messages on this channel
    pub disable_blocks: bool,
    /// Number of sent packets remembered for acknowledgment
    pub sent_packet_buffer_size: usize,
    pub send_queue_size: usize,
    pub receive_queue_size: usize,
    pub max_messages_per_packet: usize,
    /// Bytes this channel may use in one packet, on top of the packet's own
    /// limit
    pub packet_budget: Option<usize>,
    pub max_block_size: usize,
    pub block_fragment_size: usize,
    pub message_resend_time: Duration,
    pub fragment_resend_time: Duration,
    pub overflow: OverflowPolicy,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            mode: ChannelMode::ReliableOrdered,
            disable_blocks: false,
            sent_packet_buffer_size: 1024,
            send_queue_size: 1024,
            receive_queue_size: 1024,
            max_messages_per_packet: 256,
            packet_budget: None,
            max_block_size: 256 * 1024,
            block_fragment_size: 1024,
            message_resend_time: Duration::from_millis(100),
            fragment_resend_time: Duration::from_millis(250),
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

impl ChannelConfig {
    pub fn reliable_ordered() -> Self {
        Self::default()
    }

    pub fn unreliable_unordered() -> Self {
        Self {
            mode: ChannelMode::UnreliableUnordered,
            ..Self::default()
        }
    }

    /// Number of fragments the largest allowed block is split into
    pub fn max_fragments_per_block(&self) -> usize {
        self.max_block_size.div_ceil(self.block_fragment_size.max(1))
    }

    /// Number of fragments a block of `block_size` bytes is split into
    pub fn fragments_for(&self, block_size: usize) -> usize {
        block_size.div_ceil(self.block_fragment_size.max(1))
    }

    pub(crate) fn validate(&self, channel: ChannelIndex) -> Result<(), ConnectionConfigError> {
        for (field, size) in [
            ("sent_packet_buffer_size", self.sent_packet_buffer_size),
            ("send_queue_size", self.send_queue_size),
            ("receive_queue_size", self.receive_queue_size),
        ] {
            if !size.is_power_of_two() || size > MAX_QUEUE_SIZE {
                return Err(ConnectionConfigError::InvalidQueueSize {
                    channel,
                    field,
                    size,
                    max: MAX_QUEUE_SIZE,
                });
            }
        }

        if self.max_messages_per_packet == 0
            || self.max_messages_per_packet > MAX_MESSAGES_PER_PACKET
        {
            return Err(ConnectionConfigError::InvalidMaxMessagesPerPacket {
                channel,
                value: self.max_messages_per_packet,
                max: MAX_MESSAGES_PER_PACKET,
            });
        }

        if let Some(budget) = self.packet_budget {
            if budget.saturating_mul(8) <= CONSERVATIVE_CHANNEL_HEADER_BITS as usize {
                return Err(ConnectionConfigError::PacketBudgetTooSmall { channel, budget });
            }
        }

        if self.block_fragment_size == 0 || self.block_fragment_size > usize::from(u16::MAX) {
            return Err(ConnectionConfigError::InvalidFragmentSize {
                channel,
                size: self.block_fragment_size,
            });
        }

        if self.max_block_size < self.block_fragment_size {
            return Err(ConnectionConfigError::BlockSmallerThanFragment {
                channel,
                max_block_size: self.max_block_size,
                block_fragment_size: self.block_fragment_size,
            });
        }

        let fragments = self.max_fragments_per_block();
        if fragments > MAX_FRAGMENTS_PER_BLOCK {
            return Err(ConnectionConfigError::TooManyFragments {
                channel,
                fragments,
                max: MAX_FRAGMENTS_PER_BLOCK,
            });
        }

        Ok(())
    }
}
