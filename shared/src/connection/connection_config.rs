use crate::{
    connection::error::ConnectionConfigError,
    constants::{CONSERVATIVE_CHANNEL_HEADER_BITS, CONSERVATIVE_PACKET_HEADER_BITS, MAX_CHANNELS},
    messages::channels::channel_config::ChannelConfig,
};

/// Contains Config properties which will be used by a Connection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Largest packet, in bytes, that a connection will generate
    pub max_packet_size: usize,
    /// Channels in priority order. Earlier channels fill packets first.
    pub channels: Vec<ChannelConfig>,
}

impl ConnectionConfig {
    pub fn new(max_packet_size: usize, channels: Vec<ChannelConfig>) -> Self {
        Self {
            max_packet_size,
            channels,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn validate(&self) -> Result<(), ConnectionConfigError> {
        if self.channels.is_empty() {
            return Err(ConnectionConfigError::NoChannels);
        }
        if self.channels.len() > MAX_CHANNELS {
            return Err(ConnectionConfigError::TooManyChannels {
                count: self.channels.len(),
                max: MAX_CHANNELS,
            });
        }

        let min =
            ((CONSERVATIVE_PACKET_HEADER_BITS + CONSERVATIVE_CHANNEL_HEADER_BITS) / 8) as usize;
        if self.max_packet_size <= min {
            return Err(ConnectionConfigError::PacketSizeTooSmall {
                max_packet_size: self.max_packet_size,
                min,
            });
        }

        for (index, channel) in self.channels.iter().enumerate() {
            channel.validate(index)?;
        }
        Ok(())
    }

    /// Largest number of bits one message (or block fragment) may take on
    /// `channel` and still fit in a packet
    pub(crate) fn max_message_bits(&self, channel: &ChannelConfig) -> u32 {
        let packet_bits = u32::try_from(self.max_packet_size.saturating_mul(8)).unwrap_or(u32::MAX);
        let mut bits = packet_bits
            .saturating_sub(CONSERVATIVE_PACKET_HEADER_BITS)
            .saturating_sub(CONSERVATIVE_CHANNEL_HEADER_BITS);
        if let Some(budget) = channel.packet_budget {
            let budget_bits = u32::try_from(budget.saturating_mul(8)).unwrap_or(u32::MAX);
            bits = bits.min(budget_bits.saturating_sub(CONSERVATIVE_CHANNEL_HEADER_BITS));
        }
        bits
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_packet_size: 8 * 1024,
            channels: vec![ChannelConfig::default()],
        }
    }
}
