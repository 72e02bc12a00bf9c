//! # Channelwire
//! Reliable-ordered and unreliable-unordered message channels, multiplexed
//! into size-bounded packets over an unreliable datagram transport.
//!
//! A [`Connection`] owns one peer's channels. Each tick it is asked for the
//! next outgoing packet, fed the packets that arrived, told which of its
//! packets were acknowledged, and has its clock advanced. Sending the bytes
//! and tracking packet acknowledgments is left to the transport.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use channelwire_serde::{
    BitCounter, BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, SignedInteger,
    SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger, MTU_SIZE_BITS,
    MTU_SIZE_BYTES,
};

mod allocator;
mod connection;
mod constants;
mod messages;
mod sequence_buffer;
mod types;
mod wrapping_number;

pub use allocator::{Allocation, Allocator, AllocatorError};
pub use connection::{
    connection::{Connection, ConnectionCounters},
    connection_config::ConnectionConfig,
    connection_packet::ConnectionPacket,
    error::{ConnectionConfigError, ConnectionError},
};
pub use constants::{
    CONSERVATIVE_CHANNEL_HEADER_BITS, CONSERVATIVE_FRAGMENT_HEADER_BITS,
    CONSERVATIVE_MESSAGE_HEADER_BITS, CONSERVATIVE_PACKET_HEADER_BITS, GIVE_UP_BITS, MAX_CHANNELS,
    MAX_FRAGMENTS_PER_BLOCK, MAX_MESSAGES_PER_PACKET, MAX_MESSAGE_KINDS, MAX_QUEUE_SIZE,
};
pub use messages::{
    channels::{
        channel::{Channel, ChannelCounters},
        channel_config::{ChannelConfig, ChannelMode, OverflowPolicy},
        channel_packet_data::{BlockFragment, ChannelPacketData, ChannelPayload, IndexedMessage},
        receivers::error::ReceiverError,
        reliable_ordered_channel::ReliableOrderedChannel,
        senders::error::SenderError,
        unreliable_unordered_channel::UnreliableUnorderedChannel,
    },
    error::{ChannelError, MessageFactoryError},
    message::{AsAny, Message, MessageRef},
    message_factory::{MessageFactory, MessageFactoryBuilder},
    message_kinds::{MessageKind, MessageKinds},
};
pub use sequence_buffer::{SequenceBuffer, SequenceBufferError};
pub use types::{ChannelIndex, FragmentIndex, MessageIndex, PacketIndex};
pub use wrapping_number::{sequence_greater_than, sequence_less_than, wrapping_diff};
