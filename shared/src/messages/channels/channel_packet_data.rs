use channelwire_serde::{bits_required, de_ranged, ser_ranged, BitReader, BitWrite, Serde};

use crate::{
    messages::{
        channels::channel_config::ChannelConfig,
        error::ChannelError,
        message::MessageRef,
        message_factory::MessageFactory,
        message_kinds::{MessageKind, MessageKinds},
    },
    types::{ChannelIndex, FragmentIndex, MessageIndex},
};

/// A message together with the id its channel assigned it
#[derive(Clone, Debug)]
pub struct IndexedMessage {
    pub index: MessageIndex,
    pub message: MessageRef,
}

impl IndexedMessage {
    pub fn new(index: MessageIndex, message: MessageRef) -> Self {
        Self { index, message }
    }
}

/// One fragment of a block message. Fragment 0 also carries the message
/// itself, without its block.
#[derive(Clone, Debug)]
pub struct BlockFragment {
    pub message_index: MessageIndex,
    pub fragment_id: FragmentIndex,
    pub num_fragments: u16,
    pub data: Vec<u8>,
    pub message: Option<MessageRef>,
}

#[derive(Clone, Debug)]
pub enum ChannelPayload {
    Messages(Vec<IndexedMessage>),
    Fragment(BlockFragment),
}

/// What one channel contributes to one packet.
///
/// The messages are shared with the channel they came from: dropping the
/// packet data releases only its own references.
#[derive(Clone, Debug)]
pub struct ChannelPacketData {
    pub channel_index: ChannelIndex,
    pub payload: ChannelPayload,
}

impl ChannelPacketData {
    pub fn messages(channel_index: ChannelIndex, messages: Vec<IndexedMessage>) -> Self {
        Self {
            channel_index,
            payload: ChannelPayload::Messages(messages),
        }
    }

    pub fn fragment(channel_index: ChannelIndex, fragment: BlockFragment) -> Self {
        Self {
            channel_index,
            payload: ChannelPayload::Fragment(fragment),
        }
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.payload, ChannelPayload::Fragment(_))
    }

    pub fn message_count(&self) -> usize {
        match &self.payload {
            ChannelPayload::Messages(messages) => messages.len(),
            ChannelPayload::Fragment(_) => 0,
        }
    }

    /// Writes everything after the channel index
    pub(crate) fn ser(
        &self,
        writer: &mut dyn BitWrite,
        config: &ChannelConfig,
        kinds: &MessageKinds,
    ) {
        match &self.payload {
            ChannelPayload::Fragment(fragment) => {
                writer.write_bit(true);
                ser_fragment(writer, fragment, config, kinds);
            }
            ChannelPayload::Messages(messages) => {
                writer.write_bit(false);
                debug_assert!(!messages.is_empty());
                ser_ranged(
                    writer,
                    len_u32(messages.len()),
                    1,
                    len_u32(config.max_messages_per_packet),
                );
                let reliable = config.mode.is_reliable();
                let mut previous: Option<MessageIndex> = None;
                for indexed in messages {
                    if reliable {
                        ser_message_index(writer, previous, indexed.index);
                        previous = Some(indexed.index);
                    }
                    ser_message(writer, &indexed.message, reliable, config, kinds);
                }
            }
        }
    }

    /// Reads everything after the channel index
    pub(crate) fn de(
        reader: &mut BitReader,
        channel_index: ChannelIndex,
        config: &ChannelConfig,
        factory: &MessageFactory,
    ) -> Result<Self, ChannelError> {
        let is_fragment = reader.read_bit().map_err(|_| read_failed("fragment flag"))?;
        let reliable = config.mode.is_reliable();

        if is_fragment {
            if !reliable {
                return Err(read_failed("fragment on unreliable channel"));
            }
            let fragment = de_fragment(reader, config, factory)?;
            return Ok(Self::fragment(channel_index, fragment));
        }

        let count = de_ranged(reader, 1, len_u32(config.max_messages_per_packet))
            .map_err(|_| read_failed("message count"))?;
        let mut messages = Vec::with_capacity(count as usize);
        let mut previous: Option<MessageIndex> = None;
        for _ in 0..count {
            let index = if reliable {
                let index = de_message_index(reader, previous)?;
                previous = Some(index);
                index
            } else {
                0
            };
            let message = de_message(reader, reliable, config, factory)?;
            messages.push(IndexedMessage::new(index, message));
        }
        Ok(Self::messages(channel_index, messages))
    }
}

impl PartialEq for ChannelPacketData {
    fn eq(&self, other: &Self) -> bool {
        if self.channel_index != other.channel_index {
            return false;
        }
        match (&self.payload, &other.payload) {
            (ChannelPayload::Messages(mine), ChannelPayload::Messages(theirs)) => {
                mine.len() == theirs.len()
                    && mine.iter().zip(theirs).all(|(a, b)| {
                        a.index == b.index && a.message.same_content(&b.message)
                    })
            }
            (ChannelPayload::Fragment(mine), ChannelPayload::Fragment(theirs)) => {
                mine.message_index == theirs.message_index
                    && mine.fragment_id == theirs.fragment_id
                    && mine.num_fragments == theirs.num_fragments
                    && mine.data == theirs.data
                    && match (&mine.message, &theirs.message) {
                        (Some(a), Some(b)) => a.same_content(b),
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => false,
        }
    }
}

fn read_failed(reason: &'static str) -> ChannelError {
    ChannelError::ReadFailed { reason }
}

// sizes here are bounded by validated configuration
fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

// Message ids

/// Bits taken by `index`, written after `previous` in the same packet
pub(crate) fn message_index_bits(previous: Option<MessageIndex>, index: MessageIndex) -> u32 {
    match previous {
        None => 16,
        Some(previous) => {
            let delta = index.wrapping_sub(previous);
            if (1..=32).contains(&delta) {
                1 + 5
            } else {
                1 + 16
            }
        }
    }
}

fn ser_message_index(
    writer: &mut dyn BitWrite,
    previous: Option<MessageIndex>,
    index: MessageIndex,
) {
    match previous {
        None => index.ser(writer),
        Some(previous) => {
            let delta = index.wrapping_sub(previous);
            if (1..=32).contains(&delta) {
                writer.write_bit(true);
                writer.write_bits(u32::from(delta - 1), 5);
            } else {
                writer.write_bit(false);
                index.ser(writer);
            }
        }
    }
}

fn de_message_index(
    reader: &mut BitReader,
    previous: Option<MessageIndex>,
) -> Result<MessageIndex, ChannelError> {
    let failed = |_| read_failed("message id");
    match previous {
        None => u16::de(reader).map_err(failed),
        Some(previous) => {
            if reader.read_bit().map_err(failed)? {
                let delta = reader.read_bits(5).map_err(failed)?;
                // 5 bits, at most 31
                Ok(previous.wrapping_add(delta as u16 + 1))
            } else {
                u16::de(reader).map_err(failed)
            }
        }
    }
}

// Messages

/// Bits taken by a message kind on the wire
pub(crate) fn kind_bits(kinds: &MessageKinds) -> u32 {
    u32::from(bits_required(0, kinds.max_net_id()))
}

/// Bits taken by a block sent inline on an unreliable channel
pub(crate) fn inline_block_bits(config: &ChannelConfig, block_size: usize) -> u32 {
    u32::from(bits_required(1, len_u32(config.max_block_size)))
        .saturating_add(len_u32(block_size).saturating_mul(8))
}

fn ser_kind(writer: &mut dyn BitWrite, kind: MessageKind, kinds: &MessageKinds) {
    ser_ranged(writer, u32::from(kind.net_id()), 0, kinds.max_net_id());
}

fn de_kind(reader: &mut BitReader, kinds: &MessageKinds) -> Result<MessageKind, ChannelError> {
    let net_id = de_ranged(reader, 0, kinds.max_net_id()).map_err(|_| read_failed("message kind"))?;
    // bounded by the number of kinds, at most 32768
    Ok(MessageKind::from_net_id(net_id as u16))
}

fn ser_message(
    writer: &mut dyn BitWrite,
    message: &MessageRef,
    reliable: bool,
    config: &ChannelConfig,
    kinds: &MessageKinds,
) {
    ser_kind(writer, message.kind(), kinds);
    message.payload().ser(writer);
    if !reliable && message.is_block() {
        let block = message.block().unwrap_or(&[]);
        ser_ranged(writer, len_u32(block.len()), 1, len_u32(config.max_block_size));
        writer.write_bytes(block);
    }
}

/// Creates a message of `kind` and reads its payload
fn de_payload(
    reader: &mut BitReader,
    kind: MessageKind,
    factory: &MessageFactory,
) -> Result<MessageRef, ChannelError> {
    let mut message = factory.try_create(kind)?;
    let payload = message
        .payload_mut()
        .ok_or(read_failed("freshly created message is shared"))?;
    payload
        .de(reader)
        .map_err(|_| read_failed("message payload"))?;
    Ok(message)
}

fn de_message(
    reader: &mut BitReader,
    reliable: bool,
    config: &ChannelConfig,
    factory: &MessageFactory,
) -> Result<MessageRef, ChannelError> {
    let kinds = factory.kinds();
    let kind = de_kind(reader, kinds)?;
    let is_block = kinds.is_block(kind);
    if reliable && is_block {
        return Err(read_failed("block message outside of fragments"));
    }

    let mut message = de_payload(reader, kind, factory)?;
    if is_block {
        let block_size = de_ranged(reader, 1, len_u32(config.max_block_size))
            .map_err(|_| read_failed("block size"))?;
        let block = reader
            .read_bytes(block_size as usize)
            .map_err(|_| read_failed("block data"))?;
        message.attach_block(block)?;
    }
    Ok(message)
}

// Fragments

fn ser_fragment(
    writer: &mut dyn BitWrite,
    fragment: &BlockFragment,
    config: &ChannelConfig,
    kinds: &MessageKinds,
) {
    let num_fragments = u32::from(fragment.num_fragments);
    fragment.message_index.ser(writer);
    ser_ranged(writer, num_fragments, 1, len_u32(config.max_fragments_per_block()));
    ser_ranged(writer, u32::from(fragment.fragment_id), 0, num_fragments - 1);
    ser_ranged(
        writer,
        len_u32(fragment.data.len()),
        1,
        len_u32(config.block_fragment_size),
    );
    writer.write_bytes(&fragment.data);

    if fragment.fragment_id == 0 {
        debug_assert!(fragment.message.is_some());
        if let Some(message) = &fragment.message {
            ser_kind(writer, message.kind(), kinds);
            message.payload().ser(writer);
        }
    }
}

fn de_fragment(
    reader: &mut BitReader,
    config: &ChannelConfig,
    factory: &MessageFactory,
) -> Result<BlockFragment, ChannelError> {
    let message_index = u16::de(reader).map_err(|_| read_failed("fragment message id"))?;
    let num_fragments = de_ranged(reader, 1, len_u32(config.max_fragments_per_block()))
        .map_err(|_| read_failed("fragment count"))?;
    let fragment_id =
        de_ranged(reader, 0, num_fragments - 1).map_err(|_| read_failed("fragment id"))?;
    let fragment_bytes = de_ranged(reader, 1, len_u32(config.block_fragment_size))
        .map_err(|_| read_failed("fragment size"))?;
    let data = reader
        .read_bytes(fragment_bytes as usize)
        .map_err(|_| read_failed("fragment data"))?;

    let message = if fragment_id == 0 {
        let kind = de_kind(reader, factory.kinds())?;
        if !factory.kinds().is_block(kind) {
            return Err(read_failed("fragment of a non-block message"));
        }
        Some(de_payload(reader, kind, factory)?)
    } else {
        None
    };

    // both bounded by the fragment limit, at most 65535
    Ok(BlockFragment {
        message_index,
        fragment_id: fragment_id as u16,
        num_fragments: num_fragments as u16,
        data,
        message,
    })
}
