use channelwire::{Allocator, Message, MessageFactory, MessageRef};
use channelwire_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

/// A small message tagged with the order it was sent in
#[derive(Default)]
pub struct TestMessage {
    pub sequence: u16,
    pub value: u32,
}

impl Message for TestMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.sequence.ser(writer);
        UnsignedVariableInteger::<7>::new(self.value).ser(writer);
    }

    fn de(&mut self, reader: &mut BitReader) -> Result<(), SerdeErr> {
        self.sequence = u16::de(reader)?;
        let value = UnsignedVariableInteger::<7>::de(reader)?.get();
        self.value = u32::try_from(value).map_err(|_| SerdeErr)?;
        Ok(())
    }
}

/// A message carrying a block, tagged with the order it was sent in
#[derive(Default)]
pub struct TestBlockMessage {
    pub sequence: u16,
}

impl Message for TestBlockMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.sequence.ser(writer);
    }

    fn de(&mut self, reader: &mut BitReader) -> Result<(), SerdeErr> {
        self.sequence = u16::de(reader)?;
        Ok(())
    }

    fn is_block_message() -> bool {
        true
    }
}

/// What a received message carried, detached from the message itself so
/// tests don't hold on to factory-owned messages
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Received {
    Message { sequence: u16, value: u32 },
    Block { sequence: u16, block: Vec<u8> },
}

impl Received {
    pub fn sequence(&self) -> u16 {
        match self {
            Received::Message { sequence, .. } | Received::Block { sequence, .. } => *sequence,
        }
    }

    pub fn from_message(message: &MessageRef) -> Self {
        if let Some(block_message) = message.get::<TestBlockMessage>() {
            return Received::Block {
                sequence: block_message.sequence,
                block: message.block().map(<[u8]>::to_vec).unwrap_or_default(),
            };
        }
        match message.get::<TestMessage>() {
            Some(test_message) => Received::Message {
                sequence: test_message.sequence,
                value: test_message.value,
            },
            None => panic!("received a message of unknown type"),
        }
    }
}

pub fn test_factory(allocator: Allocator) -> MessageFactory {
    MessageFactory::builder(allocator)
        .add_message::<TestMessage>()
        .add_message::<TestBlockMessage>()
        .build()
}

pub fn test_message(factory: &MessageFactory, sequence: u16, value: u32) -> MessageRef {
    let mut message = factory
        .create_typed::<TestMessage>()
        .expect("allocator exhausted");
    let payload = message
        .get_mut::<TestMessage>()
        .expect("new message is uniquely owned");
    payload.sequence = sequence;
    payload.value = value;
    message
}

/// A block of `size` bytes whose content depends on `sequence`
pub fn test_block(sequence: u16, size: usize) -> Vec<u8> {
    (0..size)
        .map(|index| (index as u16).wrapping_mul(31).wrapping_add(sequence) as u8)
        .collect()
}

pub fn test_block_message(factory: &MessageFactory, sequence: u16, size: usize) -> MessageRef {
    let mut message = factory
        .create_typed::<TestBlockMessage>()
        .expect("allocator exhausted");
    message
        .get_mut::<TestBlockMessage>()
        .expect("new message is uniquely owned")
        .sequence = sequence;
    message
        .attach_block(test_block(sequence, size))
        .expect("block attaches to a fresh block message");
    message
}
