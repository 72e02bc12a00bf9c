use std::{
    any::Any,
    fmt,
    sync::{
        atomic::{AtomicU16, Ordering},
        Arc,
    },
};

#[cfg(debug_assertions)]
use std::sync::atomic::AtomicUsize;

use channelwire_serde::{BitCounter, BitReader, BitWrite, BitWriter, SerdeErr};

use crate::{
    allocator::{Allocation, Allocator},
    messages::{
        error::MessageFactoryError, message_factory::LiveMessages, message_kinds::MessageKind,
    },
    types::MessageIndex,
};

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An application payload carried over a channel.
///
/// `ser` is used both to write the message and to measure it, so it must
/// write the same bits on every call for the same contents.
pub trait Message: AsAny + Send + Sync + 'static {
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Reads the message's fields into `self`, which starts out as the
    /// type's default
    fn de(&mut self, reader: &mut BitReader) -> Result<(), SerdeErr>;

    fn bit_length(&self) -> u32 {
        let mut counter = BitCounter::new();
        self.ser(&mut counter);
        counter.bits_needed()
    }

    /// Block messages carry a large byte block beside their fields, which is
    /// fragmented on reliable channels
    fn is_block_message() -> bool
    where
        Self: Sized,
    {
        false
    }
}

struct Block {
    data: Box<[u8]>,
    _allocation: Allocation,
}

pub(crate) struct MessageInner {
    kind: MessageKind,
    is_block_kind: bool,
    id: AtomicU16,
    payload: Box<dyn Message>,
    block: Option<Block>,
    allocator: Allocator,
    _allocation: Allocation,
    live: Arc<LiveMessages>,
    serial: u64,
    // mirrors the strong count, for the leak report
    #[cfg(debug_assertions)]
    handles: Arc<AtomicUsize>,
}

impl Drop for MessageInner {
    fn drop(&mut self) {
        self.live.on_destroy(self.serial);
    }
}

/// A shared handle to a message created by a
/// [`MessageFactory`](crate::MessageFactory).
///
/// Cloning adds a reference and dropping releases one; the message is
/// destroyed, and its memory returned to the factory's allocator, when the
/// last reference goes away. Contents can only be changed while the handle is
/// the sole reference.
pub struct MessageRef {
    inner: Arc<MessageInner>,
}

impl MessageRef {
    pub(crate) fn new(
        kind: MessageKind,
        is_block_kind: bool,
        payload: Box<dyn Message>,
        allocator: Allocator,
        allocation: Allocation,
        live: Arc<LiveMessages>,
        serial: u64,
    ) -> Self {
        Self {
            inner: Arc::new(MessageInner {
                kind,
                is_block_kind,
                id: AtomicU16::new(0),
                payload,
                block: None,
                allocator,
                _allocation: allocation,
                live,
                serial,
                #[cfg(debug_assertions)]
                handles: Arc::new(AtomicUsize::new(1)),
            }),
        }
    }

    /// Number of live handles, readable without holding one
    #[cfg(debug_assertions)]
    pub(crate) fn handle_counter(&self) -> Arc<AtomicUsize> {
        self.inner.handles.clone()
    }

    pub(crate) fn belongs_to(&self, live: &Arc<LiveMessages>) -> bool {
        Arc::ptr_eq(&self.inner.live, live)
    }

    pub fn kind(&self) -> MessageKind {
        self.inner.kind
    }

    /// The id most recently assigned by a reliable channel on send, or read
    /// from the wire on receive
    pub fn id(&self) -> MessageIndex {
        self.inner.id.load(Ordering::Relaxed)
    }

    pub(crate) fn set_id(&self, id: MessageIndex) {
        self.inner.id.store(id, Ordering::Relaxed);
    }

    /// Number of live handles to this message
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn is_unique(&self) -> bool {
        self.ref_count() == 1
    }

    pub fn ptr_eq(&self, other: &MessageRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether this message's kind was registered as a block message
    pub fn is_block(&self) -> bool {
        self.inner.is_block_kind
    }

    pub fn block(&self) -> Option<&[u8]> {
        self.inner.block.as_ref().map(|block| &block.data[..])
    }

    pub fn block_size(&self) -> usize {
        self.block().map_or(0, <[u8]>::len)
    }

    pub fn payload(&self) -> &dyn Message {
        &*self.inner.payload
    }

    pub fn get<M: Message>(&self) -> Option<&M> {
        let payload: &dyn Message = &*self.inner.payload;
        payload.as_any().downcast_ref::<M>()
    }

    /// Mutable access to the payload, only while this is the sole handle
    pub fn get_mut<M: Message>(&mut self) -> Option<&mut M> {
        let inner = Arc::get_mut(&mut self.inner)?;
        let payload: &mut dyn Message = &mut *inner.payload;
        payload.as_any_mut().downcast_mut::<M>()
    }

    pub(crate) fn payload_mut(&mut self) -> Option<&mut (dyn Message + 'static)> {
        let inner = Arc::get_mut(&mut self.inner)?;
        Some(inner.payload.as_mut())
    }

    fn unique_inner(&mut self) -> Result<&mut MessageInner, MessageFactoryError> {
        let ref_count = self.ref_count();
        Arc::get_mut(&mut self.inner).ok_or(MessageFactoryError::MessageShared { ref_count })
    }

    /// Attaches `data` as this message's block, charging it to the factory's
    /// allocator
    pub fn attach_block(&mut self, data: Vec<u8>) -> Result<(), MessageFactoryError> {
        let allocation = self.inner.allocator.try_allocate(data.len())?;
        self.attach_block_with(data, allocation)
    }

    pub(crate) fn attach_block_with(
        &mut self,
        data: Vec<u8>,
        allocation: Allocation,
    ) -> Result<(), MessageFactoryError> {
        let kind = self.kind();
        let inner = self.unique_inner()?;
        if !inner.is_block_kind {
            return Err(MessageFactoryError::NotABlockMessage {
                kind: kind.net_id(),
            });
        }
        if inner.block.is_some() {
            return Err(MessageFactoryError::BlockAlreadyAttached);
        }
        if data.is_empty() {
            return Err(MessageFactoryError::EmptyBlock);
        }
        inner.block = Some(Block {
            data: data.into_boxed_slice(),
            _allocation: allocation,
        });
        Ok(())
    }

    /// Removes and returns the attached block, if any
    pub fn detach_block(&mut self) -> Result<Option<Vec<u8>>, MessageFactoryError> {
        let inner = self.unique_inner()?;
        Ok(inner.block.take().map(|block| block.data.into_vec()))
    }

    /// Serialized payload bits, without id, kind or block
    pub fn payload_bit_length(&self) -> u32 {
        self.inner.payload.bit_length()
    }

    /// Whether two messages have the same kind, block and serialized payload
    pub fn same_content(&self, other: &MessageRef) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.kind() != other.kind() || self.block() != other.block() {
            return false;
        }
        payload_bytes(self.payload()) == payload_bytes(other.payload())
    }
}

fn payload_bytes(payload: &dyn Message) -> Box<[u8]> {
    let max_bytes = (payload.bit_length() as usize).div_ceil(8);
    let mut writer = BitWriter::with_max_bytes(max_bytes);
    payload.ser(&mut writer);
    writer.to_bytes()
}

impl Clone for MessageRef {
    fn clone(&self) -> Self {
        #[cfg(debug_assertions)]
        self.inner.handles.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(debug_assertions)]
impl Drop for MessageRef {
    fn drop(&mut self) {
        self.inner.handles.fetch_sub(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRef")
            .field("kind", &self.kind())
            .field("id", &self.id())
            .field("ref_count", &self.ref_count())
            .field("block_size", &self.block_size())
            .finish()
    }
}
