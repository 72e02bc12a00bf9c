use log::info;

use crate::{
    allocator::{Allocation, Allocator, AllocatorError},
    messages::{
        channels::{
            channel_config::ChannelConfig, channel_packet_data::BlockFragment,
            receivers::error::ReceiverError,
        },
        error::ChannelError,
        message::MessageRef,
    },
    types::MessageIndex,
};

pub enum FragmentOutcome {
    /// Duplicate, or for a block that isn't being received
    Ignored,
    Stored,
    Completed(MessageRef),
}

/// Reassembles the fragments of one block message at a time.
///
/// The reassembly buffer is reserved from the allocator once, up front, so
/// that receiving fragments never allocates. Only the finished block is
/// allocated, when the last missing fragment arrives.
pub struct FragmentReceiver {
    active: bool,
    message_index: MessageIndex,
    num_fragments: u16,
    num_received: u16,
    received: Vec<bool>,
    buffer: Vec<u8>,
    block_size: Option<usize>,
    message: Option<MessageRef>,
    fragment_size: usize,
    max_block_size: usize,
    _reservation: Option<Allocation>,
}

impl FragmentReceiver {
    pub fn new(config: &ChannelConfig, allocator: &Allocator) -> Result<Self, AllocatorError> {
        let reservation = if config.disable_blocks {
            None
        } else {
            let bytes = config.max_fragments_per_block() * config.block_fragment_size;
            Some(allocator.try_allocate(bytes)?)
        };
        Ok(Self {
            active: false,
            message_index: 0,
            num_fragments: 0,
            num_received: 0,
            received: Vec::new(),
            buffer: Vec::new(),
            block_size: None,
            message: None,
            fragment_size: config.block_fragment_size,
            max_block_size: config.max_block_size,
            _reservation: reservation,
        })
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.num_fragments = 0;
        self.num_received = 0;
        self.block_size = None;
        self.message = None;
    }

    pub fn is_receiving(&self, message_index: MessageIndex) -> bool {
        self.active && self.message_index == message_index
    }

    fn start(&mut self, message_index: MessageIndex, num_fragments: u16) {
        self.reset();
        self.active = true;
        self.message_index = message_index;
        self.num_fragments = num_fragments;
        self.received.clear();
        self.received.resize(usize::from(num_fragments), false);
        self.buffer.clear();
        self.buffer
            .resize(usize::from(num_fragments) * self.fragment_size, 0);
    }

    /// Checks a fragment against the block limits and against the block
    /// being received, without changing any state
    pub fn validate(&self, fragment: &BlockFragment) -> Result<(), ReceiverError> {
        let last = fragment.fragment_id + 1 == fragment.num_fragments;
        if !last && fragment.data.len() != self.fragment_size {
            return Err(ReceiverError::InvalidFragment {
                reason: "only the last fragment may be short",
            });
        }
        if last && self.block_size_with_last(fragment) > self.max_block_size {
            return Err(ReceiverError::InvalidFragment {
                reason: "block exceeds max_block_size",
            });
        }
        if self.is_receiving(fragment.message_index)
            && fragment.num_fragments != self.num_fragments
        {
            return Err(ReceiverError::InvalidFragment {
                reason: "fragment count changed within a block",
            });
        }
        match &fragment.message {
            None if fragment.fragment_id == 0 => Err(ReceiverError::InvalidFragment {
                reason: "first fragment is missing its message",
            }),
            Some(message) if message.block().is_some() => Err(ReceiverError::InvalidFragment {
                reason: "fragment message already carries a block",
            }),
            _ => Ok(()),
        }
    }

    fn block_size_with_last(&self, fragment: &BlockFragment) -> usize {
        usize::from(fragment.num_fragments - 1) * self.fragment_size + fragment.data.len()
    }

    /// Stores a validated fragment, returning the finished message once every
    /// fragment is in. If allocating the finished block fails, the fragment is
    /// not stored, so a retransmission can complete the block later.
    pub fn receive(
        &mut self,
        fragment: BlockFragment,
        allocator: &Allocator,
    ) -> Result<FragmentOutcome, ChannelError> {
        if !self.is_receiving(fragment.message_index) {
            self.start(fragment.message_index, fragment.num_fragments);
        }
        if fragment.num_fragments != self.num_fragments {
            return Ok(FragmentOutcome::Ignored);
        }
        let fragment_index = usize::from(fragment.fragment_id);
        if self.received[fragment_index] {
            return Ok(FragmentOutcome::Ignored);
        }

        let last = fragment.fragment_id + 1 == fragment.num_fragments;
        let block_size = if last {
            Some(self.block_size_with_last(&fragment))
        } else {
            self.block_size
        };
        let completes = self.num_received + 1 == self.num_fragments;

        let allocation = match (completes, block_size) {
            (true, Some(block_size)) => Some(allocator.try_allocate(block_size)?),
            (true, None) => {
                return Err(ReceiverError::InvalidFragment {
                    reason: "block completed without its last fragment",
                }
                .into())
            }
            (false, _) => None,
        };
        if completes && self.message.is_none() && fragment.message.is_none() {
            return Err(ReceiverError::InvalidFragment {
                reason: "block completed without its first fragment",
            }
            .into());
        }

        let start = fragment_index * self.fragment_size;
        self.buffer[start..start + fragment.data.len()].copy_from_slice(&fragment.data);
        self.received[fragment_index] = true;
        self.num_received += 1;
        self.block_size = block_size;
        if let Some(message) = fragment.message {
            self.message = Some(message);
        }

        let Some(allocation) = allocation else {
            return Ok(FragmentOutcome::Stored);
        };

        let block_size = allocation.bytes();
        let message_index = self.message_index;
        let message = self.message.take();
        self.reset();
        let Some(mut message) = message else {
            return Err(ReceiverError::InvalidFragment {
                reason: "block completed without its first fragment",
            }
            .into());
        };

        message.attach_block_with(self.buffer[..block_size].to_vec(), allocation)?;
        message.set_id(message_index);
        info!(
            "Received block message {} of {} bytes",
            message_index, block_size
        );
        Ok(FragmentOutcome::Completed(message))
    }
}
