use thiserror::Error;

use crate::{
    allocator::AllocatorError,
    messages::channels::{receivers::error::ReceiverError, senders::error::SenderError},
};

/// Errors that can occur during message factory and message operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageFactoryError {
    /// Message kind not found in registry
    #[error("Message kind {kind} is not registered. Message types must be registered with the factory builder via add_message()")]
    KindNotRegistered { kind: u16 },

    /// The allocator could not provide memory for the message or its block
    #[error("Message allocation failed: {0}")]
    Allocation(#[from] AllocatorError),

    /// Blocks can only be attached to block message kinds
    #[error("Message kind {kind} is not a block message. Override Message::is_block_message() to carry a block")]
    NotABlockMessage { kind: u16 },

    /// The message is referenced elsewhere and can't be modified
    #[error("Message is shared by {ref_count} references and can only be modified through its sole reference")]
    MessageShared { ref_count: usize },

    /// A block is already attached
    #[error("Message already has a block attached. Detach it before attaching another")]
    BlockAlreadyAttached,

    /// Blocks must contain at least one byte
    #[error("Cannot attach an empty block")]
    EmptyBlock,

    /// Messages created by the factory are still alive
    #[error("{count} messages created by this factory are still alive")]
    Leaked { count: usize },
}

/// Errors that can occur during channel operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Sender error
    #[error("Channel sender error: {0}")]
    Sender(#[from] SenderError),

    /// Receiver error
    #[error("Channel receiver error: {0}")]
    Receiver(#[from] ReceiverError),

    /// Message creation or modification failed
    #[error("Channel message error: {0}")]
    Message(#[from] MessageFactoryError),

    /// Allocation failure while buffering channel data
    #[error("Channel allocation failed: {0}")]
    Allocation(#[from] AllocatorError),

    /// Channel packet data could not be read
    #[error("Failed to read channel packet data: {reason}. Packet data may be corrupted or malicious")]
    ReadFailed { reason: &'static str },
}

impl ChannelError {
    /// Whether this error comes from running out of memory rather than from
    /// bad input
    pub fn is_allocation_failure(&self) -> bool {
        matches!(
            self,
            ChannelError::Allocation(_)
                | ChannelError::Message(MessageFactoryError::Allocation(_))
        )
    }
}
