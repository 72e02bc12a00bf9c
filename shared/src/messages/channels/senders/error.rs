use thiserror::Error;

/// Errors that can occur during message sender operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SenderError {
    /// The send queue has no room for another message
    #[error("Send queue is full. Check can_send_message() before sending, or drain acknowledgments first")]
    SendQueueFull,

    /// Block messages are disabled on this channel
    #[error("Block messages are disabled on this channel")]
    BlocksDisabled,

    /// A block message was sent without a block attached
    #[error("Block message of kind {kind} has no block attached")]
    MissingBlock { kind: u16 },

    /// The attached block exceeds the channel's limit
    #[error("Block of {block_size} bytes exceeds the channel's max_block_size of {max_block_size} bytes")]
    BlockTooLarge {
        block_size: usize,
        max_block_size: usize,
    },

    /// Message is too large to ever fit in a packet
    #[error("Message requires {bits_needed} bits, but a packet only has room for {bits_free} bits on this channel. Large payloads should be sent as block messages on a reliable channel")]
    MessageTooLarge { bits_needed: u32, bits_free: u32 },
}
