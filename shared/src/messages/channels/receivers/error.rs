use thiserror::Error;

/// Errors that can occur during message receiver operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiverError {
    /// A message id beyond the receive window arrived. The sender can't
    /// legitimately get this far ahead, so the packet is rejected.
    #[error("Message {message_index} is beyond the receive window {window_start}..={window_end}. Protocol violation")]
    ReceiveWindowExceeded {
        message_index: u16,
        window_start: u16,
        window_end: u16,
    },

    /// A block fragment is inconsistent with the block it belongs to
    #[error("Invalid block fragment: {reason}. Fragment reassembly protocol violation")]
    InvalidFragment { reason: &'static str },
}
