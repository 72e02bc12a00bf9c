/// Upper bound on the number of channels one connection may carry
pub const MAX_CHANNELS: usize = 64;

/// Upper bound on the number of registered message kinds
pub const MAX_MESSAGE_KINDS: usize = 32768;

/// Upper bound on send and receive queue sizes, half the message id space
pub const MAX_QUEUE_SIZE: usize = 32768;

/// Upper bound on the number of messages a channel may put in one packet
pub const MAX_MESSAGES_PER_PACKET: usize = 1024;

/// Upper bound on the number of fragments a block message may be split into
pub const MAX_FRAGMENTS_PER_BLOCK: usize = 65535;

// Conservative bit estimates, used to budget a packet before exact measurement.

/// Entry count, byte alignment and check value
pub const CONSERVATIVE_PACKET_HEADER_BITS: u32 = 64;

/// Channel index, fragment flag and message count
pub const CONSERVATIVE_CHANNEL_HEADER_BITS: u32 = 32;

/// Id and kind of a single message
pub const CONSERVATIVE_MESSAGE_HEADER_BITS: u32 = 32;

/// Message id, fragment count, fragment id and fragment size
pub const CONSERVATIVE_FRAGMENT_HEADER_BITS: u32 = 64;

/// A channel stops looking for more messages once less than this remains
pub const GIVE_UP_BITS: u32 = 32;
