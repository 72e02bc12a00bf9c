/// Sequence number of a packet, assigned by the transport
pub type PacketIndex = u16;

/// Per-channel message id, assigned at send time on reliable channels
pub type MessageIndex = u16;

/// Position of a channel in the connection's channel list
pub type ChannelIndex = usize;

/// Index of a fragment within a block message
pub type FragmentIndex = u16;
