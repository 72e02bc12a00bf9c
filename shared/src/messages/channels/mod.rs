pub mod channel;
pub mod channel_config;
pub mod channel_packet_data;
pub mod receivers;
pub mod reliable_ordered_channel;
pub mod senders;
pub mod unreliable_unordered_channel;
