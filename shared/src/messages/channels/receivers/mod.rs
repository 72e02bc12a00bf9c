pub mod error;
pub mod fragment_receiver;
pub mod ordered_reliable_receiver;
pub mod unordered_unreliable_receiver;
