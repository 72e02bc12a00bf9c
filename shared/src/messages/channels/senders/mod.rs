pub mod error;
pub mod fragment_sender;
pub mod reliable_sender;
pub mod unreliable_sender;
