pub mod channels;
pub mod error;
pub mod message;
pub mod message_factory;
pub mod message_kinds;
