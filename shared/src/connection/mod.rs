pub mod connection;
pub mod connection_config;
pub mod connection_packet;
pub mod error;
