pub mod packet_exchange;
pub mod test_endpoint;
pub mod test_protocol;

pub use packet_exchange::{
    exchange_packets, exchange_packets_n_times, tick_and_exchange, TestNetwork, TICK,
};
pub use test_endpoint::{TestEndpoint, ACK_WINDOW};
pub use test_protocol::{
    test_block, test_block_message, test_factory, test_message, Received, TestBlockMessage,
    TestMessage,
};
