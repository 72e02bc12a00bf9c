use channelwire::{ChannelConfig, ConnectionConfig};
use channelwire_test::{test_block, LinkConditions, Received, TestEndpoint, TestNetwork, TICK};
use proptest::prelude::*;

const RELIABLE: usize = 0;
const UNRELIABLE: usize = 1;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config(max_packet_size: usize) -> ConnectionConfig {
    ConnectionConfig::new(
        max_packet_size,
        vec![
            ChannelConfig::reliable_ordered(),
            ChannelConfig::unreliable_unordered(),
        ],
    )
}

fn link_conditions() -> impl Strategy<Value = LinkConditions> {
    (0.0f32..0.4, 0.0f32..0.2, 0.0f32..0.5, 0u64..4).prop_map(
        |(loss, duplicate, reorder, max_delay_ticks)| LinkConditions {
            loss,
            duplicate,
            reorder,
            max_delay_ticks,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Reliable messages arrive exactly once and in order over any bad link
    #[test]
    fn prop_reliable_messages_arrive_in_order(
        seed in any::<u64>(),
        conditions in link_conditions(),
        values in prop::collection::vec(any::<u32>(), 1..150),
    ) {
        init_logger();
        let mut network = TestNetwork::new(config(1200), conditions, seed);
        for (sequence, value) in values.iter().enumerate() {
            network.client.send_message(RELIABLE, sequence as u16, *value).unwrap();
        }

        let count = values.len();
        let delivered = network.run_until(4000, |network| {
            network.server.received(RELIABLE).len() >= count
        });
        prop_assert!(delivered);

        let expected: Vec<Received> = values
            .iter()
            .enumerate()
            .map(|(sequence, value)| Received::Message { sequence: sequence as u16, value: *value })
            .collect();
        prop_assert_eq!(network.server.received(RELIABLE), expected.as_slice());

        network.set_conditions(LinkConditions::perfect());
        let settled = network.run_until(200, |network| network.client.num_live_messages() == 0);
        prop_assert!(settled);
    }

    /// Blocks of any size arrive intact and in order over any bad link
    #[test]
    fn prop_blocks_arrive_intact(
        seed in any::<u64>(),
        conditions in link_conditions(),
        sizes in prop::collection::vec(1usize..6000, 1..4),
    ) {
        init_logger();
        let mut network = TestNetwork::new(config(1200), conditions, seed);
        for (sequence, size) in sizes.iter().enumerate() {
            network.client.send_block(RELIABLE, sequence as u16, *size).unwrap();
        }

        let count = sizes.len();
        let delivered = network.run_until(6000, |network| {
            network.server.received(RELIABLE).len() >= count
        });
        prop_assert!(delivered);

        for (sequence, size) in sizes.iter().enumerate() {
            let sequence = sequence as u16;
            prop_assert_eq!(
                &network.server.received(RELIABLE)[usize::from(sequence)],
                &Received::Block { sequence, block: test_block(sequence, *size) }
            );
        }
    }

    /// Packets stay within the maximum size whatever is queued
    #[test]
    fn prop_packets_fit_max_size(
        max_packet_size in 64usize..1500,
        reliable in prop::collection::vec(any::<u32>(), 0..200),
        unreliable in prop::collection::vec(any::<u32>(), 0..50),
    ) {
        init_logger();
        let config = config(max_packet_size);
        let mut client = TestEndpoint::new(config.clone());
        let mut server = TestEndpoint::new(config);
        for (sequence, value) in reliable.iter().enumerate() {
            client.send_message(RELIABLE, sequence as u16, *value).unwrap();
        }
        for (sequence, value) in unreliable.iter().enumerate() {
            client.send_message(UNRELIABLE, sequence as u16, *value).unwrap();
        }

        for _ in 0..100 {
            client.advance_time(TICK);
            let datagram = client.generate_with_buffer(max_packet_size * 2).unwrap();
            prop_assert!(datagram.payload.len() <= max_packet_size);
            server.receive(&datagram).unwrap();
            let acks = server.generate().unwrap();
            client.receive(&acks).unwrap();
        }

        prop_assert_eq!(server.received(RELIABLE).len(), reliable.len());
        // unreliable messages that don't fit the space left in a packet are dropped
        let dropped = client.connection().channel_counters(UNRELIABLE).messages_dropped as usize;
        prop_assert_eq!(server.received(UNRELIABLE).len() + dropped, unreliable.len());
    }
}
