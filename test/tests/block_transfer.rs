use std::time::Duration;

use channelwire::{ChannelConfig, ChannelError, ConnectionConfig, SenderError};
use channelwire_test::{
    assert_no_live_messages, test_block, LinkConditions, Received, TestEndpoint, TestNetwork,
};

const RELIABLE: usize = 0;

fn config() -> ConnectionConfig {
    ConnectionConfig::new(1200, vec![ChannelConfig::reliable_ordered()])
}

/// Test that a four fragment block survives losing one fragment, and that
/// the message queued behind it waits for the block
#[test]
fn test_block_survives_a_lost_fragment() {
    let mut client = TestEndpoint::new(config());
    let mut server = TestEndpoint::new(config());

    client.send_block(RELIABLE, 0, 4000).unwrap();
    client.send_message(RELIABLE, 1, 99).unwrap();

    let fragment_0 = client.generate().unwrap();
    let _fragment_1 = client.generate().unwrap();
    let fragment_2 = client.generate().unwrap();
    let fragment_3 = client.generate().unwrap();
    for fragment in [&fragment_0, &fragment_2, &fragment_3] {
        server.receive(fragment).unwrap();
    }
    assert!(server.received(RELIABLE).is_empty());
    assert_eq!(server.connection().channel_counters(RELIABLE).fragments_received, 3);

    let acks = server.generate().unwrap();
    client.receive(&acks).unwrap();

    client.advance_time(Duration::from_millis(250));
    let resend = client.generate().unwrap();
    server.receive(&resend).unwrap();
    assert_eq!(
        server.received(RELIABLE),
        &[Received::Block {
            sequence: 0,
            block: test_block(0, 4000)
        }]
    );

    let acks = server.generate().unwrap();
    client.receive(&acks).unwrap();
    let next = client.generate().unwrap();
    server.receive(&next).unwrap();
    assert_eq!(server.received_sequences(RELIABLE), vec![0, 1]);

    let counters = client.connection().channel_counters(RELIABLE);
    assert_eq!(counters.fragments_sent, 5);
    assert_eq!(counters.messages_resent, 1);
    assert_eq!(counters.messages_acked, 1);
}

/// Test that a block over the channel's limit is refused at send time
#[test]
fn test_oversized_block_is_refused() {
    let config = ConnectionConfig::new(
        1200,
        vec![ChannelConfig {
            max_block_size: 2048,
            ..ChannelConfig::reliable_ordered()
        }],
    );
    let mut client = TestEndpoint::new(config);

    let result = client.send_block(RELIABLE, 0, 2049);
    assert_eq!(
        result,
        Err(ChannelError::Sender(SenderError::BlockTooLarge {
            block_size: 2049,
            max_block_size: 2048,
        }))
    );
    assert!(client.send_block(RELIABLE, 0, 2048).is_ok());
}

/// Test that blocks and messages interleaved on a bad link all arrive intact
/// and in order
#[test]
fn test_blocks_cross_a_lossy_link() {
    let conditions = LinkConditions {
        loss: 0.2,
        duplicate: 0.1,
        reorder: 0.2,
        max_delay_ticks: 2,
    };
    let mut network = TestNetwork::new(config(), conditions, 7);

    let sizes = [5000usize, 1, 1024, 3000];
    let mut sequence = 0u16;
    for size in sizes {
        network.client.send_block(RELIABLE, sequence, size).unwrap();
        network.client.send_message(RELIABLE, sequence + 1, 7).unwrap();
        sequence += 2;
    }

    let delivered = network.run_until(5000, |network| {
        network.server.received(RELIABLE).len() >= 8
    });
    assert!(delivered);

    let received = network.server.received(RELIABLE);
    for (position, size) in sizes.iter().enumerate() {
        let block_sequence = (position * 2) as u16;
        assert_eq!(
            received[position * 2],
            Received::Block {
                sequence: block_sequence,
                block: test_block(block_sequence, *size)
            }
        );
        assert_eq!(received[position * 2 + 1].sequence(), block_sequence + 1);
    }

    network.set_conditions(LinkConditions::perfect());
    assert!(network.run_until(200, |network| network.client.num_live_messages() == 0));
    assert_no_live_messages!(network.server);
}
