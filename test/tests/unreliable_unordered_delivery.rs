use std::time::Duration;

use channelwire::{ChannelConfig, ConnectionConfig, OverflowPolicy};
use channelwire_test::{exchange_packets, Received, TestEndpoint};

const RELIABLE: usize = 0;
const UNRELIABLE: usize = 1;

fn config(unreliable: ChannelConfig) -> ConnectionConfig {
    ConnectionConfig::new(1200, vec![ChannelConfig::reliable_ordered(), unreliable])
}

fn small_send_queue(overflow: OverflowPolicy) -> ChannelConfig {
    ChannelConfig {
        send_queue_size: 2,
        overflow,
        ..ChannelConfig::unreliable_unordered()
    }
}

/// Test that a full send queue keeps the oldest messages by default
#[test]
fn test_full_send_queue_drops_newest_by_default() {
    let config = config(small_send_queue(OverflowPolicy::default()));
    let mut client = TestEndpoint::new(config.clone());
    let mut server = TestEndpoint::new(config);

    for sequence in 0..3u16 {
        client.send_message(UNRELIABLE, sequence, 0).unwrap();
    }
    assert_eq!(client.connection().channel_counters(UNRELIABLE).messages_dropped, 1);
    assert_eq!(client.connection().channel_counters(UNRELIABLE).messages_sent, 2);

    exchange_packets(&mut client, &mut server);
    assert_eq!(server.received_sequences(UNRELIABLE), vec![0, 1]);
}

/// Test that a full send queue can evict its oldest message instead
#[test]
fn test_full_send_queue_can_drop_oldest() {
    let config = config(small_send_queue(OverflowPolicy::DropOldest));
    let mut client = TestEndpoint::new(config.clone());
    let mut server = TestEndpoint::new(config);

    for sequence in 0..3u16 {
        client.send_message(UNRELIABLE, sequence, 0).unwrap();
    }
    assert_eq!(client.connection().channel_counters(UNRELIABLE).messages_dropped, 1);

    exchange_packets(&mut client, &mut server);
    assert_eq!(server.received_sequences(UNRELIABLE), vec![1, 2]);
}

/// Test that a full receive queue drops what doesn't fit
#[test]
fn test_full_receive_queue_drops_messages() {
    let config = config(ChannelConfig {
        send_queue_size: 4,
        receive_queue_size: 2,
        ..ChannelConfig::unreliable_unordered()
    });
    let mut client = TestEndpoint::new(config.clone());
    let mut server = TestEndpoint::new(config);

    for sequence in 0..4u16 {
        client.send_message(UNRELIABLE, sequence, 0).unwrap();
    }
    exchange_packets(&mut client, &mut server);

    assert_eq!(server.received_sequences(UNRELIABLE), vec![0, 1]);
    assert_eq!(server.connection().channel_counters(UNRELIABLE).messages_dropped, 2);
}

/// Test that a lost unreliable message is never sent again
#[test]
fn test_lost_messages_are_not_resent() {
    let config = config(ChannelConfig::unreliable_unordered());
    let mut client = TestEndpoint::new(config.clone());
    let mut server = TestEndpoint::new(config);

    client.send_message(UNRELIABLE, 0, 9).unwrap();
    let _lost = client.generate().unwrap();

    client.advance_time(Duration::from_secs(5));
    let later = client.generate().unwrap();
    server.receive(&later).unwrap();

    assert!(server.received(UNRELIABLE).is_empty());
    assert_eq!(client.connection().channel_counters(UNRELIABLE).messages_resent, 0);
    assert_eq!(client.num_live_messages(), 0);
}

/// Test that both channels share one packet, each delivering its own
/// messages
#[test]
fn test_channels_share_a_packet() {
    let config = config(ChannelConfig::unreliable_unordered());
    let mut client = TestEndpoint::new(config.clone());
    let mut server = TestEndpoint::new(config);

    client.send_message(RELIABLE, 0, 100).unwrap();
    client.send_message(UNRELIABLE, 0, 200).unwrap();
    client.send_message(UNRELIABLE, 1, 201).unwrap();
    exchange_packets(&mut client, &mut server);

    assert_eq!(
        server.received(RELIABLE),
        &[Received::Message {
            sequence: 0,
            value: 100
        }]
    );
    assert_eq!(
        server.received(UNRELIABLE),
        &[
            Received::Message {
                sequence: 0,
                value: 200
            },
            Received::Message {
                sequence: 1,
                value: 201
            },
        ]
    );
}
