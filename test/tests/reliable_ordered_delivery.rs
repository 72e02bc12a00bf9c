use std::time::Duration;

use channelwire::{ChannelConfig, ConnectionConfig};
use channelwire_test::{
    assert_delivered_in_order, assert_no_live_messages, exchange_packets, LinkConditions,
    Received, TestEndpoint, TestNetwork,
};

const RELIABLE: usize = 0;

fn config() -> ConnectionConfig {
    ConnectionConfig::new(
        1200,
        vec![
            ChannelConfig::reliable_ordered(),
            ChannelConfig::unreliable_unordered(),
        ],
    )
}

/// Test that messages sent on a clean link arrive once each, in order
#[test]
fn test_perfect_link_delivers_in_order() {
    let mut client = TestEndpoint::new(config());
    let mut server = TestEndpoint::new(config());

    for sequence in 0..100u16 {
        client
            .send_message(RELIABLE, sequence, u32::from(sequence) * 3)
            .expect("send failed");
    }
    exchange_packets(&mut client, &mut server);

    assert_delivered_in_order!(server, RELIABLE, 100u16);
    assert_eq!(
        server.received(RELIABLE)[7],
        Received::Message {
            sequence: 7,
            value: 21
        }
    );
}

/// Test that a later message waits for a lost earlier one, and both are
/// delivered in order once the lost one is resent
#[test]
fn test_lost_message_stalls_later_messages_until_resent() {
    let mut client = TestEndpoint::new(config());
    let mut server = TestEndpoint::new(config());

    client.send_message(RELIABLE, 0, 10).unwrap();
    let first = client.generate().unwrap();
    server.receive(&first).unwrap();

    client.send_message(RELIABLE, 1, 11).unwrap();
    let _lost = client.generate().unwrap();

    client.send_message(RELIABLE, 2, 12).unwrap();
    let third = client.generate().unwrap();
    server.receive(&third).unwrap();

    assert_eq!(server.received_sequences(RELIABLE), vec![0]);

    // acks packets 0 and 2
    let acks = server.generate().unwrap();
    client.receive(&acks).unwrap();
    assert_eq!(client.connection().channel_counters(RELIABLE).messages_acked, 2);

    // not due for resend yet
    let early = client.generate().unwrap();
    server.receive(&early).unwrap();
    assert_eq!(server.received_sequences(RELIABLE), vec![0]);

    client.advance_time(Duration::from_millis(100));
    let resend = client.generate().unwrap();
    server.receive(&resend).unwrap();

    assert_delivered_in_order!(server, RELIABLE, 3u16);
    assert_eq!(client.connection().channel_counters(RELIABLE).messages_resent, 1);
    assert_eq!(
        server.received(RELIABLE)[1],
        Received::Message {
            sequence: 1,
            value: 11
        }
    );
}

/// Test that a duplicated packet doesn't deliver its messages twice
#[test]
fn test_duplicate_packet_delivers_once() {
    let mut client = TestEndpoint::new(config());
    let mut server = TestEndpoint::new(config());

    client.send_message(RELIABLE, 0, 1).unwrap();
    client.send_message(RELIABLE, 1, 2).unwrap();
    let datagram = client.generate().unwrap();

    server.receive(&datagram).unwrap();
    server.receive(&datagram).unwrap();

    assert_delivered_in_order!(server, RELIABLE, 2u16);
    assert_eq!(server.connection().channel_counters(RELIABLE).messages_received, 2);
}

/// Test that packets arriving out of order still deliver in send order
#[test]
fn test_reordered_packets_deliver_in_order() {
    let mut client = TestEndpoint::new(config());
    let mut server = TestEndpoint::new(config());

    let mut datagrams = Vec::new();
    for sequence in 0..5u16 {
        client.send_message(RELIABLE, sequence, 0).unwrap();
        datagrams.push(client.generate().unwrap());
    }

    for datagram in datagrams.iter().rev() {
        server.receive(datagram).unwrap();
        if datagram.packet_index > 0 {
            assert!(server.received(RELIABLE).is_empty());
        }
    }

    assert_delivered_in_order!(server, RELIABLE, 5u16);
}

/// Test that every message crosses a lossy, duplicating, reordering link
/// exactly once and in order, and that nothing is left alive once the link
/// settles
#[test]
fn test_lossy_link_delivers_every_message_in_order() {
    let conditions = LinkConditions {
        loss: 0.25,
        duplicate: 0.1,
        reorder: 0.3,
        max_delay_ticks: 3,
    };
    // a few messages per packet, so the transfer spans many packets
    let config = ConnectionConfig::new(
        1200,
        vec![ChannelConfig {
            max_messages_per_packet: 4,
            ..ChannelConfig::reliable_ordered()
        }],
    );
    let mut network = TestNetwork::new(config, conditions, 0x5EED);

    for sequence in 0..200u16 {
        network
            .client
            .send_message(RELIABLE, sequence, u32::from(sequence))
            .unwrap();
    }

    let delivered = network.run_until(3000, |network| {
        network.server.received(RELIABLE).len() >= 200
    });
    assert!(delivered, "only {} messages arrived", network.server.received(RELIABLE).len());
    assert_delivered_in_order!(network.server, RELIABLE, 200u16);
    assert!(network.client.connection().counters().packets_generated >= 50);
    assert!(network.sockets.to_server.lost() > 0);
    assert!(network.client.connection().channel_counters(RELIABLE).messages_resent > 0);

    network.set_conditions(LinkConditions::perfect());
    let settled = network.run_until(200, |network| {
        network.client.num_live_messages() == 0 && network.sockets.is_idle()
    });
    assert!(settled);
    assert_no_live_messages!(network.client);
    assert_no_live_messages!(network.server);
    assert_eq!(network.client.connection().channel_counters(RELIABLE).messages_acked, 200);
}

/// Test that both directions carry reliable traffic at the same time
#[test]
fn test_both_directions_deliver_independently() {
    let mut network = TestNetwork::new(config(), LinkConditions::lossy(0.2), 42);

    for sequence in 0..50u16 {
        network.client.send_message(RELIABLE, sequence, 1).unwrap();
        network.server.send_message(RELIABLE, sequence, 2).unwrap();
    }

    let delivered = network.run_until(2000, |network| {
        network.server.received(RELIABLE).len() >= 50
            && network.client.received(RELIABLE).len() >= 50
    });
    assert!(delivered);
    assert_delivered_in_order!(network.server, RELIABLE, 50u16);
    assert_delivered_in_order!(network.client, RELIABLE, 50u16);
}

/// Test that a reset connection starts numbering messages from zero again
#[test]
fn test_reset_connections_start_over() {
    let mut client = TestEndpoint::new(config());
    let mut server = TestEndpoint::new(config());

    for sequence in 0..3u16 {
        client.send_message(RELIABLE, sequence, 0).unwrap();
    }
    exchange_packets(&mut client, &mut server);
    assert_delivered_in_order!(server, RELIABLE, 3u16);

    client.reset();
    server.reset();
    assert_no_live_messages!(client);

    client.send_message(RELIABLE, 0, 5).unwrap();
    exchange_packets(&mut client, &mut server);
    assert_delivered_in_order!(server, RELIABLE, 1u16);
}
