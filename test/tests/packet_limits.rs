use channelwire::{
    Allocator, ChannelConfig, ConnectionConfig, ConnectionError, ConnectionPacket,
};
use channelwire_test::{
    assert_delivered_in_order, assert_packet_fits, Datagram, TestEndpoint, TICK,
};

const RELIABLE: usize = 0;
const UNRELIABLE: usize = 1;

fn small_packet_config() -> ConnectionConfig {
    ConnectionConfig::new(
        300,
        vec![
            ChannelConfig {
                block_fragment_size: 128,
                max_block_size: 4096,
                ..ChannelConfig::reliable_ordered()
            },
            ChannelConfig::unreliable_unordered(),
        ],
    )
}

/// Test that generated packets never exceed the maximum packet size, even
/// when the caller's buffer is larger
#[test]
fn test_packets_never_exceed_max_size() {
    let config = small_packet_config();
    let mut client = TestEndpoint::new(config.clone());
    let mut server = TestEndpoint::new(config.clone());

    for sequence in 0..500u16 {
        client
            .send_message(RELIABLE, sequence, u32::MAX - u32::from(sequence))
            .unwrap();
    }
    client.send_block(RELIABLE, 500, 4000).unwrap();
    for sequence in 0..50u16 {
        client.send_message(UNRELIABLE, sequence, 1).unwrap();
    }

    for _ in 0..200 {
        client.advance_time(TICK);
        server.advance_time(TICK);

        let datagram = client.generate_with_buffer(2048).unwrap();
        assert_packet_fits!(datagram, config);
        server.receive(&datagram).unwrap();

        let acks = server.generate_with_buffer(2048).unwrap();
        assert_packet_fits!(acks, config);
        client.receive(&acks).unwrap();
    }

    assert_delivered_in_order!(server, RELIABLE, 501u16);
    assert!(!server.received(UNRELIABLE).is_empty());
}

/// Test that packets carrying every number of channel entries read back
/// with the same number of entries
#[test]
fn test_packets_round_trip_any_number_of_entries() {
    let config = ConnectionConfig::new(1200, vec![ChannelConfig::reliable_ordered(); 4]);

    for channels_used in 0..=4usize {
        let mut client = TestEndpoint::new(config.clone());
        let mut server = TestEndpoint::new(config.clone());
        for channel in 0..channels_used {
            client.send_message(channel, 0, channel as u32).unwrap();
        }

        let datagram = client.generate().unwrap();
        let packet = ConnectionPacket::read(&datagram.payload, &config, server.factory()).unwrap();
        assert_eq!(packet.len(), channels_used);
        for (position, entry) in packet.entries().iter().enumerate() {
            assert_eq!(entry.channel_index, position);
        }
        drop(packet);

        server.receive(&datagram).unwrap();
        for channel in 0..channels_used {
            assert_eq!(server.received_sequences(channel), vec![0]);
        }
    }
}

/// Test that a buffer too small for the packet header fails without taking
/// any memory or any queued message
#[test]
fn test_buffer_smaller_than_header_is_refused() {
    let config = ConnectionConfig::new(1200, vec![ChannelConfig::reliable_ordered()]);
    let mut client =
        TestEndpoint::with_allocator(config.clone(), Allocator::with_capacity(1 << 20));
    let mut server = TestEndpoint::new(config);
    client.send_message(RELIABLE, 0, 3).unwrap();

    let bytes_used = client.factory().allocator().bytes_used();
    let result = client.generate_with_buffer(7);
    assert_eq!(
        result,
        Err(ConnectionError::PacketBudgetTooSmall {
            available_bits: 56,
            required_bits: 64,
        })
    );
    assert_eq!(client.factory().allocator().bytes_used(), bytes_used);
    assert_eq!(client.connection().counters().packets_generated, 0);

    let datagram = client.generate().unwrap();
    server.receive(&datagram).unwrap();
    assert_eq!(server.received_sequences(RELIABLE), vec![0]);
}

/// Test that processing the same acks again changes nothing
#[test]
fn test_acks_are_idempotent() {
    let config = ConnectionConfig::new(1200, vec![ChannelConfig::reliable_ordered()]);
    let mut client = TestEndpoint::new(config.clone());
    let mut server = TestEndpoint::new(config);

    for sequence in 0..3u16 {
        client.send_message(RELIABLE, sequence, 0).unwrap();
    }
    let datagram = client.generate().unwrap();
    server.receive(&datagram).unwrap();

    let acks = server.generate().unwrap();
    client.receive(&acks).unwrap();
    client.receive(&acks).unwrap();
    client.connection_mut().process_acks(&[datagram.packet_index, 999]);

    assert_eq!(client.connection().counters().acks_processed, 1);
    assert_eq!(client.connection().channel_counters(RELIABLE).messages_acked, 3);
    assert_eq!(client.num_live_messages(), 0);
}

/// Test that garbage is rejected whole and leaves the connection usable
#[test]
fn test_garbage_packets_are_rejected() {
    let config = ConnectionConfig::new(1200, vec![ChannelConfig::reliable_ordered()]);
    let mut client = TestEndpoint::new(config.clone());
    let mut server = TestEndpoint::new(config);

    let garbage = Datagram {
        packet_index: 0,
        acks: Vec::new(),
        payload: vec![0xFF; 40],
    };
    assert!(server.receive(&garbage).is_err());
    assert_eq!(server.connection().counters().packets_rejected, 1);
    assert_eq!(server.rejected(), 1);

    client.send_message(RELIABLE, 0, 1).unwrap();
    let datagram = client.generate().unwrap();
    server.receive(&datagram).unwrap();
    assert_eq!(server.received_sequences(RELIABLE), vec![0]);
}
