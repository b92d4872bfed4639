use std::time::Duration;

use super::*;

fn pump(a: &mut Association, b: &mut Association, now: Instant) {
    loop {
        let mut progressed = false;
        while let Some(raw) = a.poll_transmit() {
            progressed = true;
            b.handle_packet(&raw, now).unwrap();
        }
        while let Some(raw) = b.poll_transmit() {
            progressed = true;
            a.handle_packet(&raw, now).unwrap();
        }
        if !progressed {
            break;
        }
    }
}

fn drain_events(a: &mut Association) -> Vec<AssociationEvent> {
    let mut out = vec![];
    while let Some(ev) = a.poll_event() {
        out.push(ev);
    }
    out
}

fn established_pair(now: Instant) -> (Association, Association) {
    let mut client = Association::new(AssociationConfig::default(), now);
    let mut server = Association::new(AssociationConfig::default(), now);
    client.connect(now);
    pump(&mut client, &mut server, now);
    assert_eq!(client.state(), AssociationState::Established);
    assert_eq!(server.state(), AssociationState::Established);
    assert!(drain_events(&mut client).contains(&AssociationEvent::Connected));
    assert!(drain_events(&mut server).contains(&AssociationEvent::Connected));
    (client, server)
}

#[test]
fn test_cookie_handshake() {
    let now = Instant::now();
    established_pair(now);
}

#[test]
fn test_duplicate_cookie_echo_reacked() {
    let now = Instant::now();
    let mut client = Association::new(AssociationConfig::default(), now);
    let mut server = Association::new(AssociationConfig::default(), now);
    client.connect(now);

    // INIT -> INIT-ACK
    let init = client.poll_transmit().unwrap();
    server.handle_packet(&init, now).unwrap();
    let init_ack = server.poll_transmit().unwrap();
    client.handle_packet(&init_ack, now).unwrap();

    // deliver COOKIE-ECHO twice; the server must answer both times
    let echo = client.poll_transmit().unwrap();
    server.handle_packet(&echo, now).unwrap();
    assert!(server.poll_transmit().is_some());
    server.handle_packet(&echo, now).unwrap();
    assert!(server.poll_transmit().is_some());
}

#[test]
fn test_data_transfer_both_directions() {
    let now = Instant::now();
    let (mut client, mut server) = established_pair(now);

    client
        .send(
            1,
            PayloadProtocolIdentifier::String,
            Bytes::from_static(b"hello world"),
            now,
        )
        .unwrap();
    pump(&mut client, &mut server, now);
    let events = drain_events(&mut server);
    assert!(events.contains(&AssociationEvent::DataReceived {
        stream_id: 1,
        ppid: PayloadProtocolIdentifier::String,
        data: Bytes::from_static(b"hello world"),
    }));

    server
        .send(
            1,
            PayloadProtocolIdentifier::String,
            Bytes::from_static(b"echo"),
            now,
        )
        .unwrap();
    pump(&mut client, &mut server, now);
    let events = drain_events(&mut client);
    assert!(events.contains(&AssociationEvent::DataReceived {
        stream_id: 1,
        ppid: PayloadProtocolIdentifier::String,
        data: Bytes::from_static(b"echo"),
    }));
}

#[test]
fn test_fragmented_message_delivered_once() {
    let now = Instant::now();
    let (mut client, mut server) = established_pair(now);

    let message = Bytes::from(vec![0x42u8; 3000]);
    client
        .send(2, PayloadProtocolIdentifier::Binary, message.clone(), now)
        .unwrap();
    pump(&mut client, &mut server, now);

    let deliveries: Vec<_> = drain_events(&mut server)
        .into_iter()
        .filter(|e| matches!(e, AssociationEvent::DataReceived { .. }))
        .collect();
    assert_eq!(deliveries.len(), 1);
    match &deliveries[0] {
        AssociationEvent::DataReceived { data, .. } => {
            assert_eq!(data.len(), 3000);
            assert_eq!(data, &message);
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_ordered_delivery_across_streams() {
    let now = Instant::now();
    let (mut client, mut server) = established_pair(now);

    for i in 0..5u8 {
        client
            .send(
                1,
                PayloadProtocolIdentifier::Binary,
                Bytes::from(vec![i]),
                now,
            )
            .unwrap();
    }
    pump(&mut client, &mut server, now);

    let payloads: Vec<u8> = drain_events(&mut server)
        .into_iter()
        .filter_map(|e| match e {
            AssociationEvent::DataReceived { data, .. } => Some(data[0]),
            _ => None,
        })
        .collect();
    assert_eq!(payloads, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_sack_reports_gap_blocks() {
    // receiver holding TSNs 100,101,103 reports cum_ack=101 and a
    // gap-ack block [2,2]
    let now = Instant::now();
    let mut receiver = Association::new(AssociationConfig::default(), now);
    receiver.state = AssociationState::Established;
    receiver.my_verification_tag = 7;
    receiver.peer_verification_tag = 8;
    receiver.peer_last_tsn = 99;

    let mut packet = Packet::new(5000, 5000, 7);
    for tsn in [100u32, 101, 103] {
        let mut data = ChunkPayloadData::new(
            tsn,
            0,
            0,
            PayloadProtocolIdentifier::Binary,
            Bytes::from_static(b"x"),
        );
        data.beginning_fragment = true;
        data.ending_fragment = true;
        data.unordered = true;
        packet.chunks.push(Chunk::PayloadData(data));
    }
    receiver.handle_packet(&packet.marshal(), now).unwrap();

    // the gap forces an immediate SACK
    let raw = receiver.poll_transmit().expect("SACK expected");
    let parsed = Packet::unmarshal(&raw).unwrap();
    let sack = parsed
        .chunks
        .iter()
        .find_map(|c| match c {
            Chunk::SelectiveAck(s) => Some(s.clone()),
            _ => None,
        })
        .expect("SACK chunk");
    assert_eq!(sack.cumulative_tsn_ack, 101);
    assert_eq!(sack.gap_ack_blocks, vec![GapAckBlock { start: 2, end: 2 }]);
}

#[test]
fn test_duplicate_tsn_reported() {
    let now = Instant::now();
    let mut receiver = Association::new(AssociationConfig::default(), now);
    receiver.state = AssociationState::Established;
    receiver.my_verification_tag = 7;
    receiver.peer_verification_tag = 8;
    receiver.peer_last_tsn = 99;

    let mut data = ChunkPayloadData::new(
        100,
        0,
        0,
        PayloadProtocolIdentifier::Binary,
        Bytes::from_static(b"x"),
    );
    data.beginning_fragment = true;
    data.ending_fragment = true;
    data.unordered = true;

    let mut packet = Packet::new(5000, 5000, 7);
    packet.chunks.push(Chunk::PayloadData(data.clone()));
    receiver.handle_packet(&packet.marshal(), now).unwrap();
    while receiver.poll_transmit().is_some() {}

    // the same TSN again is a duplicate
    let mut packet = Packet::new(5000, 5000, 7);
    packet.chunks.push(Chunk::PayloadData(data));
    receiver.handle_packet(&packet.marshal(), now).unwrap();
    let raw = receiver.poll_transmit().expect("immediate SACK expected");
    let parsed = Packet::unmarshal(&raw).unwrap();
    match &parsed.chunks[0] {
        Chunk::SelectiveAck(sack) => assert_eq!(sack.duplicate_tsn, vec![100]),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_lost_packet_recovers_and_orders() {
    let now = Instant::now();
    let (mut client, mut server) = established_pair(now);

    for i in 0..6u8 {
        client
            .send(
                1,
                PayloadProtocolIdentifier::Binary,
                Bytes::from(vec![i]),
                now,
            )
            .unwrap();
    }

    // drop the second outbound packet
    let mut packets = vec![];
    while let Some(p) = client.poll_transmit() {
        packets.push(p);
    }
    assert!(packets.len() >= 3);
    packets.remove(1);
    for p in packets {
        server.handle_packet(&p, now).unwrap();
    }

    // SACKs with gap reports flow back; retransmission fills the hole
    for _ in 0..8 {
        pump(&mut client, &mut server, now);
        client.handle_timeout(now + Duration::from_secs(4));
        server.handle_timeout(now + Duration::from_secs(4));
    }
    pump(&mut client, &mut server, now);

    let payloads: Vec<u8> = drain_events(&mut server)
        .into_iter()
        .filter_map(|e| match e {
            AssociationEvent::DataReceived { data, .. } => Some(data[0]),
            _ => None,
        })
        .collect();
    assert_eq!(payloads, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_unordered_stream_delivery() {
    let now = Instant::now();
    let (mut client, mut server) = established_pair(now);
    client.set_stream_reliability(3, true, ReliabilityPolicy::Reliable);

    client
        .send(
            3,
            PayloadProtocolIdentifier::Binary,
            Bytes::from_static(b"unordered"),
            now,
        )
        .unwrap();
    pump(&mut client, &mut server, now);
    assert!(drain_events(&mut server).iter().any(|e| matches!(
        e,
        AssociationEvent::DataReceived { data, .. } if &data[..] == b"unordered"
    )));
}

#[test]
fn test_stream_reset_roundtrip() {
    let now = Instant::now();
    let (mut client, mut server) = established_pair(now);

    client.reset_streams(&[1], now);
    pump(&mut client, &mut server, now);

    assert!(drain_events(&mut server)
        .iter()
        .any(|e| matches!(e, AssociationEvent::StreamsReset { stream_ids } if stream_ids == &vec![1u16])));
    // the response cleared our pending request
    assert!(client.pending_reset_request.is_none());
}

#[test]
fn test_graceful_shutdown() {
    let now = Instant::now();
    let (mut client, mut server) = established_pair(now);

    client.shutdown(now);
    pump(&mut client, &mut server, now);

    assert_eq!(client.state(), AssociationState::Closed);
    assert_eq!(server.state(), AssociationState::Closed);
    assert!(drain_events(&mut client).contains(&AssociationEvent::Closed));
    assert!(drain_events(&mut server).contains(&AssociationEvent::Closed));
}

#[test]
fn test_abort_notifies_peer() {
    let now = Instant::now();
    let (mut client, mut server) = established_pair(now);
    client.abort(now);
    pump(&mut client, &mut server, now);

    let events = drain_events(&mut server);
    assert!(events
        .iter()
        .any(|e| matches!(e, AssociationEvent::Error(Error::ErrPeerAbort(_)))));
    assert!(events.contains(&AssociationEvent::Closed));
}

#[test]
fn test_init_retransmits_then_gives_up() {
    let now = Instant::now();
    let mut client = Association::new(AssociationConfig::default(), now);
    client.connect(now);
    assert!(client.poll_transmit().is_some());

    let mut gave_up = false;
    let mut t = now;
    for _ in 0..12 {
        let deadline = match client.poll_timeout() {
            Some(d) => d,
            None => break,
        };
        t = deadline.max(t);
        client.handle_timeout(t);
        if client.state() == AssociationState::Closed {
            gave_up = true;
            break;
        }
        assert!(client.poll_transmit().is_some(), "INIT retransmission expected");
        while client.poll_transmit().is_some() {}
    }
    assert!(gave_up);
    assert!(drain_events(&mut client)
        .iter()
        .any(|e| matches!(e, AssociationEvent::Error(Error::ErrInitTimeout))));
}

#[test]
fn test_checksum_validated_on_rx() {
    let now = Instant::now();
    let (mut client, _server) = established_pair(now);
    let mut raw = Packet::new(5000, 5000, client.my_verification_tag).marshal();
    raw[8] ^= 0xff;
    // malformed packets are dropped silently, never fatal
    client.handle_packet(&raw, now).unwrap();
    assert!(drain_events(&mut client).is_empty());
}
