use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use tern::{
    ChannelConfig, Transport, TransportCommand, TransportConfig, TransportEvent,
};

struct Endpoint {
    transport: Transport,
    events: mpsc::Receiver<TransportEvent>,
}

async fn connected_pair() -> (Endpoint, Endpoint) {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut config_a = TransportConfig::new(true);
    config_a.include_loopback = true;
    let mut config_b = TransportConfig::new(false);
    config_b.include_loopback = true;

    let (a, events_a) = Transport::spawn(config_a).await.unwrap();
    let (b, events_b) = Transport::spawn(config_b).await.unwrap();

    // signaling: exchange ICE credentials and certificate fingerprints
    a.command(TransportCommand::SetRemoteParameters {
        ice_ufrag: b.local.ice_ufrag.clone(),
        ice_pwd: b.local.ice_pwd.clone(),
        fingerprint: Some(b.local.fingerprint.clone()),
    })
    .await
    .unwrap();
    b.command(TransportCommand::SetRemoteParameters {
        ice_ufrag: a.local.ice_ufrag.clone(),
        ice_pwd: a.local.ice_pwd.clone(),
        fingerprint: Some(a.local.fingerprint.clone()),
    })
    .await
    .unwrap();

    (
        Endpoint {
            transport: a,
            events: events_a,
        },
        Endpoint {
            transport: b,
            events: events_b,
        },
    )
}

/// Relays candidate lines between the endpoints and waits until both
/// report an established SCTP association.
async fn establish(a: &mut Endpoint, b: &mut Endpoint) {
    let mut a_ready = false;
    let mut b_ready = false;
    let deadline = Duration::from_secs(10);

    timeout(deadline, async {
        while !(a_ready && b_ready) {
            tokio::select! {
                Some(event) = a.events.recv() => match event {
                    TransportEvent::LocalCandidate(line) => {
                        b.transport
                            .command(TransportCommand::AddRemoteCandidate(line))
                            .await
                            .unwrap();
                    }
                    TransportEvent::SctpEstablished => a_ready = true,
                    TransportEvent::Error(e) => panic!("endpoint a failed: {e}"),
                    _ => {}
                },
                Some(event) = b.events.recv() => match event {
                    TransportEvent::LocalCandidate(line) => {
                        a.transport
                            .command(TransportCommand::AddRemoteCandidate(line))
                            .await
                            .unwrap();
                    }
                    TransportEvent::SctpEstablished => b_ready = true,
                    TransportEvent::Error(e) => panic!("endpoint b failed: {e}"),
                    _ => {}
                },
            }
        }
    })
    .await
    .expect("endpoints failed to establish in time");
}

async fn wait_for<F>(endpoint: &mut Endpoint, mut predicate: F) -> TransportEvent
where
    F: FnMut(&TransportEvent) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let event = endpoint.events.recv().await.expect("event channel closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test]
async fn test_data_channel_echo() {
    let (mut a, mut b) = connected_pair().await;
    establish(&mut a, &mut b).await;

    // open a channel labeled "test" from the client side
    a.transport
        .command(TransportCommand::OpenDataChannel {
            stream_id: 1,
            config: ChannelConfig::reliable("test"),
        })
        .await
        .unwrap();

    let opened = wait_for(&mut b, |e| {
        matches!(e, TransportEvent::DataChannelOpened { .. })
    })
    .await;
    match &opened {
        TransportEvent::DataChannelOpened { label, .. } => assert_eq!(label, "test"),
        _ => unreachable!(),
    }
    wait_for(&mut a, |e| {
        matches!(e, TransportEvent::DataChannelOpened { .. })
    })
    .await;

    // a -> b: "hello world"
    a.transport
        .command(TransportCommand::SendData {
            stream_id: 1,
            binary: false,
            data: b"hello world".to_vec(),
        })
        .await
        .unwrap();
    let received = wait_for(&mut b, |e| {
        matches!(e, TransportEvent::DataChannelMessage { .. })
    })
    .await;
    match &received {
        TransportEvent::DataChannelMessage { binary, data, .. } => {
            assert!(!binary);
            assert_eq!(data, b"hello world");
        }
        _ => unreachable!(),
    }

    // echo b -> a
    b.transport
        .command(TransportCommand::SendData {
            stream_id: 1,
            binary: false,
            data: b"hello world".to_vec(),
        })
        .await
        .unwrap();
    let echoed = wait_for(&mut a, |e| {
        matches!(e, TransportEvent::DataChannelMessage { .. })
    })
    .await;
    match &echoed {
        TransportEvent::DataChannelMessage { data, .. } => assert_eq!(data, b"hello world"),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_rtp_and_keyframe_request() {
    let (mut a, mut b) = connected_pair().await;
    establish(&mut a, &mut b).await;

    // a plain RTP packet, already encoded by the application layer
    let rtp_packet: Vec<u8> = {
        use util::marshal::Marshal;
        let packet = rtp::packet::Packet {
            header: rtp::header::Header {
                version: 2,
                payload_type: 96,
                sequence_number: 1234,
                timestamp: 3000,
                ssrc: 0x1122_3344,
                ..Default::default()
            },
            payload: bytes::Bytes::from_static(b"fake encoded frame"),
        };
        packet.marshal().unwrap().to_vec()
    };

    a.transport
        .command(TransportCommand::SendRtp(rtp_packet.clone()))
        .await
        .unwrap();
    let received = wait_for(&mut b, |e| matches!(e, TransportEvent::RtpPacket(_))).await;
    match &received {
        TransportEvent::RtpPacket(data) => assert_eq!(data, &rtp_packet),
        _ => unreachable!(),
    }

    // b asks a for a keyframe with a PLI
    b.transport
        .command(TransportCommand::RequestKeyframe {
            sender_ssrc: 0x5566_7788,
            media_ssrc: 0x1122_3344,
        })
        .await
        .unwrap();
    let request = wait_for(&mut a, |e| {
        matches!(e, TransportEvent::KeyframeRequest { .. })
    })
    .await;
    match &request {
        TransportEvent::KeyframeRequest { ssrc } => assert_eq!(*ssrc, 0x1122_3344),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_close_tears_down_channels() {
    let (mut a, mut b) = connected_pair().await;
    establish(&mut a, &mut b).await;

    a.transport
        .command(TransportCommand::OpenDataChannel {
            stream_id: 1,
            config: ChannelConfig::reliable("doomed"),
        })
        .await
        .unwrap();
    wait_for(&mut b, |e| {
        matches!(e, TransportEvent::DataChannelOpened { .. })
    })
    .await;

    a.transport.command(TransportCommand::Close).await.unwrap();
    wait_for(&mut a, |e| matches!(e, TransportEvent::Closed)).await;

    // the peer observes the SCTP teardown
    wait_for(&mut b, |e| {
        matches!(
            e,
            TransportEvent::DataChannelClosed { .. } | TransportEvent::Error(_)
        )
    })
    .await;
}
