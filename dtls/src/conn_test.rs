use std::time::{Duration, Instant};

use super::*;
use crate::crypto::CryptoCertificate;

fn test_config() -> HandshakeConfig {
    let certificate = CryptoCertificate::generate_self_signed(vec!["webrtc".to_owned()]).unwrap();
    let mut config = HandshakeConfig::new(certificate);
    config.srtp_protection_profiles = vec![0x0007, 0x0001];
    config
}

fn pump(client: &mut DtlsEndpoint, server: &mut DtlsEndpoint, now: Instant) {
    // shuttle datagrams until both sides go quiet
    for _ in 0..50 {
        let mut progressed = false;
        while let Some(datagram) = client.poll_transmit() {
            progressed = true;
            server.handle_datagram(&datagram, now).unwrap();
        }
        while let Some(datagram) = server.poll_transmit() {
            progressed = true;
            client.handle_datagram(&datagram, now).unwrap();
        }
        if !progressed {
            break;
        }
    }
}

fn handshake_pair() -> (DtlsEndpoint, DtlsEndpoint) {
    let now = Instant::now();
    let mut client = DtlsEndpoint::new(test_config(), Role::Client);
    let mut server = DtlsEndpoint::new(test_config(), Role::Server);
    client.start_handshake(now).unwrap();
    pump(&mut client, &mut server, now);
    (client, server)
}

fn drain_events(ep: &mut DtlsEndpoint) -> Vec<DtlsEvent> {
    let mut out = vec![];
    while let Some(ev) = ep.poll_event() {
        out.push(ev);
    }
    out
}

#[test]
fn test_full_handshake() {
    let (mut client, mut server) = handshake_pair();

    assert!(client.is_handshake_complete());
    assert!(server.is_handshake_complete());
    assert!(drain_events(&mut client).contains(&DtlsEvent::HandshakeComplete));
    assert!(drain_events(&mut server).contains(&DtlsEvent::HandshakeComplete));

    assert_eq!(client.selected_srtp_profile(), Some(0x0007));
    assert_eq!(server.selected_srtp_profile(), Some(0x0007));
    assert!(client.peer_certificate().is_some());
    assert!(server.peer_certificate().is_some());
}

#[test]
fn test_application_data_both_directions() {
    let (mut client, mut server) = handshake_pair();
    let now = Instant::now();
    drain_events(&mut client);
    drain_events(&mut server);

    client.send_application_data(b"ping").unwrap();
    pump(&mut client, &mut server, now);
    assert_eq!(
        drain_events(&mut server),
        vec![DtlsEvent::ApplicationData(b"ping".to_vec())]
    );

    server.send_application_data(b"pong").unwrap();
    pump(&mut client, &mut server, now);
    assert_eq!(
        drain_events(&mut client),
        vec![DtlsEvent::ApplicationData(b"pong".to_vec())]
    );
}

#[test]
fn test_srtp_keying_material_mirrors() {
    let (client, server) = handshake_pair();
    let client_material = client.export_srtp_keying_material().unwrap();
    let server_material = server.export_srtp_keying_material().unwrap();

    assert_eq!(client_material.profile, 0x0007);
    assert_eq!(client_material.local_key.len(), 16);
    assert_eq!(client_material.local_salt.len(), 12);

    // one side's write keys are the other side's read keys
    assert_eq!(client_material.local_key, server_material.remote_key);
    assert_eq!(client_material.local_salt, server_material.remote_salt);
    assert_eq!(client_material.remote_key, server_material.local_key);
    assert_eq!(client_material.remote_salt, server_material.local_salt);
}

#[test]
fn test_exporter_before_handshake_fails() {
    let client = DtlsEndpoint::new(test_config(), Role::Client);
    assert_eq!(
        client.export_srtp_keying_material(),
        Err(Error::ErrExporterBeforeFinished)
    );
}

#[test]
fn test_retransmit_lost_first_flight() {
    let start = Instant::now();
    let mut client = DtlsEndpoint::new(test_config(), Role::Client);
    let mut server = DtlsEndpoint::new(test_config(), Role::Server);
    client.start_handshake(start).unwrap();

    // lose the first ClientHello
    while client.poll_transmit().is_some() {}

    let deadline = client.poll_timeout().expect("flight 1 must arm a timer");
    assert!(deadline > start);

    // fire the timer; the client re-sends flight 1 with backoff
    client.handle_timeout(deadline).unwrap();
    assert!(client.poll_transmit().is_some());
    while client.poll_transmit().is_some() {}

    // and the handshake still completes from there
    client.handle_timeout(client.poll_timeout().unwrap()).unwrap();
    pump(&mut client, &mut server, start + Duration::from_secs(10));
    assert!(client.is_handshake_complete());
    assert!(server.is_handshake_complete());
}

#[test]
fn test_flight_abandoned_after_max_transmits() {
    let start = Instant::now();
    let mut client = DtlsEndpoint::new(test_config(), Role::Client);
    client.start_handshake(start).unwrap();

    let mut result = Ok(());
    for _ in 0..16 {
        let deadline = match client.poll_timeout() {
            Some(d) => d,
            None => break,
        };
        result = client.handle_timeout(deadline);
        if result.is_err() {
            break;
        }
    }
    assert!(matches!(result, Err(Error::ErrHandshakeTimeout(_))));
    assert!(drain_events(&mut client)
        .iter()
        .any(|e| matches!(e, DtlsEvent::Error(Error::ErrHandshakeTimeout(_)))));
}

#[test]
fn test_no_shared_srtp_profile_fails() {
    let now = Instant::now();
    let mut client_config = test_config();
    client_config.srtp_protection_profiles = vec![0x0001];
    let mut server_config = test_config();
    server_config.srtp_protection_profiles = vec![0x0008];

    let mut client = DtlsEndpoint::new(client_config, Role::Client);
    let mut server = DtlsEndpoint::new(server_config, Role::Server);
    client.start_handshake(now).unwrap();

    // flight 1
    let datagram = client.poll_transmit().unwrap();
    server.handle_datagram(&datagram, now).unwrap();
    // flight 2 (cookie)
    let datagram = server.poll_transmit().unwrap();
    client.handle_datagram(&datagram, now).unwrap();
    // flight 3 carries the client's srtp offer; server must refuse
    let datagram = client.poll_transmit().unwrap();
    assert!(server.handle_datagram(&datagram, now).is_err());
}

#[test]
fn test_handshake_without_ems_when_disabled() {
    let now = Instant::now();
    let mut client_config = test_config();
    client_config.extended_master_secret = false;
    let mut client = DtlsEndpoint::new(client_config, Role::Client);
    let mut server = DtlsEndpoint::new(test_config(), Role::Server);
    client.start_handshake(now).unwrap();
    pump(&mut client, &mut server, now);
    // the classic master secret path still completes
    assert!(client.is_handshake_complete());
    assert!(server.is_handshake_complete());
}
