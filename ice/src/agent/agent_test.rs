use std::time::Duration;

use tokio::sync::mpsc;

use super::*;
use crate::candidate::unmarshal_candidate;

async fn drive(
    a: &mut Agent,
    rx_a: &mut mpsc::Receiver<super::gather::InboundDatagram>,
    b: &mut Agent,
    rx_b: &mut mpsc::Receiver<super::gather::InboundDatagram>,
) {
    for _ in 0..400 {
        let now = Instant::now();
        a.handle_timeout(now);
        b.handle_timeout(now);
        while let Ok((idx, src, data)) = rx_a.try_recv() {
            a.handle_datagram(idx, src, &data, Instant::now());
        }
        while let Ok((idx, src, data)) = rx_b.try_recv() {
            b.handle_datagram(idx, src, &data, Instant::now());
        }
        let a_done = matches!(
            a.state(),
            IceConnectionState::Connected | IceConnectionState::Completed
        );
        let b_done = matches!(
            b.state(),
            IceConnectionState::Connected | IceConnectionState::Completed
        );
        if a_done && b_done {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "agents failed to connect: a={:?} b={:?}",
        a.state(),
        b.state()
    );
}

fn exchange(from: &Agent, to: &mut Agent, now: Instant) {
    let (ufrag, pwd) = from.local_credentials();
    to.set_remote_credentials(ufrag, pwd);
    for candidate in from.local_candidates() {
        // candidates travel as SDP attribute lines
        let line = candidate.marshal();
        let parsed = unmarshal_candidate(&line).unwrap();
        to.add_remote_candidate(Some(parsed), now);
    }
    to.add_remote_candidate(None, now);
}

#[tokio::test]
async fn test_agents_connect_over_loopback() {
    let config = AgentConfig {
        include_loopback: true,
        ..Default::default()
    };
    let mut a = Agent::new(AgentConfig {
        is_controlling: true,
        ..config.clone()
    });
    let mut b = Agent::new(config);

    let (tx_a, mut rx_a) = mpsc::channel(64);
    let (tx_b, mut rx_b) = mpsc::channel(64);
    a.gather(tx_a).await.unwrap();
    b.gather(tx_b).await.unwrap();
    assert!(!a.local_candidates().is_empty());

    let now = Instant::now();
    exchange(&a, &mut b, now);
    exchange(&b, &mut a, now);

    drive(&mut a, &mut rx_a, &mut b, &mut rx_b).await;

    assert!(a.selected_remote_addr().is_some());
    assert!(b.selected_remote_addr().is_some());

    // payload flows over the selected pair and surfaces as an event
    a.send_payload(b"ping").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok((idx, src, data)) = rx_b.try_recv() {
        b.handle_datagram(idx, src, &data, Instant::now());
    }
    let mut got_payload = false;
    while let Some(event) = b.poll_event() {
        if let IceEvent::PayloadReceived(data) = event {
            assert_eq!(data, b"ping");
            got_payload = true;
        }
    }
    assert!(got_payload);

    a.close();
    b.close();
}

#[tokio::test]
async fn test_gathering_emits_sentinel() {
    let mut a = Agent::new(AgentConfig {
        include_loopback: true,
        ..Default::default()
    });
    let (tx, _rx) = mpsc::channel(16);
    a.gather(tx).await.unwrap();

    // quiescence window elapses with no further candidates
    let deadline = a.poll_timeout().unwrap();
    a.handle_timeout(deadline + Duration::from_millis(1));

    let mut saw_candidate = false;
    let mut saw_sentinel = false;
    while let Some(event) = a.poll_event() {
        match event {
            IceEvent::GatheredCandidate(Some(_)) => saw_candidate = true,
            IceEvent::GatheredCandidate(None) => saw_sentinel = true,
            _ => {}
        }
    }
    assert!(saw_candidate);
    assert!(saw_sentinel);
    a.close();
}

#[test]
fn test_role_conflict_switches_role() {
    let mut agent = Agent::new(AgentConfig {
        is_controlling: true,
        ..Default::default()
    });
    agent.set_remote_credentials("r".into(), "rpwd".into());

    // craft an authenticated request that also claims controlling with
    // a larger tiebreaker
    agent.tiebreaker = 1;
    let src: SocketAddr = "127.0.0.1:4000".parse().unwrap();
    agent.local_candidates.push(Candidate::new_host(
        "127.0.0.1".parse().unwrap(),
        4001,
        0,
    ));

    let mut m = Message::new(BINDING_REQUEST);
    Username::add_to(&mut m, "l:r");
    UInt64Attribute::add_to(&mut m, ATTR_ICE_CONTROLLING, u64::MAX);
    MessageIntegrity::new_short_term(&agent.local_pwd)
        .add_to(&mut m)
        .unwrap();
    Fingerprint::add_to(&mut m).unwrap();
    let decoded = Message::decode(&m.raw).unwrap();

    agent.handle_binding_request(0, src, decoded, Instant::now());
    assert!(!agent.is_controlling, "smaller tiebreaker side must yield");
}
