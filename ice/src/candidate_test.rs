use super::*;

#[test]
fn test_host_priority() {
    let c = Candidate::new_host("192.168.1.10".parse().unwrap(), 53210, 0);
    // (126 << 24) + (65535 << 8) + 255
    assert_eq!(c.priority(), 0x7EFF_FFFF);
}

#[test]
fn test_prflx_priority_attribute_value() {
    let c = Candidate::new_host("10.0.0.2".parse().unwrap(), 4444, 0);
    // (110 << 24) + (65535 << 8) + 255
    assert_eq!(c.prflx_priority(), 0x6EFF_FFFF);
}

#[test]
fn test_marshal_unmarshal_host() {
    let c = Candidate::new_host("192.168.1.10".parse().unwrap(), 53210, 0);
    let line = c.marshal();
    let parsed = unmarshal_candidate(&line).unwrap();
    assert_eq!(parsed.candidate_type, CandidateType::Host);
    assert_eq!(parsed.address, c.address);
    assert_eq!(parsed.port, c.port);
    assert_eq!(parsed.marshal(), line);
}

#[test]
fn test_marshal_unmarshal_srflx_with_related() {
    let c = Candidate {
        candidate_type: CandidateType::ServerReflexive,
        component: 1,
        address: "203.0.113.5".parse().unwrap(),
        port: 61000,
        related_address: Some("192.168.1.10:53210".parse().unwrap()),
        tcp_type: None,
        generation: Some(0),
        ufrag: Some("abcd".to_owned()),
        socket_index: 0,
    };
    let line = c.marshal();
    let parsed = unmarshal_candidate(&line).unwrap();
    assert_eq!(parsed.candidate_type, CandidateType::ServerReflexive);
    assert_eq!(parsed.related_address, c.related_address);
    assert_eq!(parsed.generation, Some(0));
    assert_eq!(parsed.ufrag.as_deref(), Some("abcd"));
    assert_eq!(parsed.marshal(), line);
}

#[test]
fn test_unmarshal_with_prefix() {
    let parsed =
        unmarshal_candidate("candidate:4234997325 1 udp 2043278322 192.168.0.56 44323 typ host")
            .unwrap();
    assert_eq!(parsed.port, 44323);
    assert_eq!(parsed.candidate_type, CandidateType::Host);
}

#[test]
fn test_unmarshal_garbage_rejected() {
    assert!(unmarshal_candidate("not a candidate").is_err());
    assert!(unmarshal_candidate("a 1 udp 1 not-an-ip 1 typ host").is_err());
}

#[test]
fn test_foundation_groups_same_type() {
    let a = Candidate::new_host("192.168.1.10".parse().unwrap(), 1000, 0);
    let b = Candidate::new_host("192.168.1.10".parse().unwrap(), 2000, 0);
    let c = Candidate::new_host("192.168.1.11".parse().unwrap(), 1000, 0);
    assert_eq!(a.foundation(), b.foundation());
    assert_ne!(a.foundation(), c.foundation());
}
