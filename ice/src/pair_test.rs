use super::*;

#[test]
fn test_pair_priority_formula() {
    // G=4, D=2: 2^32*2 + 2*4 + 1
    assert_eq!(pair_priority(4, 2), (1u64 << 32) * 2 + 8 + 1);
    // G=2, D=4: 2^32*2 + 2*4 + 0
    assert_eq!(pair_priority(2, 4), (1u64 << 32) * 2 + 8);
    // equal priorities tie without the G>D bonus
    assert_eq!(pair_priority(3, 3), (1u64 << 32) * 3 + 6);
}

#[test]
fn test_priority_orders_host_above_relay() {
    use crate::candidate::{Candidate, CandidateType};
    let host = Candidate::new_host("10.0.0.1".parse().unwrap(), 1, 0);
    let relay = Candidate {
        candidate_type: CandidateType::Relay,
        ..host.clone()
    };
    assert!(
        pair_priority(host.priority(), host.priority())
            > pair_priority(relay.priority(), host.priority())
    );
}
