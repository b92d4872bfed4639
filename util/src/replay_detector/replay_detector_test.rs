use super::*;

#[test]
fn test_in_order_sequence() {
    let mut d = SlidingWindowDetector::new(64);
    for seq in 0..1000u64 {
        assert!(d.check(seq), "seq {seq} rejected");
        d.accept();
    }
    assert_eq!(d.latest(), 999);
}

#[test]
fn test_duplicate_rejected() {
    let mut d = SlidingWindowDetector::new(64);
    assert!(d.check(10));
    d.accept();
    assert!(!d.check(10));
}

#[test]
fn test_duplicate_without_accept_allowed() {
    // a probe that was never accepted must not occupy a slot
    let mut d = SlidingWindowDetector::new(64);
    assert!(d.check(10));
    assert!(d.check(10));
}

#[test]
fn test_out_of_order_within_window() {
    let mut d = SlidingWindowDetector::new(64);
    for seq in [5u64, 100, 80, 99, 37] {
        assert!(d.check(seq), "seq {seq} rejected");
        d.accept();
    }
    // 80 was accepted above, so it is now a duplicate
    assert!(!d.check(80));
    // behind the trailing edge of a 64-wide window anchored at 100
    assert!(!d.check(36));
}

#[test]
fn test_large_jump_clears_window() {
    let mut d = SlidingWindowDetector::new(64);
    assert!(d.check(1));
    d.accept();
    assert!(d.check(100_000));
    d.accept();
    assert!(!d.check(1));
    assert!(d.check(99_999));
    d.accept();
    assert!(!d.check(99_999));
}
