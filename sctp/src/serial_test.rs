use super::*;

#[test]
fn test_sna32_basic() {
    assert!(sna32lt(1, 2));
    assert!(!sna32lt(2, 1));
    assert!(!sna32lt(5, 5));
    assert!(sna32lte(5, 5));
}

#[test]
fn test_sna32_wraparound() {
    assert!(sna32lt(0xFFFF_FFFF, 0));
    assert!(sna32lt(0xFFFF_FFF0, 0x10));
    assert!(sna32gt(0, 0xFFFF_FFFF));
    assert!(sna32gte(0x10, 0xFFFF_FFF0));
}

#[test]
fn test_sna16_wraparound() {
    assert!(sna16lt(0xFFFF, 0));
    assert!(sna16gt(0, 0xFFFF));
    assert!(sna16lt(0x8000, 0x8001));
}
