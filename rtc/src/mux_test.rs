use super::*;

#[test]
fn test_stun_range() {
    assert_eq!(classify(&[0x00, 0x01]), Demux::Stun);
    assert_eq!(classify(&[0x03]), Demux::Stun);
}

#[test]
fn test_dtls_range() {
    for b in [20u8, 22, 23, 63] {
        assert_eq!(classify(&[b, 0xfe]), Demux::Dtls, "byte {b}");
    }
}

#[test]
fn test_srtp_vs_srtcp() {
    // RTP with payload type 96 (second byte 0x60 or 0xE0 with marker)
    assert_eq!(classify(&[0x80, 0x60]), Demux::Srtp);
    assert_eq!(classify(&[0x80, 0xE0]), Demux::Srtp);
    // RTCP sender report (PT 200)
    assert_eq!(classify(&[0x80, 200]), Demux::Srtcp);
    // RTCP payload-specific feedback (PT 206)
    assert_eq!(classify(&[0x81, 206]), Demux::Srtcp);
}

#[test]
fn test_everything_else_dropped() {
    assert_eq!(classify(&[]), Demux::Unknown);
    assert_eq!(classify(&[10]), Demux::Unknown);
    assert_eq!(classify(&[64]), Demux::Unknown);
    assert_eq!(classify(&[127]), Demux::Unknown);
    assert_eq!(classify(&[192]), Demux::Unknown);
    assert_eq!(classify(&[255]), Demux::Unknown);
}
