use util::marshal::{Marshal, Unmarshal};

use super::*;

#[test]
fn test_remb_roundtrip() {
    let remb = ReceiverEstimatedMaximumBitrate {
        sender_ssrc: 1,
        bitrate: 8_927_168,
        ssrcs: vec![0x0203_0405],
    };
    let raw = remb.marshal().unwrap();
    let mut buf = &raw[..];
    let parsed = ReceiverEstimatedMaximumBitrate::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed.sender_ssrc, 1);
    assert_eq!(parsed.ssrcs, vec![0x0203_0405]);
    // mantissa truncation loses at most the low bits under the exponent
    assert!(parsed.bitrate <= remb.bitrate);
    assert!(remb.bitrate - parsed.bitrate < (1 << 6));
}

#[test]
fn test_remb_known_encoding() {
    // mantissa 0x030405 (197637), exponent 0: exactly representable
    let remb = ReceiverEstimatedMaximumBitrate {
        sender_ssrc: 0,
        bitrate: 197_637,
        ssrcs: vec![],
    };
    let raw = remb.marshal().unwrap();
    // exp=0, mantissa=0x030405
    assert_eq!(&raw[16..20], &[0x00, 0x03, 0x04, 0x05]);
    let mut buf = &raw[..];
    let parsed = ReceiverEstimatedMaximumBitrate::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed.bitrate, 197_637);
}

#[test]
fn test_remb_media_ssrc_zero_enforced() {
    let remb = ReceiverEstimatedMaximumBitrate {
        sender_ssrc: 1,
        bitrate: 1000,
        ssrcs: vec![2],
    };
    let mut raw = remb.marshal().unwrap().to_vec();
    raw[8..12].copy_from_slice(&1u32.to_be_bytes());
    let mut buf = &raw[..];
    assert!(ReceiverEstimatedMaximumBitrate::unmarshal(&mut buf).is_err());
}
