use bytes::Bytes;
use util::marshal::Marshal;

use super::*;
use crate::protection_profile::ProtectionProfile;

fn build_rtp(seq: u16, ssrc: u32, payload: &[u8]) -> Vec<u8> {
    let pkt = rtp::packet::Packet {
        header: rtp::header::Header {
            version: 2,
            payload_type: 96,
            sequence_number: seq,
            timestamp: 3653407706,
            ssrc,
            ..Default::default()
        },
        payload: Bytes::copy_from_slice(payload),
    };
    pkt.marshal().unwrap().to_vec()
}

fn new_pair(profile: ProtectionProfile) -> (Context, Context) {
    let key = vec![7u8; profile.key_len()];
    let salt = vec![11u8; profile.salt_len()];
    (
        Context::new(&key, &salt, profile).unwrap(),
        Context::new(&key, &salt, profile).unwrap(),
    )
}

#[test]
fn test_rtp_roundtrip_gcm() {
    let (mut tx, mut rx) = new_pair(ProtectionProfile::AeadAes128Gcm);
    let plaintext = build_rtp(1000, 0xcafe, b"hello srtp");
    let protected = tx.encrypt_rtp(&plaintext).unwrap();
    assert_ne!(&protected[..], &plaintext[..]);
    let decrypted = rx.decrypt_rtp(&protected).unwrap();
    assert_eq!(&decrypted[..], &plaintext[..]);
}

#[test]
fn test_rtp_roundtrip_aes_cm() {
    let (mut tx, mut rx) = new_pair(ProtectionProfile::Aes128CmHmacSha1_80);
    let plaintext = build_rtp(1, 0x1234, b"payload bytes");
    let protected = tx.encrypt_rtp(&plaintext).unwrap();
    assert_eq!(protected.len(), plaintext.len() + 10);
    let decrypted = rx.decrypt_rtp(&protected).unwrap();
    assert_eq!(&decrypted[..], &plaintext[..]);
}

#[test]
fn test_rtp_roundtrip_aes256_gcm() {
    let (mut tx, mut rx) = new_pair(ProtectionProfile::AeadAes256Gcm);
    let plaintext = build_rtp(77, 0xabcd, b"big key");
    let protected = tx.encrypt_rtp(&plaintext).unwrap();
    let decrypted = rx.decrypt_rtp(&protected).unwrap();
    assert_eq!(&decrypted[..], &plaintext[..]);
}

#[test]
fn test_replay_rejected() {
    let (mut tx, mut rx) = new_pair(ProtectionProfile::AeadAes128Gcm);
    let protected = tx.encrypt_rtp(&build_rtp(5, 1, b"x")).unwrap();
    rx.decrypt_rtp(&protected).unwrap();
    assert_eq!(
        rx.decrypt_rtp(&protected),
        Err(Error::SrtpSsrcDuplicated(1, 5))
    );
}

#[test]
fn test_tampered_packet_rejected() {
    let (mut tx, mut rx) = new_pair(ProtectionProfile::AeadAes128Gcm);
    let mut protected = tx.encrypt_rtp(&build_rtp(5, 1, b"x")).unwrap().to_vec();
    let last = protected.len() - 1;
    protected[last] ^= 0xff;
    assert!(rx.decrypt_rtp(&protected).is_err());
}

#[test]
fn test_roc_increments_across_seq_wrap() {
    let (mut tx, mut rx) = new_pair(ProtectionProfile::AeadAes128Gcm);

    for seq in [0xFFFEu16, 0xFFFF, 0x0000, 0x0001] {
        let plaintext = build_rtp(seq, 9, b"wrap");
        let protected = tx.encrypt_rtp(&plaintext).unwrap();
        let decrypted = rx.decrypt_rtp(&protected).unwrap();
        assert_eq!(&decrypted[..], &plaintext[..], "seq {seq}");
    }
    assert_eq!(tx.roc(9), Some(1));
    assert_eq!(rx.roc(9), Some(1));
}

#[test]
fn test_rx_tolerates_reordering_across_wrap() {
    let (mut tx, mut rx) = new_pair(ProtectionProfile::AeadAes128Gcm);
    let p1 = tx.encrypt_rtp(&build_rtp(0xFFFF, 3, b"a")).unwrap();
    let p2 = tx.encrypt_rtp(&build_rtp(0x0000, 3, b"b")).unwrap();
    // deliver the post-wrap packet first
    rx.decrypt_rtp(&p2).unwrap();
    rx.decrypt_rtp(&p1).unwrap();
}

#[test]
fn test_rtcp_roundtrip() {
    for profile in [
        ProtectionProfile::AeadAes128Gcm,
        ProtectionProfile::Aes128CmHmacSha1_80,
    ] {
        let (mut tx, mut rx) = new_pair(profile);
        let rr = rtcp::packet::Packet::ReceiverReport(rtcp::receiver_report::ReceiverReport {
            ssrc: 0x902f_9e2e,
            reports: vec![],
        });
        let plaintext = rtcp::packet::marshal(&[rr]).unwrap();
        let protected = tx.encrypt_rtcp(&plaintext).unwrap();
        let decrypted = rx.decrypt_rtcp(&protected).unwrap();
        assert_eq!(&decrypted[..], &plaintext[..], "{profile:?}");
    }
}

#[test]
fn test_rtcp_index_increments_and_replays() {
    let (mut tx, mut rx) = new_pair(ProtectionProfile::AeadAes128Gcm);
    let rr = rtcp::packet::Packet::ReceiverReport(rtcp::receiver_report::ReceiverReport {
        ssrc: 42,
        reports: vec![],
    });
    let plaintext = rtcp::packet::marshal(&[rr]).unwrap();

    let p0 = tx.encrypt_rtcp(&plaintext).unwrap();
    let p1 = tx.encrypt_rtcp(&plaintext).unwrap();
    assert_eq!(tx.cipher.get_rtcp_index(&p0), 0);
    assert_eq!(tx.cipher.get_rtcp_index(&p1), 1);

    rx.decrypt_rtcp(&p0).unwrap();
    rx.decrypt_rtcp(&p1).unwrap();
    assert_eq!(rx.decrypt_rtcp(&p1), Err(Error::SrtcpSsrcDuplicated(42, 1)));
}
