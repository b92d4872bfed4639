use bytes::Bytes;
use util::marshal::Marshal;

use super::*;
use crate::goodbye::Goodbye;
use crate::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use crate::receiver_report::ReceiverReport;
use crate::reception_report::ReceptionReport;
use crate::sender_report::SenderReport;
use crate::transport_feedbacks::transport_layer_nack::TransportLayerNack;

#[test]
fn test_dispatch_by_type_and_fmt() {
    let packets = vec![
        Packet::ReceiverReport(ReceiverReport {
            ssrc: 1,
            reports: vec![ReceptionReport {
                ssrc: 2,
                fraction_lost: 10,
                total_lost: 5,
                last_sequence_number: 0x0001_0203,
                jitter: 7,
                last_sender_report: 11,
                delay: 13,
            }],
        }),
        Packet::PictureLossIndication(PictureLossIndication {
            sender_ssrc: 1,
            media_ssrc: 2,
        }),
        Packet::TransportLayerNack(TransportLayerNack {
            sender_ssrc: 1,
            media_ssrc: 2,
            nacks: vec![crate::transport_feedbacks::transport_layer_nack::NackPair {
                packet_id: 100,
                lost_packets: 0b1,
            }],
        }),
        Packet::Goodbye(Goodbye {
            sources: vec![1],
            reason: "done".to_owned(),
        }),
    ];

    let raw = marshal(&packets).unwrap();
    let mut buf = &raw[..];
    let parsed = unmarshal(&mut buf).unwrap();
    assert_eq!(parsed, packets);
}

#[test]
fn test_unknown_fmt_falls_back_to_raw() {
    // PSFB with FMT=9 (unassigned here): must survive as Raw
    let mut raw = vec![0x80 | 9, 206, 0x00, 0x02];
    raw.extend_from_slice(&1u32.to_be_bytes());
    raw.extend_from_slice(&2u32.to_be_bytes());
    let mut buf = &raw[..];
    let parsed = unmarshal(&mut buf).unwrap();
    match &parsed[0] {
        Packet::Raw(r) => assert_eq!(r.0, Bytes::from(raw.clone())),
        other => panic!("expected raw fallback, got {other:?}"),
    }
}

#[test]
fn test_sender_report_roundtrip() {
    let sr = SenderReport {
        ssrc: 0x0102_0304,
        ntp_time: 0xAABB_CCDD_EEFF_0011,
        rtp_time: 160,
        packet_count: 44,
        octet_count: 4400,
        reports: vec![],
    };
    let raw = Packet::SenderReport(sr.clone()).marshal().unwrap();
    assert_eq!(raw.len(), 28);
    let mut buf = &raw[..];
    let parsed = unmarshal(&mut buf).unwrap();
    assert_eq!(parsed, vec![Packet::SenderReport(sr)]);
}
