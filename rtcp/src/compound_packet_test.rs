use super::*;
use crate::receiver_report::ReceiverReport;
use crate::source_description::SourceDescription;

#[test]
fn test_compound_must_start_with_report() {
    let bad = CompoundPacket(vec![Packet::SourceDescription(SourceDescription::cname(
        1, "a",
    ))]);
    assert_eq!(bad.validate(), Err(Error::BadFirstPacket));

    let good = CompoundPacket(vec![
        Packet::ReceiverReport(ReceiverReport {
            ssrc: 1,
            reports: vec![],
        }),
        Packet::SourceDescription(SourceDescription::cname(1, "cname@host")),
    ]);
    good.validate().unwrap();
}

#[test]
fn test_compound_roundtrip() {
    let compound = CompoundPacket(vec![
        Packet::ReceiverReport(ReceiverReport {
            ssrc: 0x11,
            reports: vec![],
        }),
        Packet::SourceDescription(SourceDescription::cname(0x11, "tern")),
    ]);
    let raw = compound.marshal().unwrap();
    let mut buf = &raw[..];
    let parsed = CompoundPacket::unmarshal(&mut buf).unwrap();
    assert_eq!(parsed, compound);
}

#[test]
fn test_empty_compound_rejected() {
    assert_eq!(CompoundPacket(vec![]).validate(), Err(Error::EmptyCompound));
}
