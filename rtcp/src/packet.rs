#[cfg(test)]
#[path = "packet_test.rs"]
mod packet_test;

use bytes::{Buf, Bytes, BytesMut};
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::error::{Error, Result};
use crate::goodbye::Goodbye;
use crate::header::*;
use crate::payload_feedbacks::full_intra_request::FullIntraRequest;
use crate::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use crate::payload_feedbacks::receiver_estimated_maximum_bitrate::ReceiverEstimatedMaximumBitrate;
use crate::raw_packet::RawPacket;
use crate::receiver_report::ReceiverReport;
use crate::sender_report::SenderReport;
use crate::source_description::SourceDescription;
use crate::transport_feedbacks::transport_layer_cc::TransportLayerCc;
use crate::transport_feedbacks::transport_layer_nack::TransportLayerNack;

/// Every RTCP packet this stack understands, as a tagged sum over
/// (packet type, feedback message type). Anything else is carried as
/// `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    SenderReport(SenderReport),
    ReceiverReport(ReceiverReport),
    SourceDescription(SourceDescription),
    Goodbye(Goodbye),
    TransportLayerNack(TransportLayerNack),
    TransportLayerCc(TransportLayerCc),
    PictureLossIndication(PictureLossIndication),
    FullIntraRequest(FullIntraRequest),
    ReceiverEstimatedMaximumBitrate(ReceiverEstimatedMaximumBitrate),
    Raw(RawPacket),
}

impl Packet {
    pub fn header(&self) -> Header {
        match self {
            Packet::SenderReport(p) => p.header(),
            Packet::ReceiverReport(p) => p.header(),
            Packet::SourceDescription(p) => p.header(),
            Packet::Goodbye(p) => p.header(),
            Packet::TransportLayerNack(p) => p.header(),
            Packet::TransportLayerCc(p) => p.header(),
            Packet::PictureLossIndication(p) => p.header(),
            Packet::FullIntraRequest(p) => p.header(),
            Packet::ReceiverEstimatedMaximumBitrate(p) => p.header(),
            Packet::Raw(p) => p.header(),
        }
    }
}

impl MarshalSize for Packet {
    fn marshal_size(&self) -> usize {
        match self {
            Packet::SenderReport(p) => p.marshal_size(),
            Packet::ReceiverReport(p) => p.marshal_size(),
            Packet::SourceDescription(p) => p.marshal_size(),
            Packet::Goodbye(p) => p.marshal_size(),
            Packet::TransportLayerNack(p) => p.marshal_size(),
            Packet::TransportLayerCc(p) => p.marshal_size(),
            Packet::PictureLossIndication(p) => p.marshal_size(),
            Packet::FullIntraRequest(p) => p.marshal_size(),
            Packet::ReceiverEstimatedMaximumBitrate(p) => p.marshal_size(),
            Packet::Raw(p) => p.marshal_size(),
        }
    }
}

impl Marshal for Packet {
    fn marshal_to(&self, buf: &mut [u8]) -> std::result::Result<usize, util::Error> {
        match self {
            Packet::SenderReport(p) => p.marshal_to(buf),
            Packet::ReceiverReport(p) => p.marshal_to(buf),
            Packet::SourceDescription(p) => p.marshal_to(buf),
            Packet::Goodbye(p) => p.marshal_to(buf),
            Packet::TransportLayerNack(p) => p.marshal_to(buf),
            Packet::TransportLayerCc(p) => p.marshal_to(buf),
            Packet::PictureLossIndication(p) => p.marshal_to(buf),
            Packet::FullIntraRequest(p) => p.marshal_to(buf),
            Packet::ReceiverEstimatedMaximumBitrate(p) => p.marshal_to(buf),
            Packet::Raw(p) => p.marshal_to(buf),
        }
    }
}

impl Unmarshal for Packet {
    fn unmarshal<B>(buf: &mut B) -> std::result::Result<Self, util::Error>
    where
        B: Buf,
    {
        // peek the header without consuming, then hand the exact packet
        // slice to the per-type codec
        let mut peek = buf.chunk();
        let header = Header::unmarshal(&mut peek)?;
        let len = (header.length as usize + 1) * 4;
        if buf.remaining() < len {
            return Err(util::Error::ErrBufferTooShort);
        }
        let raw = buf.copy_to_bytes(len);
        let mut slice = &raw[..];

        let packet = match header.packet_type {
            PacketType::SenderReport => Packet::SenderReport(SenderReport::unmarshal(&mut slice)?),
            PacketType::ReceiverReport => {
                Packet::ReceiverReport(ReceiverReport::unmarshal(&mut slice)?)
            }
            PacketType::SourceDescription => {
                Packet::SourceDescription(SourceDescription::unmarshal(&mut slice)?)
            }
            PacketType::Goodbye => Packet::Goodbye(Goodbye::unmarshal(&mut slice)?),
            PacketType::TransportSpecificFeedback => match header.count {
                FORMAT_TLN => {
                    Packet::TransportLayerNack(TransportLayerNack::unmarshal(&mut slice)?)
                }
                FORMAT_TCC => Packet::TransportLayerCc(TransportLayerCc::unmarshal(&mut slice)?),
                _ => Packet::Raw(RawPacket(raw.clone())),
            },
            PacketType::PayloadSpecificFeedback => match header.count {
                FORMAT_PLI => {
                    Packet::PictureLossIndication(PictureLossIndication::unmarshal(&mut slice)?)
                }
                FORMAT_FIR => Packet::FullIntraRequest(FullIntraRequest::unmarshal(&mut slice)?),
                FORMAT_REMB => Packet::ReceiverEstimatedMaximumBitrate(
                    ReceiverEstimatedMaximumBitrate::unmarshal(&mut slice)?,
                ),
                _ => Packet::Raw(RawPacket(raw.clone())),
            },
            _ => Packet::Raw(RawPacket(raw.clone())),
        };
        Ok(packet)
    }
}

/// Serializes a sequence of packets into one compound buffer.
pub fn marshal(packets: &[Packet]) -> Result<Bytes> {
    let mut out = BytesMut::new();
    for p in packets {
        out.extend_from_slice(&p.marshal().map_err(Error::Util)?);
    }
    Ok(out.freeze())
}

/// Parses an entire datagram which may contain multiple RTCP packets.
pub fn unmarshal<B>(raw_data: &mut B) -> Result<Vec<Packet>>
where
    B: Buf,
{
    let mut packets = vec![];
    while raw_data.has_remaining() {
        packets.push(Packet::unmarshal(raw_data).map_err(Error::Util)?);
    }
    if packets.is_empty() {
        return Err(Error::InvalidHeader);
    }
    Ok(packets)
}
