use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType, HEADER_LENGTH, SSRC_LENGTH};
use crate::reception_report::{ReceptionReport, RECEPTION_REPORT_LENGTH};

/// A ReceiverReport (RR) packet provides reception quality feedback for an
/// RTP stream (RFC 3550 section 6.4.2).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiverReport {
    /// The synchronization source identifier for the originator of this RR.
    pub ssrc: u32,
    pub reports: Vec<ReceptionReport>,
}

impl ReceiverReport {
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: self.reports.len() as u8,
            packet_type: PacketType::ReceiverReport,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }
}

impl MarshalSize for ReceiverReport {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH + self.reports.len() * RECEPTION_REPORT_LENGTH
    }
}

impl Marshal for ReceiverReport {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.marshal_size() {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut n = self.header().marshal_to(buf)?;
        buf[n..n + 4].copy_from_slice(&self.ssrc.to_be_bytes());
        n += 4;
        for report in &self.reports {
            n += report.marshal_to(&mut buf[n..])?;
        }
        Ok(n)
    }
}

impl Unmarshal for ReceiverReport {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if header.packet_type != PacketType::ReceiverReport {
            return Err(util::Error::Other("not a receiver report".to_owned()));
        }
        if buf.remaining() < SSRC_LENGTH {
            return Err(util::Error::ErrBufferTooShort);
        }
        let ssrc = buf.get_u32();
        let mut reports = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            reports.push(ReceptionReport::unmarshal(buf)?);
        }
        Ok(ReceiverReport { ssrc, reports })
    }
}
