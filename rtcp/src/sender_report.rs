use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType, HEADER_LENGTH, SSRC_LENGTH};
use crate::reception_report::{ReceptionReport, RECEPTION_REPORT_LENGTH};

pub const SR_HEADER_LENGTH: usize = 24;

/// A SenderReport (SR) packet provides reception quality feedback plus
/// sender information (RFC 3550 section 6.4.1).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SenderReport {
    /// The synchronization source identifier for the originator of this SR.
    pub ssrc: u32,
    /// Wallclock time when this report was sent, 64-bit NTP format.
    pub ntp_time: u64,
    /// The same time as `ntp_time`, in the units of the RTP media clock.
    pub rtp_time: u32,
    /// Total number of RTP data packets transmitted since starting.
    pub packet_count: u32,
    /// Total number of payload octets transmitted since starting.
    pub octet_count: u32,
    pub reports: Vec<ReceptionReport>,
}

impl SenderReport {
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: self.reports.len() as u8,
            packet_type: PacketType::SenderReport,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }
}

impl MarshalSize for SenderReport {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH + SR_HEADER_LENGTH - 4
            + self.reports.len() * RECEPTION_REPORT_LENGTH
    }
}

impl Marshal for SenderReport {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        let size = self.marshal_size();
        if buf.len() < size {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut n = self.header().marshal_to(buf)?;
        buf[n..n + 4].copy_from_slice(&self.ssrc.to_be_bytes());
        n += 4;
        buf[n..n + 8].copy_from_slice(&self.ntp_time.to_be_bytes());
        n += 8;
        buf[n..n + 4].copy_from_slice(&self.rtp_time.to_be_bytes());
        n += 4;
        buf[n..n + 4].copy_from_slice(&self.packet_count.to_be_bytes());
        n += 4;
        buf[n..n + 4].copy_from_slice(&self.octet_count.to_be_bytes());
        n += 4;
        for report in &self.reports {
            n += report.marshal_to(&mut buf[n..])?;
        }
        Ok(n)
    }
}

impl Unmarshal for SenderReport {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let header = Header::unmarshal(buf)?;
        if header.packet_type != PacketType::SenderReport {
            return Err(util::Error::Other("not a sender report".to_owned()));
        }
        if buf.remaining() < SR_HEADER_LENGTH {
            return Err(util::Error::ErrBufferTooShort);
        }
        let ssrc = buf.get_u32();
        let ntp_time = buf.get_u64();
        let rtp_time = buf.get_u32();
        let packet_count = buf.get_u32();
        let octet_count = buf.get_u32();
        let mut reports = Vec::with_capacity(header.count as usize);
        for _ in 0..header.count {
            reports.push(ReceptionReport::unmarshal(buf)?);
        }
        Ok(SenderReport {
            ssrc,
            ntp_time,
            rtp_time,
            packet_count,
            octet_count,
            reports,
        })
    }
}
