use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

pub const RECEPTION_REPORT_LENGTH: usize = 24;
pub const FRACTION_LOST_SHIFT: u32 = 24;

/// A ReceptionReport block conveys statistics on the reception of RTP
/// packets from a single synchronization source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReceptionReport {
    /// The SSRC identifier of the source to which the information in this
    /// reception report block pertains.
    pub ssrc: u32,
    /// The fraction of RTP data packets lost since the previous SR or RR.
    pub fraction_lost: u8,
    /// The total number of RTP data packets lost since the beginning of
    /// reception (signed 24-bit).
    pub total_lost: u32,
    /// Extended highest sequence number received: low 16 bits the
    /// sequence number, high 16 bits the count of cycles.
    pub last_sequence_number: u32,
    /// An estimate of the statistical variance of interarrival time.
    pub jitter: u32,
    /// The middle 32 bits of the NTP timestamp in the most recent SR.
    pub last_sender_report: u32,
    /// Delay since the last SR, in units of 1/65536 seconds.
    pub delay: u32,
}

impl MarshalSize for ReceptionReport {
    fn marshal_size(&self) -> usize {
        RECEPTION_REPORT_LENGTH
    }
}

impl Marshal for ReceptionReport {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < RECEPTION_REPORT_LENGTH {
            return Err(util::Error::ErrBufferTooShort);
        }
        buf[0..4].copy_from_slice(&self.ssrc.to_be_bytes());
        let lost = (self.fraction_lost as u32) << FRACTION_LOST_SHIFT | (self.total_lost & 0x00ff_ffff);
        buf[4..8].copy_from_slice(&lost.to_be_bytes());
        buf[8..12].copy_from_slice(&self.last_sequence_number.to_be_bytes());
        buf[12..16].copy_from_slice(&self.jitter.to_be_bytes());
        buf[16..20].copy_from_slice(&self.last_sender_report.to_be_bytes());
        buf[20..24].copy_from_slice(&self.delay.to_be_bytes());
        Ok(RECEPTION_REPORT_LENGTH)
    }
}

impl Unmarshal for ReceptionReport {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        if buf.remaining() < RECEPTION_REPORT_LENGTH {
            return Err(util::Error::ErrBufferTooShort);
        }
        let ssrc = buf.get_u32();
        let lost = buf.get_u32();
        let fraction_lost = (lost >> FRACTION_LOST_SHIFT) as u8;
        let total_lost = lost & 0x00ff_ffff;
        let last_sequence_number = buf.get_u32();
        let jitter = buf.get_u32();
        let last_sender_report = buf.get_u32();
        let delay = buf.get_u32();
        Ok(ReceptionReport {
            ssrc,
            fraction_lost,
            total_lost,
            last_sequence_number,
            jitter,
            last_sender_report,
            delay,
        })
    }
}
