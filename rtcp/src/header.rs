use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

pub const RTP_VERSION: u8 = 2;
pub const VERSION_SHIFT: u8 = 6;
pub const VERSION_MASK: u8 = 0x3;
pub const PADDING_SHIFT: u8 = 5;
pub const COUNT_MASK: u8 = 0x1f;

pub const HEADER_LENGTH: usize = 4;
pub const SSRC_LENGTH: usize = 4;

/// FMT values for PT=205 transport layer feedback (RFC 4585 section 6.2).
pub const FORMAT_TLN: u8 = 1;
/// FMT for transport-wide congestion control feedback.
pub const FORMAT_TCC: u8 = 15;

/// FMT values for PT=206 payload-specific feedback (RFC 4585, RFC 5104).
pub const FORMAT_PLI: u8 = 1;
pub const FORMAT_FIR: u8 = 4;
pub const FORMAT_REMB: u8 = 15;

/// PacketType specifies the type of an RTCP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketType {
    #[default]
    Unsupported = 0,
    SenderReport = 200,
    ReceiverReport = 201,
    SourceDescription = 202,
    Goodbye = 203,
    ApplicationDefined = 204,
    TransportSpecificFeedback = 205,
    PayloadSpecificFeedback = 206,
    ExtendedReport = 207,
}

impl From<u8> for PacketType {
    fn from(b: u8) -> Self {
        match b {
            200 => PacketType::SenderReport,
            201 => PacketType::ReceiverReport,
            202 => PacketType::SourceDescription,
            203 => PacketType::Goodbye,
            204 => PacketType::ApplicationDefined,
            205 => PacketType::TransportSpecificFeedback,
            206 => PacketType::PayloadSpecificFeedback,
            207 => PacketType::ExtendedReport,
            _ => PacketType::Unsupported,
        }
    }
}

/// Header is the common RTCP packet header.
///
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|   RC    |   PT          |             length            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///
/// `count` doubles as the feedback message type (FMT) for PT 205/206.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub padding: bool,
    pub count: u8,
    pub packet_type: PacketType,
    /// Packet length in 32-bit words, minus one.
    pub length: u16,
}

impl MarshalSize for Header {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH
    }
}

impl Marshal for Header {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < HEADER_LENGTH {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut b0 = RTP_VERSION << VERSION_SHIFT;
        if self.padding {
            b0 |= 1 << PADDING_SHIFT;
        }
        b0 |= self.count & COUNT_MASK;
        buf[0] = b0;
        buf[1] = self.packet_type as u8;
        buf[2..4].copy_from_slice(&self.length.to_be_bytes());
        Ok(HEADER_LENGTH)
    }
}

impl Unmarshal for Header {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        if buf.remaining() < HEADER_LENGTH {
            return Err(util::Error::ErrBufferTooShort);
        }
        let b0 = buf.get_u8();
        let version = b0 >> VERSION_SHIFT & VERSION_MASK;
        if version != RTP_VERSION {
            return Err(util::Error::Other("RTCP requires version 2".to_owned()));
        }
        let padding = (b0 >> PADDING_SHIFT & 0x1) > 0;
        let count = b0 & COUNT_MASK;
        let packet_type = PacketType::from(buf.get_u8());
        let length = buf.get_u16();
        Ok(Header {
            padding,
            count,
            packet_type,
            length,
        })
    }
}
