#[cfg(test)]
#[path = "mux_test.rs"]
mod mux_test;

/// Where an inbound datagram belongs (RFC 5764 section 5.1.2):
///
/// ```text
///             +----------------+
///             | 127 < B < 192 -+--> forward to RTP/RTCP
///             |                |
/// packet -->  |  19 < B < 64  -+--> forward to DTLS
///             |                |
///             |       B < 4   -+--> forward to STUN
///             +----------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demux {
    Stun,
    Dtls,
    Srtp,
    Srtcp,
    Unknown,
}

/// Classifies a datagram by its first byte; SRTCP is split from SRTP by
/// the RTCP packet-type range in the second byte.
pub fn classify(buf: &[u8]) -> Demux {
    let first = match buf.first() {
        Some(b) => *b,
        None => return Demux::Unknown,
    };
    match first {
        0..=3 => Demux::Stun,
        20..=63 => Demux::Dtls,
        128..=191 => {
            if buf.len() > 1 && (192..=223).contains(&buf[1]) {
                Demux::Srtcp
            } else {
                Demux::Srtp
            }
        }
        _ => Demux::Unknown,
    }
}
