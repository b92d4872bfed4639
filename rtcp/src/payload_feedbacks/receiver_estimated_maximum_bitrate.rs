#[cfg(test)]
#[path = "receiver_estimated_maximum_bitrate_test.rs"]
mod receiver_estimated_maximum_bitrate_test;

use bytes::Buf;
use util::marshal::{Marshal, MarshalSize, Unmarshal};

use crate::header::{Header, PacketType, FORMAT_REMB, HEADER_LENGTH, SSRC_LENGTH};

const UNIQUE_IDENTIFIER: [u8; 4] = *b"REMB";

/// ReceiverEstimatedMaximumBitrate (REMB, PT=206 FMT=15) carries the
/// receiver's total estimated available bitrate
/// (draft-alvestrand-rmcat-remb-03). The bitrate is encoded as a 6-bit
/// exponent and an 18-bit mantissa: bitrate = mantissa << exp.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiverEstimatedMaximumBitrate {
    pub sender_ssrc: u32,
    /// Estimated bitrate in bits per second.
    pub bitrate: u64,
    /// Media SSRCs the estimate applies to.
    pub ssrcs: Vec<u32>,
}

impl ReceiverEstimatedMaximumBitrate {
    pub fn header(&self) -> Header {
        Header {
            padding: false,
            count: FORMAT_REMB,
            packet_type: PacketType::PayloadSpecificFeedback,
            length: ((self.marshal_size() / 4) - 1) as u16,
        }
    }

    /// Largest-mantissa-first encoding: find the smallest exponent that
    /// makes the mantissa fit 18 bits.
    fn exp_mantissa(&self) -> (u8, u32) {
        let mut exp = 0u8;
        let mut mantissa = self.bitrate;
        while mantissa >= (1 << 18) {
            mantissa >>= 1;
            exp += 1;
        }
        (exp, mantissa as u32)
    }
}

impl MarshalSize for ReceiverEstimatedMaximumBitrate {
    fn marshal_size(&self) -> usize {
        HEADER_LENGTH + SSRC_LENGTH * 2 + 8 + self.ssrcs.len() * 4
    }
}

impl Marshal for ReceiverEstimatedMaximumBitrate {
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize, util::Error> {
        if buf.len() < self.marshal_size() {
            return Err(util::Error::ErrBufferTooShort);
        }
        let mut n = self.header().marshal_to(buf)?;
        buf[n..n + 4].copy_from_slice(&self.sender_ssrc.to_be_bytes());
        n += 4;
        // media SSRC is always 0 for REMB
        buf[n..n + 4].copy_from_slice(&0u32.to_be_bytes());
        n += 4;
        buf[n..n + 4].copy_from_slice(&UNIQUE_IDENTIFIER);
        n += 4;
        buf[n] = self.ssrcs.len() as u8;
        let (exp, mantissa) = self.exp_mantissa();
        buf[n + 1] = (exp << 2) | ((mantissa >> 16) as u8 & 0x3);
        buf[n + 2] = (mantissa >> 8) as u8;
        buf[n + 3] = mantissa as u8;
        n += 4;
        for ssrc in &self.ssrcs {
            buf[n..n + 4].copy_from_slice(&ssrc.to_be_bytes());
            n += 4;
        }
        Ok(n)
    }
}

impl Unmarshal for ReceiverEstimatedMaximumBitrate {
    fn unmarshal<B>(buf: &mut B) -> Result<Self, util::Error>
    where
        B: Buf,
    {
        let _header = Header::unmarshal(buf)?;
        if buf.remaining() < 16 {
            return Err(util::Error::ErrBufferTooShort);
        }
        let sender_ssrc = buf.get_u32();
        let media_ssrc = buf.get_u32();
        if media_ssrc != 0 {
            return Err(util::Error::Other("REMB media SSRC must be 0".to_owned()));
        }
        let mut ident = [0u8; 4];
        buf.copy_to_slice(&mut ident);
        if ident != UNIQUE_IDENTIFIER {
            return Err(util::Error::Other("unique REMB identifier missing".to_owned()));
        }
        let num_ssrc = buf.get_u8() as usize;
        let b = buf.get_u8();
        let exp = b >> 2;
        let mantissa =
            ((b as u32 & 0x3) << 16) | ((buf.get_u8() as u32) << 8) | buf.get_u8() as u32;
        let bitrate = (mantissa as u64) << exp;
        if buf.remaining() < num_ssrc * 4 {
            return Err(util::Error::Other("REMB SSRC count does not match entries".to_owned()));
        }
        let mut ssrcs = Vec::with_capacity(num_ssrc);
        for _ in 0..num_ssrc {
            ssrcs.push(buf.get_u32());
        }
        Ok(ReceiverEstimatedMaximumBitrate {
            sender_ssrc,
            bitrate,
            ssrcs,
        })
    }
}
