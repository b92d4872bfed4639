#[cfg(test)]
mod chunk_test;

pub mod chunk_abort;
pub mod chunk_cookie_ack;
pub mod chunk_cookie_echo;
pub mod chunk_forward_tsn;
pub mod chunk_header;
pub mod chunk_heartbeat;
pub mod chunk_init;
pub mod chunk_payload_data;
pub mod chunk_reconfig;
pub mod chunk_selective_ack;
pub mod chunk_shutdown;

use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use chunk_abort::ChunkAbort;
use chunk_cookie_ack::ChunkCookieAck;
use chunk_cookie_echo::ChunkCookieEcho;
use chunk_forward_tsn::ChunkForwardTsn;
use chunk_header::{ChunkHeader, CHUNK_HEADER_SIZE};
use chunk_heartbeat::{ChunkHeartbeat, ChunkHeartbeatAck};
use chunk_init::ChunkInit;
use chunk_payload_data::ChunkPayloadData;
use chunk_reconfig::ChunkReconfig;
use chunk_selective_ack::ChunkSelectiveAck;
use chunk_shutdown::{ChunkShutdown, ChunkShutdownAck, ChunkShutdownComplete};

pub const CT_PAYLOAD_DATA: u8 = 0;
pub const CT_INIT: u8 = 1;
pub const CT_INIT_ACK: u8 = 2;
pub const CT_SACK: u8 = 3;
pub const CT_HEARTBEAT: u8 = 4;
pub const CT_HEARTBEAT_ACK: u8 = 5;
pub const CT_ABORT: u8 = 6;
pub const CT_SHUTDOWN: u8 = 7;
pub const CT_SHUTDOWN_ACK: u8 = 8;
pub const CT_ERROR: u8 = 9;
pub const CT_COOKIE_ECHO: u8 = 10;
pub const CT_COOKIE_ACK: u8 = 11;
pub const CT_SHUTDOWN_COMPLETE: u8 = 14;
pub const CT_RECONFIG: u8 = 130;
pub const CT_FORWARD_TSN: u8 = 192;

/// Every chunk this stack understands, as a tagged sum. Unknown chunk
/// types are skipped by the packet parser according to their
/// upper-bits action (RFC 4960 section 3.2).
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    PayloadData(ChunkPayloadData),
    Init(ChunkInit),
    InitAck(ChunkInit),
    SelectiveAck(ChunkSelectiveAck),
    Heartbeat(ChunkHeartbeat),
    HeartbeatAck(ChunkHeartbeatAck),
    Abort(ChunkAbort),
    Shutdown(ChunkShutdown),
    ShutdownAck(ChunkShutdownAck),
    Error(ChunkAbort),
    CookieEcho(ChunkCookieEcho),
    CookieAck(ChunkCookieAck),
    ShutdownComplete(ChunkShutdownComplete),
    Reconfig(ChunkReconfig),
    ForwardTsn(ChunkForwardTsn),
}

impl Chunk {
    pub fn chunk_type(&self) -> u8 {
        match self {
            Chunk::PayloadData(_) => CT_PAYLOAD_DATA,
            Chunk::Init(_) => CT_INIT,
            Chunk::InitAck(_) => CT_INIT_ACK,
            Chunk::SelectiveAck(_) => CT_SACK,
            Chunk::Heartbeat(_) => CT_HEARTBEAT,
            Chunk::HeartbeatAck(_) => CT_HEARTBEAT_ACK,
            Chunk::Abort(_) => CT_ABORT,
            Chunk::Shutdown(_) => CT_SHUTDOWN,
            Chunk::ShutdownAck(_) => CT_SHUTDOWN_ACK,
            Chunk::Error(_) => CT_ERROR,
            Chunk::CookieEcho(_) => CT_COOKIE_ECHO,
            Chunk::CookieAck(_) => CT_COOKIE_ACK,
            Chunk::ShutdownComplete(_) => CT_SHUTDOWN_COMPLETE,
            Chunk::Reconfig(_) => CT_RECONFIG,
            Chunk::ForwardTsn(_) => CT_FORWARD_TSN,
        }
    }

    fn flags(&self) -> u8 {
        match self {
            Chunk::PayloadData(c) => c.flags(),
            Chunk::Abort(_) | Chunk::Error(_) => 0,
            Chunk::ShutdownComplete(c) => {
                if c.no_tcb {
                    1
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    fn marshal_value(&self) -> Vec<u8> {
        let mut out = vec![];
        match self {
            Chunk::PayloadData(c) => c.marshal_value(&mut out),
            Chunk::Init(c) | Chunk::InitAck(c) => c.marshal_value(&mut out),
            Chunk::SelectiveAck(c) => c.marshal_value(&mut out),
            Chunk::Heartbeat(c) => c.marshal_value(&mut out),
            Chunk::HeartbeatAck(c) => c.marshal_value(&mut out),
            Chunk::Abort(c) | Chunk::Error(c) => c.marshal_value(&mut out),
            Chunk::Shutdown(c) => c.marshal_value(&mut out),
            Chunk::ShutdownAck(_) | Chunk::ShutdownComplete(_) | Chunk::CookieAck(_) => {}
            Chunk::CookieEcho(c) => c.marshal_value(&mut out),
            Chunk::Reconfig(c) => c.marshal_value(&mut out),
            Chunk::ForwardTsn(c) => c.marshal_value(&mut out),
        }
        out
    }

    /// Serializes header plus value, padded to a 4-byte boundary.
    pub fn marshal(&self, out: &mut Vec<u8>) {
        let value = self.marshal_value();
        let header = ChunkHeader {
            typ: self.chunk_type(),
            flags: self.flags(),
            value_length: value.len() as u16,
        };
        header.marshal(out);
        out.extend_from_slice(&value);
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }

    /// Parses one chunk; returns the chunk (None for unknown types that
    /// should be skipped) and the padded wire size consumed.
    pub fn unmarshal(raw: &[u8]) -> Result<(Option<Chunk>, usize)> {
        let mut buf = raw;
        let header = ChunkHeader::unmarshal(&mut buf)?;
        let value_len = header.value_length as usize;
        if buf.remaining() < value_len {
            return Err(Error::ErrChunkHeaderInvalidLength);
        }
        let value = Bytes::copy_from_slice(&buf[..value_len]);
        let padded = CHUNK_HEADER_SIZE + ((value_len + 3) & !3);
        let consumed = padded.min(raw.len());

        let chunk = match header.typ {
            CT_PAYLOAD_DATA => Some(Chunk::PayloadData(ChunkPayloadData::unmarshal_value(
                header.flags,
                value,
            )?)),
            CT_INIT => Some(Chunk::Init(ChunkInit::unmarshal_value(&value)?)),
            CT_INIT_ACK => Some(Chunk::InitAck(ChunkInit::unmarshal_value(&value)?)),
            CT_SACK => Some(Chunk::SelectiveAck(ChunkSelectiveAck::unmarshal_value(
                &value,
            )?)),
            CT_HEARTBEAT => Some(Chunk::Heartbeat(ChunkHeartbeat::unmarshal_value(&value)?)),
            CT_HEARTBEAT_ACK => Some(Chunk::HeartbeatAck(ChunkHeartbeatAck::unmarshal_value(
                &value,
            )?)),
            CT_ABORT => Some(Chunk::Abort(ChunkAbort::unmarshal_value(&value)?)),
            CT_ERROR => Some(Chunk::Error(ChunkAbort::unmarshal_value(&value)?)),
            CT_SHUTDOWN => Some(Chunk::Shutdown(ChunkShutdown::unmarshal_value(&value)?)),
            CT_SHUTDOWN_ACK => Some(Chunk::ShutdownAck(ChunkShutdownAck {})),
            CT_COOKIE_ECHO => Some(Chunk::CookieEcho(ChunkCookieEcho {
                cookie: value.to_vec(),
            })),
            CT_COOKIE_ACK => Some(Chunk::CookieAck(ChunkCookieAck {})),
            CT_SHUTDOWN_COMPLETE => Some(Chunk::ShutdownComplete(ChunkShutdownComplete {
                no_tcb: header.flags & 1 != 0,
            })),
            CT_RECONFIG => Some(Chunk::Reconfig(ChunkReconfig::unmarshal_value(&value)?)),
            CT_FORWARD_TSN => Some(Chunk::ForwardTsn(ChunkForwardTsn::unmarshal_value(&value)?)),
            _ => None,
        };
        Ok((chunk, consumed))
    }
}
