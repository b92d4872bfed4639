#[cfg(test)]
mod param_test;

use bytes::Buf;

use crate::error::{Error, Result};

pub const PARAM_HEARTBEAT_INFO: u16 = 1;
pub const PARAM_STATE_COOKIE: u16 = 7;
pub const PARAM_OUTGOING_SSN_RESET_REQUEST: u16 = 13;
pub const PARAM_INCOMING_SSN_RESET_REQUEST: u16 = 14;
pub const PARAM_RECONFIG_RESPONSE: u16 = 16;
pub const PARAM_ADD_OUTGOING_STREAMS_REQUEST: u16 = 17;
pub const PARAM_FORWARD_TSN_SUPPORTED: u16 = 49152;

/// Re-configuration response results (RFC 6525 section 4.4).
pub const RECONFIG_RESULT_SUCCESS_NOP: u32 = 0;
pub const RECONFIG_RESULT_SUCCESS_PERFORMED: u32 = 1;
pub const RECONFIG_RESULT_DENIED: u32 = 2;
pub const RECONFIG_RESULT_IN_PROGRESS: u32 = 6;

/// The chunk parameters this stack understands, as a tagged sum.
/// Unknown parameters round-trip opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    HeartbeatInfo(Vec<u8>),
    StateCookie(Vec<u8>),
    ForwardTsnSupported,
    OutgoingSsnResetRequest {
        request_sequence: u32,
        response_sequence: u32,
        senders_last_tsn: u32,
        stream_identifiers: Vec<u16>,
    },
    ReconfigResponse {
        response_sequence: u32,
        result: u32,
    },
    AddOutgoingStreamsRequest {
        request_sequence: u32,
        new_streams: u16,
    },
    Unknown {
        typ: u16,
        value: Vec<u8>,
    },
}

impl Param {
    pub fn typ(&self) -> u16 {
        match self {
            Param::HeartbeatInfo(_) => PARAM_HEARTBEAT_INFO,
            Param::StateCookie(_) => PARAM_STATE_COOKIE,
            Param::ForwardTsnSupported => PARAM_FORWARD_TSN_SUPPORTED,
            Param::OutgoingSsnResetRequest { .. } => PARAM_OUTGOING_SSN_RESET_REQUEST,
            Param::ReconfigResponse { .. } => PARAM_RECONFIG_RESPONSE,
            Param::AddOutgoingStreamsRequest { .. } => PARAM_ADD_OUTGOING_STREAMS_REQUEST,
            Param::Unknown { typ, .. } => *typ,
        }
    }

    fn marshal_value(&self, out: &mut Vec<u8>) {
        match self {
            Param::HeartbeatInfo(info) => out.extend_from_slice(info),
            Param::StateCookie(cookie) => out.extend_from_slice(cookie),
            Param::ForwardTsnSupported => {}
            Param::OutgoingSsnResetRequest {
                request_sequence,
                response_sequence,
                senders_last_tsn,
                stream_identifiers,
            } => {
                out.extend_from_slice(&request_sequence.to_be_bytes());
                out.extend_from_slice(&response_sequence.to_be_bytes());
                out.extend_from_slice(&senders_last_tsn.to_be_bytes());
                for id in stream_identifiers {
                    out.extend_from_slice(&id.to_be_bytes());
                }
            }
            Param::ReconfigResponse {
                response_sequence,
                result,
            } => {
                out.extend_from_slice(&response_sequence.to_be_bytes());
                out.extend_from_slice(&result.to_be_bytes());
            }
            Param::AddOutgoingStreamsRequest {
                request_sequence,
                new_streams,
            } => {
                out.extend_from_slice(&request_sequence.to_be_bytes());
                out.extend_from_slice(&new_streams.to_be_bytes());
                out.extend_from_slice(&0u16.to_be_bytes());
            }
            Param::Unknown { value, .. } => out.extend_from_slice(value),
        }
    }

    /// Serializes the TLV, padded to a 4-byte boundary.
    pub fn marshal(&self, out: &mut Vec<u8>) {
        let mut value = vec![];
        self.marshal_value(&mut value);
        out.extend_from_slice(&self.typ().to_be_bytes());
        out.extend_from_slice(&((value.len() + 4) as u16).to_be_bytes());
        out.extend_from_slice(&value);
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }

    pub fn unmarshal(raw: &[u8]) -> Result<(Param, usize)> {
        let mut buf = raw;
        if buf.remaining() < 4 {
            return Err(Error::ErrParamHeaderTooShort);
        }
        let typ = buf.get_u16();
        let length = buf.get_u16() as usize;
        if length < 4 || raw.len() < length {
            return Err(Error::ErrParamLengthInvalid);
        }
        let value = &raw[4..length];
        let consumed = ((length + 3) & !3).min(raw.len());

        let param = match typ {
            PARAM_HEARTBEAT_INFO => Param::HeartbeatInfo(value.to_vec()),
            PARAM_STATE_COOKIE => Param::StateCookie(value.to_vec()),
            PARAM_FORWARD_TSN_SUPPORTED => Param::ForwardTsnSupported,
            PARAM_OUTGOING_SSN_RESET_REQUEST => {
                if value.len() < 12 {
                    return Err(Error::ErrParamLengthInvalid);
                }
                let mut v = value;
                let request_sequence = v.get_u32();
                let response_sequence = v.get_u32();
                let senders_last_tsn = v.get_u32();
                let mut stream_identifiers = vec![];
                while v.remaining() >= 2 {
                    stream_identifiers.push(v.get_u16());
                }
                Param::OutgoingSsnResetRequest {
                    request_sequence,
                    response_sequence,
                    senders_last_tsn,
                    stream_identifiers,
                }
            }
            PARAM_RECONFIG_RESPONSE => {
                if value.len() < 8 {
                    return Err(Error::ErrParamLengthInvalid);
                }
                let mut v = value;
                Param::ReconfigResponse {
                    response_sequence: v.get_u32(),
                    result: v.get_u32(),
                }
            }
            PARAM_ADD_OUTGOING_STREAMS_REQUEST => {
                if value.len() < 8 {
                    return Err(Error::ErrParamLengthInvalid);
                }
                let mut v = value;
                let request_sequence = v.get_u32();
                let new_streams = v.get_u16();
                Param::AddOutgoingStreamsRequest {
                    request_sequence,
                    new_streams,
                }
            }
            _ => Param::Unknown {
                typ,
                value: value.to_vec(),
            },
        };
        Ok((param, consumed))
    }

    pub fn unmarshal_list(mut raw: &[u8]) -> Result<Vec<Param>> {
        let mut params = vec![];
        while raw.len() >= 4 {
            let (param, consumed) = Param::unmarshal(raw)?;
            params.push(param);
            raw = &raw[consumed..];
        }
        Ok(params)
    }
}
