#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;

use bytes::{Buf, Bytes};
use sctp::{PayloadProtocolIdentifier, ReliabilityPolicy};

use crate::error::{Error, Result};

pub const MESSAGE_TYPE_OPEN: u8 = 0x03;
pub const MESSAGE_TYPE_ACK: u8 = 0x02;

pub const CHANNEL_TYPE_RELIABLE: u8 = 0x00;
pub const CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT: u8 = 0x01;
pub const CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED: u8 = 0x02;
/// The high bit of the channel type selects unordered delivery.
pub const CHANNEL_TYPE_UNORDERED_BIT: u8 = 0x80;

/// How a data channel maps onto an SCTP stream: ordering plus the
/// partial reliability policy carried in DATA_CHANNEL_OPEN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub unordered: bool,
    pub policy: ReliabilityPolicy,
    pub priority: u16,
    pub label: String,
    pub protocol: String,
}

impl ChannelConfig {
    pub fn reliable(label: &str) -> Self {
        ChannelConfig {
            unordered: false,
            policy: ReliabilityPolicy::Reliable,
            priority: 0,
            label: label.to_owned(),
            protocol: String::new(),
        }
    }

    fn channel_type(&self) -> u8 {
        let base = match self.policy {
            ReliabilityPolicy::Reliable => CHANNEL_TYPE_RELIABLE,
            ReliabilityPolicy::MaxRetransmits(_) => CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT,
            ReliabilityPolicy::MaxPacketLifetime(_) => CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED,
        };
        if self.unordered {
            base | CHANNEL_TYPE_UNORDERED_BIT
        } else {
            base
        }
    }

    fn reliability_parameter(&self) -> u32 {
        match self.policy {
            ReliabilityPolicy::Reliable => 0,
            ReliabilityPolicy::MaxRetransmits(n) => n,
            ReliabilityPolicy::MaxPacketLifetime(ms) => ms as u32,
        }
    }
}

/// A DCEP message (RFC 8832 section 5), sent with PPID 50.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DcepMessage {
    /// DATA_CHANNEL_OPEN, sent by the side opening a channel on its
    /// chosen stream.
    Open(ChannelConfig),
    /// DATA_CHANNEL_ACK, returned on the same stream.
    Ack,
}

impl DcepMessage {
    pub fn marshal(&self) -> Vec<u8> {
        match self {
            DcepMessage::Ack => vec![MESSAGE_TYPE_ACK],
            DcepMessage::Open(config) => {
                let mut out = Vec::with_capacity(12 + config.label.len() + config.protocol.len());
                out.push(MESSAGE_TYPE_OPEN);
                out.push(config.channel_type());
                out.extend_from_slice(&config.priority.to_be_bytes());
                out.extend_from_slice(&config.reliability_parameter().to_be_bytes());
                out.extend_from_slice(&(config.label.len() as u16).to_be_bytes());
                out.extend_from_slice(&(config.protocol.len() as u16).to_be_bytes());
                out.extend_from_slice(config.label.as_bytes());
                out.extend_from_slice(config.protocol.as_bytes());
                out
            }
        }
    }

    pub fn unmarshal(raw: &[u8]) -> Result<DcepMessage> {
        if raw.is_empty() {
            return Err(Error::ErrMessageTooShort);
        }
        match raw[0] {
            MESSAGE_TYPE_ACK => Ok(DcepMessage::Ack),
            MESSAGE_TYPE_OPEN => {
                if raw.len() < 12 {
                    return Err(Error::ErrMessageTooShort);
                }
                let mut buf = &raw[1..];
                let channel_type = buf.get_u8();
                let priority = buf.get_u16();
                let reliability_parameter = buf.get_u32();
                let label_len = buf.get_u16() as usize;
                let protocol_len = buf.get_u16() as usize;
                if buf.remaining() < label_len + protocol_len {
                    return Err(Error::ErrLengthMismatch);
                }
                let label = String::from_utf8_lossy(&buf.copy_to_bytes(label_len)).into_owned();
                let protocol =
                    String::from_utf8_lossy(&buf.copy_to_bytes(protocol_len)).into_owned();

                let unordered = channel_type & CHANNEL_TYPE_UNORDERED_BIT != 0;
                let policy = match channel_type & !CHANNEL_TYPE_UNORDERED_BIT {
                    CHANNEL_TYPE_RELIABLE => ReliabilityPolicy::Reliable,
                    CHANNEL_TYPE_PARTIAL_RELIABLE_REXMIT => {
                        ReliabilityPolicy::MaxRetransmits(reliability_parameter)
                    }
                    CHANNEL_TYPE_PARTIAL_RELIABLE_TIMED => {
                        ReliabilityPolicy::MaxPacketLifetime(reliability_parameter as u64)
                    }
                    other => return Err(Error::ErrUnknownChannelType(other)),
                };

                Ok(DcepMessage::Open(ChannelConfig {
                    unordered,
                    policy,
                    priority,
                    label,
                    protocol,
                }))
            }
            other => Err(Error::ErrUnknownMessageType(other)),
        }
    }
}

/// PPID selection for user messages: empty payloads use the dedicated
/// empty PPIDs and carry one zero byte (RFC 8831 section 6.6).
pub fn ppid_for(binary: bool, len: usize) -> PayloadProtocolIdentifier {
    match (binary, len) {
        (true, 0) => PayloadProtocolIdentifier::BinaryEmpty,
        (true, _) => PayloadProtocolIdentifier::Binary,
        (false, 0) => PayloadProtocolIdentifier::StringEmpty,
        (false, _) => PayloadProtocolIdentifier::String,
    }
}

/// The bytes actually handed to SCTP for a user message.
pub fn payload_for(data: &[u8]) -> Bytes {
    if data.is_empty() {
        Bytes::from_static(&[0])
    } else {
        Bytes::copy_from_slice(data)
    }
}
