#[cfg(test)]
#[path = "handshake_test.rs"]
mod handshake_test;

pub mod handshake_header;
pub mod handshake_message_certificate;
pub mod handshake_message_certificate_request;
pub mod handshake_message_certificate_verify;
pub mod handshake_message_client_hello;
pub mod handshake_message_client_key_exchange;
pub mod handshake_message_finished;
pub mod handshake_message_hello_verify_request;
pub mod handshake_message_server_hello;
pub mod handshake_message_server_hello_done;
pub mod handshake_message_server_key_exchange;
pub mod handshake_random;

use crate::error::{Error, Result};
use handshake_header::{HandshakeHeader, HANDSHAKE_HEADER_LENGTH};
use handshake_message_certificate::HandshakeMessageCertificate;
use handshake_message_certificate_request::HandshakeMessageCertificateRequest;
use handshake_message_certificate_verify::HandshakeMessageCertificateVerify;
use handshake_message_client_hello::HandshakeMessageClientHello;
use handshake_message_client_key_exchange::HandshakeMessageClientKeyExchange;
use handshake_message_finished::HandshakeMessageFinished;
use handshake_message_hello_verify_request::HandshakeMessageHelloVerifyRequest;
use handshake_message_server_hello::HandshakeMessageServerHello;
use handshake_message_server_hello_done::HandshakeMessageServerHelloDone;
use handshake_message_server_key_exchange::HandshakeMessageServerKeyExchange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeType {
    HelloRequest = 0,
    ClientHello = 1,
    ServerHello = 2,
    HelloVerifyRequest = 3,
    Certificate = 11,
    ServerKeyExchange = 12,
    CertificateRequest = 13,
    ServerHelloDone = 14,
    CertificateVerify = 15,
    ClientKeyExchange = 16,
    Finished = 20,
}

impl HandshakeType {
    pub fn from_u8(v: u8) -> Result<HandshakeType> {
        Ok(match v {
            0 => HandshakeType::HelloRequest,
            1 => HandshakeType::ClientHello,
            2 => HandshakeType::ServerHello,
            3 => HandshakeType::HelloVerifyRequest,
            11 => HandshakeType::Certificate,
            12 => HandshakeType::ServerKeyExchange,
            13 => HandshakeType::CertificateRequest,
            14 => HandshakeType::ServerHelloDone,
            15 => HandshakeType::CertificateVerify,
            16 => HandshakeType::ClientKeyExchange,
            20 => HandshakeType::Finished,
            other => return Err(Error::Other(format!("unknown handshake type {other}"))),
        })
    }
}

/// Body of one handshake message.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeMessage {
    ClientHello(HandshakeMessageClientHello),
    ServerHello(HandshakeMessageServerHello),
    HelloVerifyRequest(HandshakeMessageHelloVerifyRequest),
    Certificate(HandshakeMessageCertificate),
    ServerKeyExchange(HandshakeMessageServerKeyExchange),
    CertificateRequest(HandshakeMessageCertificateRequest),
    ServerHelloDone(HandshakeMessageServerHelloDone),
    CertificateVerify(HandshakeMessageCertificateVerify),
    ClientKeyExchange(HandshakeMessageClientKeyExchange),
    Finished(HandshakeMessageFinished),
}

impl HandshakeMessage {
    pub fn handshake_type(&self) -> HandshakeType {
        match self {
            HandshakeMessage::ClientHello(_) => HandshakeType::ClientHello,
            HandshakeMessage::ServerHello(_) => HandshakeType::ServerHello,
            HandshakeMessage::HelloVerifyRequest(_) => HandshakeType::HelloVerifyRequest,
            HandshakeMessage::Certificate(_) => HandshakeType::Certificate,
            HandshakeMessage::ServerKeyExchange(_) => HandshakeType::ServerKeyExchange,
            HandshakeMessage::CertificateRequest(_) => HandshakeType::CertificateRequest,
            HandshakeMessage::ServerHelloDone(_) => HandshakeType::ServerHelloDone,
            HandshakeMessage::CertificateVerify(_) => HandshakeType::CertificateVerify,
            HandshakeMessage::ClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
            HandshakeMessage::Finished(_) => HandshakeType::Finished,
        }
    }

    pub fn marshal_body(&self) -> Vec<u8> {
        let mut out = vec![];
        match self {
            HandshakeMessage::ClientHello(m) => m.marshal(&mut out),
            HandshakeMessage::ServerHello(m) => m.marshal(&mut out),
            HandshakeMessage::HelloVerifyRequest(m) => m.marshal(&mut out),
            HandshakeMessage::Certificate(m) => m.marshal(&mut out),
            HandshakeMessage::ServerKeyExchange(m) => m.marshal(&mut out),
            HandshakeMessage::CertificateRequest(m) => m.marshal(&mut out),
            HandshakeMessage::ServerHelloDone(m) => m.marshal(&mut out),
            HandshakeMessage::CertificateVerify(m) => m.marshal(&mut out),
            HandshakeMessage::ClientKeyExchange(m) => m.marshal(&mut out),
            HandshakeMessage::Finished(m) => m.marshal(&mut out),
        }
        out
    }

    pub fn unmarshal_body(typ: HandshakeType, body: &[u8]) -> Result<HandshakeMessage> {
        let mut buf = body;
        Ok(match typ {
            HandshakeType::ClientHello => {
                HandshakeMessage::ClientHello(HandshakeMessageClientHello::unmarshal(&mut buf)?)
            }
            HandshakeType::ServerHello => {
                HandshakeMessage::ServerHello(HandshakeMessageServerHello::unmarshal(&mut buf)?)
            }
            HandshakeType::HelloVerifyRequest => HandshakeMessage::HelloVerifyRequest(
                HandshakeMessageHelloVerifyRequest::unmarshal(&mut buf)?,
            ),
            HandshakeType::Certificate => {
                HandshakeMessage::Certificate(HandshakeMessageCertificate::unmarshal(&mut buf)?)
            }
            HandshakeType::ServerKeyExchange => HandshakeMessage::ServerKeyExchange(
                HandshakeMessageServerKeyExchange::unmarshal(&mut buf)?,
            ),
            HandshakeType::CertificateRequest => HandshakeMessage::CertificateRequest(
                HandshakeMessageCertificateRequest::unmarshal(&mut buf)?,
            ),
            HandshakeType::ServerHelloDone => {
                HandshakeMessage::ServerHelloDone(HandshakeMessageServerHelloDone {})
            }
            HandshakeType::CertificateVerify => HandshakeMessage::CertificateVerify(
                HandshakeMessageCertificateVerify::unmarshal(&mut buf)?,
            ),
            HandshakeType::ClientKeyExchange => HandshakeMessage::ClientKeyExchange(
                HandshakeMessageClientKeyExchange::unmarshal(&mut buf)?,
            ),
            HandshakeType::Finished => {
                HandshakeMessage::Finished(HandshakeMessageFinished::unmarshal(&mut buf)?)
            }
            HandshakeType::HelloRequest => {
                return Err(Error::ErrUnexpectedHandshakeMessage);
            }
        })
    }

    /// The unfragmented on-the-wire form: 12-byte handshake header with
    /// fragment covering the whole body. This is the form that enters
    /// the handshake transcript (RFC 6347 section 4.2.6).
    pub fn marshal_message(&self, message_sequence: u16) -> Vec<u8> {
        let body = self.marshal_body();
        let header = HandshakeHeader {
            handshake_type: self.handshake_type(),
            length: body.len() as u32,
            message_sequence,
            fragment_offset: 0,
            fragment_length: body.len() as u32,
        };
        let mut out = Vec::with_capacity(HANDSHAKE_HEADER_LENGTH + body.len());
        header.marshal(&mut out);
        out.extend_from_slice(&body);
        out
    }
}
