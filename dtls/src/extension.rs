use bytes::Buf;

use crate::crypto::NamedCurve;
use crate::error::{Error, Result};

pub const EXTENSION_SUPPORTED_ELLIPTIC_CURVES: u16 = 10;
pub const EXTENSION_SUPPORTED_POINT_FORMATS: u16 = 11;
pub const EXTENSION_SUPPORTED_SIGNATURE_ALGORITHMS: u16 = 13;
pub const EXTENSION_USE_SRTP: u16 = 14;
pub const EXTENSION_EXTENDED_MASTER_SECRET: u16 = 23;
pub const EXTENSION_RENEGOTIATION_INFO: u16 = 65281;

/// ecdsa_secp256r1_sha256 (RFC 8422).
pub const SIGNATURE_SCHEME_ECDSA_SHA256: u16 = 0x0403;

/// The extensions this stack produces and consumes. Unknown extensions
/// are carried opaquely so a peer's list round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    SupportedEllipticCurves { curves: Vec<NamedCurve> },
    SupportedPointFormats { formats: Vec<u8> },
    SupportedSignatureAlgorithms { algorithms: Vec<u16> },
    UseSrtp { profiles: Vec<u16> },
    ExtendedMasterSecret,
    RenegotiationInfo,
    Unknown { typ: u16, data: Vec<u8> },
}

impl Extension {
    pub fn typ(&self) -> u16 {
        match self {
            Extension::SupportedEllipticCurves { .. } => EXTENSION_SUPPORTED_ELLIPTIC_CURVES,
            Extension::SupportedPointFormats { .. } => EXTENSION_SUPPORTED_POINT_FORMATS,
            Extension::SupportedSignatureAlgorithms { .. } => {
                EXTENSION_SUPPORTED_SIGNATURE_ALGORITHMS
            }
            Extension::UseSrtp { .. } => EXTENSION_USE_SRTP,
            Extension::ExtendedMasterSecret => EXTENSION_EXTENDED_MASTER_SECRET,
            Extension::RenegotiationInfo => EXTENSION_RENEGOTIATION_INFO,
            Extension::Unknown { typ, .. } => *typ,
        }
    }

    fn marshal_body(&self, out: &mut Vec<u8>) {
        match self {
            Extension::SupportedEllipticCurves { curves } => {
                out.extend_from_slice(&((curves.len() * 2) as u16).to_be_bytes());
                for c in curves {
                    out.extend_from_slice(&(*c as u16).to_be_bytes());
                }
            }
            Extension::SupportedPointFormats { formats } => {
                out.push(formats.len() as u8);
                out.extend_from_slice(formats);
            }
            Extension::SupportedSignatureAlgorithms { algorithms } => {
                out.extend_from_slice(&((algorithms.len() * 2) as u16).to_be_bytes());
                for a in algorithms {
                    out.extend_from_slice(&a.to_be_bytes());
                }
            }
            Extension::UseSrtp { profiles } => {
                out.extend_from_slice(&((profiles.len() * 2) as u16).to_be_bytes());
                for p in profiles {
                    out.extend_from_slice(&p.to_be_bytes());
                }
                // empty srtp_mki
                out.push(0);
            }
            Extension::ExtendedMasterSecret | Extension::RenegotiationInfo => {
                if matches!(self, Extension::RenegotiationInfo) {
                    // empty renegotiated_connection
                    out.push(0);
                }
            }
            Extension::Unknown { data, .. } => out.extend_from_slice(data),
        }
    }

    pub fn marshal(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.typ().to_be_bytes());
        let mut body = vec![];
        self.marshal_body(&mut body);
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(&body);
    }

    pub fn unmarshal<B: Buf>(buf: &mut B) -> Result<Extension> {
        if buf.remaining() < 4 {
            return Err(Error::ErrBufferTooSmall);
        }
        let typ = buf.get_u16();
        let len = buf.get_u16() as usize;
        if buf.remaining() < len {
            return Err(Error::ErrBufferTooSmall);
        }
        let data = buf.copy_to_bytes(len);
        let mut body = &data[..];

        Ok(match typ {
            EXTENSION_SUPPORTED_ELLIPTIC_CURVES => {
                if body.remaining() < 2 {
                    return Err(Error::ErrBufferTooSmall);
                }
                let list_len = body.get_u16() as usize / 2;
                let mut curves = vec![];
                for _ in 0..list_len {
                    if body.remaining() < 2 {
                        return Err(Error::ErrBufferTooSmall);
                    }
                    if let Some(curve) = NamedCurve::from_u16(body.get_u16()) {
                        curves.push(curve);
                    }
                }
                Extension::SupportedEllipticCurves { curves }
            }
            EXTENSION_SUPPORTED_POINT_FORMATS => {
                if body.remaining() < 1 {
                    return Err(Error::ErrBufferTooSmall);
                }
                let n = body.get_u8() as usize;
                if body.remaining() < n {
                    return Err(Error::ErrBufferTooSmall);
                }
                Extension::SupportedPointFormats {
                    formats: body.copy_to_bytes(n).to_vec(),
                }
            }
            EXTENSION_SUPPORTED_SIGNATURE_ALGORITHMS => {
                if body.remaining() < 2 {
                    return Err(Error::ErrBufferTooSmall);
                }
                let n = body.get_u16() as usize / 2;
                let mut algorithms = vec![];
                for _ in 0..n {
                    if body.remaining() < 2 {
                        return Err(Error::ErrBufferTooSmall);
                    }
                    algorithms.push(body.get_u16());
                }
                Extension::SupportedSignatureAlgorithms { algorithms }
            }
            EXTENSION_USE_SRTP => {
                if body.remaining() < 2 {
                    return Err(Error::ErrBufferTooSmall);
                }
                let n = body.get_u16() as usize / 2;
                let mut profiles = vec![];
                for _ in 0..n {
                    if body.remaining() < 2 {
                        return Err(Error::ErrBufferTooSmall);
                    }
                    profiles.push(body.get_u16());
                }
                Extension::UseSrtp { profiles }
            }
            EXTENSION_EXTENDED_MASTER_SECRET => Extension::ExtendedMasterSecret,
            EXTENSION_RENEGOTIATION_INFO => Extension::RenegotiationInfo,
            _ => Extension::Unknown {
                typ,
                data: data.to_vec(),
            },
        })
    }

    pub fn marshal_list(extensions: &[Extension], out: &mut Vec<u8>) {
        let mut body = vec![];
        for ext in extensions {
            ext.marshal(&mut body);
        }
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(&body);
    }

    pub fn unmarshal_list<B: Buf>(buf: &mut B) -> Result<Vec<Extension>> {
        if !buf.has_remaining() {
            // extensions are optional in hello messages
            return Ok(vec![]);
        }
        if buf.remaining() < 2 {
            return Err(Error::ErrBufferTooSmall);
        }
        let total = buf.get_u16() as usize;
        if buf.remaining() < total {
            return Err(Error::ErrBufferTooSmall);
        }
        let data = buf.copy_to_bytes(total);
        let mut body = &data[..];
        let mut extensions = vec![];
        while body.has_remaining() {
            extensions.push(Extension::unmarshal(&mut body)?);
        }
        Ok(extensions)
    }
}
