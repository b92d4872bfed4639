#[cfg(test)]
#[path = "candidate_test.rs"]
mod candidate_test;

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::error::{Error, Result};

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Only component 1 exists with rtcp-mux; RTCP shares the RTP flow.
pub const COMPONENT_RTP: u16 = 1;

pub const DEFAULT_LOCAL_PREFERENCE: u16 = 65535;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateType {
    Host,
    ServerReflexive,
    PeerReflexive,
    Relay,
}

impl CandidateType {
    /// Type preference per RFC 8445 section 5.1.2.2.
    pub fn preference(&self) -> u8 {
        match self {
            CandidateType::Host => 126,
            CandidateType::PeerReflexive => 110,
            CandidateType::ServerReflexive => 100,
            CandidateType::Relay => 0,
        }
    }
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandidateType::Host => "host",
            CandidateType::ServerReflexive => "srflx",
            CandidateType::PeerReflexive => "prflx",
            CandidateType::Relay => "relay",
        };
        write!(f, "{s}")
    }
}

/// One ICE candidate as plain data. Sockets and pair state live in the
/// agent; candidates are addressed by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub candidate_type: CandidateType,
    pub component: u16,
    pub address: IpAddr,
    pub port: u16,
    /// Address/port of the base or server-side mapping, for srflx and
    /// relay candidates.
    pub related_address: Option<SocketAddr>,
    pub tcp_type: Option<String>,
    pub generation: Option<u32>,
    pub ufrag: Option<String>,
    /// Index of the local socket this candidate sends from; not
    /// meaningful for remote candidates.
    pub socket_index: usize,
}

impl Candidate {
    pub fn new_host(address: IpAddr, port: u16, socket_index: usize) -> Self {
        Candidate {
            candidate_type: CandidateType::Host,
            component: COMPONENT_RTP,
            address,
            port,
            related_address: None,
            tcp_type: None,
            generation: None,
            ufrag: None,
            socket_index,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// priority = (2^24)·type-pref + (2^8)·local-pref + (256 − component)
    /// (RFC 8445 section 5.1.2.1).
    pub fn priority(&self) -> u32 {
        (self.candidate_type.preference() as u32) << 24
            | (DEFAULT_LOCAL_PREFERENCE as u32) << 8
            | (256 - self.component as u32)
    }

    /// The priority this candidate would have as peer-reflexive, used in
    /// the PRIORITY attribute of connectivity checks.
    pub fn prflx_priority(&self) -> u32 {
        (CandidateType::PeerReflexive.preference() as u32) << 24
            | (DEFAULT_LOCAL_PREFERENCE as u32) << 8
            | (256 - self.component as u32)
    }

    /// Candidates of the same type, base and server share a foundation
    /// (RFC 8445 section 5.1.1.3).
    pub fn foundation(&self) -> String {
        let mut input = String::new();
        input.push_str(&self.candidate_type.to_string());
        input.push_str(&self.address.to_string());
        input.push_str("udp");
        let checksum = CRC32.checksum(input.as_bytes());
        format!("{checksum}")
    }

    /// Serializes the SDP candidate-attribute value (the part after
    /// `candidate:`).
    pub fn marshal(&self) -> String {
        let mut out = format!(
            "{} {} udp {} {} {} typ {}",
            self.foundation(),
            self.component,
            self.priority(),
            self.address,
            self.port,
            self.candidate_type,
        );
        if let Some(related) = &self.related_address {
            out.push_str(&format!(" raddr {} rport {}", related.ip(), related.port()));
        }
        if let Some(tcp_type) = &self.tcp_type {
            out.push_str(&format!(" tcptype {tcp_type}"));
        }
        if let Some(generation) = self.generation {
            out.push_str(&format!(" generation {generation}"));
        }
        if let Some(ufrag) = &self.ufrag {
            out.push_str(&format!(" ufrag {ufrag}"));
        }
        out
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{}",
            self.candidate_type,
            self.priority(),
            self.address,
            self.port
        )
    }
}

/// Parses an SDP candidate-attribute value; inverse of
/// [`Candidate::marshal`] for the documented grammar.
pub fn unmarshal_candidate(raw: &str) -> Result<Candidate> {
    let raw = raw.trim().trim_start_matches("candidate:");
    let fields: Vec<&str> = raw.split_whitespace().collect();
    if fields.len() < 8 {
        return Err(Error::ErrCandidateParse(raw.to_owned()));
    }

    let component: u16 = fields[1]
        .parse()
        .map_err(|_| Error::ErrCandidateParse(raw.to_owned()))?;
    let transport = fields[2].to_lowercase();
    if transport != "udp" && transport != "tcp" {
        return Err(Error::ErrCandidateParse(raw.to_owned()));
    }
    let address: IpAddr = fields[4]
        .parse()
        .map_err(|_| Error::ErrCandidateParse(raw.to_owned()))?;
    let port: u16 = fields[5]
        .parse()
        .map_err(|_| Error::ErrCandidateParse(raw.to_owned()))?;
    if fields[6] != "typ" {
        return Err(Error::ErrCandidateParse(raw.to_owned()));
    }
    let candidate_type = match fields[7] {
        "host" => CandidateType::Host,
        "srflx" => CandidateType::ServerReflexive,
        "prflx" => CandidateType::PeerReflexive,
        "relay" => CandidateType::Relay,
        other => return Err(Error::ErrCandidateParse(other.to_owned())),
    };

    let mut candidate = Candidate {
        candidate_type,
        component,
        address,
        port,
        related_address: None,
        tcp_type: None,
        generation: None,
        ufrag: None,
        socket_index: 0,
    };

    // trailing key/value extensions
    let mut i = 8;
    let mut raddr: Option<IpAddr> = None;
    let mut rport: Option<u16> = None;
    while i + 1 < fields.len() {
        match fields[i] {
            "raddr" => raddr = fields[i + 1].parse().ok(),
            "rport" => rport = fields[i + 1].parse().ok(),
            "tcptype" => candidate.tcp_type = Some(fields[i + 1].to_owned()),
            "generation" => candidate.generation = fields[i + 1].parse().ok(),
            "ufrag" => candidate.ufrag = Some(fields[i + 1].to_owned()),
            _ => {}
        }
        i += 2;
    }
    if let (Some(ip), Some(port)) = (raddr, rport) {
        candidate.related_address = Some(SocketAddr::new(ip, port));
    }

    Ok(candidate)
}
