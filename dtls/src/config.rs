use std::time::Duration;

use crate::crypto::CryptoCertificate;

/// Which side of the handshake this endpoint drives; decided by the
/// signaling layer (the SDP setup attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Per-endpoint handshake configuration. There are no process-wide
/// toggles; every endpoint carries its own copy.
#[derive(Clone)]
pub struct HandshakeConfig {
    pub certificate: CryptoCertificate,
    /// DTLS-SRTP protection profile ids offered (client) or accepted
    /// (server), in local preference order.
    pub srtp_protection_profiles: Vec<u16>,
    /// Offer (and accept) the extended master secret extension.
    pub extended_master_secret: bool,
    /// Request a client certificate (servers only). Browsers do not
    /// drive this path; off by default.
    pub client_auth: bool,
    /// Conservative path MTU for handshake fragmentation.
    pub mtu: usize,
    pub initial_retransmit_interval: Duration,
    pub max_retransmit_interval: Duration,
    /// Total transmits of one flight before the handshake is abandoned.
    pub max_flight_transmits: u8,
}

impl HandshakeConfig {
    pub fn new(certificate: CryptoCertificate) -> Self {
        HandshakeConfig {
            certificate,
            srtp_protection_profiles: vec![],
            extended_master_secret: true,
            client_auth: false,
            mtu: 1200,
            initial_retransmit_interval: Duration::from_secs(1),
            max_retransmit_interval: Duration::from_secs(60),
            max_flight_transmits: 8,
        }
    }
}
