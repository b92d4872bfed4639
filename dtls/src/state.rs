use std::collections::HashMap;

use util::replay_detector::SlidingWindowDetector;

use crate::cipher_suite::CipherSuiteAes128GcmSha256;
use crate::config::Role;
use crate::crypto::{NamedCurve, NamedCurveKeypair};
use crate::handshake::handshake_random::HandshakeRandom;
use crate::handshake::HandshakeType;
use crate::record_layer::RecordLayer;

const RECORD_REPLAY_WINDOW: u64 = 64;

/// Ordered transcript of the handshake messages as they appeared on the
/// wire, excluding HelloVerifyRequest and the cookie-less first
/// ClientHello (RFC 6347 section 4.2.2). Each entry is the unfragmented
/// message including its 12-byte header.
#[derive(Default)]
pub struct HandshakeCache {
    messages: Vec<(HandshakeType, Vec<u8>)>,
}

impl HandshakeCache {
    pub fn push(&mut self, typ: HandshakeType, message: Vec<u8>) {
        self.messages.push((typ, message));
    }

    /// The concatenated transcript.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = vec![];
        for (_, m) in &self.messages {
            out.extend_from_slice(m);
        }
        out
    }

    /// Transcript through the last ClientKeyExchange, the RFC 7627
    /// session-hash input.
    pub fn bytes_through_client_key_exchange(&self) -> Vec<u8> {
        let mut out = vec![];
        for (typ, m) in &self.messages {
            out.extend_from_slice(m);
            if *typ == HandshakeType::ClientKeyExchange {
                break;
            }
        }
        out
    }

    pub fn contains(&self, typ: HandshakeType) -> bool {
        self.messages.iter().any(|(t, _)| *t == typ)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Mutable handshake and record-layer state of one DTLS connection.
pub struct State {
    pub role: Role,

    /// Epoch we currently send under; bumps at our ChangeCipherSpec.
    pub local_epoch: u16,
    /// Highest epoch we accept from the peer.
    pub remote_epoch: u16,
    /// Per-epoch outbound record sequence numbers; reset to 0 on every
    /// epoch change.
    pub write_seq: HashMap<u16, u64>,
    /// Per-epoch inbound anti-replay windows.
    pub replay: HashMap<u16, SlidingWindowDetector>,
    /// Records from `remote_epoch + 1` parked until our state advances.
    pub buffered_next_epoch: Vec<RecordLayer>,

    pub handshake_send_seq: u16,

    pub local_random: HandshakeRandom,
    pub remote_random: HandshakeRandom,
    pub cookie: Vec<u8>,

    pub named_curve: NamedCurve,
    pub local_keypair: Option<NamedCurveKeypair>,
    pub peer_kx_public: Vec<u8>,
    pub peer_certificate: Option<Vec<u8>>,

    pub pre_master_secret: Vec<u8>,
    pub master_secret: Vec<u8>,
    pub extended_master_secret: bool,
    pub srtp_profile: Option<u16>,
    pub cipher: Option<CipherSuiteAes128GcmSha256>,

    pub handshake_cache: HandshakeCache,
}

impl State {
    pub fn new(role: Role) -> Self {
        State {
            role,
            local_epoch: 0,
            remote_epoch: 0,
            write_seq: HashMap::new(),
            replay: HashMap::new(),
            buffered_next_epoch: vec![],
            handshake_send_seq: 0,
            local_random: HandshakeRandom::generate(),
            remote_random: HandshakeRandom::default(),
            cookie: vec![],
            named_curve: NamedCurve::X25519,
            local_keypair: None,
            peer_kx_public: vec![],
            peer_certificate: None,
            pre_master_secret: vec![],
            master_secret: vec![],
            extended_master_secret: false,
            srtp_profile: None,
            cipher: None,
            handshake_cache: HandshakeCache::default(),
        }
    }

    /// Allocates the next outbound record sequence number for an epoch.
    pub fn next_write_seq(&mut self, epoch: u16) -> u64 {
        let seq = self.write_seq.entry(epoch).or_insert(0);
        let current = *seq;
        *seq += 1;
        current
    }

    pub fn next_handshake_seq(&mut self) -> u16 {
        let seq = self.handshake_send_seq;
        self.handshake_send_seq += 1;
        seq
    }

    pub fn replay_window(&mut self, epoch: u16) -> &mut SlidingWindowDetector {
        self.replay
            .entry(epoch)
            .or_insert_with(|| SlidingWindowDetector::new(RECORD_REPLAY_WINDOW))
    }

    pub fn client_random(&self) -> [u8; 32] {
        match self.role {
            Role::Client => self.local_random.0,
            Role::Server => self.remote_random.0,
        }
    }

    pub fn server_random(&self) -> [u8; 32] {
        match self.role {
            Role::Client => self.remote_random.0,
            Role::Server => self.local_random.0,
        }
    }
}
