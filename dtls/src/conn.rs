#[cfg(test)]
#[path = "conn_test.rs"]
mod conn_test;

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use hmac::{Hmac, Mac};
use log::{debug, trace, warn};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::alert::{Alert, AlertDescription, AlertLevel};
use crate::cipher_suite::{CipherSuiteAes128GcmSha256, TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256};
use crate::config::{HandshakeConfig, Role};
use crate::crypto::{
    extract_public_key, value_key_message, NamedCurve, NamedCurveKeypair, verify_signature,
};
use crate::error::{Error, Result};
use crate::extension::{Extension, SIGNATURE_SCHEME_ECDSA_SHA256};
use crate::flight::Flight;
use crate::fragment_buffer::FragmentBuffer;
use crate::handshake::handshake_header::{HandshakeHeader, HANDSHAKE_HEADER_LENGTH};
use crate::handshake::handshake_message_certificate::HandshakeMessageCertificate;
use crate::handshake::handshake_message_certificate_request::{
    HandshakeMessageCertificateRequest, CLIENT_CERTIFICATE_TYPE_ECDSA_SIGN,
};
use crate::handshake::handshake_message_certificate_verify::HandshakeMessageCertificateVerify;
use crate::handshake::handshake_message_client_hello::HandshakeMessageClientHello;
use crate::handshake::handshake_message_client_key_exchange::HandshakeMessageClientKeyExchange;
use crate::handshake::handshake_message_finished::HandshakeMessageFinished;
use crate::handshake::handshake_message_hello_verify_request::HandshakeMessageHelloVerifyRequest;
use crate::handshake::handshake_message_server_hello::HandshakeMessageServerHello;
use crate::handshake::handshake_message_server_hello_done::HandshakeMessageServerHelloDone;
use crate::handshake::handshake_message_server_key_exchange::HandshakeMessageServerKeyExchange;
use crate::handshake::{HandshakeMessage, HandshakeType};
use crate::prf::{
    prf_export_keying_material, prf_extended_master_secret, prf_master_secret,
    prf_verify_data_client, prf_verify_data_server, session_hash,
};
use crate::record_layer::record_layer_header::{
    ContentType, RecordLayerHeader, RECORD_LAYER_HEADER_SIZE,
};
use crate::record_layer::{unpack_datagram, RecordLayer};
use crate::state::State;

type HmacSha256 = Hmac<Sha256>;

const HASH_ALGORITHM_SHA256: u8 = 4;
const SIGNATURE_ALGORITHM_ECDSA: u8 = 3;
/// IP (20) + UDP (8) overhead subtracted from the MTU per datagram.
const IP_UDP_OVERHEAD: usize = 28;

/// Notifications the owning transport drains after feeding input.
#[derive(Debug, PartialEq)]
pub enum DtlsEvent {
    /// Both Finished messages have been exchanged on this side.
    HandshakeComplete,
    /// A decrypted application-data record.
    ApplicationData(Vec<u8>),
    /// The connection failed or was closed by the peer.
    Error(Error),
    Closed,
}

/// The four DTLS-SRTP secrets split out of the RFC 5764 exporter output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtpKeyingMaterial {
    pub profile: u16,
    pub local_key: Vec<u8>,
    pub local_salt: Vec<u8>,
    pub remote_key: Vec<u8>,
    pub remote_salt: Vec<u8>,
}

fn srtp_profile_key_salt_len(profile: u16) -> Result<(usize, usize)> {
    Ok(match profile {
        0x0001 | 0x0002 => (16, 14),
        0x0007 => (16, 12),
        0x0008 => (32, 12),
        other => return Err(Error::Other(format!("unknown SRTP profile {other:#06x}"))),
    })
}

/// One handshake message (or ChangeCipherSpec) queued in the current
/// outgoing flight. Flights are re-encoded on every (re)transmission so
/// record sequence numbers stay fresh.
#[derive(Clone)]
enum FlightItem {
    Handshake {
        typ: HandshakeType,
        message_seq: u16,
        body: Vec<u8>,
        epoch: u16,
    },
    ChangeCipherSpec,
}

struct RetransmitTimer {
    deadline: Option<Instant>,
    interval: Duration,
    transmits: u8,
}

impl RetransmitTimer {
    fn idle() -> Self {
        RetransmitTimer {
            deadline: None,
            interval: Duration::from_secs(1),
            transmits: 0,
        }
    }
}

/// A synchronous DTLS 1.2 endpoint. The owning task feeds datagrams and
/// timeouts in, then drains outgoing datagrams and events.
pub struct DtlsEndpoint {
    config: HandshakeConfig,
    state: State,
    flight: Flight,
    flight_items: Vec<FlightItem>,
    fragment_buffer: FragmentBuffer,
    /// Completed handshake messages waiting for in-order dispatch.
    pending_messages: BTreeMap<u16, (HandshakeType, Vec<u8>)>,
    handshake_recv_next: u16,
    out_datagrams: VecDeque<Vec<u8>>,
    events: VecDeque<DtlsEvent>,
    timer: RetransmitTimer,
    cookie_secret: [u8; 32],
    client_cert_requested: bool,
    closed: bool,
}

impl DtlsEndpoint {
    pub fn new(config: HandshakeConfig, role: Role) -> Self {
        let mut cookie_secret = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut cookie_secret);
        let flight = match role {
            Role::Client => Flight::Flight1,
            Role::Server => Flight::Flight0,
        };
        DtlsEndpoint {
            config,
            state: State::new(role),
            flight,
            flight_items: vec![],
            fragment_buffer: FragmentBuffer::new(),
            pending_messages: BTreeMap::new(),
            handshake_recv_next: 0,
            out_datagrams: VecDeque::new(),
            events: VecDeque::new(),
            timer: RetransmitTimer::idle(),
            cookie_secret,
            client_cert_requested: false,
            closed: false,
        }
    }

    pub fn role(&self) -> Role {
        self.state.role
    }

    pub fn is_handshake_complete(&self) -> bool {
        matches!(self.flight, Flight::Established | Flight::Flight6)
    }

    pub fn peer_certificate(&self) -> Option<&[u8]> {
        self.state.peer_certificate.as_deref()
    }

    pub fn selected_srtp_profile(&self) -> Option<u16> {
        self.state.srtp_profile
    }

    /// Client: queue flight 1. Server: nothing to do until a
    /// ClientHello arrives.
    pub fn start_handshake(&mut self, now: Instant) -> Result<()> {
        if self.state.role == Role::Client {
            let hello = self.build_client_hello(vec![]);
            let item = self.queue_handshake(HandshakeMessage::ClientHello(hello), false, 0);
            self.set_flight(Flight::Flight1, vec![item]);
            self.transmit_flight()?;
            self.arm_timer(now);
        }
        Ok(())
    }

    // === input ===========================================================

    pub fn handle_datagram(&mut self, datagram: &[u8], now: Instant) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let records = match unpack_datagram(datagram) {
            Ok(records) => records,
            Err(e) => {
                warn!("dropping undecodable DTLS datagram: {e}");
                return Ok(());
            }
        };
        let flight_before = self.flight;
        let mut saw_duplicate = false;
        for record in records {
            match self.handle_record(record, &mut saw_duplicate) {
                Ok(()) => {}
                Err(e) => {
                    self.fail(e.clone());
                    return Err(e);
                }
            }
        }
        self.dispatch_pending()?;
        // records parked while keys were pending become readable once
        // dispatch has run the key schedule
        if self.state.cipher.is_some() && !self.state.buffered_next_epoch.is_empty() {
            let buffered = std::mem::take(&mut self.state.buffered_next_epoch);
            for rec in buffered {
                if rec.header.epoch <= self.state.remote_epoch {
                    match self.handle_record(rec, &mut saw_duplicate) {
                        Ok(()) => {}
                        Err(e) => {
                            self.fail(e.clone());
                            return Err(e);
                        }
                    }
                } else {
                    self.state.buffered_next_epoch.push(rec);
                }
            }
            self.dispatch_pending()?;
        }
        if saw_duplicate && !self.flight_items.is_empty() {
            // the peer retransmitted; our last flight was probably lost
            debug!("{}: peer retransmission, resending {}", role_str(self.state.role), self.flight);
            self.transmit_flight()?;
        }
        if self.flight != flight_before {
            // entering a new flight restarts the retransmission timer
            self.timer.deadline =
                if self.flight.has_retransmit() && !self.flight_items.is_empty() {
                    Some(now + self.timer.interval)
                } else {
                    None
                };
        }
        Ok(())
    }

    fn handle_record(&mut self, record: RecordLayer, saw_duplicate: &mut bool) -> Result<()> {
        let header = record.header;

        if header.epoch > self.state.remote_epoch {
            if header.epoch == self.state.remote_epoch + 1 {
                trace!("buffering record for future epoch {}", header.epoch);
                self.state.buffered_next_epoch.push(record);
            }
            return Ok(());
        }
        if header.epoch < self.state.remote_epoch
            && header.content_type != ContentType::Alert
        {
            return Ok(());
        }

        if !self.state.replay_window(header.epoch).check(header.sequence_number) {
            trace!("replayed record epoch={} seq={}", header.epoch, header.sequence_number);
            return Ok(());
        }

        // epoch > 0 records are AEAD protected
        let payload = if header.epoch > 0 {
            let cipher = match self.state.cipher.as_ref() {
                Some(cipher) => cipher,
                None => {
                    // our key derivation has not caught up yet (the
                    // record was bundled with the message that drives
                    // it); park it until dispatch installs the cipher
                    self.state.buffered_next_epoch.push(record);
                    return Ok(());
                }
            };
            match cipher.decrypt(&header, &record.fragment) {
                Ok(p) => p,
                Err(_) => {
                    // authentication failure on the record layer is fatal
                    self.queue_alert(Alert::fatal(AlertDescription::BadRecordMac));
                    return Err(Error::ErrFailedToVerifyRecord);
                }
            }
        } else {
            record.fragment.to_vec()
        };

        self.state.replay_window(header.epoch).accept();

        match header.content_type {
            ContentType::ChangeCipherSpec => {
                if self.state.remote_epoch == 0 {
                    debug!("{}: peer ChangeCipherSpec, read epoch -> 1", role_str(self.state.role));
                    self.state.remote_epoch = 1;
                    let buffered = std::mem::take(&mut self.state.buffered_next_epoch);
                    for rec in buffered {
                        self.handle_record(rec, saw_duplicate)?;
                    }
                }
                Ok(())
            }
            ContentType::Alert => {
                let mut buf = &payload[..];
                if let Ok(alert) = Alert::unmarshal(&mut buf) {
                    debug!("{}: received {alert}", role_str(self.state.role));
                    if alert.alert_description == AlertDescription::CloseNotify {
                        self.closed = true;
                        self.events.push_back(DtlsEvent::Closed);
                    } else if alert.alert_level == AlertLevel::Fatal {
                        self.closed = true;
                        self.events
                            .push_back(DtlsEvent::Error(Error::ErrAlertFatal(
                                alert.alert_description,
                            )));
                    }
                }
                Ok(())
            }
            ContentType::Handshake => self.handle_handshake_fragment(&payload, saw_duplicate),
            ContentType::ApplicationData => {
                if self.is_handshake_complete() {
                    self.events.push_back(DtlsEvent::ApplicationData(payload));
                }
                Ok(())
            }
        }
    }

    /// One handshake record can carry several messages and fragments.
    fn handle_handshake_fragment(&mut self, payload: &[u8], saw_duplicate: &mut bool) -> Result<()> {
        let mut buf = payload;
        while !buf.is_empty() {
            let mut cursor = buf;
            let header = HandshakeHeader::unmarshal(&mut cursor)?;
            let frag_len = header.fragment_length as usize;
            if cursor.len() < frag_len {
                return Err(Error::ErrBufferTooSmall);
            }
            let fragment = &cursor[..frag_len];
            buf = &cursor[frag_len..];

            if header.message_sequence < self.handshake_recv_next {
                *saw_duplicate = true;
                continue;
            }
            if let Some(body) = self.fragment_buffer.push(&header, fragment) {
                self.pending_messages
                    .insert(header.message_sequence, (header.handshake_type, body));
            }
        }
        Ok(())
    }

    /// Dispatches completed messages strictly in message_seq order so
    /// the transcript matches the wire order.
    fn dispatch_pending(&mut self) -> Result<()> {
        while let Some((typ, body)) = self.pending_messages.remove(&self.handshake_recv_next) {
            let seq = self.handshake_recv_next;
            self.handshake_recv_next += 1;
            match self.handle_handshake_message(typ, seq, &body) {
                Ok(()) => {}
                Err(e) => {
                    self.fail(e.clone());
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn handle_handshake_message(
        &mut self,
        typ: HandshakeType,
        message_seq: u16,
        body: &[u8],
    ) -> Result<()> {
        trace!("{}: rx handshake {typ:?} seq={message_seq}", role_str(self.state.role));
        let message = HandshakeMessage::unmarshal_body(typ, body)?;
        match (self.state.role, message) {
            (Role::Server, HandshakeMessage::ClientHello(hello)) => {
                self.on_client_hello(hello, message_seq, body)
            }
            (Role::Server, HandshakeMessage::Certificate(cert)) => {
                self.state.peer_certificate = cert.certificate.first().cloned();
                self.cache_peer(typ, message_seq, body);
                Ok(())
            }
            (Role::Server, HandshakeMessage::ClientKeyExchange(kx)) => {
                self.cache_peer(typ, message_seq, body);
                self.state.peer_kx_public = kx.public_key;
                self.derive_keys()
            }
            (Role::Server, HandshakeMessage::CertificateVerify(cv)) => {
                let transcript = self.state.handshake_cache.bytes();
                let cert = self
                    .state
                    .peer_certificate
                    .clone()
                    .ok_or(Error::ErrInvalidCertificate)?;
                let public_key = extract_public_key(&cert)?;
                verify_signature(&public_key, &transcript, &cv.signature)?;
                self.cache_peer(typ, message_seq, body);
                Ok(())
            }
            (Role::Server, HandshakeMessage::Finished(finished)) => {
                let expected =
                    prf_verify_data_client(&self.state.master_secret, &self.state.handshake_cache.bytes())?;
                if !bool::from(expected.ct_eq(&finished.verify_data)) {
                    self.queue_alert(Alert::fatal(AlertDescription::DecryptError));
                    return Err(Error::ErrVerifyDataMismatch);
                }
                self.cache_peer(typ, message_seq, body);
                self.send_flight6()
            }

            (Role::Client, HandshakeMessage::HelloVerifyRequest(hvr)) => {
                self.on_hello_verify_request(hvr)
            }
            (Role::Client, HandshakeMessage::ServerHello(hello)) => {
                self.on_server_hello(hello, message_seq, body)
            }
            (Role::Client, HandshakeMessage::Certificate(cert)) => {
                self.state.peer_certificate = cert.certificate.first().cloned();
                self.cache_peer(typ, message_seq, body);
                Ok(())
            }
            (Role::Client, HandshakeMessage::ServerKeyExchange(kx)) => {
                self.on_server_key_exchange(kx, message_seq, body)
            }
            (Role::Client, HandshakeMessage::CertificateRequest(_)) => {
                self.client_cert_requested = true;
                self.cache_peer(typ, message_seq, body);
                Ok(())
            }
            (Role::Client, HandshakeMessage::ServerHelloDone(_)) => {
                self.cache_peer(typ, message_seq, body);
                self.send_flight5()
            }
            (Role::Client, HandshakeMessage::Finished(finished)) => {
                let expected =
                    prf_verify_data_server(&self.state.master_secret, &self.state.handshake_cache.bytes())?;
                if !bool::from(expected.ct_eq(&finished.verify_data)) {
                    self.queue_alert(Alert::fatal(AlertDescription::DecryptError));
                    return Err(Error::ErrVerifyDataMismatch);
                }
                debug!("client: handshake complete");
                self.set_flight(Flight::Established, vec![]);
                self.timer = RetransmitTimer::idle();
                self.events.push_back(DtlsEvent::HandshakeComplete);
                Ok(())
            }

            _ => Err(Error::ErrUnexpectedHandshakeMessage),
        }
    }

    // === server-side transitions ========================================

    fn on_client_hello(
        &mut self,
        hello: HandshakeMessageClientHello,
        message_seq: u16,
        body: &[u8],
    ) -> Result<()> {
        if hello.cookie.is_empty() {
            self.state.remote_random = hello.random;
            let cookie = self.generate_cookie(&hello.random.0);
            debug!("server: stateless HelloVerifyRequest");
            let hvr = HandshakeMessage::HelloVerifyRequest(HandshakeMessageHelloVerifyRequest {
                cookie,
                ..Default::default()
            });
            // neither the cookie-less ClientHello nor HelloVerifyRequest
            // enter the transcript
            let item = self.queue_handshake(hvr, false, 0);
            self.set_flight(Flight::Flight2, vec![item]);
            self.transmit_flight()?;
            return Ok(());
        }

        let expected = self.generate_cookie(&hello.random.0);
        if !bool::from(expected.ct_eq(&hello.cookie)) {
            self.queue_alert(Alert::fatal(AlertDescription::HandshakeFailure));
            return Err(Error::ErrCookieMismatch);
        }

        self.state.remote_random = hello.random;
        if !hello
            .cipher_suites
            .contains(&TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256)
        {
            self.queue_alert(Alert::fatal(AlertDescription::InsufficientSecurity));
            return Err(Error::ErrCipherSuiteNoIntersection);
        }

        // srtp profile: our preference order against the client's offer
        let client_profiles: Vec<u16> = hello
            .extensions
            .iter()
            .find_map(|e| match e {
                Extension::UseSrtp { profiles } => Some(profiles.clone()),
                _ => None,
            })
            .unwrap_or_default();
        self.state.srtp_profile = self
            .config
            .srtp_protection_profiles
            .iter()
            .find(|p| client_profiles.contains(p))
            .copied();
        if !self.config.srtp_protection_profiles.is_empty() && self.state.srtp_profile.is_none() {
            self.queue_alert(Alert::fatal(AlertDescription::InsufficientSecurity));
            return Err(Error::ErrNoSrtpProtectionProfile);
        }

        let client_curves: Vec<NamedCurve> = hello
            .extensions
            .iter()
            .find_map(|e| match e {
                Extension::SupportedEllipticCurves { curves } => Some(curves.clone()),
                _ => None,
            })
            .unwrap_or_else(|| vec![NamedCurve::X25519]);
        self.state.named_curve = if client_curves.contains(&NamedCurve::X25519) {
            NamedCurve::X25519
        } else if client_curves.contains(&NamedCurve::P256) {
            NamedCurve::P256
        } else {
            self.queue_alert(Alert::fatal(AlertDescription::HandshakeFailure));
            return Err(Error::ErrNoSupportedEllipticCurves);
        };

        let client_offered_ems = hello
            .extensions
            .iter()
            .any(|e| matches!(e, Extension::ExtendedMasterSecret));
        self.state.extended_master_secret = client_offered_ems && self.config.extended_master_secret;

        self.cache_peer(HandshakeType::ClientHello, message_seq, body);

        // flight 4
        let mut extensions = vec![Extension::RenegotiationInfo];
        if let Some(profile) = self.state.srtp_profile {
            extensions.push(Extension::UseSrtp {
                profiles: vec![profile],
            });
        }
        if self.state.extended_master_secret {
            extensions.push(Extension::ExtendedMasterSecret);
        }
        let server_hello = HandshakeMessage::ServerHello(HandshakeMessageServerHello {
            random: self.state.local_random,
            cipher_suite: TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
            extensions,
            ..Default::default()
        });

        let certificate = HandshakeMessage::Certificate(HandshakeMessageCertificate {
            certificate: vec![self.config.certificate.certificate_der.clone()],
        });

        let keypair = NamedCurveKeypair::generate(self.state.named_curve);
        let params = HandshakeMessageServerKeyExchange {
            named_curve: self.state.named_curve,
            public_key: keypair.public_key().to_vec(),
            hash_algorithm: HASH_ALGORITHM_SHA256,
            signature_algorithm: SIGNATURE_ALGORITHM_ECDSA,
            signature: vec![],
        };
        let signed = value_key_message(
            &self.state.client_random(),
            &self.state.server_random(),
            &params.params_bytes(),
        );
        let signature = self.config.certificate.sign_sha256(&signed);
        self.state.local_keypair = Some(keypair);
        let server_key_exchange =
            HandshakeMessage::ServerKeyExchange(HandshakeMessageServerKeyExchange {
                signature,
                ..params
            });

        let mut items = vec![
            self.queue_handshake(server_hello, true, 0),
            self.queue_handshake(certificate, true, 0),
            self.queue_handshake(server_key_exchange, true, 0),
        ];
        if self.config.client_auth {
            let request =
                HandshakeMessage::CertificateRequest(HandshakeMessageCertificateRequest {
                    certificate_types: vec![CLIENT_CERTIFICATE_TYPE_ECDSA_SIGN],
                    signature_hash_algorithms: vec![SIGNATURE_SCHEME_ECDSA_SHA256],
                });
            items.push(self.queue_handshake(request, true, 0));
        }
        items.push(self.queue_handshake(
            HandshakeMessage::ServerHelloDone(HandshakeMessageServerHelloDone {}),
            true,
            0,
        ));

        debug!("server: sending flight 4");
        self.set_flight(Flight::Flight4, items);
        self.transmit_flight()
    }

    fn send_flight6(&mut self) -> Result<()> {
        let verify_data =
            prf_verify_data_server(&self.state.master_secret, &self.state.handshake_cache.bytes())?;
        let finished = HandshakeMessage::Finished(HandshakeMessageFinished { verify_data });

        self.state.local_epoch = 1;
        let items = vec![
            FlightItem::ChangeCipherSpec,
            self.queue_handshake(finished, true, 1),
        ];
        debug!("server: handshake complete, sending flight 6");
        self.set_flight(Flight::Flight6, items);
        self.transmit_flight()?;
        // the final flight is only re-sent in response to the peer's
        // retransmissions, never on a timer
        self.timer = RetransmitTimer::idle();
        self.events.push_back(DtlsEvent::HandshakeComplete);
        Ok(())
    }

    // === client-side transitions ========================================

    fn build_client_hello(&mut self, cookie: Vec<u8>) -> HandshakeMessageClientHello {
        let mut extensions = vec![
            Extension::SupportedEllipticCurves {
                curves: vec![NamedCurve::X25519, NamedCurve::P256],
            },
            Extension::SupportedPointFormats { formats: vec![0] },
            Extension::SupportedSignatureAlgorithms {
                algorithms: vec![SIGNATURE_SCHEME_ECDSA_SHA256],
            },
            Extension::RenegotiationInfo,
        ];
        if !self.config.srtp_protection_profiles.is_empty() {
            extensions.push(Extension::UseSrtp {
                profiles: self.config.srtp_protection_profiles.clone(),
            });
        }
        if self.config.extended_master_secret {
            extensions.push(Extension::ExtendedMasterSecret);
        }
        HandshakeMessageClientHello {
            random: self.state.local_random,
            cookie,
            cipher_suites: vec![TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256],
            extensions,
            ..Default::default()
        }
    }

    fn on_hello_verify_request(&mut self, hvr: HandshakeMessageHelloVerifyRequest) -> Result<()> {
        self.state.cookie = hvr.cookie.clone();
        // the second ClientHello reuses the first one's random
        let hello = self.build_client_hello(hvr.cookie);
        debug!("client: got cookie, sending flight 3");
        let item = self.queue_handshake(HandshakeMessage::ClientHello(hello), true, 0);
        self.set_flight(Flight::Flight3, vec![item]);
        self.transmit_flight()
    }

    fn on_server_hello(
        &mut self,
        hello: HandshakeMessageServerHello,
        message_seq: u16,
        body: &[u8],
    ) -> Result<()> {
        if hello.cipher_suite != TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 {
            self.queue_alert(Alert::fatal(AlertDescription::InsufficientSecurity));
            return Err(Error::ErrCipherSuiteNoIntersection);
        }
        self.state.remote_random = hello.random;

        for ext in &hello.extensions {
            match ext {
                Extension::UseSrtp { profiles } => {
                    let chosen = profiles.first().copied();
                    if let Some(p) = chosen {
                        if !self.config.srtp_protection_profiles.contains(&p) {
                            self.queue_alert(Alert::fatal(AlertDescription::IllegalParameter));
                            return Err(Error::ErrNoSrtpProtectionProfile);
                        }
                    }
                    self.state.srtp_profile = chosen;
                }
                Extension::ExtendedMasterSecret => {
                    self.state.extended_master_secret = self.config.extended_master_secret;
                }
                _ => {}
            }
        }
        self.cache_peer(HandshakeType::ServerHello, message_seq, body);
        Ok(())
    }

    fn on_server_key_exchange(
        &mut self,
        kx: HandshakeMessageServerKeyExchange,
        message_seq: u16,
        body: &[u8],
    ) -> Result<()> {
        let cert = self
            .state
            .peer_certificate
            .clone()
            .ok_or(Error::ErrInvalidCertificate)?;
        let public_key = extract_public_key(&cert)?;
        let signed = value_key_message(
            &self.state.client_random(),
            &self.state.server_random(),
            &kx.params_bytes(),
        );
        verify_signature(&public_key, &signed, &kx.signature)?;

        self.state.named_curve = kx.named_curve;
        self.state.peer_kx_public = kx.public_key;
        self.cache_peer(HandshakeType::ServerKeyExchange, message_seq, body);
        Ok(())
    }

    fn send_flight5(&mut self) -> Result<()> {
        let mut items = vec![];

        if self.client_cert_requested {
            let certificate = HandshakeMessage::Certificate(HandshakeMessageCertificate {
                certificate: vec![self.config.certificate.certificate_der.clone()],
            });
            items.push(self.queue_handshake(certificate, true, 0));
        }

        let keypair = NamedCurveKeypair::generate(self.state.named_curve);
        let kx = HandshakeMessage::ClientKeyExchange(HandshakeMessageClientKeyExchange {
            public_key: keypair.public_key().to_vec(),
        });
        self.state.local_keypair = Some(keypair);
        items.push(self.queue_handshake(kx, true, 0));

        // master secret derivation must wait until ClientKeyExchange is
        // part of the transcript (the EMS session hash covers it)
        self.derive_keys()?;

        if self.client_cert_requested {
            let transcript = self.state.handshake_cache.bytes();
            let signature = self.config.certificate.sign_sha256(&transcript);
            let verify = HandshakeMessage::CertificateVerify(HandshakeMessageCertificateVerify {
                hash_algorithm: HASH_ALGORITHM_SHA256,
                signature_algorithm: SIGNATURE_ALGORITHM_ECDSA,
                signature,
            });
            items.push(self.queue_handshake(verify, true, 0));
        }

        items.push(FlightItem::ChangeCipherSpec);
        self.state.local_epoch = 1;

        let verify_data =
            prf_verify_data_client(&self.state.master_secret, &self.state.handshake_cache.bytes())?;
        let finished = HandshakeMessage::Finished(HandshakeMessageFinished { verify_data });
        items.push(self.queue_handshake(finished, true, 1));

        debug!("client: sending flight 5");
        self.set_flight(Flight::Flight5, items);
        self.transmit_flight()
    }

    // === key schedule ====================================================

    fn derive_keys(&mut self) -> Result<()> {
        let keypair = self
            .state
            .local_keypair
            .as_ref()
            .ok_or(Error::ErrInvalidNamedCurve)?;
        self.state.pre_master_secret = keypair.pre_master_secret(&self.state.peer_kx_public)?;

        self.state.master_secret = if self.state.extended_master_secret {
            let hash = session_hash(
                &self
                    .state
                    .handshake_cache
                    .bytes_through_client_key_exchange(),
            );
            prf_extended_master_secret(&self.state.pre_master_secret, &hash)?
        } else {
            prf_master_secret(
                &self.state.pre_master_secret,
                &self.state.client_random(),
                &self.state.server_random(),
            )?
        };

        self.state.cipher = Some(CipherSuiteAes128GcmSha256::new(
            &self.state.master_secret,
            &self.state.client_random(),
            &self.state.server_random(),
            self.state.role == Role::Client,
        )?);
        Ok(())
    }

    /// RFC 5764 section 4.2: client_write_key | server_write_key |
    /// client_write_salt | server_write_salt, local/remote assigned by
    /// handshake role.
    pub fn export_srtp_keying_material(&self) -> Result<SrtpKeyingMaterial> {
        if self.state.master_secret.is_empty() || !self.is_handshake_complete() {
            return Err(Error::ErrExporterBeforeFinished);
        }
        let profile = self
            .state
            .srtp_profile
            .ok_or(Error::ErrNoSrtpProtectionProfile)?;
        let (key_len, salt_len) = srtp_profile_key_salt_len(profile)?;

        let material = prf_export_keying_material(
            &self.state.master_secret,
            &self.state.client_random(),
            &self.state.server_random(),
            2 * (key_len + salt_len),
        )?;

        let mut off = 0;
        let mut take = |n: usize| {
            let out = material[off..off + n].to_vec();
            off += n;
            out
        };
        let client_key = take(key_len);
        let server_key = take(key_len);
        let client_salt = take(salt_len);
        let server_salt = take(salt_len);

        let (local_key, local_salt, remote_key, remote_salt) = match self.state.role {
            Role::Client => (client_key, client_salt, server_key, server_salt),
            Role::Server => (server_key, server_salt, client_key, client_salt),
        };
        Ok(SrtpKeyingMaterial {
            profile,
            local_key,
            local_salt,
            remote_key,
            remote_salt,
        })
    }

    // === output ==========================================================

    pub fn send_application_data(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnClosed);
        }
        if !self.is_handshake_complete() {
            return Err(Error::ErrHandshakeInProgress);
        }
        let record = self.protect_record(ContentType::ApplicationData, 1, data)?;
        self.out_datagrams.push_back(record);
        Ok(())
    }

    pub fn poll_transmit(&mut self) -> Option<Vec<u8>> {
        self.out_datagrams.pop_front()
    }

    pub fn poll_event(&mut self) -> Option<DtlsEvent> {
        self.events.pop_front()
    }

    pub fn poll_timeout(&self) -> Option<Instant> {
        self.timer.deadline
    }

    pub fn handle_timeout(&mut self, now: Instant) -> Result<()> {
        match self.timer.deadline {
            Some(d) if now >= d => {}
            _ => return Ok(()),
        }
        if self.timer.transmits >= self.config.max_flight_transmits {
            let err = Error::ErrHandshakeTimeout(self.timer.transmits);
            self.fail(err.clone());
            return Err(err);
        }
        debug!(
            "{}: retransmit {} (transmit #{})",
            role_str(self.state.role),
            self.flight,
            self.timer.transmits + 1
        );
        self.transmit_flight()?;
        self.timer.interval =
            (self.timer.interval * 2).min(self.config.max_retransmit_interval);
        self.timer.deadline = Some(now + self.timer.interval);
        Ok(())
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.queue_alert(Alert {
                alert_level: AlertLevel::Warning,
                alert_description: AlertDescription::CloseNotify,
            });
            self.closed = true;
            self.events.push_back(DtlsEvent::Closed);
        }
    }

    // === internals =======================================================

    fn fail(&mut self, err: Error) {
        if !self.closed {
            self.closed = true;
            self.events.push_back(DtlsEvent::Error(err));
        }
    }

    fn generate_cookie(&self, client_random: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.cookie_secret)
            .expect("hmac accepts any key length");
        mac.update(client_random);
        mac.finalize().into_bytes()[..20].to_vec()
    }

    fn set_flight(&mut self, flight: Flight, items: Vec<FlightItem>) {
        self.flight = flight;
        self.flight_items = items;
        self.timer.transmits = 0;
        self.timer.interval = self.config.initial_retransmit_interval;
    }

    fn arm_timer(&mut self, now: Instant) {
        if self.flight.has_retransmit() && !self.flight_items.is_empty() {
            if self.timer.deadline.is_none() {
                self.timer.deadline = Some(now + self.timer.interval);
            }
        } else {
            self.timer.deadline = None;
        }
    }

    /// Marshals a handshake message, assigns its message_seq, and (for
    /// transcript-relevant messages) caches the unfragmented form.
    fn queue_handshake(
        &mut self,
        message: HandshakeMessage,
        cache: bool,
        epoch: u16,
    ) -> FlightItem {
        let message_seq = self.state.next_handshake_seq();
        let typ = message.handshake_type();
        let body = message.marshal_body();
        if cache {
            self.state
                .handshake_cache
                .push(typ, message.marshal_message(message_seq));
        }
        FlightItem::Handshake {
            typ,
            message_seq,
            body,
            epoch,
        }
    }

    /// Caches a peer message in its unfragmented on-the-wire form.
    fn cache_peer(&mut self, typ: HandshakeType, message_seq: u16, body: &[u8]) {
        let header = HandshakeHeader {
            handshake_type: typ,
            length: body.len() as u32,
            message_sequence: message_seq,
            fragment_offset: 0,
            fragment_length: body.len() as u32,
        };
        let mut message = Vec::with_capacity(HANDSHAKE_HEADER_LENGTH + body.len());
        header.marshal(&mut message);
        message.extend_from_slice(body);
        self.state.handshake_cache.push(typ, message);
    }

    fn queue_alert(&mut self, alert: Alert) {
        let epoch = self.state.local_epoch;
        if let Ok(record) = self.protect_record(ContentType::Alert, epoch, &alert.marshal()) {
            self.out_datagrams.push_back(record);
        }
    }

    /// Wraps a payload into a single record, encrypting when the epoch
    /// requires it, and returns the datagram bytes.
    fn protect_record(
        &mut self,
        content_type: ContentType,
        epoch: u16,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        let sequence_number = self.state.next_write_seq(epoch);
        let header = RecordLayerHeader::new(content_type, epoch, sequence_number);
        let fragment = if epoch > 0 {
            let cipher = self.state.cipher.as_ref().ok_or(Error::ErrCipherSuiteUnset)?;
            cipher.encrypt(&header, payload)?
        } else {
            payload.to_vec()
        };
        let mut out = Vec::with_capacity(RECORD_LAYER_HEADER_SIZE + fragment.len());
        header.marshal_to(&mut out, fragment.len() as u16);
        out.extend_from_slice(&fragment);
        Ok(out)
    }

    /// (Re)transmits the current flight: fragment each message to the
    /// MTU, wrap into records with fresh sequence numbers, and pack
    /// records into datagrams.
    fn transmit_flight(&mut self) -> Result<()> {
        let max_fragment = self
            .config
            .mtu
            .saturating_sub(IP_UDP_OVERHEAD + RECORD_LAYER_HEADER_SIZE + HANDSHAKE_HEADER_LENGTH);
        let max_datagram = self.config.mtu.saturating_sub(IP_UDP_OVERHEAD);

        let items = self.flight_items.clone();
        let mut datagram: Vec<u8> = vec![];
        for item in items {
            let records = match item {
                FlightItem::ChangeCipherSpec => {
                    vec![self.protect_record(ContentType::ChangeCipherSpec, 0, &[1])?]
                }
                FlightItem::Handshake {
                    typ,
                    message_seq,
                    body,
                    epoch,
                } => {
                    let mut records = vec![];
                    let total = body.len();
                    let mut offset = 0;
                    loop {
                        let frag_len = (total - offset).min(max_fragment.max(1));
                        let header = HandshakeHeader {
                            handshake_type: typ,
                            length: total as u32,
                            message_sequence: message_seq,
                            fragment_offset: offset as u32,
                            fragment_length: frag_len as u32,
                        };
                        let mut payload =
                            Vec::with_capacity(HANDSHAKE_HEADER_LENGTH + frag_len);
                        header.marshal(&mut payload);
                        payload.extend_from_slice(&body[offset..offset + frag_len]);
                        records.push(self.protect_record(
                            ContentType::Handshake,
                            epoch,
                            &payload,
                        )?);
                        offset += frag_len;
                        if offset >= total {
                            break;
                        }
                    }
                    records
                }
            };
            for record in records {
                if !datagram.is_empty() && datagram.len() + record.len() > max_datagram {
                    self.out_datagrams.push_back(std::mem::take(&mut datagram));
                }
                datagram.extend_from_slice(&record);
            }
        }
        if !datagram.is_empty() {
            self.out_datagrams.push_back(datagram);
        }
        self.timer.transmits = self.timer.transmits.saturating_add(1);
        Ok(())
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::Client => "client",
        Role::Server => "server",
    }
}
