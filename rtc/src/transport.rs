use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use log::{debug, trace, warn};
use tokio::sync::mpsc;

use data::message::{payload_for, ppid_for};
use data::{ChannelConfig, DcepMessage};
use dtls::crypto::CryptoCertificate;
use dtls::{DtlsEndpoint, DtlsEvent, HandshakeConfig, Role};
use ice::{Agent, AgentConfig, IceConnectionState, IceEvent, InboundDatagram, Url};
use sctp::{
    Association, AssociationConfig, AssociationEvent, PayloadProtocolIdentifier,
};
use srtp::context::Context as SrtpContext;
use srtp::protection_profile::ProtectionProfile;

use crate::error::{Error, Result};
use crate::fingerprint::RtcFingerprint;
use crate::mux::{classify, Demux};

const COMMAND_QUEUE: usize = 64;
const EVENT_QUEUE: usize = 256;
const PACKET_QUEUE: usize = 256;

/// Construction-time configuration; one instance per transport, no
/// process-wide switches.
#[derive(Clone)]
pub struct TransportConfig {
    pub ice_urls: Vec<Url>,
    pub is_ice_controlling: bool,
    /// Gather loopback candidates (host-local and in-process setups).
    pub include_loopback: bool,
    /// From SDP setup: active endpoints run the DTLS client.
    pub dtls_role: Role,
    /// The local identity; minted on the spot when absent.
    pub certificate: Option<CryptoCertificate>,
    /// DTLS-SRTP profiles offered in the ClientHello, preference first.
    pub srtp_profiles: Vec<u16>,
}

impl TransportConfig {
    /// The controlling side conventionally runs the DTLS client.
    pub fn new(controlling: bool) -> Self {
        TransportConfig {
            ice_urls: vec![],
            is_ice_controlling: controlling,
            include_loopback: false,
            dtls_role: if controlling { Role::Client } else { Role::Server },
            certificate: None,
            srtp_profiles: vec![
                ProtectionProfile::AeadAes128Gcm.id(),
                ProtectionProfile::Aes128CmHmacSha1_80.id(),
            ],
        }
    }
}

/// Everything the signaling layer needs to describe this endpoint.
#[derive(Debug, Clone)]
pub struct LocalParameters {
    pub ice_ufrag: String,
    pub ice_pwd: String,
    pub fingerprint: RtcFingerprint,
}

#[derive(Debug)]
pub enum TransportCommand {
    SetRemoteParameters {
        ice_ufrag: String,
        ice_pwd: String,
        fingerprint: Option<RtcFingerprint>,
    },
    /// An SDP candidate-attribute line; `None` is end-of-candidates.
    AddRemoteCandidate(Option<String>),
    OpenDataChannel {
        stream_id: u16,
        config: ChannelConfig,
    },
    SendData {
        stream_id: u16,
        binary: bool,
        data: Vec<u8>,
    },
    CloseDataChannel {
        stream_id: u16,
    },
    /// A marshaled RTP packet to protect and send.
    SendRtp(Vec<u8>),
    /// A marshaled RTCP compound packet to protect and send.
    SendRtcp(Vec<u8>),
    /// Ask the remote sender for a keyframe with a PLI.
    RequestKeyframe {
        sender_ssrc: u32,
        media_ssrc: u32,
    },
    /// Full ICE restart: fresh credentials and re-gathering.
    RestartIce,
    Close,
}

#[derive(Debug)]
pub enum TransportEvent {
    /// A local candidate line; `None` signals end-of-gathering.
    LocalCandidate(Option<String>),
    IceState(IceConnectionState),
    DtlsConnected,
    SctpEstablished,
    DataChannelOpened {
        stream_id: u16,
        label: String,
        protocol: String,
    },
    DataChannelMessage {
        stream_id: u16,
        binary: bool,
        data: Vec<u8>,
    },
    DataChannelClosed {
        stream_id: u16,
    },
    /// A decrypted inbound RTP packet.
    RtpPacket(Vec<u8>),
    /// A decrypted inbound RTCP compound packet.
    RtcpPacket(Vec<u8>),
    /// The peer asked for a keyframe (PLI, or FIR with a fresh command
    /// sequence number).
    KeyframeRequest {
        ssrc: u32,
    },
    /// New local credentials after an ICE restart; candidates follow as
    /// `LocalCandidate` events.
    IceRestarted {
        ice_ufrag: String,
        ice_pwd: String,
    },
    Error(Error),
    Closed,
}

struct ChannelState {
    config: ChannelConfig,
    open: bool,
    locally_opened: bool,
    dcep_sent: bool,
}

/// Handle to a running transport task. All interaction is message
/// passing: commands in, events out.
pub struct Transport {
    pub local: LocalParameters,
    command_tx: mpsc::Sender<TransportCommand>,
}

impl Transport {
    /// Gathers candidates and spawns the owning task.
    pub async fn spawn(
        config: TransportConfig,
    ) -> Result<(Transport, mpsc::Receiver<TransportEvent>)> {
        let certificate = match config.certificate.clone() {
            Some(c) => c,
            None => CryptoCertificate::generate_self_signed(vec!["tern".to_owned()])?,
        };
        let fingerprint = RtcFingerprint::sha256(&certificate.certificate_der);

        let mut agent = Agent::new(AgentConfig {
            urls: config.ice_urls.clone(),
            is_controlling: config.is_ice_controlling,
            include_loopback: config.include_loopback,
        });
        let (packet_tx, packet_rx) = mpsc::channel::<InboundDatagram>(PACKET_QUEUE);
        let packet_tx_for_restart = packet_tx.clone();
        agent.gather(packet_tx).await?;
        let (ice_ufrag, ice_pwd) = agent.local_credentials();

        let mut handshake_config = HandshakeConfig::new(certificate);
        handshake_config.srtp_protection_profiles = config.srtp_profiles.clone();
        let endpoint = DtlsEndpoint::new(handshake_config, config.dtls_role);

        let association = Association::new(AssociationConfig::default(), Instant::now());

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);

        let inner = Inner {
            agent,
            packet_tx: packet_tx_for_restart,
            packet_rx,
            dtls: endpoint,
            dtls_role: config.dtls_role,
            dtls_started: false,
            dtls_connected: false,
            assoc: association,
            srtp_read: None,
            srtp_write: None,
            remote_fingerprint: None,
            channels: HashMap::new(),
            fir_seq_seen: HashMap::new(),
            sctp_established: false,
            events_tx,
            command_rx,
            closed: false,
        };
        tokio::spawn(inner.run());

        Ok((
            Transport {
                local: LocalParameters {
                    ice_ufrag,
                    ice_pwd,
                    fingerprint,
                },
                command_tx,
            },
            events_rx,
        ))
    }

    pub async fn command(&self, command: TransportCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Error::Closed)
    }
}

/// The owning task: every piece of protocol state lives here and is
/// only touched between awaits of this loop.
struct Inner {
    agent: Agent,
    packet_tx: mpsc::Sender<InboundDatagram>,
    packet_rx: mpsc::Receiver<InboundDatagram>,
    dtls: DtlsEndpoint,
    dtls_role: Role,
    dtls_started: bool,
    dtls_connected: bool,
    assoc: Association,
    srtp_read: Option<SrtpContext>,
    srtp_write: Option<SrtpContext>,
    remote_fingerprint: Option<RtcFingerprint>,
    channels: HashMap<u16, ChannelState>,
    /// Last FIR command sequence accepted per SSRC; stale ones are
    /// ignored.
    fir_seq_seen: HashMap<u32, u8>,
    sctp_established: bool,
    events_tx: mpsc::Sender<TransportEvent>,
    command_rx: mpsc::Receiver<TransportCommand>,
    closed: bool,
}

impl Inner {
    async fn run(mut self) {
        loop {
            self.pump().await;
            if self.closed {
                break;
            }

            let deadline = self.poll_timeout();
            tokio::select! {
                maybe_packet = self.packet_rx.recv() => match maybe_packet {
                    Some((socket_index, src, datagram)) => {
                        self.agent
                            .handle_datagram(socket_index, src, &datagram, Instant::now());
                    }
                    None => break,
                },
                maybe_command = self.command_rx.recv() => match maybe_command {
                    Some(command) => self.on_command(command).await,
                    None => self.close().await,
                },
                _ = sleep_until_opt(deadline) => self.on_timeout(),
            }
        }
        debug!("transport task exiting");
    }

    fn poll_timeout(&self) -> Option<Instant> {
        let mut deadline: Option<Instant> = None;
        for candidate in [
            self.agent.poll_timeout(),
            self.dtls.poll_timeout(),
            self.assoc.poll_timeout(),
        ]
        .into_iter()
        .flatten()
        {
            deadline = Some(deadline.map_or(candidate, |d| d.min(candidate)));
        }
        deadline
    }

    fn on_timeout(&mut self) {
        let now = Instant::now();
        self.agent.handle_timeout(now);
        let _ = self.dtls.handle_timeout(now);
        self.assoc.handle_timeout(now);
    }

    /// Drains every subsystem until quiescent, forwarding between
    /// layers and emitting events upward.
    async fn pump(&mut self) {
        loop {
            let mut progressed = false;

            while let Some(event) = self.agent.poll_event() {
                progressed = true;
                self.on_ice_event(event).await;
            }
            while let Some(datagram) = self.dtls.poll_transmit() {
                progressed = true;
                if let Err(e) = self.agent.send_payload(&datagram) {
                    trace!("dtls datagram dropped: {e}");
                }
            }
            while let Some(event) = self.dtls.poll_event() {
                progressed = true;
                self.on_dtls_event(event).await;
            }
            while let Some(packet) = self.assoc.poll_transmit() {
                progressed = true;
                if let Err(e) = self.dtls.send_application_data(&packet) {
                    trace!("sctp packet dropped: {e}");
                }
            }
            while let Some(event) = self.assoc.poll_event() {
                progressed = true;
                self.on_sctp_event(event).await;
            }

            if !progressed {
                break;
            }
        }
    }

    async fn emit(&mut self, event: TransportEvent) {
        if self.events_tx.send(event).await.is_err() {
            self.closed = true;
        }
    }

    // === ICE =============================================================

    async fn on_ice_event(&mut self, event: IceEvent) {
        match event {
            IceEvent::GatheredCandidate(candidate) => {
                let line = candidate.map(|c| c.marshal());
                self.emit(TransportEvent::LocalCandidate(line)).await;
            }
            IceEvent::StateChange(state) => {
                self.emit(TransportEvent::IceState(state)).await;
                match state {
                    IceConnectionState::Connected | IceConnectionState::Completed => {
                        if !self.dtls_started {
                            self.dtls_started = true;
                            debug!("ice connected, starting DTLS as {:?}", self.dtls_role);
                            if let Err(e) = self.dtls.start_handshake(Instant::now()) {
                                self.emit(TransportEvent::Error(e.into())).await;
                            }
                        }
                    }
                    IceConnectionState::Failed => {
                        self.emit(TransportEvent::Error(Error::IceTimeout)).await;
                        self.close().await;
                    }
                    _ => {}
                }
            }
            IceEvent::SelectedPair { local, remote } => {
                debug!("selected pair {local} -> {remote}");
            }
            IceEvent::PayloadReceived(datagram) => {
                self.on_payload(&datagram).await;
            }
        }
    }

    // === demux ===========================================================

    async fn on_payload(&mut self, datagram: &[u8]) {
        match classify(datagram) {
            Demux::Dtls => {
                let _ = self.dtls.handle_datagram(datagram, Instant::now());
            }
            Demux::Srtp => {
                let plain = match &mut self.srtp_read {
                    Some(context) => context.decrypt_rtp(datagram),
                    None => return,
                };
                match plain {
                    Ok(packet) => self.emit(TransportEvent::RtpPacket(packet.to_vec())).await,
                    Err(e) => {
                        // auth and replay failures are silent: count, log, drop
                        trace!("srtp drop: {e}");
                    }
                }
            }
            Demux::Srtcp => {
                let plain = match &mut self.srtp_read {
                    Some(context) => context.decrypt_rtcp(datagram),
                    None => return,
                };
                match plain {
                    Ok(packet) => self.on_rtcp(packet.to_vec()).await,
                    Err(e) => {
                        trace!("srtcp drop: {e}");
                    }
                }
            }
            Demux::Stun => {
                // STUN never reaches the payload path; the agent consumes it
            }
            Demux::Unknown => {
                trace!("dropping unclassifiable datagram");
            }
        }
    }

    async fn on_rtcp(&mut self, packet: Vec<u8>) {
        let mut buf = &packet[..];
        if let Ok(packets) = rtcp::packet::unmarshal(&mut buf) {
            for p in &packets {
                match p {
                    rtcp::packet::Packet::PictureLossIndication(pli) => {
                        self.emit(TransportEvent::KeyframeRequest {
                            ssrc: pli.media_ssrc,
                        })
                        .await;
                    }
                    rtcp::packet::Packet::FullIntraRequest(fir) => {
                        for entry in &fir.fir {
                            // the FIR command sequence must advance per SSRC
                            let seen = self.fir_seq_seen.get(&entry.ssrc).copied();
                            let fresh = match seen {
                                None => true,
                                Some(last) => entry.sequence_number.wrapping_sub(last) as i8 > 0,
                            };
                            if fresh {
                                self.fir_seq_seen.insert(entry.ssrc, entry.sequence_number);
                                self.emit(TransportEvent::KeyframeRequest { ssrc: entry.ssrc })
                                    .await;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        self.emit(TransportEvent::RtcpPacket(packet)).await;
    }

    // === DTLS ============================================================

    async fn on_dtls_event(&mut self, event: DtlsEvent) {
        match event {
            DtlsEvent::HandshakeComplete => {
                if let Some(expected) = &self.remote_fingerprint {
                    let matches = self
                        .dtls
                        .peer_certificate()
                        .map(|cert| expected.matches(cert))
                        .unwrap_or(false);
                    if !matches {
                        warn!("remote certificate fingerprint mismatch");
                        self.emit(TransportEvent::Error(Error::DtlsFingerprintMismatch))
                            .await;
                        self.close().await;
                        return;
                    }
                }

                match self.dtls.export_srtp_keying_material() {
                    Ok(material) => match self.install_srtp(material) {
                        Ok(()) => {}
                        Err(e) => {
                            self.emit(TransportEvent::Error(e)).await;
                            self.close().await;
                            return;
                        }
                    },
                    Err(e) => {
                        self.emit(TransportEvent::Error(e.into())).await;
                        self.close().await;
                        return;
                    }
                }

                debug!("dtls connected, srtp keys installed");
                self.emit(TransportEvent::DtlsConnected).await;

                // the DTLS client drives the SCTP handshake too
                if self.dtls_role == Role::Client {
                    self.assoc.connect(Instant::now());
                }
            }
            DtlsEvent::ApplicationData(data) => {
                if let Err(e) = self.assoc.handle_packet(&data, Instant::now()) {
                    warn!("sctp packet error: {e}");
                }
            }
            DtlsEvent::Error(e) => {
                self.emit(TransportEvent::Error(e.into())).await;
                self.close().await;
            }
            DtlsEvent::Closed => {
                self.close().await;
            }
        }
    }

    fn install_srtp(&mut self, material: dtls::SrtpKeyingMaterial) -> Result<()> {
        let profile = ProtectionProfile::from_id(material.profile)
            .ok_or_else(|| Error::ProtocolViolation("unknown srtp profile".to_owned()))?;
        self.srtp_write = Some(SrtpContext::new(
            &material.local_key,
            &material.local_salt,
            profile,
        )?);
        self.srtp_read = Some(SrtpContext::new(
            &material.remote_key,
            &material.remote_salt,
            profile,
        )?);
        Ok(())
    }

    // === SCTP / data channels ===========================================

    async fn on_sctp_event(&mut self, event: AssociationEvent) {
        match event {
            AssociationEvent::Connected => {
                debug!("sctp association established");
                self.sctp_established = true;
                self.emit(TransportEvent::SctpEstablished).await;
                let pending: Vec<u16> = self
                    .channels
                    .iter()
                    .filter(|(_, c)| c.locally_opened && !c.dcep_sent)
                    .map(|(id, _)| *id)
                    .collect();
                for stream_id in pending {
                    self.send_dcep_open(stream_id).await;
                }
            }
            AssociationEvent::DataReceived {
                stream_id,
                ppid,
                data,
            } => {
                self.on_sctp_data(stream_id, ppid, data).await;
            }
            AssociationEvent::StreamsReset { stream_ids } => {
                for stream_id in stream_ids {
                    if self.channels.remove(&stream_id).is_some() {
                        self.emit(TransportEvent::DataChannelClosed { stream_id }).await;
                    }
                }
            }
            AssociationEvent::Error(e) => {
                let mapped = match e {
                    sctp::Error::ErrPeerAbort(cause) => Error::SctpAbort(cause),
                    sctp::Error::ErrRetransmitTimeout => Error::SctpCongestionTimeout,
                    other => Error::Sctp(other),
                };
                self.emit(TransportEvent::Error(mapped)).await;
            }
            AssociationEvent::Closed => {
                // all channels go down with the association
                let ids: Vec<u16> = self.channels.keys().copied().collect();
                for stream_id in ids {
                    self.channels.remove(&stream_id);
                    self.emit(TransportEvent::DataChannelClosed { stream_id }).await;
                }
            }
        }
    }

    async fn on_sctp_data(
        &mut self,
        stream_id: u16,
        ppid: PayloadProtocolIdentifier,
        data: Bytes,
    ) {
        match ppid {
            PayloadProtocolIdentifier::Dcep => match DcepMessage::unmarshal(&data) {
                Ok(DcepMessage::Open(config)) => {
                    debug!("data channel open: stream={stream_id} label={}", config.label);
                    self.assoc
                        .set_stream_reliability(stream_id, config.unordered, config.policy);
                    let label = config.label.clone();
                    let protocol = config.protocol.clone();
                    self.channels.insert(
                        stream_id,
                        ChannelState {
                            config,
                            open: true,
                            locally_opened: false,
                            dcep_sent: true,
                        },
                    );
                    let ack = DcepMessage::Ack.marshal();
                    if let Err(e) = self.assoc.send(
                        stream_id,
                        PayloadProtocolIdentifier::Dcep,
                        Bytes::from(ack),
                        Instant::now(),
                    ) {
                        warn!("dcep ack failed: {e}");
                    }
                    self.emit(TransportEvent::DataChannelOpened {
                        stream_id,
                        label,
                        protocol,
                    })
                    .await;
                }
                Ok(DcepMessage::Ack) => {
                    if let Some(channel) = self.channels.get_mut(&stream_id) {
                        if !channel.open {
                            channel.open = true;
                            let label = channel.config.label.clone();
                            let protocol = channel.config.protocol.clone();
                            self.emit(TransportEvent::DataChannelOpened {
                                stream_id,
                                label,
                                protocol,
                            })
                            .await;
                        }
                    }
                }
                Err(e) => warn!("bad DCEP message: {e}"),
            },
            PayloadProtocolIdentifier::String | PayloadProtocolIdentifier::StringEmpty => {
                let payload = if ppid == PayloadProtocolIdentifier::StringEmpty {
                    vec![]
                } else {
                    data.to_vec()
                };
                self.emit(TransportEvent::DataChannelMessage {
                    stream_id,
                    binary: false,
                    data: payload,
                })
                .await;
            }
            PayloadProtocolIdentifier::Binary | PayloadProtocolIdentifier::BinaryEmpty => {
                let payload = if ppid == PayloadProtocolIdentifier::BinaryEmpty {
                    vec![]
                } else {
                    data.to_vec()
                };
                self.emit(TransportEvent::DataChannelMessage {
                    stream_id,
                    binary: true,
                    data: payload,
                })
                .await;
            }
            PayloadProtocolIdentifier::Unknown => {
                trace!("dropping SCTP message with unknown PPID on stream {stream_id}");
            }
        }
    }

    async fn send_dcep_open(&mut self, stream_id: u16) {
        let config = match self.channels.get_mut(&stream_id) {
            Some(channel) => {
                channel.dcep_sent = true;
                channel.config.clone()
            }
            None => return,
        };
        self.assoc
            .set_stream_reliability(stream_id, config.unordered, config.policy);
        let open = DcepMessage::Open(config).marshal();
        if let Err(e) = self.assoc.send(
            stream_id,
            PayloadProtocolIdentifier::Dcep,
            Bytes::from(open),
            Instant::now(),
        ) {
            warn!("dcep open failed: {e}");
        }
    }

    // === commands ========================================================

    async fn on_command(&mut self, command: TransportCommand) {
        let now = Instant::now();
        match command {
            TransportCommand::SetRemoteParameters {
                ice_ufrag,
                ice_pwd,
                fingerprint,
            } => {
                self.agent.set_remote_credentials(ice_ufrag, ice_pwd);
                self.remote_fingerprint = fingerprint;
            }
            TransportCommand::AddRemoteCandidate(line) => match line {
                Some(line) => match ice::unmarshal_candidate(&line) {
                    Ok(candidate) => self.agent.add_remote_candidate(Some(candidate), now),
                    Err(e) => warn!("bad remote candidate: {e}"),
                },
                None => self.agent.add_remote_candidate(None, now),
            },
            TransportCommand::OpenDataChannel { stream_id, config } => {
                self.channels.insert(
                    stream_id,
                    ChannelState {
                        config,
                        open: false,
                        locally_opened: true,
                        dcep_sent: false,
                    },
                );
                if self.sctp_established {
                    self.send_dcep_open(stream_id).await;
                }
            }
            TransportCommand::SendData {
                stream_id,
                binary,
                data,
            } => {
                let ppid = ppid_for(binary, data.len());
                let payload = payload_for(&data);
                if let Err(e) = self.assoc.send(stream_id, ppid, payload, now) {
                    self.emit(TransportEvent::Error(e.into())).await;
                }
            }
            TransportCommand::CloseDataChannel { stream_id } => {
                self.assoc.reset_streams(&[stream_id], now);
                if self.channels.remove(&stream_id).is_some() {
                    self.emit(TransportEvent::DataChannelClosed { stream_id }).await;
                }
            }
            TransportCommand::SendRtp(packet) => {
                if let Some(context) = &mut self.srtp_write {
                    match context.encrypt_rtp(&packet) {
                        Ok(protected) => {
                            if let Err(e) = self.agent.send_payload(&protected) {
                                trace!("rtp send failed: {e}");
                            }
                        }
                        Err(e) => warn!("rtp protect failed: {e}"),
                    }
                }
            }
            TransportCommand::SendRtcp(packet) => {
                self.send_rtcp(&packet).await;
            }
            TransportCommand::RequestKeyframe {
                sender_ssrc,
                media_ssrc,
            } => {
                let compound = rtcp::compound_packet::CompoundPacket(vec![
                    rtcp::packet::Packet::ReceiverReport(rtcp::receiver_report::ReceiverReport {
                        ssrc: sender_ssrc,
                        reports: vec![],
                    }),
                    rtcp::packet::Packet::PictureLossIndication(
                        rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication {
                            sender_ssrc,
                            media_ssrc,
                        },
                    ),
                ]);
                match compound.marshal() {
                    Ok(raw) => self.send_rtcp(&raw).await,
                    Err(e) => warn!("pli build failed: {e}"),
                }
            }
            TransportCommand::RestartIce => {
                self.agent.restart();
                if let Err(e) = self.agent.gather(self.packet_tx.clone()).await {
                    self.emit(TransportEvent::Error(e.into())).await;
                    return;
                }
                let (ice_ufrag, ice_pwd) = self.agent.local_credentials();
                self.emit(TransportEvent::IceRestarted { ice_ufrag, ice_pwd })
                    .await;
            }
            TransportCommand::Close => {
                self.close().await;
            }
        }
    }

    async fn send_rtcp(&mut self, packet: &[u8]) {
        if let Some(context) = &mut self.srtp_write {
            match context.encrypt_rtcp(packet) {
                Ok(protected) => {
                    if let Err(e) = self.agent.send_payload(&protected) {
                        trace!("rtcp send failed: {e}");
                    }
                }
                Err(e) => warn!("rtcp protect failed: {e}"),
            }
        }
    }

    // === teardown ========================================================

    /// Cancels timers, aborts the association (peers observe the ABORT
    /// on their next packet), closes DTLS and the sockets.
    async fn close(&mut self) {
        if self.closed {
            return;
        }
        let now = Instant::now();
        self.assoc.abort(now);
        // flush the ABORT through DTLS while it is still usable
        while let Some(packet) = self.assoc.poll_transmit() {
            let _ = self.dtls.send_application_data(&packet);
        }
        self.dtls.close();
        while let Some(datagram) = self.dtls.poll_transmit() {
            let _ = self.agent.send_payload(&datagram);
        }
        self.agent.close();
        self.closed = true;
        let _ = self.events_tx.send(TransportEvent::Closed).await;
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
