#[cfg(test)]
#[path = "association_test.rs"]
mod association_test;

mod cookie;

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::{debug, trace, warn};
use rand::Rng;

use crate::chunk::chunk_abort::ChunkAbort;
use crate::chunk::chunk_cookie_ack::ChunkCookieAck;
use crate::chunk::chunk_cookie_echo::ChunkCookieEcho;
use crate::chunk::chunk_forward_tsn::{ChunkForwardTsn, ChunkForwardTsnStream};
use crate::chunk::chunk_heartbeat::{ChunkHeartbeat, ChunkHeartbeatAck};
use crate::chunk::chunk_init::ChunkInit;
use crate::chunk::chunk_payload_data::{ChunkPayloadData, PayloadProtocolIdentifier};
use crate::chunk::chunk_reconfig::ChunkReconfig;
use crate::chunk::chunk_selective_ack::{ChunkSelectiveAck, GapAckBlock};
use crate::chunk::chunk_shutdown::{ChunkShutdown, ChunkShutdownAck, ChunkShutdownComplete};
use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::packet::{Packet, COMMON_HEADER_SIZE};
use crate::param::{Param, RECONFIG_RESULT_SUCCESS_PERFORMED};
use crate::serial::{sna32gt, sna32gte, sna32lt, sna32lte};
use crate::stream::{ReliabilityPolicy, Stream};

use cookie::StateCookie;

/// Both ports are fixed at 5000 when SCTP runs over DTLS (RFC 8831).
const SCTP_OVER_DTLS_PORT: u16 = 5000;
/// DATA chunk overhead: chunk header (4) + payload data header (12).
const DATA_CHUNK_OVERHEAD: usize = 16;

const DEFAULT_MAX_INIT_RETRANSMITS: u8 = 8;
const DEFAULT_MAX_PATH_RETRANSMITS: u8 = 10;
const COOKIE_LIFETIME: Duration = Duration::from_secs(60);
const SACK_DELAY: Duration = Duration::from_millis(200);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const RTO_INITIAL: f64 = 3_000.0;
const RTO_MIN: f64 = 1_000.0;
const RTO_MAX: f64 = 60_000.0;
const RTO_ALPHA: f64 = 1.0 / 8.0;
const RTO_BETA: f64 = 1.0 / 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationState {
    Closed,
    CookieWait,
    CookieEchoed,
    Established,
    ShutdownPending,
    ShutdownSent,
    ShutdownReceived,
    ShutdownAckSent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssociationEvent {
    /// COOKIE-ACK received or COOKIE-ECHO accepted.
    Connected,
    DataReceived {
        stream_id: u16,
        ppid: PayloadProtocolIdentifier,
        data: Bytes,
    },
    /// The peer reset these incoming streams (data channel close).
    StreamsReset {
        stream_ids: Vec<u16>,
    },
    Error(Error),
    Closed,
}

#[derive(Debug, Clone)]
pub struct AssociationConfig {
    /// Advertised receiver window; at least 128 KiB per the handshake
    /// requirements.
    pub max_receive_buffer_size: u32,
    pub max_message_size: u32,
    /// Conservative PMTU under DTLS.
    pub mtu: usize,
    pub num_outbound_streams: u16,
    pub num_inbound_streams: u16,
    pub max_init_retransmits: u8,
    pub max_path_retransmits: u8,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        AssociationConfig {
            max_receive_buffer_size: 1024 * 1024,
            max_message_size: 256 * 1024,
            mtu: 1200,
            num_outbound_streams: 1024,
            num_inbound_streams: 1024,
            max_init_retransmits: DEFAULT_MAX_INIT_RETRANSMITS,
            max_path_retransmits: DEFAULT_MAX_PATH_RETRANSMITS,
        }
    }
}

/// RFC 6298 retransmission timeout state (initial 3 s, floor 1 s,
/// cap 60 s).
struct RtoManager {
    srtt: f64,
    rttvar: f64,
    rto: f64,
    first_measurement: bool,
}

impl RtoManager {
    fn new() -> Self {
        RtoManager {
            srtt: 0.0,
            rttvar: 0.0,
            rto: RTO_INITIAL,
            first_measurement: true,
        }
    }

    fn measure(&mut self, rtt_ms: f64) {
        if self.first_measurement {
            self.srtt = rtt_ms;
            self.rttvar = rtt_ms / 2.0;
            self.first_measurement = false;
        } else {
            self.rttvar = (1.0 - RTO_BETA) * self.rttvar + RTO_BETA * (self.srtt - rtt_ms).abs();
            self.srtt = (1.0 - RTO_ALPHA) * self.srtt + RTO_ALPHA * rtt_ms;
        }
        self.rto = (self.srtt + 4.0 * self.rttvar).clamp(RTO_MIN, RTO_MAX);
    }

    fn backoff(&mut self) {
        self.rto = (self.rto * 2.0).min(RTO_MAX);
    }

    fn rto(&self) -> Duration {
        Duration::from_millis(self.rto as u64)
    }
}

/// A synchronous SCTP association. The owning task feeds packets (from
/// DTLS application data) and timeouts, then drains outgoing packets
/// and events.
pub struct Association {
    config: AssociationConfig,
    state: AssociationState,
    created: Instant,

    my_verification_tag: u32,
    peer_verification_tag: u32,
    my_next_tsn: u32,
    /// Outbound cumulative ack from the peer.
    cum_tsn_ack_point: u32,
    /// PR-SCTP advanced ack point.
    advanced_peer_tsn_ack_point: u32,

    /// Inbound cumulative TSN.
    peer_last_tsn: u32,
    /// Received TSNs above the cumulative point, sorted by serial order.
    received_out_of_order: Vec<u32>,
    duplicates: Vec<u32>,
    peer_forward_tsn_supported: bool,

    streams: HashMap<u16, Stream>,

    pending: VecDeque<ChunkPayloadData>,
    inflight: VecDeque<ChunkPayloadData>,
    in_flight_bytes: usize,

    cwnd: usize,
    ssthresh: usize,
    partial_bytes_acked: usize,
    in_fast_recovery: bool,
    fast_recover_exit_point: u32,
    peer_rwnd: u32,

    rto: RtoManager,
    /// TSN whose transmission time is being measured, with its send time.
    rtt_probe: Option<(u32, Instant)>,

    // timers
    t1_deadline: Option<Instant>,
    t1_retries: u8,
    t2_deadline: Option<Instant>,
    t2_retries: u8,
    t3_deadline: Option<Instant>,
    t3_retries: u8,
    sack_deadline: Option<Instant>,
    heartbeat_deadline: Option<Instant>,
    reconfig_deadline: Option<Instant>,

    data_packets_since_sack: u32,
    sack_immediately: bool,

    my_next_reconfig_seq: u32,
    pending_reset_request: Option<Param>,

    /// Stashed COOKIE-ECHO for T1-cookie retransmission.
    pending_cookie_echo: Option<Vec<u8>>,
    stored_init: Option<ChunkInit>,

    cookie_secret: [u8; 32],

    control_queue: VecDeque<Chunk>,
    out_packets: VecDeque<Vec<u8>>,
    events: VecDeque<AssociationEvent>,
}

impl Association {
    pub fn new(config: AssociationConfig, now: Instant) -> Self {
        let mut rng = rand::thread_rng();
        let my_verification_tag: u32 = rng.gen_range(1..=u32::MAX);
        let my_next_tsn: u32 = rng.gen();
        let mut cookie_secret = [0u8; 32];
        rng.fill(&mut cookie_secret);

        Association {
            config,
            state: AssociationState::Closed,
            created: now,
            my_verification_tag,
            peer_verification_tag: 0,
            my_next_tsn,
            cum_tsn_ack_point: my_next_tsn.wrapping_sub(1),
            advanced_peer_tsn_ack_point: my_next_tsn.wrapping_sub(1),
            peer_last_tsn: 0,
            received_out_of_order: vec![],
            duplicates: vec![],
            peer_forward_tsn_supported: false,
            streams: HashMap::new(),
            pending: VecDeque::new(),
            inflight: VecDeque::new(),
            in_flight_bytes: 0,
            cwnd: 0,
            ssthresh: 0,
            partial_bytes_acked: 0,
            in_fast_recovery: false,
            fast_recover_exit_point: 0,
            peer_rwnd: 0,
            rto: RtoManager::new(),
            rtt_probe: None,
            t1_deadline: None,
            t1_retries: 0,
            t2_deadline: None,
            t2_retries: 0,
            t3_deadline: None,
            t3_retries: 0,
            sack_deadline: None,
            heartbeat_deadline: None,
            reconfig_deadline: None,
            data_packets_since_sack: 0,
            sack_immediately: false,
            my_next_reconfig_seq: rng.gen(),
            pending_reset_request: None,
            pending_cookie_echo: None,
            stored_init: None,
            cookie_secret,
            control_queue: VecDeque::new(),
            out_packets: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    pub fn state(&self) -> AssociationState {
        self.state
    }

    fn mtu_payload(&self) -> usize {
        self.config.mtu - COMMON_HEADER_SIZE - DATA_CHUNK_OVERHEAD
    }

    fn initial_cwnd(&self) -> usize {
        (4 * self.config.mtu).min((2 * self.config.mtu).max(4380))
    }

    // === connection establishment =======================================

    /// Client side: send INIT and wait for the cookie exchange.
    pub fn connect(&mut self, now: Instant) {
        let init = ChunkInit {
            initiate_tag: self.my_verification_tag,
            advertised_receiver_window_credit: self.config.max_receive_buffer_size,
            num_outbound_streams: self.config.num_outbound_streams,
            num_inbound_streams: self.config.num_inbound_streams,
            initial_tsn: self.my_next_tsn,
            params: vec![Param::ForwardTsnSupported],
        };
        self.stored_init = Some(init.clone());
        self.state = AssociationState::CookieWait;
        self.t1_retries = 0;
        self.t1_deadline = Some(now + self.rto.rto());
        debug!("sctp: sending INIT, tag={:#x}", self.my_verification_tag);
        // INIT is addressed with a zero verification tag
        let mut packet = Packet::new(SCTP_OVER_DTLS_PORT, SCTP_OVER_DTLS_PORT, 0);
        packet.chunks.push(Chunk::Init(init));
        self.out_packets.push_back(packet.marshal());
    }

    // === input ==========================================================

    pub fn handle_packet(&mut self, raw: &[u8], now: Instant) -> Result<()> {
        let packet = match Packet::unmarshal(raw) {
            Ok(p) => p,
            Err(e) => {
                warn!("sctp: dropping malformed packet: {e}");
                return Ok(());
            }
        };

        // INIT must come alone and carry a zero tag
        let has_init = packet.chunks.iter().any(|c| matches!(c, Chunk::Init(_)));
        if has_init {
            if packet.chunks.len() != 1 {
                return Err(Error::ErrInitChunkBundled);
            }
            if packet.verification_tag != 0 {
                return Err(Error::ErrInitChunkVerifyTagNotZero);
            }
        } else if packet.verification_tag != self.my_verification_tag
            && !packet
                .chunks
                .iter()
                .any(|c| matches!(c, Chunk::Abort(_) | Chunk::ShutdownComplete(_)))
        {
            trace!("sctp: verification tag mismatch, dropping");
            return Ok(());
        }

        let mut had_data = false;
        for chunk in packet.chunks {
            match chunk {
                Chunk::Init(init) => self.handle_init(init, now)?,
                Chunk::InitAck(init_ack) => self.handle_init_ack(init_ack, now)?,
                Chunk::CookieEcho(echo) => self.handle_cookie_echo(echo, now)?,
                Chunk::CookieAck(_) => self.handle_cookie_ack(now),
                Chunk::PayloadData(data) => {
                    had_data = true;
                    self.handle_data(data);
                }
                Chunk::SelectiveAck(sack) => self.handle_sack(sack, now)?,
                Chunk::Heartbeat(hb) => self.handle_heartbeat(hb),
                Chunk::HeartbeatAck(_) => {}
                Chunk::ForwardTsn(fwd) => self.handle_forward_tsn(fwd),
                Chunk::Reconfig(reconfig) => self.handle_reconfig(reconfig),
                Chunk::Abort(abort) => {
                    let cause = abort.first_cause_code();
                    debug!("sctp: peer ABORT cause={cause}");
                    self.state = AssociationState::Closed;
                    self.events
                        .push_back(AssociationEvent::Error(Error::ErrPeerAbort(cause)));
                    self.events.push_back(AssociationEvent::Closed);
                    self.cancel_all_timers();
                    return Ok(());
                }
                Chunk::Error(err) => {
                    debug!("sctp: peer ERROR cause={}", err.first_cause_code());
                }
                Chunk::Shutdown(shutdown) => self.handle_shutdown(shutdown, now),
                Chunk::ShutdownAck(_) => self.handle_shutdown_ack(now),
                Chunk::ShutdownComplete(_) => {
                    debug!("sctp: shutdown complete");
                    self.state = AssociationState::Closed;
                    self.cancel_all_timers();
                    self.events.push_back(AssociationEvent::Closed);
                }
            }
        }

        if had_data {
            self.data_packets_since_sack += 1;
            self.schedule_sack(now);
        }
        self.flush(now);
        Ok(())
    }

    fn handle_init(&mut self, init: ChunkInit, now: Instant) -> Result<()> {
        debug!("sctp: INIT received, replying with signed cookie");
        // stateless: everything needed to resume lives in the cookie
        let mut rng = rand::thread_rng();
        let my_tag: u32 = rng.gen_range(1..=u32::MAX);
        let my_initial_tsn: u32 = rng.gen();
        let cookie = StateCookie {
            timestamp_ms: now.duration_since(self.created).as_millis() as u64,
            peer_tag: init.initiate_tag,
            my_tag,
            peer_initial_tsn: init.initial_tsn,
            my_initial_tsn,
            peer_rwnd: init.advertised_receiver_window_credit,
            peer_forward_tsn: init.forward_tsn_supported(),
        };

        let init_ack = ChunkInit {
            initiate_tag: my_tag,
            advertised_receiver_window_credit: self.config.max_receive_buffer_size,
            num_outbound_streams: self.config.num_outbound_streams,
            num_inbound_streams: self.config.num_inbound_streams,
            initial_tsn: my_initial_tsn,
            params: vec![
                Param::ForwardTsnSupported,
                Param::StateCookie(cookie.seal(&self.cookie_secret)),
            ],
        };
        let mut packet = Packet::new(SCTP_OVER_DTLS_PORT, SCTP_OVER_DTLS_PORT, init.initiate_tag);
        packet.chunks.push(Chunk::InitAck(init_ack));
        self.out_packets.push_back(packet.marshal());
        Ok(())
    }

    fn handle_init_ack(&mut self, init_ack: ChunkInit, now: Instant) -> Result<()> {
        if self.state != AssociationState::CookieWait {
            return Ok(());
        }
        let cookie = match init_ack.cookie() {
            Some(c) => c.to_vec(),
            None => return Err(Error::ErrUnexpectedChunk),
        };
        self.peer_verification_tag = init_ack.initiate_tag;
        self.peer_rwnd = init_ack.advertised_receiver_window_credit;
        self.peer_last_tsn = init_ack.initial_tsn.wrapping_sub(1);
        self.peer_forward_tsn_supported = init_ack.forward_tsn_supported();
        self.cwnd = self.initial_cwnd();
        self.ssthresh = self.peer_rwnd as usize;

        debug!("sctp: INIT-ACK received, echoing cookie");
        self.pending_cookie_echo = Some(cookie.clone());
        self.state = AssociationState::CookieEchoed;
        self.t1_retries = 0;
        self.t1_deadline = Some(now + self.rto.rto());
        self.queue_control(Chunk::CookieEcho(ChunkCookieEcho { cookie }));
        Ok(())
    }

    fn handle_cookie_echo(&mut self, echo: ChunkCookieEcho, now: Instant) -> Result<()> {
        if self.state == AssociationState::Established {
            // duplicate echo: the COOKIE-ACK was lost
            self.queue_control(Chunk::CookieAck(ChunkCookieAck {}));
            return Ok(());
        }
        let cookie = StateCookie::open(&echo.cookie, &self.cookie_secret)?;
        let age_ms = now
            .duration_since(self.created)
            .as_millis()
            .saturating_sub(cookie.timestamp_ms as u128);
        if age_ms > COOKIE_LIFETIME.as_millis() {
            return Err(Error::ErrCookieExpired);
        }

        self.peer_verification_tag = cookie.peer_tag;
        self.my_verification_tag = cookie.my_tag;
        self.my_next_tsn = cookie.my_initial_tsn;
        self.cum_tsn_ack_point = cookie.my_initial_tsn.wrapping_sub(1);
        self.advanced_peer_tsn_ack_point = self.cum_tsn_ack_point;
        self.peer_last_tsn = cookie.peer_initial_tsn.wrapping_sub(1);
        self.peer_rwnd = cookie.peer_rwnd;
        self.peer_forward_tsn_supported = cookie.peer_forward_tsn;
        self.cwnd = self.initial_cwnd();
        self.ssthresh = self.peer_rwnd as usize;

        debug!("sctp: COOKIE-ECHO accepted, association established");
        self.state = AssociationState::Established;
        self.heartbeat_deadline = Some(now + HEARTBEAT_INTERVAL);
        self.queue_control(Chunk::CookieAck(ChunkCookieAck {}));
        self.events.push_back(AssociationEvent::Connected);
        Ok(())
    }

    fn handle_cookie_ack(&mut self, now: Instant) {
        if self.state != AssociationState::CookieEchoed {
            return;
        }
        debug!("sctp: COOKIE-ACK received, association established");
        self.state = AssociationState::Established;
        self.pending_cookie_echo = None;
        self.t1_deadline = None;
        self.heartbeat_deadline = Some(now + HEARTBEAT_INTERVAL);
        self.events.push_back(AssociationEvent::Connected);
    }

    // === inbound data ====================================================

    fn handle_data(&mut self, chunk: ChunkPayloadData) {
        let tsn = chunk.tsn;
        if chunk.immediate_sack {
            self.sack_immediately = true;
        }

        if sna32lte(tsn, self.peer_last_tsn) || self.received_out_of_order.contains(&tsn) {
            trace!("sctp: duplicate TSN {tsn}");
            self.duplicates.push(tsn);
            self.sack_immediately = true;
            return;
        }

        let stream_id = chunk.stream_identifier;
        let messages = self
            .streams
            .entry(stream_id)
            .or_insert_with(|| Stream::new(stream_id))
            .reassembly
            .push(chunk);
        for message in messages {
            self.events.push_back(AssociationEvent::DataReceived {
                stream_id,
                ppid: message.ppid,
                data: message.data,
            });
        }

        if tsn == self.peer_last_tsn.wrapping_add(1) {
            self.peer_last_tsn = tsn;
            // release any queued TSNs that are now contiguous
            while let Some(pos) = self
                .received_out_of_order
                .iter()
                .position(|&t| t == self.peer_last_tsn.wrapping_add(1))
            {
                self.received_out_of_order.remove(pos);
                self.peer_last_tsn = self.peer_last_tsn.wrapping_add(1);
            }
        } else {
            let pos = self
                .received_out_of_order
                .iter()
                .position(|&t| sna32lt(tsn, t))
                .unwrap_or(self.received_out_of_order.len());
            self.received_out_of_order.insert(pos, tsn);
            // a gap means loss: tell the sender right away
            self.sack_immediately = true;
        }
    }

    fn local_rwnd(&self) -> u32 {
        let buffered: usize = self
            .streams
            .values()
            .map(|s| s.reassembly.buffered_bytes)
            .sum();
        (self.config.max_receive_buffer_size as usize).saturating_sub(buffered) as u32
    }

    fn schedule_sack(&mut self, now: Instant) {
        if self.sack_immediately || self.data_packets_since_sack >= 2 {
            self.send_sack();
        } else if self.sack_deadline.is_none() {
            self.sack_deadline = Some(now + SACK_DELAY);
        }
    }

    fn send_sack(&mut self) {
        let mut gap_ack_blocks = vec![];
        let mut run_start: Option<u32> = None;
        let mut prev: Option<u32> = None;
        for &tsn in &self.received_out_of_order {
            let offset = tsn.wrapping_sub(self.peer_last_tsn);
            match prev {
                Some(p) if offset == p + 1 => {}
                _ => {
                    if let (Some(start), Some(end)) = (run_start, prev) {
                        gap_ack_blocks.push(GapAckBlock {
                            start: start as u16,
                            end: end as u16,
                        });
                    }
                    run_start = Some(offset);
                }
            }
            prev = Some(offset);
        }
        if let (Some(start), Some(end)) = (run_start, prev) {
            gap_ack_blocks.push(GapAckBlock {
                start: start as u16,
                end: end as u16,
            });
        }

        let sack = ChunkSelectiveAck {
            cumulative_tsn_ack: self.peer_last_tsn,
            advertised_receiver_window_credit: self.local_rwnd(),
            gap_ack_blocks,
            duplicate_tsn: std::mem::take(&mut self.duplicates),
        };
        self.sack_immediately = false;
        self.data_packets_since_sack = 0;
        self.sack_deadline = None;
        self.queue_control(Chunk::SelectiveAck(sack));
    }

    // === outbound data ===================================================

    /// Configures a stream's delivery mode before use (from DCEP).
    pub fn set_stream_reliability(
        &mut self,
        stream_id: u16,
        unordered: bool,
        policy: ReliabilityPolicy,
    ) {
        let stream = self
            .streams
            .entry(stream_id)
            .or_insert_with(|| Stream::new(stream_id));
        stream.unordered = unordered;
        stream.policy = policy;
    }

    /// Queues one user message, fragmenting to the PMTU.
    pub fn send(
        &mut self,
        stream_id: u16,
        ppid: PayloadProtocolIdentifier,
        data: Bytes,
        now: Instant,
    ) -> Result<()> {
        match self.state {
            AssociationState::Closed
            | AssociationState::ShutdownSent
            | AssociationState::ShutdownAckSent => return Err(Error::ErrAssociationClosed),
            _ => {}
        }
        if data.len() > self.config.max_message_size as usize {
            return Err(Error::ErrOutboundPacketTooLarge);
        }

        let stream = self
            .streams
            .entry(stream_id)
            .or_insert_with(|| Stream::new(stream_id));
        let unordered = stream.unordered;
        let ssn = stream.next_ssn_out;
        if !unordered {
            stream.next_ssn_out = stream.next_ssn_out.wrapping_add(1);
        }

        let max_fragment = self.mtu_payload();
        let total = data.len().max(1);
        let mut offset = 0;
        let mut first = true;
        while offset < total {
            let frag_len = (data.len() - offset).min(max_fragment);
            let user_data = data.slice(offset..offset + frag_len);
            let tsn = self.my_next_tsn;
            self.my_next_tsn = self.my_next_tsn.wrapping_add(1);

            let mut chunk = ChunkPayloadData::new(tsn, stream_id, ssn, ppid, user_data);
            chunk.unordered = unordered;
            chunk.beginning_fragment = first;
            chunk.ending_fragment = offset + frag_len >= data.len();
            chunk.since = Some(now);
            self.pending.push_back(chunk);

            first = false;
            offset += frag_len.max(1);
        }
        self.flush(now);
        Ok(())
    }

    fn handle_sack(&mut self, sack: ChunkSelectiveAck, now: Instant) -> Result<()> {
        if sna32lt(sack.cumulative_tsn_ack, self.cum_tsn_ack_point) {
            return Ok(());
        }

        let mut bytes_acked = 0usize;
        let cum = sack.cumulative_tsn_ack;
        let cum_advanced = sna32gt(cum, self.cum_tsn_ack_point);

        while let Some(front) = self.inflight.front() {
            if !sna32lte(front.tsn, cum) {
                break;
            }
            let chunk = self.inflight.pop_front().expect("checked front");
            if !chunk.acked {
                bytes_acked += chunk.chunk_size();
                self.in_flight_bytes = self.in_flight_bytes.saturating_sub(chunk.chunk_size());
            }
            if let Some((probe_tsn, sent_at)) = self.rtt_probe {
                if probe_tsn == chunk.tsn {
                    // Karn's rule: only never-retransmitted chunks count
                    if chunk.nsent == 1 {
                        self.rto
                            .measure(now.duration_since(sent_at).as_secs_f64() * 1000.0);
                    }
                    self.rtt_probe = None;
                }
            }
        }
        self.cum_tsn_ack_point = cum;

        // gap ack blocks mark chunks above the cumulative point
        let mut highest_gap_acked: Option<u32> = None;
        for block in &sack.gap_ack_blocks {
            for offset in block.start..=block.end {
                let tsn = cum.wrapping_add(offset as u32);
                for chunk in self.inflight.iter_mut() {
                    if chunk.tsn == tsn && !chunk.acked {
                        chunk.acked = true;
                        bytes_acked += chunk.chunk_size();
                        self.in_flight_bytes =
                            self.in_flight_bytes.saturating_sub(chunk.chunk_size());
                    }
                }
                highest_gap_acked = Some(tsn);
            }
        }

        // fast retransmit: 4 SACKs reporting the same chunk missing
        if let Some(highest) = highest_gap_acked {
            let mut fast_retransmit = false;
            for chunk in self.inflight.iter_mut() {
                if sna32lt(chunk.tsn, highest) && !chunk.acked && !chunk.abandoned {
                    chunk.miss_indicator += 1;
                    if chunk.miss_indicator == 4 {
                        chunk.retransmit = true;
                        fast_retransmit = true;
                    }
                }
            }
            if fast_retransmit && !self.in_fast_recovery {
                self.in_fast_recovery = true;
                self.fast_recover_exit_point = self.my_next_tsn.wrapping_sub(1);
                self.ssthresh = (self.cwnd / 2).max(4 * self.config.mtu);
                self.cwnd = self.ssthresh;
                self.partial_bytes_acked = 0;
                debug!("sctp: fast retransmit, cwnd={}", self.cwnd);
            }
        }

        if self.in_fast_recovery && sna32gte(cum, self.fast_recover_exit_point) {
            self.in_fast_recovery = false;
        }

        // congestion window growth only on cumulative advance
        if cum_advanced && bytes_acked > 0 {
            if self.cwnd <= self.ssthresh {
                // slow start
                self.cwnd += bytes_acked.min(self.config.mtu);
            } else {
                self.partial_bytes_acked += bytes_acked;
                if self.partial_bytes_acked >= self.cwnd {
                    self.partial_bytes_acked -= self.cwnd;
                    self.cwnd += self.config.mtu;
                }
            }
        }

        self.peer_rwnd = sack
            .advertised_receiver_window_credit
            .saturating_sub(self.in_flight_bytes as u32);

        if self.inflight.is_empty() {
            self.t3_deadline = None;
            self.t3_retries = 0;
        } else if cum_advanced {
            self.t3_deadline = Some(now + self.rto.rto());
            self.t3_retries = 0;
        }

        self.advance_peer_ack_point();

        // shutdown progression once the queue drains
        if self.pending.is_empty() && self.inflight.is_empty() {
            match self.state {
                AssociationState::ShutdownPending => self.send_shutdown(now),
                AssociationState::ShutdownReceived => self.send_shutdown_ack(now),
                _ => {}
            }
        }
        Ok(())
    }

    /// PR-SCTP: move the advanced ack point over abandoned chunks and
    /// emit FORWARD-TSN (RFC 3758 section 3.5).
    fn advance_peer_ack_point(&mut self) {
        if !self.peer_forward_tsn_supported {
            return;
        }
        if sna32lt(self.advanced_peer_tsn_ack_point, self.cum_tsn_ack_point) {
            self.advanced_peer_tsn_ack_point = self.cum_tsn_ack_point;
        }

        let mut advanced = false;
        let mut streams: Vec<ChunkForwardTsnStream> = vec![];
        while let Some(front) = self.inflight.front() {
            if front.tsn != self.advanced_peer_tsn_ack_point.wrapping_add(1) || !front.abandoned {
                break;
            }
            let chunk = self.inflight.pop_front().expect("checked front");
            self.advanced_peer_tsn_ack_point = chunk.tsn;
            advanced = true;
            if !chunk.unordered {
                match streams
                    .iter_mut()
                    .find(|s| s.identifier == chunk.stream_identifier)
                {
                    Some(s) => s.sequence = chunk.stream_sequence_number,
                    None => streams.push(ChunkForwardTsnStream {
                        identifier: chunk.stream_identifier,
                        sequence: chunk.stream_sequence_number,
                    }),
                }
            }
        }

        if advanced {
            self.queue_control(Chunk::ForwardTsn(ChunkForwardTsn {
                new_cumulative_tsn: self.advanced_peer_tsn_ack_point,
                streams,
            }));
        }
    }

    fn handle_forward_tsn(&mut self, fwd: ChunkForwardTsn) {
        if sna32lte(fwd.new_cumulative_tsn, self.peer_last_tsn) {
            return;
        }
        // skip everything at or below the new cumulative TSN
        self.peer_last_tsn = fwd.new_cumulative_tsn;
        self.received_out_of_order
            .retain(|&t| sna32gt(t, fwd.new_cumulative_tsn));
        // then pull contiguous queued TSNs forward as usual
        while let Some(pos) = self
            .received_out_of_order
            .iter()
            .position(|&t| t == self.peer_last_tsn.wrapping_add(1))
        {
            self.received_out_of_order.remove(pos);
            self.peer_last_tsn = self.peer_last_tsn.wrapping_add(1);
        }

        for stream_info in &fwd.streams {
            if let Some(stream) = self.streams.get_mut(&stream_info.identifier) {
                let released = stream.reassembly.skip_ordered_to(stream_info.sequence);
                for message in released {
                    self.events.push_back(AssociationEvent::DataReceived {
                        stream_id: stream_info.identifier,
                        ppid: message.ppid,
                        data: message.data,
                    });
                }
            }
        }
        self.sack_immediately = true;
    }

    fn handle_heartbeat(&mut self, hb: ChunkHeartbeat) {
        self.queue_control(Chunk::HeartbeatAck(ChunkHeartbeatAck { info: hb.info }));
    }

    // === stream reset (RFC 6525) ========================================

    /// Gracefully closes outgoing streams (data channel close).
    pub fn reset_streams(&mut self, stream_ids: &[u16], now: Instant) {
        let request = Param::OutgoingSsnResetRequest {
            request_sequence: self.my_next_reconfig_seq,
            response_sequence: 0,
            senders_last_tsn: self.my_next_tsn.wrapping_sub(1),
            stream_identifiers: stream_ids.to_vec(),
        };
        self.my_next_reconfig_seq = self.my_next_reconfig_seq.wrapping_add(1);
        self.pending_reset_request = Some(request.clone());
        self.reconfig_deadline = Some(now + self.rto.rto());
        self.queue_control(Chunk::Reconfig(ChunkReconfig {
            param_a: Some(request),
            param_b: None,
        }));
    }

    /// Raises the number of outgoing streams mid-association.
    pub fn add_outgoing_streams(&mut self, new_streams: u16, now: Instant) {
        let request = Param::AddOutgoingStreamsRequest {
            request_sequence: self.my_next_reconfig_seq,
            new_streams,
        };
        self.my_next_reconfig_seq = self.my_next_reconfig_seq.wrapping_add(1);
        self.reconfig_deadline = Some(now + self.rto.rto());
        self.queue_control(Chunk::Reconfig(ChunkReconfig {
            param_a: Some(request),
            param_b: None,
        }));
    }

    fn handle_reconfig(&mut self, reconfig: ChunkReconfig) {
        for param in [reconfig.param_a, reconfig.param_b].into_iter().flatten() {
            match param {
                Param::OutgoingSsnResetRequest {
                    request_sequence,
                    stream_identifiers,
                    ..
                } => {
                    for id in &stream_identifiers {
                        if let Some(stream) = self.streams.get_mut(id) {
                            stream.reassembly.reset();
                        }
                    }
                    self.queue_control(Chunk::Reconfig(ChunkReconfig {
                        param_a: Some(Param::ReconfigResponse {
                            response_sequence: request_sequence,
                            result: RECONFIG_RESULT_SUCCESS_PERFORMED,
                        }),
                        param_b: None,
                    }));
                    self.events.push_back(AssociationEvent::StreamsReset {
                        stream_ids: stream_identifiers,
                    });
                }
                Param::ReconfigResponse {
                    response_sequence, ..
                } => {
                    let matches = match &self.pending_reset_request {
                        Some(Param::OutgoingSsnResetRequest {
                            request_sequence, ..
                        }) => *request_sequence == response_sequence,
                        _ => false,
                    };
                    if matches {
                        if let Some(Param::OutgoingSsnResetRequest {
                            stream_identifiers, ..
                        }) = self.pending_reset_request.take()
                        {
                            // SSNs restart at zero on a performed reset
                            for id in stream_identifiers {
                                if let Some(stream) = self.streams.get_mut(&id) {
                                    stream.next_ssn_out = 0;
                                }
                            }
                        }
                    }
                    self.reconfig_deadline = None;
                }
                Param::AddOutgoingStreamsRequest {
                    request_sequence, ..
                } => {
                    // streams are created lazily; acknowledge and move on
                    self.queue_control(Chunk::Reconfig(ChunkReconfig {
                        param_a: Some(Param::ReconfigResponse {
                            response_sequence: request_sequence,
                            result: RECONFIG_RESULT_SUCCESS_PERFORMED,
                        }),
                        param_b: None,
                    }));
                }
                _ => {}
            }
        }
    }

    // === shutdown ========================================================

    /// Graceful close: drain outbound data, then run the SHUTDOWN
    /// exchange.
    pub fn shutdown(&mut self, now: Instant) {
        match self.state {
            AssociationState::Established => {
                if self.pending.is_empty() && self.inflight.is_empty() {
                    self.send_shutdown(now);
                } else {
                    self.state = AssociationState::ShutdownPending;
                }
            }
            _ => {
                self.abort(now);
            }
        }
        self.flush(now);
    }

    /// Immediate teardown with an ABORT chunk.
    pub fn abort(&mut self, _now: Instant) {
        if self.state == AssociationState::Closed {
            return;
        }
        let mut packet = self.new_packet();
        packet.chunks.push(Chunk::Abort(ChunkAbort::user_initiated()));
        self.out_packets.push_back(packet.marshal());
        self.state = AssociationState::Closed;
        self.cancel_all_timers();
        self.events.push_back(AssociationEvent::Closed);
    }

    fn send_shutdown(&mut self, now: Instant) {
        debug!("sctp: sending SHUTDOWN");
        self.state = AssociationState::ShutdownSent;
        self.t2_retries = 0;
        self.t2_deadline = Some(now + self.rto.rto());
        self.queue_control(Chunk::Shutdown(ChunkShutdown {
            cumulative_tsn_ack: self.peer_last_tsn,
        }));
    }

    fn send_shutdown_ack(&mut self, now: Instant) {
        self.state = AssociationState::ShutdownAckSent;
        self.t2_retries = 0;
        self.t2_deadline = Some(now + self.rto.rto());
        self.queue_control(Chunk::ShutdownAck(ChunkShutdownAck {}));
    }

    fn handle_shutdown(&mut self, _shutdown: ChunkShutdown, now: Instant) {
        match self.state {
            AssociationState::Established => {
                if self.pending.is_empty() && self.inflight.is_empty() {
                    self.send_shutdown_ack(now);
                } else {
                    self.state = AssociationState::ShutdownReceived;
                }
            }
            AssociationState::ShutdownSent => {
                // both sides shut down simultaneously
                self.send_shutdown_ack(now);
            }
            _ => {}
        }
    }

    fn handle_shutdown_ack(&mut self, _now: Instant) {
        if matches!(
            self.state,
            AssociationState::ShutdownSent | AssociationState::ShutdownAckSent
        ) {
            self.queue_control(Chunk::ShutdownComplete(ChunkShutdownComplete {
                no_tcb: false,
            }));
            self.state = AssociationState::Closed;
            self.cancel_all_timers();
            self.events.push_back(AssociationEvent::Closed);
        }
    }

    // === timers ==========================================================

    pub fn poll_timeout(&self) -> Option<Instant> {
        [
            self.t1_deadline,
            self.t2_deadline,
            self.t3_deadline,
            self.sack_deadline,
            self.heartbeat_deadline,
            self.reconfig_deadline,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn handle_timeout(&mut self, now: Instant) {
        if let Some(deadline) = self.sack_deadline {
            if now >= deadline {
                self.send_sack();
            }
        }
        if let Some(deadline) = self.t1_deadline {
            if now >= deadline {
                self.on_t1_timeout(now);
            }
        }
        if let Some(deadline) = self.t3_deadline {
            if now >= deadline {
                self.on_t3_timeout(now);
            }
        }
        if let Some(deadline) = self.t2_deadline {
            if now >= deadline {
                self.on_t2_timeout(now);
            }
        }
        if let Some(deadline) = self.reconfig_deadline {
            if now >= deadline {
                self.on_reconfig_timeout(now);
            }
        }
        if let Some(deadline) = self.heartbeat_deadline {
            if now >= deadline {
                self.on_heartbeat_timeout(now);
            }
        }
        self.flush(now);
    }

    fn on_t1_timeout(&mut self, now: Instant) {
        self.t1_retries += 1;
        if self.t1_retries > self.config.max_init_retransmits {
            self.t1_deadline = None;
            self.state = AssociationState::Closed;
            self.events
                .push_back(AssociationEvent::Error(Error::ErrInitTimeout));
            self.events.push_back(AssociationEvent::Closed);
            return;
        }
        self.rto.backoff();
        self.t1_deadline = Some(now + self.rto.rto());
        match self.state {
            AssociationState::CookieWait => {
                if let Some(init) = &self.stored_init {
                    debug!("sctp: T1-init retransmit #{}", self.t1_retries);
                    let mut packet = Packet::new(SCTP_OVER_DTLS_PORT, SCTP_OVER_DTLS_PORT, 0);
                    packet.chunks.push(Chunk::Init(init.clone()));
                    self.out_packets.push_back(packet.marshal());
                }
            }
            AssociationState::CookieEchoed => {
                if let Some(cookie) = &self.pending_cookie_echo {
                    debug!("sctp: T1-cookie retransmit #{}", self.t1_retries);
                    self.queue_control(Chunk::CookieEcho(ChunkCookieEcho {
                        cookie: cookie.clone(),
                    }));
                }
            }
            _ => self.t1_deadline = None,
        }
    }

    fn on_t2_timeout(&mut self, now: Instant) {
        self.t2_retries += 1;
        if self.t2_retries > self.config.max_path_retransmits {
            self.t2_deadline = None;
            self.state = AssociationState::Closed;
            self.cancel_all_timers();
            self.events.push_back(AssociationEvent::Closed);
            return;
        }
        self.rto.backoff();
        self.t2_deadline = Some(now + self.rto.rto());
        match self.state {
            AssociationState::ShutdownSent => self.queue_control(Chunk::Shutdown(ChunkShutdown {
                cumulative_tsn_ack: self.peer_last_tsn,
            })),
            AssociationState::ShutdownAckSent => {
                self.queue_control(Chunk::ShutdownAck(ChunkShutdownAck {}))
            }
            _ => self.t2_deadline = None,
        }
    }

    fn on_t3_timeout(&mut self, now: Instant) {
        self.t3_retries += 1;
        if self.t3_retries > self.config.max_path_retransmits {
            self.t3_deadline = None;
            self.state = AssociationState::Closed;
            self.cancel_all_timers();
            self.events
                .push_back(AssociationEvent::Error(Error::ErrRetransmitTimeout));
            self.events.push_back(AssociationEvent::Closed);
            return;
        }

        // RTO congestion response
        self.ssthresh = (self.cwnd / 2).max(4 * self.config.mtu);
        self.cwnd = self.config.mtu;
        self.partial_bytes_acked = 0;
        self.rto.backoff();
        debug!(
            "sctp: T3-rtx #{}, cwnd={} rto={:?}",
            self.t3_retries,
            self.cwnd,
            self.rto.rto()
        );

        self.abandon_expired(now);

        // mark the earliest outstanding chunks for retransmission
        let mut budget = self.config.mtu;
        for chunk in self.inflight.iter_mut() {
            if chunk.acked || chunk.abandoned {
                continue;
            }
            let size = chunk.chunk_size();
            if size > budget {
                break;
            }
            budget -= size;
            chunk.retransmit = true;
        }

        self.t3_deadline = Some(now + self.rto.rto());
        self.advance_peer_ack_point();
    }

    fn on_reconfig_timeout(&mut self, now: Instant) {
        if let Some(request) = self.pending_reset_request.clone() {
            self.reconfig_deadline = Some(now + self.rto.rto());
            self.queue_control(Chunk::Reconfig(ChunkReconfig {
                param_a: Some(request),
                param_b: None,
            }));
        } else {
            self.reconfig_deadline = None;
        }
    }

    fn on_heartbeat_timeout(&mut self, now: Instant) {
        self.heartbeat_deadline = Some(now + HEARTBEAT_INTERVAL);
        if self.state == AssociationState::Established && self.inflight.is_empty() {
            let info = now.duration_since(self.created).as_millis().to_be_bytes();
            self.queue_control(Chunk::Heartbeat(ChunkHeartbeat {
                info: info.to_vec(),
            }));
        }
    }

    /// Applies per-stream partial reliability budgets to in-flight and
    /// pending messages.
    fn abandon_expired(&mut self, now: Instant) {
        let policies: HashMap<u16, ReliabilityPolicy> = self
            .streams
            .iter()
            .map(|(id, s)| (*id, s.policy))
            .collect();
        for chunk in self.inflight.iter_mut() {
            if chunk.abandoned || chunk.acked {
                continue;
            }
            let policy = policies
                .get(&chunk.stream_identifier)
                .copied()
                .unwrap_or_default();
            let expired = match policy {
                ReliabilityPolicy::Reliable => false,
                ReliabilityPolicy::MaxRetransmits(max) => chunk.nsent > max + 1,
                ReliabilityPolicy::MaxPacketLifetime(ms) => chunk
                    .since
                    .map(|s| now.duration_since(s).as_millis() as u64 > ms)
                    .unwrap_or(false),
            };
            if expired {
                trace!("sctp: abandoning TSN {}", chunk.tsn);
                chunk.abandoned = true;
                chunk.retransmit = false;
                self.in_flight_bytes = self.in_flight_bytes.saturating_sub(chunk.chunk_size());
            }
        }
    }

    // === packet assembly =================================================

    fn new_packet(&self) -> Packet {
        Packet::new(
            SCTP_OVER_DTLS_PORT,
            SCTP_OVER_DTLS_PORT,
            self.peer_verification_tag,
        )
    }

    fn queue_control(&mut self, chunk: Chunk) {
        self.control_queue.push_back(chunk);
    }

    pub fn poll_transmit(&mut self) -> Option<Vec<u8>> {
        self.out_packets.pop_front()
    }

    pub fn poll_event(&mut self) -> Option<AssociationEvent> {
        self.events.pop_front()
    }

    fn cancel_all_timers(&mut self) {
        self.t1_deadline = None;
        self.t2_deadline = None;
        self.t3_deadline = None;
        self.sack_deadline = None;
        self.heartbeat_deadline = None;
        self.reconfig_deadline = None;
    }

    /// Moves sendable data into flight and bundles everything queued
    /// into MTU-sized packets.
    fn flush(&mut self, now: Instant) {
        // control chunks first
        while let Some(chunk) = self.control_queue.pop_front() {
            let mut packet = self.new_packet();
            packet.chunks.push(chunk);
            self.out_packets.push_back(packet.marshal());
        }

        if !matches!(
            self.state,
            AssociationState::Established
                | AssociationState::ShutdownPending
                | AssociationState::ShutdownReceived
        ) {
            return;
        }

        let mut to_send: Vec<ChunkPayloadData> = vec![];

        // fast/timer retransmissions ignore the congestion gate
        for chunk in self.inflight.iter_mut() {
            if chunk.retransmit && !chunk.abandoned {
                chunk.retransmit = false;
                chunk.nsent += 1;
                to_send.push(chunk.clone());
            }
        }

        // fresh data under min(cwnd, peer rwnd)
        let window = self.cwnd.min(self.peer_rwnd as usize);
        while let Some(front) = self.pending.front() {
            let size = front.chunk_size();
            if self.in_flight_bytes > 0 && self.in_flight_bytes + size > window {
                break;
            }
            let mut chunk = self.pending.pop_front().expect("checked front");
            chunk.nsent = 1;
            if chunk.since.is_none() {
                chunk.since = Some(now);
            }
            self.in_flight_bytes += size;
            if self.rtt_probe.is_none() {
                self.rtt_probe = Some((chunk.tsn, now));
            }
            to_send.push(chunk.clone());
            self.inflight.push_back(chunk);
        }

        if to_send.is_empty() {
            return;
        }

        if self.t3_deadline.is_none() {
            self.t3_deadline = Some(now + self.rto.rto());
        }

        // bundle DATA chunks up to the MTU
        let mut packet = self.new_packet();
        let mut used = COMMON_HEADER_SIZE;
        for chunk in to_send {
            let padded = (chunk.chunk_size() + 3) & !3;
            if used + padded > self.config.mtu && !packet.chunks.is_empty() {
                self.out_packets.push_back(packet.marshal());
                packet = self.new_packet();
                used = COMMON_HEADER_SIZE;
            }
            used += padded;
            packet.chunks.push(Chunk::PayloadData(chunk));
        }
        if !packet.chunks.is_empty() {
            self.out_packets.push_back(packet.marshal());
        }
    }
}
