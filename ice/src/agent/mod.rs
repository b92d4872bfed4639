#[cfg(test)]
#[path = "agent_test.rs"]
mod agent_test;

pub mod gather;

pub use gather::InboundDatagram;

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::net::UdpSocket;

use stun::error_code::{ErrorCodeAttribute, CODE_ROLE_CONFLICT};
use stun::fingerprint::Fingerprint;
use stun::integrity::MessageIntegrity;
use stun::message::*;
use stun::textattrs::Username;
use stun::uattrs::{UInt32Attribute, UInt64Attribute};
use stun::xoraddr::XorMappedAddress;

use crate::candidate::{Candidate, CandidateType};
use crate::error::{Error, Result};
use crate::pair::{pair_priority, CandidatePair, CandidatePairState, PairId};
use crate::turn_client::{TurnClient, TurnUpdate};
use crate::url::Url;

/// Ta, the connectivity check pacing interval.
const CHECK_INTERVAL: Duration = Duration::from_millis(50);
/// STUN transaction initial RTO; doubles per retransmission.
const STUN_INITIAL_RTO: Duration = Duration::from_millis(500);
/// A pair fails after this many Binding Request transmissions.
const MAX_BINDING_ATTEMPTS: u32 = 7;
/// Consent freshness interval on the selected pair (RFC 7675).
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);
/// Missed keep-alives for this long mean `disconnected`.
const DISCONNECTED_TIMEOUT: Duration = Duration::from_secs(15);
/// Grace window before an all-failed checklist turns the agent failed.
const FAILED_GRACE: Duration = Duration::from_secs(5);
/// End-of-gathering quiescence window.
const GATHER_QUIESCENCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug)]
pub enum IceEvent {
    /// A newly gathered local candidate; `None` signals end-of-gathering.
    GatheredCandidate(Option<Candidate>),
    StateChange(IceConnectionState),
    SelectedPair {
        local: Candidate,
        remote: Candidate,
    },
    /// A non-STUN datagram arrived on a local socket; the transport
    /// demultiplexes it.
    PayloadReceived(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub urls: Vec<Url>,
    pub is_controlling: bool,
    /// Gather the loopback interface too; used by in-process tests and
    /// host-local deployments.
    pub include_loopback: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            urls: vec![],
            is_controlling: false,
            include_loopback: false,
        }
    }
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxKind {
    GatherBinding,
    TurnAllocate { turn_idx: usize },
    TurnRefresh { turn_idx: usize },
    TurnPermission { turn_idx: usize },
    ConnCheck { pair_id: PairId, nominate: bool },
    Keepalive { pair_id: PairId },
}

/// An in-flight STUN request with its retransmission schedule.
struct StunTransaction {
    kind: TxKind,
    socket_index: usize,
    dest: SocketAddr,
    raw: Vec<u8>,
    attempts: u32,
    rto: Duration,
    deadline: Instant,
}

pub(crate) struct AgentSocket {
    pub socket: Arc<UdpSocket>,
    pub base: SocketAddr,
}

/// The ICE agent: candidate gathering, the pair checklist, nomination
/// and keep-alive, all driven synchronously by the owning transport
/// task. Pairs live in an arena and are addressed by id; transitions
/// surface as events.
pub struct Agent {
    config: AgentConfig,
    pub(crate) sockets: Vec<AgentSocket>,

    local_ufrag: String,
    local_pwd: String,
    remote_ufrag: String,
    remote_pwd: String,

    is_controlling: bool,
    tiebreaker: u64,

    local_candidates: Vec<Candidate>,
    remote_candidates: Vec<Candidate>,
    pairs: Vec<CandidatePair>,

    transactions: HashMap<TransactionId, StunTransaction>,
    turn_clients: Vec<TurnClient>,

    selected_pair: Option<PairId>,
    state: IceConnectionState,

    check_deadline: Option<Instant>,
    keepalive_deadline: Option<Instant>,
    gather_deadline: Option<Instant>,
    all_failed_since: Option<Instant>,

    events: VecDeque<IceEvent>,
    reader_handles: Vec<tokio::task::JoinHandle<()>>,
    closed: bool,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        let is_controlling = config.is_controlling;
        Agent {
            config,
            sockets: vec![],
            local_ufrag: random_string(8),
            local_pwd: random_string(24),
            remote_ufrag: String::new(),
            remote_pwd: String::new(),
            is_controlling,
            tiebreaker: rand::thread_rng().gen(),
            local_candidates: vec![],
            remote_candidates: vec![],
            pairs: vec![],
            transactions: HashMap::new(),
            turn_clients: vec![],
            selected_pair: None,
            state: IceConnectionState::New,
            check_deadline: None,
            keepalive_deadline: None,
            gather_deadline: None,
            all_failed_since: None,
            events: VecDeque::new(),
            reader_handles: vec![],
            closed: false,
        }
    }

    pub fn local_credentials(&self) -> (String, String) {
        (self.local_ufrag.clone(), self.local_pwd.clone())
    }

    pub fn local_candidates(&self) -> &[Candidate] {
        &self.local_candidates
    }

    pub fn state(&self) -> IceConnectionState {
        self.state
    }

    pub fn selected_remote_addr(&self) -> Option<SocketAddr> {
        let pair_id = self.selected_pair?;
        let pair = &self.pairs[pair_id];
        Some(self.remote_candidates[pair.remote_idx].addr())
    }

    pub fn set_remote_credentials(&mut self, ufrag: String, pwd: String) {
        self.remote_ufrag = ufrag;
        self.remote_pwd = pwd;
    }

    pub fn poll_event(&mut self) -> Option<IceEvent> {
        self.events.pop_front()
    }

    fn set_state(&mut self, state: IceConnectionState) {
        if self.state != state {
            debug!("ice: {:?} -> {:?}", self.state, state);
            self.state = state;
            self.events.push_back(IceEvent::StateChange(state));
        }
    }

    /// Restart with fresh credentials: drop every candidate, pair and
    /// socket; the transport re-gathers afterwards.
    pub fn restart(&mut self) {
        self.local_ufrag = random_string(8);
        self.local_pwd = random_string(24);
        self.remote_ufrag.clear();
        self.remote_pwd.clear();
        self.local_candidates.clear();
        self.remote_candidates.clear();
        self.pairs.clear();
        self.transactions.clear();
        self.turn_clients.clear();
        self.selected_pair = None;
        self.all_failed_since = None;
        self.check_deadline = None;
        self.keepalive_deadline = None;
        for handle in self.reader_handles.drain(..) {
            handle.abort();
        }
        self.sockets.clear();
        self.set_state(IceConnectionState::New);
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.transactions.clear();
        self.check_deadline = None;
        self.keepalive_deadline = None;
        self.set_state(IceConnectionState::Closed);
        for handle in self.reader_handles.drain(..) {
            handle.abort();
        }
        self.sockets.clear();
    }

    // === pairing =========================================================

    /// Feeds one remote candidate; `None` is the end-of-candidates
    /// sentinel.
    pub fn add_remote_candidate(&mut self, candidate: Option<Candidate>, now: Instant) {
        let candidate = match candidate {
            Some(c) => c,
            None => return,
        };
        if self
            .remote_candidates
            .iter()
            .any(|c| c.addr() == candidate.addr() && c.candidate_type == candidate.candidate_type)
        {
            return;
        }
        debug!("ice: remote candidate {candidate}");
        self.remote_candidates.push(candidate);
        let remote_idx = self.remote_candidates.len() - 1;
        for local_idx in 0..self.local_candidates.len() {
            self.form_pair(local_idx, remote_idx);
        }
        if self.state == IceConnectionState::New && !self.pairs.is_empty() {
            self.set_state(IceConnectionState::Checking);
            if self.check_deadline.is_none() {
                self.check_deadline = Some(now);
            }
        }
    }

    pub(crate) fn add_local_candidate(&mut self, candidate: Candidate, now: Instant) {
        self.events
            .push_back(IceEvent::GatheredCandidate(Some(candidate.clone())));
        self.local_candidates.push(candidate);
        let local_idx = self.local_candidates.len() - 1;
        for remote_idx in 0..self.remote_candidates.len() {
            self.form_pair(local_idx, remote_idx);
        }
        if self.state == IceConnectionState::New && !self.pairs.is_empty() {
            self.set_state(IceConnectionState::Checking);
            if self.check_deadline.is_none() {
                self.check_deadline = Some(now);
            }
        }
        // each fresh candidate re-opens the quiescence window
        self.gather_deadline = Some(now + GATHER_QUIESCENCE);
    }

    fn form_pair(&mut self, local_idx: usize, remote_idx: usize) {
        let local = &self.local_candidates[local_idx];
        let remote = &self.remote_candidates[remote_idx];
        if local.component != remote.component
            || local.address.is_ipv4() != remote.address.is_ipv4()
        {
            return;
        }
        if self
            .pairs
            .iter()
            .any(|p| p.local_idx == local_idx && p.remote_idx == remote_idx)
        {
            return;
        }
        self.pairs.push(CandidatePair::new(local_idx, remote_idx));
        self.rebalance_checklist();
    }

    fn pair_foundation(&self, pair: &CandidatePair) -> String {
        format!(
            "{}:{}",
            self.local_candidates[pair.local_idx].foundation(),
            self.remote_candidates[pair.remote_idx].foundation()
        )
    }

    fn priority_of(&self, pair: &CandidatePair) -> u64 {
        let local = self.local_candidates[pair.local_idx].priority();
        let remote = self.remote_candidates[pair.remote_idx].priority();
        if self.is_controlling {
            pair_priority(local, remote)
        } else {
            pair_priority(remote, local)
        }
    }

    /// Per foundation group one frozen pair is promoted to waiting; the
    /// rest thaw as checks of that foundation succeed.
    fn rebalance_checklist(&mut self) {
        let mut groups: HashMap<String, Vec<PairId>> = HashMap::new();
        for id in 0..self.pairs.len() {
            let foundation = self.pair_foundation(&self.pairs[id]);
            groups.entry(foundation).or_default().push(id);
        }
        for ids in groups.values() {
            if ids
                .iter()
                .any(|&id| self.pairs[id].state != CandidatePairState::Frozen)
            {
                continue;
            }
            if let Some(&starter) = ids
                .iter()
                .min_by_key(|&&id| self.priority_of(&self.pairs[id]))
            {
                self.pairs[starter].state = CandidatePairState::Waiting;
            }
        }
    }

    fn unfreeze_foundation(&mut self, foundation: &str) {
        for id in 0..self.pairs.len() {
            if self.pairs[id].state == CandidatePairState::Frozen
                && self.pair_foundation(&self.pairs[id]) == foundation
            {
                self.pairs[id].state = CandidatePairState::Waiting;
            }
        }
    }

    // === timers ==========================================================

    pub fn poll_timeout(&self) -> Option<Instant> {
        let mut deadline = self.check_deadline;
        for candidate in [
            self.keepalive_deadline,
            self.gather_deadline,
            self.transactions.values().map(|t| t.deadline).min(),
        ]
        .into_iter()
        .flatten()
        {
            deadline = Some(deadline.map_or(candidate, |d| d.min(candidate)));
        }
        deadline
    }

    pub fn handle_timeout(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        if let Some(deadline) = self.gather_deadline {
            if now >= deadline {
                self.gather_deadline = None;
                debug!("ice: gathering complete");
                self.events.push_back(IceEvent::GatheredCandidate(None));
            }
        }
        if let Some(deadline) = self.check_deadline {
            if now >= deadline {
                self.run_check(now);
                self.check_deadline = Some(now + CHECK_INTERVAL);
            }
        }
        if let Some(deadline) = self.keepalive_deadline {
            if now >= deadline {
                self.send_keepalive(now);
                self.keepalive_deadline = Some(now + KEEPALIVE_INTERVAL);
            }
        }
        self.retransmit_due(now);
        self.update_liveness(now);
    }

    /// One Ta tick: start a check on the highest-priority waiting pair.
    fn run_check(&mut self, now: Instant) {
        if self.remote_pwd.is_empty() {
            return;
        }
        let next = (0..self.pairs.len())
            .filter(|&id| self.pairs[id].state == CandidatePairState::Waiting)
            .max_by_key(|&id| self.priority_of(&self.pairs[id]));
        if let Some(pair_id) = next {
            if let Err(e) = self.send_binding_check(pair_id, false, now) {
                warn!("ice: check failed to send: {e}");
            }
        } else {
            self.maybe_complete(now);
        }
    }

    fn maybe_complete(&mut self, now: Instant) {
        let any_active = self.pairs.iter().any(|p| {
            matches!(
                p.state,
                CandidatePairState::Waiting | CandidatePairState::InProgress
            )
        });
        if self.selected_pair.is_some() && !any_active {
            self.set_state(IceConnectionState::Completed);
        }
        if !self.pairs.is_empty()
            && self
                .pairs
                .iter()
                .all(|p| p.state == CandidatePairState::Failed)
        {
            match self.all_failed_since {
                None => self.all_failed_since = Some(now),
                Some(since) if now.duration_since(since) >= FAILED_GRACE => {
                    self.set_state(IceConnectionState::Failed);
                }
                _ => {}
            }
        } else {
            self.all_failed_since = None;
        }
    }

    fn update_liveness(&mut self, now: Instant) {
        let connected = matches!(
            self.state,
            IceConnectionState::Connected | IceConnectionState::Completed
        );
        if !connected {
            return;
        }
        if let Some(pair_id) = self.selected_pair {
            if let Some(last) = self.pairs[pair_id].last_received {
                if now.duration_since(last) > DISCONNECTED_TIMEOUT {
                    self.set_state(IceConnectionState::Disconnected);
                }
            }
        }
    }

    fn retransmit_due(&mut self, now: Instant) {
        let due: Vec<TransactionId> = self
            .transactions
            .iter()
            .filter(|(_, t)| now >= t.deadline)
            .map(|(id, _)| *id)
            .collect();
        for id in due {
            let mut tx = match self.transactions.remove(&id) {
                Some(t) => t,
                None => continue,
            };
            if tx.attempts >= MAX_BINDING_ATTEMPTS {
                trace!("ice: transaction expired after {} transmits", tx.attempts);
                match tx.kind {
                    TxKind::ConnCheck { pair_id, .. } => {
                        self.pairs[pair_id].state = CandidatePairState::Failed;
                    }
                    TxKind::TurnAllocate { .. } | TxKind::GatherBinding => {}
                    _ => {}
                }
                continue;
            }
            tx.attempts += 1;
            tx.rto *= 2;
            tx.deadline = now + tx.rto;
            self.send_raw(tx.socket_index, tx.dest, &tx.raw);
            self.transactions.insert(id, tx);
        }
    }

    // === STUN send helpers ==============================================

    fn send_raw(&self, socket_index: usize, dest: SocketAddr, raw: &[u8]) {
        if let Some(agent_socket) = self.sockets.get(socket_index) {
            if let Err(e) = agent_socket.socket.try_send_to(raw, dest) {
                trace!("ice: send to {dest} failed: {e}");
            }
        }
    }

    fn start_transaction(
        &mut self,
        kind: TxKind,
        socket_index: usize,
        dest: SocketAddr,
        message: &Message,
        now: Instant,
    ) {
        self.send_raw(socket_index, dest, &message.raw);
        self.transactions.insert(
            message.transaction_id,
            StunTransaction {
                kind,
                socket_index,
                dest,
                raw: message.raw.clone(),
                attempts: 1,
                rto: STUN_INITIAL_RTO,
                deadline: now + STUN_INITIAL_RTO,
            },
        );
    }

    fn send_binding_check(&mut self, pair_id: PairId, nominate: bool, now: Instant) -> Result<()> {
        let (local_idx, remote_idx) = {
            let pair = &self.pairs[pair_id];
            (pair.local_idx, pair.remote_idx)
        };
        let local = self.local_candidates[local_idx].clone();
        let remote_addr = self.remote_candidates[remote_idx].addr();

        let mut m = Message::new(BINDING_REQUEST);
        Username::add_to(&mut m, &format!("{}:{}", self.remote_ufrag, self.local_ufrag));
        UInt32Attribute::add_to(&mut m, ATTR_PRIORITY, local.prflx_priority());
        if self.is_controlling {
            UInt64Attribute::add_to(&mut m, ATTR_ICE_CONTROLLING, self.tiebreaker);
            if nominate {
                m.add(ATTR_USE_CANDIDATE, &[]);
            }
        } else {
            UInt64Attribute::add_to(&mut m, ATTR_ICE_CONTROLLED, self.tiebreaker);
        }
        MessageIntegrity::new_short_term(&self.remote_pwd).add_to(&mut m)?;
        Fingerprint::add_to(&mut m)?;

        trace!(
            "ice: check pair={pair_id} nominate={nominate} -> {remote_addr}"
        );
        let pair = &mut self.pairs[pair_id];
        pair.state = CandidatePairState::InProgress;
        pair.binding_attempts += 1;
        pair.last_check_sent = Some(now);
        self.start_transaction(
            TxKind::ConnCheck { pair_id, nominate },
            local.socket_index,
            remote_addr,
            &m,
            now,
        );
        Ok(())
    }

    fn send_keepalive(&mut self, now: Instant) {
        if let Some(pair_id) = self.selected_pair {
            // consent freshness is a full integrity-protected check
            let _ = self.send_binding_check_keepalive(pair_id, now);
        }
    }

    fn send_binding_check_keepalive(&mut self, pair_id: PairId, now: Instant) -> Result<()> {
        let (local_idx, remote_idx) = {
            let pair = &self.pairs[pair_id];
            (pair.local_idx, pair.remote_idx)
        };
        let local = self.local_candidates[local_idx].clone();
        let remote_addr = self.remote_candidates[remote_idx].addr();

        let mut m = Message::new(BINDING_REQUEST);
        Username::add_to(&mut m, &format!("{}:{}", self.remote_ufrag, self.local_ufrag));
        UInt32Attribute::add_to(&mut m, ATTR_PRIORITY, local.prflx_priority());
        if self.is_controlling {
            UInt64Attribute::add_to(&mut m, ATTR_ICE_CONTROLLING, self.tiebreaker);
        } else {
            UInt64Attribute::add_to(&mut m, ATTR_ICE_CONTROLLED, self.tiebreaker);
        }
        MessageIntegrity::new_short_term(&self.remote_pwd).add_to(&mut m)?;
        Fingerprint::add_to(&mut m)?;
        self.start_transaction(
            TxKind::Keepalive { pair_id },
            local.socket_index,
            remote_addr,
            &m,
            now,
        );
        Ok(())
    }

    // === inbound =========================================================

    /// Classifies one datagram from a local socket. STUN is consumed
    /// here; anything else is surfaced as a payload event for the demux.
    pub fn handle_datagram(
        &mut self,
        socket_index: usize,
        src: SocketAddr,
        data: &[u8],
        now: Instant,
    ) {
        if self.closed {
            return;
        }
        if !is_message(data) {
            if let Some(pair_id) = self.pair_for(socket_index, src) {
                self.pairs[pair_id].last_received = Some(now);
            }
            self.events.push_back(IceEvent::PayloadReceived(data.to_vec()));
            return;
        }
        let message = match Message::decode(data) {
            Ok(m) => m,
            Err(e) => {
                warn!("ice: undecodable STUN message from {src}: {e}");
                return;
            }
        };
        self.handle_stun(socket_index, src, message, now);
    }

    fn handle_stun(&mut self, socket_index: usize, src: SocketAddr, m: Message, now: Instant) {
        match (m.method(), m.class()) {
            (Some(Method::Binding), Some(MessageClass::Request)) => {
                self.handle_binding_request(socket_index, src, m, now);
            }
            (Some(Method::Binding), Some(MessageClass::SuccessResponse))
            | (Some(Method::Binding), Some(MessageClass::ErrorResponse)) => {
                self.handle_binding_response(src, m, now);
            }
            (Some(Method::Data), Some(MessageClass::Indication)) => {
                if let Ok((peer, payload)) = TurnClient::parse_data_indication(&m) {
                    // relayed traffic: re-classify as if it came from the
                    // peer on this socket
                    self.handle_datagram(socket_index, peer, &payload, now);
                }
            }
            (Some(Method::Allocate), _)
            | (Some(Method::Refresh), _)
            | (Some(Method::CreatePermission), _) => {
                self.handle_turn_response(m, now);
            }
            _ => {}
        }
    }

    fn local_candidate_for_socket(&self, socket_index: usize) -> Option<usize> {
        self.local_candidates
            .iter()
            .position(|c| c.socket_index == socket_index && c.candidate_type == CandidateType::Host)
            .or_else(|| {
                self.local_candidates
                    .iter()
                    .position(|c| c.socket_index == socket_index)
            })
    }

    fn pair_for(&self, socket_index: usize, src: SocketAddr) -> Option<PairId> {
        let local_idx = self.local_candidate_for_socket(socket_index)?;
        self.pairs.iter().position(|p| {
            p.local_idx == local_idx && self.remote_candidates[p.remote_idx].addr() == src
        })
    }

    fn handle_binding_request(
        &mut self,
        socket_index: usize,
        src: SocketAddr,
        m: Message,
        now: Instant,
    ) {
        // requests are authenticated with our password
        let integrity = MessageIntegrity::new_short_term(&self.local_pwd);
        if integrity.check(&m).is_err() {
            warn!("ice: binding request from {src} failed integrity");
            return;
        }

        // role conflict (RFC 8445 section 7.3.1.1)
        if self.is_controlling {
            if let Ok(their_tiebreaker) = UInt64Attribute::get_from(&m, ATTR_ICE_CONTROLLING) {
                if self.tiebreaker >= their_tiebreaker {
                    self.send_role_conflict(socket_index, src, &m);
                    return;
                }
                debug!("ice: role conflict, switching to controlled");
                self.is_controlling = false;
            }
        } else if let Ok(their_tiebreaker) = UInt64Attribute::get_from(&m, ATTR_ICE_CONTROLLED) {
            if self.tiebreaker < their_tiebreaker {
                self.send_role_conflict(socket_index, src, &m);
                return;
            }
            debug!("ice: role conflict, switching to controlling");
            self.is_controlling = true;
        }

        // a request from an unknown source mints a peer-reflexive remote
        let remote_idx = match self
            .remote_candidates
            .iter()
            .position(|c| c.addr() == src)
        {
            Some(idx) => idx,
            None => {
                debug!("ice: peer-reflexive remote candidate {src}");
                let mut prflx = Candidate::new_host(src.ip(), src.port(), 0);
                prflx.candidate_type = CandidateType::PeerReflexive;
                self.remote_candidates.push(prflx);
                let idx = self.remote_candidates.len() - 1;
                if let Some(local_idx) = self.local_candidate_for_socket(socket_index) {
                    self.form_pair(local_idx, idx);
                }
                idx
            }
        };

        let pair_id = self.pair_for(socket_index, src).or_else(|| {
            let local_idx = self.local_candidate_for_socket(socket_index)?;
            self.pairs
                .iter()
                .position(|p| p.local_idx == local_idx && p.remote_idx == remote_idx)
        });

        if let Some(pair_id) = pair_id {
            self.pairs[pair_id].last_received = Some(now);
            if m.contains(ATTR_USE_CANDIDATE) {
                if self.pairs[pair_id].state == CandidatePairState::Succeeded {
                    self.nominate(pair_id, now);
                } else {
                    self.pairs[pair_id].nomination_pending = true;
                }
            }
            // a request is also a liveness trigger for our own check
            if self.pairs[pair_id].state == CandidatePairState::Frozen {
                self.pairs[pair_id].state = CandidatePairState::Waiting;
            }
        }

        // reflect the source as XOR-MAPPED-ADDRESS
        let mut response = Message::with_transaction_id(BINDING_SUCCESS, m.transaction_id);
        XorMappedAddress(src).add_to(&mut response);
        let _ = MessageIntegrity::new_short_term(&self.local_pwd).add_to(&mut response);
        let _ = Fingerprint::add_to(&mut response);
        self.send_raw(socket_index, src, &response.raw);
    }

    fn send_role_conflict(&self, socket_index: usize, src: SocketAddr, request: &Message) {
        let mut response = Message::with_transaction_id(BINDING_ERROR, request.transaction_id);
        ErrorCodeAttribute::new(CODE_ROLE_CONFLICT).add_to(&mut response);
        let _ = MessageIntegrity::new_short_term(&self.local_pwd).add_to(&mut response);
        let _ = Fingerprint::add_to(&mut response);
        self.send_raw(socket_index, src, &response.raw);
    }

    fn handle_binding_response(&mut self, src: SocketAddr, m: Message, now: Instant) {
        let tx = match self.transactions.remove(&m.transaction_id) {
            Some(tx) => tx,
            None => return,
        };

        if m.class() == Some(MessageClass::ErrorResponse) {
            let code = ErrorCodeAttribute::get_from(&m).map(|e| e.code).unwrap_or(0);
            if code == CODE_ROLE_CONFLICT {
                debug!("ice: 487 role conflict, switching role and retrying");
                self.is_controlling = !self.is_controlling;
                self.tiebreaker = rand::thread_rng().gen();
                if let TxKind::ConnCheck { pair_id, .. } = tx.kind {
                    self.pairs[pair_id].state = CandidatePairState::Waiting;
                }
            } else if let TxKind::ConnCheck { pair_id, .. } = tx.kind {
                self.pairs[pair_id].state = CandidatePairState::Failed;
            }
            return;
        }

        match tx.kind {
            TxKind::GatherBinding => {
                if let Ok(mapped) = XorMappedAddress::get_from(&m) {
                    self.on_reflexive_mapping(tx.socket_index, mapped.0, src, now);
                }
            }
            TxKind::ConnCheck { pair_id, nominate } => {
                // responses are authenticated with the remote password
                if MessageIntegrity::new_short_term(&self.remote_pwd)
                    .check(&m)
                    .is_err()
                {
                    warn!("ice: check response failed integrity");
                    return;
                }
                let foundation = self.pair_foundation(&self.pairs[pair_id]);
                {
                    let pair = &mut self.pairs[pair_id];
                    pair.state = CandidatePairState::Succeeded;
                    pair.last_received = Some(now);
                }
                trace!("ice: pair {pair_id} succeeded");
                self.unfreeze_foundation(&foundation);

                if nominate || self.pairs[pair_id].nomination_pending {
                    self.nominate(pair_id, now);
                } else if self.is_controlling && self.selected_pair.is_none() {
                    // aggressive-ish nomination: re-check with
                    // USE-CANDIDATE as soon as a pair succeeds
                    let _ = self.send_binding_check(pair_id, true, now);
                }
            }
            TxKind::Keepalive { pair_id } => {
                self.pairs[pair_id].last_received = Some(now);
                if self.state == IceConnectionState::Disconnected {
                    self.set_state(IceConnectionState::Connected);
                }
            }
            // TURN responses arrive with their own methods and are
            // routed through handle_turn_response instead
            TxKind::TurnAllocate { .. }
            | TxKind::TurnRefresh { .. }
            | TxKind::TurnPermission { .. } => {}
        }
    }

    fn nominate(&mut self, pair_id: PairId, now: Instant) {
        let pair = &mut self.pairs[pair_id];
        if pair.state != CandidatePairState::Succeeded {
            return;
        }
        pair.nominated = true;
        pair.nomination_pending = false;
        if self.selected_pair.is_none() {
            self.selected_pair = Some(pair_id);
            let local = self.local_candidates[self.pairs[pair_id].local_idx].clone();
            let remote = self.remote_candidates[self.pairs[pair_id].remote_idx].clone();
            debug!("ice: selected pair {local} -> {remote}");
            self.events.push_back(IceEvent::SelectedPair { local, remote });
            self.set_state(IceConnectionState::Connected);
            self.keepalive_deadline = Some(now + KEEPALIVE_INTERVAL);
            self.maybe_complete(now);
        }
    }

    // === payload =========================================================

    /// Sends application data on the selected pair, wrapping in a TURN
    /// Send indication when the local side is a relay candidate.
    pub fn send_payload(&mut self, data: &[u8]) -> Result<()> {
        let pair_id = self.selected_pair.ok_or(Error::ErrNoSelectedPair)?;
        let pair = &self.pairs[pair_id];
        let local = &self.local_candidates[pair.local_idx];
        let remote_addr = self.remote_candidates[pair.remote_idx].addr();

        if local.candidate_type == CandidateType::Relay {
            if let Some(turn) = self
                .turn_clients
                .iter()
                .find(|t| t.socket_index == local.socket_index)
            {
                let indication = turn.send_indication(remote_addr, data)?;
                self.send_raw(local.socket_index, turn.server, &indication.raw);
                return Ok(());
            }
        }
        self.send_raw(local.socket_index, remote_addr, data);
        Ok(())
    }

    // === gathering callbacks ============================================

    fn on_reflexive_mapping(
        &mut self,
        socket_index: usize,
        mapped: SocketAddr,
        server: SocketAddr,
        now: Instant,
    ) {
        let duplicate = self
            .local_candidates
            .iter()
            .any(|c| c.addr() == mapped);
        if duplicate {
            return;
        }
        let base = self.sockets[socket_index].base;
        let candidate = Candidate {
            candidate_type: CandidateType::ServerReflexive,
            component: 1,
            address: mapped.ip(),
            port: mapped.port(),
            related_address: Some(base),
            tcp_type: None,
            generation: None,
            ufrag: None,
            socket_index,
        };
        debug!("ice: srflx candidate {candidate} via {server}");
        self.add_local_candidate(candidate, now);
    }

    fn handle_turn_response(&mut self, m: Message, now: Instant) {
        if let Some(tx) = self.transactions.remove(&m.transaction_id) {
            self.handle_turn_message(tx.kind, m, now);
        }
    }

    fn handle_turn_message(&mut self, kind: TxKind, m: Message, now: Instant) {
        let turn_idx = match kind {
            TxKind::TurnAllocate { turn_idx }
            | TxKind::TurnRefresh { turn_idx }
            | TxKind::TurnPermission { turn_idx } => turn_idx,
            _ => return,
        };
        let update = match self.turn_clients[turn_idx].handle_response(&m) {
            Ok(update) => update,
            Err(e) => {
                warn!("ice: turn response error: {e}");
                return;
            }
        };
        match update {
            TurnUpdate::RetryWithAuth => {
                let client = &self.turn_clients[turn_idx];
                let socket_index = client.socket_index;
                let server = client.server;
                if let Ok(request) = client.allocate_request() {
                    self.start_transaction(
                        TxKind::TurnAllocate { turn_idx },
                        socket_index,
                        server,
                        &request,
                        now,
                    );
                }
            }
            TurnUpdate::Allocated { relayed, mapped } => {
                let socket_index = self.turn_clients[turn_idx].socket_index;
                let candidate = Candidate {
                    candidate_type: CandidateType::Relay,
                    component: 1,
                    address: relayed.ip(),
                    port: relayed.port(),
                    related_address: Some(mapped),
                    tcp_type: None,
                    generation: None,
                    ufrag: None,
                    socket_index,
                };
                debug!("ice: relay candidate {candidate}");
                self.add_local_candidate(candidate, now);
                // permissions for already-known remotes
                let peers: Vec<SocketAddr> =
                    self.remote_candidates.iter().map(|c| c.addr()).collect();
                for peer in peers {
                    self.create_turn_permission(turn_idx, peer, now);
                }
            }
            TurnUpdate::Refreshed | TurnUpdate::PermissionGranted => {}
            TurnUpdate::Failed(code) => {
                warn!("ice: turn request failed with {code}");
            }
        }
    }

    fn create_turn_permission(&mut self, turn_idx: usize, peer: SocketAddr, now: Instant) {
        let client = &self.turn_clients[turn_idx];
        let socket_index = client.socket_index;
        let server = client.server;
        if let Ok(request) = client.create_permission_request(peer) {
            self.start_transaction(
                TxKind::TurnPermission { turn_idx },
                socket_index,
                server,
                &request,
                now,
            );
        }
    }
}
