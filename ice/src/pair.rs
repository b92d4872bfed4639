#[cfg(test)]
#[path = "pair_test.rs"]
mod pair_test;

use std::fmt;
use std::time::Instant;

/// Index into the agent's pair arena. Pairs never move; transitions are
/// surfaced as events rather than callbacks into an owner.
pub type PairId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePairState {
    Frozen,
    Waiting,
    InProgress,
    Succeeded,
    Failed,
}

impl fmt::Display for CandidatePairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandidatePairState::Frozen => "frozen",
            CandidatePairState::Waiting => "waiting",
            CandidatePairState::InProgress => "in-progress",
            CandidatePairState::Succeeded => "succeeded",
            CandidatePairState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One (local, remote) candidate pairing; candidates are referenced by
/// index into the agent's candidate lists.
#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub local_idx: usize,
    pub remote_idx: usize,
    pub state: CandidatePairState,
    pub nominated: bool,
    /// USE-CANDIDATE was seen on a request before the pair succeeded.
    pub nomination_pending: bool,
    pub binding_attempts: u32,
    pub last_received: Option<Instant>,
    pub last_check_sent: Option<Instant>,
}

impl CandidatePair {
    pub fn new(local_idx: usize, remote_idx: usize) -> Self {
        CandidatePair {
            local_idx,
            remote_idx,
            state: CandidatePairState::Frozen,
            nominated: false,
            nomination_pending: false,
            binding_attempts: 0,
            last_received: None,
            last_check_sent: None,
        }
    }
}

/// Pair priority (RFC 8445 section 6.1.2.3):
/// 2^32·MIN(G,D) + 2·MAX(G,D) + (G>D ? 1 : 0)
/// where G is the controlling side's candidate priority.
pub fn pair_priority(controlling_priority: u32, controlled_priority: u32) -> u64 {
    let g = controlling_priority as u64;
    let d = controlled_priority as u64;
    (1u64 << 32) * g.min(d) + 2 * g.max(d) + u64::from(g > d)
}
