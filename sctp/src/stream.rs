#[cfg(test)]
#[path = "stream_test.rs"]
mod stream_test;

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};

use crate::chunk::chunk_payload_data::{ChunkPayloadData, PayloadProtocolIdentifier};
use crate::serial::{sna16lt, sna32lt};

/// Per-stream partial reliability policy, negotiated through DCEP
/// (RFC 3758, RFC 8831).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReliabilityPolicy {
    #[default]
    Reliable,
    /// Abandon after this many (re)transmissions.
    MaxRetransmits(u32),
    /// Abandon once the message has been queued this many milliseconds.
    MaxPacketLifetime(u64),
}

/// One inbound+outbound stream of an association.
pub struct Stream {
    pub stream_identifier: u16,
    pub next_ssn_out: u16,
    pub unordered: bool,
    pub policy: ReliabilityPolicy,
    pub reassembly: ReassemblyQueue,
}

impl Stream {
    pub fn new(stream_identifier: u16) -> Self {
        Stream {
            stream_identifier,
            next_ssn_out: 0,
            unordered: false,
            policy: ReliabilityPolicy::Reliable,
            reassembly: ReassemblyQueue::new(),
        }
    }
}

/// A fully reassembled inbound message.
pub struct AssembledMessage {
    pub ppid: PayloadProtocolIdentifier,
    pub data: Bytes,
}

/// Per-stream reassembly: ordered messages wait for their SSN turn,
/// unordered fragment sets deliver as soon as a B..E run of contiguous
/// TSNs is complete.
pub struct ReassemblyQueue {
    pub expected_ssn_in: u16,
    /// SSN -> fragments sorted by TSN.
    ordered: BTreeMap<u16, Vec<ChunkPayloadData>>,
    /// TSN -> fragment for unordered traffic.
    unordered: BTreeMap<u32, ChunkPayloadData>,
    pub buffered_bytes: usize,
}

impl ReassemblyQueue {
    pub fn new() -> Self {
        ReassemblyQueue {
            expected_ssn_in: 0,
            ordered: BTreeMap::new(),
            unordered: BTreeMap::new(),
            buffered_bytes: 0,
        }
    }

    /// Queues a fragment and returns every message that became
    /// deliverable.
    pub fn push(&mut self, chunk: ChunkPayloadData) -> Vec<AssembledMessage> {
        self.buffered_bytes += chunk.user_data.len();
        if chunk.unordered {
            self.unordered.insert(chunk.tsn, chunk);
            self.pop_unordered()
        } else {
            // stale SSNs (below the expected one after a reset or
            // forward-tsn) are dropped
            if sna16lt(chunk.stream_sequence_number, self.expected_ssn_in) {
                self.buffered_bytes -= chunk.user_data.len();
                return vec![];
            }
            let entry = self
                .ordered
                .entry(chunk.stream_sequence_number)
                .or_default();
            let pos = entry
                .iter()
                .position(|c| sna32lt(chunk.tsn, c.tsn))
                .unwrap_or(entry.len());
            if entry.iter().any(|c| c.tsn == chunk.tsn) {
                self.buffered_bytes -= chunk.user_data.len();
                return vec![];
            }
            entry.insert(pos, chunk);
            self.pop_ordered()
        }
    }

    fn fragments_complete(fragments: &[ChunkPayloadData]) -> bool {
        if fragments.is_empty() {
            return false;
        }
        if !fragments[0].beginning_fragment || !fragments[fragments.len() - 1].ending_fragment {
            return false;
        }
        fragments
            .windows(2)
            .all(|w| w[1].tsn == w[0].tsn.wrapping_add(1))
    }

    fn assemble(fragments: Vec<ChunkPayloadData>) -> AssembledMessage {
        let ppid = fragments[0].payload_type;
        let mut data = BytesMut::new();
        for fragment in fragments {
            data.extend_from_slice(&fragment.user_data);
        }
        AssembledMessage {
            ppid,
            data: data.freeze(),
        }
    }

    fn pop_ordered(&mut self) -> Vec<AssembledMessage> {
        let mut out = vec![];
        loop {
            let complete = match self.ordered.get(&self.expected_ssn_in) {
                Some(fragments) => Self::fragments_complete(fragments),
                None => false,
            };
            if !complete {
                break;
            }
            let fragments = self.ordered.remove(&self.expected_ssn_in).unwrap();
            self.buffered_bytes -= fragments.iter().map(|f| f.user_data.len()).sum::<usize>();
            self.expected_ssn_in = self.expected_ssn_in.wrapping_add(1);
            out.push(Self::assemble(fragments));
        }
        out
    }

    fn pop_unordered(&mut self) -> Vec<AssembledMessage> {
        let mut out = vec![];
        loop {
            // find any B..E run of contiguous TSNs
            let mut run: Option<(u32, u32)> = None;
            let mut start: Option<u32> = None;
            let mut prev: Option<u32> = None;
            for (&tsn, chunk) in &self.unordered {
                let contiguous = prev.map(|p| tsn == p.wrapping_add(1)).unwrap_or(false);
                if chunk.beginning_fragment {
                    start = Some(tsn);
                } else if !contiguous {
                    start = None;
                }
                prev = Some(tsn);
                if chunk.ending_fragment {
                    if let Some(s) = start {
                        run = Some((s, tsn));
                        break;
                    }
                }
            }
            let (first, last) = match run {
                Some(r) => r,
                None => break,
            };
            let mut fragments = vec![];
            let mut tsn = first;
            loop {
                let chunk = self.unordered.remove(&tsn).expect("run verified above");
                self.buffered_bytes -= chunk.user_data.len();
                fragments.push(chunk);
                if tsn == last {
                    break;
                }
                tsn = tsn.wrapping_add(1);
            }
            out.push(Self::assemble(fragments));
        }
        out
    }

    /// FORWARD-TSN support: drop buffered ordered data below `ssn` and
    /// move the expectation forward, releasing whatever became current.
    pub fn skip_ordered_to(&mut self, ssn: u16) -> Vec<AssembledMessage> {
        let stale: Vec<u16> = self
            .ordered
            .keys()
            .copied()
            .filter(|s| sna16lt(*s, ssn.wrapping_add(1)))
            .collect();
        for s in stale {
            if let Some(fragments) = self.ordered.remove(&s) {
                self.buffered_bytes -= fragments.iter().map(|f| f.user_data.len()).sum::<usize>();
            }
        }
        if sna16lt(self.expected_ssn_in, ssn.wrapping_add(1)) {
            self.expected_ssn_in = ssn.wrapping_add(1);
        }
        self.pop_ordered()
    }

    /// Stream reset clears buffers and restarts SSNs at zero.
    pub fn reset(&mut self) {
        self.ordered.clear();
        self.unordered.clear();
        self.buffered_bytes = 0;
        self.expected_ssn_in = 0;
    }
}

impl Default for ReassemblyQueue {
    fn default() -> Self {
        Self::new()
    }
}
