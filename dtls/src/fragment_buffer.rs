#[cfg(test)]
#[path = "fragment_buffer_test.rs"]
mod fragment_buffer_test;

use std::collections::HashMap;

use crate::handshake::handshake_header::HandshakeHeader;

/// Reassembles fragmented handshake messages per message sequence
/// (RFC 6347 section 4.2.3). Fragments may arrive out of order,
/// duplicated and overlapping; a message is released once its byte
/// range is fully covered, exactly once.
#[derive(Default)]
pub struct FragmentBuffer {
    entries: HashMap<u16, FragmentEntry>,
}

struct FragmentEntry {
    length: usize,
    data: Vec<u8>,
    received: Vec<bool>,
    delivered: bool,
}

impl FragmentBuffer {
    pub fn new() -> Self {
        FragmentBuffer::default()
    }

    /// Feeds one fragment; returns the complete body the first time the
    /// message becomes whole.
    pub fn push(&mut self, header: &HandshakeHeader, fragment: &[u8]) -> Option<Vec<u8>> {
        let length = header.length as usize;
        let offset = header.fragment_offset as usize;
        if offset + fragment.len() > length {
            return None;
        }

        let entry = self
            .entries
            .entry(header.message_sequence)
            .or_insert_with(|| FragmentEntry {
                length,
                data: vec![0u8; length],
                received: vec![false; length],
                delivered: false,
            });
        if entry.delivered || entry.length != length {
            return None;
        }

        entry.data[offset..offset + fragment.len()].copy_from_slice(fragment);
        for flag in &mut entry.received[offset..offset + fragment.len()] {
            *flag = true;
        }

        if entry.length == 0 || entry.received.iter().all(|f| *f) {
            entry.delivered = true;
            Some(entry.data.clone())
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
