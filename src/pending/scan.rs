//! Ordered enumeration of pending terms
//!
//! Entries are pulled out of the hash buckets and merged into a single
//! key-ordered list using 32 power-of-two merge slots, the streaming
//! equivalent of bottom-up merge sort: the bucket order never matters
//! and the table is traversed exactly once. The list either feeds a
//! destructive drain (each entry emitted to a sink, then freed) or a
//! non-destructive cursor walk.

use tracing::debug;

use crate::error::Result;
use crate::varint::{get_varint, get_varint32_fixed};

use super::entry::{Entry, EntryId};
use super::hash::PendingTerms;

const MERGE_SLOTS: usize = 32;

/// Consumer of a destructive drain.
///
/// For each term, in ascending key order, the accumulator calls
/// `on_term` once, `on_doc` once per document, then `on_term_end`.
/// The first error aborts the drain; entries not yet emitted are still
/// dropped before the error is returned.
pub trait DoclistSink {
    fn on_term(&mut self, term: &[u8]) -> Result<()>;

    /// `poslist` carries the poslist size as a varint prefix followed
    /// by the poslist bytes, framed and ready for a segment writer.
    fn on_doc(&mut self, rowid: i64, poslist: &[u8]) -> Result<()>;

    fn on_term_end(&mut self) -> Result<()>;
}

impl PendingTerms {
    /// Drain the table in ascending key order, emitting every entry to
    /// `sink` and freeing it. On return the table is empty, whether or
    /// not the sink reported an error.
    pub fn drain<S: DoclistSink>(&mut self, sink: &mut S) -> Result<()> {
        debug!(entries = self.entry_count, "draining pending terms");
        let mut list = self.sorted_entries(None);

        self.slots.fill(None);
        self.entry_count = 0;
        self.scan = None;

        let mut result = Ok(());
        while let Some(id) = list {
            list = self.entries[id].scan_next;
            if result.is_ok() {
                result = emit_entry(&mut self.entries[id], sink);
            }
            let freed = self.entries[id].len();
            self.pending_bytes.set(self.pending_bytes.get() - freed);
        }
        self.entries.clear();
        result
    }

    /// Start a cursor walk over every entry whose key starts with
    /// `prefix` (all entries when `None`), in ascending key order.
    /// Entries are not consumed. A scan already in progress is silently
    /// replaced.
    pub fn scan_init(&mut self, prefix: Option<&[u8]>) {
        self.scan = self.sorted_entries(prefix);
    }

    /// Advance the cursor. A no-op at eof.
    pub fn scan_next(&mut self) {
        if let Some(id) = self.scan {
            self.scan = self.entries[id].scan_next;
        }
    }

    pub fn scan_eof(&self) -> bool {
        self.scan.is_none()
    }

    /// The cursor's current term and doclist, or `None` at eof. The
    /// final poslist size is back-patched before the payload is
    /// returned.
    pub fn scan_entry(&mut self) -> Option<(&[u8], &[u8])> {
        let id = self.scan?;
        let entry = &mut self.entries[id];
        entry.finalize_poslist_size();
        Some((entry.key(), entry.doclist()))
    }

    /// Link every entry matching `prefix` into one list sorted by key.
    ///
    /// Each matching bucket entry enters as a singleton; carrying it up
    /// through the merge slots keeps slot `i` holding a sorted list of
    /// length `2^i`, and a final fold produces the result.
    fn sorted_entries(&mut self, prefix: Option<&[u8]>) -> Option<EntryId> {
        let mut merge_slots: [Option<EntryId>; MERGE_SLOTS] = [None; MERGE_SLOTS];

        for slot in 0..self.slots.len() {
            let mut cursor = self.slots[slot];
            while let Some(id) = cursor {
                cursor = self.entries[id].hash_next;
                let matches = prefix.map_or(true, |p| self.entries[id].key().starts_with(p));
                if matches {
                    self.entries[id].scan_next = None;
                    let mut list = Some(id);
                    let mut level = 0;
                    while let Some(occupied) = merge_slots[level].take() {
                        list = merge_lists(&mut self.entries, list, Some(occupied));
                        level += 1;
                    }
                    merge_slots[level] = list;
                }
            }
        }

        let mut sorted = None;
        for level in merge_slots.iter_mut() {
            sorted = merge_lists(&mut self.entries, sorted, level.take());
        }
        sorted
    }
}

/// Merge two key-ordered lists linked through `scan_next`. Keys are
/// unique, so stability is irrelevant; comparison is plain unsigned
/// lexicographic order with a strict prefix ordering first.
fn merge_lists(
    entries: &mut [Entry],
    mut left: Option<EntryId>,
    mut right: Option<EntryId>,
) -> Option<EntryId> {
    let mut head = None;
    let mut tail: Option<EntryId> = None;

    loop {
        let id = match (left, right) {
            (None, None) => break,
            (Some(l), None) => {
                left = entries[l].scan_next;
                l
            }
            (None, Some(r)) => {
                right = entries[r].scan_next;
                r
            }
            (Some(l), Some(r)) => {
                if entries[l].key() <= entries[r].key() {
                    left = entries[l].scan_next;
                    l
                } else {
                    right = entries[r].scan_next;
                    r
                }
            }
        };

        entries[id].scan_next = None;
        match tail {
            None => head = Some(id),
            Some(t) => entries[t].scan_next = Some(id),
        }
        tail = Some(id);
    }

    head
}

/// Back-patch the entry's final poslist size, then walk its doclist and
/// emit it through the sink. Each document is framed as the trailing
/// natural-length bytes of its size slot plus the poslist bytes.
fn emit_entry<S: DoclistSink>(entry: &mut Entry, sink: &mut S) -> Result<()> {
    entry.finalize_poslist_size();
    sink.on_term(entry.key())?;

    let data = entry.doclist();
    let mut rowid: i64 = 0;
    let mut offset = 0;
    while offset < data.len() {
        let (delta, n) = get_varint(&data[offset..]);
        offset += n;
        rowid = rowid.wrapping_add(delta as i64);

        let (poslist_size, natural_len) = get_varint32_fixed(&data[offset..offset + 4]);
        offset += 4;
        let framed = &data[offset - natural_len..offset + poslist_size as usize];
        sink.on_doc(rowid, framed)?;
        offset += poslist_size as usize;
    }

    sink.on_term_end()
}
