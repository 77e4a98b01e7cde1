//! Pending-terms hash table

use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;

use crate::config::AccumulatorConfig;
use crate::error::Result;

use super::entry::{Entry, EntryId};

/// Accumulates `term -> doclist` content during a write transaction,
/// before it is flushed to a level-0 segment.
///
/// Terms are opaque byte strings compared as unsigned-byte sequences.
/// Writes for a given term must present rowids in non-decreasing order,
/// columns in non-decreasing order within a rowid, and strictly
/// increasing positions within a `(rowid, column)`; this is the
/// caller's contract and only checked by debug assertions.
pub struct PendingTerms {
    /// Shared byte accountant. The surrounding storage layer reads it
    /// as a flush trigger; the accumulator is its sole author.
    pub(super) pending_bytes: Rc<Cell<usize>>,
    /// Hash slots, each holding the head of a bucket chain
    pub(super) slots: Vec<Option<EntryId>>,
    /// Entry arena; chains and scan lists link by index
    pub(super) entries: Vec<Entry>,
    /// Live entries in the table
    pub(super) entry_count: usize,
    /// Head of the current cursor-mode scan list
    pub(super) scan: Option<EntryId>,
}

impl PendingTerms {
    /// Create an empty accumulator that accounts its payload bytes
    /// into `pending_bytes`.
    pub fn new(pending_bytes: Rc<Cell<usize>>) -> Result<Self> {
        Self::with_config(pending_bytes, &AccumulatorConfig::default())
    }

    /// Create an empty accumulator with an explicit initial slot count.
    pub fn with_config(pending_bytes: Rc<Cell<usize>>, config: &AccumulatorConfig) -> Result<Self> {
        let slots = alloc_slots(config.initial_slots.max(1))?;
        Ok(Self {
            pending_bytes,
            slots,
            entries: Vec::new(),
            entry_count: 0,
            scan: None,
        })
    }

    /// Record one token occurrence for `term`.
    ///
    /// `column < 0` marks a deletion: the rowid is recorded with an
    /// empty poslist, which downstream segment merging interprets as a
    /// tombstone for that row.
    pub fn write(&mut self, rowid: i64, column: i32, position: i32, term: &[u8]) -> Result<()> {
        debug_assert!(!term.is_empty());
        let mut slot = hash_key(self.slots.len(), term);

        let id = match self.find_in_bucket(slot, term) {
            Some(id) => id,
            None => {
                if self.entry_count * 2 >= self.slots.len() {
                    self.grow_slots()?;
                    slot = hash_key(self.slots.len(), term);
                }
                self.entries.try_reserve(1)?;
                let mut entry = Entry::new(term, rowid)?;
                entry.hash_next = self.slots[slot];
                let id = self.entries.len();
                self.entries.push(entry);
                self.slots[slot] = Some(id);
                self.entry_count += 1;

                // Account the freshly opened doclist before the append
                // below, so the counter stays consistent even if the
                // append cannot grow the buffer.
                let opened = self.entries[id].len();
                self.pending_bytes.set(self.pending_bytes.get() + opened);
                id
            }
        };

        let entry = &mut self.entries[id];
        let len_before = entry.len();
        entry.reserve_append()?;
        entry.append(rowid, column, position);
        let grown = entry.len() - len_before;
        self.pending_bytes.set(self.pending_bytes.get() + grown);
        Ok(())
    }

    /// Look up the doclist accumulated for `term`, back-patching the
    /// final poslist size first. Returns `None` for unknown terms.
    pub fn get_doclist(&mut self, term: &[u8]) -> Option<&[u8]> {
        let slot = hash_key(self.slots.len(), term);
        let id = self.find_in_bucket(slot, term)?;
        let entry = &mut self.entries[id];
        entry.finalize_poslist_size();
        Some(entry.doclist())
    }

    /// Drop all entries. The byte accountant is decremented by what was
    /// held, never zeroed outright.
    pub fn clear(&mut self) {
        let freed: usize = self.entries.iter().map(Entry::len).sum();
        self.pending_bytes.set(self.pending_bytes.get() - freed);
        self.entries.clear();
        self.slots.fill(None);
        self.entry_count = 0;
        self.scan = None;
    }

    /// Number of distinct terms currently held.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Current size of the slot array.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Current value of the shared byte accountant.
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes.get()
    }

    /// Whether accumulated bytes have crossed the flush threshold.
    pub fn should_flush(&self, config: &AccumulatorConfig) -> bool {
        self.pending_bytes() >= config.max_pending_bytes
    }

    pub(super) fn find_in_bucket(&self, slot: usize, term: &[u8]) -> Option<EntryId> {
        let mut cursor = self.slots[slot];
        while let Some(id) = cursor {
            let entry = &self.entries[id];
            if entry.key() == term {
                return Some(id);
            }
            cursor = entry.hash_next;
        }
        None
    }

    /// Double the slot array and rehash every entry. Keys are stable,
    /// so hashes are recomputable from the arena alone.
    fn grow_slots(&mut self) -> Result<()> {
        let doubled = self.slots.len() * 2;
        let mut new_slots = alloc_slots(doubled)?;
        for (id, entry) in self.entries.iter_mut().enumerate() {
            let slot = hash_key(doubled, entry.key());
            entry.hash_next = new_slots[slot].replace(id);
        }
        self.slots = new_slots;
        trace!(slots = doubled, "doubled pending-terms hash");
        Ok(())
    }
}

fn alloc_slots(count: usize) -> Result<Vec<Option<EntryId>>> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(count)?;
    slots.resize(count, None);
    Ok(slots)
}

/// Hash a key into a slot index, reading the bytes high-to-low.
pub(super) fn hash_key(slot_count: usize, key: &[u8]) -> usize {
    let mut h: u32 = 13;
    for &byte in key.iter().rev() {
        h = h.wrapping_shl(3) ^ h ^ byte as u32;
    }
    h as usize % slot_count
}
