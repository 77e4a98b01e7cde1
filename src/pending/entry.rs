//! Per-term doclist encoder

use crate::error::Result;
use crate::varint::{put_varint, put_varint32_fixed};

/// Index of an entry in the accumulator's arena. Bucket chains and scan
/// lists link entries by index, so payload growth never invalidates a
/// reference held by the table.
pub(super) type EntryId = usize;

/// Worst case bytes a single token write can append:
///
/// ```text
/// + 9 bytes for a new rowid delta,
/// + 4 bytes reserved for the poslist size,
/// + 1 byte for a "new column" marker,
/// + 3 bytes for a new column number (16-bit max),
/// + 5 bytes for the new position offset (32-bit max).
/// ```
pub(super) const MAX_APPEND: usize = 9 + 4 + 1 + 3 + 5;

const INITIAL_CAPACITY: usize = 64;

/// One pending term and its partially-encoded doclist.
///
/// The payload holds, for each document: the rowid delta as a varint
/// (absolute for the first document), a 4-byte slot for the poslist
/// size, then the poslist bytes. The slot of the newest document is
/// scratch until it is back-patched, which happens when the next
/// document starts or lazily when the doclist is read.
pub(super) struct Entry {
    key: Vec<u8>,
    data: Vec<u8>,
    /// Offset of the 4-byte size slot for the current poslist
    size_slot: usize,
    /// Rowid of the last value written
    last_rowid: i64,
    /// Column of the last value written
    last_column: i32,
    /// Position of the last value written
    last_position: i32,
    /// Next entry in the same hash bucket
    pub(super) hash_next: Option<EntryId>,
    /// Next entry in scan order
    pub(super) scan_next: Option<EntryId>,
}

impl Entry {
    /// Create an entry for `term` and open a doclist at `rowid`.
    pub(super) fn new(term: &[u8], rowid: i64) -> Result<Self> {
        let mut key = Vec::new();
        key.try_reserve_exact(term.len())?;
        key.extend_from_slice(term);

        let mut data = Vec::new();
        data.try_reserve_exact(INITIAL_CAPACITY)?;
        put_varint(&mut data, rowid as u64);
        let size_slot = data.len();
        data.extend_from_slice(&[0; 4]);

        Ok(Self {
            key,
            data,
            size_slot,
            last_rowid: rowid,
            last_column: 0,
            last_position: 0,
            hash_next: None,
            scan_next: None,
        })
    }

    pub(super) fn key(&self) -> &[u8] {
        &self.key
    }

    /// Bytes of doclist payload currently in use.
    pub(super) fn len(&self) -> usize {
        self.data.len()
    }

    /// The raw doclist payload. Only meaningful after the current
    /// poslist size has been back-patched.
    pub(super) fn doclist(&self) -> &[u8] {
        &self.data
    }

    /// Ensure the worst-case append fits, doubling the buffer if fewer
    /// than [`MAX_APPEND`] bytes of tail space remain.
    pub(super) fn reserve_append(&mut self) -> Result<()> {
        if self.data.capacity() - self.data.len() < MAX_APPEND {
            let doubled = self.data.capacity() * 2;
            self.data.try_reserve_exact(doubled - self.data.len())?;
        }
        Ok(())
    }

    /// Append one token occurrence. The caller must have reserved
    /// capacity via [`reserve_append`](Self::reserve_append).
    ///
    /// A negative `column` is a deletion marker: only the rowid delta
    /// and a size slot (patched to zero) are recorded.
    pub(super) fn append(&mut self, rowid: i64, column: i32, position: i32) {
        debug_assert!(rowid >= self.last_rowid);

        // New document: close out the previous poslist, then write the
        // rowid delta and reserve a fresh size slot.
        if rowid != self.last_rowid {
            self.finalize_poslist_size();
            put_varint(&mut self.data, (rowid - self.last_rowid) as u64);
            self.size_slot = self.data.len();
            self.data.extend_from_slice(&[0; 4]);
            self.last_column = 0;
            self.last_position = 0;
            self.last_rowid = rowid;
        }

        if column >= 0 {
            debug_assert!(column >= self.last_column);
            if column != self.last_column {
                self.data.push(0x01);
                put_varint(&mut self.data, column as u64);
                self.last_column = column;
                self.last_position = 0;
            }

            // Values 0 and 1 are reserved for the on-disk terminator
            // and the column marker, hence the +2 bias.
            put_varint(&mut self.data, (position - self.last_position + 2) as u64);
            self.last_position = position;
        }
    }

    /// Back-patch the size of the current poslist into its 4-byte slot.
    pub(super) fn finalize_poslist_size(&mut self) {
        let size = (self.data.len() - self.size_slot - 4) as u32;
        put_varint32_fixed(&mut self.data[self.size_slot..self.size_slot + 4], size);
    }
}
