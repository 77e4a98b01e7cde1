//! Read-side decoders for accumulated doclists
//!
//! [`PendingTerms`](crate::PendingTerms) hands out doclists as raw
//! bytes; these iterators decode them back into `(rowid, poslist)` and
//! `(column, position)` streams for consumers that inspect pending
//! content instead of copying it straight into a segment.

use crate::varint::{get_varint, get_varint32_fixed};

/// Iterator over the documents of one accumulated doclist.
///
/// Yields `(rowid, poslist_bytes)` per document, reconstructing rowids
/// from their deltas. The poslist slice excludes the size slot.
pub struct DoclistIter<'a> {
    data: &'a [u8],
    offset: usize,
    rowid: i64,
}

impl<'a> DoclistIter<'a> {
    pub fn new(doclist: &'a [u8]) -> Self {
        Self {
            data: doclist,
            offset: 0,
            rowid: 0,
        }
    }
}

impl<'a> Iterator for DoclistIter<'a> {
    type Item = (i64, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let (delta, n) = get_varint(&self.data[self.offset..]);
        self.offset += n;
        self.rowid = self.rowid.wrapping_add(delta as i64);

        let (size, _) = get_varint32_fixed(&self.data[self.offset..self.offset + 4]);
        self.offset += 4;
        let poslist = &self.data[self.offset..self.offset + size as usize];
        self.offset += size as usize;

        Some((self.rowid, poslist))
    }
}

/// Iterator over one position list, yielding `(column, position)`.
///
/// Handles the `0x01` column marker and the +2 position bias. The
/// on-disk `0x00` terminator never appears in accumulator output.
pub struct PoslistIter<'a> {
    data: &'a [u8],
    offset: usize,
    column: i32,
    last_position: i32,
}

impl<'a> PoslistIter<'a> {
    pub fn new(poslist: &'a [u8]) -> Self {
        Self {
            data: poslist,
            offset: 0,
            column: 0,
            last_position: 0,
        }
    }

    /// Decode a drain-framed poslist, where the bytes start with the
    /// poslist size as a varint.
    pub fn from_framed(framed: &'a [u8]) -> Self {
        let (size, n) = get_varint(framed);
        Self::new(&framed[n..n + size as usize])
    }
}

impl<'a> Iterator for PoslistIter<'a> {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        if self.data[self.offset] == 0x01 {
            self.offset += 1;
            let (column, n) = get_varint(&self.data[self.offset..]);
            self.offset += n;
            self.column = column as i32;
            self.last_position = 0;
        }

        let (value, n) = get_varint(&self.data[self.offset..]);
        self.offset += n;
        self.last_position += value as i32 - 2;

        Some((self.column, self.last_position))
    }
}
