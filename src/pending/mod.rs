//! Pending-terms accumulator
//!
//! In-memory `term -> doclist` accumulation for a write transaction,
//! flushed into a level-0 segment at commit time.
//!
//! # Architecture
//!
//! - `entry`: per-term append-only doclist encoder
//! - `hash`: bucket-chained hash table over an entry arena
//! - `scan`: key-ordered enumeration (destructive drain or cursor walk)

mod entry;
mod hash;
mod scan;

pub use hash::PendingTerms;
pub use scan::DoclistSink;
