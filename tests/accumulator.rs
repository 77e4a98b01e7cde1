//! End-to-end tests for the pending-terms accumulator

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use pendex::doclist::{DoclistIter, PoslistIter};
use pendex::error::Result;
use pendex::{AccumulatorConfig, DoclistSink, PendingTerms};

#[derive(Default)]
struct CollectSink {
    terms: Vec<(Vec<u8>, Vec<(i64, Vec<u8>)>)>,
}

impl DoclistSink for CollectSink {
    fn on_term(&mut self, term: &[u8]) -> Result<()> {
        self.terms.push((term.to_vec(), Vec::new()));
        Ok(())
    }

    fn on_doc(&mut self, rowid: i64, poslist: &[u8]) -> Result<()> {
        let (_, docs) = self.terms.last_mut().unwrap();
        docs.push((rowid, poslist.to_vec()));
        Ok(())
    }

    fn on_term_end(&mut self) -> Result<()> {
        Ok(())
    }
}

fn accumulator() -> PendingTerms {
    PendingTerms::new(Rc::new(Cell::new(0))).unwrap()
}

/// Decode a raw doclist into `(rowid, [(column, position)])` records.
fn decode(doclist: &[u8]) -> Vec<(i64, Vec<(i32, i32)>)> {
    DoclistIter::new(doclist)
        .map(|(rowid, poslist)| (rowid, PoslistIter::new(poslist).collect()))
        .collect()
}

#[test]
fn test_rehash_keeps_every_term_reachable() {
    let mut pending = accumulator();
    for i in 0..2048u32 {
        let term = format!("t{i:04}");
        pending.write(i as i64 + 1, 0, 0, term.as_bytes()).unwrap();
    }

    for i in 0..2048u32 {
        let term = format!("t{i:04}");
        let doclist = pending.get_doclist(term.as_bytes()).unwrap();
        assert!(!doclist.is_empty(), "missing doclist for {term}");
    }

    let mut sink = CollectSink::default();
    pending.drain(&mut sink).unwrap();
    assert_eq!(sink.terms.len(), 2048);
    for pair in sink.terms.windows(2) {
        assert!(pair[0].0 < pair[1].0);
    }
}

#[test]
fn test_slot_count_does_not_affect_output() {
    let writes: Vec<(i64, i32, i32, &[u8])> = vec![
        (1, 0, 0, b"wind"),
        (1, 0, 3, b"mill"),
        (1, 1, 0, b"wind"),
        (2, 0, 1, b"water"),
        (2, 0, 2, b"wind"),
        (3, -1, 0, b"mill"),
        (3, 0, 5, b"waterfall"),
        (7, 2, 9, b"wind"),
    ];

    let mut outputs = Vec::new();
    for initial_slots in [4, 1024] {
        let config = AccumulatorConfig {
            initial_slots,
            ..AccumulatorConfig::default()
        };
        let mut pending =
            PendingTerms::with_config(Rc::new(Cell::new(0)), &config).unwrap();
        for &(rowid, column, position, term) in &writes {
            pending.write(rowid, column, position, term).unwrap();
        }

        let mut doclists = Vec::new();
        for term in [&b"wind"[..], &b"mill"[..], &b"water"[..], &b"waterfall"[..]] {
            doclists.push(pending.get_doclist(term).unwrap().to_vec());
        }

        let mut sink = CollectSink::default();
        pending.drain(&mut sink).unwrap();
        outputs.push((doclists, sink.terms));
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_multi_term_roundtrip() {
    let mut pending = accumulator();
    pending.write(1, 0, 0, b"quick").unwrap();
    pending.write(1, 0, 1, b"brown").unwrap();
    pending.write(1, 1, 0, b"quick").unwrap();
    pending.write(5, 0, 2, b"brown").unwrap();
    pending.write(5, 3, 0, b"brown").unwrap();

    let quick = decode(pending.get_doclist(b"quick").unwrap());
    assert_eq!(quick, vec![(1, vec![(0, 0), (1, 0)])]);

    let brown = decode(pending.get_doclist(b"brown").unwrap());
    assert_eq!(brown, vec![(1, vec![(0, 1)]), (5, vec![(0, 2), (3, 0)])]);
}

#[test]
fn test_tombstone_then_reinsert_under_other_terms() {
    let mut pending = accumulator();
    pending.write(4, 0, 0, b"doomed").unwrap();
    pending.write(9, -1, 0, b"doomed").unwrap();

    let docs = decode(pending.get_doclist(b"doomed").unwrap());
    assert_eq!(docs, vec![(4, vec![(0, 0)]), (9, vec![])]);
}

#[test]
fn test_counter_shared_with_caller() {
    let counter = Rc::new(Cell::new(0));
    let mut pending = PendingTerms::new(Rc::clone(&counter)).unwrap();
    assert_eq!(counter.get(), 0);

    pending.write(1, 0, 0, b"a").unwrap();
    pending.write(1, 0, 0, b"b").unwrap();
    let after_writes = counter.get();
    assert!(after_writes > 0);

    let sum = pending.get_doclist(b"a").unwrap().len() + pending.get_doclist(b"b").unwrap().len();
    assert_eq!(after_writes, sum);

    let mut sink = CollectSink::default();
    pending.drain(&mut sink).unwrap();
    assert_eq!(counter.get(), 0);
}

#[test]
fn test_binary_terms_sort_unsigned() {
    let mut pending = accumulator();
    for term in [&[0x7fu8][..], &[0xff], &[0x01], &[0x80], &[0x01, 0x00]] {
        pending.write(1, 0, 0, term).unwrap();
    }

    let mut sink = CollectSink::default();
    pending.drain(&mut sink).unwrap();
    let terms: Vec<_> = sink.terms.iter().map(|(t, _)| t.clone()).collect();
    assert_eq!(
        terms,
        vec![
            vec![0x01],
            vec![0x01, 0x00],
            vec![0x7f],
            vec![0x80],
            vec![0xff]
        ]
    );
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    /// A document: ascending rowids are assigned by index; each token
    /// is placed at its offset within the document, column 0.
    fn docs_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
        proptest::collection::vec(
            proptest::collection::vec("[a-d]{1,4}", 0..12),
            0..20,
        )
    }

    /// Replay `docs` into a fresh accumulator and return it with its
    /// byte counter.
    fn build(docs: &[Vec<String>], initial_slots: usize) -> (PendingTerms, Rc<Cell<usize>>) {
        let counter = Rc::new(Cell::new(0));
        let config = AccumulatorConfig {
            initial_slots,
            ..AccumulatorConfig::default()
        };
        let mut pending = PendingTerms::with_config(Rc::clone(&counter), &config).unwrap();
        for (i, doc) in docs.iter().enumerate() {
            let rowid = i as i64 + 1;
            for (pos, token) in doc.iter().enumerate() {
                pending.write(rowid, 0, pos as i32, token.as_bytes()).unwrap();
            }
        }
        (pending, counter)
    }

    /// The per-term `(rowid, positions)` records the accumulator should
    /// reproduce.
    fn expected(docs: &[Vec<String>]) -> BTreeMap<Vec<u8>, Vec<(i64, Vec<i32>)>> {
        let mut map: BTreeMap<Vec<u8>, Vec<(i64, Vec<i32>)>> = BTreeMap::new();
        for (i, doc) in docs.iter().enumerate() {
            let rowid = i as i64 + 1;
            for (pos, token) in doc.iter().enumerate() {
                let postings = map.entry(token.as_bytes().to_vec()).or_default();
                match postings.last_mut() {
                    Some((last, positions)) if *last == rowid => positions.push(pos as i32),
                    _ => postings.push((rowid, vec![pos as i32])),
                }
            }
        }
        map
    }

    proptest! {
        #[test]
        fn roundtrips_every_term(docs in docs_strategy()) {
            let (mut pending, _) = build(&docs, 1024);
            for (term, postings) in expected(&docs) {
                let doclist = pending.get_doclist(&term).unwrap().to_vec();
                let decoded: Vec<_> = decode(&doclist)
                    .into_iter()
                    .map(|(rowid, positions)| {
                        (rowid, positions.into_iter().map(|(_, p)| p).collect::<Vec<_>>())
                    })
                    .collect();
                prop_assert_eq!(decoded, postings);
            }
        }

        #[test]
        fn drains_in_ascending_key_order(docs in docs_strategy()) {
            let (mut pending, _) = build(&docs, 1024);
            let mut sink = CollectSink::default();
            pending.drain(&mut sink).unwrap();

            let drained: Vec<_> = sink.terms.iter().map(|(t, _)| t.clone()).collect();
            let expected_terms: Vec<_> = expected(&docs).into_keys().collect();
            prop_assert_eq!(drained, expected_terms);
            prop_assert!(pending.is_empty());
        }

        #[test]
        fn counter_matches_payload_sum(docs in docs_strategy()) {
            let (mut pending, counter) = build(&docs, 1024);
            let sum: usize = expected(&docs)
                .keys()
                .map(|term| pending.get_doclist(term).unwrap().len())
                .sum();
            prop_assert_eq!(counter.get(), sum);
        }

        #[test]
        fn output_is_slot_count_invariant(docs in docs_strategy()) {
            let (mut small, _) = build(&docs, 2);
            let (mut large, _) = build(&docs, 4096);

            let mut small_sink = CollectSink::default();
            let mut large_sink = CollectSink::default();
            small.drain(&mut small_sink).unwrap();
            large.drain(&mut large_sink).unwrap();
            prop_assert_eq!(small_sink.terms, large_sink.terms);
        }
    }
}
