//! Scenario tests for the single-best segmenter over a toy vocabulary.
//!
//! The vocabulary is chosen so that merged entries out-rank their parts:
//! `abc` (2) < `ab` (3) < `bc` (4) < `a` (5) < `b` (6), with 99 as the
//! unknown id.

use segmentr::{DictConfig, FstBuilder, Segmenter, TokenSpan};

const UNK: i32 = 99;

fn toy_segmenter() -> Segmenter<u8> {
    let automata = FstBuilder::from_byte_entries([
        (&b"a"[..], 5),
        (b"b", 6),
        (b"ab", 3),
        (b"abc", 2),
        (b"bc", 4),
    ])
    .build()
    .unwrap();
    Segmenter::from_config(&DictConfig::mealy(automata)).unwrap()
}

fn run(seg: &Segmenter<u8>, input: &[u8]) -> Vec<i32> {
    let mut out = vec![0i32; input.len() * 3 + 3];
    let needed = seg.segment_into(input, UNK, &mut out).unwrap();
    out.truncate(needed);
    out
}

/// The whole input matches `abc`, the lowest id; every other candidate
/// overlaps it and loses.
#[test]
fn test_lowest_id_covers_everything() {
    let seg = toy_segmenter();
    assert_eq!(run(&seg, b"abc"), vec![2, 0, 2]);
}

/// `ab` (3) beats the single-character cover `a` + `b` (5, 6).
#[test]
fn test_merge_beats_singles() {
    let seg = toy_segmenter();
    assert_eq!(run(&seg, b"ab"), vec![3, 0, 1]);
}

/// A known prefix followed by an unmatchable byte: one vocabulary arc plus
/// one single-cell unknown arc.
#[test]
fn test_known_then_unknown() {
    let seg = toy_segmenter();
    assert_eq!(run(&seg, b"ax"), vec![5, 0, 0, UNK, 1, 1]);
}

/// Consecutive unmatchable positions coalesce into one unknown arc before
/// sorting, not three single-cell arcs.
#[test]
fn test_all_unknown_coalesces() {
    let seg = toy_segmenter();
    assert_eq!(run(&seg, b"xyz"), vec![UNK, 0, 2]);
}

#[test]
fn test_empty_input() {
    let seg = toy_segmenter();
    let mut out = [7i32; 6];
    assert_eq!(seg.segment_into(b"", UNK, &mut out).unwrap(), 0);
    assert_eq!(out, [7; 6], "empty input must not write");
}

/// Capacity protocol: a short buffer still reports the needed size and
/// writes nothing partial; the retry succeeds.
#[test]
fn test_capacity_retry() {
    let seg = toy_segmenter();

    let mut short = [0i32; 2];
    assert_eq!(seg.segment_into(b"bc", UNK, &mut short).unwrap(), 3);
    assert_eq!(short, [0, 0], "no partial triple may be written");

    let mut exact = [0i32; 3];
    assert_eq!(seg.segment_into(b"bc", UNK, &mut exact).unwrap(), 3);
    assert_eq!(exact, [4, 0, 1]);
}

/// Only whole triples that fit are written; the count always reflects the
/// needed size.
#[test]
fn test_capacity_partial_fit() {
    let seg = toy_segmenter();
    let mut out = [0i32; 4];
    assert_eq!(seg.segment_into(b"ax", UNK, &mut out).unwrap(), 6);
    assert_eq!(out, [5, 0, 0, 0], "only the first whole triple fits");
}

/// The owned-span API reports the same cover as the flat protocol.
#[test]
fn test_spans_match_triples() {
    let seg = toy_segmenter();
    assert_eq!(
        seg.segment(b"ax", UNK).unwrap(),
        vec![
            TokenSpan {
                id: 5,
                from: 0,
                to: 0
            },
            TokenSpan {
                id: UNK,
                from: 1,
                to: 1
            },
        ]
    );
}

/// Ids and spans hold under repetition: `abcabc` covers as two `abc` arcs.
#[test]
fn test_repeated_pattern() {
    let seg = toy_segmenter();
    assert_eq!(run(&seg, b"abcabc"), vec![2, 0, 2, 2, 3, 5]);
}

/// Unknown stretches between matches stay separate arcs when a match sits
/// between them.
#[test]
fn test_unknowns_split_by_match() {
    let seg = toy_segmenter();
    assert_eq!(run(&seg, b"xabx"), vec![UNK, 0, 0, 3, 1, 2, UNK, 3, 3]);
}
