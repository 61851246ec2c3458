//! Invariant checks for the segmenter output shape.
//!
//! Every call must produce a triple count divisible by three, in-bounds
//! spans, strictly increasing starts, non-overlapping vocabulary arcs, a
//! full positional cover, and byte-identical results across repeated and
//! freshly-configured runs.

use segmentr::{DictConfig, FstBuilder, Segmenter, TokenSpan};

const UNK: i32 = 99;

fn byte_segmenter(entries: &[(&[u8], i32)]) -> Segmenter<u8> {
    let automata = FstBuilder::from_byte_entries(entries.iter().copied())
        .build()
        .unwrap();
    Segmenter::from_config(&DictConfig::mealy(automata)).unwrap()
}

fn toy_entries() -> Vec<(&'static [u8], i32)> {
    vec![
        (&b"a"[..], 5),
        (b"b", 6),
        (b"ab", 3),
        (b"abc", 2),
        (b"bc", 4),
    ]
}

/// Check every shape invariant on one input and return the spans.
fn check_invariants(seg: &Segmenter<u8>, input: &[u8]) -> Vec<TokenSpan> {
    let n = input.len();

    // Flat protocol: aligned count, in-bounds triples.
    let mut out = vec![0i32; n * 3 + 3];
    let needed = seg.segment_into(input, UNK, &mut out).unwrap();
    assert_eq!(needed % 3, 0, "triple count must be a multiple of 3");
    out.truncate(needed);

    let spans = seg.segment(input, UNK).unwrap();
    assert_eq!(spans.len() * 3, needed, "span API and flat API disagree");
    for (k, span) in spans.iter().enumerate() {
        assert_eq!(out[3 * k], span.id);
        assert_eq!(out[3 * k + 1], span.from as i32);
        assert_eq!(out[3 * k + 2], span.to as i32);
    }

    // Boundaries, monotonicity, non-overlap, gap filling.
    let mut covered = vec![false; n];
    let mut prev_from = None;
    for span in &spans {
        assert!(span.from < n, "start out of bounds: {:?}", span);
        if span.is_gap() {
            assert_eq!(span.to, 0, "gap spans keep the zero cover-map end");
            assert_eq!(span.id, UNK, "gap spans carry the unknown id");
        } else {
            assert!(span.to < n, "end out of bounds: {:?}", span);
        }
        if let Some(prev) = prev_from {
            assert!(span.from > prev, "starts must strictly increase");
        }
        prev_from = Some(span.from);

        let cells = if span.is_gap() {
            span.from..span.from + 1
        } else {
            span.from..span.to + 1
        };
        for i in cells {
            assert!(!covered[i], "position {} covered twice", i);
            covered[i] = true;
        }
    }
    assert!(
        covered.iter().all(|&c| c),
        "every position must be covered exactly once"
    );

    // Determinism.
    assert_eq!(spans, seg.segment(input, UNK).unwrap());

    spans
}

#[test]
fn invariants_hold_on_fixed_inputs() {
    let seg = byte_segmenter(&toy_entries());
    for input in [
        &b""[..],
        b"a",
        b"x",
        b"abc",
        b"abcabcabc",
        b"xyzzy",
        b"axbxcx",
        b"cba",
        b"aabbcc",
        b"abcxabc",
        b"bcbcbc",
    ] {
        check_invariants(&seg, input);
    }
}

/// Deterministic pseudo-random sweep over a small alphabet. No RNG crate:
/// a fixed linear congruential generator keeps the cases reproducible.
#[test]
fn invariants_hold_on_generated_inputs() {
    let seg = byte_segmenter(&toy_entries());
    let alphabet = b"abcx";

    let mut state = 0x2545_F491_4F6C_DD1Du64;
    for len in 0..48 {
        let mut input = Vec::with_capacity(len);
        for _ in 0..len {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            input.push(alphabet[(state >> 33) as usize % alphabet.len()]);
        }
        check_invariants(&seg, &input);
    }
}

/// Two segmenters built from the same configuration, and a segmenter built
/// from a fresh identical configuration, all produce identical output.
#[test]
fn configuration_is_idempotent() {
    let automata = FstBuilder::from_byte_entries(toy_entries().iter().copied())
        .build()
        .unwrap();
    let config = DictConfig::mealy(automata);
    let first: Segmenter<u8> = Segmenter::from_config(&config).unwrap();
    let second: Segmenter<u8> = Segmenter::from_config(&config).unwrap();

    let fresh_automata = FstBuilder::from_byte_entries(toy_entries().iter().copied())
        .build()
        .unwrap();
    let fresh: Segmenter<u8> = Segmenter::from_config(&DictConfig::mealy(fresh_automata)).unwrap();

    for input in [&b"abcabc"[..], b"xaxbxc", b"abcx"] {
        let expected = first.segment(input, UNK).unwrap();
        assert_eq!(expected, second.segment(input, UNK).unwrap());
        assert_eq!(expected, fresh.segment(input, UNK).unwrap());
    }
}

/// A candidate that abuts committed arcs on both sides is committed: the
/// cell after its end is the *start* of a committed arc, not an interior
/// cell, so the overlap test passes.
#[test]
fn abutting_both_sides_commits() {
    let seg = byte_segmenter(&[(b"ab", 0), (b"xx", 9)]);
    let spans = check_invariants(&seg, b"abxxab");
    assert_eq!(
        spans,
        vec![
            TokenSpan {
                id: 0,
                from: 0,
                to: 1
            },
            TokenSpan {
                id: 9,
                from: 2,
                to: 3
            },
            TokenSpan {
                id: 0,
                from: 4,
                to: 5
            },
        ]
    );
}

/// A start whose vocabulary candidates all lose selection is backfilled at
/// emission time as a single cell with the zero cover-map end (`to = 0`),
/// not at candidate time.
#[test]
fn losing_start_backfills_one_cell() {
    // `bcd` (0) wins over `ab` (5); position 1 then has no committed arc
    // and no unknown candidate, because its start produced a match.
    let seg = byte_segmenter(&[(b"bcd", 0), (b"ab", 5), (b"x", 1)]);
    let spans = check_invariants(&seg, b"xabcd");
    assert_eq!(
        spans,
        vec![
            TokenSpan {
                id: 1,
                from: 0,
                to: 0
            },
            TokenSpan {
                id: UNK,
                from: 1,
                to: 0
            },
            TokenSpan {
                id: 0,
                from: 2,
                to: 4
            },
        ]
    );
    assert!(spans[1].is_gap());
    assert_eq!(spans[1].len(), 1);
}

/// A coalesced unknown arc that loses selection leaves its uncovered tail
/// to the emitter.
#[test]
fn losing_unknown_arc_backfills() {
    let seg = byte_segmenter(&[(b"abc", 0)]);
    // Starts 1..=3 all fail to match, coalescing into the candidate
    // (1, 3, UNK); it overlaps the committed `abc` and loses, so position 3
    // is backfilled.
    let spans = check_invariants(&seg, b"abcd");
    assert_eq!(
        spans,
        vec![
            TokenSpan {
                id: 0,
                from: 0,
                to: 2
            },
            TokenSpan {
                id: UNK,
                from: 3,
                to: 0
            },
        ]
    );
}

/// A whole-input vocabulary match always wins: position 0 is never
/// interior and the span runs to the end, so the arc passes the overlap
/// test no matter what committed before it.
#[test]
fn whole_input_entry_always_wins() {
    let seg = byte_segmenter(&[(b"x", 1), (b"y", 2), (b"xy", 50)]);
    let spans = check_invariants(&seg, b"xy");
    assert_eq!(
        spans,
        vec![TokenSpan {
            id: 50,
            from: 0,
            to: 1
        }]
    );
}

/// An unknown id colliding with a vocabulary id is treated as just another
/// id: the coalescer may extend a vocabulary arc that carries it.
#[test]
fn unknown_id_collision_is_permitted() {
    // `q` has id 7, and the caller also picks 7 as the unknown id. A
    // no-match start right after a `q` arc extends that arc.
    let seg = byte_segmenter(&[(b"q", 7)]);
    let spans = seg.segment(b"qz", 7).unwrap();
    assert_eq!(
        spans,
        vec![TokenSpan {
            id: 7,
            from: 0,
            to: 1
        }]
    );
}

/// One configured segmenter serves many threads; all mutable state is
/// call-local.
#[test]
fn concurrent_calls_share_one_instance() {
    let seg = byte_segmenter(&toy_entries());
    let expected = seg.segment(b"abcxabc", UNK).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    assert_eq!(seg.segment(b"abcxabc", UNK).unwrap(), expected);
                }
            });
        }
    });
}

/// Wide code units run through the same machinery.
#[test]
fn wide_unit_invariants() {
    let mut builder = FstBuilder::new();
    builder.push(&[0x10000, 0x10001], 0);
    builder.push(&[0x10000], 1);
    let seg: Segmenter<u32> =
        Segmenter::from_config(&DictConfig::mealy(builder.build().unwrap())).unwrap();

    let spans = seg.segment(&[0x10000, 0x10001, 0x2_0000], UNK).unwrap();
    assert_eq!(
        spans,
        vec![
            TokenSpan {
                id: 0,
                from: 0,
                to: 1
            },
            TokenSpan {
                id: UNK,
                from: 2,
                to: 2
            },
        ]
    );
}
