//! Single-best BPE segmentation.
//!
//! The segmenter covers an input sequence with non-overlapping vocabulary
//! tokens, preferring tokens with smaller ids. In a BPE vocabulary ids follow
//! merge-training order, so smaller id means earlier-trained merge; the
//! resulting cover is the single-best segmentation under that priority.
//!
//! One call runs six phases over call-local state:
//!
//! 1. one forward DFA walk per start position, recording every vocabulary
//!    match as a candidate arc `(start, end, id)`; the walk does not stop at
//!    the first match, longer matches are still candidates;
//! 2. starts with no match at all coalesce into contiguous unknown arcs;
//! 3. candidates sort by `(id, start)` ascending;
//! 4. a sweep over the sorted candidates commits every arc whose span is
//!    still free, tracked by a bitmap of interior cells;
//! 5. an emitter walks the committed cover left to right;
//! 6. triples are written flat into the caller's buffer under a
//!    count-and-retry capacity protocol.
//!
//! The segmenter itself is read-only after construction and safe to share
//! across threads.

use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use super::automaton::{FsmKind, VocabAutomata};
use super::config::DictConfig;

/// Upper bound on input length, in code units.
///
/// Positions and the flat `3 × triples` return value both travel through the
/// `i32` triple protocol, so a third of `i32::MAX` bounds either with room to
/// spare.
pub const MAX_INPUT_UNITS: usize = i32::MAX as usize / 3;

/// Input element type of a [`Segmenter`].
///
/// The automaton alphabet is `u32`; a symbol only has to widen into it. The
/// narrow-byte and wide-code-unit segmenters of one vocabulary differ in
/// nothing but this parameter.
pub trait Symbol: Copy + Send + Sync {
    fn as_u32(self) -> u32;
}

impl Symbol for u8 {
    #[inline]
    fn as_u32(self) -> u32 {
        u32::from(self)
    }
}

impl Symbol for u16 {
    #[inline]
    fn as_u32(self) -> u32 {
        u32::from(self)
    }
}

impl Symbol for u32 {
    #[inline]
    fn as_u32(self) -> u32 {
        self
    }
}

impl Symbol for char {
    #[inline]
    fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Errors from segmentation. Output-capacity shortfall is not an error; see
/// [`Segmenter::segment_into`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("expected a Mealy-DFA vocabulary, configuration declares {0:?}")]
    WrongFsmKind(FsmKind),
    #[error("configured vocabulary is empty")]
    EmptyVocab,
    #[error("input length {len} exceeds the {max}-unit limit")]
    InputTooLarge { len: usize, max: usize },
    #[error("no token id recorded for path sum {sum}: compiled vocabulary is corrupt")]
    CorruptModel { sum: u32 },
}

/// One emitted token: id plus the inclusive span `[from, to]` it covers.
///
/// A span with `to < from` is the single-cell unknown artifact: the start
/// `from` produced vocabulary matches, all of them lost selection, and the
/// emitter backfilled one cell with the unknown id, keeping `to` at its zero
/// cover-map value for bit-compatibility with the flat triple protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenSpan {
    pub id: i32,
    pub from: usize,
    pub to: usize,
}

impl TokenSpan {
    /// True for the backfilled single-cell unknown form.
    #[inline]
    pub fn is_gap(&self) -> bool {
        self.to < self.from
    }

    /// Covered length in code units.
    #[inline]
    pub fn len(&self) -> usize {
        if self.is_gap() {
            1
        } else {
            self.to - self.from + 1
        }
    }

    /// Always false: every span covers at least one cell.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A candidate arc: `input[start..=end]` matches the vocabulary entry `id`.
/// The unknown id also appears here, labelling coalesced no-match spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    start: u32,
    end: u32,
    id: i32,
}

/// Committed cover maps, both indexed by position.
///
/// `tos[i]` is the inclusive end of the arc starting at `i`, zero elsewhere;
/// `ids[i]` is that arc's id, the unknown id elsewhere.
struct Cover {
    tos: Vec<usize>,
    ids: Vec<i32>,
}

/// Single-best segmenter over code units of type `S`.
///
/// Construction installs the compiled vocabulary ([`DictConfig`]) once;
/// after that every call is pure and re-entrant, so one segmenter can serve
/// any number of threads concurrently.
pub struct Segmenter<S = u8> {
    automata: Arc<VocabAutomata>,
    _symbol: PhantomData<fn(S)>,
}

impl<S> Clone for Segmenter<S> {
    fn clone(&self) -> Self {
        Self {
            automata: Arc::clone(&self.automata),
            _symbol: PhantomData,
        }
    }
}

impl<S: Symbol> Segmenter<S> {
    /// Install the configuration. Fails up front on a wrong automaton kind or
    /// an empty vocabulary, so a constructed segmenter is always runnable.
    pub fn from_config(config: &DictConfig) -> Result<Self, SegmentError> {
        if config.fsm_kind() != FsmKind::MealyDfa {
            return Err(SegmentError::WrongFsmKind(config.fsm_kind()));
        }
        if config.automata().entry_count() == 0 {
            return Err(SegmentError::EmptyVocab);
        }
        Ok(Self {
            automata: Arc::clone(config.automata()),
            _symbol: PhantomData,
        })
    }

    /// The shared vocabulary automata.
    pub fn automata(&self) -> &VocabAutomata {
        &self.automata
    }

    /// Segment `input`, writing `(id, from, to)` triples flat into `out`
    /// (positions `3k`, `3k + 1`, `3k + 2`).
    ///
    /// Returns the number of `i32` slots required to hold every triple. When
    /// that exceeds `out.len()`, only the whole triples that fit are written
    /// and the caller retries with a larger buffer; a short buffer is not an
    /// error. Empty input returns 0 and writes nothing.
    pub fn segment_into(
        &self,
        input: &[S],
        unk_id: i32,
        out: &mut [i32],
    ) -> Result<usize, SegmentError> {
        if input.is_empty() {
            return Ok(0);
        }
        let cover = self.cover(input, unk_id)?;

        let mut needed = 0usize;
        let mut from = 0usize;
        while from < input.len() {
            let to = cover.tos[from];
            if needed + 3 <= out.len() {
                out[needed] = cover.ids[from];
                out[needed + 1] = from as i32;
                out[needed + 2] = to as i32;
            }
            needed += 3;
            // Covered arcs resume after their end; an uncovered start emits
            // its single backfilled cell and advances one position.
            from = from.max(to) + 1;
        }
        Ok(needed)
    }

    /// Segment `input` into an owned span list. Same cover as
    /// [`segment_into`](Self::segment_into), without the capacity protocol.
    pub fn segment(&self, input: &[S], unk_id: i32) -> Result<Vec<TokenSpan>, SegmentError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let cover = self.cover(input, unk_id)?;

        let mut spans = Vec::new();
        let mut from = 0usize;
        while from < input.len() {
            let to = cover.tos[from];
            spans.push(TokenSpan {
                id: cover.ids[from],
                from,
                to,
            });
            from = from.max(to) + 1;
        }
        Ok(spans)
    }

    /// Phases 1–4: enumerate candidates, coalesce unknowns, sort, select.
    fn cover(&self, input: &[S], unk_id: i32) -> Result<Cover, SegmentError> {
        let n = input.len();
        if n > MAX_INPUT_UNITS {
            return Err(SegmentError::InputTooLarge {
                len: n,
                max: MAX_INPUT_UNITS,
            });
        }

        let mut candidates = self.collect_arcs(input, unk_id)?;

        // Smaller ids first; ties left-most first. `(id, start)` is unique,
        // so an unstable sort is a total order here.
        candidates.sort_unstable_by_key(|c| (c.id, c.start));

        let mut tos = vec![0usize; n];
        let mut ids = vec![unk_id; n];
        let mut interior = vec![0u8; n];

        for c in &candidates {
            let (start, end) = (c.start as usize, c.end as usize);
            // Free exactly when the start is not inside a committed arc and
            // the cell after the end is not either. Two committed arcs may
            // abut a candidate on both sides; the candidate still commits.
            if interior[start] == 0 && (end + 1 == n || interior[end + 1] == 0) {
                tos[start] = end;
                ids[start] = c.id;
                interior[start + 1..=end].fill(1);
            }
        }

        Ok(Cover { tos, ids })
    }

    /// Phases 1–2: one forward walk per start position, with interleaved
    /// unknown coalescing.
    fn collect_arcs(&self, input: &[S], unk_id: i32) -> Result<Vec<Candidate>, SegmentError> {
        let fst = &*self.automata;
        let initial = fst.initial();

        let mut candidates: Vec<Candidate> = Vec::with_capacity(input.len());

        for start in 0..input.len() {
            let mut state = initial;
            let mut sum = 0u32;
            let mut matched = false;

            // Go as deep as the automaton allows from this start. Every
            // final state on the way is a candidate; keep walking after a
            // match, longer entries may still be ahead.
            for (i, unit) in input.iter().enumerate().skip(start) {
                let Some((next, weight)) = fst.step(state, unit.as_u32()) else {
                    break;
                };
                state = next;
                sum += weight;

                if fst.is_final(state) {
                    let id = fst
                        .lookup_id(sum)
                        .ok_or(SegmentError::CorruptModel { sum })?;
                    candidates.push(Candidate {
                        start: start as u32,
                        end: i as u32,
                        id,
                    });
                    matched = true;
                }
            }

            if !matched {
                // Nothing matched from this start: grow the previous unknown
                // arc if there is one, otherwise open a new one. The test is
                // plain id equality, even if a vocabulary id collides with
                // the unknown id.
                match candidates.last_mut() {
                    Some(prev) if prev.id == unk_id => prev.end = start as u32,
                    _ => candidates.push(Candidate {
                        start: start as u32,
                        end: start as u32,
                        id: unk_id,
                    }),
                }
            }
        }

        Ok(candidates)
    }
}
