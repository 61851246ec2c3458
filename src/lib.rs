//! Segmentr - finite-state BPE segmenter producing single-best token covers.
//!
//! Given a vocabulary compiled into a deterministic automaton with
//! Mealy-style edge outputs, the segmenter covers an input sequence with
//! non-overlapping vocabulary tokens. Candidates are every vocabulary match
//! at every start position; smaller token ids (earlier-trained BPE merges)
//! win the selection, ties break left-most first, and spans nothing matches
//! are labelled with a caller-supplied unknown id.
//!
//! # Quick start
//!
//! ```
//! use rustc_hash::FxHashMap;
//! use segmentr::Tokenizer;
//!
//! let mut encoder = FxHashMap::default();
//! encoder.insert(b"ab".to_vec(), 0);
//! encoder.insert(b"a".to_vec(), 1);
//! encoder.insert(b"b".to_vec(), 2);
//!
//! let tokenizer = Tokenizer::new(encoder, FxHashMap::default(), 3).unwrap();
//! assert_eq!(tokenizer.encode("aba").unwrap(), vec![0, 1]);
//! ```
//!
//! # Lower-level API
//!
//! [`FstBuilder`] compiles entries into [`VocabAutomata`]; [`DictConfig`]
//! installs them into a [`Segmenter`], which exposes both an owned-span API
//! and the flat `(id, from, to)` triple protocol with count-and-retry
//! capacity handling. The segmenter is generic over the input code-unit
//! type ([`Symbol`]): the same vocabulary machinery drives narrow-byte and
//! wide-code-unit inputs.

pub mod core;

pub use self::core::{
    build_decoder, load_vocab, load_vocab_file, BuildError, DictConfig, FsmKind, FstBuilder,
    InfoMap, MealyDfa, SegmentError, Segmenter, StateId, Symbol, TokenSpan, Tokenizer,
    TokenizerError, VocabAutomata, VocabError, MAX_INPUT_UNITS,
};
