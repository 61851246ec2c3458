//! Core segmentation engine for segmentr.
//!
//! This module contains the finite-state single-best BPE segmenter with:
//! - Compiled Mealy-DFA vocabulary automata whose path sums form a minimal
//!   perfect hash over entries
//! - A six-phase segmentation core: match enumeration, unknown coalescing,
//!   priority sort, non-overlap selection, left-to-right emission, and a
//!   count-and-retry output protocol
//! - Vocabulary compilation from plain entry lists
//! - A high-level byte tokenizer with special tokens, caching, and batching
//!
//! # Architecture
//!
//! The core is organized into these components:
//!
//! - [`VocabAutomata`]: read-only facade over the compiled vocabulary (the
//!   transition tables, finality, and the path-sum → id lookup)
//! - [`FstBuilder`]: compiles `(entry, id)` lists into [`VocabAutomata`]
//! - [`DictConfig`]: one-shot configuration installing shared automata
//! - [`Segmenter`]: the single-best cover algorithm, generic over the input
//!   code-unit type
//! - [`Tokenizer`]: text-facing wrapper with special-token bypass, an LRU
//!   chunk cache, and Rayon batch operations
//! - [`vocab`]: vocabulary text-format loading

mod automaton;
mod builder;
mod config;
mod segment;
mod tokenizer;
pub mod vocab;

pub use automaton::{FsmKind, InfoMap, MealyDfa, StateId, VocabAutomata};
pub use builder::{BuildError, FstBuilder};
pub use config::DictConfig;
pub use segment::{SegmentError, Segmenter, Symbol, TokenSpan, MAX_INPUT_UNITS};
pub use tokenizer::{Tokenizer, TokenizerError};
pub use vocab::{build_decoder, load_vocab, load_vocab_file, VocabError};
