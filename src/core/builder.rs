//! Vocabulary compilation.
//!
//! Turns a set of `(symbol sequence, token id)` entries into the compiled
//! [`VocabAutomata`] tables. Entries are sorted lexicographically and inserted
//! into a trie; every edge is then assigned the number of accepting paths it
//! skips, so the output sum along any accepting path equals the matched
//! entry's lexicographic rank. That rank is the minimal-perfect-hash key the
//! segmenter resolves back to a token id.

use thiserror::Error;

use super::automaton::{InfoMap, MealyDfa, VocabAutomata};

/// Errors from vocabulary compilation.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("vocabulary contains no entries")]
    Empty,
    #[error("vocabulary entry {index} is empty")]
    EmptyEntry { index: usize },
    #[error("vocabulary entry {index} has negative id {id}")]
    NegativeId { index: usize, id: i32 },
    #[error("duplicate vocabulary entry {0:?}")]
    DuplicateEntry(Vec<u32>),
}

/// Incremental builder for a [`VocabAutomata`].
///
/// ```
/// use segmentr::FstBuilder;
///
/// let mut builder = FstBuilder::new();
/// builder.push(&[104, 105], 0); // "hi"
/// builder.push(&[104], 1); // "h"
/// let automata = builder.build().unwrap();
/// assert_eq!(automata.entry_count(), 2);
/// ```
#[derive(Default)]
pub struct FstBuilder {
    entries: Vec<(Vec<u32>, i32)>,
}

/// One trie node under construction.
struct Node {
    /// Children in symbol order; indices into the node arena.
    edges: Vec<(u32, usize)>,
    is_final: bool,
    /// Accepting paths in this node's subtree, this node included.
    subtree_finals: u32,
}

impl Node {
    fn new() -> Self {
        Self {
            edges: Vec::new(),
            is_final: false,
            subtree_finals: 0,
        }
    }
}

impl FstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one vocabulary entry. Validation happens in [`build`](Self::build).
    pub fn push(&mut self, symbols: &[u32], id: i32) {
        self.entries.push((symbols.to_vec(), id));
    }

    /// Builder pre-loaded with byte-level entries.
    pub fn from_byte_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a [u8], i32)>,
    {
        let mut builder = Self::new();
        for (bytes, id) in entries {
            let symbols: Vec<u32> = bytes.iter().map(|&b| u32::from(b)).collect();
            builder.entries.push((symbols, id));
        }
        builder
    }

    /// Compile the queued entries into automata tables.
    pub fn build(self) -> Result<VocabAutomata, BuildError> {
        let mut entries = self.entries;
        if entries.is_empty() {
            return Err(BuildError::Empty);
        }
        for (index, (symbols, id)) in entries.iter().enumerate() {
            if symbols.is_empty() {
                return Err(BuildError::EmptyEntry { index });
            }
            if *id < 0 {
                return Err(BuildError::NegativeId { index, id: *id });
            }
        }

        // Lexicographic order is the MPH key order: the entry at rank r gets
        // path sum r.
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for pair in entries.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(BuildError::DuplicateEntry(pair[0].0.clone()));
            }
        }

        // Insert into the trie. Entries arrive sorted, so children of every
        // node come out in symbol order and new nodes always get larger
        // indices than their parent.
        let mut nodes = vec![Node::new()];
        let mut ids = Vec::with_capacity(entries.len());
        for (symbols, id) in &entries {
            let mut at = 0usize;
            for &symbol in symbols {
                at = match nodes[at].edges.last() {
                    Some(&(last_symbol, child)) if last_symbol == symbol => child,
                    _ => {
                        let child = nodes.len();
                        nodes.push(Node::new());
                        nodes[at].edges.push((symbol, child));
                        child
                    }
                };
            }
            nodes[at].is_final = true;
            ids.push(*id);
        }

        // Children have larger indices than parents, so one reverse pass
        // computes every subtree's accepting-path count.
        for at in (0..nodes.len()).rev() {
            let mut count = u32::from(nodes[at].is_final);
            for k in 0..nodes[at].edges.len() {
                count += nodes[nodes[at].edges[k].1].subtree_finals;
            }
            nodes[at].subtree_finals = count;
        }

        // Flatten to struct-of-arrays. An edge's weight is the count of
        // accepting paths that end strictly before anything reached through
        // it: the parent's own finality plus all earlier siblings' subtrees.
        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut symbols = Vec::new();
        let mut targets = Vec::new();
        let mut weights = Vec::new();
        let mut finals = Vec::with_capacity(nodes.len());
        offsets.push(0u32);
        for node in &nodes {
            let mut skipped = u32::from(node.is_final);
            for &(symbol, child) in &node.edges {
                symbols.push(symbol);
                targets.push(child as u32);
                weights.push(skipped);
                skipped += nodes[child].subtree_finals;
            }
            offsets.push(symbols.len() as u32);
            finals.push(node.is_final);
        }

        let dfa = MealyDfa::new(
            offsets.into_boxed_slice(),
            symbols.into_boxed_slice(),
            targets.into_boxed_slice(),
            weights.into_boxed_slice(),
            finals.into_boxed_slice(),
        );

        // Ids are unique per entry here, so key-to-index is the identity and
        // every info row is a single id.
        let entry_count = entries.len();
        let key_to_index: Box<[u32]> = (0..entry_count as u32).collect();
        let info_offsets: Box<[u32]> = (0..=entry_count as u32).collect();
        let index_to_info = InfoMap::new(info_offsets, ids.into_boxed_slice());

        Ok(VocabAutomata::new(dfa, key_to_index, index_to_info))
    }
}
