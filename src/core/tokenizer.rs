//! High-level byte-level tokenizer.
//!
//! [`Tokenizer`] wraps a byte segmenter with the conveniences a text-facing
//! caller wants: special-token bypass, an LRU cache for repeated chunks,
//! batch operations, and decoding back to text. The segmentation itself is
//! the finite-state single-best cover of [`segment`](super::segment).

use aho_corasick::AhoCorasick;
use lru::LruCache;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use thiserror::Error;

use super::builder::{BuildError, FstBuilder};
use super::config::DictConfig;
use super::segment::{SegmentError, Segmenter, TokenSpan};
use super::vocab::{build_decoder, load_vocab, load_vocab_file, VocabError};

/// Default cache size for segmented chunks.
const DEFAULT_CACHE_SIZE: usize = 4096;

/// Errors from the high-level tokenizer.
#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("vocabulary error: {0}")]
    Vocab(#[from] VocabError),
    #[error("vocabulary compilation error: {0}")]
    Build(#[from] BuildError),
    #[error("segmentation error: {0}")]
    Segment(#[from] SegmentError),
    #[error("aho-corasick build error: {0}")]
    AhoCorasick(#[from] aho_corasick::BuildError),
    #[error("decoding error: invalid UTF-8")]
    Utf8,
}

/// Byte-level single-best tokenizer.
///
/// # Key properties
///
/// - Finite-state segmentation: one DFA walk per start position enumerates
///   every vocabulary match; smaller ids (earlier-trained merges) win the
///   non-overlap selection.
/// - Aho-Corasick multi-pattern matching for special tokens
/// - FxHashMap for fast id lookups
/// - LRU cache for frequently segmented chunks
/// - Rayon parallelism for batch encoding/decoding
///
/// A tokenizer is immutable after construction (the cache is interior-mutable
/// behind a mutex) and safe to share across threads.
pub struct Tokenizer {
    segmenter: Segmenter<u8>,
    decoder: FxHashMap<i32, Vec<u8>>,
    unk_id: i32,
    special_tokens: FxHashMap<String, i32>,
    special_tokens_decoder: FxHashMap<i32, String>,
    special_token_strings: Vec<String>,
    special_matcher: Option<AhoCorasick>,
    chunk_cache: Mutex<LruCache<u64, Vec<i32>>>,
    cache_size: usize,
}

impl Tokenizer {
    /// Create a tokenizer from a byte→id entry map.
    ///
    /// # Arguments
    /// * `encoder` - Map of byte sequences to token ids
    /// * `special_tokens` - Map of special token strings to token ids
    /// * `unk_id` - Id labelling spans no vocabulary entry covers
    pub fn new(
        encoder: FxHashMap<Vec<u8>, i32>,
        special_tokens: FxHashMap<String, i32>,
        unk_id: i32,
    ) -> Result<Self, TokenizerError> {
        Self::with_cache_size(encoder, special_tokens, unk_id, DEFAULT_CACHE_SIZE)
    }

    /// Create a tokenizer with a custom chunk-cache size.
    pub fn with_cache_size(
        encoder: FxHashMap<Vec<u8>, i32>,
        special_tokens: FxHashMap<String, i32>,
        unk_id: i32,
        cache_size: usize,
    ) -> Result<Self, TokenizerError> {
        // Build the decode map before the encoder map is consumed by
        // compilation.
        let decoder = build_decoder(&encoder);

        let automata = FstBuilder::from_byte_entries(
            encoder.iter().map(|(entry, &id)| (entry.as_slice(), id)),
        )
        .build()?;
        let segmenter = Segmenter::from_config(&DictConfig::mealy(automata))?;

        let special_tokens_decoder: FxHashMap<i32, String> = special_tokens
            .iter()
            .map(|(k, v)| (*v, k.clone()))
            .collect();

        // Aho-Corasick automaton for special-token bypass
        let special_token_strings: Vec<String> = special_tokens.keys().cloned().collect();
        let special_matcher = if special_token_strings.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&special_token_strings)?)
        };

        let cache_size_nz = NonZeroUsize::new(cache_size.max(1)).unwrap();
        let chunk_cache = Mutex::new(LruCache::new(cache_size_nz));

        Ok(Self {
            segmenter,
            decoder,
            unk_id,
            special_tokens,
            special_tokens_decoder,
            special_token_strings,
            special_matcher,
            chunk_cache,
            cache_size,
        })
    }

    /// Create a tokenizer from raw vocabulary file bytes.
    pub fn from_bytes(
        vocab_data: &[u8],
        special_tokens: FxHashMap<String, i32>,
        unk_id: i32,
    ) -> Result<Self, TokenizerError> {
        let encoder = load_vocab(vocab_data)?;
        Self::new(encoder, special_tokens, unk_id)
    }

    /// Create a tokenizer from a vocabulary file path.
    pub fn from_file(
        vocab_path: &str,
        special_tokens: FxHashMap<String, i32>,
        unk_id: i32,
    ) -> Result<Self, TokenizerError> {
        let encoder = load_vocab_file(vocab_path)?;
        Self::new(encoder, special_tokens, unk_id)
    }

    /// Compute a fast hash for a byte slice to use as an LRU cache key.
    #[inline]
    fn hash_slice(slice: &[u8]) -> u64 {
        let mut hasher = FxHasher::default();
        slice.hash(&mut hasher);
        hasher.finish()
    }

    /// Segment one chunk to ids, with the whole-chunk fast path and caching.
    fn encode_chunk(&self, bytes: &[u8]) -> Result<Vec<i32>, TokenizerError> {
        // Fast path: the entire chunk is a single vocabulary entry.
        if let Some(id) = self
            .segmenter
            .automata()
            .accepts(bytes.iter().map(|&b| u32::from(b)))
        {
            return Ok(vec![id]);
        }

        // Check cache
        let hash = Self::hash_slice(bytes);
        if let Ok(mut cache) = self.chunk_cache.lock() {
            if let Some(cached) = cache.get(&hash) {
                return Ok(cached.clone());
            }
        }

        let spans = self.segmenter.segment(bytes, self.unk_id)?;
        let result: Vec<i32> = spans.iter().map(|span| span.id).collect();

        // Store in cache
        if let Ok(mut cache) = self.chunk_cache.lock() {
            cache.put(hash, result.clone());
        }

        Ok(result)
    }

    /// Encode text to token ids (special tokens in the input are segmented
    /// like any other bytes).
    pub fn encode(&self, text: &str) -> Result<Vec<i32>, TokenizerError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        self.encode_chunk(text.as_bytes())
    }

    /// Encode text with special-token handling: special tokens are emitted
    /// directly, the stretches between them are segmented.
    pub fn encode_with_special(&self, text: &str) -> Result<Vec<i32>, TokenizerError> {
        let Some(ref special_matcher) = self.special_matcher else {
            return self.encode(text);
        };

        let mut result = Vec::new();
        let mut last_end = 0;

        for m in special_matcher.find_iter(text.as_bytes()) {
            if m.start() > last_end {
                result.extend(self.encode(&text[last_end..m.start()])?);
            }

            let token_str = &self.special_token_strings[m.pattern().as_usize()];
            if let Some(&id) = self.special_tokens.get(token_str) {
                result.push(id);
            }

            last_end = m.end();
        }

        if last_end < text.len() {
            result.extend(self.encode(&text[last_end..])?);
        }

        Ok(result)
    }

    /// Segment text into spans carrying byte offsets, uncached.
    ///
    /// Spans with `to < from` are single-cell unknown gaps; see
    /// [`TokenSpan`].
    pub fn segment(&self, text: &str) -> Result<Vec<TokenSpan>, TokenizerError> {
        Ok(self.segmenter.segment(text.as_bytes(), self.unk_id)?)
    }

    /// Raw flat-triple protocol over text input; see
    /// [`Segmenter::segment_into`].
    pub fn segment_into(&self, text: &str, out: &mut [i32]) -> Result<usize, TokenizerError> {
        Ok(self
            .segmenter
            .segment_into(text.as_bytes(), self.unk_id, out)?)
    }

    /// Decode token ids back to bytes. Ids absent from the vocabulary and
    /// from the special-token set (the unknown id, typically) are skipped.
    pub fn decode_bytes(&self, tokens: &[i32]) -> Vec<u8> {
        let mut result = Vec::with_capacity(tokens.len() * 4);

        for token in tokens {
            if let Some(bytes) = self.decoder.get(token) {
                result.extend_from_slice(bytes);
            } else if let Some(special) = self.special_tokens_decoder.get(token) {
                result.extend_from_slice(special.as_bytes());
            }
        }

        result
    }

    /// Decode token ids to a string.
    pub fn decode(&self, tokens: &[i32]) -> Result<String, TokenizerError> {
        let bytes = self.decode_bytes(tokens);
        String::from_utf8(bytes).map_err(|_| TokenizerError::Utf8)
    }

    /// Decode token ids to a string, replacing invalid UTF-8 with the
    /// replacement character.
    pub fn decode_lossy(&self, tokens: &[i32]) -> String {
        String::from_utf8_lossy(&self.decode_bytes(tokens)).into_owned()
    }

    /// Batch encode multiple texts in parallel.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<i32>>, TokenizerError> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Batch encode multiple texts with special-token handling.
    pub fn encode_batch_with_special(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<i32>>, TokenizerError> {
        texts
            .par_iter()
            .map(|text| self.encode_with_special(text))
            .collect()
    }

    /// Batch decode multiple token lists in parallel.
    pub fn decode_batch(&self, token_lists: &[Vec<i32>]) -> Result<Vec<String>, TokenizerError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// Batch decode multiple token lists in parallel, replacing invalid
    /// UTF-8.
    pub fn decode_batch_lossy(&self, token_lists: &[Vec<i32>]) -> Vec<String> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode_lossy(tokens))
            .collect()
    }

    /// Vocabulary size as max token id + 1, special tokens included.
    pub fn vocab_size(&self) -> usize {
        let max_decoder_id = self.decoder.keys().max().copied().unwrap_or(0);
        let max_special_id = self.special_tokens.values().max().copied().unwrap_or(0);
        (max_decoder_id.max(max_special_id) + 1) as usize
    }

    /// The id labelling unknown spans.
    pub fn unk_id(&self) -> i32 {
        self.unk_id
    }

    /// The decode map (token id → bytes).
    pub fn decoder(&self) -> &FxHashMap<i32, Vec<u8>> {
        &self.decoder
    }

    /// The special tokens map.
    pub fn special_tokens(&self) -> &FxHashMap<String, i32> {
        &self.special_tokens
    }

    /// The special tokens decode map.
    pub fn special_tokens_decoder(&self) -> &FxHashMap<i32, String> {
        &self.special_tokens_decoder
    }

    /// Clear the chunk cache.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.chunk_cache.lock() {
            cache.clear();
        }
    }

    /// Number of cached chunks.
    pub fn cache_len(&self) -> usize {
        self.chunk_cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Clone for Tokenizer {
    fn clone(&self) -> Self {
        // Caches are not shared between clones.
        let cache_size_nz = NonZeroUsize::new(self.cache_size.max(1)).unwrap();
        let chunk_cache = Mutex::new(LruCache::new(cache_size_nz));

        let special_matcher = if self.special_token_strings.is_empty() {
            None
        } else {
            // Built once already; the pattern set is unchanged.
            Some(AhoCorasick::new(&self.special_token_strings).unwrap())
        };

        Self {
            segmenter: self.segmenter.clone(),
            decoder: self.decoder.clone(),
            unk_id: self.unk_id,
            special_tokens: self.special_tokens.clone(),
            special_tokens_decoder: self.special_tokens_decoder.clone(),
            special_token_strings: self.special_token_strings.clone(),
            special_matcher,
            chunk_cache,
            cache_size: self.cache_size,
        }
    }
}
