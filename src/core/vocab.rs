//! Vocabulary text-format loading.
//!
//! Vocabularies are exchanged as a simple text format where each line holds a
//! base64-encoded entry (the raw byte sequence), a space separator, and the
//! entry's integer token id:
//!
//! ```text
//! SGVsbG8= 0
//! V29ybGQ= 1
//! IQ== 2
//! ```
//!
//! Ids encode merge-training order: smaller id, earlier-trained merge, higher
//! segmentation priority. The loader produces the byte→id map that
//! [`FstBuilder`](super::FstBuilder) compiles into automata tables.

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Errors from loading a vocabulary file.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("invalid base64 encoding: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid line format: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load a vocabulary from raw file bytes.
///
/// Format: `base64_entry id\n` per line; blank lines are skipped.
pub fn load_vocab(data: &[u8]) -> Result<FxHashMap<Vec<u8>, i32>, VocabError> {
    let mut encoder = FxHashMap::default();

    for line in data.split(|&b| b == b'\n') {
        if line.is_empty() {
            continue;
        }

        let space_pos = line
            .iter()
            .rposition(|&b| b == b' ')
            .ok_or_else(|| VocabError::Parse("missing space separator".to_string()))?;

        let entry_b64 = &line[..space_pos];
        let id_str = &line[space_pos + 1..];

        let entry = STANDARD.decode(entry_b64)?;

        let id_str = std::str::from_utf8(id_str)
            .map_err(|_| VocabError::Parse("invalid UTF-8 in id".to_string()))?;
        let id: i32 = id_str
            .trim()
            .parse()
            .map_err(|_| VocabError::Parse(format!("invalid id: {}", id_str)))?;

        encoder.insert(entry, id);
    }

    Ok(encoder)
}

/// Load a vocabulary from a file path.
pub fn load_vocab_file(path: &str) -> Result<FxHashMap<Vec<u8>, i32>, VocabError> {
    let data = std::fs::read(path)?;
    load_vocab(&data)
}

/// Build the id → bytes inverse map used for decoding.
pub fn build_decoder(encoder: &FxHashMap<Vec<u8>, i32>) -> FxHashMap<i32, Vec<u8>> {
    encoder.iter().map(|(k, v)| (*v, k.clone())).collect()
}
