//! Tokenizer definition loading.
//!
//! A tokenizer definition is a single JSON record bundling everything the
//! encoder needs:
//!
//! - `vocab`: token string to token id
//! - `merges`: ordered merge pairs, earlier pairs merge first
//! - `specialTokens`: literal strings that are never split
//! - `config`: the chunk-splitting pattern and the base unit of the vocabulary
//!
//! # Example Format
//!
//! ```text
//! {
//!   "vocab": {"a": 0, "b": 1, "ab": 2, "<|endoftext|>": 3},
//!   "merges": [["a", "b"]],
//!   "specialTokens": ["<|endoftext|>"],
//!   "config": {"splitRegex": "\\S+|\\s+"}
//! }
//! ```
//!
//! Merges may also be written in the space-joined form used by HuggingFace
//! files (`"a b"`). The loader validates the whole record up front; a
//! definition that passes [`Vocabulary::build`] never produces a merge whose
//! halves or result lack an id.

use std::fmt;
use std::path::Path;

use log::{debug, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that make a tokenizer definition unusable.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Invalid definition JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Token id {id} is shared by {first:?} and {second:?}")]
    IdCollision {
        id: u32,
        first: String,
        second: String,
    },
    #[error("Empty token string in vocabulary (id {0})")]
    EmptyToken(u32),
    #[error("Merge rank {rank}: {side} half {symbol:?} is not in the vocabulary")]
    UnresolvedMergeHalf {
        rank: usize,
        side: MergeSide,
        symbol: String,
    },
    #[error("Merge rank {rank}: merged symbol {merged:?} is not in the vocabulary")]
    UnresolvedMergeResult { rank: usize, merged: String },
    #[error("Special token {0:?} is not in the vocabulary")]
    UnknownSpecialToken(String),
    #[error("Token {token:?} is not spelled in the byte-level alphabet")]
    BaseUnitMismatch { token: String },
    #[error("Invalid split pattern: {0}")]
    InvalidPattern(#[from] Box<fancy_regex::Error>),
    #[cfg(feature = "pcre2")]
    #[error("Invalid split pattern (PCRE2): {0}")]
    InvalidPcre2Pattern(#[from] pcre2::Error),
}

impl From<fancy_regex::Error> for DefinitionError {
    fn from(err: fancy_regex::Error) -> Self {
        DefinitionError::InvalidPattern(Box::new(err))
    }
}

/// Which half of a merge pair failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSide {
    Left,
    Right,
}

impl fmt::Display for MergeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeSide::Left => f.write_str("left"),
            MergeSide::Right => f.write_str("right"),
        }
    }
}

/// Granularity of the symbols a chunk is split into before merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseUnit {
    /// One symbol per Unicode code point.
    #[default]
    Char,
    /// One symbol per UTF-8 byte, spelled with the GPT-2 byte-to-char table.
    ByteLevel,
}

/// The `config` block of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizerConfig {
    /// Pattern used to pre-split text into chunks before BPE.
    pub split_regex: String,
    #[serde(default)]
    pub base_unit: BaseUnit,
}

/// A single merge rule as written in the definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMerge", into = "(String, String)")]
pub struct MergePair {
    pub left: String,
    pub right: String,
}

impl MergePair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl From<MergePair> for (String, String) {
    fn from(pair: MergePair) -> Self {
        (pair.left, pair.right)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMerge {
    Pair(String, String),
    Joined(String),
}

impl TryFrom<RawMerge> for MergePair {
    type Error = String;

    fn try_from(raw: RawMerge) -> Result<Self, Self::Error> {
        match raw {
            RawMerge::Pair(left, right) => Ok(MergePair { left, right }),
            RawMerge::Joined(joined) => match joined.split_once(' ') {
                Some((left, right)) if !right.contains(' ') => Ok(MergePair::new(left, right)),
                _ => Err(format!("Invalid merge entry: {joined:?}")),
            },
        }
    }
}

/// The raw definition record, as bundled with an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizerDefinition {
    pub vocab: FxHashMap<String, u32>,
    pub merges: Vec<MergePair>,
    #[serde(default)]
    pub special_tokens: Vec<String>,
    pub config: TokenizerConfig,
}

/// Parse a tokenizer definition from raw JSON bytes.
pub fn load_definition(data: &[u8]) -> Result<TokenizerDefinition, DefinitionError> {
    Ok(serde_json::from_slice(data)?)
}

/// Parse a tokenizer definition from a JSON file.
pub fn load_definition_file(path: impl AsRef<Path>) -> Result<TokenizerDefinition, DefinitionError> {
    let data = std::fs::read(path)?;
    load_definition(&data)
}

/// What a merge pair turns into and when it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRule {
    /// Position in the merge table; lower merges first.
    pub rank: u32,
    /// Id of the concatenated symbol.
    pub merged: u32,
}

/// Validated lookup tables derived from a definition.
///
/// Merge rules are keyed by the ids of their halves so the merge loop never
/// has to build strings.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    encoder: FxHashMap<String, u32>,
    decoder: FxHashMap<u32, String>,
    merges: FxHashMap<(u32, u32), MergeRule>,
}

impl Vocabulary {
    /// Build forward, reverse and merge tables, rejecting inconsistent input.
    pub fn build(
        encoder: FxHashMap<String, u32>,
        merge_pairs: &[MergePair],
    ) -> Result<Self, DefinitionError> {
        let mut decoder: FxHashMap<u32, String> = FxHashMap::default();
        decoder.reserve(encoder.len());

        for (token, &id) in &encoder {
            if token.is_empty() {
                return Err(DefinitionError::EmptyToken(id));
            }
            if let Some(existing) = decoder.insert(id, token.clone()) {
                // Sorted so the error does not depend on hash iteration order
                let (first, second) = if existing <= *token {
                    (existing, token.clone())
                } else {
                    (token.clone(), existing)
                };
                return Err(DefinitionError::IdCollision { id, first, second });
            }
        }

        let mut merges = FxHashMap::default();
        merges.reserve(merge_pairs.len());

        for (rank, pair) in merge_pairs.iter().enumerate() {
            let left = *encoder
                .get(&pair.left)
                .ok_or_else(|| DefinitionError::UnresolvedMergeHalf {
                    rank,
                    side: MergeSide::Left,
                    symbol: pair.left.clone(),
                })?;
            let right = *encoder
                .get(&pair.right)
                .ok_or_else(|| DefinitionError::UnresolvedMergeHalf {
                    rank,
                    side: MergeSide::Right,
                    symbol: pair.right.clone(),
                })?;

            let joined = format!("{}{}", pair.left, pair.right);
            let merged = *encoder
                .get(&joined)
                .ok_or(DefinitionError::UnresolvedMergeResult {
                    rank,
                    merged: joined,
                })?;

            if merges.contains_key(&(left, right)) {
                warn!(
                    "Ignoring duplicate merge ({:?}, {:?}) at rank {}",
                    pair.left, pair.right, rank
                );
                continue;
            }
            merges.insert(
                (left, right),
                MergeRule {
                    rank: rank as u32,
                    merged,
                },
            );
        }

        debug!(
            "Built vocabulary: {} tokens, {} merge rules",
            encoder.len(),
            merges.len()
        );

        Ok(Self {
            encoder,
            decoder,
            merges,
        })
    }

    #[inline]
    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.encoder.get(token).copied()
    }

    #[inline]
    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.decoder.get(&id).map(String::as_str)
    }

    /// Look up the merge rule for two adjacent symbols.
    #[inline]
    pub fn merge_rule(&self, left: u32, right: u32) -> Option<MergeRule> {
        self.merges.get(&(left, right)).copied()
    }

    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    pub fn merge_count(&self) -> usize {
        self.merges.len()
    }

    /// Largest id in the vocabulary, if any.
    pub fn max_id(&self) -> Option<u32> {
        self.decoder.keys().max().copied()
    }

    /// Get the encoder map (token string -> ID).
    pub fn encoder(&self) -> &FxHashMap<String, u32> {
        &self.encoder
    }

    /// Get the decoder map (token ID -> string).
    pub fn decoder(&self) -> &FxHashMap<u32, String> {
        &self.decoder
    }
}
