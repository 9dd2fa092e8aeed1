//! Core tokenization engine for tokenwire.
//!
//! # Architecture
//!
//! - [`Tokenizer`]: encode/decode API over an immutable definition, with
//!   special-token interception and regex chunking
//! - [`bpe`]: rank-ordered pair merging on a linked list of symbols
//! - [`vocab`]: definition loading and validation
//! - [`trie`]: longest-match special-token lookup
//! - [`transport`]: u16 little-endian packing and base64 wire form
//! - [`byte_level`]: byte-to-char table for byte-level vocabularies
//! - [`context`]: per-tier context window sizes

mod bpe;
pub mod byte_level;
pub mod context;
mod tokenizer;
pub mod transport;
mod trie;
mod vocab;

pub use bpe::byte_pair_merge;
pub use context::{fit_to_context, max_context_tokens};
pub use tokenizer::{Tokenizer, TokenizerError, GPT2_PATTERN, WHITESPACE_PATTERN};
pub use transport::{from_base64, pack, to_base64, unpack, TransportError};
pub use trie::{SpecialMatch, SpecialsTrie};
pub use vocab::{
    load_definition, load_definition_file, BaseUnit, DefinitionError, MergePair, MergeRule,
    MergeSide, TokenizerConfig, TokenizerDefinition, Vocabulary,
};
