//! tokenwire - BPE tokenizer and compact wire format for token ids
//!
//! - Definitions loaded from one JSON record (vocab, merges, special tokens, config)
//! - Special tokens matched atomically with a longest-match trie
//! - Configurable chunk-splitting regex (fancy-regex, optional PCRE2)
//! - Rank-ordered BPE merging with a heap over a linked list of symbols
//! - Token ids packed as little-endian u16 and carried as base64 text
//! - Rayon batch encoding/decoding over a shared, immutable tokenizer

pub mod core;

pub use self::core::{
    from_base64, load_definition, load_definition_file, max_context_tokens, pack, to_base64,
    unpack, BaseUnit, DefinitionError, MergePair, TokenizerConfig, TokenizerDefinition,
    Tokenizer, TokenizerError, TransportError, GPT2_PATTERN, WHITESPACE_PATTERN,
};
