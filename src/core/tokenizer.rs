use fancy_regex::Regex as FancyRegex;
use log::debug;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;

#[cfg(feature = "pcre2")]
use pcre2::bytes::Regex as Pcre2Regex;

use super::bpe::byte_pair_merge;
use super::byte_level::{byte_level_decode, byte_level_encode, is_byte_level_char};
use super::transport::{self, TransportError};
use super::trie::SpecialsTrie;
use super::vocab::{
    load_definition, load_definition_file, BaseUnit, DefinitionError, MergePair,
    TokenizerConfig, TokenizerDefinition, Vocabulary,
};

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),
    #[error("Symbol {symbol:?} at byte {position} has no vocabulary id")]
    UnknownSymbol { symbol: String, position: usize },
    #[error("Token id {id} at index {index} is not in the vocabulary")]
    UnknownId { id: u32, index: usize },
    #[error("Decoding error: invalid UTF-8")]
    Utf8Error,
    #[error("Regex match failed: {0}")]
    RegexMatch(String),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("PCRE2 feature not enabled. Compile with --features pcre2")]
    Pcre2NotEnabled,
}

/// GPT-2 style split pattern: contractions, letter runs, digit runs,
/// punctuation runs, each with an optional leading space, then whitespace.
pub const GPT2_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Split on whitespace boundaries only: words and whitespace runs.
pub const WHITESPACE_PATTERN: &str = r"[^\s]+|\s+";

/// Regex backend: fancy-regex by default, PCRE2 behind the `pcre2` feature.
#[derive(Clone)]
enum RegexBackend {
    Fancy(Box<FancyRegex>),
    #[cfg(feature = "pcre2")]
    Pcre2(Pcre2Regex),
}

impl RegexBackend {
    /// Find all matches in the given text, returning (start, end) byte offsets
    fn find_iter(&self, text: &str) -> Result<Vec<(usize, usize)>, TokenizerError> {
        match self {
            RegexBackend::Fancy(regex) => regex
                .find_iter(text)
                .map(|m| {
                    m.map(|m| (m.start(), m.end()))
                        .map_err(|e| TokenizerError::RegexMatch(e.to_string()))
                })
                .collect(),
            #[cfg(feature = "pcre2")]
            RegexBackend::Pcre2(regex) => regex
                .find_iter(text.as_bytes())
                .map(|m| {
                    m.map(|m| (m.start(), m.end()))
                        .map_err(|e| TokenizerError::RegexMatch(e.to_string()))
                })
                .collect(),
        }
    }
}

/// BPE tokenizer built from an immutable [`TokenizerDefinition`].
///
/// Everything inside is read-only after construction, so a `Tokenizer` can be
/// shared by reference or `Arc` across threads and called concurrently; each
/// call keeps its working buffers local.
///
/// # Encoding pipeline
///
/// 1. Special tokens are recognised with a longest-match trie scan and emitted
///    directly, never split.
/// 2. The text between them is cut into chunks by the configured split pattern.
/// 3. Each chunk starts as base units (code points, or byte-level characters)
///    and is merged by rank with [`byte_pair_merge`].
///
/// Decoding is a direct id-to-string lookup; no merging is involved.
///
/// ```ignore
/// let tokenizer = Tokenizer::from_file("tokenizer.json")?;
/// let wire = tokenizer.text_to_base64("Hello<|endoftext|>")?;
/// assert_eq!(tokenizer.base64_to_text(&wire)?, "Hello<|endoftext|>");
/// ```
#[derive(Clone)]
pub struct Tokenizer {
    vocab: Vocabulary,
    special_tokens: FxHashMap<String, u32>,
    special_tokens_decoder: FxHashMap<u32, String>,
    special_matcher: SpecialsTrie,
    regex: RegexBackend,
    config: TokenizerConfig,
}

impl Tokenizer {
    /// Create a tokenizer from its parts.
    ///
    /// # Arguments
    /// * `vocab` - Map of token strings to token IDs
    /// * `merges` - Merge pairs, highest priority first
    /// * `special_tokens` - Strings that are never split; each must be in `vocab`
    /// * `config` - Split pattern and base unit
    pub fn new(
        vocab: FxHashMap<String, u32>,
        merges: Vec<MergePair>,
        special_tokens: Vec<String>,
        config: TokenizerConfig,
    ) -> Result<Self, TokenizerError> {
        Self::from_definition(TokenizerDefinition {
            vocab,
            merges,
            special_tokens,
            config,
        })
    }

    /// Validate a definition and build the lookup tables, trie and regex.
    pub fn from_definition(definition: TokenizerDefinition) -> Result<Self, TokenizerError> {
        let TokenizerDefinition {
            vocab,
            merges,
            special_tokens: special_token_strings,
            config,
        } = definition;

        let vocab = Vocabulary::build(vocab, &merges)?;

        let mut special_tokens = FxHashMap::default();
        for token in special_token_strings {
            let id = vocab
                .token_to_id(&token)
                .ok_or_else(|| DefinitionError::UnknownSpecialToken(token.clone()))?;
            special_tokens.insert(token, id);
        }
        let special_tokens_decoder: FxHashMap<u32, String> = special_tokens
            .iter()
            .map(|(k, v)| (*v, k.clone()))
            .collect();
        let special_matcher =
            SpecialsTrie::from_tokens(special_tokens.iter().map(|(k, v)| (k.as_str(), *v)));

        if config.base_unit == BaseUnit::ByteLevel {
            if let Some(token) = vocab
                .encoder()
                .keys()
                .filter(|token| !special_tokens.contains_key(token.as_str()))
                .filter(|token| !token.chars().all(is_byte_level_char))
                .min()
            {
                return Err(DefinitionError::BaseUnitMismatch {
                    token: token.clone(),
                }
                .into());
            }
        }

        let regex = FancyRegex::new(&config.split_regex).map_err(DefinitionError::from)?;

        debug!(
            "Loaded tokenizer definition: {} tokens, {} merges, {} special tokens, base unit {:?}",
            vocab.len(),
            vocab.merge_count(),
            special_tokens.len(),
            config.base_unit
        );

        Ok(Self {
            vocab,
            special_tokens,
            special_tokens_decoder,
            special_matcher,
            regex: RegexBackend::Fancy(Box::new(regex)),
            config,
        })
    }

    /// Create a tokenizer from raw definition JSON.
    pub fn from_json(data: &[u8]) -> Result<Self, TokenizerError> {
        Self::from_definition(load_definition(data)?)
    }

    /// Create a tokenizer from a definition JSON string.
    pub fn from_json_str(data: &str) -> Result<Self, TokenizerError> {
        Self::from_json(data.as_bytes())
    }

    /// Create a tokenizer from a definition JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TokenizerError> {
        Self::from_definition(load_definition_file(path)?)
    }

    /// Switch to PCRE2 regex backend.
    ///
    /// Requires the `pcre2` feature; the split pattern is recompiled with UTF
    /// and Unicode property support and JIT when the platform has it.
    #[cfg(feature = "pcre2")]
    pub fn pcre2(mut self, use_pcre2: bool) -> Result<Self, TokenizerError> {
        if use_pcre2 {
            let regex = pcre2::bytes::RegexBuilder::new()
                .jit_if_available(true)
                .utf(true)
                .ucp(true)
                .build(&self.config.split_regex)
                .map_err(DefinitionError::from)?;
            self.regex = RegexBackend::Pcre2(regex);
        } else {
            let regex =
                FancyRegex::new(&self.config.split_regex).map_err(DefinitionError::from)?;
            self.regex = RegexBackend::Fancy(Box::new(regex));
        }
        Ok(self)
    }

    /// Switch to PCRE2 regex backend (stub when feature not enabled).
    #[cfg(not(feature = "pcre2"))]
    pub fn pcre2(self, use_pcre2: bool) -> Result<Self, TokenizerError> {
        if use_pcre2 {
            Err(TokenizerError::Pcre2NotEnabled)
        } else {
            Ok(self)
        }
    }

    /// Encode text to token IDs.
    ///
    /// Special tokens are matched at every position before any splitting, so
    /// a literal like `<|endoftext|>` always becomes its single id.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        let mut tokens = Vec::with_capacity(text.len() / 2 + 1);

        if self.special_matcher.is_empty() {
            self.encode_segment(text, 0, &mut tokens)?;
            return Ok(tokens);
        }

        let mut segment_start = 0;
        let mut position = 0;
        while let Some(ch) = text[position..].chars().next() {
            match self.special_matcher.longest_match(text, position) {
                Some(m) => {
                    self.encode_segment(&text[segment_start..position], segment_start, &mut tokens)?;
                    tokens.push(m.id);
                    position += m.len;
                    segment_start = position;
                }
                None => position += ch.len_utf8(),
            }
        }
        self.encode_segment(&text[segment_start..], segment_start, &mut tokens)?;

        Ok(tokens)
    }

    /// Encode text to token IDs, treating special-token literals as plain text.
    pub fn encode_ordinary(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        let mut tokens = Vec::with_capacity(text.len() / 2 + 1);
        self.encode_segment(text, 0, &mut tokens)?;
        Ok(tokens)
    }

    /// Split a special-free segment into chunks and encode each one.
    ///
    /// Text the pattern skips over is encoded as a chunk of its own so that
    /// nothing is dropped. `offset` is the segment's byte offset in the input
    /// and only feeds error positions.
    fn encode_segment(
        &self,
        segment: &str,
        offset: usize,
        tokens: &mut Vec<u32>,
    ) -> Result<(), TokenizerError> {
        if segment.is_empty() {
            return Ok(());
        }

        let mut cursor = 0;
        for (start, end) in self.regex.find_iter(segment)? {
            if start > cursor {
                self.encode_chunk(&segment[cursor..start], offset + cursor, tokens)?;
            }
            if end > start {
                self.encode_chunk(&segment[start..end], offset + start, tokens)?;
            }
            cursor = cursor.max(end);
        }
        if cursor < segment.len() {
            self.encode_chunk(&segment[cursor..], offset + cursor, tokens)?;
        }

        Ok(())
    }

    /// Run BPE over one chunk.
    fn encode_chunk(
        &self,
        chunk: &str,
        position: usize,
        tokens: &mut Vec<u32>,
    ) -> Result<(), TokenizerError> {
        let mut buf = [0u8; 4];
        let symbols = match self.config.base_unit {
            BaseUnit::Char => chunk
                .char_indices()
                .map(|(i, ch)| self.base_id(ch.encode_utf8(&mut buf), position + i))
                .collect::<Result<Vec<u32>, _>>()?,
            BaseUnit::ByteLevel => byte_level_encode(chunk.as_bytes())
                .chars()
                .enumerate()
                .map(|(i, ch)| self.base_id(ch.encode_utf8(&mut buf), position + i))
                .collect::<Result<Vec<u32>, _>>()?,
        };

        tokens.extend(byte_pair_merge(&symbols, &self.vocab));
        Ok(())
    }

    #[inline]
    fn base_id(&self, unit: &str, position: usize) -> Result<u32, TokenizerError> {
        self.vocab
            .token_to_id(unit)
            .ok_or_else(|| TokenizerError::UnknownSymbol {
                symbol: unit.to_string(),
                position,
            })
    }

    /// Decode token IDs back to bytes.
    ///
    /// Fails on the first unknown id; nothing is decoded partially.
    pub fn decode_bytes(&self, tokens: &[u32]) -> Result<Vec<u8>, TokenizerError> {
        let mut result = Vec::with_capacity(tokens.len() * 4);

        for (index, &id) in tokens.iter().enumerate() {
            let piece = self
                .vocab
                .id_to_token(id)
                .ok_or(TokenizerError::UnknownId { id, index })?;

            match self.config.base_unit {
                BaseUnit::Char => result.extend_from_slice(piece.as_bytes()),
                BaseUnit::ByteLevel if self.special_tokens_decoder.contains_key(&id) => {
                    result.extend_from_slice(piece.as_bytes())
                }
                BaseUnit::ByteLevel => match byte_level_decode(piece) {
                    Some(bytes) => result.extend_from_slice(&bytes),
                    None => result.extend_from_slice(piece.as_bytes()),
                },
            }
        }

        Ok(result)
    }

    /// Decode token IDs to a string.
    pub fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        let bytes = self.decode_bytes(tokens)?;
        String::from_utf8(bytes).map_err(|_| TokenizerError::Utf8Error)
    }

    /// Decode token IDs to a string, replacing invalid UTF-8 with replacement character.
    ///
    /// Only byte-level definitions can produce invalid UTF-8, e.g. when a
    /// sequence is cut in the middle of a multi-byte character.
    pub fn decode_lossy(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        let bytes = self.decode_bytes(tokens)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Batch encode multiple texts in parallel.
    pub fn encode_batch<S>(&self, texts: &[S]) -> Result<Vec<Vec<u32>>, TokenizerError>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| self.encode(text.as_ref()))
            .collect()
    }

    /// Batch decode multiple token lists in parallel.
    pub fn decode_batch(&self, token_lists: &[Vec<u32>]) -> Result<Vec<String>, TokenizerError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// Encode text and render the ids in the base64 wire form.
    pub fn text_to_base64(&self, text: &str) -> Result<String, TokenizerError> {
        let tokens = self.encode(text)?;
        Ok(transport::to_base64(&tokens)?)
    }

    /// Decode text from the base64 wire form.
    pub fn base64_to_text(&self, encoded: &str) -> Result<String, TokenizerError> {
        let tokens = transport::from_base64(encoded)?;
        self.decode(&tokens)
    }

    /// Get the vocabulary size.
    ///
    /// This returns max_token_id + 1, the full id range including special tokens.
    pub fn vocab_size(&self) -> usize {
        self.vocab.max_id().map_or(0, |max_id| max_id as usize + 1)
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.vocab.token_to_id(token)
    }

    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.vocab.id_to_token(id)
    }

    /// Id of a special token, or `None` if `token` is not one.
    pub fn special_token_id(&self, token: &str) -> Option<u32> {
        self.special_tokens.get(token).copied()
    }

    pub fn is_special(&self, id: u32) -> bool {
        self.special_tokens_decoder.contains_key(&id)
    }

    /// Get the validated vocabulary tables.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Get the special tokens map.
    pub fn special_tokens(&self) -> &FxHashMap<String, u32> {
        &self.special_tokens
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }
}
