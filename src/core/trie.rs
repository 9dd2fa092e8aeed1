//! Longest-match lookup for special tokens.
//!
//! The trie is stored as an arena: nodes live in one `Vec` and refer to their
//! children by index. It is built once when the tokenizer is constructed and
//! only read afterwards, so it can be shared between threads freely.

use rustc_hash::FxHashMap;

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: FxHashMap<char, usize>,
    /// Index into `SpecialsTrie::tokens` when a special token ends here.
    terminal: Option<usize>,
}

/// A special token recognised at some position of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialMatch<'a> {
    pub token: &'a str,
    pub id: u32,
    /// Matched length in bytes.
    pub len: usize,
}

/// Prefix tree over the special-token strings.
#[derive(Debug, Clone)]
pub struct SpecialsTrie {
    nodes: Vec<TrieNode>,
    tokens: Vec<(String, u32)>,
}

impl Default for SpecialsTrie {
    fn default() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            tokens: Vec::new(),
        }
    }
}

impl SpecialsTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trie from `(token, id)` pairs.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut trie = Self::new();
        for (token, id) in tokens {
            trie.insert(token, id);
        }
        trie
    }

    /// Add a special token. Re-inserting a token replaces its id; the empty
    /// string is ignored since it would match everywhere.
    pub fn insert(&mut self, token: impl Into<String>, id: u32) {
        let token = token.into();
        if token.is_empty() {
            return;
        }

        let mut node = ROOT;
        for ch in token.chars() {
            node = match self.nodes[node].children.get(&ch) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(ch, child);
                    child
                }
            };
        }

        match self.nodes[node].terminal {
            Some(existing) => self.tokens[existing].1 = id,
            None => {
                self.nodes[node].terminal = Some(self.tokens.len());
                self.tokens.push((token, id));
            }
        }
    }

    /// Find the longest special token starting at byte offset `position`.
    ///
    /// Cost is proportional to the number of characters walked, which never
    /// exceeds the length of the longest special token.
    pub fn longest_match(&self, text: &str, position: usize) -> Option<SpecialMatch<'_>> {
        let rest = text.get(position..)?;

        let mut node = ROOT;
        let mut best = None;
        for (offset, ch) in rest.char_indices() {
            let Some(&child) = self.nodes[node].children.get(&ch) else {
                break;
            };
            node = child;
            if let Some(index) = self.nodes[node].terminal {
                best = Some((index, offset + ch.len_utf8()));
            }
        }

        best.map(|(index, len)| {
            let (token, id) = &self.tokens[index];
            SpecialMatch {
                token: token.as_str(),
                id: *id,
                len,
            }
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trie() -> SpecialsTrie {
        SpecialsTrie::from_tokens([
            ("<|end|>", 1),
            ("<|endoftext|>", 2),
            ("<|e", 3),
            ("日本", 4),
        ])
    }

    #[test]
    fn test_longest_match_prefers_longer_token() {
        let trie = make_trie();
        let m = trie.longest_match("<|endoftext|> tail", 0).unwrap();
        assert_eq!(m.token, "<|endoftext|>");
        assert_eq!(m.id, 2);
        assert_eq!(m.len, "<|endoftext|>".len());
    }

    #[test]
    fn test_falls_back_to_shorter_marked_prefix() {
        let trie = make_trie();
        // The walk reaches "<|endo" before failing; the only marked node on
        // that path is "<|e".
        let m = trie.longest_match("<|endoxx", 0).unwrap();
        assert_eq!(m.token, "<|e");
        assert_eq!(m.len, 3);

        let m = trie.longest_match("<|end|>", 0).unwrap();
        assert_eq!(m.token, "<|end|>");
    }

    #[test]
    fn test_match_at_offset() {
        let trie = make_trie();
        let text = "abc<|end|>def";
        assert!(trie.longest_match(text, 0).is_none());
        let m = trie.longest_match(text, 3).unwrap();
        assert_eq!(m.id, 1);
        assert_eq!(&text[3..3 + m.len], "<|end|>");
    }

    #[test]
    fn test_multibyte_lengths_are_bytes() {
        let trie = make_trie();
        let text = "x日本語";
        let m = trie.longest_match(text, 1).unwrap();
        assert_eq!(m.id, 4);
        assert_eq!(m.len, "日本".len());
    }

    #[test]
    fn test_position_out_of_range_or_not_on_boundary() {
        let trie = make_trie();
        assert!(trie.longest_match("<|e", 10).is_none());
        assert!(trie.longest_match("日本", 1).is_none());
    }

    #[test]
    fn test_empty_trie_and_empty_token() {
        let mut trie = SpecialsTrie::new();
        trie.insert("", 9);
        assert!(trie.is_empty());
        assert!(trie.longest_match("anything", 0).is_none());
    }

    #[test]
    fn test_reinsert_replaces_id() {
        let mut trie = make_trie();
        trie.insert("<|end|>", 42);
        assert_eq!(trie.len(), 4);
        assert_eq!(trie.longest_match("<|end|>", 0).unwrap().id, 42);
    }
}
