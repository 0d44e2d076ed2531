//! Autocompleter - Trie-based prefix word index
//!
//! Maps lowercase word tokens to the set of item ids that contain them,
//! backed by a trie for prefix expansion.
//!
//! # Example
//! ```ignore
//! autocompleter.add_item("sym_a", &["headache", "left temple"]);
//! let hits = autocompleter.search("head le");
//! // hits = {"sym_a"} - every query token matched by prefix
//! ```
//!
//! # Design Notes
//! - Matching is case-insensitive; tokens split on whitespace
//! - Multi-token queries intersect (AND semantics)
//! - Removal prunes trie branches with no word end and no children

use std::collections::{HashMap, HashSet};

/// Trie-based prefix index over item word tokens
#[derive(Debug, Default)]
pub struct Autocompleter {
    root: TrieNode,
    /// word → ids of items containing it
    items_by_word: HashMap<String, HashSet<String>>,
    /// item id → its word set, for removal
    words_by_item: HashMap<String, HashSet<String>>,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    is_word_end: bool,
}

/// Lowercase non-empty whitespace-separated tokens of a text
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}

impl Autocompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index an item under the words of the given texts
    ///
    /// Re-adding an existing id first drops its previous words, so the
    /// index always reflects the latest texts.
    pub fn add_item(&mut self, id: &str, texts: &[&str]) {
        if self.words_by_item.contains_key(id) {
            self.remove_item(id);
        }

        let words: HashSet<String> = texts.iter().flat_map(|text| tokenize(text)).collect();

        for word in &words {
            self.insert_word(word);
            self.items_by_word
                .entry(word.clone())
                .or_default()
                .insert(id.to_string());
        }

        self.words_by_item.insert(id.to_string(), words);
    }

    /// Drop an item and any words no other item still uses
    pub fn remove_item(&mut self, id: &str) {
        let words = match self.words_by_item.remove(id) {
            Some(words) => words,
            None => return,
        };

        for word in words {
            let now_unused = match self.items_by_word.get_mut(&word) {
                Some(ids) => {
                    ids.remove(id);
                    ids.is_empty()
                }
                None => false,
            };

            if now_unused {
                self.items_by_word.remove(&word);
                self.remove_word(&word);
            }
        }
    }

    /// Ids of items matching every query token by word prefix
    ///
    /// The empty query yields the empty set; the caller substitutes "all
    /// items" if that is what it wants.
    pub fn search(&self, query: &str) -> HashSet<String> {
        let mut result: Option<HashSet<String>> = None;

        for token in tokenize(query) {
            let mut matches: HashSet<String> = HashSet::new();
            for word in self.words_with_prefix(&token) {
                if let Some(ids) = self.items_by_word.get(&word) {
                    matches.extend(ids.iter().cloned());
                }
            }

            result = Some(match result {
                Some(existing) => existing.intersection(&matches).cloned().collect(),
                None => matches,
            });

            // An empty intersection can never grow back
            if result.as_ref().is_some_and(|set| set.is_empty()) {
                return HashSet::new();
            }
        }

        result.unwrap_or_default()
    }

    /// All indexed words starting with the given (already lowercase) prefix
    fn words_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut node = &self.root;
        for ch in prefix.chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }

        let mut words = Vec::new();
        collect_words(node, prefix.to_string(), &mut words);
        words
    }

    fn insert_word(&mut self, word: &str) {
        let mut node = &mut self.root;
        for ch in word.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.is_word_end = true;
    }

    fn remove_word(&mut self, word: &str) {
        remove_word_rec(&mut self.root, &word.chars().collect::<Vec<_>>());
    }

    /// Number of distinct indexed words
    pub fn word_count(&self) -> usize {
        self.items_by_word.len()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.words_by_item.is_empty()
    }
}

fn collect_words(node: &TrieNode, current: String, out: &mut Vec<String>) {
    if node.is_word_end {
        out.push(current.clone());
    }
    for (ch, child) in &node.children {
        let mut next = current.clone();
        next.push(*ch);
        collect_words(child, next, out);
    }
}

/// Remove a word from the trie, pruning branches that are no longer a
/// word end and have no children. Returns whether the visited child
/// should be dropped by its parent.
fn remove_word_rec(node: &mut TrieNode, suffix: &[char]) -> bool {
    match suffix.split_first() {
        None => {
            node.is_word_end = false;
        }
        Some((ch, rest)) => {
            let prune_child = match node.children.get_mut(ch) {
                Some(child) => remove_word_rec(child, rest),
                None => false,
            };
            if prune_child {
                node.children.remove(ch);
            }
        }
    }

    !node.is_word_end && node.children.is_empty()
}
