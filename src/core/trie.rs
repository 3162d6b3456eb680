// --- File: src/core/trie.rs
use crate::core::types::PhraseId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Serialize, Deserialize)]
struct PhraseNode {
    children: HashMap<String, usize>,
    phrase_id: Option<PhraseId>,
}

impl PhraseNode {
    fn new() -> Self {
        Self { children: HashMap::new(), phrase_id: None }
    }
}

/// A trie over normalized tokens. Every path that ends on a node carrying a
/// `phrase_id` is a canonical phrase or a registered phrase spelling.
#[derive(Clone, Serialize, Deserialize)]
pub struct PhraseTrie {
    nodes: Vec<PhraseNode>,
    max_depth: usize,
}

impl Default for PhraseTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseTrie {
    pub fn new() -> Self {
        Self { nodes: vec![PhraseNode::new()], max_depth: 0 }
    }

    /// Maps a token sequence to a phrase, replacing any previous mapping.
    /// O(k) where k is the number of tokens.
    pub fn insert(&mut self, tokens: &[String], phrase_id: PhraseId) {
        if tokens.is_empty() {
            return;
        }
        let mut node_idx = 0;
        for token in tokens {
            let next_idx = if let Some(&id) = self.nodes[node_idx].children.get(token) {
                id
            } else {
                let new_node_id = self.nodes.len();
                self.nodes.push(PhraseNode::new());
                self.nodes[node_idx].children.insert(token.clone(), new_node_id);
                new_node_id
            };
            node_idx = next_idx;
        }
        self.nodes[node_idx].phrase_id = Some(phrase_id);
        self.max_depth = self.max_depth.max(tokens.len());
    }

    /// Exact lookup of a whole token window.
    pub fn get<S: AsRef<str>>(&self, window: &[S]) -> Option<PhraseId> {
        if window.is_empty() {
            return None;
        }
        let mut node_idx = 0;
        for token in window {
            node_idx = *self.nodes[node_idx].children.get(token.as_ref())?;
        }
        self.nodes[node_idx].phrase_id
    }

    /// Longest prefix of `tokens` that names a phrase, as `(phrase, length)`.
    ///
    /// Walks at most `max_depth` tokens, which is the same as trying every
    /// window from the longest phrase length down to one and keeping the
    /// first hit.
    pub fn longest_prefix<S: AsRef<str>>(&self, tokens: &[S]) -> Option<(PhraseId, usize)> {
        self.longest_prefix_with(tokens, |_| None)
    }

    /// Like [`PhraseTrie::longest_prefix`], but at every step the walk may also
    /// follow `alternate(token)`, the canonical form of a token.
    ///
    /// The token itself is tried first; an alternate path only wins when it
    /// is strictly longer.
    pub fn longest_prefix_with<'a, S, F>(&self, tokens: &[S], alternate: F) -> Option<(PhraseId, usize)>
    where
        S: AsRef<str>,
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut best = None;
        self.walk(0, tokens, 0, &alternate, &mut best);
        best
    }

    fn walk<'a, S, F>(&self, node_idx: usize, tokens: &[S], depth: usize, alternate: &F, best: &mut Option<(PhraseId, usize)>)
    where
        S: AsRef<str>,
        F: Fn(&str) -> Option<&'a str>,
    {
        if depth >= tokens.len() || depth >= self.max_depth {
            return;
        }
        let raw = tokens[depth].as_ref();
        let canonical = alternate(raw).filter(|c| *c != raw);
        for key in std::iter::once(raw).chain(canonical) {
            let Some(&next) = self.nodes[node_idx].children.get(key) else {
                continue;
            };
            if let Some(id) = self.nodes[next].phrase_id {
                if best.map_or(true, |(_, len)| depth + 1 > len) {
                    *best = Some((id, depth + 1));
                }
            }
            self.walk(next, tokens, depth + 1, alternate, best);
        }
    }

    /// Token count of the longest registered path.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}
