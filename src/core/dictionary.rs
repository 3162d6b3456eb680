// File: src/core/dictionary.rs
use crate::core::tokenizer::{normalize_phrase, normalize_token};
use crate::core::trie::PhraseTrie;
use crate::core::types::{
    Association, CanonicalEntry, Category, CategoryId, EntryRef, Level, Phrase, PhraseId, Word, WordId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Categories can have at most this many parents.
pub const MAX_PARENTS: usize = 2;

/// The in-memory dictionary of categories, words, phrases and spelling variants.
///
/// All keys are normalized with the tokenizer's rules so lookups can use
/// token text directly. Mutation only happens through the `upsert_*`
/// methods, each keyed by its natural unique key.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Dictionary {
    categories: Vec<Category>,
    category_index: HashMap<String, CategoryId>,
    words: Vec<Word>,
    word_index: HashMap<String, WordId>,
    word_spellings: HashMap<String, WordId>,
    phrases: Vec<Phrase>,
    phrase_index: HashMap<String, PhraseId>,
    phrase_spellings: HashMap<String, PhraseId>,
    phrase_trie: PhraseTrie,
    /// Reverse index: category -> words associated with it.
    category_words: HashMap<CategoryId, BTreeSet<WordId>>,
    category_phrases: HashMap<CategoryId, BTreeSet<PhraseId>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    // --- upserts ---

    /// Inserts or updates a category by name. Returns `None` for a blank name.
    pub fn upsert_category(&mut self, name: &str, weight: Level) -> Option<CategoryId> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Some(&id) = self.category_index.get(name) {
            self.categories[id].weight = weight;
            return Some(id);
        }
        let id = self.categories.len();
        self.categories.push(Category {
            name: name.to_string(),
            weight,
            parents: Vec::new(),
        });
        self.category_index.insert(name.to_string(), id);
        Some(id)
    }

    /// Replaces the parent set of `category`.
    ///
    /// Parents that are unknown, would close a cycle, repeat, or fall past
    /// [`MAX_PARENTS`] are left out and returned. `None` when `category` itself
    /// is unknown.
    pub fn set_parents(&mut self, category: CategoryId, parents: &[CategoryId]) -> Option<Vec<CategoryId>> {
        self.categories.get_mut(category)?.parents.clear();
        let mut rejected = Vec::new();
        for &parent in parents {
            let current = &self.categories[category].parents;
            if parent >= self.categories.len()
                || current.len() >= MAX_PARENTS
                || current.contains(&parent)
                || self.is_ancestor_or_self(category, parent)
            {
                rejected.push(parent);
                continue;
            }
            self.categories[category].parents.push(parent);
        }
        Some(rejected)
    }

    /// Inserts or updates a word, replacing its association set.
    ///
    /// Associations naming an unknown category are dropped.
    pub fn upsert_word(&mut self, text: &str, weight: Level, associations: BTreeSet<Association>) -> Option<WordId> {
        let key = normalize_token(text)?;
        let associations = self.known_categories(associations);
        let id = match self.word_index.get(&key) {
            Some(&id) => {
                self.unindex_word(id);
                let word = &mut self.words[id];
                word.weight = weight;
                word.associations = associations;
                id
            }
            None => {
                let id = self.words.len();
                // A canonical word always wins over a spelling with the same text.
                if let Some(previous) = self.word_spellings.remove(&key) {
                    self.words[previous].variants.remove(&key);
                }
                self.words.push(Word {
                    text: key.clone(),
                    weight,
                    associations,
                    variants: BTreeSet::new(),
                });
                self.word_index.insert(key, id);
                id
            }
        };
        for assoc in &self.words[id].associations {
            self.category_words.entry(assoc.category).or_default().insert(id);
        }
        Some(id)
    }

    /// Inserts or updates a phrase, replacing its constituent words and associations.
    ///
    /// Unknown word ids and associations naming an unknown category are dropped.
    pub fn upsert_phrase(
        &mut self,
        text: &str,
        weight: Level,
        words: Vec<WordId>,
        associations: BTreeSet<Association>,
    ) -> Option<PhraseId> {
        let tokens = normalize_phrase(text);
        if tokens.is_empty() {
            return None;
        }
        let key = tokens.join(" ");
        let associations = self.known_categories(associations);
        let words: Vec<WordId> = words.into_iter().filter(|&w| w < self.words.len()).collect();
        let id = match self.phrase_index.get(&key) {
            Some(&id) => {
                self.unindex_phrase(id);
                let phrase = &mut self.phrases[id];
                phrase.weight = weight;
                phrase.words = words;
                phrase.associations = associations;
                id
            }
            None => {
                let id = self.phrases.len();
                // A canonical phrase always wins over a spelling with the same text.
                if let Some(previous) = self.phrase_spellings.remove(&key) {
                    self.phrases[previous].variants.remove(&key);
                }
                self.phrase_trie.insert(&tokens, id);
                self.phrases.push(Phrase {
                    text: key.clone(),
                    tokens,
                    weight,
                    words,
                    associations,
                    variants: BTreeSet::new(),
                });
                self.phrase_index.insert(key, id);
                id
            }
        };
        for assoc in &self.phrases[id].associations {
            self.category_phrases.entry(assoc.category).or_default().insert(id);
        }
        Some(id)
    }

    /// Maps an alternate spelling to a canonical word.
    ///
    /// Returns `false` for an unknown word, a blank spelling, or one that is
    /// itself a canonical word.
    pub fn upsert_word_spelling(&mut self, spelling: &str, word: WordId) -> bool {
        let Some(key) = normalize_token(spelling) else {
            return false;
        };
        if word >= self.words.len() || self.word_index.contains_key(&key) {
            return false;
        }
        if let Some(previous) = self.word_spellings.insert(key.clone(), word) {
            self.words[previous].variants.remove(&key);
        }
        self.words[word].variants.insert(key);
        true
    }

    /// Maps an alternate spelling to a canonical phrase.
    ///
    /// Returns `false` for an unknown phrase, a blank spelling, or one that is
    /// itself a canonical phrase.
    pub fn upsert_phrase_spelling(&mut self, spelling: &str, phrase: PhraseId) -> bool {
        let tokens = normalize_phrase(spelling);
        if tokens.is_empty() || phrase >= self.phrases.len() {
            return false;
        }
        let key = tokens.join(" ");
        if self.phrase_index.contains_key(&key) {
            return false;
        }
        if let Some(previous) = self.phrase_spellings.insert(key.clone(), phrase) {
            self.phrases[previous].variants.remove(&key);
        }
        self.phrase_trie.insert(&tokens, phrase);
        self.phrases[phrase].variants.insert(key);
        true
    }

    // --- resolution ---

    /// Resolves a normalized token to its canonical word, directly or through
    /// a spelling variant. A canonical word always wins over a spelling.
    pub fn resolve(&self, token: &str) -> Option<CanonicalEntry<'_>> {
        let id = self
            .word_index
            .get(token)
            .or_else(|| self.word_spellings.get(token))
            .copied()?;
        Some(self.word_entry(id))
    }

    /// Resolves an exact token window to its canonical phrase. Word spellings
    /// inside the window stand for their canonical word.
    pub fn resolve_phrase<S: AsRef<str>>(&self, window: &[S]) -> Option<CanonicalEntry<'_>> {
        match self.longest_phrase(window) {
            Some((entry, len)) if len == window.len() => Some(entry),
            _ => None,
        }
    }

    /// Longest phrase starting at the head of `tokens`, with its token length.
    /// Word spellings inside the window stand for their canonical word.
    pub fn longest_phrase<S: AsRef<str>>(&self, tokens: &[S]) -> Option<(CanonicalEntry<'_>, usize)> {
        self.phrase_trie
            .longest_prefix_with(tokens, |token| self.canonical_word_text(token))
            .map(|(id, len)| (self.phrase_entry(id), len))
    }

    fn canonical_word_text(&self, spelling: &str) -> Option<&str> {
        self.word_spellings
            .get(spelling)
            .map(|&id| self.words[id].text.as_str())
    }

    fn known_categories(&self, associations: BTreeSet<Association>) -> BTreeSet<Association> {
        associations
            .into_iter()
            .filter(|assoc| assoc.category < self.categories.len())
            .collect()
    }

    /// Token count of the longest phrase or phrase spelling.
    pub fn max_phrase_len(&self) -> usize {
        self.phrase_trie.max_depth()
    }

    fn word_entry(&self, id: WordId) -> CanonicalEntry<'_> {
        let word = &self.words[id];
        CanonicalEntry {
            entry: EntryRef::Word(id),
            name: &word.text,
            weight: word.weight,
            associations: &word.associations,
        }
    }

    fn phrase_entry(&self, id: PhraseId) -> CanonicalEntry<'_> {
        let phrase = &self.phrases[id];
        CanonicalEntry {
            entry: EntryRef::Phrase(id),
            name: &phrase.text,
            weight: phrase.weight,
            associations: &phrase.associations,
        }
    }

    // --- browsing ---

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: CategoryId) -> &Category {
        &self.categories[id]
    }

    pub fn category_id(&self, name: &str) -> Option<CategoryId> {
        self.category_index.get(name.trim()).copied()
    }

    pub fn word_id(&self, text: &str) -> Option<WordId> {
        normalize_token(text).and_then(|key| self.word_index.get(&key).copied())
    }

    pub fn phrase_id(&self, text: &str) -> Option<PhraseId> {
        self.phrase_index.get(&normalize_phrase(text).join(" ")).copied()
    }

    pub fn word(&self, id: WordId) -> &Word {
        &self.words[id]
    }

    pub fn phrase(&self, id: PhraseId) -> &Phrase {
        &self.phrases[id]
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    /// Names of the direct parents of a category.
    pub fn parents_of(&self, category: &str) -> Vec<&str> {
        self.category_id(category)
            .map(|id| {
                self.categories[id]
                    .parents
                    .iter()
                    .map(|&p| self.categories[p].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sorted names of the categories a canonical word belongs to.
    pub fn categories_of(&self, word: &str) -> Vec<&str> {
        let Some(id) = self.word_id(word) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self.words[id]
            .associations
            .iter()
            .map(|a| self.categories[a.category].name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Sorted texts of the words associated with a category.
    pub fn words_in(&self, category: &str) -> Vec<&str> {
        self.members(category, &self.category_words, |id| self.words[id].text.as_str())
    }

    /// Sorted texts of the phrases associated with a category.
    pub fn phrases_in(&self, category: &str) -> Vec<&str> {
        self.members(category, &self.category_phrases, |id| self.phrases[id].text.as_str())
    }

    fn members<'a>(
        &'a self,
        category: &str,
        index: &'a HashMap<CategoryId, BTreeSet<usize>>,
        text: impl Fn(usize) -> &'a str,
    ) -> Vec<&'a str> {
        let mut names: Vec<&str> = self
            .category_id(category)
            .and_then(|id| index.get(&id))
            .map(|ids| ids.iter().map(|&id| text(id)).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    // --- internals ---

    fn is_ancestor_or_self(&self, candidate: CategoryId, of: CategoryId) -> bool {
        let mut stack = vec![of];
        let mut seen = BTreeSet::new();
        while let Some(id) = stack.pop() {
            if id == candidate {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.categories[id].parents.iter().copied());
            }
        }
        false
    }

    fn unindex_word(&mut self, id: WordId) {
        for assoc in &self.words[id].associations {
            if let Some(set) = self.category_words.get_mut(&assoc.category) {
                set.remove(&id);
            }
        }
    }

    fn unindex_phrase(&mut self, id: PhraseId) {
        for assoc in &self.phrases[id].associations {
            if let Some(set) = self.category_phrases.get_mut(&assoc.category) {
                set.remove(&id);
            }
        }
    }
}
