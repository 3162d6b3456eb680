// File: src/core/matcher.rs
use crate::core::dictionary::Dictionary;
use crate::core::tokenizer::{tokenize, Token};
use crate::core::types::CanonicalEntry;

/// One dictionary hit in the scanned text.
#[derive(Debug, Clone)]
pub struct MatchEvent<'d> {
    /// The matched tokens as they were normalized from the text.
    pub surface: Vec<String>,
    pub entry: CanonicalEntry<'d>,
    /// Token position of the first matched token.
    pub position: usize,
}

impl MatchEvent<'_> {
    pub fn len(&self) -> usize {
        self.surface.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surface.is_empty()
    }
}

/// Scans raw text against the dictionary.
pub fn match_text<'d>(dictionary: &'d Dictionary, text: &str) -> Vec<MatchEvent<'d>> {
    match_tokens(dictionary, &tokenize(text))
}

/// Maximal-munch scan over already tokenized text.
///
/// At each position the longest phrase (or phrase spelling) wins; the scan
/// then jumps past it so matches never overlap. Otherwise a single word is
/// tried, and tokens that resolve to nothing are skipped silently.
pub fn match_tokens<'d>(dictionary: &'d Dictionary, tokens: &[Token]) -> Vec<MatchEvent<'d>> {
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    let mut events = Vec::new();
    let mut pos = 0;

    while pos < tokens.len() {
        if let Some((entry, len)) = dictionary.longest_phrase(&texts[pos..]) {
            events.push(event(tokens, pos, len, entry));
            pos += len;
            continue;
        }
        if let Some(entry) = dictionary.resolve(texts[pos]) {
            events.push(event(tokens, pos, 1, entry));
        }
        pos += 1;
    }

    events
}

fn event<'d>(tokens: &[Token], pos: usize, len: usize, entry: CanonicalEntry<'d>) -> MatchEvent<'d> {
    MatchEvent {
        surface: tokens[pos..pos + len].iter().map(|t| t.text.clone()).collect(),
        entry,
        position: tokens[pos].position,
    }
}
