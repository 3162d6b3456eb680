// src/core/tokenizer.rs
use std::ops::Range;

/// A normalized word token with its place in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Case-folded surface text.
    pub text: String,
    /// Ordinal among the tokens of the text.
    pub position: usize,
    /// Byte range of the surface form in the source text.
    pub span: Range<usize>,
}

/// Splits raw text into normalized tokens.
///
/// A token is a run of alphanumeric characters. Any other character ends it,
/// so `heck,heck` is two tokens. An apostrophe or hyphen with a letter or
/// digit on both sides stays inside the token (`don't`, `x-rated`).
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut prev_alphanumeric = false;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let inner_joiner = is_joiner(c)
            && prev_alphanumeric
            && chars.peek().is_some_and(|&(_, next)| next.is_alphanumeric());
        if c.is_alphanumeric() || inner_joiner {
            start.get_or_insert(idx);
        } else if let Some(s) = start.take() {
            push_token(&mut tokens, text, s..idx);
        }
        prev_alphanumeric = c.is_alphanumeric();
    }
    if let Some(s) = start {
        push_token(&mut tokens, text, s..text.len());
    }

    tokens
}

/// Normalizes a single dictionary key the same way text tokens are normalized.
///
/// `None` unless the key is exactly one token.
pub fn normalize_token(raw: &str) -> Option<String> {
    let mut tokens = tokenize(raw).into_iter();
    match (tokens.next(), tokens.next()) {
        (Some(token), None) => Some(token.text),
        _ => None,
    }
}

/// Normalizes a multi-word key into its token texts.
pub fn normalize_phrase(raw: &str) -> Vec<String> {
    tokenize(raw).into_iter().map(|t| t.text).collect()
}

fn push_token(tokens: &mut Vec<Token>, text: &str, span: Range<usize>) {
    tokens.push(Token {
        text: text[span.clone()].to_lowercase(),
        position: tokens.len(),
        span,
    });
}

fn is_joiner(c: char) -> bool {
    matches!(c, '\'' | '\u{2019}' | '-')
}
