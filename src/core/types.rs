// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Index of a category in the dictionary's category table.
pub type CategoryId = usize;
/// Index of a canonical word in the dictionary's word table.
pub type WordId = usize;
/// Index of a canonical phrase in the dictionary's phrase table.
pub type PhraseId = usize;

/// An offensiveness level in the closed range [0,3].
///
/// Used both for dictionary weights and for computed ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const INNOCUOUS: Level = Level(0);
    pub const SLIGHT: Level = Level(1);
    pub const MODERATE: Level = Level(2);
    pub const HEAVY: Level = Level(3);

    /// Returns `None` when `value` is outside [0,3].
    pub fn new(value: i64) -> Option<Self> {
        if (0..=Self::HEAVY.0 as i64).contains(&value) {
            Some(Level(value as u8))
        } else {
            None
        }
    }

    /// Clamps any value into [0,3].
    pub fn saturating(value: u32) -> Self {
        Level(value.min(Self::HEAVY.0 as u32) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "innocuous",
            1 => "slight",
            2 => "moderate",
            _ => "heavy",
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Level::new(value as i64).ok_or_else(|| format!("level {value} is outside 0..=3"))
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a word or phrase is a strong or weak member of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Strong,
}

impl Strength {
    pub fn from_flag(strong: bool) -> Self {
        if strong {
            Strength::Strong
        } else {
            Strength::Weak
        }
    }
}

/// One (category, strength) association of a word or phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Association {
    pub category: CategoryId,
    pub strength: Strength,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub weight: Level,
    /// At most two parents. Informational only, never used in rating math.
    pub parents: Vec<CategoryId>,
}

/// A canonical word. `text` is the normalized lookup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub weight: Level,
    pub associations: BTreeSet<Association>,
    /// All registered alternate spellings of this word.
    pub variants: BTreeSet<String>,
}

/// A canonical phrase. `tokens` is the normalized token sequence it matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phrase {
    pub text: String,
    pub tokens: Vec<String>,
    pub weight: Level,
    /// Constituent words, in order.
    pub words: Vec<WordId>,
    pub associations: BTreeSet<Association>,
    pub variants: BTreeSet<String>,
}

/// Reference to the canonical entry a token or token window resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryRef {
    Word(WordId),
    Phrase(PhraseId),
}

/// A resolved canonical entry, borrowed from the dictionary.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalEntry<'d> {
    pub entry: EntryRef,
    pub name: &'d str,
    pub weight: Level,
    pub associations: &'d BTreeSet<Association>,
}

/// The kind of content a submission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Song,
    Website,
    Document,
}

impl ContentType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "song" => Some(ContentType::Song),
            "website" => Some(ContentType::Website),
            "document" => Some(ContentType::Document),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ContentType::Song => "song",
            ContentType::Website => "website",
            ContentType::Document => "document",
        };
        f.pad(tag)
    }
}

/// Caller supplied description of the rated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub title: String,
    pub creator: String,
    pub content_type: ContentType,
}

impl ContentMetadata {
    pub fn new(title: impl Into<String>, creator: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            title: title.into(),
            creator: creator.into(),
            content_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_rejects_out_of_range_values() {
        assert_eq!(Level::new(-1), None);
        assert_eq!(Level::new(4), None);
        assert_eq!(Level::new(2), Some(Level::MODERATE));
    }

    #[test]
    fn level_saturates_at_heavy() {
        assert_eq!(Level::saturating(7), Level::HEAVY);
        assert_eq!(Level::saturating(1), Level::SLIGHT);
    }

    #[test]
    fn level_deserialization_is_range_checked() {
        assert!(serde_json::from_str::<Level>("3").is_ok());
        assert!(serde_json::from_str::<Level>("9").is_err());
    }

    #[test]
    fn content_type_tags_are_case_insensitive() {
        assert_eq!(ContentType::parse("Song"), Some(ContentType::Song));
        assert_eq!(ContentType::parse(" website "), Some(ContentType::Website));
        assert_eq!(ContentType::parse("podcast"), None);
    }
}
