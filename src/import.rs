// File: src/import.rs
//! Loading the five dictionary tables into a [`Dictionary`].
//!
//! Bad rows never abort an import. Every row yields a [`RowOutcome`] and the
//! outcomes are collected into an [`ImportReport`].

use crate::core::dictionary::Dictionary;
use crate::core::tokenizer::{normalize_phrase, normalize_token};
use crate::core::types::{Association, Level, Strength};
use crate::error::RaterResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A table cell that may arrive as a number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Text(String::new())
    }
}

impl Cell {
    fn level(&self) -> Result<Level, SkipReason> {
        let value = match self {
            Cell::Int(v) => *v,
            Cell::Text(s) => s.trim().parse::<i64>().map_err(|_| SkipReason::InvalidWeight(s.clone()))?,
            other => return Err(SkipReason::InvalidWeight(other.to_string())),
        };
        Level::new(value).ok_or(SkipReason::WeightOutOfRange(value))
    }

    fn is_truthy(&self) -> bool {
        match self {
            Cell::Flag(b) => *b,
            Cell::Int(v) => *v != 0,
            Cell::Float(v) => *v != 0.0,
            Cell::Text(s) => matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "t" | "yes" | "y" | "1" | "strong"
            ),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Flag(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRow {
    pub category: String,
    pub weight: Cell,
    pub parent1: String,
    pub parent2: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WordRow {
    pub word: String,
    pub weight: Cell,
    pub category1: String,
    pub strong1: Option<Cell>,
    pub category2: String,
    pub strong2: Option<Cell>,
    pub category3: String,
    pub strong3: Option<Cell>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseRow {
    pub phrase: String,
    pub weight: Cell,
    pub category: String,
    /// Missing means strong.
    pub strong: Option<Cell>,
    pub word1: String,
    pub word2: String,
    pub word3: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WordSpellingRow {
    pub word: String,
    pub spelling: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseSpellingRow {
    pub phrase: String,
    pub spelling: String,
}

/// The five dictionary tables, as imported from a JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryTables {
    pub categories: Vec<CategoryRow>,
    pub words: Vec<WordRow>,
    pub phrases: Vec<PhraseRow>,
    pub word_spellings: Vec<WordSpellingRow>,
    pub phrase_spellings: Vec<PhraseSpellingRow>,
}

impl DictionaryTables {
    pub fn from_file(path: &Path) -> RaterResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Table {
    Category,
    Word,
    Phrase,
    WordSpelling,
    PhraseSpelling,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Category => "category",
            Table::Word => "word",
            Table::Phrase => "phrase",
            Table::WordSpelling => "word spelling",
            Table::PhraseSpelling => "phrase spelling",
        };
        f.pad(name)
    }
}

/// Why a row, or one reference inside a row, was left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum SkipReason {
    #[error("key is blank")]
    EmptyKey,
    #[error("weight {0:?} is not an integer")]
    InvalidWeight(String),
    #[error("weight {0} is outside 0..=3")]
    WeightOutOfRange(i64),
    #[error("parent '{0}' does not exist")]
    UnknownParent(String),
    #[error("parent '{0}' would create a cycle")]
    ParentCycle(String),
    #[error("category '{0}' does not exist")]
    UnknownCategory(String),
    #[error("word '{0}' does not exist")]
    UnknownWord(String),
    #[error("phrase '{0}' does not exist")]
    UnknownPhrase(String),
    #[error("spelling '{0}' is already a canonical entry")]
    SpellingIsCanonical(String),
    #[error("'{0}' is not a single word")]
    NotOneWord(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowOutcome {
    Imported,
    /// Imported, but some references in the row were dropped.
    Partial(Vec<SkipReason>),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReport {
    pub table: Table,
    /// Zero-based index of the row within its table.
    pub row: usize,
    pub key: String,
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows: Vec<RowReport>,
}

impl ImportReport {
    /// Rows of `table` that made it into the dictionary, fully or partially.
    pub fn imported(&self, table: Table) -> usize {
        self.rows_of(table)
            .filter(|r| !matches!(r.outcome, RowOutcome::Skipped(_)))
            .count()
    }

    pub fn skipped(&self, table: Table) -> usize {
        self.rows_of(table)
            .filter(|r| matches!(r.outcome, RowOutcome::Skipped(_)))
            .count()
    }

    /// Every skipped row and dropped reference, in import order.
    pub fn problems(&self) -> impl Iterator<Item = (&RowReport, &SkipReason)> {
        self.rows.iter().flat_map(|r| {
            let reasons: Vec<&SkipReason> = match &r.outcome {
                RowOutcome::Imported => Vec::new(),
                RowOutcome::Partial(reasons) => reasons.iter().collect(),
                RowOutcome::Skipped(reason) => vec![reason],
            };
            reasons.into_iter().map(move |reason| (r, reason))
        })
    }

    fn rows_of(&self, table: Table) -> impl Iterator<Item = &RowReport> {
        self.rows.iter().filter(move |r| r.table == table)
    }

    fn record(&mut self, table: Table, row: usize, key: &str, outcome: RowOutcome) {
        match &outcome {
            RowOutcome::Imported => {}
            RowOutcome::Partial(reasons) => {
                for reason in reasons {
                    tracing::warn!(%table, row, key, %reason, "skipping reference");
                }
            }
            RowOutcome::Skipped(reason) => {
                tracing::warn!(%table, row, key, %reason, "skipping row");
            }
        }
        self.rows.push(RowReport {
            table,
            row,
            key: key.to_string(),
            outcome,
        });
    }
}

fn outcome(dropped: Vec<SkipReason>) -> RowOutcome {
    if dropped.is_empty() {
        RowOutcome::Imported
    } else {
        RowOutcome::Partial(dropped)
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Why a word key failed to normalize to a single token.
fn word_key_problem(raw: &str) -> SkipReason {
    if normalize_phrase(raw).is_empty() {
        SkipReason::EmptyKey
    } else {
        SkipReason::NotOneWord(raw.trim().to_string())
    }
}

/// Imports all tables in dependency order: categories, words, phrases, word
/// spellings, phrase spellings. Importing the same tables twice leaves the
/// dictionary as importing them once did.
pub fn import_tables(dictionary: &mut Dictionary, tables: &DictionaryTables) -> ImportReport {
    let mut report = ImportReport::default();
    import_categories(dictionary, &tables.categories, &mut report);
    import_words(dictionary, &tables.words, &mut report);
    import_phrases(dictionary, &tables.phrases, &mut report);
    import_word_spellings(dictionary, &tables.word_spellings, &mut report);
    import_phrase_spellings(dictionary, &tables.phrase_spellings, &mut report);
    tracing::info!(rows = report.rows.len(), problems = report.problems().count(), "dictionary import complete");
    report
}

/// Categories go in two passes so a parent listed later in the table still resolves.
fn import_categories(dictionary: &mut Dictionary, rows: &[CategoryRow], report: &mut ImportReport) {
    let mut accepted = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if blank(&row.category) {
            report.record(Table::Category, idx, &row.category, RowOutcome::Skipped(SkipReason::EmptyKey));
            continue;
        }
        let weight = match row.weight.level() {
            Ok(weight) => weight,
            Err(reason) => {
                report.record(Table::Category, idx, &row.category, RowOutcome::Skipped(reason));
                continue;
            }
        };
        if let Some(id) = dictionary.upsert_category(&row.category, weight) {
            accepted.push((idx, id, row));
        }
    }

    for (idx, id, row) in accepted {
        let mut dropped = Vec::new();
        let mut parents = Vec::new();
        for name in [&row.parent1, &row.parent2] {
            if blank(name) {
                continue;
            }
            match dictionary.category_id(name) {
                Some(parent) => parents.push(parent),
                None => dropped.push(SkipReason::UnknownParent(name.trim().to_string())),
            }
        }
        for rejected in dictionary.set_parents(id, &parents).unwrap_or_default() {
            dropped.push(SkipReason::ParentCycle(dictionary.category(rejected).name.clone()));
        }
        report.record(Table::Category, idx, &row.category, outcome(dropped));
    }
}

fn import_words(dictionary: &mut Dictionary, rows: &[WordRow], report: &mut ImportReport) {
    for (idx, row) in rows.iter().enumerate() {
        if blank(&row.word) {
            report.record(Table::Word, idx, &row.word, RowOutcome::Skipped(SkipReason::EmptyKey));
            continue;
        }
        let weight = match row.weight.level() {
            Ok(weight) => weight,
            Err(reason) => {
                report.record(Table::Word, idx, &row.word, RowOutcome::Skipped(reason));
                continue;
            }
        };

        let mut dropped = Vec::new();
        let mut associations = BTreeSet::new();
        let pairs = [
            (&row.category1, &row.strong1),
            (&row.category2, &row.strong2),
            (&row.category3, &row.strong3),
        ];
        for (name, strong) in pairs {
            if blank(name) {
                continue;
            }
            match dictionary.category_id(name) {
                Some(category) => {
                    let strong = strong.as_ref().is_some_and(Cell::is_truthy);
                    associations.insert(Association {
                        category,
                        strength: Strength::from_flag(strong),
                    });
                }
                None => dropped.push(SkipReason::UnknownCategory(name.trim().to_string())),
            }
        }

        let result = match dictionary.upsert_word(&row.word, weight, associations) {
            Some(_) => outcome(dropped),
            None => RowOutcome::Skipped(word_key_problem(&row.word)),
        };
        report.record(Table::Word, idx, &row.word, result);
    }
}

fn import_phrases(dictionary: &mut Dictionary, rows: &[PhraseRow], report: &mut ImportReport) {
    for (idx, row) in rows.iter().enumerate() {
        if blank(&row.phrase) {
            report.record(Table::Phrase, idx, &row.phrase, RowOutcome::Skipped(SkipReason::EmptyKey));
            continue;
        }
        let weight = match row.weight.level() {
            Ok(weight) => weight,
            Err(reason) => {
                report.record(Table::Phrase, idx, &row.phrase, RowOutcome::Skipped(reason));
                continue;
            }
        };
        let Some(category) = dictionary.category_id(&row.category) else {
            let reason = SkipReason::UnknownCategory(row.category.trim().to_string());
            report.record(Table::Phrase, idx, &row.phrase, RowOutcome::Skipped(reason));
            continue;
        };
        let strong = row.strong.as_ref().map_or(true, Cell::is_truthy);

        let mut dropped = Vec::new();
        let mut words = Vec::new();
        for word in [&row.word1, &row.word2, &row.word3] {
            if blank(word) {
                continue;
            }
            match dictionary.word_id(word) {
                Some(id) => words.push(id),
                None => dropped.push(SkipReason::UnknownWord(word.trim().to_string())),
            }
        }

        let associations = BTreeSet::from([Association {
            category,
            strength: Strength::from_flag(strong),
        }]);
        let result = match dictionary.upsert_phrase(&row.phrase, weight, words, associations) {
            Some(_) => outcome(dropped),
            None => RowOutcome::Skipped(SkipReason::EmptyKey),
        };
        report.record(Table::Phrase, idx, &row.phrase, result);
    }
}

fn import_word_spellings(dictionary: &mut Dictionary, rows: &[WordSpellingRow], report: &mut ImportReport) {
    for (idx, row) in rows.iter().enumerate() {
        let result = if normalize_token(&row.spelling).is_none() {
            RowOutcome::Skipped(word_key_problem(&row.spelling))
        } else {
            match dictionary.word_id(&row.word) {
                None => RowOutcome::Skipped(SkipReason::UnknownWord(row.word.trim().to_string())),
                Some(word) if dictionary.upsert_word_spelling(&row.spelling, word) => RowOutcome::Imported,
                Some(_) => RowOutcome::Skipped(SkipReason::SpellingIsCanonical(row.spelling.trim().to_string())),
            }
        };
        report.record(Table::WordSpelling, idx, &row.spelling, result);
    }
}

fn import_phrase_spellings(dictionary: &mut Dictionary, rows: &[PhraseSpellingRow], report: &mut ImportReport) {
    for (idx, row) in rows.iter().enumerate() {
        let result = if blank(&row.spelling) {
            RowOutcome::Skipped(SkipReason::EmptyKey)
        } else {
            match dictionary.phrase_id(&row.phrase) {
                None => RowOutcome::Skipped(SkipReason::UnknownPhrase(row.phrase.trim().to_string())),
                Some(phrase) if dictionary.upsert_phrase_spelling(&row.spelling, phrase) => RowOutcome::Imported,
                Some(_) => RowOutcome::Skipped(SkipReason::SpellingIsCanonical(row.spelling.trim().to_string())),
            }
        };
        report.record(Table::PhraseSpelling, idx, &row.spelling, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tables() -> DictionaryTables {
        serde_json::from_value(json!({
            "categories": [
                {"category": "Profanity", "weight": "2", "parent1": "Language", "parent2": ""},
                {"category": "Language", "weight": 1, "parent1": "Profanity"},
                {"category": "Broken", "weight": "two"},
                {"category": "Violence", "weight": 3, "parent1": "Nowhere"}
            ],
            "words": [
                {"word": "heck", "weight": 1, "category1": "Profanity", "strong1": false,
                 "category2": "Violence", "strong2": "true", "category3": "Missing"},
                {"word": "darn", "weight": "x", "category1": "Profanity"}
            ],
            "phrases": [
                {"phrase": "what the heck", "weight": 2, "category": "Profanity",
                 "word1": "what", "word2": "the", "word3": "heck"},
                {"phrase": "oh my", "weight": 1, "category": "Nope"}
            ],
            "word_spellings": [
                {"word": "heck", "spelling": "hek"},
                {"word": "darn", "spelling": "dern"}
            ],
            "phrase_spellings": [
                {"phrase": "what the heck", "spelling": "wth"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn bad_weights_skip_the_row_only() {
        let mut dict = Dictionary::new();
        let report = import_tables(&mut dict, &tables());

        assert_eq!(report.imported(Table::Category), 3);
        assert_eq!(report.skipped(Table::Category), 1);
        assert!(dict.category_id("Broken").is_none());
        assert!(dict.word_id("darn").is_none());
        assert_eq!(report.skipped(Table::Word), 1);
    }

    #[test]
    fn missing_references_are_dropped_not_fatal() {
        let mut dict = Dictionary::new();
        let report = import_tables(&mut dict, &tables());

        assert_eq!(dict.categories_of("heck"), vec!["Profanity", "Violence"]);
        assert!(dict.parents_of("Violence").is_empty());
        let heck = report
            .rows
            .iter()
            .find(|r| r.table == Table::Word && r.key == "heck")
            .unwrap();
        assert_eq!(
            heck.outcome,
            RowOutcome::Partial(vec![SkipReason::UnknownCategory("Missing".into())])
        );
    }

    #[test]
    fn parents_resolve_across_the_table_and_cycles_are_cut() {
        let mut dict = Dictionary::new();
        let report = import_tables(&mut dict, &tables());

        assert_eq!(dict.parents_of("Profanity"), vec!["Language"]);
        assert!(dict.parents_of("Language").is_empty());
        assert!(report
            .problems()
            .any(|(_, reason)| *reason == SkipReason::ParentCycle("Profanity".into())));
    }

    #[test]
    fn phrases_and_spellings_import() {
        let mut dict = Dictionary::new();
        let report = import_tables(&mut dict, &tables());

        let phrase = dict.phrase_id("what the heck").unwrap();
        assert!(dict.phrase(phrase).variants.contains("wth"));
        assert_eq!(dict.phrase(phrase).words.len(), 1);
        assert_eq!(report.skipped(Table::Phrase), 1);
        assert_eq!(report.imported(Table::WordSpelling), 1);
        assert_eq!(report.skipped(Table::WordSpelling), 1);
        assert_eq!(dict.resolve("hek").unwrap().name, "heck");
    }

    #[test]
    fn importing_twice_matches_importing_once() {
        let mut once = Dictionary::new();
        let first = import_tables(&mut once, &tables());
        let mut twice = once.clone();
        let second = import_tables(&mut twice, &tables());

        assert_eq!(first, second);
        assert_eq!(observable(&once), observable(&twice));
    }

    fn observable(dict: &Dictionary) -> String {
        let words: Vec<_> = (0..dict.word_count()).map(|id| dict.word(id)).collect();
        let phrases: Vec<_> = (0..dict.phrase_count()).map(|id| dict.phrase(id)).collect();
        format!("{:?}\n{:?}\n{:?}", dict.categories(), words, phrases)
    }

    #[test]
    fn multi_word_keys_are_refused_in_word_tables() {
        let tables: DictionaryTables = serde_json::from_value(json!({
            "categories": [{"category": "Profanity", "weight": 2}],
            "words": [
                {"word": "heck", "weight": 1, "category1": "Profanity"},
                {"word": "heck,heck", "weight": 1, "category1": "Profanity"},
                {"word": "?!", "weight": 1}
            ],
            "word_spellings": [
                {"word": "heck", "spelling": "h.e.k"},
                {"word": "heck", "spelling": "hek"}
            ]
        }))
        .unwrap();
        let mut dict = Dictionary::new();
        let report = import_tables(&mut dict, &tables);

        let reasons: Vec<_> = report.problems().map(|(_, reason)| reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::NotOneWord("heck,heck".into()),
                SkipReason::EmptyKey,
                SkipReason::NotOneWord("h.e.k".into()),
            ]
        );
        assert_eq!(dict.word_count(), 1);
        assert_eq!(dict.resolve("hek").unwrap().name, "heck");
    }

    #[test]
    fn weight_cells_parse_numbers_and_text() {
        assert_eq!(Cell::Int(3).level(), Ok(Level::HEAVY));
        assert_eq!(Cell::Text(" 1 ".into()).level(), Ok(Level::SLIGHT));
        assert_eq!(Cell::Int(5).level(), Err(SkipReason::WeightOutOfRange(5)));
        assert_eq!(Cell::Float(1.5).level(), Err(SkipReason::InvalidWeight("1.5".into())));
    }
}
