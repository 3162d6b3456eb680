use crate::config::RaterConfig;
use crate::core::aggregator::{RatingAggregator, RatingResult};
use crate::core::dictionary::Dictionary;
use crate::core::matcher::match_text;
use crate::core::types::{ContentMetadata, Level};
use crate::error::RaterResult;
use crate::history::{ContentRating, HistorySnapshot, RatingHistory};
use crate::import::{import_tables, DictionaryTables, ImportReport};
use crate::persistence::{load_or_else, save_to_disk};
use parking_lot::{RwLock, RwLockReadGuard};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// The rating engine: a shared dictionary, the aggregator, and every user's history.
///
/// Rating only takes the dictionary's read lock, so any number of texts can
/// be rated at once. Imports take the write lock for their whole duration.
pub struct RatingEngine {
    dictionary: RwLock<Dictionary>,
    history: RatingHistory,
    aggregator: RatingAggregator,
    config: RaterConfig,
}

impl RatingEngine {
    pub fn new(config: RaterConfig) -> Self {
        Self::with_parts(Dictionary::new(), RatingHistory::new(), config)
    }

    pub fn with_dictionary(dictionary: Dictionary, config: RaterConfig) -> Self {
        Self::with_parts(dictionary, RatingHistory::new(), config)
    }

    fn with_parts(dictionary: Dictionary, history: RatingHistory, config: RaterConfig) -> Self {
        Self {
            dictionary: RwLock::new(dictionary),
            history,
            aggregator: RatingAggregator::new(config.rating.repetition_threshold),
            config,
        }
    }

    /// Loads the dictionary and history snapshots named by `config`, starting
    /// empty for any that are missing.
    pub fn from_files_or_new(config: RaterConfig) -> Self {
        let dictionary = load_or_else(&config.dictionary_path, Dictionary::new);
        let snapshot = load_or_else(&config.history_path, HistorySnapshot::default);
        Self::with_parts(dictionary, RatingHistory::from_snapshot(snapshot), config)
    }

    pub fn config(&self) -> &RaterConfig {
        &self.config
    }

    /// Read access to the current dictionary, for browsing.
    pub fn dictionary(&self) -> RwLockReadGuard<'_, Dictionary> {
        self.dictionary.read()
    }

    /// Rates `text` against the current dictionary. Never fails.
    pub fn rate(&self, text: &str) -> RatingResult {
        let dictionary = self.dictionary.read();
        self.rate_with(&dictionary, text)
    }

    /// Rates several texts in parallel against one dictionary snapshot.
    pub fn rate_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<RatingResult> {
        let dictionary = self.dictionary.read();
        texts
            .par_iter()
            .map(|text| self.rate_with(&dictionary, text.as_ref()))
            .collect()
    }

    fn rate_with(&self, dictionary: &Dictionary, text: &str) -> RatingResult {
        let events = match_text(dictionary, text);
        let result = self.aggregator.aggregate(dictionary, &events);
        tracing::debug!(matches = events.len(), overall = %result.overall_rating, "text rated");
        result
    }

    pub fn record_rating(&self, user: &str, content: ContentMetadata, result: RatingResult) -> ContentRating {
        self.history.append(user, content, result)
    }

    /// Rates `text` and records the result in `user`'s history.
    pub fn rate_and_record(&self, user: &str, content: ContentMetadata, text: &str) -> ContentRating {
        let result = self.rate(text);
        self.record_rating(user, content, result)
    }

    /// The `n` most recent ratings of `user`, newest first.
    pub fn get_history(&self, user: &str, n: usize) -> Vec<ContentRating> {
        self.history.most_recent(user, n)
    }

    /// Recent ratings using the configured default count.
    pub fn recent_history(&self, user: &str) -> Vec<ContentRating> {
        self.get_history(user, self.config.history.default_len)
    }

    /// The rating at 1-based `position`, newest first.
    pub fn get_at(&self, user: &str, position: usize) -> Option<ContentRating> {
        self.history.at(user, position)
    }

    /// Sets `user`'s own weight for a dictionary category.
    ///
    /// Returns `false`, storing nothing, when the category is unknown. The
    /// weight is a user preference; it does not change how text is rated.
    pub fn set_user_category_weight(&self, user: &str, category: &str, weight: Level) -> bool {
        let dictionary = self.dictionary.read();
        let Some(id) = dictionary.category_id(category) else {
            return false;
        };
        self.history
            .set_category_weight(user, &dictionary.category(id).name, weight);
        true
    }

    /// Every dictionary category with `user`'s weight for it, falling back to
    /// the category's base weight where the user has not set one.
    pub fn user_categories(&self, user: &str) -> BTreeMap<String, Level> {
        let own = self.history.category_weights(user);
        self.dictionary
            .read()
            .categories()
            .iter()
            .map(|category| {
                let weight = own.get(&category.name).copied().unwrap_or(category.weight);
                (category.name.clone(), weight)
            })
            .collect()
    }

    pub fn import(&self, tables: &DictionaryTables) -> ImportReport {
        let mut dictionary = self.dictionary.write();
        import_tables(&mut dictionary, tables)
    }

    pub fn import_file(&self, path: &Path) -> RaterResult<ImportReport> {
        let tables = DictionaryTables::from_file(path)?;
        tracing::info!(path = %path.display(), "importing dictionary tables");
        Ok(self.import(&tables))
    }

    /// Writes the dictionary and history snapshots to their configured paths.
    pub fn save(&self) -> RaterResult<()> {
        save_to_disk(&*self.dictionary.read(), &self.config.dictionary_path)?;
        save_to_disk(&self.history.snapshot(), &self.config.history_path)
    }
}
