// File: src/history.rs
use crate::core::aggregator::RatingResult;
use crate::core::types::{ContentMetadata, Level};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// A stored rating of one submission by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRating {
    pub id: u64,
    pub user: String,
    pub content: ContentMetadata,
    pub rating: Level,
    pub category_ratings: BTreeMap<String, Level>,
    pub category_word_counts: BTreeMap<String, BTreeMap<String, u32>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ContentRating {
    /// Occurrences per matched word or phrase, across all categories.
    pub fn word_counts(&self) -> BTreeMap<String, u32> {
        let mut counts = BTreeMap::new();
        for words in self.category_word_counts.values() {
            for (word, &count) in words {
                counts.insert(word.clone(), count);
            }
        }
        counts
    }

    /// The rating payload without the record bookkeeping.
    pub fn result(&self) -> RatingResult {
        RatingResult {
            overall_rating: self.rating,
            category_ratings: self.category_ratings.clone(),
            category_word_counts: self.category_word_counts.clone(),
        }
    }
}

/// Everything stored for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPartition {
    /// Oldest first.
    pub ratings: Vec<ContentRating>,
    /// The user's own weight for a category, by category name.
    pub category_weights: BTreeMap<String, Level>,
}

/// Serializable form of the whole history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub next_id: u64,
    pub partitions: HashMap<String, UserPartition>,
}

/// Per-user, append-only rating history.
///
/// Each user's records live in their own partition, oldest first, next to
/// the user's category weights. Writes for different users do not contend.
#[derive(Default)]
pub struct RatingHistory {
    partitions: DashMap<String, UserPartition>,
    next_id: AtomicU64,
}

impl RatingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: HistorySnapshot) -> Self {
        Self {
            partitions: snapshot.partitions.into_iter().collect(),
            next_id: AtomicU64::new(snapshot.next_id),
        }
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            next_id: self.next_id.load(Ordering::SeqCst),
            partitions: self
                .partitions
                .iter()
                .map(|p| (p.key().clone(), p.value().clone()))
                .collect(),
        }
    }

    /// Stores a new record for `user`. Never touches earlier records.
    pub fn append(&self, user: &str, content: ContentMetadata, result: RatingResult) -> ContentRating {
        self.append_at(user, content, result, Utc::now())
    }

    fn append_at(&self, user: &str, content: ContentMetadata, result: RatingResult, now: DateTime<Utc>) -> ContentRating {
        let mut partition = self.partitions.entry(user.to_string()).or_default();
        // Keep creation times non-decreasing within a partition even if the clock steps back.
        let created = partition.ratings.last().map_or(now, |last| now.max(last.created));
        let record = ContentRating {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user: user.to_string(),
            content,
            rating: result.overall_rating,
            category_ratings: result.category_ratings,
            category_word_counts: result.category_word_counts,
            created,
            updated: created,
        };
        partition.ratings.push(record.clone());
        tracing::debug!(user, id = record.id, rating = %record.rating, "rating recorded");
        record
    }

    /// Up to `n` records for `user`, newest first.
    pub fn most_recent(&self, user: &str, n: usize) -> Vec<ContentRating> {
        self.partitions
            .get(user)
            .map(|p| p.ratings.iter().rev().take(n).cloned().collect())
            .unwrap_or_default()
    }

    /// The record at 1-based `position` in newest-first order.
    pub fn at(&self, user: &str, position: usize) -> Option<ContentRating> {
        if position == 0 {
            return None;
        }
        let partition = self.partitions.get(user)?;
        let idx = partition.ratings.len().checked_sub(position)?;
        partition.ratings.get(idx).cloned()
    }

    pub fn len(&self, user: &str) -> usize {
        self.partitions.get(user).map_or(0, |p| p.ratings.len())
    }

    pub fn is_empty(&self, user: &str) -> bool {
        self.len(user) == 0
    }

    /// Sets `user`'s own weight for `category`, replacing any earlier one.
    pub fn set_category_weight(&self, user: &str, category: &str, weight: Level) {
        let mut partition = self.partitions.entry(user.to_string()).or_default();
        partition.category_weights.insert(category.to_string(), weight);
        tracing::debug!(user, category, weight = %weight, "category weight set");
    }

    /// The category weights `user` has set, by category name.
    pub fn category_weights(&self, user: &str) -> BTreeMap<String, Level> {
        self.partitions
            .get(user)
            .map(|p| p.category_weights.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ContentType;
    use chrono::Duration;

    fn result(level: Level) -> RatingResult {
        RatingResult {
            overall_rating: level,
            category_ratings: BTreeMap::from([("Profanity".to_string(), level)]),
            category_word_counts: BTreeMap::from([(
                "Profanity".to_string(),
                BTreeMap::from([("heck".to_string(), 2)]),
            )]),
        }
    }

    fn song(title: &str) -> ContentMetadata {
        ContentMetadata::new(title, "Someone", ContentType::Song)
    }

    #[test]
    fn most_recent_is_newest_first_and_bounded() {
        let history = RatingHistory::new();
        history.append("ana", song("one"), result(Level::SLIGHT));
        history.append("ana", song("two"), result(Level::HEAVY));

        let recent = history.most_recent("ana", 10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content.title, "two");
        assert!(recent[0].created >= recent[1].created);
        assert_eq!(history.most_recent("ana", 1).len(), 1);
    }

    #[test]
    fn at_is_one_based_and_matches_most_recent() {
        let history = RatingHistory::new();
        history.append("ana", song("one"), result(Level::SLIGHT));
        history.append("ana", song("two"), result(Level::MODERATE));

        assert_eq!(history.at("ana", 1), history.most_recent("ana", 1).into_iter().next());
        assert_eq!(history.at("ana", 2).unwrap().content.title, "one");
        assert!(history.at("ana", 0).is_none());
        assert!(history.at("ana", 3).is_none());
        assert!(history.at("bo", 1).is_none());
    }

    #[test]
    fn users_do_not_see_each_other() {
        let history = RatingHistory::new();
        history.append("ana", song("one"), result(Level::SLIGHT));
        assert!(history.most_recent("bo", 5).is_empty());
        assert!(history.is_empty("bo"));
    }

    #[test]
    fn clock_going_backwards_keeps_order() {
        let history = RatingHistory::new();
        let now = Utc::now();
        history.append_at("ana", song("one"), result(Level::SLIGHT), now);
        let second = history.append_at("ana", song("two"), result(Level::SLIGHT), now - Duration::seconds(30));
        assert_eq!(second.created, now);
        assert_eq!(history.most_recent("ana", 1)[0].id, second.id);
    }

    #[test]
    fn snapshot_restores_records_and_ids() {
        let history = RatingHistory::new();
        let first = history.append("ana", song("one"), result(Level::SLIGHT));
        let restored = RatingHistory::from_snapshot(history.snapshot());
        assert_eq!(restored.at("ana", 1), Some(first.clone()));
        let next = restored.append("ana", song("two"), result(Level::SLIGHT));
        assert!(next.id > first.id);
    }

    #[test]
    fn category_weights_are_per_user_and_replaced_on_update() {
        let history = RatingHistory::new();
        history.set_category_weight("ana", "Profanity", Level::SLIGHT);
        history.set_category_weight("ana", "Profanity", Level::HEAVY);
        history.set_category_weight("ana", "Violence", Level::INNOCUOUS);

        assert_eq!(
            history.category_weights("ana"),
            BTreeMap::from([
                ("Profanity".to_string(), Level::HEAVY),
                ("Violence".to_string(), Level::INNOCUOUS),
            ])
        );
        assert!(history.category_weights("bo").is_empty());
        assert!(history.is_empty("ana"));
    }

    #[test]
    fn snapshot_keeps_category_weights_beside_records() {
        let history = RatingHistory::new();
        history.append("ana", song("one"), result(Level::SLIGHT));
        history.set_category_weight("ana", "Profanity", Level::MODERATE);

        let restored = RatingHistory::from_snapshot(history.snapshot());
        assert_eq!(restored.category_weights("ana")["Profanity"], Level::MODERATE);
        assert_eq!(restored.len("ana"), 1);
    }

    #[test]
    fn stored_overall_rating_derives_from_category_ratings() {
        let history = RatingHistory::new();
        let mut slang_only = result(Level::INNOCUOUS);
        slang_only.category_ratings.insert("Slang".to_string(), Level::HEAVY);
        slang_only.overall_rating = RatingResult::overall_of(&slang_only.category_ratings);

        let record = history.append("ana", song("one"), slang_only);
        assert_eq!(record.rating, Level::HEAVY);
        assert_eq!(RatingResult::overall_of(&record.category_ratings), record.rating);
    }

    #[test]
    fn word_counts_flatten_categories() {
        let history = RatingHistory::new();
        let record = history.append("ana", song("one"), result(Level::SLIGHT));
        assert_eq!(record.word_counts(), BTreeMap::from([("heck".to_string(), 2)]));
        assert_eq!(record.result(), result(Level::SLIGHT));
    }
}
