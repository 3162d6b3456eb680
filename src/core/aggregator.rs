// File: src/core/aggregator.rs
use crate::core::dictionary::Dictionary;
use crate::core::matcher::MatchEvent;
use crate::core::types::{Level, Strength};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of occurrences in one heavy category that escalates its rating.
pub const DEFAULT_REPETITION_THRESHOLD: u32 = 3;

/// Categories with at least this base weight escalate on repetition.
const ESCALATING_CATEGORY_WEIGHT: Level = Level::MODERATE;

/// The rating of one submission.
///
/// Every category known to the dictionary has an entry in both maps, even
/// when nothing in the text matched it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingResult {
    pub overall_rating: Level,
    pub category_ratings: BTreeMap<String, Level>,
    /// category -> canonical word or phrase -> occurrences
    pub category_word_counts: BTreeMap<String, BTreeMap<String, u32>>,
}

impl RatingResult {
    /// The overall rating implied by a set of category ratings: their maximum.
    pub fn overall_of(category_ratings: &BTreeMap<String, Level>) -> Level {
        category_ratings.values().copied().max().unwrap_or_default()
    }
}

/// Folds match events into a [`RatingResult`].
///
/// Category rating: the highest single contribution (a strong match gives
/// its full weight, a weak match half of it rounded up), raised one step when
/// the category weighs [`Level::MODERATE`] or more and its occurrences reach
/// `repetition_threshold`. Overall rating: the highest category rating.
#[derive(Debug, Clone, Copy)]
pub struct RatingAggregator {
    repetition_threshold: u32,
}

impl Default for RatingAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_REPETITION_THRESHOLD)
    }
}

#[derive(Default)]
struct CategoryTally {
    best: u32,
    occurrences: u32,
}

impl RatingAggregator {
    pub fn new(repetition_threshold: u32) -> Self {
        Self {
            repetition_threshold: repetition_threshold.max(1),
        }
    }

    pub fn aggregate(&self, dictionary: &Dictionary, events: &[MatchEvent<'_>]) -> RatingResult {
        let categories = dictionary.categories();
        let mut tallies: Vec<CategoryTally> = categories.iter().map(|_| CategoryTally::default()).collect();
        let mut counts: Vec<BTreeMap<String, u32>> = vec![BTreeMap::new(); categories.len()];

        for event in events {
            let entry = &event.entry;
            for assoc in entry.associations {
                *counts[assoc.category].entry(entry.name.to_string()).or_insert(0) += 1;
                let tally = &mut tallies[assoc.category];
                tally.occurrences += 1;
                tally.best = tally.best.max(contribution(entry.weight, assoc.strength));
            }
        }

        let mut result = RatingResult::default();
        for ((category, tally), words) in categories.iter().zip(tallies).zip(counts) {
            let rating = self.category_rating(category.weight, &tally);
            result.category_ratings.insert(category.name.clone(), rating);
            result.category_word_counts.insert(category.name.clone(), words);
        }
        result.overall_rating = RatingResult::overall_of(&result.category_ratings);
        result
    }

    fn category_rating(&self, base: Level, tally: &CategoryTally) -> Level {
        if tally.occurrences == 0 {
            return Level::INNOCUOUS;
        }
        let escalation = u32::from(base >= ESCALATING_CATEGORY_WEIGHT && tally.occurrences >= self.repetition_threshold);
        Level::saturating(tally.best + escalation)
    }
}

fn contribution(weight: Level, strength: Strength) -> u32 {
    let weight = u32::from(weight.value());
    match strength {
        Strength::Strong => weight,
        Strength::Weak => weight.div_ceil(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matcher::match_text;
    use crate::core::types::Association;
    use std::collections::BTreeSet;

    fn dictionary() -> Dictionary {
        let mut dict = Dictionary::new();
        let profanity = dict.upsert_category("Profanity", Level::MODERATE).unwrap();
        let violence = dict.upsert_category("Violence", Level::HEAVY).unwrap();
        dict.upsert_category("Slang", Level::INNOCUOUS).unwrap();
        let slang = dict.category_id("Slang").unwrap();

        let heck = dict
            .upsert_word(
                "heck",
                Level::SLIGHT,
                BTreeSet::from([Association { category: profanity, strength: Strength::Weak }]),
            )
            .unwrap();
        dict.upsert_phrase(
            "what the heck",
            Level::MODERATE,
            vec![heck],
            BTreeSet::from([Association { category: profanity, strength: Strength::Strong }]),
        );
        dict.upsert_word(
            "stab",
            Level::HEAVY,
            BTreeSet::from([
                Association { category: violence, strength: Strength::Weak },
                Association { category: slang, strength: Strength::Strong },
            ]),
        );
        dict
    }

    fn rate(dict: &Dictionary, text: &str) -> RatingResult {
        RatingAggregator::default().aggregate(dict, &match_text(dict, text))
    }

    #[test]
    fn strong_phrase_outranks_weak_word() {
        let dict = dictionary();
        let weak_only = rate(&dict, "heck");
        let with_phrase = rate(&dict, "what the heck, heck");

        assert_eq!(weak_only.category_ratings["Profanity"], Level::SLIGHT);
        assert_eq!(with_phrase.category_ratings["Profanity"], Level::MODERATE);
        assert_eq!(
            with_phrase.category_word_counts["Profanity"],
            BTreeMap::from([("heck".to_string(), 1), ("what the heck".to_string(), 1)])
        );
    }

    #[test]
    fn word_counts_land_in_every_category_of_the_word() {
        let dict = dictionary();
        let result = rate(&dict, "stab");
        assert_eq!(result.category_word_counts["Violence"]["stab"], 1);
        assert_eq!(result.category_word_counts["Slang"]["stab"], 1);
        assert!(result.category_word_counts["Profanity"].is_empty());
    }

    #[test]
    fn weak_contribution_rounds_up() {
        let dict = dictionary();
        let result = rate(&dict, "stab");
        assert_eq!(result.category_ratings["Violence"], Level::MODERATE);
        assert_eq!(result.category_ratings["Slang"], Level::HEAVY);
    }

    #[test]
    fn overall_is_the_highest_category_including_innocuous_ones() {
        let dict = dictionary();
        let result = rate(&dict, "stab");
        assert_eq!(result.category_ratings["Violence"], Level::MODERATE);
        assert_eq!(result.overall_rating, Level::HEAVY);
        assert_eq!(RatingResult::overall_of(&result.category_ratings), result.overall_rating);
    }

    #[test]
    fn punctuation_joined_words_are_rated_separately() {
        let dict = dictionary();
        let result = rate(&dict, "what the heck,heck.heck");
        assert_eq!(
            result.category_word_counts["Profanity"],
            BTreeMap::from([("heck".to_string(), 2), ("what the heck".to_string(), 1)])
        );
        assert_eq!(rate(&dict, "heck,heck").category_word_counts["Profanity"]["heck"], 2);
    }

    #[test]
    fn repetition_escalates_heavy_categories() {
        let dict = dictionary();
        assert_eq!(rate(&dict, "heck heck").category_ratings["Profanity"], Level::SLIGHT);
        assert_eq!(rate(&dict, "heck heck heck").category_ratings["Profanity"], Level::MODERATE);
    }

    #[test]
    fn empty_text_is_all_zero_but_covers_every_category() {
        let dict = dictionary();
        let result = rate(&dict, "   ");
        assert_eq!(result.overall_rating, Level::INNOCUOUS);
        assert_eq!(result.category_ratings.len(), 3);
        assert!(result.category_ratings.values().all(|&r| r == Level::INNOCUOUS));
        assert!(result.category_word_counts.values().all(BTreeMap::is_empty));
    }
}
