//! Keyword filtering and two-way keyword classification.
//!
//! All matching is case-insensitive substring matching: a keyword matches a
//! field value when the lowercased value contains the lowercased keyword.

use crate::work::{self, Record};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of comparing keyword counts for two term sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Classification {
    /// More matches for the first set
    First,
    /// More matches for the second set
    Second,
    /// Equal counts, including no matches at all
    Neither,
}

fn lowercase_all(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// True if any keyword occurs in the title or in a concept, keyword or topic name.
pub fn matches_any(record: &Record, keywords: &[String]) -> bool {
    let keywords = lowercase_all(keywords);
    if keywords.is_empty() {
        return false;
    }

    let mut fields = work::concept_names(record);
    fields.extend(work::keyword_names(record));
    fields.extend(work::topic_names(record));
    fields.push(work::title(record));

    fields.iter().any(|field| {
        let field = field.to_lowercase();
        keywords.iter().any(|k| field.contains(k.as_str()))
    })
}

/// Keep the works matching any keyword, preserving order.
pub fn filter_by_keywords(records: Vec<Record>, keywords: &[String]) -> Vec<Record> {
    records
        .into_iter()
        .filter(|r| matches_any(r, keywords))
        .collect()
}

/// Count keyword hits across keyword and concept names.
///
/// Each (keyword, name) pair that matches adds one, so a name containing two
/// keywords counts twice and a keyword found in three names counts three times.
pub fn count_matches(record: &Record, keywords: &[String]) -> usize {
    let names: Vec<String> = work::keyword_names(record)
        .into_iter()
        .chain(work::concept_names(record))
        .map(str::to_lowercase)
        .collect();

    lowercase_all(keywords)
        .iter()
        .map(|k| names.iter().filter(|name| name.contains(k.as_str())).count())
        .sum()
}

/// Compare hits for two keyword sets. Ties, including 0-0, are [`Classification::Neither`].
pub fn classify(record: &Record, first: &[String], second: &[String]) -> KeywordCounts {
    let first_count = count_matches(record, first);
    let second_count = count_matches(record, second);

    let class = match first_count.cmp(&second_count) {
        std::cmp::Ordering::Greater => Classification::First,
        std::cmp::Ordering::Less => Classification::Second,
        std::cmp::Ordering::Equal => Classification::Neither,
    };

    KeywordCounts {
        first: first_count,
        second: second_count,
        class,
    }
}

/// Hit counts for both sets and the resulting class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordCounts {
    pub first: usize,
    pub second: usize,
    pub class: Classification,
}

/// Number of works per year where each set won
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YearCounts {
    pub first_higher: u64,
    pub second_higher: u64,
}

/// Per-year tally of [`Classification`] results; `Neither` is not counted.
#[derive(Debug, Default)]
pub struct YearlyTally {
    years: BTreeMap<i64, YearCounts>,
}

impl YearlyTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one work. A year seen only with ties gets no row.
    pub fn record(&mut self, year: i64, class: Classification) {
        match class {
            Classification::First => self.years.entry(year).or_default().first_higher += 1,
            Classification::Second => self.years.entry(year).or_default().second_higher += 1,
            Classification::Neither => {}
        }
    }

    /// Years in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (i64, YearCounts)> + '_ {
        self.years.iter().map(|(year, counts)| (*year, *counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matches_any_checks_every_field() {
        let by_title = record(json!({"title": "Carbon pricing in Europe"}));
        let by_topic = record(json!({"title": "x", "topics": [{"display_name": "Climate Change Policy"}]}));
        let by_concept = record(json!({"concepts": [{"display_name": "Pollution"}]}));
        let none = record(json!({"title": "Labour markets", "keywords": [{"display_name": "wages"}]}));

        let keywords = terms(&["carbon", "CLIMATE", "pollution"]);
        assert!(matches_any(&by_title, &keywords));
        assert!(matches_any(&by_topic, &keywords));
        assert!(matches_any(&by_concept, &keywords));
        assert!(!matches_any(&none, &keywords));
        assert!(!matches_any(&by_title, &[]));
    }

    #[test]
    fn test_filter_by_keywords_keeps_order() {
        let works = vec![
            record(json!({"id": "1", "title": "Energy demand"})),
            record(json!({"id": "2", "title": "Trade"})),
            record(json!({"id": "3", "title": "Renewable energy"})),
        ];
        let kept = filter_by_keywords(works, &terms(&["energy"]));
        let ids: Vec<_> = kept.iter().filter_map(work::id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_count_matches_counts_pairs() {
        let work = record(json!({
            "title": "willingness to pay",
            "keywords": [{"display_name": "Willingness to pay"}, {"display_name": "contingent valuation"}],
            "concepts": [{"display_name": "Contingent valuation"}]
        }));
        // title is not counted; 1 keyword hit + 2 for contingent valuation
        let keywords = terms(&["willingness to pay", "contingent valuation"]);
        assert_eq!(count_matches(&work, &keywords), 3);
    }

    #[test]
    fn test_classify_and_ties() {
        let stated = terms(&["stated preference", "willingness to pay"]);
        let revealed = terms(&["revealed preference", "hedonic pricing"]);

        let sp = record(json!({"keywords": [{"display_name": "Willingness to pay"}]}));
        assert_eq!(classify(&sp, &stated, &revealed).class, Classification::First);

        let rp = record(json!({"concepts": [{"display_name": "Hedonic pricing"}]}));
        assert_eq!(classify(&rp, &stated, &revealed).class, Classification::Second);

        let tie = record(json!({"keywords": [
            {"display_name": "stated preference"},
            {"display_name": "revealed preference"}
        ]}));
        let counts = classify(&tie, &stated, &revealed);
        assert_eq!((counts.first, counts.second), (1, 1));
        assert_eq!(counts.class, Classification::Neither);

        let empty = Record::new();
        assert_eq!(classify(&empty, &stated, &revealed).class, Classification::Neither);
    }

    #[test]
    fn test_yearly_tally_skips_neither() {
        let mut tally = YearlyTally::new();
        tally.record(2021, Classification::First);
        tally.record(2019, Classification::Second);
        tally.record(2021, Classification::First);
        tally.record(2021, Classification::Neither);
        tally.record(2020, Classification::Neither);

        let rows: Vec<_> = tally.iter().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 2019);
        assert_eq!(rows[0].1.second_higher, 1);
        assert_eq!(rows[1].0, 2021);
        assert_eq!(rows[1].1.first_higher, 2);
        assert_eq!(rows[1].1.second_higher, 0);
    }
}
