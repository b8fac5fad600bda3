//! Read-only accessors over OpenAlex work records.
//!
//! Records stay as the raw JSON objects the API returned. These helpers pull
//! out the handful of fields the statistics and classification code needs,
//! tolerating missing or null values the way the API actually serves them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// An unstructured OpenAlex entity as returned by the API
pub type Record = Map<String, Value>;

/// Prefix OpenAlex puts in front of every entity id
pub const OPENALEX_ID_PREFIX: &str = "https://openalex.org/";

/// Author of a work, as listed in its authorships
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub author_name: String,
    pub author_url: String,
}

fn short_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)([WASIPCFTK]\d+)/?$")
            .unwrap_or_else(|_| Regex::new(r"$^").expect("Empty regex"))
    })
}

/// Reduce an OpenAlex id or URL to its short form (`W123`, `A456`, `S789`).
///
/// Returns the trimmed input unchanged when it does not end in an id.
pub fn short_id(id: &str) -> String {
    let id = id.trim();
    match short_id_pattern().captures(id) {
        Some(caps) => caps[1].to_uppercase(),
        None => id.strip_prefix(OPENALEX_ID_PREFIX).unwrap_or(id).to_string(),
    }
}

/// Full OpenAlex id of the record
pub fn id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Title, empty when missing or null
pub fn title(record: &Record) -> &str {
    record.get("title").and_then(Value::as_str).unwrap_or_default()
}

pub fn publication_year(record: &Record) -> Option<i64> {
    record.get("publication_year").and_then(Value::as_i64)
}

/// Citation count, 0 when missing
pub fn cited_by_count(record: &Record) -> i64 {
    record
        .get("cited_by_count")
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

/// List URL of the works citing this one
pub fn cited_by_api_url(record: &Record) -> Option<&str> {
    record
        .get("cited_by_api_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
}

/// Authors listed in `authorships`, with `"N/A"` for missing names or ids
pub fn authors(record: &Record) -> Vec<AuthorRef> {
    let Some(authorships) = record.get("authorships").and_then(Value::as_array) else {
        return Vec::new();
    };

    authorships
        .iter()
        .map(|authorship| {
            let author = authorship.get("author");
            let field = |name: &str| {
                author
                    .and_then(|a| a.get(name))
                    .and_then(Value::as_str)
                    .unwrap_or("N/A")
                    .to_string()
            };
            AuthorRef {
                author_name: field("display_name"),
                author_url: field("id"),
            }
        })
        .collect()
}

/// Display names under `field`, skipping entries without a string name.
///
/// Entries may be objects with `display_name` or bare strings.
pub fn display_names<'a>(record: &'a Record, field: &str) -> Vec<&'a str> {
    record
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name.as_str()),
                    Value::Object(obj) => obj.get("display_name").and_then(Value::as_str),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn keyword_names(record: &Record) -> Vec<&str> {
    display_names(record, "keywords")
}

pub fn concept_names(record: &Record) -> Vec<&str> {
    display_names(record, "concepts")
}

pub fn topic_names(record: &Record) -> Vec<&str> {
    display_names(record, "topics")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("https://openalex.org/W2741809807"), "W2741809807");
        assert_eq!(short_id("S4210216073"), "S4210216073");
        assert_eq!(short_id(" https://openalex.org/a5023888391 "), "A5023888391");
        assert_eq!(short_id("https://openalex.org/"), "");
    }

    #[test]
    fn test_scalar_accessors() {
        let work = record(json!({
            "id": "https://openalex.org/W1",
            "title": null,
            "publication_year": 2019,
            "cited_by_api_url": "https://api.openalex.org/works?filter=cites:W1"
        }));
        assert_eq!(id(&work), Some("https://openalex.org/W1"));
        assert_eq!(title(&work), "");
        assert_eq!(publication_year(&work), Some(2019));
        assert_eq!(cited_by_count(&work), 0);
        assert!(cited_by_api_url(&work).is_some());
    }

    #[test]
    fn test_authors_fill_missing_fields() {
        let work = record(json!({
            "authorships": [
                {"author": {"display_name": "Ada Lovelace", "id": "https://openalex.org/A1"}},
                {"author": {"display_name": "Anonymous"}},
                {}
            ]
        }));
        let list = authors(&work);
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].author_url, "https://openalex.org/A1");
        assert_eq!(list[1].author_url, "N/A");
        assert_eq!(list[2].author_name, "N/A");
    }

    #[test]
    fn test_display_names_mixed_shapes() {
        let work = record(json!({
            "keywords": ["carbon tax", {"display_name": "Energy"}, {"display_name": null}, 7],
            "concepts": [{"display_name": "Economics", "score": 0.4}]
        }));
        assert_eq!(keyword_names(&work), vec!["carbon tax", "Energy"]);
        assert_eq!(concept_names(&work), vec!["Economics"]);
        assert!(topic_names(&work).is_empty());
    }
}
