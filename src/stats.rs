//! Citation statistics over fetched works.
//!
//! Covers the three aggregations the batch commands need: totals and means of
//! the N most cited works, the same figures restricted to a publication-year
//! window, and per-author citation totals.

use crate::work::{self, AuthorRef, Record};
use serde::Serialize;
use std::collections::HashMap;

/// Tier sizes reported by [`window_stats`] unless told otherwise
pub const DEFAULT_WINDOW_TIERS: &[usize] = &[100, 500];

/// Total and mean citations of the top `requested` works
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopSummary {
    pub requested: usize,
    pub actual_count: usize,
    pub total: i64,
    pub average: f64,
}

/// Sort works by `cited_by_count`, most cited first. Ties keep server order.
pub fn rank_by_citations(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by_key(|r| std::cmp::Reverse(work::cited_by_count(r)));
    records
}

/// Summarise the first `n` of an already ranked list.
pub fn top_n_summary(ranked: &[Record], n: usize) -> TopSummary {
    summarise(ranked.iter().map(work::cited_by_count), n)
}

fn summarise(counts: impl Iterator<Item = i64>, n: usize) -> TopSummary {
    let top: Vec<i64> = counts.take(n).collect();
    let total: i64 = top.iter().sum();
    let average = if top.is_empty() {
        0.0
    } else {
        total as f64 / top.len() as f64
    };

    TopSummary {
        requested: n,
        actual_count: top.len(),
        total,
        average,
    }
}

/// Citation figures for one year of a time window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStats {
    pub year: i64,
    /// One summary per tier, in the order the tiers were given
    pub tiers: Vec<TopSummary>,
}

impl WindowStats {
    /// Flatten into `year,total_100,average_100,...,actual_count_100,...` columns.
    pub fn to_row(&self) -> (Vec<String>, Vec<String>) {
        let mut headers = vec!["year".to_string()];
        let mut values = vec![self.year.to_string()];

        for tier in &self.tiers {
            headers.push(format!("total_{}", tier.requested));
            values.push(tier.total.to_string());
            headers.push(format!("average_{}", tier.requested));
            values.push(tier.average.to_string());
        }
        for tier in &self.tiers {
            headers.push(format!("actual_count_{}", tier.requested));
            values.push(tier.actual_count.to_string());
        }

        (headers, values)
    }
}

/// Citation statistics as they stood at the end of `year`.
///
/// Only works published in or before `year` take part, and each is credited
/// only with citing works published in or before `year`. `cited_by` maps a
/// work id to its citing works; works missing from it count zero.
pub fn window_stats(
    works: &[Record],
    cited_by: &HashMap<String, Vec<Record>>,
    year: i64,
    tiers: &[usize],
) -> WindowStats {
    let mut counts: Vec<i64> = works
        .iter()
        .filter(|w| work::publication_year(w).is_some_and(|y| y <= year))
        .map(|w| {
            work::id(w)
                .and_then(|id| cited_by.get(id))
                .map(|citing| {
                    citing
                        .iter()
                        .filter(|c| work::publication_year(c).is_some_and(|y| y <= year))
                        .count() as i64
                })
                .unwrap_or(0)
        })
        .collect();

    counts.sort_unstable_by(|a, b| b.cmp(a));

    WindowStats {
        year,
        tiers: tiers
            .iter()
            .map(|&n| summarise(counts.iter().copied(), n))
            .collect(),
    }
}

/// [`window_stats`] for each year, in the order given.
pub fn window_series(
    works: &[Record],
    cited_by: &HashMap<String, Vec<Record>>,
    years: &[i64],
    tiers: &[usize],
) -> Vec<WindowStats> {
    years
        .iter()
        .map(|&year| window_stats(works, cited_by, year, tiers))
        .collect()
}

/// An author's citations over their matching works
#[derive(Debug, Clone)]
pub struct AuthorTotal {
    pub author_name: String,
    pub author_url: String,
    pub total_citations: i64,
    pub works: Vec<Record>,
}

impl AuthorTotal {
    pub fn new(author: AuthorRef, works: Vec<Record>) -> Self {
        let total_citations = works.iter().map(work::cited_by_count).sum();
        Self {
            author_name: author.author_name,
            author_url: author.author_url,
            total_citations,
            works,
        }
    }
}

/// Keep the `top` authors by total citations, highest first.
pub fn rank_authors(mut authors: Vec<AuthorTotal>, top: usize) -> Vec<AuthorTotal> {
    authors.sort_by_key(|a| std::cmp::Reverse(a.total_citations));
    authors.truncate(top);
    authors
}
