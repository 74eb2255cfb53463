//! Feed items and the filter/score/sort applied before they are returned.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Filled with the source name when the endpoint leaves it empty.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    /// Number of distinct request keywords found in title or summary.
    #[serde(default)]
    pub score: usize,
}

/// Keep items matching any filter term, score them against `keywords`, and
/// sort by (score desc, recency) or by recency alone when no keywords are
/// given. Terms are compared case-insensitively.
pub fn filter_and_rank(items: Vec<FeedItem>, filters: &[String], keywords: &[String]) -> Vec<FeedItem> {
    let filters = lowercase(filters);
    let keywords = lowercase(keywords);

    let mut kept: Vec<FeedItem> = items
        .into_iter()
        .filter(|item| matches_filters(item, &filters))
        .map(|mut item| {
            item.score = keyword_score(&item, &keywords);
            item
        })
        .collect();

    if keywords.is_empty() {
        kept.sort_by(by_recency);
    } else {
        kept.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| by_recency(a, b)));
    }
    kept
}

fn matches_filters(item: &FeedItem, filters: &[String]) -> bool {
    if filters.is_empty() {
        return true;
    }
    let title = item.title.to_lowercase();
    let source = item.source.to_lowercase();
    let tags: Vec<String> = item.tags.iter().map(|t| t.to_lowercase()).collect();

    filters.iter().any(|f| {
        title.contains(f.as_str()) || source.contains(f.as_str()) || tags.iter().any(|t| t.contains(f.as_str()))
    })
}

fn keyword_score(item: &FeedItem, keywords: &[String]) -> usize {
    if keywords.is_empty() {
        return 0;
    }
    let haystack = format!("{} {}", item.title, item.summary).to_lowercase();
    let mut distinct: Vec<&String> = keywords.iter().collect();
    distinct.dedup();
    distinct.into_iter().filter(|k| haystack.contains(k.as_str())).count()
}

/// Newest first; undated items last.
fn by_recency(a: &FeedItem, b: &FeedItem) -> Ordering {
    b.published.cmp(&a.published)
}

fn lowercase(terms: &[String]) -> Vec<String> {
    let mut out: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, summary: &str, tags: &[&str], day: Option<u32>) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            url: String::new(),
            source: "jobs".to_string(),
            summary: summary.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            published: day.map(|d| Utc.with_ymd_and_hms(2026, 2, d, 0, 0, 0).unwrap()),
            score: 0,
        }
    }

    fn titles(items: &[FeedItem]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn without_keywords_newest_first() {
        let items = vec![
            item("old", "", &[], Some(1)),
            item("undated", "", &[], None),
            item("new", "", &[], Some(9)),
        ];
        let ranked = filter_and_rank(items, &[], &[]);
        assert_eq!(titles(&ranked), vec!["new", "old", "undated"]);
        assert!(ranked.iter().all(|i| i.score == 0));
    }

    #[test]
    fn keywords_rank_by_distinct_matches_then_recency() {
        let items = vec![
            item("Rust engineer", "remote", &[], Some(1)),
            item("Rust developer", "remote tokio", &[], Some(2)),
            item("Go engineer", "", &[], Some(9)),
            item("Rust intern", "", &[], Some(8)),
        ];
        let kw = vec!["rust".to_string(), "Remote".to_string(), "tokio".to_string()];
        let ranked = filter_and_rank(items, &[], &kw);

        assert_eq!(
            titles(&ranked),
            vec!["Rust developer", "Rust engineer", "Rust intern", "Go engineer"]
        );
        assert_eq!(ranked[0].score, 3);
        assert_eq!(ranked[3].score, 0);
    }

    #[test]
    fn filters_match_title_source_or_tags() {
        let items = vec![
            item("Backend", "", &["Contract"], Some(1)),
            item("Frontend", "", &[], Some(2)),
            item("Data contract role", "", &[], Some(3)),
        ];
        let ranked = filter_and_rank(items, &["contract".to_string()], &[]);
        assert_eq!(titles(&ranked), vec!["Data contract role", "Backend"]);
    }
}
