//! Keyword relevance ranking.
//!
//! # Responsibility
//! - Score items against whitespace-separated query terms.
//! - Return typed hits ordered by score.
//!
//! # Invariants
//! - Only items containing the whole query text are returned; scoring is
//!   then per term.
//! - Ordering is `score DESC, created_at DESC, id ASC`.

use super::filter::{newest_first, SearchQuery};
use crate::model::item::ResearchItem;
use chrono::{DateTime, Utc};
use serde::Serialize;

const TITLE_TERM_WEIGHT: f64 = 3.0;
const CONTENT_TERM_WEIGHT: f64 = 1.0;
const RECENT_BONUS: f64 = 0.5;
const RECENT_DAYS: i64 = 30;
const AGING_BONUS: f64 = 0.2;
const AGING_DAYS: i64 = 90;

/// Ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub score: f64,
    pub item: ResearchItem,
}

/// Ranks items matching `filters` by relevance to `text`.
///
/// Returns an empty list for blank text.
pub fn rank_items(
    items: &[ResearchItem],
    text: &str,
    filters: &SearchQuery,
    now: DateTime<Utc>,
) -> Vec<SearchHit> {
    let terms = query_terms(text);
    if terms.is_empty() {
        return Vec::new();
    }

    let compiled = filters.clone().with_text(text).compile();
    let mut hits: Vec<SearchHit> = items
        .iter()
        .filter(|item| compiled.matches(item))
        .filter_map(|item| {
            let term_score = term_score(item, &terms);
            if term_score <= 0.0 {
                return None;
            }
            Some(SearchHit {
                score: term_score + recency_bonus(item.created_at, now),
                item: item.clone(),
            })
        })
        .collect();

    hits.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| newest_first(&left.item, &right.item))
    });
    hits
}

fn query_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    terms.sort();
    terms.dedup();
    terms
}

fn term_score(item: &ResearchItem, terms: &[String]) -> f64 {
    let title = item.title.to_lowercase();
    let content = item.content.to_lowercase();
    terms.iter().fold(0.0, |score, term| {
        let mut next = score;
        if title.contains(term.as_str()) {
            next += TITLE_TERM_WEIGHT;
        }
        if content.contains(term.as_str()) {
            next += CONTENT_TERM_WEIGHT;
        }
        next
    })
}

fn recency_bonus(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_days();
    if age_days < RECENT_DAYS {
        RECENT_BONUS
    } else if age_days < AGING_DAYS {
        AGING_BONUS
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::NewItem;
    use chrono::Duration;

    #[test]
    fn title_hits_outrank_content_hits() {
        let now = Utc::now();
        let in_content = ResearchItem::create(
            NewItem::note("Quarterly notes", "apple earnings beat estimates"),
            now,
        )
        .unwrap();
        let in_title =
            ResearchItem::create(NewItem::note("Apple earnings", "numbers looked fine"), now)
                .unwrap();
        let miss = ResearchItem::create(NewItem::note("Banks", "rates"), now).unwrap();

        let hits = rank_items(
            &[in_content.clone(), in_title.clone(), miss],
            "Apple earnings",
            &SearchQuery::new(),
            now,
        );
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.id, in_title.id);
        assert_eq!(hits[0].score, 6.5);
        assert_eq!(hits[1].item.id, in_content.id);
        assert_eq!(hits[1].score, 2.5);
    }

    #[test]
    fn recency_bonus_decays_with_age() {
        let now = Utc::now();
        assert_eq!(recency_bonus(now - Duration::days(3), now), RECENT_BONUS);
        assert_eq!(recency_bonus(now - Duration::days(45), now), AGING_BONUS);
        assert_eq!(recency_bonus(now - Duration::days(400), now), 0.0);
    }

    #[test]
    fn blank_text_returns_nothing() {
        let now = Utc::now();
        let item = ResearchItem::create(NewItem::note("Apple", "x"), now).unwrap();
        assert!(rank_items(&[item], "   ", &SearchQuery::new(), now).is_empty());
    }

    #[test]
    fn filters_still_apply() {
        let now = Utc::now();
        let tagged = ResearchItem::create(
            NewItem::note("Apple margins", "").with_tags(["growth"]),
            now,
        )
        .unwrap();
        let untagged = ResearchItem::create(NewItem::note("Apple supply", ""), now).unwrap();

        let hits = rank_items(
            &[tagged.clone(), untagged],
            "apple",
            &SearchQuery::new().with_tags(["growth"]),
            now,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.id, tagged.id);
    }

    #[test]
    fn terms_must_appear_together_as_a_phrase() {
        let now = Utc::now();
        let scattered =
            ResearchItem::create(NewItem::note("Apple supply chain", "iphone units"), now)
                .unwrap();
        let split_across_fields =
            ResearchItem::create(NewItem::note("Apple", "earnings were strong"), now).unwrap();

        let hits = rank_items(
            &[scattered, split_across_fields],
            "Apple earnings",
            &SearchQuery::new(),
            now,
        );
        assert!(hits.is_empty());
    }
}
