//! Structured filtering over in-memory research items.
//!
//! # Responsibility
//! - Evaluate text, tag, ticker and kind filters; separate filters are ANDed,
//!   requested tags are ORed.
//! - Order results deterministically.
//!
//! # Invariants
//! - Absent or blank filters are no-ops.
//! - Results are ordered by `created_at DESC, id ASC`.

use crate::model::item::{normalize_tag, ItemKind, ResearchItem};
use std::cmp::Ordering;

/// Search options. All supplied filters must match; within `tags`, any
/// one requested tag is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against title or content.
    pub text: Option<String>,
    /// Item must carry at least one listed tag (compared after normalization).
    pub tags: Vec<String>,
    /// Related ticker, compared after uppercasing.
    pub ticker: Option<String>,
    pub kind: Option<ItemKind>,
}

impl SearchQuery {
    /// Empty query; matches every item.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Normalizes filter values once so matching stays a plain comparison.
    pub(crate) fn compile(&self) -> CompiledQuery {
        let text = self
            .text
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);
        let mut tags: Vec<String> = self
            .tags
            .iter()
            .filter_map(|tag| normalize_tag(tag))
            .collect();
        tags.sort();
        tags.dedup();
        let ticker = self
            .ticker
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_ascii_uppercase);

        CompiledQuery {
            text,
            tags,
            ticker,
            kind: self.kind,
        }
    }
}

/// Normalized form of [`SearchQuery`].
#[derive(Debug, Clone)]
pub(crate) struct CompiledQuery {
    text: Option<String>,
    tags: Vec<String>,
    ticker: Option<String>,
    kind: Option<ItemKind>,
}

impl CompiledQuery {
    pub(crate) fn matches(&self, item: &ResearchItem) -> bool {
        if let Some(kind) = self.kind {
            if item.kind != kind {
                return false;
            }
        }
        if let Some(ticker) = self.ticker.as_deref() {
            if !item.has_ticker(ticker) {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| item.has_tag(tag)) {
            return false;
        }
        if let Some(text) = self.text.as_deref() {
            return item.title.to_lowercase().contains(text)
                || item.content.to_lowercase().contains(text);
        }
        true
    }
}

/// Returns clones of the items matching `query`, newest first.
pub fn filter_items(items: &[ResearchItem], query: &SearchQuery) -> Vec<ResearchItem> {
    let compiled = query.compile();
    let mut matched: Vec<ResearchItem> = items
        .iter()
        .filter(|item| compiled.matches(item))
        .cloned()
        .collect();
    matched.sort_by(newest_first);
    matched
}

/// Ordering used by every list/search result: `created_at DESC, id ASC`.
pub fn newest_first(left: &ResearchItem, right: &ResearchItem) -> Ordering {
    right
        .created_at
        .cmp(&left.created_at)
        .then_with(|| left.id.cmp(&right.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::NewItem;
    use chrono::{Duration, Utc};

    fn sample_items() -> Vec<ResearchItem> {
        let base = Utc::now();
        vec![
            ResearchItem::create(
                NewItem::note("Thesis", "Long AAPL on margin expansion")
                    .with_tags(["AAPL", "growth"])
                    .with_tickers(["AAPL"]),
                base,
            )
            .unwrap(),
            ResearchItem::create(
                NewItem::research("Banks", "Net interest margin outlook")
                    .with_tags(["value", "growth"])
                    .with_tickers(["JPM"]),
                base + Duration::seconds(1),
            )
            .unwrap(),
            ResearchItem::create(
                NewItem::article("Cloud", "https://example.com/cloud", "")
                    .with_tags(["tech"])
                    .with_tickers(["MSFT", "AAPL"]),
                base + Duration::seconds(2),
            )
            .unwrap(),
        ]
    }

    #[test]
    fn empty_query_returns_all_newest_first() {
        let items = sample_items();
        let result = filter_items(&items, &SearchQuery::new());
        let titles: Vec<&str> = result.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["Cloud", "Banks", "Thesis"]);
    }

    #[test]
    fn filters_combine_with_and() {
        let items = sample_items();
        let query = SearchQuery::new().with_text("MARGIN").with_ticker("aapl");
        let result = filter_items(&items, &query);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Thesis");
    }

    #[test]
    fn any_requested_tag_is_enough() {
        let items = sample_items();
        let either = filter_items(&items, &SearchQuery::new().with_tags(["VALUE", "Tech"]));
        let titles: Vec<&str> = either.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["Cloud", "Banks"]);

        let one = filter_items(&items, &SearchQuery::new().with_tags(["growth"]));
        assert_eq!(one.len(), 2);

        assert!(filter_items(&items, &SearchQuery::new().with_tags(["dividend"])).is_empty());
    }

    #[test]
    fn blank_filters_are_ignored() {
        let items = sample_items();
        let query = SearchQuery {
            text: Some("   ".to_string()),
            tags: vec![" ".to_string()],
            ticker: Some(String::new()),
            kind: None,
        };
        assert_eq!(filter_items(&items, &query).len(), 3);
    }

    #[test]
    fn kind_filter_is_exact() {
        let items = sample_items();
        let result = filter_items(&items, &SearchQuery::new().with_kind(ItemKind::Article));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Cloud");
    }
}
