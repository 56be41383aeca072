//! Research item domain model.
//!
//! # Responsibility
//! - Define the canonical record stored by the knowledge store.
//! - Own normalization rules for tags and ticker symbols.
//! - Validate records at every write path and at load time.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `tags` are trimmed, lowercased, deduplicated and sorted.
//! - `related_tickers` are trimmed, uppercased, 1-5 ASCII alphanumerics,
//!   deduplicated and sorted.
//! - `updated_at >= created_at`.
//! - `source_url` is only set when `kind == ItemKind::Article`.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

static TICKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{1,5}$").expect("valid ticker regex"));

/// Stable identifier of a research item.
pub type ItemId = Uuid;

/// Category of a research item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Personal free-form note.
    Note,
    /// External article, usually with a `source_url`.
    Article,
    /// Longer research or analysis write-up.
    Research,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Note, ItemKind::Article, ItemKind::Research];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Article => "article",
            Self::Research => "research",
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = ItemValidationError;

    /// Accepts singular and plural collection names, case-insensitive.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "note" | "notes" => Ok(Self::Note),
            "article" | "articles" => Ok(Self::Article),
            "research" => Ok(Self::Research),
            _ => Err(ItemValidationError::UnknownKind(value.to_string())),
        }
    }
}

/// Validation failure for research item input or persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    EmptyTitle,
    BlankTag,
    InvalidTicker(String),
    SourceUrlNotAllowed(ItemKind),
    UnknownKind(String),
    /// Tags or tickers are not in normalized form.
    NotNormalized(&'static str),
    TimestampOrder,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::BlankTag => write!(f, "tags must not be blank"),
            Self::InvalidTicker(value) => write!(
                f,
                "invalid ticker `{value}`; expected 1-5 ASCII letters or digits"
            ),
            Self::SourceUrlNotAllowed(kind) => {
                write!(f, "source_url is only allowed for articles, not `{kind}`")
            }
            Self::UnknownKind(value) => write!(
                f,
                "unknown item kind `{value}`; expected note|article|research"
            ),
            Self::NotNormalized(field) => write!(f, "`{field}` is not in normalized form"),
            Self::TimestampOrder => write!(f, "updated_at must not be earlier than created_at"),
        }
    }
}

impl Error for ItemValidationError {}

/// Canonical research record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub title: String,
    /// May be empty for link-only articles.
    pub content: String,
    pub tags: Vec<String>,
    pub related_tickers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_url: Option<String>,
}

/// Input for creating a research item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub kind: ItemKind,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub related_tickers: Vec<String>,
    pub source_url: Option<String>,
}

impl NewItem {
    pub fn new(kind: ItemKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            related_tickers: Vec::new(),
            source_url: None,
        }
    }

    pub fn note(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(ItemKind::Note, title, content)
    }

    pub fn article(
        title: impl Into<String>,
        source_url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut item = Self::new(ItemKind::Article, title, content);
        item.source_url = Some(source_url.into());
        item
    }

    pub fn research(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(ItemKind::Research, title, content)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_tickers = tickers.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update. `None` leaves a field unchanged.
///
/// `source_url` is tri-state: `None` keeps it, `Some(None)` clears it,
/// `Some(Some(url))` replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub kind: Option<ItemKind>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub related_tickers: Option<Vec<String>>,
    pub source_url: Option<Option<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.related_tickers.is_none()
            && self.source_url.is_none()
    }
}

impl ResearchItem {
    /// Builds a validated item with a fresh id and both timestamps at `now`.
    pub fn create(input: NewItem, now: DateTime<Utc>) -> Result<Self, ItemValidationError> {
        let item = Self {
            id: Uuid::new_v4(),
            kind: input.kind,
            title: input.title.trim().to_string(),
            content: input.content,
            tags: normalize_tags(&input.tags)?,
            related_tickers: normalize_tickers(&input.related_tickers)?,
            created_at: now,
            updated_at: now,
            source_url: normalize_source_url(input.source_url),
        };
        item.validate()?;
        Ok(item)
    }

    /// Returns a copy with `patch` merged in and `updated_at` bumped.
    ///
    /// `self` is left untouched so callers can discard the result on failure.
    pub fn patched(
        &self,
        patch: ItemPatch,
        now: DateTime<Utc>,
    ) -> Result<Self, ItemValidationError> {
        let mut next = self.clone();
        if let Some(kind) = patch.kind {
            next.kind = kind;
        }
        if let Some(title) = patch.title {
            next.title = title.trim().to_string();
        }
        if let Some(content) = patch.content {
            next.content = content;
        }
        if let Some(tags) = patch.tags {
            next.tags = normalize_tags(&tags)?;
        }
        if let Some(tickers) = patch.related_tickers {
            next.related_tickers = normalize_tickers(&tickers)?;
        }
        if let Some(source_url) = patch.source_url {
            next.source_url = normalize_source_url(source_url);
        }
        next.updated_at = next_update_timestamp(self.updated_at, now);
        next.validate()?;
        Ok(next)
    }

    /// Checks every record invariant.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.title.trim().is_empty() {
            return Err(ItemValidationError::EmptyTitle);
        }
        if self.source_url.is_some() && self.kind != ItemKind::Article {
            return Err(ItemValidationError::SourceUrlNotAllowed(self.kind));
        }
        if normalize_tags(&self.tags)? != self.tags {
            return Err(ItemValidationError::NotNormalized("tags"));
        }
        if normalize_tickers(&self.related_tickers)? != self.related_tickers {
            return Err(ItemValidationError::NotNormalized("related_tickers"));
        }
        if self.updated_at < self.created_at {
            return Err(ItemValidationError::TimestampOrder);
        }
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.binary_search_by(|held| held.as_str().cmp(tag)).is_ok()
    }

    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.related_tickers
            .binary_search_by(|held| held.as_str().cmp(ticker))
            .is_ok()
    }
}

/// Normalizes one tag. Returns `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts tags. Blank tags are rejected.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, ItemValidationError> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        let value = normalize_tag(tag).ok_or(ItemValidationError::BlankTag)?;
        unique.insert(value);
    }
    Ok(unique.into_iter().collect())
}

/// Normalizes one ticker symbol to its uppercase form.
pub fn normalize_ticker(ticker: &str) -> Result<String, ItemValidationError> {
    let normalized = ticker.trim().to_ascii_uppercase();
    if TICKER_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ItemValidationError::InvalidTicker(ticker.to_string()))
    }
}

/// Normalizes, deduplicates and sorts ticker symbols.
pub fn normalize_tickers(tickers: &[String]) -> Result<Vec<String>, ItemValidationError> {
    let mut unique = BTreeSet::new();
    for ticker in tickers {
        unique.insert(normalize_ticker(ticker)?);
    }
    Ok(unique.into_iter().collect())
}

fn normalize_source_url(value: Option<String>) -> Option<String> {
    value
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

/// Returns `now`, or one microsecond past `previous` when the clock has not
/// advanced, so `updated_at` strictly increases across mutations.
pub fn next_update_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
