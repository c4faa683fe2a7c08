//! News and comment domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Publication status of a news record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NewsStatus {
    Draft,
    #[default]
    Published,
}

impl NewsStatus {
    pub const ALL: [NewsStatus; 2] = [NewsStatus::Draft, NewsStatus::Published];

    pub fn as_str(&self) -> &'static str {
        match self {
            NewsStatus::Draft => "draft",
            NewsStatus::Published => "published",
        }
    }
}

/// News category. A closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technology,
    Sports,
    Economy,
    Health,
    Education,
    #[default]
    General,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Technology,
        Category::Sports,
        Category::Economy,
        Category::Health,
        Category::Education,
        Category::General,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "technology",
            Category::Sports => "sports",
            Category::Economy => "economy",
            Category::Health => "health",
            Category::Education => "education",
            Category::General => "general",
            Category::Other => "other",
        }
    }
}

/// Returned when a stored or submitted enum value is outside its closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for NewsStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NewsStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "category",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for NewsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public view of the principal that owns a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// A news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub image: Option<String>,
    pub author: AuthorSummary,
    pub views: i64,
    pub status: NewsStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a news article.
#[derive(Debug, Clone)]
pub struct NewNews {
    pub title: String,
    pub content: String,
    pub category: Category,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub status: NewsStatus,
}

/// Partial update of a news article. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Category>,
    /// `Some(None)` removes the image.
    pub image: Option<Option<String>>,
}

/// A comment on a news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author: AuthorSummary,
    pub news_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub author_id: Uuid,
    pub news_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_text() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert!("Sports".parse::<Category>().is_err());
    }

    #[test]
    fn status_defaults_to_published() {
        assert_eq!(NewsStatus::default(), NewsStatus::Published);
        assert_eq!("draft".parse::<NewsStatus>(), Ok(NewsStatus::Draft));
        assert!("archived".parse::<NewsStatus>().is_err());
    }
}
