use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub age: i64,
    pub password: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }
}

/// The `action` flag submitted with an article form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleAction {
    Publish,
    Draft,
    Save,
}

impl ArticleAction {
    pub fn parse(action: Option<&str>) -> Self {
        match action.map(str::trim) {
            Some("publish") => ArticleAction::Publish,
            Some("draft") => ArticleAction::Draft,
            _ => ArticleAction::Save,
        }
    }

    /// Status of a freshly created article. `publish` wins over the status
    /// field; an unset or unknown status field means draft.
    pub fn initial_status(self, status_field: Option<&str>) -> ArticleStatus {
        match (self, status_field.map(str::trim)) {
            (ArticleAction::Publish, _) | (_, Some("published")) => ArticleStatus::Published,
            _ => ArticleStatus::Draft,
        }
    }

    /// Status an edit forces onto the article. `None` keeps the current one.
    pub fn forced_status(self) -> Option<ArticleStatus> {
        match self {
            ArticleAction::Publish => Some(ArticleStatus::Published),
            ArticleAction::Draft => Some(ArticleStatus::Draft),
            ArticleAction::Save => None,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: String,
    pub status: ArticleStatus,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: i64,
    pub author_username: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub article_id: i64,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ArticleStats {
    pub total_articles: i64,
    pub published_articles: i64,
    pub draft_articles: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Oldest,
    #[default]
    Newest,
}

impl SortOrder {
    pub fn parse(sort: Option<&str>) -> Self {
        match sort {
            Some("oldest") => SortOrder::Oldest,
            _ => SortOrder::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Oldest => "oldest",
            SortOrder::Newest => "newest",
        }
    }

    pub(crate) fn sql(&self) -> &'static str {
        match self {
            SortOrder::Oldest => "ASC",
            SortOrder::Newest => "DESC",
        }
    }
}
