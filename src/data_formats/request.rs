use serde::{Deserialize, Serialize};

use crate::errors::{RequestError, RequestResult};
use crate::models::{ArticleAction, SortOrder};

use super::UploadForm;

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_age(age: &str) -> Option<i64> {
    age.trim().parse::<u32>().ok().map(i64::from)
}

// ----------------- User Request -----------------
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> RequestResult<Credentials> {
        match (non_blank(self.email), self.password.filter(|p| !p.is_empty())) {
            (Some(email), Some(password)) => Ok(Credentials { email, password }),
            _ => Err(RequestError::Validation(
                "Please fill in all fields".to_owned(),
            )),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub age: Option<String>,
    pub password: Option<String>,
}

/// A validated sign-up. `password` holds the plaintext until the handler
/// replaces it with its hash.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub age: i64,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> RequestResult<NewUser> {
        let missing = || RequestError::Validation("Please fill in all fields".to_owned());
        let username = non_blank(self.username).ok_or_else(missing)?;
        let email = non_blank(self.email).ok_or_else(missing)?;
        let age = non_blank(self.age).ok_or_else(missing)?;
        let password = self.password.filter(|p| !p.is_empty()).ok_or_else(missing)?;
        let age = parse_age(&age).ok_or_else(|| {
            RequestError::Validation("Age must be a non-negative whole number".to_owned())
        })?;
        Ok(NewUser {
            username,
            email,
            age,
            password,
        })
    }
}

/// Profile edits. Absent fields keep their stored value.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
}

impl ProfileUpdate {
    pub fn from_form(form: &UploadForm) -> Self {
        ProfileUpdate {
            username: non_blank(form.text("username").map(str::to_owned)),
            email: non_blank(form.text("email").map(str::to_owned)),
            age: form.text("age").and_then(parse_age),
        }
    }
}

// ----------------- Article Request -----------------

/// What the author typed, echoed back when an article form is rejected.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: String,
}

#[derive(Debug, Clone)]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: String,
    pub status: Option<String>,
    pub action: ArticleAction,
}

impl ArticleInput {
    pub fn from_form(form: &UploadForm) -> RequestResult<Self> {
        let field = |name: &str| form.text(name).unwrap_or_default().to_owned();
        let draft = ArticleDraft {
            title: field("title"),
            content: field("content"),
            category: field("category"),
            tags: field("tags"),
        };
        if draft.title.trim().is_empty()
            || draft.content.trim().is_empty()
            || draft.category.trim().is_empty()
        {
            return Err(RequestError::InvalidArticle {
                message: "Title, content and category are required",
                draft,
            });
        }
        Ok(ArticleInput {
            title: draft.title.trim().to_owned(),
            content: draft.content,
            category: draft.category.trim().to_owned(),
            tags: draft.tags.trim().to_owned(),
            status: form.text("status").map(str::to_owned),
            action: ArticleAction::parse(form.text("action")),
        })
    }
}

// ----------------- Comment Request -----------------
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct CommentRequest {
    pub content: Option<String>,
}

impl CommentRequest {
    /// The comment text, or `None` when there is nothing worth storing.
    pub fn into_content(self) -> Option<String> {
        self.content.filter(|content| !content.trim().is_empty())
    }
}

// ----------------- Search Request -----------------
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub category: Option<String>,
    pub sort: SortOrder,
    pub page: i64,
}

impl SearchParams {
    pub fn into_query(self) -> SearchQuery {
        SearchQuery {
            query: non_blank(self.q),
            category: self.category.filter(|category| !category.is_empty()),
            sort: SortOrder::parse(self.sort.as_deref()),
            page: self
                .page
                .and_then(|page| page.trim().parse::<i64>().ok())
                .unwrap_or(1)
                .max(1),
        }
    }
}

impl SearchQuery {
    /// Whether the caller asked for any filtering at all.
    pub fn is_requested(&self) -> bool {
        self.query.is_some() || self.category.is_some()
    }
}
