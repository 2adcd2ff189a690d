use serde::Serialize;

use crate::db_helpers::SearchPage;
use crate::models::{Article, ArticleStats, ArticleStatus, Comment, User};

use super::request::SearchQuery;

#[derive(Serialize, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub age: i64,
    pub avatar: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Serialize, Debug)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct AuthorResponse {
    pub id: i64,
    pub username: String,
}

#[derive(Serialize, Debug)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: String,
    #[serde(rename = "tagList")]
    pub tag_list: Vec<String>,
    pub status: ArticleStatus,
    pub image: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    pub author: AuthorResponse,
}

#[derive(Serialize, Debug)]
pub struct ArticleDetailResponse {
    #[serde(flatten)]
    pub article: ArticleResponse,
    pub likes: i64,
    pub liked: bool,
    pub comments: Vec<CommentResponse>,
}

#[derive(Serialize, Debug)]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    #[serde(rename = "articleId")]
    pub article_id: i64,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub author: AuthorResponse,
}

#[derive(Serialize, Debug)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

#[derive(Serialize, Debug)]
pub struct SearchResponse {
    pub articles: Vec<ArticleResponse>,
    #[serde(rename = "articlesCount")]
    pub total: i64,
    pub page: i64,
    #[serde(rename = "perPage")]
    pub per_page: i64,
    pub pages: i64,
    pub query: String,
    pub category: String,
    pub sort: &'static str,
}

#[derive(Serialize, Debug)]
pub struct DashboardResponse {
    pub user: UserResponse,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub stats: ArticleStats,
    #[serde(rename = "recentArticles")]
    pub recent_articles: Vec<ArticleResponse>,
    pub search: Option<SearchResponse>,
}

#[derive(Serialize, Debug)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub stats: ArticleStats,
    #[serde(rename = "recentArticles")]
    pub recent_articles: Vec<ArticleResponse>,
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl From<User> for UserResponse {
    fn from(
        User {
            id,
            username,
            email,
            age,
            avatar,
            created_at,
            ..
        }: User,
    ) -> Self {
        UserResponse {
            id,
            username,
            email,
            age,
            avatar,
            created_at: created_at.to_rfc3339(),
        }
    }
}

fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

impl From<Article> for ArticleResponse {
    fn from(
        Article {
            id,
            title,
            content,
            category,
            tags,
            status,
            image,
            created_at,
            updated_at,
            author_id,
            author_username,
        }: Article,
    ) -> Self {
        ArticleResponse {
            id,
            title,
            content,
            category,
            tag_list: split_tags(&tags),
            tags,
            status,
            image,
            created_at: created_at.to_rfc3339(),
            updated_at: updated_at.to_rfc3339(),
            author: AuthorResponse {
                id: author_id,
                username: author_username,
            },
        }
    }
}

impl From<Comment> for CommentResponse {
    fn from(
        Comment {
            id,
            content,
            user_id,
            article_id,
            created_at,
            author_username,
        }: Comment,
    ) -> Self {
        CommentResponse {
            id,
            content,
            article_id,
            created_at: created_at.to_rfc3339(),
            author: AuthorResponse {
                id: user_id,
                username: author_username,
            },
        }
    }
}

impl SearchResponse {
    pub fn new(page: SearchPage, query: &SearchQuery) -> Self {
        let pages = page.pages();
        SearchResponse {
            articles: page.articles.into_iter().map(ArticleResponse::from).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            pages,
            query: query.query.clone().unwrap_or_default(),
            category: query.category.clone().unwrap_or_default(),
            sort: query.sort.as_str(),
        }
    }
}

pub fn article_list(articles: Vec<Article>) -> Vec<ArticleResponse> {
    articles.into_iter().map(ArticleResponse::from).collect()
}
