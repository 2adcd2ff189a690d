use serde::Serialize;

use super::response::ArticleResponse;

#[derive(Debug, Serialize)]
pub struct UserWrapper<T> {
    pub user: T,
}

#[derive(Debug, Serialize)]
pub struct CommentWrapper<T> {
    pub comment: T,
}

#[derive(Debug, Serialize)]
pub struct ArticleWrapper<T> {
    pub article: T,
}

#[derive(Debug, Serialize)]
pub struct MultipleArticlesWrapper {
    pub articles: Vec<ArticleResponse>,
    #[serde(rename = "articlesCount")]
    pub article_count: usize,
}

impl<T> UserWrapper<T> {
    pub fn wrap_with_user_data(request: T) -> UserWrapper<T> {
        UserWrapper { user: request }
    }
}

impl MultipleArticlesWrapper {
    pub fn new(articles: Vec<ArticleResponse>) -> Self {
        MultipleArticlesWrapper {
            article_count: articles.len(),
            articles,
        }
    }
}
