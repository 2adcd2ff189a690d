use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::SearchQuery;
use crate::errors::RequestResult;
use crate::models::{Article, ArticleStatus};

use super::{QueryBuilder, ARTICLE_COLUMNS, ARTICLE_FROM};

pub const PAGE_SIZE: i64 = 10;

#[derive(Debug)]
pub struct SearchPage {
    pub articles: Vec<Article>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl SearchPage {
    pub fn pages(&self) -> i64 {
        (self.total + self.per_page - 1) / self.per_page
    }
}

/// Published articles matching `query`, one page at a time.
///
/// Text matching uses `instr` so it stays case-sensitive; `LIKE` would fold
/// ASCII case.
pub async fn search_articles(pool: &SqlitePool, query: &SearchQuery) -> RequestResult<SearchPage> {
    let (filters, params) = QueryBuilder::new(" AND ")
        .add_param(
            "articles.status = $n",
            Some(ArticleStatus::Published.as_str().to_owned()),
        )
        .add_param(
            "( instr(articles.title, $n) > 0 OR instr(articles.content, $n) > 0 OR instr(articles.tags, $n) > 0 )",
            query.query.clone(),
        )
        .add_param("articles.category = $n", query.category.clone())
        .build();

    let mut tx = pool.begin().await?;

    let count_query = format!("SELECT COUNT(*) FROM articles WHERE {filters}");
    let mut count = sqlx::query_scalar::<Sqlite, i64>(&count_query);
    for param in &params {
        count = count.bind(param);
    }
    let total = count.fetch_one(&mut tx).await?;

    let direction = query.sort.sql();
    let page_query = format!(
        r#"
        SELECT {ARTICLE_COLUMNS}
        {ARTICLE_FROM}
        WHERE {filters}
        ORDER BY articles.created_at {direction}, articles.id {direction}
        LIMIT ${} OFFSET ${}
        "#,
        params.len() + 1,
        params.len() + 2
    );
    let mut articles = sqlx::query_as::<Sqlite, Article>(&page_query);
    for param in &params {
        articles = articles.bind(param);
    }
    let articles = articles
        .bind(PAGE_SIZE)
        .bind((query.page - 1).saturating_mul(PAGE_SIZE))
        .fetch_all(&mut tx)
        .await?;

    tx.commit().await?;
    Ok(SearchPage {
        articles,
        total,
        page: query.page,
        per_page: PAGE_SIZE,
    })
}
