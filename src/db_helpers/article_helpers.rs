use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::data_formats::ArticleInput;
use crate::errors::{RequestError, RequestResult};
use crate::models::{Article, ArticleStats};

pub(super) const ARTICLE_COLUMNS: &str = r#"
            articles.id          AS "id",
            articles.title       AS "title",
            articles.content     AS "content",
            articles.category    AS "category",
            articles.tags        AS "tags",
            articles.status      AS "status",
            articles.image       AS "image",
            articles.created_at  AS "created_at",
            articles.updated_at  AS "updated_at",
            articles.author_id   AS "author_id",
            users.username       AS "author_username"
"#;

pub(super) const ARTICLE_FROM: &str = "FROM articles JOIN users ON users.id = articles.author_id";

/// Looks an article up by id. With `author_id` set the lookup is scoped to
/// that author, so someone else's article reads as missing.
async fn fetch_article<'e, E>(
    executor: E,
    id: i64,
    author_id: Option<i64>,
) -> Result<Option<Article>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<Sqlite, Article>(&format!(
        r#"
        SELECT {ARTICLE_COLUMNS}
        {ARTICLE_FROM}
        WHERE articles.id = $1
            AND ( articles.author_id = $2
                OR $2 IS NULL )
        "#
    ))
    .bind(id)
    .bind(author_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_article_by_id(pool: &SqlitePool, id: i64) -> RequestResult<Option<Article>> {
    Ok(fetch_article(pool, id, None).await?)
}

pub async fn get_own_article(
    pool: &SqlitePool,
    id: i64,
    author_id: i64,
) -> RequestResult<Option<Article>> {
    Ok(fetch_article(pool, id, Some(author_id)).await?)
}

pub async fn create_article_in_db(
    pool: &SqlitePool,
    author_id: i64,
    input: &ArticleInput,
    image: Option<&str>,
) -> RequestResult<Article> {
    let mut tx = pool.begin().await?;
    let status = input.action.initial_status(input.status.as_deref());
    let now = Utc::now();

    let (article_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO articles (title, content, category, tags, status, image, created_at, updated_at, author_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8)
        RETURNING id
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(&input.category)
    .bind(&input.tags)
    .bind(status)
    .bind(image)
    .bind(now)
    .bind(author_id)
    .fetch_one(&mut tx)
    .await?;

    let article = fetch_article(&mut tx, article_id, None)
        .await?
        .ok_or(RequestError::NotFound("Article not found"))?;
    tx.commit().await?;
    Ok(article)
}

/// Rewrites an article owned by `author_id`. Returns the updated article and
/// the image reference it replaced, if a new image was supplied.
///
/// Every write transaction opens with a write: a deferred SQLite transaction
/// that reads first cannot upgrade its lock while another connection writes,
/// and fails with "database is locked" instead of waiting.
pub async fn update_article_in_db(
    pool: &SqlitePool,
    author_id: i64,
    id: i64,
    input: &ArticleInput,
    image: Option<&str>,
) -> RequestResult<(Article, Option<String>)> {
    let mut tx = pool.begin().await?;

    // `image` is untouched by this statement, so RETURNING yields the old one
    let previous: Option<(Option<String>,)> = sqlx::query_as(
        r#"
        UPDATE articles
        SET title = $1,
            content = $2,
            category = $3,
            tags = $4,
            status = COALESCE($5, status),
            updated_at = $6
        WHERE id = $7 AND author_id = $8
        RETURNING image
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(&input.category)
    .bind(&input.tags)
    .bind(input.action.forced_status())
    .bind(Utc::now())
    .bind(id)
    .bind(author_id)
    .fetch_optional(&mut tx)
    .await?;
    let previous_image = match previous {
        Some((previous_image,)) => previous_image,
        None => return Err(RequestError::NotFound("Article not found")),
    };

    if let Some(image) = image {
        sqlx::query("UPDATE articles SET image = $1 WHERE id = $2")
            .bind(image)
            .bind(id)
            .execute(&mut tx)
            .await?;
    }

    let article = fetch_article(&mut tx, id, None)
        .await?
        .ok_or(RequestError::NotFound("Article not found"))?;
    tx.commit().await?;

    Ok((article, image.and(previous_image)))
}

/// Deletes an article owned by `author_id` together with its likes and
/// comments. Returns the article's image reference so the caller can drop
/// the file.
pub async fn delete_article_in_db(
    pool: &SqlitePool,
    author_id: i64,
    id: i64,
) -> RequestResult<Option<String>> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM likes
        WHERE article_id IN (SELECT id FROM articles WHERE id = $1 AND author_id = $2)
        "#,
    )
    .bind(id)
    .bind(author_id)
    .execute(&mut tx)
    .await?;
    sqlx::query(
        r#"
        DELETE FROM comments
        WHERE article_id IN (SELECT id FROM articles WHERE id = $1 AND author_id = $2)
        "#,
    )
    .bind(id)
    .bind(author_id)
    .execute(&mut tx)
    .await?;
    let deleted: Option<(Option<String>,)> =
        sqlx::query_as("DELETE FROM articles WHERE id = $1 AND author_id = $2 RETURNING image")
            .bind(id)
            .bind(author_id)
            .fetch_optional(&mut tx)
            .await?;

    let image = match deleted {
        Some((image,)) => image,
        None => return Err(RequestError::NotFound("Article not found")),
    };
    tx.commit().await?;
    Ok(image)
}

/// Articles written by `author_id`, any status, newest first.
pub async fn list_articles_by_author(
    pool: &SqlitePool,
    author_id: i64,
    limit: Option<i64>,
) -> RequestResult<Vec<Article>> {
    let articles = sqlx::query_as::<Sqlite, Article>(&format!(
        r#"
        SELECT {ARTICLE_COLUMNS}
        {ARTICLE_FROM}
        WHERE articles.author_id = $1
        ORDER BY articles.created_at DESC, articles.id DESC
        LIMIT $2
        "#
    ))
    .bind(author_id)
    // sqlite reads a negative LIMIT as no limit
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;
    Ok(articles)
}

pub async fn article_stats_for_author(
    pool: &SqlitePool,
    author_id: i64,
) -> RequestResult<ArticleStats> {
    let stats = sqlx::query_as::<Sqlite, ArticleStats>(
        r#"
        SELECT COUNT(*)                                   AS "total_articles",
               COALESCE(SUM(status = 'published'), 0)     AS "published_articles",
               COALESCE(SUM(status = 'draft'), 0)         AS "draft_articles"
        FROM articles
        WHERE author_id = $1
        "#,
    )
    .bind(author_id)
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::test_support::*;
    use crate::db_helpers::{add_comment_in_db, count_likes, toggle_like_in_db};
    use crate::models::{ArticleAction, ArticleStatus};

    #[tokio::test]
    async fn create_uses_action_then_status_field() {
        let pool = test_pool().await;
        let ada = seed_user(&pool, "ada").await;

        let published = seed_article(&pool, &ada, "Hello World", "body", "publish").await;
        assert_eq!(published.status, ArticleStatus::Published);
        assert_eq!(published.author_username, "ada");
        assert_eq!(published.created_at, published.updated_at);

        let mut input = article_input("Second", "body", "tech", "save");
        input.status = Some("published".into());
        let via_status = create_article_in_db(&pool, ada.id, &input, None).await.unwrap();
        assert_eq!(via_status.status, ArticleStatus::Published);

        let draft = seed_article(&pool, &ada, "Third", "body", "").await;
        assert_eq!(draft.status, ArticleStatus::Draft);
    }

    #[tokio::test]
    async fn edit_applies_action_and_refreshes_updated_at() {
        let pool = test_pool().await;
        let ada = seed_user(&pool, "ada").await;
        let article = seed_article(&pool, &ada, "Hello", "body", "publish").await;

        let mut input = article_input("Hello", "body", "tech", "save");
        let (saved, _) = update_article_in_db(&pool, ada.id, article.id, &input, None)
            .await
            .unwrap();
        assert_eq!(saved.status, ArticleStatus::Published);
        assert!(saved.updated_at > article.updated_at);

        input.action = ArticleAction::Draft;
        let (drafted, _) = update_article_in_db(&pool, ada.id, article.id, &input, None)
            .await
            .unwrap();
        assert_eq!(drafted.status, ArticleStatus::Draft);
        assert!(drafted.updated_at > saved.updated_at);
        assert_eq!(drafted.created_at, article.created_at);
    }

    #[tokio::test]
    async fn other_authors_cannot_edit_or_delete() {
        let pool = test_pool().await;
        let ada = seed_user(&pool, "ada").await;
        let mallory = seed_user(&pool, "mallory").await;
        let article = seed_article(&pool, &ada, "Mine", "body", "publish").await;

        let input = article_input("Stolen", "body", "tech", "draft");
        let edit = update_article_in_db(&pool, mallory.id, article.id, &input, None).await;
        assert!(matches!(edit, Err(RequestError::NotFound(_))));
        let delete = delete_article_in_db(&pool, mallory.id, article.id).await;
        assert!(matches!(delete, Err(RequestError::NotFound(_))));

        let untouched = get_article_by_id(&pool, article.id).await.unwrap().unwrap();
        assert_eq!(untouched.title, "Mine");
        assert_eq!(untouched.status, ArticleStatus::Published);
        assert!(get_own_article(&pool, article.id, mallory.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_likes_and_comments() {
        let pool = test_pool().await;
        let ada = seed_user(&pool, "ada").await;
        let grace = seed_user(&pool, "grace").await;
        let article = seed_article(&pool, &ada, "Doomed", "body", "publish").await;
        let survivor = seed_article(&pool, &ada, "Survivor", "body", "publish").await;

        toggle_like_in_db(&pool, grace.id, article.id).await.unwrap();
        toggle_like_in_db(&pool, grace.id, survivor.id).await.unwrap();
        add_comment_in_db(&pool, grace.id, article.id, "nice").await.unwrap();
        add_comment_in_db(&pool, grace.id, survivor.id, "also nice").await.unwrap();

        delete_article_in_db(&pool, ada.id, article.id).await.unwrap();

        assert!(get_article_by_id(&pool, article.id).await.unwrap().is_none());
        let (likes,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE article_id = $1")
            .bind(article.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        let (comments,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM comments WHERE article_id = $1")
                .bind(article.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!((likes, comments), (0, 0));
        assert_eq!(count_likes(&pool, survivor.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replacing_an_image_reports_the_old_one() {
        let pool = test_pool().await;
        let ada = seed_user(&pool, "ada").await;
        let input = article_input("Pictured", "body", "tech", "publish");
        let article = create_article_in_db(&pool, ada.id, &input, Some("article_1_old.png"))
            .await
            .unwrap();

        let (kept, replaced) = update_article_in_db(&pool, ada.id, article.id, &input, None)
            .await
            .unwrap();
        assert_eq!(kept.image.as_deref(), Some("article_1_old.png"));
        assert_eq!(replaced, None);

        let (changed, replaced) =
            update_article_in_db(&pool, ada.id, article.id, &input, Some("article_1_new.png"))
                .await
                .unwrap();
        assert_eq!(changed.image.as_deref(), Some("article_1_new.png"));
        assert_eq!(replaced.as_deref(), Some("article_1_old.png"));

        let image = delete_article_in_db(&pool, ada.id, article.id).await.unwrap();
        assert_eq!(image.as_deref(), Some("article_1_new.png"));
    }

    #[tokio::test]
    async fn stats_and_listing_cover_every_status() {
        let pool = test_pool().await;
        let ada = seed_user(&pool, "ada").await;
        let grace = seed_user(&pool, "grace").await;
        for title in ["one", "two", "three"] {
            seed_article(&pool, &ada, title, "body", "publish").await;
        }
        seed_article(&pool, &ada, "four", "body", "draft").await;
        seed_article(&pool, &grace, "elsewhere", "body", "publish").await;

        let stats = article_stats_for_author(&pool, ada.id).await.unwrap();
        assert_eq!(
            stats,
            ArticleStats {
                total_articles: 4,
                published_articles: 3,
                draft_articles: 1,
            }
        );

        let all = list_articles_by_author(&pool, ada.id, None).await.unwrap();
        let titles: Vec<_> = all.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["four", "three", "two", "one"]);
        let recent = list_articles_by_author(&pool, ada.id, Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);

        let empty = article_stats_for_author(&pool, 9999).await.unwrap();
        assert_eq!(empty, ArticleStats::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn edits_and_deletes_succeed_while_likes_are_written() {
        let (_dir, pool) = file_pool().await;
        let ada = seed_user(&pool, "ada").await;
        let grace = seed_user(&pool, "grace").await;
        let article = seed_article(&pool, &ada, "Busy", "body", "publish").await;
        let mut doomed = Vec::new();
        for n in 0..5 {
            doomed.push(seed_article(&pool, &ada, &format!("doomed {n}"), "body", "draft").await.id);
        }

        let (author_id, reader_id, article_id) = (ada.id, grace.id, article.id);
        let mut tasks = Vec::new();
        for n in 0..40 {
            let pool = pool.clone();
            let doomed_id = doomed.get(n / 8).copied().filter(|_| n % 8 == 3);
            tasks.push(tokio::spawn(async move {
                if let Some(doomed_id) = doomed_id {
                    delete_article_in_db(&pool, author_id, doomed_id).await.map(|_| ())
                } else if n % 2 == 0 {
                    let input = article_input(&format!("Busy {n}"), "body", "tech", "save");
                    update_article_in_db(&pool, author_id, article_id, &input, Some("cover.png"))
                        .await
                        .map(|_| ())
                } else {
                    toggle_like_in_db(&pool, reader_id, article_id).await.map(|_| ())
                }
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let article = get_article_by_id(&pool, article_id).await.unwrap().unwrap();
        assert_eq!(article.status, ArticleStatus::Published);
        assert_eq!(article.image.as_deref(), Some("cover.png"));
        let stats = article_stats_for_author(&pool, author_id).await.unwrap();
        assert_eq!(stats.total_articles, 1);
    }
}
