use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::errors::{RequestError, RequestResult};
use crate::models::Like;

/// Flips `user_id`'s like on an article and returns whether it is now liked.
///
/// The insert is guarded by the `(user_id, article_id)` UNIQUE constraint:
/// when it inserts nothing the like already existed and is removed instead.
/// Two racing toggles therefore never surface a duplicate-key error.
pub async fn toggle_like_in_db(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
) -> RequestResult<bool> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO likes (user_id, article_id, created_at)
        SELECT $1, articles.id, $3
        FROM articles
        WHERE articles.id = $2
        ON CONFLICT (user_id, article_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(article_id)
    .bind(Utc::now())
    .execute(&mut tx)
    .await?
    .rows_affected();

    let liked = if inserted == 1 {
        true
    } else {
        let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND article_id = $2")
            .bind(user_id)
            .bind(article_id)
            .execute(&mut tx)
            .await?
            .rows_affected();
        // nothing inserted and nothing to remove: the article is gone
        if removed == 0 {
            return Err(RequestError::NotFound("Article not found"));
        }
        false
    };

    tx.commit().await?;
    Ok(liked)
}

pub async fn count_likes(pool: &SqlitePool, article_id: i64) -> RequestResult<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE article_id = $1")
        .bind(article_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn find_like(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
) -> RequestResult<Option<Like>> {
    let like = sqlx::query_as::<Sqlite, Like>(
        r#"
        SELECT id, user_id, article_id, created_at
        FROM likes
        WHERE user_id = $1 AND article_id = $2
        "#,
    )
    .bind(user_id)
    .bind(article_id)
    .fetch_optional(pool)
    .await?;
    Ok(like)
}
