use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    errors::{RequestError, RequestResult},
    models::Comment,
};

const COMMENT_QUERY: &str = r#"
        SELECT comments.id          AS "id",
               comments.content     AS "content",
               comments.user_id     AS "user_id",
               comments.article_id  AS "article_id",
               comments.created_at  AS "created_at",
               users.username       AS "author_username"
        FROM comments
            JOIN users
                ON users.id = comments.user_id
"#;

async fn fetch_comment<'e, E>(executor: E, id: i64) -> Result<Option<Comment>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<Sqlite, Comment>(&format!("{COMMENT_QUERY} WHERE comments.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn add_comment_in_db(
    pool: &SqlitePool,
    user_id: i64,
    article_id: i64,
    content: &str,
) -> RequestResult<Comment> {
    let mut tx = pool.begin().await?;

    let inserted: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO comments (content, user_id, article_id, created_at)
        SELECT $1, $2, articles.id, $4
        FROM articles
        WHERE articles.id = $3
        RETURNING id
        "#,
    )
    .bind(content)
    .bind(user_id)
    .bind(article_id)
    .bind(Utc::now())
    .fetch_optional(&mut tx)
    .await?;

    let comment_id = match inserted {
        Some((id,)) => id,
        None => return Err(RequestError::NotFound("Article not found")),
    };
    let comment = fetch_comment(&mut tx, comment_id)
        .await?
        .ok_or(RequestError::NotFound("Comment not found"))?;
    tx.commit().await?;

    Ok(comment)
}

/// Removes a comment written by `user_id`. Someone else's comment is left
/// untouched and reported as forbidden.
pub async fn delete_comment_in_db(
    pool: &SqlitePool,
    user_id: i64,
    comment_id: i64,
) -> RequestResult<Comment> {
    let mut tx = pool.begin().await?;

    // delete first so the transaction holds the write lock before any read
    let deleted: Option<(i64, String, i64, i64, DateTime<Utc>)> = sqlx::query_as(
        r#"
        DELETE FROM comments
        WHERE id = $1 AND user_id = $2
        RETURNING id, content, user_id, article_id, created_at
        "#,
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_optional(&mut tx)
    .await?;

    let (id, content, user_id, article_id, created_at) = match deleted {
        Some(row) => row,
        None => {
            return match fetch_comment(&mut tx, comment_id).await? {
                Some(_) => Err(RequestError::Forbidden(
                    "You can only delete your own comments",
                )),
                None => Err(RequestError::NotFound("Comment not found")),
            };
        }
    };
    let (author_username,): (String,) = sqlx::query_as("SELECT username FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;

    Ok(Comment {
        id,
        content,
        user_id,
        article_id,
        created_at,
        author_username,
    })
}

/// Comments on an article, oldest first.
pub async fn list_comments_for_article(
    pool: &SqlitePool,
    article_id: i64,
) -> RequestResult<Vec<Comment>> {
    let result = sqlx::query_as::<Sqlite, Comment>(&format!(
        "{COMMENT_QUERY} WHERE comments.article_id = $1 ORDER BY comments.created_at, comments.id"
    ))
    .bind(article_id)
    .fetch_all(pool)
    .await?;
    Ok(result)
}
