use axum::{
    extract::State,
    http::StatusCode,
    Form, Json,
};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{
    authentication::AuthUser,
    data_formats::{
        CommentRequest, CommentResponse, CommentWrapper, LikeResponse, MessageResponse, ResourceId,
    },
    db_helpers::{
        add_comment_in_db, count_likes, delete_comment_in_db, get_article_by_id,
        toggle_like_in_db,
    },
    errors::{RequestError, RequestResult},
};

pub async fn like_article(
    State(pool): State<SqlitePool>,
    session: AuthUser,
    ResourceId(id): ResourceId,
) -> RequestResult<Json<LikeResponse>> {
    let liked = toggle_like_in_db(&pool, session.id, id).await?;
    let likes = count_likes(&pool, id).await?;
    debug!(article_id = id, user_id = session.id, liked, "Like toggled");
    Ok(Json(LikeResponse { liked, likes }))
}

/// Blank comments are accepted and dropped, leaving the article untouched.
pub async fn add_comment(
    State(pool): State<SqlitePool>,
    session: AuthUser,
    ResourceId(id): ResourceId,
    Form(request): Form<CommentRequest>,
) -> RequestResult<(StatusCode, Json<CommentWrapper<Option<CommentResponse>>>)> {
    let content = match request.into_content() {
        Some(content) => content,
        None => {
            if get_article_by_id(&pool, id).await?.is_none() {
                return Err(RequestError::NotFound("Article not found"));
            }
            return Ok((StatusCode::OK, Json(CommentWrapper { comment: None })));
        }
    };

    let comment = add_comment_in_db(&pool, session.id, id, &content).await?;
    info!(comment_id = comment.id, article_id = id, "Comment added");
    Ok((
        StatusCode::CREATED,
        Json(CommentWrapper {
            comment: Some(comment.into()),
        }),
    ))
}

pub async fn delete_comment(
    State(pool): State<SqlitePool>,
    session: AuthUser,
    ResourceId(id): ResourceId,
) -> RequestResult<Json<MessageResponse>> {
    let comment = delete_comment_in_db(&pool, session.id, id).await?;
    info!(
        comment_id = comment.id,
        article_id = comment.article_id,
        "Comment deleted"
    );
    Ok(Json(MessageResponse {
        message: "Comment deleted",
    }))
}
