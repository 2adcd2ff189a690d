use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::{
    authentication::{AuthUser, MaybeUser},
    data_formats::{
        ArticleDetailResponse, ArticleInput, ArticleResponse, ArticleWrapper, CommentResponse,
        MessageResponse, ResourceId, SearchParams, SearchResponse, UploadForm,
    },
    db_helpers::{
        count_likes, create_article_in_db, delete_article_in_db, find_like, get_article_by_id,
        get_own_article, list_comments_for_article, search_articles, update_article_in_db,
    },
    errors::{RequestError, RequestResult},
    media::{discard, Upload, ALLOWED_IMAGE_EXTENSIONS},
    MediaStores,
};

const IMAGE_FIELD: &str = "articles_img";

async fn store_article_image(
    media: &MediaStores,
    author_id: i64,
    upload: Option<Upload>,
) -> RequestResult<Option<String>> {
    let upload = match upload {
        Some(upload) => upload,
        None => return Ok(None),
    };
    let prefix = format!("article_{author_id}");
    let reference = media
        .article_images
        .store(&upload, &prefix, ALLOWED_IMAGE_EXTENSIONS)
        .await?;
    Ok(Some(reference))
}

pub async fn create_article(
    State(pool): State<SqlitePool>,
    State(media): State<MediaStores>,
    session: AuthUser,
    mut form: UploadForm,
) -> RequestResult<(StatusCode, Json<ArticleWrapper<ArticleResponse>>)> {
    let input = ArticleInput::from_form(&form)?;
    let image = store_article_image(&media, session.id, form.take_file(IMAGE_FIELD)).await?;

    let article = match create_article_in_db(&pool, session.id, &input, image.as_deref()).await {
        Ok(article) => article,
        Err(e) => {
            discard(media.article_images.as_ref(), image.as_deref()).await;
            return Err(e);
        }
    };
    info!(
        article_id = article.id,
        status = article.status.as_str(),
        "Article created by {}",
        session.username
    );

    Ok((
        StatusCode::CREATED,
        Json(ArticleWrapper {
            article: article.into(),
        }),
    ))
}

pub async fn edit_article(
    State(pool): State<SqlitePool>,
    State(media): State<MediaStores>,
    session: AuthUser,
    ResourceId(id): ResourceId,
    mut form: UploadForm,
) -> RequestResult<Json<ArticleWrapper<ArticleResponse>>> {
    // someone else's article looks exactly like a missing one
    if get_own_article(&pool, id, session.id).await?.is_none() {
        return Err(RequestError::NotFound("Article not found"));
    }
    let input = ArticleInput::from_form(&form)?;
    let image = store_article_image(&media, session.id, form.take_file(IMAGE_FIELD)).await?;

    let (article, replaced) =
        match update_article_in_db(&pool, session.id, id, &input, image.as_deref()).await {
            Ok(result) => result,
            Err(e) => {
                discard(media.article_images.as_ref(), image.as_deref()).await;
                return Err(e);
            }
        };
    discard(media.article_images.as_ref(), replaced.as_deref()).await;
    info!(
        article_id = article.id,
        status = article.status.as_str(),
        "Article updated"
    );

    Ok(Json(ArticleWrapper {
        article: article.into(),
    }))
}

pub async fn delete_article(
    State(pool): State<SqlitePool>,
    State(media): State<MediaStores>,
    session: AuthUser,
    ResourceId(id): ResourceId,
) -> RequestResult<Json<MessageResponse>> {
    let image = delete_article_in_db(&pool, session.id, id).await?;
    discard(media.article_images.as_ref(), image.as_deref()).await;
    info!(article_id = id, "Article deleted by {}", session.username);
    Ok(Json(MessageResponse {
        message: "Article deleted",
    }))
}

/// Any article is viewable by anyone, drafts included.
pub async fn view_article(
    State(pool): State<SqlitePool>,
    viewer: MaybeUser,
    ResourceId(id): ResourceId,
) -> RequestResult<Json<ArticleWrapper<ArticleDetailResponse>>> {
    let article = get_article_by_id(&pool, id)
        .await?
        .ok_or(RequestError::NotFound("Article not found"))?;
    let likes = count_likes(&pool, id).await?;
    let liked = match viewer.get_id() {
        Some(user_id) => find_like(&pool, user_id, id).await?.is_some(),
        None => false,
    };
    let comments = list_comments_for_article(&pool, id)
        .await?
        .into_iter()
        .map(CommentResponse::from)
        .collect();

    Ok(Json(ArticleWrapper {
        article: ArticleDetailResponse {
            article: article.into(),
            likes,
            liked,
            comments,
        },
    }))
}

pub async fn search(
    State(pool): State<SqlitePool>,
    Query(params): Query<SearchParams>,
) -> RequestResult<Json<SearchResponse>> {
    let query = params.into_query();
    let page = search_articles(&pool, &query).await?;
    Ok(Json(SearchResponse::new(page, &query)))
}
