use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{
    authentication::{
        expired_session_cookie, hash_password_argon2, verify_password_argon2, AuthUser,
        SessionKeys,
    },
    data_formats::{
        article_list, Credentials, DashboardResponse, LoginRequest, MessageResponse,
        MultipleArticlesWrapper, ProfileResponse, ProfileUpdate, RegisterRequest, SearchParams,
        SearchResponse, SessionResponse, UploadForm, UserResponse, UserWrapper,
    },
    db_helpers::{
        article_stats_for_author, get_user_by_email, get_user_by_id, insert_user,
        list_articles_by_author, search_articles, update_profile_in_db,
    },
    errors::{RequestError, RequestResult},
    media::{discard, ALLOWED_IMAGE_EXTENSIONS},
    models::User,
    MediaStores,
};

const RECENT_ARTICLES: i64 = 5;

/// Loads the account behind a session. A session whose user no longer
/// exists counts as no session at all.
async fn current_user(pool: &SqlitePool, session: &AuthUser) -> RequestResult<User> {
    match get_user_by_id(pool, session.id).await? {
        Some(user) => Ok(user),
        None => Err(RequestError::Unauthenticated),
    }
}

/// Re-issues the session cookie so its cached display name follows the
/// stored username.
fn refresh_session(
    sessions: &SessionKeys,
    session: &AuthUser,
    user: &User,
) -> RequestResult<HeaderValue> {
    if session.username != user.username {
        debug!(
            user_id = user.id,
            "Refreshing display name {} -> {}", session.username, user.username
        );
    }
    let (_, cookie) = sessions.session_cookie(user.id, &user.username)?;
    Ok(cookie)
}

// ----------------- Session Handlers -----------------
pub async fn sign_up(
    State(pool): State<SqlitePool>,
    Form(request): Form<RegisterRequest>,
) -> RequestResult<impl IntoResponse> {
    let mut user = request.validate()?;
    user.password = hash_password_argon2(user.password).await?;
    let user = insert_user(&pool, &user).await?;
    info!(user_id = user.id, "Registered user {}", user.username);
    Ok((
        StatusCode::CREATED,
        Json(UserWrapper::wrap_with_user_data(UserResponse::from(user))),
    ))
}

pub async fn sign_in(
    State(pool): State<SqlitePool>,
    State(sessions): State<Arc<SessionKeys>>,
    Form(request): Form<LoginRequest>,
) -> RequestResult<impl IntoResponse> {
    let Credentials { email, password } = request.validate()?;
    let user = match get_user_by_email(&pool, &email).await? {
        Some(user) => user,
        None => {
            debug!("Sign-in attempt for unknown email");
            return Err(RequestError::InvalidCredentials);
        }
    };
    if !verify_password_argon2(password, &user.password).await? {
        debug!(user_id = user.id, "Sign-in attempt with wrong password");
        return Err(RequestError::InvalidCredentials);
    }

    let (token, cookie) = sessions.session_cookie(user.id, &user.username)?;
    info!(user_id = user.id, "Signed in");
    let result = SessionResponse {
        user: user.into(),
        token,
    };
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(UserWrapper::wrap_with_user_data(result)),
    ))
}

pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(MessageResponse {
            message: "Signed out",
        }),
    )
}

// ----------------- Dashboard Handlers -----------------
pub async fn home(
    State(pool): State<SqlitePool>,
    State(sessions): State<Arc<SessionKeys>>,
    session: AuthUser,
    Query(params): Query<SearchParams>,
) -> RequestResult<impl IntoResponse> {
    let user = current_user(&pool, &session).await?;
    let cookie = refresh_session(&sessions, &session, &user)?;

    let stats = article_stats_for_author(&pool, user.id).await?;
    let recent = list_articles_by_author(&pool, user.id, Some(RECENT_ARTICLES)).await?;
    let query = params.into_query();
    let search = if query.is_requested() {
        let page = search_articles(&pool, &query).await?;
        Some(SearchResponse::new(page, &query))
    } else {
        None
    };

    let result = DashboardResponse {
        display_name: user.username.clone(),
        user: user.into(),
        stats,
        recent_articles: article_list(recent),
        search,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(result)))
}

pub async fn my_articles(
    State(pool): State<SqlitePool>,
    session: AuthUser,
) -> RequestResult<Json<MultipleArticlesWrapper>> {
    let articles = list_articles_by_author(&pool, session.id, None).await?;
    Ok(Json(MultipleArticlesWrapper::new(article_list(articles))))
}

// ----------------- Profile Handlers -----------------
async fn profile_response(pool: &SqlitePool, user: User) -> RequestResult<ProfileResponse> {
    let stats = article_stats_for_author(pool, user.id).await?;
    let recent = list_articles_by_author(pool, user.id, Some(RECENT_ARTICLES)).await?;
    Ok(ProfileResponse {
        user: user.into(),
        stats,
        recent_articles: article_list(recent),
    })
}

pub async fn get_profile(
    State(pool): State<SqlitePool>,
    State(sessions): State<Arc<SessionKeys>>,
    session: AuthUser,
) -> RequestResult<impl IntoResponse> {
    let user = current_user(&pool, &session).await?;
    let cookie = refresh_session(&sessions, &session, &user)?;
    let result = profile_response(&pool, user).await?;
    Ok(([(header::SET_COOKIE, cookie)], Json(result)))
}

pub async fn update_profile(
    State(pool): State<SqlitePool>,
    State(sessions): State<Arc<SessionKeys>>,
    State(media): State<MediaStores>,
    session: AuthUser,
    mut form: UploadForm,
) -> RequestResult<impl IntoResponse> {
    let changes = ProfileUpdate::from_form(&form);
    let avatar = match form.take_file("avatar") {
        Some(upload) => {
            let prefix = format!("avatar_{}", session.id);
            Some(
                media
                    .avatars
                    .store(&upload, &prefix, ALLOWED_IMAGE_EXTENSIONS)
                    .await?,
            )
        }
        None => None,
    };

    let (user, replaced) =
        match update_profile_in_db(&pool, session.id, changes, avatar.as_deref()).await {
            Ok(result) => result,
            Err(e) => {
                discard(media.avatars.as_ref(), avatar.as_deref()).await;
                return Err(e);
            }
        };
    discard(media.avatars.as_ref(), replaced.as_deref()).await;
    info!(user_id = user.id, "Profile updated");

    let cookie = refresh_session(&sessions, &session, &user)?;
    let result = profile_response(&pool, user).await?;
    Ok(([(header::SET_COOKIE, cookie)], Json(result)))
}
