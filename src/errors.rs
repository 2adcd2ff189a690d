use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::data_formats::ArticleDraft;

pub type RequestResult<T> = Result<T, RequestError>;

/// SQLite's extended result code for a UNIQUE constraint failure.
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    InvalidArticle {
        message: &'static str,
        draft: ArticleDraft,
    },
    #[error("{0}")]
    Conflict(&'static str),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("internal error: {0:#}")]
    ServerError(#[from] anyhow::Error),
}

#[derive(serde::Serialize)]
pub struct RequestErrorJsonWrapper {
    errors: RequestErrorJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    form: Option<ArticleDraft>,
}

#[derive(serde::Serialize)]
pub struct RequestErrorJson {
    body: Vec<String>,
}

impl RequestErrorJsonWrapper {
    pub fn new(error: &str) -> RequestErrorJsonWrapper {
        RequestErrorJsonWrapper {
            errors: RequestErrorJson {
                body: vec![error.to_string()],
            },
            form: None,
        }
    }
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Validation(_) | RequestError::InvalidArticle { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            RequestError::Conflict(_) => StatusCode::CONFLICT,
            RequestError::Unauthenticated | RequestError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            RequestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::DatabaseError(_) | RequestError::ServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True when a write was rejected by one of the schema's UNIQUE constraints.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            RequestError::DatabaseError(sqlx::Error::Database(e))
                if e.code().as_deref() == Some(SQLITE_CONSTRAINT_UNIQUE)
        )
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let json = match self {
            RequestError::DatabaseError(ref e) => {
                error!("Database error: {}", e);
                RequestErrorJsonWrapper::new("Internal Server Error")
            }
            RequestError::ServerError(ref e) => {
                error!("Internal error: {:#}", e);
                RequestErrorJsonWrapper::new("Internal Server Error")
            }
            RequestError::InvalidArticle { message, draft } => RequestErrorJsonWrapper {
                form: Some(draft),
                ..RequestErrorJsonWrapper::new(message)
            },
            ref other => RequestErrorJsonWrapper::new(&other.to_string()),
        };
        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::LOCATION, "/sign-in")], Json(json)).into_response();
        }
        (status, Json(json)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_points_at_sign_in() {
        let response = RequestError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::LOCATION], "/sign-in");
    }

    #[test]
    fn status_codes_follow_the_error_kind() {
        assert_eq!(
            RequestError::Validation("Title is required".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            RequestError::Conflict("Email already registered").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            RequestError::Forbidden("Not your comment").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            RequestError::NotFound("Article not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RequestError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_is_not_a_unique_violation() {
        assert!(!RequestError::DatabaseError(sqlx::Error::RowNotFound).is_unique_violation());
    }
}
