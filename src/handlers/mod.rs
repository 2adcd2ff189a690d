use axum::http::{StatusCode, Uri};

mod article_handlers;
mod interaction_handlers;
mod user_handlers;

pub use article_handlers::*;
pub use interaction_handlers::*;
pub use user_handlers::*;

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("URL {} provided was not found", uri),
    )
}
