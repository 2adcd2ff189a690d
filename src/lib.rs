mod authentication;
mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod handlers;
mod media;
mod models;

use std::{net::TcpListener, path::Path, sync::Arc};

use anyhow::Context;
pub use anyhow::Result;
use axum::{extract::DefaultBodyLimit, extract::FromRef, routing::*, Router};
use handlers::*;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use authentication::SessionKeys;
pub use config::Config;
pub use media::{LocalMediaStore, MediaStore};

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Where uploaded images end up, one store per kind of image.
#[derive(Clone)]
pub struct MediaStores {
    pub avatars: Arc<dyn MediaStore>,
    pub article_images: Arc<dyn MediaStore>,
}

impl MediaStores {
    /// Local stores under `upload_dir/avatars` and `upload_dir/articles`.
    pub async fn open_local(upload_dir: &Path) -> Result<Self> {
        let avatars = LocalMediaStore::open(upload_dir.join("avatars")).await?;
        let article_images = LocalMediaStore::open(upload_dir.join("articles")).await?;
        Ok(Self {
            avatars: Arc::new(avatars),
            article_images: Arc::new(article_images),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub sessions: Arc<SessionKeys>,
    pub media: MediaStores,
}

impl AppState {
    pub fn new(pool: SqlitePool, sessions: SessionKeys, media: MediaStores) -> Self {
        Self {
            pool,
            sessions: Arc::new(sessions),
            media,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<SessionKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for MediaStores {
    fn from_ref(state: &AppState) -> Self {
        state.media.clone()
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("inkwell=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn run_app(config: Config) -> Result<()> {
    let pool = init_db(&config.database_url).await?;
    let sessions = SessionKeys::new(&config.session_secret, config.session_lifetime());
    let media = MediaStores::open_local(&config.upload_dir).await?;
    let router = make_router(AppState::new(pool, sessions, media));

    let address = config.address();
    let listener =
        TcpListener::bind(address).with_context(|| format!("Failed to bind {address}"))?;
    info!("Server started on {}", address);
    serve(listener, router).await
}

/// Serves `router` on an already bound listener until a shutdown signal.
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    axum::Server::from_tcp(listener)?
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        info!("Creating database {}", db_url);
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("Failed to create database {db_url}"))?;
    } else {
        info!("Database already exists");
    }
    let pool = SqlitePool::connect(db_url).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running migrations");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations completed");
    Ok(())
}

pub fn make_router(state: AppState) -> Router {
    Router::new()
        .route("/check_health", get(alive))
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/logout", get(logout).post(logout))
        .route("/home", get(home))
        .route("/profile", get(get_profile).post(update_profile))
        .route("/my-articles", get(my_articles))
        .route("/search", get(search))
        .route("/create-article", post(create_article))
        .route("/edit-article/:id", post(edit_article))
        .route("/delete-article/:id", post(delete_article))
        .route("/view-article/:id", get(view_article))
        .route("/like-article/:id", post(like_article))
        .route("/add-comment/:id", post(add_comment))
        .route("/delete-comment/:id", post(delete_comment))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
