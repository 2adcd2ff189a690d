#![allow(dead_code)]

use std::{net::TcpListener, path::PathBuf};

use inkwell::{make_router, run_migrations, serve, AppState, MediaStores, SessionKeys};
use reqwest::{redirect::Policy, Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub address: String,
    pub upload_dir: PathBuf,
    pub client: Client,
    _dir: TempDir,
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

/// Serves the full router on an ephemeral port, backed by a database file
/// and an upload directory inside a temporary directory that is removed
/// when the `TestApp` drops.
pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("inkwell.db"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();

    let upload_dir = dir.path().join("uploads");
    let media = MediaStores::open_local(&upload_dir).await.unwrap();
    let sessions = SessionKeys::new("integration-test-secret", time::Duration::days(1));
    let router = make_router(AppState::new(pool, sessions, media));

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(serve(listener, router));

    TestApp {
        address,
        upload_dir,
        client: Client::builder().redirect(Policy::none()).build().unwrap(),
        _dir: dir,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// A client that keeps cookies between requests, like a browser.
    pub fn browser(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .unwrap()
    }

    pub fn get(&self, path: &str, user: Option<&TestUser>) -> RequestBuilder {
        with_token(self.client.get(self.url(path)), user)
    }

    pub fn post(&self, path: &str, user: Option<&TestUser>) -> RequestBuilder {
        with_token(self.client.post(self.url(path)), user)
    }

    pub async fn register(&self, username: &str) -> Response {
        let email = format!("{username}@example.com");
        self.post("/sign-up", None)
            .form(&[
                ("username", username),
                ("email", email.as_str()),
                ("age", "30"),
                ("password", PASSWORD),
            ])
            .send()
            .await
            .unwrap()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Response {
        self.post("/sign-in", None)
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .unwrap()
    }

    pub async fn sign_up_and_in(&self, username: &str) -> TestUser {
        assert_eq!(self.register(username).await.status(), StatusCode::CREATED);
        let response = self
            .sign_in(&format!("{username}@example.com"), PASSWORD)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        TestUser {
            id: body["user"]["id"].as_i64().unwrap(),
            username: username.to_owned(),
            token: body["user"]["token"].as_str().unwrap().to_owned(),
        }
    }

    /// Creates an article through the form endpoint and returns its JSON.
    pub async fn create_article(
        &self,
        user: &TestUser,
        title: &str,
        content: &str,
        category: &str,
        action: &str,
    ) -> Value {
        let response = self
            .post("/create-article", Some(user))
            .form(&[
                ("title", title),
                ("content", content),
                ("category", category),
                ("action", action),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["article"].clone()
    }

    pub async fn search(&self, query: &str) -> Value {
        let response = self.get(&format!("/search?{query}"), None).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }
}

fn with_token(request: RequestBuilder, user: Option<&TestUser>) -> RequestBuilder {
    match user {
        Some(user) => request.header("Authorization", format!("Token {}", user.token)),
        None => request,
    }
}

pub fn first_error(body: &Value) -> &str {
    body["errors"]["body"][0].as_str().unwrap()
}
