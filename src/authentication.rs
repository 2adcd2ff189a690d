use std::sync::Arc;

use crate::errors::RequestError;
use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaim {
    id: i64,
    username: String,
    exp: i64,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: jsonwebtoken::EncodingKey,
    decoding: jsonwebtoken::DecodingKey,
    lifetime: time::Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, lifetime: time::Duration) -> Self {
        Self {
            encoding: jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
            decoding: jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, id: i64, username: &str) -> Result<String> {
        let expiry_date = OffsetDateTime::now_utc()
            .checked_add(self.lifetime)
            .context("Session lifetime overflows the calendar")?;
        let claim = SessionClaim {
            id,
            username: username.to_owned(),
            exp: expiry_date.unix_timestamp(),
        };
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claim, &self.encoding)
            .context("Failed to sign session token")
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, RequestError> {
        let token_data = jsonwebtoken::decode::<SessionClaim>(
            token,
            &self.decoding,
            &jsonwebtoken::Validation::default(),
        )
        .map_err(|e| {
            debug!("Rejected session token: {}", e);
            RequestError::Unauthenticated
        })?;
        let claim = token_data.claims;
        if claim.exp < OffsetDateTime::now_utc().unix_timestamp() {
            return Err(RequestError::Unauthenticated);
        }
        Ok(AuthUser {
            id: claim.id,
            username: claim.username,
        })
    }

    /// `Set-Cookie` value carrying a freshly signed session for this user.
    pub fn session_cookie(&self, id: i64, username: &str) -> Result<(String, HeaderValue)> {
        let token = self.issue(id, username)?;
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.lifetime.whole_seconds()
        );
        let cookie = HeaderValue::from_str(&cookie).context("Session cookie is not a valid header")?;
        Ok((token, cookie))
    }
}

pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// The identity behind the current request. Handlers that take this
/// extractor reject anonymous callers with `Unauthenticated`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    /// Display name cached in the session when it was issued.
    pub username: String,
}

pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn get_id(&self) -> Option<i64> {
        self.0.as_ref().map(|a| a.id)
    }
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value);
    if from_cookie.is_some() {
        return from_cookie;
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Token "))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<SessionKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = match session_token(&parts.headers) {
            Some(token) => token,
            None => return Ok(MaybeUser(None)),
        };
        let keys = Arc::<SessionKeys>::from_ref(state);
        Ok(MaybeUser(keys.verify(token).ok()))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<SessionKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.ok_or(RequestError::Unauthenticated)
    }
}

pub async fn verify_password_argon2(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Stored password hash is malformed"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}
