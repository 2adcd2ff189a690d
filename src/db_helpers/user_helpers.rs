use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::{
    data_formats::{NewUser, ProfileUpdate},
    errors::{RequestError, RequestResult},
    models::User,
};

use super::{fetch_user_by_id, USER_COLUMNS};

/// Turns a UNIQUE violation on `users` into a conflict naming the column.
fn user_conflict(error: sqlx::Error) -> RequestError {
    let error = RequestError::from(error);
    if !error.is_unique_violation() {
        return error;
    }
    match &error {
        RequestError::DatabaseError(sqlx::Error::Database(e)) if e.message().contains("users.email") => {
            RequestError::Conflict("Email already registered")
        }
        _ => RequestError::Conflict("Username already taken"),
    }
}

pub async fn insert_user(pool: &SqlitePool, user: &NewUser) -> RequestResult<User> {
    let mut tx = pool.begin().await?;
    let user = sqlx::query_as::<Sqlite, User>(&format!(
        r#"
        INSERT INTO users (username, email, age, password, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&user.username)
    .bind(&user.email)
    .bind(user.age)
    .bind(&user.password)
    .bind(Utc::now())
    .fetch_one(&mut tx)
    .await
    .map_err(user_conflict)?;
    tx.commit().await?;
    Ok(user)
}

/// Applies a profile edit and returns the updated user together with the
/// avatar reference it replaced, if any.
pub async fn update_profile_in_db(
    pool: &SqlitePool,
    id: i64,
    ProfileUpdate {
        username,
        email,
        age,
    }: ProfileUpdate,
    avatar: Option<&str>,
) -> RequestResult<(User, Option<String>)> {
    let mut tx = pool.begin().await?;

    // written before anything is read; RETURNING yields the untouched avatar
    let previous: Option<(Option<String>,)> = sqlx::query_as(
        r#"
        UPDATE users
        SET username = COALESCE($1, username),
            email = COALESCE($2, email),
            age = COALESCE($3, age)
        WHERE id = $4
        RETURNING avatar
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(age)
    .bind(id)
    .fetch_optional(&mut tx)
    .await
    .map_err(user_conflict)?;
    let previous_avatar = match previous {
        Some((previous_avatar,)) => previous_avatar,
        None => return Err(RequestError::NotFound("User not found")),
    };

    if let Some(avatar) = avatar {
        sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
            .bind(avatar)
            .bind(id)
            .execute(&mut tx)
            .await?;
    }

    let user = fetch_user_by_id(&mut tx, id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    tx.commit().await?;

    Ok((user, avatar.and(previous_avatar)))
}
