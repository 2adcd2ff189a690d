use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{errors::RequestResult, models::User};

mod article_helpers;
mod comment_helpers;
mod like_helpers;
mod search_helpers;
mod user_helpers;

pub use article_helpers::*;
pub use comment_helpers::*;
pub use like_helpers::*;
pub use search_helpers::*;
pub use user_helpers::*;

/// Joins optional filters with a separator. Every `$n` inside a filter is
/// replaced with the placeholder of that filter's value, so a value can be
/// referenced several times by one filter.
struct QueryBuilder {
    query: String,
    params: Vec<String>,
    seperator: &'static str,
}

impl QueryBuilder {
    fn new(seperator: &'static str) -> Self {
        Self {
            query: String::new(),
            params: vec![],
            seperator,
        }
    }

    fn add_param(mut self, filter: &str, param: Option<String>) -> Self {
        if let Some(value) = param {
            self.params.push(value);
            if !self.query.is_empty() {
                self.query.push_str(self.seperator);
            }
            let placeholder = format!("${}", self.params.len());
            self.query.push_str(&filter.replace("$n", &placeholder));
        }
        self
    }

    pub fn build(self) -> (String, Vec<String>) {
        let query = if self.query.is_empty() {
            String::from("1 = 1")
        } else {
            self.query
        };
        (query, self.params)
    }
}

// ----------------- Helper Functions -----------------

const USER_COLUMNS: &str = "id, username, email, age, password, avatar, created_at";

async fn fetch_user_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<Sqlite, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> RequestResult<Option<User>> {
    let result = sqlx::query_as::<Sqlite, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(result)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> RequestResult<Option<User>> {
    Ok(fetch_user_by_id(pool, id).await?)
}
