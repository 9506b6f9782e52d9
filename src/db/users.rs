use chrono::Utc;
use uuid::Uuid;

use crate::models::{NewUserRequest, User};

/// Seam for the external identity system (and tests) to register users.
/// The core never writes this table.
pub async fn provision_user(
    db: impl sqlx::SqliteExecutor<'_>,
    req: NewUserRequest,
    api_token: &str,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, username, email, display_name, api_token, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&req.username)
    .bind(&req.email)
    .bind(&req.display_name)
    .bind(api_token)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(User {
        id,
        username: req.username,
        email: req.email,
        display_name: req.display_name,
        created_at: now,
    })
}

pub async fn find_user_by_id(
    db: impl sqlx::SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, display_name, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_user_by_token(
    db: impl sqlx::SqliteExecutor<'_>,
    api_token: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, display_name, created_at FROM users WHERE api_token = ?",
    )
    .bind(api_token)
    .fetch_optional(db)
    .await
}
