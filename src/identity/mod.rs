use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::User;

/// Resolves a bearer token to the calling user. The membership core never
/// consults tokens itself; handlers resolve once and pass the `User` down.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<User, AppError>;
}

pub struct DbIdentity {
    db: SqlitePool,
}

impl DbIdentity {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Identity for DbIdentity {
    async fn resolve(&self, token: &str) -> Result<User, AppError> {
        let user = db::users::find_user_by_token(&self.db, token).await?;
        user.ok_or(AppError::Unauthenticated)
    }
}

/// Test double: rejects every token.
pub struct NoopIdentity;

#[async_trait]
impl Identity for NoopIdentity {
    async fn resolve(&self, _token: &str) -> Result<User, AppError> {
        Err(AppError::Unauthenticated)
    }
}
