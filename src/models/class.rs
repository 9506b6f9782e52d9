use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassStatus {
    Active,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub invite_code: String,
    pub is_public: bool,
    pub join_approval_required: bool,
    pub status: ClassStatus,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClassRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "default_approval_required")]
    pub join_approval_required: bool,
}

fn default_approval_required() -> bool {
    true
}

/// Public listing shape. Leaves the invite code out; reading it is a
/// separate owner/admin operation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClassSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub join_approval_required: bool,
    pub owner_id: String,
    pub member_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteCodeResponse {
    pub invite_code: String,
}
