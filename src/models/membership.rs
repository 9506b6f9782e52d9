use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinStatus {
    Pending,
    Approved,
    Rejected,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: String,
    pub user_id: String,
    pub class_id: String,
    pub role: ClassRole,
    pub status: JoinStatus,
    pub join_reason: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub joined_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub join_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalActionRequest {
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChangeRequest {
    pub role: ClassRole,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberInfo {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub role: ClassRole,
    pub joined_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingApplication {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub join_reason: Option<String>,
    pub applied_at: String,
}

/// A pending application joined with the class it targets, for the
/// cross-class approvals feed of a manager.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ManagedApplication {
    pub class_id: String,
    pub class_name: String,
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub join_reason: Option<String>,
    pub applied_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleInfo {
    pub is_member: bool,
    pub role: Option<ClassRole>,
    pub is_owner: bool,
    pub is_admin: bool,
    pub can_manage_members: bool,
    pub can_publish_tasks: bool,
    pub can_view_approvals: bool,
    pub can_manage_class: bool,
    pub joined_at: Option<String>,
}

impl RoleInfo {
    pub fn non_member() -> Self {
        Self {
            is_member: false,
            role: None,
            is_owner: false,
            is_admin: false,
            can_manage_members: false,
            can_publish_tasks: false,
            can_view_approvals: false,
            can_manage_class: false,
            joined_at: None,
        }
    }

    pub fn for_membership(role: ClassRole, joined_at: Option<String>) -> Self {
        let is_owner = role == ClassRole::Owner;
        let is_admin = role == ClassRole::Admin;
        Self {
            is_member: true,
            role: Some(role),
            is_owner,
            is_admin,
            can_manage_members: is_owner,
            can_publish_tasks: is_owner || is_admin,
            can_view_approvals: is_owner || is_admin,
            can_manage_class: is_owner,
            joined_at,
        }
    }
}
