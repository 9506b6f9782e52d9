use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Personal,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub course_name: Option<String>,
    pub deadline: String,
    pub task_type: TaskType,
    pub class_id: Option<String>,
    pub creator_id: String,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskOverlay {
    pub id: String,
    pub user_id: String,
    pub task_id: String,
    pub personal_status: TaskStatus,
    pub personal_deadline: Option<String>,
    pub personal_notes: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub course_name: Option<String>,
    pub deadline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub course_name: Option<String>,
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: TaskStatus,
    #[serde(default)]
    pub personal_deadline: Option<String>,
    #[serde(default)]
    pub personal_notes: Option<String>,
}

/// A task as one user sees it: shared fields plus that user's overlay.
/// Rows without an overlay come back with the TODO default and no
/// personal fields.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TaskView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub course_name: Option<String>,
    pub deadline: String,
    pub task_type: TaskType,
    pub class_id: Option<String>,
    pub creator_id: String,
    pub personal_status: TaskStatus,
    pub personal_deadline: Option<String>,
    pub personal_notes: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub newly_synced_tasks: u64,
    pub sync_range: String,
    pub total_tasks_in_range: i64,
}
