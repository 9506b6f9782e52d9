use sqlx::SqlitePool;
use tracing::error;

use crate::db;
use crate::models::{Task, TaskType};

// Read-side predicates over the membership registry. Every predicate fails
// closed: a lookup fault is logged and answered with `false`.

pub async fn is_member(db: &SqlitePool, user_id: &str, class_id: &str) -> bool {
    match db::memberships::is_approved_member(db, user_id, class_id).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("membership lookup failed for user {}: {}", user_id, e);
            false
        }
    }
}

pub async fn can_manage(db: &SqlitePool, user_id: &str, class_id: &str) -> bool {
    match db::memberships::has_manage_role(db, user_id, class_id).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("manage-role lookup failed for user {}: {}", user_id, e);
            false
        }
    }
}

pub async fn is_owner(db: &SqlitePool, user_id: &str, class_id: &str) -> bool {
    match db::memberships::has_approved_role(db, user_id, class_id, crate::models::ClassRole::Owner)
        .await
    {
        Ok(answer) => answer,
        Err(e) => {
            error!("owner lookup failed for user {}: {}", user_id, e);
            false
        }
    }
}

/// PERSONAL tasks belong to their creator alone; CLASS tasks are visible
/// to approved members of the owning class.
pub async fn can_access_task(db: &SqlitePool, user_id: &str, task: &Task) -> bool {
    match task.task_type {
        TaskType::Personal => task.creator_id == user_id,
        TaskType::Class => match &task.class_id {
            Some(class_id) => is_member(db, user_id, class_id).await,
            None => false,
        },
    }
}

/// Editing is tighter than access: the creator always may; for CLASS tasks
/// a class manager may as well.
pub async fn can_edit_task(db: &SqlitePool, user_id: &str, task: &Task) -> bool {
    match task.task_type {
        TaskType::Personal => task.creator_id == user_id,
        TaskType::Class => {
            if task.creator_id == user_id {
                return true;
            }
            match &task.class_id {
                Some(class_id) => can_manage(db, user_id, class_id).await,
                None => false,
            }
        }
    }
}
