use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{NewTaskRequest, Task, TaskType, TaskView, UpdateTaskRequest};

/// Shared SELECT head for the presentation merge: task fields plus the
/// calling user's overlay, TODO-defaulted when no overlay row exists.
const TASK_VIEW_SELECT: &str = r#"
SELECT t.id, t.title, t.description, t.course_name, t.deadline, t.task_type,
    t.class_id, t.creator_id,
    COALESCE(o.personal_status, 'TODO') AS personal_status,
    o.personal_deadline, o.personal_notes, o.completed_at,
    t.created_at, t.updated_at
FROM tasks t
LEFT JOIN task_overlays o ON o.task_id = t.id AND o.user_id = ?1
"#;

pub async fn insert_task(
    db: impl sqlx::SqliteExecutor<'_>,
    req: NewTaskRequest,
    task_type: TaskType,
    class_id: Option<String>,
    creator_id: &str,
) -> Result<Task, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO tasks
            (id, title, description, course_name, deadline, task_type,
            class_id, creator_id, is_deleted, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.course_name)
    .bind(&req.deadline)
    .bind(task_type)
    .bind(&class_id)
    .bind(creator_id)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Task {
        id,
        title: req.title,
        description: req.description,
        course_name: req.course_name,
        deadline: req.deadline,
        task_type,
        class_id,
        creator_id: creator_id.to_string(),
        is_deleted: false,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find_task_by_id(
    db: impl sqlx::SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(
        "SELECT id, title, description, course_name, deadline, task_type, class_id, creator_id, is_deleted, created_at, updated_at FROM tasks WHERE id = ? AND is_deleted = 0",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Merges the patch into `task` and writes the shared fields back.
/// Absent fields keep their current value.
pub async fn update_task(
    db: impl sqlx::SqliteExecutor<'_>,
    mut task: Task,
    req: UpdateTaskRequest,
) -> Result<Task, sqlx::Error> {
    if let Some(title) = req.title {
        task.title = title;
    }
    if let Some(description) = req.description {
        task.description = Some(description);
    }
    if let Some(course_name) = req.course_name {
        task.course_name = Some(course_name);
    }
    if let Some(deadline) = req.deadline {
        task.deadline = deadline;
    }
    task.updated_at = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?,
            description = ?,
            course_name = ?,
            deadline = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.course_name)
    .bind(&task.deadline)
    .bind(&task.updated_at)
    .bind(&task.id)
    .execute(db)
    .await?;

    Ok(task)
}

pub async fn soft_delete_task(
    db: impl sqlx::SqliteExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE tasks SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
    )
    .bind(&now)
    .bind(id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn task_view(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    task_id: &str,
) -> Result<Option<TaskView>, sqlx::Error> {
    sqlx::query_as::<_, TaskView>(&format!(
        "{TASK_VIEW_SELECT} WHERE t.id = ?2 AND t.is_deleted = 0"
    ))
    .bind(user_id)
    .bind(task_id)
    .fetch_optional(db)
    .await
}

pub async fn class_tasks(
    db: &SqlitePool,
    user_id: &str,
    class_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<TaskView>, sqlx::Error> {
    sqlx::query_as::<_, TaskView>(&format!(
        r#"
        {TASK_VIEW_SELECT}
        WHERE t.class_id = ?2 AND t.is_deleted = 0
        ORDER BY t.deadline ASC
        LIMIT ?3 OFFSET ?4
        "#
    ))
    .bind(user_id)
    .bind(class_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_class_tasks(db: &SqlitePool, class_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks WHERE class_id = ? AND is_deleted = 0",
    )
    .bind(class_id)
    .fetch_one(db)
    .await
}

pub async fn personal_tasks(
    db: &SqlitePool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<TaskView>, sqlx::Error> {
    sqlx::query_as::<_, TaskView>(&format!(
        r#"
        {TASK_VIEW_SELECT}
        WHERE t.creator_id = ?1 AND t.task_type = 'PERSONAL' AND t.is_deleted = 0
        ORDER BY t.deadline ASC
        LIMIT ?2 OFFSET ?3
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_personal_tasks(db: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks WHERE creator_id = ? AND task_type = 'PERSONAL' AND is_deleted = 0",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
}

/// Calendar feed: only tasks the user has linked via an overlay, placed
/// at the personal deadline when one is set.
pub async fn calendar_tasks(
    db: &SqlitePool,
    user_id: &str,
    start: &str,
    end: &str,
) -> Result<Vec<TaskView>, sqlx::Error> {
    sqlx::query_as::<_, TaskView>(
        r#"
        SELECT t.id, t.title, t.description, t.course_name, t.deadline, t.task_type,
            t.class_id, t.creator_id,
            o.personal_status,
            o.personal_deadline, o.personal_notes, o.completed_at,
            t.created_at, t.updated_at
        FROM tasks t
        JOIN task_overlays o ON o.task_id = t.id AND o.user_id = ?
        WHERE t.is_deleted = 0
            AND COALESCE(o.personal_deadline, t.deadline) >= ?
            AND COALESCE(o.personal_deadline, t.deadline) < ?
        ORDER BY COALESCE(o.personal_deadline, t.deadline) ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}

/// Candidate (id, deadline) pairs for a sync run: live CLASS tasks of the
/// class created at or after `since`.
pub async fn sync_candidates(
    db: impl sqlx::SqliteExecutor<'_>,
    class_id: &str,
    since: &str,
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>(
        "SELECT id, deadline FROM tasks WHERE class_id = ? AND task_type = 'CLASS' AND is_deleted = 0 AND created_at >= ?",
    )
    .bind(class_id)
    .bind(since)
    .fetch_all(db)
    .await
}
