use chrono::Utc;
use uuid::Uuid;

use crate::models::{TaskOverlay, TaskStatus};

pub async fn find_overlay(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    task_id: &str,
) -> Result<Option<TaskOverlay>, sqlx::Error> {
    sqlx::query_as::<_, TaskOverlay>(
        "SELECT id, user_id, task_id, personal_status, personal_deadline, personal_notes, completed_at, created_at, updated_at FROM task_overlays WHERE user_id = ? AND task_id = ?",
    )
    .bind(user_id)
    .bind(task_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_overlay(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    task_id: &str,
    status: TaskStatus,
    personal_deadline: Option<&str>,
    personal_notes: Option<&str>,
    completed_at: Option<&str>,
) -> Result<TaskOverlay, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO task_overlays
            (id, user_id, task_id, personal_status, personal_deadline,
            personal_notes, completed_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(task_id)
    .bind(status)
    .bind(personal_deadline)
    .bind(personal_notes)
    .bind(completed_at)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(TaskOverlay {
        id,
        user_id: user_id.to_string(),
        task_id: task_id.to_string(),
        personal_status: status,
        personal_deadline: personal_deadline.map(|d| d.to_string()),
        personal_notes: personal_notes.map(|n| n.to_string()),
        completed_at: completed_at.map(|c| c.to_string()),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Writes the personal fields of an existing overlay back.
pub async fn update_overlay(
    db: impl sqlx::SqliteExecutor<'_>,
    overlay: &TaskOverlay,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE task_overlays
        SET personal_status = ?,
            personal_deadline = ?,
            personal_notes = ?,
            completed_at = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(overlay.personal_status)
    .bind(&overlay.personal_deadline)
    .bind(&overlay.personal_notes)
    .bind(&overlay.completed_at)
    .bind(&overlay.updated_at)
    .bind(&overlay.id)
    .execute(db)
    .await?;

    Ok(())
}

/// Every task id the user already has an overlay for, across all classes.
pub async fn linked_task_ids(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT task_id FROM task_overlays WHERE user_id = ?")
        .bind(user_id)
        .fetch_all(db)
        .await
}

/// Sync insert: a TODO overlay seeded with the task's own deadline. The
/// unique pair constraint absorbs races with a concurrent first-touch;
/// rows_affected reports whether this call created the row.
pub async fn insert_overlay_if_absent(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    task_id: &str,
    personal_deadline: &str,
) -> Result<u64, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        INSERT INTO task_overlays
            (id, user_id, task_id, personal_status, personal_deadline,
            personal_notes, completed_at, created_at, updated_at)
        VALUES (?, ?, ?, 'TODO', ?, NULL, NULL, ?, ?)
        ON CONFLICT (user_id, task_id) DO NOTHING
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(task_id)
    .bind(personal_deadline)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}
