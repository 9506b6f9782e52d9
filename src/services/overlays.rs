use chrono::Utc;

use crate::audit::{AuditEntry, actions};
use crate::db;
use crate::error::AppError;
use crate::models::{StatusUpdateRequest, TaskStatus, TaskView, User};
use crate::services::{authz, normalize_instant};
use crate::state::AppState;

/// Records the caller's personal status against a task, creating the
/// overlay on first touch. Field semantics differ on purpose: status and
/// completion always overwrite, notes always overwrite (absent clears),
/// the personal deadline only overwrites when supplied.
pub async fn record_status(
    state: &AppState,
    caller: &User,
    task_id: &str,
    req: StatusUpdateRequest,
) -> Result<TaskView, AppError> {
    let task = db::tasks::find_task_by_id(&state.db, task_id)
        .await?
        .ok_or(AppError::TaskNotFound)?;
    if !authz::can_access_task(&state.db, &caller.id, &task).await {
        return Err(AppError::TaskNotAccessible);
    }

    let supplied_deadline = match &req.personal_deadline {
        Some(d) => Some(normalize_instant(d)?),
        None => None,
    };
    let now = Utc::now().to_rfc3339();
    let completed_at = (req.status == TaskStatus::Done).then(|| now.clone());

    let mut tx = state.db.begin().await?;

    match db::overlays::find_overlay(&mut *tx, &caller.id, task_id).await? {
        Some(mut overlay) => {
            overlay.personal_status = req.status;
            // A previously set custom deadline survives a plain status
            // update; only an explicit value replaces it.
            if let Some(deadline) = supplied_deadline {
                overlay.personal_deadline = Some(deadline);
            }
            overlay.personal_notes = req.personal_notes;
            overlay.completed_at = completed_at;
            overlay.updated_at = now;
            db::overlays::update_overlay(&mut *tx, &overlay).await?;
        }
        None => {
            let deadline = supplied_deadline.unwrap_or_else(|| task.deadline.clone());
            db::overlays::insert_overlay(
                &mut *tx,
                &caller.id,
                task_id,
                req.status,
                Some(&deadline),
                req.personal_notes.as_deref(),
                completed_at.as_deref(),
            )
            .await?;
        }
    }

    tx.commit().await?;

    state.record(AuditEntry::new(
        &caller.id,
        actions::TASK_STATUS_UPDATE,
        "TASK",
        task_id,
        serde_json::json!({ "status": req.status }),
    ));

    db::tasks::task_view(&state.db, &caller.id, task_id)
        .await?
        .ok_or(AppError::TaskNotFound)
}
