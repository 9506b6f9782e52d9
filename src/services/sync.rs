use std::collections::HashSet;

use chrono::{Duration, Utc};
use tracing::info;

use crate::audit::{AuditEntry, actions};
use crate::db;
use crate::error::AppError;
use crate::models::{SyncResult, User};
use crate::services::authz;
use crate::state::AppState;

fn lookback(range: &str) -> Result<Duration, AppError> {
    match range {
        "day" => Ok(Duration::days(1)),
        "week" => Ok(Duration::days(7)),
        "month" => Ok(Duration::days(30)),
        "semester" => Ok(Duration::days(183)),
        "year" => Ok(Duration::days(365)),
        other => Err(AppError::InvalidRange(other.to_string())),
    }
}

/// Links every class task the caller has not personally touched yet,
/// restricted to tasks created inside the lookback window. One
/// transaction covers the candidate scan and the batch insert, so a
/// failure rolls the whole run back and a rerun stays idempotent.
pub async fn sync_class_tasks(
    state: &AppState,
    caller: &User,
    class_id: &str,
    range: &str,
) -> Result<SyncResult, AppError> {
    db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;
    if !authz::is_member(&state.db, &caller.id, class_id).await {
        return Err(AppError::NotAMember);
    }

    let since = (Utc::now() - lookback(range)?).to_rfc3339();

    let mut tx = state.db.begin().await?;

    let candidates = db::tasks::sync_candidates(&mut *tx, class_id, &since).await?;
    let total = candidates.len() as i64;

    let linked: HashSet<String> = db::overlays::linked_task_ids(&mut *tx, &caller.id)
        .await?
        .into_iter()
        .collect();

    let mut newly_synced = 0u64;
    for (task_id, deadline) in &candidates {
        if linked.contains(task_id) {
            continue;
        }
        newly_synced +=
            db::overlays::insert_overlay_if_absent(&mut *tx, &caller.id, task_id, deadline)
                .await?;
    }

    tx.commit().await?;

    info!(
        "smart sync for user {} in class {}: {} of {} tasks linked ({})",
        caller.username, class_id, newly_synced, total, range
    );
    state.record(AuditEntry::new(
        &caller.id,
        actions::SYNC_RUN,
        "CLASS",
        class_id,
        serde_json::json!({ "range": range, "newly_synced": newly_synced, "total_in_range": total }),
    ));

    Ok(SyncResult {
        newly_synced_tasks: newly_synced,
        sync_range: range.to_string(),
        total_tasks_in_range: total,
    })
}
