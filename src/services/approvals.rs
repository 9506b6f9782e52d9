use tracing::warn;

use crate::audit::{AuditEntry, actions};
use crate::db;
use crate::error::AppError;
use crate::models::{JoinStatus, ManagedApplication, Page, PageParams, PendingApplication, User};
use crate::notify::NotifyEvent;
use crate::services::authz;
use crate::state::AppState;

pub async fn list_pending_for_class(
    state: &AppState,
    requester: &User,
    class_id: &str,
    params: &PageParams,
) -> Result<Page<PendingApplication>, AppError> {
    db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;
    if !authz::can_manage(&state.db, &requester.id, class_id).await {
        return Err(AppError::PermissionDenied(
            "only the owner or an admin may view applications".to_string(),
        ));
    }

    let items =
        db::memberships::pending_for_class(&state.db, class_id, params.limit(), params.offset())
            .await?;
    let total = db::memberships::count_pending_for_class(&state.db, class_id).await?;
    Ok(Page::new(items, params, total))
}

/// The cross-class feed: every PENDING application in every class the
/// caller manages. The scoping join replaces a per-class permission check.
pub async fn list_pending_across_managed(
    state: &AppState,
    manager: &User,
    params: &PageParams,
) -> Result<Page<ManagedApplication>, AppError> {
    let items = db::memberships::pending_across_managed(
        &state.db,
        &manager.id,
        params.limit(),
        params.offset(),
    )
    .await?;
    let total = db::memberships::count_pending_across_managed(&state.db, &manager.id).await?;
    Ok(Page::new(items, params, total))
}

/// Resolves one PENDING application. APPROVE stamps the join; REJECT only
/// records the decision. The applicant is notified off the request path
/// after the transaction commits.
pub async fn process_approval(
    state: &AppState,
    approver: &User,
    class_id: &str,
    applicant_user_id: &str,
    action: &str,
) -> Result<JoinStatus, AppError> {
    let class = db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;
    if !authz::can_manage(&state.db, &approver.id, class_id).await {
        return Err(AppError::PermissionDenied(
            "only the owner or an admin may process applications".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;

    let pending = db::memberships::find_pending(&mut *tx, applicant_user_id, class_id)
        .await?
        .ok_or(AppError::NoPendingApplication)?;

    let (status, event, audit_action) = match action {
        "APPROVE" => {
            db::memberships::approve(&mut *tx, &pending.id, &approver.id).await?;
            (
                JoinStatus::Approved,
                NotifyEvent::JoinApproved,
                actions::MEMBERSHIP_APPROVE,
            )
        }
        "REJECT" => {
            db::memberships::reject(&mut *tx, &pending.id, &approver.id).await?;
            (
                JoinStatus::Rejected,
                NotifyEvent::JoinRejected,
                actions::MEMBERSHIP_REJECT,
            )
        }
        other => return Err(AppError::InvalidAction(other.to_string())),
    };

    tx.commit().await?;

    // The decision is durable at this point; a failed applicant lookup only
    // costs the notification.
    match db::users::find_user_by_id(&state.db, applicant_user_id).await {
        Ok(Some(applicant)) => {
            state.notify(
                event,
                applicant,
                serde_json::json!({ "class_id": class.id, "class_name": class.name }),
            );
        }
        Ok(None) => {}
        Err(e) => warn!("applicant lookup for notification failed: {}", e),
    }

    state.record(AuditEntry::new(
        &approver.id,
        audit_action,
        "MEMBERSHIP",
        &pending.id,
        serde_json::json!({ "class_id": class_id, "applicant_user_id": applicant_user_id }),
    ));

    Ok(status)
}
