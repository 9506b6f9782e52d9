use crate::audit::{AuditEntry, actions};
use crate::db;
use crate::error::{AppError, is_unique_violation};
use crate::models::{ClassRole, JoinStatus, User};
use crate::state::AppState;

/// Files a join application. The existence check and the write share one
/// transaction; the unique pair constraint is the last line of defense
/// against a concurrent duplicate, translated to `DuplicatePending`.
pub async fn apply_to_join(
    state: &AppState,
    caller: &User,
    class_id: &str,
    join_reason: Option<&str>,
) -> Result<(), AppError> {
    db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;

    let mut tx = state.db.begin().await?;

    match db::memberships::find_membership(&mut *tx, &caller.id, class_id).await? {
        Some(existing) => match existing.status {
            JoinStatus::Approved => return Err(AppError::AlreadyMember),
            JoinStatus::Pending => return Err(AppError::DuplicatePending),
            // A rejected or removed user may reapply; the old row is reset
            // so the (user, class) pair stays unique.
            JoinStatus::Rejected | JoinStatus::Removed => {
                db::memberships::reset_application(&mut *tx, &existing.id, join_reason).await?;
            }
        },
        None => {
            if let Err(e) =
                db::memberships::insert_application(&mut *tx, &caller.id, class_id, join_reason)
                    .await
            {
                if is_unique_violation(&e, "memberships") {
                    return Err(AppError::DuplicatePending);
                }
                return Err(e.into());
            }
        }
    }

    tx.commit().await?;

    state.record(AuditEntry::new(
        &caller.id,
        actions::CLASS_JOIN_APPLY,
        "CLASS",
        class_id,
        serde_json::json!({ "join_reason": join_reason }),
    ));

    Ok(())
}

/// Role change over an approved membership. The operator must already have
/// been verified as OWNER by the caller; the guards here protect the row
/// itself.
pub async fn change_role(
    state: &AppState,
    operator: &User,
    class_id: &str,
    target_user_id: &str,
    new_role: ClassRole,
) -> Result<(), AppError> {
    let mut tx = state.db.begin().await?;

    let membership = db::memberships::find_approved(&mut *tx, target_user_id, class_id)
        .await?
        .ok_or(AppError::NotAMember)?;

    if membership.role == ClassRole::Owner {
        return Err(AppError::CannotModifyOwner);
    }
    if target_user_id == operator.id {
        return Err(AppError::CannotModifySelf);
    }
    if new_role == ClassRole::Owner {
        return Err(AppError::BadRequest(
            "role must be ADMIN or MEMBER".to_string(),
        ));
    }
    if membership.role == new_role {
        return Ok(());
    }

    db::memberships::update_role(&mut *tx, &membership.id, new_role).await?;
    tx.commit().await?;

    state.record(AuditEntry::new(
        &operator.id,
        actions::ROLE_CHANGE,
        "MEMBERSHIP",
        &membership.id,
        serde_json::json!({ "class_id": class_id, "target_user_id": target_user_id, "new_role": new_role }),
    ));

    Ok(())
}
