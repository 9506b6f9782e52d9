use tracing::info;

use crate::audit::{AuditEntry, actions};
use crate::db;
use crate::error::{AppError, is_unique_violation};
use crate::models::{
    Class, ClassSummary, InviteCodeResponse, MemberInfo, NewClassRequest, Page, PageParams,
    RoleInfo, User,
};
use crate::services::{authz, invites};
use crate::state::AppState;

/// Creates the class and its OWNER membership in one transaction. A lost
/// invite-code race shows up as a unique violation on the insert and is
/// answered with a fresh draw, not an error.
pub async fn create_class(
    state: &AppState,
    caller: &User,
    req: NewClassRequest,
) -> Result<Class, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("class name must not be empty".to_string()));
    }

    let class = loop {
        let invite_code = invites::issue(&state.db).await?;
        let mut tx = state.db.begin().await?;

        match db::classes::insert_class(&mut *tx, &req, &caller.id, invite_code).await {
            Ok(class) => {
                db::memberships::insert_owner(&mut *tx, &caller.id, &class.id).await?;
                tx.commit().await?;
                break class;
            }
            Err(e) if is_unique_violation(&e, "invite_code") => continue,
            Err(e) => return Err(e.into()),
        }
    };

    info!("class {} created by {}", class.id, caller.username);
    state.record(AuditEntry::new(
        &caller.id,
        actions::CLASS_CREATE,
        "CLASS",
        &class.id,
        serde_json::json!({ "name": class.name }),
    ));

    Ok(class)
}

pub async fn find_by_invite_code(
    state: &AppState,
    code: &str,
) -> Result<ClassSummary, AppError> {
    db::classes::find_summary_by_invite_code(&state.db, code)
        .await?
        .ok_or(AppError::ClassNotFound)
}

pub async fn class_details(state: &AppState, class_id: &str) -> Result<ClassSummary, AppError> {
    db::classes::find_summary_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)
}

pub async fn my_classes(
    state: &AppState,
    caller: &User,
    params: &PageParams,
) -> Result<Page<ClassSummary>, AppError> {
    let items =
        db::classes::classes_for_user(&state.db, &caller.id, params.limit(), params.offset())
            .await?;
    let total = db::classes::count_for_user(&state.db, &caller.id).await?;
    Ok(Page::new(items, params, total))
}

pub async fn search_public(
    state: &AppState,
    name: Option<&str>,
    params: &PageParams,
) -> Result<Page<ClassSummary>, AppError> {
    let items =
        db::classes::search_public(&state.db, name, params.limit(), params.offset()).await?;
    let total = db::classes::count_public(&state.db, name).await?;
    Ok(Page::new(items, params, total))
}

pub async fn member_list(
    state: &AppState,
    caller: &User,
    class_id: &str,
    params: &PageParams,
) -> Result<Page<MemberInfo>, AppError> {
    db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;
    if !authz::is_member(&state.db, &caller.id, class_id).await {
        return Err(AppError::NotAMember);
    }

    let items =
        db::memberships::list_members(&state.db, class_id, params.limit(), params.offset())
            .await?;
    let total = db::memberships::count_members(&state.db, class_id).await?;
    Ok(Page::new(items, params, total))
}

/// Role and capability view for UI gating. Non-members get the all-false
/// shape rather than an error.
pub async fn user_role(
    state: &AppState,
    caller: &User,
    class_id: &str,
) -> Result<RoleInfo, AppError> {
    db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;

    let membership = db::memberships::find_approved(&state.db, &caller.id, class_id).await?;
    Ok(match membership {
        Some(m) => RoleInfo::for_membership(m.role, m.joined_at),
        None => RoleInfo::non_member(),
    })
}

pub async fn invite_code(
    state: &AppState,
    caller: &User,
    class_id: &str,
) -> Result<InviteCodeResponse, AppError> {
    let class = db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;
    if !authz::can_manage(&state.db, &caller.id, class_id).await {
        return Err(AppError::PermissionDenied(
            "only the owner or an admin may read the invite code".to_string(),
        ));
    }

    Ok(InviteCodeResponse {
        invite_code: class.invite_code,
    })
}

pub async fn archive_class(state: &AppState, caller: &User, class_id: &str) -> Result<(), AppError> {
    db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;
    if !authz::is_owner(&state.db, &caller.id, class_id).await {
        return Err(AppError::PermissionDenied(
            "only the owner may archive a class".to_string(),
        ));
    }

    db::classes::archive_class(&state.db, class_id).await?;
    state.record(AuditEntry::new(
        &caller.id,
        actions::CLASS_ARCHIVE,
        "CLASS",
        class_id,
        serde_json::Value::Null,
    ));

    Ok(())
}
