use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{
    ClassRole, JoinStatus, ManagedApplication, MemberInfo, Membership, PendingApplication,
};

const MEMBERSHIP_COLUMNS: &str = "id, user_id, class_id, role, status, join_reason, approved_by, approved_at, joined_at, created_at, updated_at";

pub async fn find_membership(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    class_id: &str,
) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as::<_, Membership>(&format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE user_id = ? AND class_id = ?"
    ))
    .bind(user_id)
    .bind(class_id)
    .fetch_optional(db)
    .await
}

pub async fn find_approved(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    class_id: &str,
) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as::<_, Membership>(&format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE user_id = ? AND class_id = ? AND status = 'APPROVED'"
    ))
    .bind(user_id)
    .bind(class_id)
    .fetch_optional(db)
    .await
}

pub async fn find_pending(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    class_id: &str,
) -> Result<Option<Membership>, sqlx::Error> {
    sqlx::query_as::<_, Membership>(&format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE user_id = ? AND class_id = ? AND status = 'PENDING'"
    ))
    .bind(user_id)
    .bind(class_id)
    .fetch_optional(db)
    .await
}

/// APPROVED row with role OWNER or ADMIN exists.
pub async fn has_manage_role(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    class_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM memberships
            WHERE user_id = ? AND class_id = ?
                AND status = 'APPROVED' AND role IN ('OWNER', 'ADMIN')
        )
        "#,
    )
    .bind(user_id)
    .bind(class_id)
    .fetch_one(db)
    .await
}

pub async fn has_approved_role(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    class_id: &str,
    role: ClassRole,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM memberships WHERE user_id = ? AND class_id = ? AND status = 'APPROVED' AND role = ?)",
    )
    .bind(user_id)
    .bind(class_id)
    .bind(role)
    .fetch_one(db)
    .await
}

pub async fn is_approved_member(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    class_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM memberships WHERE user_id = ? AND class_id = ? AND status = 'APPROVED')",
    )
    .bind(user_id)
    .bind(class_id)
    .fetch_one(db)
    .await
}

/// Owner row, created in the same transaction as the class itself.
pub async fn insert_owner(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    class_id: &str,
) -> Result<Membership, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO memberships
            (id, user_id, class_id, role, status, join_reason,
            approved_by, approved_at, joined_at, created_at, updated_at)
        VALUES (?, ?, ?, 'OWNER', 'APPROVED', NULL, NULL, NULL, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(class_id)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Membership {
        id,
        user_id: user_id.to_string(),
        class_id: class_id.to_string(),
        role: ClassRole::Owner,
        status: JoinStatus::Approved,
        join_reason: None,
        approved_by: None,
        approved_at: None,
        joined_at: Some(now.clone()),
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn insert_application(
    db: impl sqlx::SqliteExecutor<'_>,
    user_id: &str,
    class_id: &str,
    join_reason: Option<&str>,
) -> Result<Membership, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO memberships
            (id, user_id, class_id, role, status, join_reason,
            approved_by, approved_at, joined_at, created_at, updated_at)
        VALUES (?, ?, ?, 'MEMBER', 'PENDING', ?, NULL, NULL, NULL, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(class_id)
    .bind(join_reason)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Membership {
        id,
        user_id: user_id.to_string(),
        class_id: class_id.to_string(),
        role: ClassRole::Member,
        status: JoinStatus::Pending,
        join_reason: join_reason.map(|r| r.to_string()),
        approved_by: None,
        approved_at: None,
        joined_at: None,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Re-application after REJECTED/REMOVED reuses the existing row: back to
/// a fresh PENDING application with the decision fields cleared.
pub async fn reset_application(
    db: impl sqlx::SqliteExecutor<'_>,
    membership_id: &str,
    join_reason: Option<&str>,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE memberships
        SET role = 'MEMBER',
            status = 'PENDING',
            join_reason = ?,
            approved_by = NULL,
            approved_at = NULL,
            joined_at = NULL,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(join_reason)
    .bind(&now)
    .bind(membership_id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn approve(
    db: impl sqlx::SqliteExecutor<'_>,
    membership_id: &str,
    approver_id: &str,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE memberships
        SET status = 'APPROVED',
            approved_by = ?,
            approved_at = ?,
            joined_at = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(approver_id)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .bind(membership_id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn reject(
    db: impl sqlx::SqliteExecutor<'_>,
    membership_id: &str,
    approver_id: &str,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE memberships
        SET status = 'REJECTED',
            approved_by = ?,
            approved_at = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(approver_id)
    .bind(&now)
    .bind(&now)
    .bind(membership_id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn update_role(
    db: impl sqlx::SqliteExecutor<'_>,
    membership_id: &str,
    role: ClassRole,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query("UPDATE memberships SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role)
        .bind(&now)
        .bind(membership_id)
        .execute(db)
        .await?;

    Ok(())
}

pub async fn list_members(
    db: &SqlitePool,
    class_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<MemberInfo>, sqlx::Error> {
    sqlx::query_as::<_, MemberInfo>(
        r#"
        SELECT m.user_id, u.username, u.display_name, m.role, m.joined_at
        FROM memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.class_id = ? AND m.status = 'APPROVED'
        ORDER BY m.joined_at ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(class_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_members(db: &SqlitePool, class_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM memberships WHERE class_id = ? AND status = 'APPROVED'",
    )
    .bind(class_id)
    .fetch_one(db)
    .await
}

pub async fn pending_for_class(
    db: &SqlitePool,
    class_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<PendingApplication>, sqlx::Error> {
    sqlx::query_as::<_, PendingApplication>(
        r#"
        SELECT m.user_id, u.username, u.display_name, m.join_reason,
            m.created_at AS applied_at
        FROM memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.class_id = ? AND m.status = 'PENDING'
        ORDER BY m.created_at ASC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(class_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_pending_for_class(db: &SqlitePool, class_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM memberships WHERE class_id = ? AND status = 'PENDING'",
    )
    .bind(class_id)
    .fetch_one(db)
    .await
}

/// One self-join resolves every PENDING application in every class the
/// manager holds an APPROVED OWNER/ADMIN row for.
pub async fn pending_across_managed(
    db: &SqlitePool,
    manager_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<ManagedApplication>, sqlx::Error> {
    sqlx::query_as::<_, ManagedApplication>(
        r#"
        SELECT a.class_id, c.name AS class_name, a.user_id, u.username,
            u.display_name, a.join_reason, a.created_at AS applied_at
        FROM memberships a
        JOIN memberships mgr ON mgr.class_id = a.class_id
            AND mgr.user_id = ?
            AND mgr.status = 'APPROVED'
            AND mgr.role IN ('OWNER', 'ADMIN')
        JOIN users u ON u.id = a.user_id
        JOIN classes c ON c.id = a.class_id
        WHERE a.status = 'PENDING'
        ORDER BY a.created_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(manager_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_pending_across_managed(
    db: &SqlitePool,
    manager_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM memberships a
        JOIN memberships mgr ON mgr.class_id = a.class_id
            AND mgr.user_id = ?
            AND mgr.status = 'APPROVED'
            AND mgr.role IN ('OWNER', 'ADMIN')
        WHERE a.status = 'PENDING'
        "#,
    )
    .bind(manager_id)
    .fetch_one(db)
    .await
}
