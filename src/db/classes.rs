use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Class, ClassStatus, ClassSummary, NewClassRequest};

pub async fn insert_class(
    db: impl sqlx::SqliteExecutor<'_>,
    req: &NewClassRequest,
    owner_id: &str,
    invite_code: String,
) -> Result<Class, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO classes
            (id, name, description, invite_code, is_public, join_approval_required,
            status, owner_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'ACTIVE', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&invite_code)
    .bind(req.is_public)
    .bind(req.join_approval_required)
    .bind(owner_id)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Class {
        id,
        name: req.name.clone(),
        description: req.description.clone(),
        invite_code,
        is_public: req.is_public,
        join_approval_required: req.join_approval_required,
        status: ClassStatus::Active,
        owner_id: owner_id.to_string(),
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find_class_by_id(
    db: impl sqlx::SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(
        "SELECT id, name, description, invite_code, is_public, join_approval_required, status, owner_id, created_at, updated_at FROM classes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn invite_code_exists(
    db: impl sqlx::SqliteExecutor<'_>,
    code: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM classes WHERE invite_code = ?)")
        .bind(code)
        .fetch_one(db)
        .await
}

pub async fn find_summary_by_id(
    db: impl sqlx::SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<ClassSummary>, sqlx::Error> {
    sqlx::query_as::<_, ClassSummary>(
        r#"
        SELECT c.id, c.name, c.description, c.is_public, c.join_approval_required,
            c.owner_id, c.created_at,
            (SELECT COUNT(*) FROM memberships m
                WHERE m.class_id = c.id AND m.status = 'APPROVED') AS member_count
        FROM classes c
        WHERE c.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn find_summary_by_invite_code(
    db: impl sqlx::SqliteExecutor<'_>,
    code: &str,
) -> Result<Option<ClassSummary>, sqlx::Error> {
    sqlx::query_as::<_, ClassSummary>(
        r#"
        SELECT c.id, c.name, c.description, c.is_public, c.join_approval_required,
            c.owner_id, c.created_at,
            (SELECT COUNT(*) FROM memberships m
                WHERE m.class_id = c.id AND m.status = 'APPROVED') AS member_count
        FROM classes c
        WHERE c.invite_code = ?
        "#,
    )
    .bind(code)
    .fetch_optional(db)
    .await
}

pub async fn search_public(
    db: &SqlitePool,
    name: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ClassSummary>, sqlx::Error> {
    sqlx::query_as::<_, ClassSummary>(
        r#"
        SELECT c.id, c.name, c.description, c.is_public, c.join_approval_required,
            c.owner_id, c.created_at,
            (SELECT COUNT(*) FROM memberships m
                WHERE m.class_id = c.id AND m.status = 'APPROVED') AS member_count
        FROM classes c
        WHERE c.is_public = 1
            AND c.status = 'ACTIVE'
            AND (?1 IS NULL OR c.name LIKE '%' || ?1 || '%')
        ORDER BY c.created_at DESC
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(name)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_public(db: &SqlitePool, name: Option<&str>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM classes c
        WHERE c.is_public = 1
            AND c.status = 'ACTIVE'
            AND (?1 IS NULL OR c.name LIKE '%' || ?1 || '%')
        "#,
    )
    .bind(name)
    .fetch_one(db)
    .await
}

pub async fn classes_for_user(
    db: &SqlitePool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<ClassSummary>, sqlx::Error> {
    sqlx::query_as::<_, ClassSummary>(
        r#"
        SELECT c.id, c.name, c.description, c.is_public, c.join_approval_required,
            c.owner_id, c.created_at,
            (SELECT COUNT(*) FROM memberships m2
                WHERE m2.class_id = c.id AND m2.status = 'APPROVED') AS member_count
        FROM classes c
        JOIN memberships m ON m.class_id = c.id
        WHERE m.user_id = ? AND m.status = 'APPROVED'
        ORDER BY m.joined_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count_for_user(db: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM memberships WHERE user_id = ? AND status = 'APPROVED'",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
}

pub async fn archive_class(
    db: impl sqlx::SqliteExecutor<'_>,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query("UPDATE classes SET status = 'ARCHIVED', updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
