use chrono::{NaiveDate, NaiveTime};

use crate::audit::{AuditEntry, actions};
use crate::db;
use crate::error::AppError;
use crate::models::{
    NewTaskRequest, Page, PageParams, Task, TaskType, TaskView, UpdateTaskRequest, User,
};
use crate::services::{authz, normalize_instant};
use crate::state::AppState;

pub async fn create_personal_task(
    state: &AppState,
    caller: &User,
    mut req: NewTaskRequest,
) -> Result<Task, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("task title must not be empty".to_string()));
    }
    req.deadline = normalize_instant(&req.deadline)?;

    let task =
        db::tasks::insert_task(&state.db, req, TaskType::Personal, None, &caller.id).await?;

    state.record(AuditEntry::new(
        &caller.id,
        actions::TASK_CREATE_PERSONAL,
        "TASK",
        &task.id,
        serde_json::json!({ "title": task.title }),
    ));

    Ok(task)
}

pub async fn create_class_task(
    state: &AppState,
    caller: &User,
    class_id: &str,
    mut req: NewTaskRequest,
) -> Result<Task, AppError> {
    db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;
    if !authz::can_manage(&state.db, &caller.id, class_id).await {
        return Err(AppError::PermissionDenied(
            "only the owner or an admin may publish class tasks".to_string(),
        ));
    }
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("task title must not be empty".to_string()));
    }
    req.deadline = normalize_instant(&req.deadline)?;

    let task = db::tasks::insert_task(
        &state.db,
        req,
        TaskType::Class,
        Some(class_id.to_string()),
        &caller.id,
    )
    .await?;

    state.record(AuditEntry::new(
        &caller.id,
        actions::TASK_CREATE_CLASS,
        "TASK",
        &task.id,
        serde_json::json!({ "class_id": class_id, "title": task.title }),
    ));

    Ok(task)
}

pub async fn task_detail(
    state: &AppState,
    caller: &User,
    task_id: &str,
) -> Result<TaskView, AppError> {
    let task = db::tasks::find_task_by_id(&state.db, task_id)
        .await?
        .ok_or(AppError::TaskNotFound)?;
    if !authz::can_access_task(&state.db, &caller.id, &task).await {
        return Err(AppError::TaskNotAccessible);
    }

    db::tasks::task_view(&state.db, &caller.id, task_id)
        .await?
        .ok_or(AppError::TaskNotFound)
}

pub async fn update_task(
    state: &AppState,
    caller: &User,
    task_id: &str,
    mut req: UpdateTaskRequest,
) -> Result<Task, AppError> {
    let task = db::tasks::find_task_by_id(&state.db, task_id)
        .await?
        .ok_or(AppError::TaskNotFound)?;
    if !authz::can_edit_task(&state.db, &caller.id, &task).await {
        return Err(AppError::TaskNotAccessible);
    }
    if let Some(deadline) = req.deadline.take() {
        req.deadline = Some(normalize_instant(&deadline)?);
    }

    let updated = db::tasks::update_task(&state.db, task, req).await?;

    state.record(AuditEntry::new(
        &caller.id,
        actions::TASK_UPDATE,
        "TASK",
        task_id,
        serde_json::json!({ "title": updated.title }),
    ));

    Ok(updated)
}

pub async fn delete_task(state: &AppState, caller: &User, task_id: &str) -> Result<(), AppError> {
    let task = db::tasks::find_task_by_id(&state.db, task_id)
        .await?
        .ok_or(AppError::TaskNotFound)?;
    if !authz::can_edit_task(&state.db, &caller.id, &task).await {
        return Err(AppError::TaskNotAccessible);
    }

    db::tasks::soft_delete_task(&state.db, task_id).await?;

    state.record(AuditEntry::new(
        &caller.id,
        actions::TASK_DELETE,
        "TASK",
        task_id,
        serde_json::Value::Null,
    ));

    Ok(())
}

pub async fn list_class_tasks(
    state: &AppState,
    caller: &User,
    class_id: &str,
    params: &PageParams,
) -> Result<Page<TaskView>, AppError> {
    db::classes::find_class_by_id(&state.db, class_id)
        .await?
        .ok_or(AppError::ClassNotFound)?;
    if !authz::is_member(&state.db, &caller.id, class_id).await {
        return Err(AppError::NotAMember);
    }

    let items = db::tasks::class_tasks(
        &state.db,
        &caller.id,
        class_id,
        params.limit(),
        params.offset(),
    )
    .await?;
    let total = db::tasks::count_class_tasks(&state.db, class_id).await?;
    Ok(Page::new(items, params, total))
}

pub async fn list_personal_tasks(
    state: &AppState,
    caller: &User,
    params: &PageParams,
) -> Result<Page<TaskView>, AppError> {
    let items =
        db::tasks::personal_tasks(&state.db, &caller.id, params.limit(), params.offset()).await?;
    let total = db::tasks::count_personal_tasks(&state.db, &caller.id).await?;
    Ok(Page::new(items, params, total))
}

/// Month view over the caller's linked tasks, placed at the effective
/// deadline (personal when set, shared otherwise).
pub async fn calendar(
    state: &AppState,
    caller: &User,
    year: i32,
    month: u32,
) -> Result<Vec<TaskView>, AppError> {
    let (start, end) = month_range(year, month)?;
    Ok(db::tasks::calendar_tasks(&state.db, &caller.id, &start, &end).await?)
}

fn month_range(year: i32, month: u32) -> Result<(String, String), AppError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::BadRequest(format!("invalid month {}-{}", year, month)))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::BadRequest(format!("invalid month {}-{}", year, month)))?;

    Ok((
        start.and_time(NaiveTime::MIN).and_utc().to_rfc3339(),
        end.and_time(NaiveTime::MIN).and_utc().to_rfc3339(),
    ))
}
