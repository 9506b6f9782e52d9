use axum::Json;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::*;
use crate::services;
use crate::state::AppState;

/// The resolved caller. Extraction reads `Authorization: Bearer <token>`
/// and asks the identity collaborator; handlers then pass the user into
/// every core operation explicitly.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthenticated)?;
        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthenticated)?;

        let user = state.identity.resolve(token).await?;
        Ok(AuthUser(user))
    }
}

#[derive(Deserialize)]
struct SearchParams {
    name: Option<String>,
    #[serde(default)]
    page: i64,
    #[serde(default = "default_page_size")]
    size: i64,
}

fn default_page_size() -> i64 {
    20
}

#[derive(Deserialize)]
struct CalendarParams {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct SyncParams {
    range: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/classes", post(create_class))
        .route("/api/classes/search", get(search_classes))
        .route("/api/classes/mine", get(my_classes))
        .route("/api/classes/invite/{code}", get(class_by_invite_code))
        .route("/api/classes/{id}", get(class_details))
        .route("/api/classes/{id}/archive", post(archive_class))
        .route("/api/classes/{id}/invite-code", get(invite_code))
        .route("/api/classes/{id}/join", post(apply_to_join))
        .route("/api/classes/{id}/members", get(member_list))
        .route("/api/classes/{id}/members/{user_id}/role", put(change_role))
        .route("/api/classes/{id}/role", get(user_role))
        .route(
            "/api/classes/{id}/approvals",
            get(list_pending_for_class),
        )
        .route(
            "/api/classes/{id}/approvals/{user_id}",
            post(process_approval),
        )
        .route("/api/approvals/pending", get(list_pending_across_managed))
        .route(
            "/api/classes/{id}/tasks",
            get(list_class_tasks).post(create_class_task),
        )
        .route(
            "/api/tasks/personal",
            get(list_personal_tasks).post(create_personal_task),
        )
        .route(
            "/api/tasks/{id}",
            get(task_detail).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/status", put(record_status))
        .route("/api/calendar", get(calendar))
        .route("/api/sync/class/{id}", post(sync_class_tasks))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn create_class(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<NewClassRequest>,
) -> Result<Json<Class>, AppError> {
    let class = services::classes::create_class(&state, &user, req).await?;
    Ok(Json(class))
}

async fn search_classes(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<ClassSummary>>, AppError> {
    let page = PageParams {
        page: params.page,
        size: params.size,
    };
    let result =
        services::classes::search_public(&state, params.name.as_deref(), &page).await?;
    Ok(Json(result))
}

async fn my_classes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ClassSummary>>, AppError> {
    let result = services::classes::my_classes(&state, &user, &params).await?;
    Ok(Json(result))
}

async fn class_by_invite_code(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(code): Path<String>,
) -> Result<Json<ClassSummary>, AppError> {
    let class = services::classes::find_by_invite_code(&state, &code).await?;
    Ok(Json(class))
}

async fn class_details(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ClassSummary>, AppError> {
    let class = services::classes::class_details(&state, &id).await?;
    Ok(Json(class))
}

async fn archive_class(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    services::classes::archive_class(&state, &user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn invite_code(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<InviteCodeResponse>, AppError> {
    let code = services::classes::invite_code(&state, &user, &id).await?;
    Ok(Json(code))
}

async fn apply_to_join(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<StatusCode, AppError> {
    services::membership::apply_to_join(&state, &user, &id, req.join_reason.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn member_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<MemberInfo>>, AppError> {
    let result = services::classes::member_list(&state, &user, &id, &params).await?;
    Ok(Json(result))
}

/// The owner gate lives here: the registry trusts its caller to have
/// verified the operator before asking for a role change.
async fn change_role(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, user_id)): Path<(String, String)>,
    Json(req): Json<RoleChangeRequest>,
) -> Result<StatusCode, AppError> {
    if !services::authz::is_owner(&state.db, &user.id, &id).await {
        return Err(AppError::PermissionDenied(
            "only the owner may change member roles".to_string(),
        ));
    }
    services::membership::change_role(&state, &user, &id, &user_id, req.role).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn user_role(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<RoleInfo>, AppError> {
    let info = services::classes::user_role(&state, &user, &id).await?;
    Ok(Json(info))
}

async fn list_pending_for_class(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<PendingApplication>>, AppError> {
    let result = services::approvals::list_pending_for_class(&state, &user, &id, &params).await?;
    Ok(Json(result))
}

async fn process_approval(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, user_id)): Path<(String, String)>,
    Json(req): Json<ApprovalActionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status =
        services::approvals::process_approval(&state, &user, &id, &user_id, &req.action).await?;
    Ok(Json(serde_json::json!({ "status": status })))
}

async fn list_pending_across_managed(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ManagedApplication>>, AppError> {
    let result = services::approvals::list_pending_across_managed(&state, &user, &params).await?;
    Ok(Json(result))
}

async fn list_class_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<TaskView>>, AppError> {
    let result = services::tasks::list_class_tasks(&state, &user, &id, &params).await?;
    Ok(Json(result))
}

async fn create_class_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<NewTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = services::tasks::create_class_task(&state, &user, &id, req).await?;
    Ok(Json(task))
}

async fn list_personal_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<TaskView>>, AppError> {
    let result = services::tasks::list_personal_tasks(&state, &user, &params).await?;
    Ok(Json(result))
}

async fn create_personal_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<NewTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = services::tasks::create_personal_task(&state, &user, req).await?;
    Ok(Json(task))
}

async fn task_detail(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskView>, AppError> {
    let view = services::tasks::task_detail(&state, &user, &id).await?;
    Ok(Json(view))
}

async fn update_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = services::tasks::update_task(&state, &user, &id, req).await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    services::tasks::delete_task(&state, &user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn record_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<TaskView>, AppError> {
    let view = services::overlays::record_status(&state, &user, &id, req).await?;
    Ok(Json(view))
}

async fn calendar(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<CalendarParams>,
) -> Result<Json<Vec<TaskView>>, AppError> {
    let tasks = services::tasks::calendar(&state, &user, params.year, params.month).await?;
    Ok(Json(tasks))
}

async fn sync_class_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Query(params): Query<SyncParams>,
) -> Result<Json<SyncResult>, AppError> {
    let result = services::sync::sync_class_tasks(&state, &user, &id, &params.range).await?;
    Ok(Json(result))
}
