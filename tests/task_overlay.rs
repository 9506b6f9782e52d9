use std::sync::Arc;

use classplan::audit::NoopAuditSink;
use classplan::db;
use classplan::error::AppError;
use classplan::identity::NoopIdentity;
use classplan::models::{
    Class, NewClassRequest, NewTaskRequest, NewUserRequest, PageParams, StatusUpdateRequest,
    TaskStatus, UpdateTaskRequest, User,
};
use classplan::notify::NoopNotifier;
use classplan::services;
use classplan::state::AppState;
use sqlx::sqlite::SqlitePoolOptions;

async fn test_state() -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    AppState {
        db: pool,
        identity: Arc::new(NoopIdentity),
        notifier: Arc::new(NoopNotifier),
        audit: Arc::new(NoopAuditSink),
    }
}

async fn provision(state: &AppState, username: &str) -> User {
    db::users::provision_user(
        &state.db,
        NewUserRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            display_name: username.to_string(),
        },
        &format!("token-{}", username),
    )
    .await
    .expect("Failed to provision user")
}

/// Owner, approved member, class.
async fn class_with_member(state: &AppState) -> (User, User, Class) {
    let alice = provision(state, "alice").await;
    let bob = provision(state, "bob").await;
    let class = services::classes::create_class(
        state,
        &alice,
        NewClassRequest {
            name: "Algorithms".to_string(),
            description: None,
            is_public: false,
            join_approval_required: true,
        },
    )
    .await
    .expect("Failed to create class");
    services::membership::apply_to_join(state, &bob, &class.id, None)
        .await
        .unwrap();
    services::approvals::process_approval(state, &alice, &class.id, &bob.id, "APPROVE")
        .await
        .unwrap();
    (alice, bob, class)
}

fn task_request(title: &str, deadline: &str) -> NewTaskRequest {
    NewTaskRequest {
        title: title.to_string(),
        description: None,
        course_name: None,
        deadline: deadline.to_string(),
    }
}

#[tokio::test]
async fn test_personal_task_round_trip() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;

    let task = services::tasks::create_personal_task(
        &state,
        &alice,
        task_request("Read chapter 3", "2026-09-10T09:00:00+09:00"),
    )
    .await
    .expect("Failed to create task");
    // Deadlines are stored as UTC whatever offset the client sent.
    assert_eq!(task.deadline, "2026-09-10T00:00:00+00:00");
    assert!(task.class_id.is_none());

    let view = services::tasks::task_detail(&state, &alice, &task.id)
        .await
        .expect("Failed to read task");
    assert_eq!(view.personal_status, TaskStatus::Todo);
    assert!(view.personal_deadline.is_none());

    let updated = services::tasks::update_task(
        &state,
        &alice,
        &task.id,
        UpdateTaskRequest {
            title: Some("Read chapter 4".to_string()),
            description: None,
            course_name: None,
            deadline: Some("2026-09-12T00:00:00+00:00".to_string()),
        },
    )
    .await
    .expect("Failed to update task");
    assert_eq!(updated.title, "Read chapter 4");
    assert_eq!(updated.deadline, "2026-09-12T00:00:00+00:00");

    services::tasks::delete_task(&state, &alice, &task.id)
        .await
        .expect("Failed to delete task");
    let gone = services::tasks::task_detail(&state, &alice, &task.id).await;
    assert!(matches!(gone, Err(AppError::TaskNotFound)));

    let relisted = services::tasks::list_personal_tasks(&state, &alice, &PageParams::default())
        .await
        .unwrap();
    assert_eq!(relisted.total, 0);
}

#[tokio::test]
async fn test_personal_tasks_are_invisible_to_others() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;

    let task = services::tasks::create_personal_task(
        &state,
        &alice,
        task_request("Private errand", "2026-09-10T00:00:00+00:00"),
    )
    .await
    .unwrap();

    let peek = services::tasks::task_detail(&state, &bob, &task.id).await;
    assert!(matches!(peek, Err(AppError::TaskNotAccessible)));

    let edit = services::tasks::update_task(
        &state,
        &bob,
        &task.id,
        UpdateTaskRequest {
            title: Some("hijacked".to_string()),
            description: None,
            course_name: None,
            deadline: None,
        },
    )
    .await;
    assert!(matches!(edit, Err(AppError::TaskNotAccessible)));

    let touch = services::overlays::record_status(
        &state,
        &bob,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::Done,
            personal_deadline: None,
            personal_notes: None,
        },
    )
    .await;
    assert!(matches!(touch, Err(AppError::TaskNotAccessible)));
}

#[tokio::test]
async fn test_publishing_requires_a_manage_role() {
    let state = test_state().await;
    let (alice, bob, class) = class_with_member(&state).await;

    let denied = services::tasks::create_class_task(
        &state,
        &bob,
        &class.id,
        task_request("Sneaky homework", "2026-09-15T00:00:00+00:00"),
    )
    .await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));

    services::tasks::create_class_task(
        &state,
        &alice,
        &class.id,
        task_request("Homework 1", "2026-09-15T00:00:00+00:00"),
    )
    .await
    .expect("Owner could not publish");

    // Once promoted, the same member can publish.
    services::membership::change_role(
        &state,
        &alice,
        &class.id,
        &bob.id,
        classplan::models::ClassRole::Admin,
    )
    .await
    .unwrap();
    services::tasks::create_class_task(
        &state,
        &bob,
        &class.id,
        task_request("Homework 2", "2026-09-20T00:00:00+00:00"),
    )
    .await
    .expect("Admin could not publish");

    let listing = services::tasks::list_class_tasks(&state, &bob, &class.id, &PageParams::default())
        .await
        .unwrap();
    assert_eq!(listing.total, 2);
    // Soonest deadline first.
    assert_eq!(listing.items[0].title, "Homework 1");

    let carol = provision(&state, "carol").await;
    let outsider =
        services::tasks::list_class_tasks(&state, &carol, &class.id, &PageParams::default()).await;
    assert!(matches!(outsider, Err(AppError::NotAMember)));
}

#[tokio::test]
async fn test_done_stamps_completion_and_undone_clears_it() {
    let state = test_state().await;
    let (alice, bob, class) = class_with_member(&state).await;
    let task = services::tasks::create_class_task(
        &state,
        &alice,
        &class.id,
        task_request("Lab report", "2026-09-15T00:00:00+00:00"),
    )
    .await
    .unwrap();

    let view = services::overlays::record_status(
        &state,
        &bob,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::Done,
            personal_deadline: None,
            personal_notes: None,
        },
    )
    .await
    .expect("Status update failed");
    assert_eq!(view.personal_status, TaskStatus::Done);
    assert!(view.completed_at.is_some());
    // First touch seeds the personal deadline from the shared one.
    assert_eq!(view.personal_deadline.as_deref(), Some(task.deadline.as_str()));

    let view = services::overlays::record_status(
        &state,
        &bob,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::InProgress,
            personal_deadline: None,
            personal_notes: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(view.personal_status, TaskStatus::InProgress);
    assert!(view.completed_at.is_none(), "completion must not survive un-done");
}

#[tokio::test]
async fn test_custom_deadline_survives_plain_status_updates() {
    let state = test_state().await;
    let (alice, bob, class) = class_with_member(&state).await;
    let task = services::tasks::create_class_task(
        &state,
        &alice,
        &class.id,
        task_request("Essay", "2026-09-15T00:00:00+00:00"),
    )
    .await
    .unwrap();

    let view = services::overlays::record_status(
        &state,
        &bob,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::InProgress,
            personal_deadline: Some("2026-09-12T18:00:00+00:00".to_string()),
            personal_notes: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(view.personal_deadline.as_deref(), Some("2026-09-12T18:00:00+00:00"));

    let view = services::overlays::record_status(
        &state,
        &bob,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::Done,
            personal_deadline: None,
            personal_notes: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(
        view.personal_deadline.as_deref(),
        Some("2026-09-12T18:00:00+00:00"),
        "a plain status update must not reset the custom deadline"
    );
}

#[tokio::test]
async fn test_notes_replace_wholesale() {
    let state = test_state().await;
    let (alice, bob, class) = class_with_member(&state).await;
    let task = services::tasks::create_class_task(
        &state,
        &alice,
        &class.id,
        task_request("Presentation", "2026-09-15T00:00:00+00:00"),
    )
    .await
    .unwrap();

    let view = services::overlays::record_status(
        &state,
        &bob,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::InProgress,
            personal_deadline: None,
            personal_notes: Some("slides half done".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(view.personal_notes.as_deref(), Some("slides half done"));

    let view = services::overlays::record_status(
        &state,
        &bob,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::InProgress,
            personal_deadline: None,
            personal_notes: None,
        },
    )
    .await
    .unwrap();
    assert!(view.personal_notes.is_none(), "absent notes clear the field");
}

#[tokio::test]
async fn test_overlays_are_isolated_between_members() {
    let state = test_state().await;
    let (alice, bob, class) = class_with_member(&state).await;
    let task = services::tasks::create_class_task(
        &state,
        &alice,
        &class.id,
        task_request("Quiz prep", "2026-09-15T00:00:00+00:00"),
    )
    .await
    .unwrap();

    services::overlays::record_status(
        &state,
        &bob,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::Done,
            personal_deadline: None,
            personal_notes: None,
        },
    )
    .await
    .unwrap();

    let bobs = services::tasks::task_detail(&state, &bob, &task.id).await.unwrap();
    assert_eq!(bobs.personal_status, TaskStatus::Done);

    // The owner never touched the task; the shared view stays pristine.
    let alices = services::tasks::task_detail(&state, &alice, &task.id).await.unwrap();
    assert_eq!(alices.personal_status, TaskStatus::Todo);
    assert!(alices.completed_at.is_none());
}

#[tokio::test]
async fn test_class_task_edit_rights() {
    let state = test_state().await;
    let (alice, bob, class) = class_with_member(&state).await;
    services::membership::change_role(
        &state,
        &alice,
        &class.id,
        &bob.id,
        classplan::models::ClassRole::Admin,
    )
    .await
    .unwrap();

    let carol = provision(&state, "carol").await;
    services::membership::apply_to_join(&state, &carol, &class.id, None).await.unwrap();
    services::approvals::process_approval(&state, &alice, &class.id, &carol.id, "APPROVE")
        .await
        .unwrap();

    let task = services::tasks::create_class_task(
        &state,
        &bob,
        &class.id,
        task_request("Group project", "2026-09-30T00:00:00+00:00"),
    )
    .await
    .unwrap();

    // Plain members read but do not write shared fields.
    let denied = services::tasks::update_task(
        &state,
        &carol,
        &task.id,
        UpdateTaskRequest {
            title: Some("renamed".to_string()),
            description: None,
            course_name: None,
            deadline: None,
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::TaskNotAccessible)));

    // The owner did not create it but manages the class.
    services::tasks::update_task(
        &state,
        &alice,
        &task.id,
        UpdateTaskRequest {
            title: None,
            description: Some("updated brief".to_string()),
            course_name: None,
            deadline: None,
        },
    )
    .await
    .expect("Owner could not edit a class task");

    services::tasks::delete_task(&state, &alice, &task.id)
        .await
        .expect("Owner could not delete a class task");
    let listing =
        services::tasks::list_class_tasks(&state, &carol, &class.id, &PageParams::default())
            .await
            .unwrap();
    assert_eq!(listing.total, 0);
}

#[tokio::test]
async fn test_calendar_places_tasks_at_their_effective_deadline() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;

    let task = services::tasks::create_personal_task(
        &state,
        &alice,
        task_request("Tax filing", "2026-09-10T00:00:00+00:00"),
    )
    .await
    .unwrap();

    // No overlay yet, so the calendar has nothing to place.
    let blank = services::tasks::calendar(&state, &alice, 2026, 9).await.unwrap();
    assert!(blank.is_empty());

    services::overlays::record_status(
        &state,
        &alice,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::Todo,
            personal_deadline: None,
            personal_notes: None,
        },
    )
    .await
    .unwrap();
    let september = services::tasks::calendar(&state, &alice, 2026, 9).await.unwrap();
    assert_eq!(september.len(), 1);
    assert_eq!(september[0].id, task.id);

    // Pushing the personal deadline moves the task to the next month.
    services::overlays::record_status(
        &state,
        &alice,
        &task.id,
        StatusUpdateRequest {
            status: TaskStatus::Todo,
            personal_deadline: Some("2026-10-05T00:00:00+00:00".to_string()),
            personal_notes: None,
        },
    )
    .await
    .unwrap();
    let september = services::tasks::calendar(&state, &alice, 2026, 9).await.unwrap();
    assert!(september.is_empty());
    let october = services::tasks::calendar(&state, &alice, 2026, 10).await.unwrap();
    assert_eq!(october.len(), 1);
}
