use std::sync::Arc;

use classplan::audit::NoopAuditSink;
use classplan::db;
use classplan::error::AppError;
use classplan::identity::NoopIdentity;
use classplan::models::{
    ClassRole, JoinStatus, NewClassRequest, NewUserRequest, PageParams, User,
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

fn class_request(name: &str) -> NewClassRequest {
    NewClassRequest {
        name: name.to_string(),
        description: Some("test class".to_string()),
        is_public: true,
        join_approval_required: true,
    }
}

#[tokio::test]
async fn test_create_class_seeds_an_approved_owner() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;

    let class = services::classes::create_class(&state, &alice, class_request("Algorithms"))
        .await
        .expect("Failed to create class");

    let membership = db::memberships::find_membership(&state.db, &alice.id, &class.id)
        .await
        .unwrap()
        .expect("Owner membership missing");
    assert_eq!(membership.role, ClassRole::Owner);
    assert_eq!(membership.status, JoinStatus::Approved);
    assert!(membership.joined_at.is_some());

    let role = services::classes::user_role(&state, &alice, &class.id)
        .await
        .expect("Failed to read role");
    assert!(role.is_owner);
    assert!(role.can_manage_members);
    assert!(role.can_publish_tasks);
    assert!(role.can_manage_class);
}

#[tokio::test]
async fn test_invite_codes_are_eight_chars_and_distinct() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;

    let first = services::classes::create_class(&state, &alice, class_request("Databases"))
        .await
        .expect("Failed to create first class");
    let second = services::classes::create_class(&state, &alice, class_request("Networks"))
        .await
        .expect("Failed to create second class");

    for code in [&first.invite_code, &second.invite_code] {
        assert_eq!(code.len(), 8, "code {} has the wrong length", code);
        assert!(
            code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()),
            "code {} leaves the alphabet",
            code
        );
    }
    assert_ne!(first.invite_code, second.invite_code);

    let found = services::classes::find_by_invite_code(&state, &first.invite_code)
        .await
        .expect("Lookup by invite code failed");
    assert_eq!(found.id, first.id);
}

#[tokio::test]
async fn test_application_stays_pending_until_processed() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;
    let class = services::classes::create_class(&state, &alice, class_request("Compilers"))
        .await
        .unwrap();

    services::membership::apply_to_join(&state, &bob, &class.id, Some("let me in"))
        .await
        .expect("Application failed");

    let membership = db::memberships::find_membership(&state.db, &bob.id, &class.id)
        .await
        .unwrap()
        .expect("Application row missing");
    assert_eq!(membership.status, JoinStatus::Pending);
    assert_eq!(membership.role, ClassRole::Member);
    assert_eq!(membership.join_reason.as_deref(), Some("let me in"));
    assert!(membership.joined_at.is_none());

    let role = services::classes::user_role(&state, &bob, &class.id).await.unwrap();
    assert!(!role.is_member, "pending applicant must not count as member");

    let second = services::membership::apply_to_join(&state, &bob, &class.id, None).await;
    assert!(matches!(second, Err(AppError::DuplicatePending)));
}

#[tokio::test]
async fn test_approval_promotes_the_applicant() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;
    let class = services::classes::create_class(&state, &alice, class_request("Graphics"))
        .await
        .unwrap();
    services::membership::apply_to_join(&state, &bob, &class.id, None)
        .await
        .unwrap();

    let status =
        services::approvals::process_approval(&state, &alice, &class.id, &bob.id, "APPROVE")
            .await
            .expect("Approval failed");
    assert_eq!(status, JoinStatus::Approved);

    let membership = db::memberships::find_membership(&state.db, &bob.id, &class.id)
        .await
        .unwrap()
        .expect("Membership row missing");
    assert_eq!(membership.status, JoinStatus::Approved);
    assert_eq!(membership.approved_by.as_deref(), Some(alice.id.as_str()));
    assert!(membership.joined_at.is_some());

    // The application is consumed; processing it again finds nothing.
    let again =
        services::approvals::process_approval(&state, &alice, &class.id, &bob.id, "APPROVE").await;
    assert!(matches!(again, Err(AppError::NoPendingApplication)));

    // And an approved member cannot file a fresh application.
    let reapply = services::membership::apply_to_join(&state, &bob, &class.id, None).await;
    assert!(matches!(reapply, Err(AppError::AlreadyMember)));
}

#[tokio::test]
async fn test_rejected_applicant_may_reapply() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;
    let class = services::classes::create_class(&state, &alice, class_request("Operating Systems"))
        .await
        .unwrap();
    services::membership::apply_to_join(&state, &bob, &class.id, Some("first try"))
        .await
        .unwrap();

    let status =
        services::approvals::process_approval(&state, &alice, &class.id, &bob.id, "REJECT")
            .await
            .unwrap();
    assert_eq!(status, JoinStatus::Rejected);

    services::membership::apply_to_join(&state, &bob, &class.id, Some("second try"))
        .await
        .expect("Reapplication failed");

    let membership = db::memberships::find_membership(&state.db, &bob.id, &class.id)
        .await
        .unwrap()
        .expect("Reapplication row missing");
    assert_eq!(membership.status, JoinStatus::Pending);
    assert_eq!(membership.join_reason.as_deref(), Some("second try"));
    assert!(membership.approved_by.is_none());
    assert!(membership.joined_at.is_none());
}

#[tokio::test]
async fn test_unknown_approval_action_is_refused() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;
    let class = services::classes::create_class(&state, &alice, class_request("Statistics"))
        .await
        .unwrap();
    services::membership::apply_to_join(&state, &bob, &class.id, None)
        .await
        .unwrap();

    let result =
        services::approvals::process_approval(&state, &alice, &class.id, &bob.id, "DEFER").await;
    assert!(matches!(result, Err(AppError::InvalidAction(_))));

    // The application must survive the refused action.
    let membership = db::memberships::find_membership(&state.db, &bob.id, &class.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.status, JoinStatus::Pending);
}

#[tokio::test]
async fn test_plain_members_cannot_work_the_approval_queue() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;
    let carol = provision(&state, "carol").await;
    let class = services::classes::create_class(&state, &alice, class_request("Linear Algebra"))
        .await
        .unwrap();

    services::membership::apply_to_join(&state, &bob, &class.id, None).await.unwrap();
    services::approvals::process_approval(&state, &alice, &class.id, &bob.id, "APPROVE")
        .await
        .unwrap();
    services::membership::apply_to_join(&state, &carol, &class.id, None).await.unwrap();

    let params = PageParams::default();
    let listing =
        services::approvals::list_pending_for_class(&state, &bob, &class.id, &params).await;
    assert!(matches!(listing, Err(AppError::PermissionDenied(_))));

    let decision =
        services::approvals::process_approval(&state, &bob, &class.id, &carol.id, "APPROVE").await;
    assert!(matches!(decision, Err(AppError::PermissionDenied(_))));

    // Promote bob to ADMIN and the same calls go through.
    services::membership::change_role(&state, &alice, &class.id, &bob.id, ClassRole::Admin)
        .await
        .unwrap();
    let listing = services::approvals::list_pending_for_class(&state, &bob, &class.id, &params)
        .await
        .expect("Admin could not list approvals");
    assert_eq!(listing.total, 1);
    assert_eq!(listing.items[0].user_id, carol.id);

    services::approvals::process_approval(&state, &bob, &class.id, &carol.id, "APPROVE")
        .await
        .expect("Admin could not approve");
}

#[tokio::test]
async fn test_role_change_guards() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;
    let class = services::classes::create_class(&state, &alice, class_request("Number Theory"))
        .await
        .unwrap();
    services::membership::apply_to_join(&state, &bob, &class.id, None).await.unwrap();
    services::approvals::process_approval(&state, &alice, &class.id, &bob.id, "APPROVE")
        .await
        .unwrap();

    // The owner row is untouchable, whatever the requested role.
    for role in [ClassRole::Admin, ClassRole::Member] {
        let result =
            services::membership::change_role(&state, &alice, &class.id, &alice.id, role).await;
        assert!(matches!(result, Err(AppError::CannotModifyOwner)));
    }

    // Ownership is not grantable through this operation.
    let grant =
        services::membership::change_role(&state, &alice, &class.id, &bob.id, ClassRole::Owner)
            .await;
    assert!(matches!(grant, Err(AppError::BadRequest(_))));

    // Operators cannot retune their own role.
    services::membership::change_role(&state, &alice, &class.id, &bob.id, ClassRole::Admin)
        .await
        .unwrap();
    let own = services::membership::change_role(&state, &bob, &class.id, &bob.id, ClassRole::Member)
        .await;
    assert!(matches!(own, Err(AppError::CannotModifySelf)));

    let role = services::classes::user_role(&state, &bob, &class.id).await.unwrap();
    assert!(role.is_admin);
    assert!(role.can_publish_tasks);
    assert!(!role.can_manage_members);
}

#[tokio::test]
async fn test_cross_class_approval_feed() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;
    let carol = provision(&state, "carol").await;

    let first = services::classes::create_class(&state, &alice, class_request("Physics"))
        .await
        .unwrap();
    let second = services::classes::create_class(&state, &alice, class_request("Chemistry"))
        .await
        .unwrap();

    services::membership::apply_to_join(&state, &bob, &first.id, None).await.unwrap();
    services::membership::apply_to_join(&state, &carol, &second.id, None).await.unwrap();

    let params = PageParams::default();
    let feed = services::approvals::list_pending_across_managed(&state, &alice, &params)
        .await
        .expect("Feed failed");
    assert_eq!(feed.total, 2);

    // bob manages nothing, so his feed is empty even though he applied.
    let empty = services::approvals::list_pending_across_managed(&state, &bob, &params)
        .await
        .unwrap();
    assert_eq!(empty.total, 0);

    services::approvals::process_approval(&state, &alice, &first.id, &bob.id, "APPROVE")
        .await
        .unwrap();
    let feed = services::approvals::list_pending_across_managed(&state, &alice, &params)
        .await
        .unwrap();
    assert_eq!(feed.total, 1);
    assert_eq!(feed.items[0].class_id, second.id);
    assert_eq!(feed.items[0].user_id, carol.id);
}

#[tokio::test]
async fn test_member_list_is_for_members_only() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;
    let class = services::classes::create_class(&state, &alice, class_request("Topology"))
        .await
        .unwrap();

    let params = PageParams::default();
    let outsider = services::classes::member_list(&state, &bob, &class.id, &params).await;
    assert!(matches!(outsider, Err(AppError::NotAMember)));

    let members = services::classes::member_list(&state, &alice, &class.id, &params)
        .await
        .expect("Owner could not list members");
    assert_eq!(members.total, 1);
    assert_eq!(members.items[0].role, ClassRole::Owner);
    assert_eq!(members.items[0].username, "alice");
}

#[tokio::test]
async fn test_invite_code_is_gated_and_archive_is_owner_only() {
    let state = test_state().await;
    let alice = provision(&state, "alice").await;
    let bob = provision(&state, "bob").await;
    let class = services::classes::create_class(&state, &alice, class_request("Astronomy"))
        .await
        .unwrap();
    services::membership::apply_to_join(&state, &bob, &class.id, None).await.unwrap();
    services::approvals::process_approval(&state, &alice, &class.id, &bob.id, "APPROVE")
        .await
        .unwrap();

    let denied = services::classes::invite_code(&state, &bob, &class.id).await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));

    let code = services::classes::invite_code(&state, &alice, &class.id)
        .await
        .expect("Owner could not read the invite code");
    assert_eq!(code.invite_code, class.invite_code);

    let denied = services::classes::archive_class(&state, &bob, &class.id).await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));

    services::classes::archive_class(&state, &alice, &class.id)
        .await
        .expect("Owner could not archive");

    // Archived classes drop out of public search.
    let results = services::classes::search_public(&state, Some("Astronomy"), &PageParams::default())
        .await
        .unwrap();
    assert_eq!(results.total, 0);
}
