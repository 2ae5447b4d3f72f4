mod common;

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use osis_panel::{
    handlers,
    models::{
        AddMediaRequest, AnggotaInput, ChangePasswordRequest, CreateMessageRequest,
        CreateProkerRequest, CreateTransactionRequest, CreateUserRequest, LoginRequest, Proker,
        UpdateMessageStatusRequest, UpdateProkerRequest, User, UserWithRole,
    },
    permissions::modules,
};
use serde_json::Value;
use tokio::test;
use uuid::Uuid;

use common::{
    MockRepoControl, TEST_PROKER_ID, auth_user, create_test_state, principal_with_full_access,
    principal_with_view_only,
};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Renders an ApiError and returns its 422 JSON body for field assertions.
async fn error_fields(err: osis_panel::ApiError) -> Value {
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    body_json(response).await
}

fn active_user(password: &str) -> User {
    User {
        id: common::TEST_USER_ID,
        name: "Siti".to_string(),
        username: "siti".to_string(),
        email: "siti@example.com".to_string(),
        password_hash: osis_panel::auth::hash_password(password).unwrap(),
        status: "active".to_string(),
        ..User::default()
    }
}

// --- LOGIN ---

#[test]
async fn login_unknown_identifier_reports_username_field() {
    let repo = Arc::new(MockRepoControl {
        user_by_identifier: None,
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo);

    let result = handlers::auth::login(
        State(state),
        Json(LoginRequest {
            username: "nobody".to_string(),
            password: "whatever1".to_string(),
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(
        errors["errors"]["username"][0],
        "Username or email not found."
    );
    assert!(errors["errors"].get("password").is_none());
}

#[test]
async fn login_wrong_password_reports_password_field() {
    let repo = Arc::new(MockRepoControl {
        user_by_identifier: Some(active_user("correct-horse")),
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo);

    let result = handlers::auth::login(
        State(state),
        Json(LoginRequest {
            username: "siti".to_string(),
            password: "wrong-horse".to_string(),
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(errors["errors"]["password"][0], "The password is incorrect.");
}

#[test]
async fn login_inactive_account_rejected_after_password_check() {
    let mut user = active_user("correct-horse");
    user.status = "inactive".to_string();
    let repo = Arc::new(MockRepoControl {
        user_by_identifier: Some(user),
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo);

    let result = handlers::auth::login(
        State(state),
        Json(LoginRequest {
            username: "siti".to_string(),
            password: "correct-horse".to_string(),
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(errors["errors"]["username"][0], "Your account is inactive.");
}

#[test]
async fn login_success_returns_token_and_principal() {
    let principal = principal_with_full_access(&[modules::DASHBOARD]);
    let repo = Arc::new(MockRepoControl {
        user_by_identifier: Some(active_user("correct-horse")),
        principal_to_return: Some(principal),
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo.clone());

    let result = handlers::auth::login(
        State(state),
        Json(LoginRequest {
            username: "siti@example.com".to_string(),
            password: "correct-horse".to_string(),
        }),
    )
    .await;

    let Json(response) = result.unwrap();
    assert_eq!(response.token.len(), 64);
    assert_eq!(response.user.user.username, "testuser");
    assert!(repo.audited().contains(&"login".to_string()));
}

// --- PERMISSION GATING ---

#[test]
async fn dashboard_denied_without_view_grant() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));
    let auth = auth_user(principal_with_view_only(&[modules::MESSAGES]));

    let result = handlers::dashboard::dashboard(auth, State(state)).await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[test]
async fn view_only_grant_cannot_create_transactions() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));
    let auth = auth_user(principal_with_view_only(&[modules::TRANSACTIONS]));

    let result = handlers::transactions::create_transaction(
        auth,
        State(state),
        Json(CreateTransactionRequest {
            transaction_type: "income".to_string(),
            amount: 50_000.0,
            description: "Sponsorship".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        }),
    )
    .await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[test]
async fn transaction_create_records_creator_and_audits() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());
    let auth = auth_user(principal_with_full_access(&[modules::TRANSACTIONS]));

    let result = handlers::transactions::create_transaction(
        auth,
        State(state),
        Json(CreateTransactionRequest {
            transaction_type: "expense".to_string(),
            amount: 12_500.0,
            description: "Banner printing".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
        }),
    )
    .await;

    let (status, Json(body)) = result.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["transaction"]["type"], "expense");
    assert_eq!(
        body["transaction"]["created_by"],
        common::TEST_USER_ID.to_string()
    );
    assert!(repo.audited().contains(&"create_transaction".to_string()));
}

#[test]
async fn transaction_rejects_non_positive_amount() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));
    let auth = auth_user(principal_with_full_access(&[modules::TRANSACTIONS]));

    let result = handlers::transactions::create_transaction(
        auth,
        State(state),
        Json(CreateTransactionRequest {
            transaction_type: "income".to_string(),
            amount: 0.0,
            description: "Nothing".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(errors["errors"]["amount"][0], "The amount must be greater than 0.");
}

// --- USERS ---

#[test]
async fn create_user_duplicate_username_is_422() {
    let repo = Arc::new(MockRepoControl {
        username_taken_result: true,
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo);
    let auth = auth_user(principal_with_full_access(&[modules::USERS]));

    let result = handlers::users::create_user(
        auth,
        State(state),
        Json(CreateUserRequest {
            name: "Budi".to_string(),
            username: "budi".to_string(),
            email: "budi@example.com".to_string(),
            password: "password123".to_string(),
            role_id: Some(Uuid::from_u128(1)),
            ..CreateUserRequest::default()
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(
        errors["errors"]["username"][0],
        "The username has already been taken."
    );
}

#[test]
async fn create_user_short_password_is_422() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));
    let auth = auth_user(principal_with_full_access(&[modules::USERS]));

    let result = handlers::users::create_user(
        auth,
        State(state),
        Json(CreateUserRequest {
            name: "Budi".to_string(),
            username: "budi".to_string(),
            email: "budi@example.com".to_string(),
            password: "short".to_string(),
            role_id: Some(Uuid::from_u128(1)),
            ..CreateUserRequest::default()
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(
        errors["errors"]["password"][0],
        "The password must be at least 8 characters."
    );
}

// --- PASSWORD CHANGE ---

#[test]
async fn change_password_rejects_wrong_current_password() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());
    let auth = auth_user(UserWithRole {
        user: active_user("old-secret-123"),
        role: None,
        position: None,
        permissions: vec![],
    });

    let result = handlers::auth::change_password(
        auth,
        State(state),
        Json(ChangePasswordRequest {
            current_password: "not-the-secret".to_string(),
            new_password: "new-secret-456".to_string(),
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(
        errors["errors"]["current_password"][0],
        "The current password is incorrect."
    );
    assert!(repo.audited().is_empty());
}

// --- PROKERS ---

#[test]
async fn proker_creation_requires_a_division() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());
    let auth = auth_user(principal_with_full_access(&[modules::PROKERS]));

    let result = handlers::prokers::create_proker(
        auth,
        State(state),
        Json(CreateProkerRequest {
            title: "Pentas Seni".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
            division_ids: vec![],
            ..CreateProkerRequest::default()
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(
        errors["errors"]["division_ids"][0],
        "The division_ids field is required."
    );
    assert!(repo.audited().is_empty());
}

#[test]
async fn proker_update_with_empty_division_list_clears_the_set() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());
    let auth = auth_user(principal_with_full_access(&[modules::PROKERS]));

    let result = handlers::prokers::update_proker(
        auth,
        State(state),
        Path(TEST_PROKER_ID),
        Json(UpdateProkerRequest {
            division_ids: Some(vec![]),
            ..UpdateProkerRequest::default()
        }),
    )
    .await;

    assert!(result.is_ok());
    let replaced = repo.replaced_divisions.lock().unwrap();
    assert_eq!(replaced.len(), 1);
    assert!(replaced[0].is_empty());
}

// --- MEMBERSHIPS ---

#[test]
async fn same_user_can_hold_two_membership_rows() {
    let repo = Arc::new(MockRepoControl::default());
    let auth = auth_user(principal_with_full_access(&[modules::PROKERS]));
    let member = Uuid::from_u128(55);

    for role in ["Ketua Pelaksana", "Dokumentasi"] {
        let result = handlers::prokers::add_anggota(
            auth.clone(),
            State(create_test_state(repo.clone())),
            Path(TEST_PROKER_ID),
            Json(AnggotaInput {
                user_id: member,
                role: Some(role.to_string()),
                division_id: None,
                position_id: None,
            }),
        )
        .await;
        assert!(result.is_ok());
    }

    let added = repo.added_anggota.lock().unwrap();
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|input| input.user_id == member));
}

#[test]
async fn remove_anggota_from_wrong_proker_is_404() {
    let repo = Arc::new(MockRepoControl {
        remove_anggota_result: false,
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo.clone());
    let auth = auth_user(principal_with_full_access(&[modules::PROKERS]));

    let result = handlers::prokers::remove_anggota(
        auth,
        State(state),
        Path((TEST_PROKER_ID, Uuid::from_u128(99))),
    )
    .await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    // A failed removal must leave no audit entry.
    assert!(repo.audited().is_empty());
}

#[test]
async fn remove_media_ownership_mismatch_is_404() {
    let repo = Arc::new(MockRepoControl {
        remove_media_result: false,
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo);
    let auth = auth_user(principal_with_full_access(&[modules::PROKERS]));

    let result = handlers::prokers::remove_media(
        auth,
        State(state),
        Path((TEST_PROKER_ID, Uuid::from_u128(42))),
    )
    .await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
async fn add_media_validates_type() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));
    let auth = auth_user(principal_with_full_access(&[modules::PROKERS]));

    let result = handlers::prokers::add_media(
        auth,
        State(state),
        Path(TEST_PROKER_ID),
        Json(AddMediaRequest {
            media_type: "gif".to_string(),
            media_url: "https://example.com/a.gif".to_string(),
            caption: None,
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(
        errors["errors"]["media_type"][0],
        "The selected media_type is invalid."
    );
}

#[test]
async fn delete_nonexistent_proker_is_404() {
    let repo = Arc::new(MockRepoControl {
        proker_to_return: None::<Proker>,
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo);
    let auth = auth_user(principal_with_full_access(&[modules::PROKERS]));

    let result = handlers::prokers::delete_proker(auth, State(state), Path(TEST_PROKER_ID)).await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --- MESSAGES ---

#[test]
async fn public_message_requires_valid_email() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));

    let result = handlers::messages::create_message(
        State(state),
        Json(CreateMessageRequest {
            name: "Anon".to_string(),
            email: "not-an-email".to_string(),
            subject: None,
            content: "Hello".to_string(),
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(
        errors["errors"]["email"][0],
        "The email must be a valid email address."
    );
}

#[test]
async fn public_message_submission_needs_no_auth() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));

    let result = handlers::messages::create_message(
        State(state),
        Json(CreateMessageRequest {
            name: "Orangtua Murid".to_string(),
            email: "parent@example.com".to_string(),
            subject: Some("Pertanyaan".to_string()),
            content: "Kapan pentas seni?".to_string(),
        }),
    )
    .await;

    let (status, Json(body)) = result.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "unread");
}

#[test]
async fn message_status_must_be_known() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));
    let auth = auth_user(principal_with_full_access(&[modules::MESSAGES]));

    let result = handlers::messages::update_message_status(
        auth,
        State(state),
        Path(Uuid::from_u128(7)),
        Json(UpdateMessageStatusRequest {
            status: "burned".to_string(),
        }),
    )
    .await;

    let errors = error_fields(result.unwrap_err()).await;
    assert_eq!(errors["errors"]["status"][0], "The selected status is invalid.");
}

// --- PAGINATION ---

#[test]
async fn user_listing_applies_pagination_defaults() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));
    let auth = auth_user(principal_with_view_only(&[modules::USERS]));

    let Json(page) = handlers::users::list_users(
        auth,
        State(state),
        Query(handlers::users::UserFilter {
            role_id: None,
            division_id: None,
            status: None,
            search: None,
            page: None,
            per_page: None,
        }),
    )
    .await
    .unwrap();

    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 15);
}

#[test]
async fn per_page_is_capped() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));
    let auth = auth_user(principal_with_view_only(&[modules::USERS]));

    let Json(page) = handlers::users::list_users(
        auth,
        State(state),
        Query(handlers::users::UserFilter {
            role_id: None,
            division_id: None,
            status: None,
            search: None,
            page: Some(0),
            per_page: Some(9999),
        }),
    )
    .await
    .unwrap();

    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 100);
}

#[test]
async fn huge_page_number_is_clamped() {
    let state = create_test_state(Arc::new(MockRepoControl::default()));
    let auth = auth_user(principal_with_view_only(&[modules::USERS]));

    // An i64::MAX page must not push the OFFSET computation out of range.
    let Json(page) = handlers::users::list_users(
        auth,
        State(state),
        Query(handlers::users::UserFilter {
            role_id: None,
            division_id: None,
            status: None,
            search: None,
            page: Some(i64::MAX),
            per_page: Some(15),
        }),
    )
    .await
    .unwrap();

    assert_eq!(page.page, 1_000_000);
}
