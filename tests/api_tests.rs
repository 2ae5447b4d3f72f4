mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use osis_panel::{create_router, permissions::modules};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{MockRepoControl, TEST_USER_ID, create_test_state, principal_with_full_access};

fn router_with(repo: Arc<MockRepoControl>) -> axum::Router {
    create_router(create_test_state(repo))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_is_public() {
    let router = router_with(Arc::new(MockRepoControl::default()));

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let router = router_with(Arc::new(MockRepoControl::default()));

    let response = router
        .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Unauthenticated.");
}

#[tokio::test]
async fn unknown_bearer_token_is_401() {
    let repo = Arc::new(MockRepoControl {
        token_user: None,
        ..MockRepoControl::default()
    });
    let router = router_with(repo);

    let response = router
        .oneshot(
            Request::get("/me")
                .header(header::AUTHORIZATION, "Bearer deadbeef")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_bearer_token_resolves_principal() {
    let repo = Arc::new(MockRepoControl {
        token_user: Some(TEST_USER_ID),
        principal_to_return: Some(principal_with_full_access(&[modules::DASHBOARD])),
        ..MockRepoControl::default()
    });
    let router = router_with(repo);

    let response = router
        .oneshot(
            Request::get("/me")
                .header(header::AUTHORIZATION, "Bearer sometoken")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["user"]["username"], "testuser");
}

#[tokio::test]
async fn local_env_x_user_id_header_bypasses_token() {
    // AppConfig::default() is Env::Local, where the dev header is honored.
    let repo = Arc::new(MockRepoControl {
        principal_to_return: Some(principal_with_full_access(&[modules::DASHBOARD])),
        ..MockRepoControl::default()
    });
    let router = router_with(repo);

    let response = router
        .oneshot(
            Request::get("/dashboard")
                .header("x-user-id", TEST_USER_ID.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn contact_form_post_is_public() {
    let router = router_with(Arc::new(MockRepoControl::default()));

    let payload = json!({
        "name": "Orangtua Murid",
        "email": "parent@example.com",
        "content": "Kapan pentas seni?"
    });
    let response = router
        .oneshot(
            Request::post("/messages")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn division_list_is_public_but_mutation_is_not() {
    let repo = Arc::new(MockRepoControl::default());

    let response = router_with(repo.clone())
        .oneshot(Request::get("/divisions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router_with(repo)
        .oneshot(
            Request::post("/divisions")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "name": "Divisi Baru" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn permission_denied_is_403_with_module_message() {
    // Principal carries a matrix with no Settings row at all.
    let repo = Arc::new(MockRepoControl {
        principal_to_return: Some(principal_with_full_access(&[modules::DASHBOARD])),
        token_user: Some(TEST_USER_ID),
        ..MockRepoControl::default()
    });
    let router = router_with(repo);

    let response = router
        .oneshot(
            Request::get("/audit-logs")
                .header(header::AUTHORIZATION, "Bearer sometoken")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "You do not have permission to access Settings."
    );
}

#[tokio::test]
async fn public_gallery_feed_is_reachable() {
    let router = router_with(Arc::new(MockRepoControl::default()));

    let response = router
        .oneshot(Request::get("/proker-media").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
