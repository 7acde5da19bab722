mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use broker_service::models::UserProfile;
use tower::util::ServiceExt;

use common::{accepting_app, body_json};

fn session_profile() -> UserProfile {
    UserProfile {
        email: "cookie-user@x.com".to_string(),
        name: "Cookie User".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        organization: String::new(),
        role: "user".to_string(),
        session_index: Some("_idx".to_string()),
    }
}

#[tokio::test]
async fn session_cookie_authenticates_without_a_token() {
    let (app, state, _fetcher) = accepting_app();
    let session_id = state.sessions.create_session(session_profile());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, format!("broker_session={}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "cookie-user@x.com");
    assert!(body.get("session_index").is_none());
}

#[tokio::test]
async fn bad_bearer_token_does_not_fall_back_to_the_session() {
    let (app, state, _fetcher) = accepting_app();
    let session_id = state.sessions.create_session(session_profile());

    // The cookie alone would authenticate, but the bearer token is
    // authoritative and its failure is final.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, "Bearer not-a-real-token")
                .header(header::COOKIE, format!("broker_session={}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn no_evidence_is_rejected() {
    let (app, _state, _fetcher) = accepting_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Not authenticated");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let (app, state, _fetcher) = accepting_app();
    let session_id = state.sessions.create_session(session_profile());
    let cookie = format!("broker_session={}", session_id);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The old session id no longer authenticates.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn federated_logout_returns_an_idp_redirect() {
    use broker_service::services::{MockAssertionService, OrganizationFetcher};
    use common::{jane_outcome, sample_orgs, test_state, CountingFetcher};
    use std::sync::Arc;

    let fetcher: Arc<dyn OrganizationFetcher> =
        Arc::new(CountingFetcher::returning(sample_orgs()));
    let mut mock = MockAssertionService::accepting(jane_outcome());
    mock.slo_url = Some("https://idp.example.com/slo".to_string());
    let state = test_state(Arc::new(mock), fetcher);
    let app = broker_service::build_router(state.clone()).expect("router");

    let session_id = state.sessions.create_session(session_profile());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::COOKIE, format!("broker_session={}", session_id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"saml_logout":true}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["redirect_url"]
        .as_str()
        .expect("redirect url")
        .starts_with("https://idp.example.com/slo"));
}

#[tokio::test]
async fn bearer_token_works_without_any_cookie() {
    let (app, state, _fetcher) = accepting_app();
    let token = state.jwt.issue(&session_profile()).expect("issue");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "cookie-user@x.com");
}
