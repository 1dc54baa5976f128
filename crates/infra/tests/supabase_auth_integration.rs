//! Integration tests for the auth API client
//!
//! **Coverage:**
//! - Password sign-in, sign-up (with and without a session), sign-out
//! - Change notifications and their order
//! - Expired-session refresh and the signed-out fallbacks
//! - Backend error messages surfaced as domain errors
//!
//! **Infrastructure:**
//! - WireMock HTTP server standing in for the hosted auth API

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use rentkenya_common::assert_eventually_async;
use rentkenya_core::AuthBackend;
use rentkenya_domain::{AuthUser, BackendConfig, RentalError, Session, SessionEvent, UserId};
use rentkenya_infra::{AccessTokenProvider, BackendEndpoint, GoTrueAuthClient, HttpClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON_KEY: &str = "anon-key";

fn client_for(server: &MockServer) -> GoTrueAuthClient {
    let http = HttpClient::builder().max_attempts(1).build().expect("http client");
    let endpoint = BackendEndpoint::new(&server.uri(), ANON_KEY).expect("endpoint");
    GoTrueAuthClient::new(http, endpoint)
}

fn token_body(user: &str, access: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": format!("refresh-{user}"),
        "user": { "id": user, "email": format!("{user}@example.com") }
    })
}

fn session_expiring_in(user: &str, secs: i64, refresh: Option<&str>) -> Session {
    Session {
        access_token: format!("stale-{user}"),
        refresh_token: refresh.map(str::to_string),
        token_type: "bearer".into(),
        expires_at: Utc::now() + ChronoDuration::seconds(secs),
        user: AuthUser { id: UserId::new(user), email: None },
    }
}

#[tokio::test]
async fn subscriber_receives_initial_session_first() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let mut subscription = client.subscribe();
    let change = subscription.recv().await.expect("initial change");

    assert_eq!(change.event, SessionEvent::InitialSession);
    assert!(change.session.is_none());
}

#[tokio::test]
async fn password_sign_in_caches_session_and_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", ANON_KEY))
        .and(body_json(json!({ "email": "amina@example.com", "password": "hunter22" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("amina", "access-1")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut subscription = client.subscribe();
    subscription.recv().await.expect("initial change");

    client.sign_in_with_password("amina@example.com", "hunter22").await.expect("sign in");

    let change = subscription.recv().await.expect("signed in change");
    assert_eq!(change.event, SessionEvent::SignedIn);
    assert_eq!(change.session.as_ref().map(|s| s.user_id().as_str()), Some("amina"));

    let session = client.current_session().await.expect("session").expect("present");
    assert_eq!(session.access_token, "access-1");
    assert_eq!(client.access_token().await.expect("token"), "access-1");
}

#[tokio::test]
async fn bad_credentials_surface_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.sign_in_with_password("a@b.co", "nope").await.unwrap_err();

    assert_eq!(err, RentalError::Auth("Invalid login credentials".into()));
    assert!(client.cached_session().is_none());
}

#[tokio::test]
async fn sign_up_with_session_signs_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("baraka", "access-2")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut subscription = client.subscribe();
    subscription.recv().await.expect("initial change");

    let user = client.sign_up("baraka@example.com", "secret-pw").await.expect("sign up");

    assert_eq!(user.id, UserId::new("baraka"));
    let change = subscription.recv().await.expect("signed in change");
    assert_eq!(change.event, SessionEvent::SignedIn);
    assert!(client.cached_session().is_some());
}

#[tokio::test]
async fn sign_up_pending_confirmation_returns_user_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chebet",
            "email": "chebet@example.com",
            "confirmation_sent_at": "2024-05-01T10:00:00Z"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = client.sign_up("chebet@example.com", "secret-pw").await.expect("sign up");

    assert_eq!(user.id, UserId::new("chebet"));
    assert!(client.cached_session().is_none());
}

#[tokio::test]
async fn duplicate_sign_up_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "code": 422, "msg": "User already registered" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.sign_up("dan@example.com", "secret-pw").await.unwrap_err();

    assert_eq!(err, RentalError::Auth("User already registered".into()));
}

#[tokio::test]
async fn configured_client_sends_sign_up_once_during_outage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = BackendConfig::new(server.uri(), ANON_KEY);
    let client = GoTrueAuthClient::new(
        HttpClient::from_config(&config).expect("http client"),
        BackendEndpoint::from_config(&config).expect("endpoint"),
    );

    let err = client.sign_up("fatuma@example.com", "secret-pw").await.unwrap_err();

    assert!(matches!(err, RentalError::Backend(_)), "got {err:?}");
    assert!(client.cached_session().is_none());
}

#[tokio::test]
async fn sign_up_without_user_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.sign_up("eve@example.com", "secret-pw").await.unwrap_err();

    assert_eq!(err, RentalError::Auth("no user returned from sign up".into()));
}

#[tokio::test]
async fn sign_out_revokes_and_clears() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer stale-faith"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        client_for(&server).with_session(session_expiring_in("faith", 3600, Some("refresh")));
    let mut subscription = client.subscribe();
    let initial = subscription.recv().await.expect("initial change");
    assert!(initial.session.is_some());

    client.sign_out().await.expect("sign out");

    let change = subscription.recv().await.expect("signed out change");
    assert_eq!(change.event, SessionEvent::SignedOut);
    assert!(client.current_session().await.expect("session").is_none());
}

#[tokio::test]
async fn sign_out_clears_locally_when_remote_logout_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client =
        client_for(&server).with_session(session_expiring_in("gabriel", 3600, Some("refresh")));

    client.sign_out().await.expect("sign out still succeeds");
    assert!(client.cached_session().is_none());
}

#[tokio::test]
async fn expired_session_is_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "refresh-old" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("halima", "access-new")))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        client_for(&server).with_session(session_expiring_in("halima", -5, Some("refresh-old")));
    let mut subscription = client.subscribe();
    subscription.recv().await.expect("initial change");

    let session = client.current_session().await.expect("refresh").expect("session");
    assert_eq!(session.access_token, "access-new");

    let change = subscription.recv().await.expect("refreshed change");
    assert_eq!(change.event, SessionEvent::TokenRefreshed);
}

#[tokio::test]
async fn expired_session_without_refresh_token_signs_out() {
    let server = MockServer::start().await;
    let client = client_for(&server).with_session(session_expiring_in("ivan", -5, None));
    let mut subscription = client.subscribe();
    subscription.recv().await.expect("initial change");

    assert!(client.current_session().await.expect("no error").is_none());
    let change = subscription.recv().await.expect("signed out change");
    assert_eq!(change.event, SessionEvent::SignedOut);
    assert_eq!(client.access_token().await.expect("token"), ANON_KEY);
}

#[tokio::test]
async fn rejected_refresh_token_signs_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Refresh Token Not Found"
        })))
        .mount(&server)
        .await;

    let client =
        client_for(&server).with_session(session_expiring_in("jabali", -5, Some("revoked")));

    assert!(client.current_session().await.expect("no error").is_none());
    assert!(client.cached_session().is_none());
}

#[tokio::test]
async fn refresh_outage_keeps_session_and_reports_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client =
        client_for(&server).with_session(session_expiring_in("kamau", -5, Some("refresh")));

    let err = client.current_session().await.unwrap_err();
    assert!(matches!(err, RentalError::Backend(_)), "got {err:?}");
    assert!(client.cached_session().is_some());
}

#[tokio::test]
async fn auto_refresh_renews_session_near_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("lulu", "access-auto")))
        .mount(&server)
        .await;

    let client = Arc::new(
        client_for(&server).with_session(session_expiring_in("lulu", 10, Some("refresh-lulu"))),
    );
    let task = client.spawn_auto_refresh();

    assert_eventually_async!(Duration::from_secs(5), async {
        client.cached_session().is_some_and(|s| s.access_token == "access-auto")
    });

    task.abort();
}
