mod support;

use std::sync::Arc;

use aichat::auth::AuthSession;
use aichat::client::{ApiClient, Navigator, NoticeLog};
use aichat::error::ClientError;
use aichat::router::{GuardDecision, Route, Router};
use aichat::types::LoginRequest;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::store_with;

#[test]
fn guard_follows_token_presence() {
    let tokens = store_with(None, None);
    let router = Router::new(tokens.clone());

    assert_eq!(router.navigate("/chat").unwrap().resolved, Route::Login);
    assert_eq!(router.navigate("/privacy").unwrap().resolved, Route::Privacy);

    tokens.set("A1", "R").unwrap();
    assert_eq!(router.guard().check(Route::Login), GuardDecision::RedirectToChat);
    let nav = router.navigate("/login").unwrap();
    assert_eq!(nav.resolved, Route::Chat);
    assert!(nav.redirected());
}

#[test]
fn stale_token_still_passes_the_guard() {
    // Presence only: an expired token is caught by the first 401.
    let router = Router::new(store_with(Some("expired"), None));
    assert_eq!(router.navigate("/chat").unwrap().resolved, Route::Chat);
}

#[tokio::test]
async fn failed_refresh_moves_router_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "blacklisted"})))
        .expect(2)
        .mount(&server)
        .await;

    let tokens = store_with(Some("A1"), Some("R"));
    let router = Arc::new(Router::new(tokens.clone()));
    router.navigate("/chat").unwrap();
    assert_eq!(router.current(), Route::Chat);

    let notices = Arc::new(NoticeLog::new());
    let client = ApiClient::builder()
        .config(support::config(&server))
        .tokens(tokens.clone())
        .navigator(router.clone())
        .notifier(notices.clone())
        .build()
        .unwrap();

    assert!(client.get::<Value>("/chat/sessions/").await.is_err());
    assert_eq!(router.current(), Route::Login);
    assert_eq!(router.current_path(), "/login");
    assert_eq!(notices.take().len(), 1);

    // Already on the login view: a second failure is silent.
    tokens.set("A1", "R").unwrap();
    assert!(client.get::<Value>("/chat/sessions/").await.is_err());
    assert!(notices.take().is_empty());
}

#[tokio::test]
async fn client_without_navigator_tracks_location_itself() {
    let server = MockServer::start().await;
    let client = ApiClient::builder()
        .config(support::config(&server))
        .tokens(store_with(None, None))
        .build()
        .unwrap();
    assert_eq!(client.navigator().current_path(), "/login");
}

#[tokio::test]
async fn rejected_login_on_fresh_router_is_not_a_session_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "bad credentials"})))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = store_with(None, None);
    let router = Arc::new(Router::new(tokens.clone()));
    let notices = Arc::new(NoticeLog::new());
    let client = ApiClient::builder()
        .config(support::config(&server))
        .tokens(tokens)
        .navigator(router.clone())
        .notifier(notices.clone())
        .build()
        .unwrap();

    let err = AuthSession::new(client)
        .login(&LoginRequest::new("alice", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::SessionExpired(_)), "{err:?}");
    assert!(notices.take().is_empty());
    assert_eq!(router.current(), Route::Login);
}
