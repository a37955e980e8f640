mod common;

use std::{sync::Arc, time::Duration};

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;
use sptcli::{
    error::AuthError,
    management::{CredentialStore, FileCredentialStore},
    server::ListenerStatus,
    spotify::{
        auth::{Authorizer, LoginFlow},
        library,
        personalization::{self, PageParams, TimeRange},
        profile,
    },
    types::scope,
};
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path, query_param},
};

use common::{InMemoryCredentialStore, RecordingBrowser, authorizer, expired_token, fresh_token};

fn token_response(access_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "scope": "user-read-email user-read-private",
        "expires_in": 3600,
        "refresh_token": "r1"
    })
}

#[tokio::test]
async fn test_fresh_install_makes_no_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileCredentialStore::new(dir.path().join("credentials.json")));
    let authorizer = Authorizer::new(common::settings(&server.uri()), store);

    assert!(!authorizer.is_logged_in().await);
    assert!(authorizer.credentials().await.unwrap().is_none());
    assert_eq!(authorizer.get_access_token().await, "");
    assert!(matches!(
        authorizer.check_scopes(["user-read-email"]).await,
        Err(AuthError::NotLoggedIn)
    ));
}

#[tokio::test]
async fn test_exchange_code_persists_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("client_id=client-id"))
        .and(body_string_contains("client_secret=client-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("abc")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::new());
    let browser = Arc::new(RecordingBrowser::new());
    let authorizer = authorizer(common::settings(&server.uri()), store.clone(), browser);

    let token = authorizer.exchange_code_for_token("the-code").await.unwrap();
    assert_eq!(token.access_token, "abc");
    assert_eq!(token.refresh_token, "r1");

    let stored = store.get().expect("token persisted");
    assert_eq!(stored, token);
    assert_eq!(authorizer.get_access_token().await, "abc");
    assert!(authorizer.is_logged_in().await);
    assert!(authorizer.check_scopes(["user-read-email"]).await.unwrap());
    assert!(!authorizer.check_scopes(["user-top-read"]).await.unwrap());
}

#[tokio::test]
async fn test_exchange_rejected_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::new());
    let authorizer = authorizer(
        common::settings(&server.uri()),
        store.clone(),
        Arc::new(RecordingBrowser::new()),
    );

    match authorizer.exchange_code_for_token("bad").await {
        Err(AuthError::Authentication { status, body }) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected authentication error, got {:?}", other),
    }
    assert_eq!(store.save_count(), 0);
    assert!(!authorizer.is_logged_in().await);
}

#[tokio::test]
async fn test_exchange_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::new());
    let authorizer = authorizer(
        common::settings(&server.uri()),
        store.clone(),
        Arc::new(RecordingBrowser::new()),
    );

    assert!(matches!(
        authorizer.exchange_code_for_token("code").await,
        Err(AuthError::MalformedTokenResponse(_))
    ));
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_and_scopes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "def",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let current = expired_token("r1");
    let store = Arc::new(InMemoryCredentialStore::with_token(current.clone()));
    let authorizer = authorizer(
        common::settings(&server.uri()),
        store.clone(),
        Arc::new(RecordingBrowser::new()),
    );

    let refreshed = authorizer.refresh_access_token(&current).await.unwrap();
    assert_eq!(refreshed.access_token, "def");
    assert_eq!(refreshed.refresh_token, "r1");
    assert_eq!(refreshed.scopes, current.scopes);
    assert!(refreshed.issued_at > current.issued_at);
    assert!(refreshed.is_authenticated());
    assert_eq!(store.get(), Some(refreshed));
}

#[tokio::test]
async fn test_refresh_takes_rotated_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "def",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "r2",
            "scope": "user-top-read"
        })))
        .mount(&server)
        .await;

    let current = expired_token("r1");
    let authorizer = authorizer(
        common::settings(&server.uri()),
        Arc::new(InMemoryCredentialStore::with_token(current.clone())),
        Arc::new(RecordingBrowser::new()),
    );

    let refreshed = authorizer.refresh_access_token(&current).await.unwrap();
    assert_eq!(refreshed.refresh_token, "r2");
    assert_eq!(refreshed.scopes, vec!["user-top-read"]);
}

#[tokio::test]
async fn test_refresh_without_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let current = expired_token("");
    let authorizer = authorizer(
        common::settings(&server.uri()),
        Arc::new(InMemoryCredentialStore::with_token(current.clone())),
        Arc::new(RecordingBrowser::new()),
    );

    assert!(matches!(
        authorizer.refresh_access_token(&current).await,
        Err(AuthError::InvalidOperation(_))
    ));
    // nothing to refresh with, so the expired token means logged out
    assert!(!authorizer.is_logged_in().await);
}

#[tokio::test]
async fn test_refresh_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("revoked"))
        .mount(&server)
        .await;

    let current = expired_token("r1");
    let store = Arc::new(InMemoryCredentialStore::with_token(current.clone()));
    let authorizer = authorizer(
        common::settings(&server.uri()),
        store.clone(),
        Arc::new(RecordingBrowser::new()),
    );

    assert!(matches!(
        authorizer.refresh_access_token(&current).await,
        Err(AuthError::TokenRefresh { status, .. }) if status == StatusCode::BAD_REQUEST
    ));
    assert!(!authorizer.is_logged_in().await);
    assert_eq!(store.get(), Some(current));
}

#[tokio::test]
async fn test_is_logged_in_refreshes_expired_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("def")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::with_token(expired_token("r1")));
    let authorizer = authorizer(
        common::settings(&server.uri()),
        store.clone(),
        Arc::new(RecordingBrowser::new()),
    );

    assert!(authorizer.is_logged_in().await);
    assert_eq!(authorizer.get_access_token().await, "def");
    assert_eq!(store.save_count(), 1);

    // the refreshed token is valid, no second refresh
    assert!(authorizer.is_logged_in().await);
}

#[tokio::test]
async fn test_login_when_already_authenticated() {
    let store = Arc::new(InMemoryCredentialStore::with_token(fresh_token(&[
        "user-read-email",
    ])));
    let browser = Arc::new(RecordingBrowser::new());
    let authorizer = authorizer(common::settings("http://127.0.0.1:9"), store, browser.clone());

    let mut signal = authorizer.events().completion_signal();
    let flow = authorizer.login(scope::DEFAULT).await.unwrap();

    assert_eq!(flow, LoginFlow::AlreadyAuthenticated);
    assert!(!signal.wait(Some(Duration::from_secs(1))).await.unwrap());
    assert!(browser.opened().is_empty());
    assert_eq!(authorizer.listener().status(), ListenerStatus::Stopped);
}

#[tokio::test]
async fn test_login_opens_authorize_url() {
    let browser = Arc::new(RecordingBrowser::new());
    let authorizer = authorizer(
        common::settings("http://127.0.0.1:9"),
        Arc::new(InMemoryCredentialStore::new()),
        browser.clone(),
    );

    let flow = authorizer.login(scope::DEFAULT).await.unwrap();
    let LoginFlow::Started { authorize_url } = flow else {
        panic!("expected a started flow, got {:?}", flow);
    };

    assert_eq!(browser.opened(), vec![authorize_url.clone()]);
    assert!(authorize_url.starts_with("https://accounts.spotify.com/authorize/?"));
    assert_eq!(
        common::query_param(&authorize_url, "response_type").as_deref(),
        Some("code")
    );
    assert_eq!(
        common::query_param(&authorize_url, "client_id").as_deref(),
        Some("client-id")
    );
    assert_eq!(
        common::query_param(&authorize_url, "redirect_uri").as_deref(),
        Some("http://127.0.0.1:6949/authcallback")
    );
    assert_eq!(
        common::query_param(&authorize_url, "scope").as_deref(),
        Some("user-read-private user-read-email user-library-read")
    );
    assert_eq!(
        common::query_param(&authorize_url, "show_dialog").as_deref(),
        Some("true")
    );
    let state = common::query_param(&authorize_url, "state").expect("state parameter");
    assert_eq!(state.len(), 32);
    assert_eq!(authorizer.listener().status(), ListenerStatus::Running);

    authorizer.listener().shutdown().unwrap();
    authorizer.listener().wait_stopped().await;
    assert_eq!(authorizer.listener().status(), ListenerStatus::Stopped);
}

#[tokio::test]
async fn test_each_attempt_uses_a_new_state() {
    let browser = Arc::new(RecordingBrowser::new());
    let authorizer = authorizer(
        common::settings("http://127.0.0.1:9"),
        Arc::new(InMemoryCredentialStore::new()),
        browser.clone(),
    );

    authorizer.login(&["user-read-email"]).await.unwrap();
    authorizer.login(&["user-read-email"]).await.unwrap();

    let states: Vec<_> = browser
        .opened()
        .iter()
        .filter_map(|url| common::query_param(url, "state"))
        .collect();
    assert_eq!(states.len(), 2);
    assert_ne!(states[0], states[1]);

    authorizer.listener().shutdown().unwrap();
    authorizer.listener().wait_stopped().await;
}

#[tokio::test]
async fn test_get_more_scopes_requires_login() {
    let browser = Arc::new(RecordingBrowser::new());
    let authorizer = authorizer(
        common::settings("http://127.0.0.1:9"),
        Arc::new(InMemoryCredentialStore::new()),
        browser.clone(),
    );

    assert!(matches!(
        authorizer.get_more_scopes(&["user-top-read"]).await,
        Err(AuthError::NotLoggedIn)
    ));
    assert!(browser.opened().is_empty());
    assert_eq!(authorizer.listener().status(), ListenerStatus::Stopped);
}

#[tokio::test]
async fn test_get_more_scopes_requests_union() {
    let browser = Arc::new(RecordingBrowser::new());
    let authorizer = authorizer(
        common::settings("http://127.0.0.1:9"),
        Arc::new(InMemoryCredentialStore::with_token(fresh_token(&[
            "user-read-email",
            "user-read-private",
        ]))),
        browser.clone(),
    );

    let flow = authorizer
        .get_more_scopes(&["user-top-read", "user-read-email"])
        .await
        .unwrap();
    assert!(matches!(flow, LoginFlow::Started { .. }));

    let url = browser.last_url().expect("authorize URL opened");
    assert_eq!(
        common::query_param(&url, "scope").as_deref(),
        Some("user-read-email user-read-private user-top-read")
    );

    authorizer.listener().shutdown().unwrap();
    authorizer.listener().wait_stopped().await;
}

#[tokio::test]
async fn test_require_scopes() {
    let authorizer = authorizer(
        common::settings("http://127.0.0.1:9"),
        Arc::new(InMemoryCredentialStore::with_token(fresh_token(&[
            "user-read-email",
        ]))),
        Arc::new(RecordingBrowser::new()),
    );

    authorizer.require_scopes(["user-read-email"]).await.unwrap();
    match authorizer
        .require_scopes(["user-read-email", "user-top-read"])
        .await
    {
        Err(AuthError::MissingScopes(missing)) => assert_eq!(missing, vec!["user-top-read"]),
        other => panic!("expected missing scopes, got {:?}", other),
    }
}

#[tokio::test]
async fn test_logout_clears_memory_and_store() {
    let store = Arc::new(InMemoryCredentialStore::with_token(fresh_token(&[])));
    let authorizer = authorizer(
        common::settings("http://127.0.0.1:9"),
        store.clone(),
        Arc::new(RecordingBrowser::new()),
    );
    assert!(authorizer.is_logged_in().await);

    authorizer.logout().await.unwrap();
    assert!(store.load().await.unwrap().is_none());
    assert!(!authorizer.is_logged_in().await);
}

#[tokio::test]
async fn test_profile_call_uses_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wizzler",
            "display_name": "Wizzler",
            "email": "wizzler@example.com",
            "country": "SE",
            "product": "premium",
            "followers": { "total": 7 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer = authorizer(
        common::settings(&server.uri()),
        Arc::new(InMemoryCredentialStore::with_token(fresh_token(
            profile::REQUIRED_SCOPES,
        ))),
        Arc::new(RecordingBrowser::new()),
    );

    let me = profile::current_user(&authorizer).await.unwrap();
    assert_eq!(me.id, "wizzler");
    assert_eq!(me.email.as_deref(), Some("wizzler@example.com"));
    assert_eq!(me.followers.map(|f| f.total), Some(7));
}

#[tokio::test]
async fn test_top_artists_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me/top/artists"))
        .and(query_param("time_range", "short_term"))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "1", "name": "Röyksopp", "genres": ["electronica"], "popularity": 61 }
            ],
            "total": 1,
            "limit": 50,
            "offset": 5,
            "next": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer = authorizer(
        common::settings(&server.uri()),
        Arc::new(InMemoryCredentialStore::with_token(fresh_token(&[
            scope::READ_TOP,
        ]))),
        Arc::new(RecordingBrowser::new()),
    );

    let page = personalization::top_artists(
        &authorizer,
        TimeRange::ShortTerm,
        PageParams {
            limit: 500,
            offset: 5,
        },
    )
    .await
    .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Röyksopp");
}

#[tokio::test]
async fn test_api_call_with_missing_scope_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let authorizer = authorizer(
        common::settings(&server.uri()),
        Arc::new(InMemoryCredentialStore::with_token(fresh_token(&[
            "user-read-email",
        ]))),
        Arc::new(RecordingBrowser::new()),
    );

    assert!(matches!(
        personalization::top_tracks(&authorizer, TimeRange::default(), PageParams::default())
            .await,
        Err(AuthError::MissingScopes(missing)) if missing == vec!["user-top-read"]
    ));
}

#[tokio::test]
async fn test_api_call_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let authorizer = authorizer(
        common::settings(&server.uri()),
        Arc::new(InMemoryCredentialStore::with_token(fresh_token(
            profile::REQUIRED_SCOPES,
        ))),
        Arc::new(RecordingBrowser::new()),
    );

    match profile::current_user(&authorizer).await {
        Err(AuthError::ApiCall { status, body }) => {
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(body, "slow down");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_raw_response_keeps_unmodelled_fields() {
    let body = json!({
        "id": "wizzler",
        "display_name": "Wizzler",
        "images": [{ "url": "https://i.scdn.co/image/ab67", "height": 300, "width": 300 }],
        "explicit_content": { "filter_enabled": false, "filter_locked": false },
        "uri": "spotify:user:wizzler"
    });
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(2)
        .mount(&server)
        .await;

    let authorizer = authorizer(
        common::settings(&server.uri()),
        Arc::new(InMemoryCredentialStore::with_token(fresh_token(
            profile::REQUIRED_SCOPES,
        ))),
        Arc::new(RecordingBrowser::new()),
    );

    let raw: serde_json::Value = profile::current_user_request()
        .send(&authorizer)
        .await
        .unwrap();
    assert_eq!(raw, body);

    let typed = serde_json::to_value(profile::current_user(&authorizer).await.unwrap()).unwrap();
    assert!(typed.get("images").is_none());
}

#[test]
fn test_endpoint_requests() {
    let page = PageParams {
        limit: 0,
        offset: 40,
    };

    let top = personalization::top_tracks_request(TimeRange::LongTerm, page);
    assert_eq!(top.path, "/me/top/tracks");
    assert_eq!(top.scopes, personalization::REQUIRED_SCOPES);
    assert_eq!(
        top.query,
        vec![
            ("limit", "1".to_string()),
            ("offset", "40".to_string()),
            ("time_range", "long_term".to_string()),
        ]
    );

    let albums = library::saved_albums_request(PageParams::default());
    assert_eq!(albums.path, "/me/albums");
    assert_eq!(albums.scopes, library::REQUIRED_SCOPES);
}
