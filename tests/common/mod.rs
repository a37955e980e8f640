#![allow(dead_code)]

use std::{
    io,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use reqwest::Url;
use sptcli::{
    config::Settings,
    error::AuthError,
    management::CredentialStore,
    spotify::auth::{Authorizer, Browser},
    token::Token,
};

#[derive(Default)]
pub struct InMemoryCredentialStore {
    token: Mutex<Option<Token>>,
    saves: AtomicUsize,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        let store = Self::default();
        *store.token.lock().expect("store lock poisoned") = Some(token);
        store
    }

    pub fn get(&self) -> Option<Token> {
        self.token.lock().expect("store lock poisoned").clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Result<Option<Token>, AuthError> {
        Ok(self.get())
    }

    async fn save(&self, token: &Token) -> Result<(), AuthError> {
        *self.token.lock().expect("store lock poisoned") = Some(token.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        *self.token.lock().expect("store lock poisoned") = None;
        Ok(())
    }
}

/// Records authorize URLs instead of launching a browser.
#[derive(Default)]
pub struct RecordingBrowser {
    opened: Mutex<Vec<String>>,
}

impl RecordingBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("browser lock poisoned").clone()
    }

    pub fn last_url(&self) -> Option<String> {
        self.opened().last().cloned()
    }
}

impl Browser for RecordingBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        self.opened
            .lock()
            .expect("browser lock poisoned")
            .push(url.to_string());
        Ok(())
    }
}

/// Settings pointing the token and API endpoints at `server_uri`, with the
/// listener on an ephemeral port.
pub fn settings(server_uri: &str) -> Settings {
    Settings {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: "http://127.0.0.1:6949/authcallback".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        credentials_path: PathBuf::from("unused-credentials.json"),
        authorize_url: "https://accounts.spotify.com/authorize/".to_string(),
        token_url: format!("{}/api/token", server_uri),
        api_url: format!("{}/v1", server_uri),
        login_timeout: None,
    }
}

pub fn authorizer(
    settings: Settings,
    store: Arc<InMemoryCredentialStore>,
    browser: Arc<RecordingBrowser>,
) -> Arc<Authorizer> {
    Arc::new(Authorizer::new(settings, store).with_browser(browser))
}

pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

pub fn token(scopes: &[&str], expires_in: u64, issued_at: DateTime<Utc>) -> Token {
    Token {
        access_token: "abc".to_string(),
        refresh_token: "r1".to_string(),
        token_type: "Bearer".to_string(),
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
        expires_in,
        issued_at,
    }
}

pub fn fresh_token(scopes: &[&str]) -> Token {
    token(scopes, 3600, now())
}

pub fn expired_token(refresh_token: &str) -> Token {
    Token {
        refresh_token: refresh_token.to_string(),
        ..token(&["user-read-email"], 3600, now() - Duration::hours(2))
    }
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
