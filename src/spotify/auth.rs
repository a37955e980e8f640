use std::{
    io,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::{
    Res,
    config::Settings,
    error::AuthError,
    events::{AuthEvent, AuthEventKind, CompletionSignal, EventBus},
    management::CredentialStore,
    server::CallbackListener,
    token::Token,
    types::CallbackParams,
    utils, warning,
};

/// Opens the authorize URL for the user.
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Uses the platform's default browser.
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        webbrowser::open(url)
    }
}

/// Result of asking for a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFlow {
    /// Valid credentials exist, no browser flow was started.
    AlreadyAuthenticated,
    /// The browser was sent to `authorize_url` and the listener is waiting.
    Started { authorize_url: String },
}

/// Drives the OAuth 2.0 Authorization Code Flow against Spotify.
///
/// One instance is built at startup and shared as `Arc<Authorizer>` by the
/// CLI commands and the callback listener.
///
/// # Authentication Flow
///
/// 1. **Credential Check**: memory first, then the credential store; an
///    expired token with a refresh token is refreshed instead of prompting
/// 2. **Authorization Request**: a fresh `state` value is generated and the
///    authorize URL is opened in the browser
/// 3. **Callback Handling**: the listener passes the redirect to
///    [`Authorizer::handle_redirect`], which checks `state` and exchanges the code
/// 4. **Token Persistence**: the token is saved before anyone is notified
/// 5. **Completion**: [`AuthEvent::Completed`] is published and the listener stops
///
/// Every failed attempt also ends in `Completed { has_error: true }`, so a
/// caller blocked on [`Authorizer::wait_for_completion`] is always released.
pub struct Authorizer {
    settings: Settings,
    client: Client,
    store: Arc<dyn CredentialStore>,
    browser: Arc<dyn Browser>,
    events: EventBus,
    listener: CallbackListener,
    credentials: RwLock<Option<Token>>,
    state_key: Mutex<Option<String>>,
}

impl Authorizer {
    pub fn new(settings: Settings, store: Arc<dyn CredentialStore>) -> Self {
        let listener = CallbackListener::new(settings.server_addr());
        Self {
            settings,
            client: Client::new(),
            store,
            browser: Arc::new(SystemBrowser),
            events: EventBus::new(),
            listener,
            credentials: RwLock::new(None),
            state_key: Mutex::new(None),
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn Browser>) -> Self {
        self.browser = browser;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn listener(&self) -> &CallbackListener {
        &self.listener
    }

    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Registers `handler` for [`AuthEvent::Completed`]; it receives `has_error`.
    pub fn on_auth_completed<F>(&self, handler: F)
    where
        F: Fn(bool) -> Res<()> + Send + Sync + 'static,
    {
        self.events
            .subscribe(AuthEventKind::Completed, move |event| match event {
                AuthEvent::Completed { has_error } => handler(*has_error),
                _ => Ok(()),
            });
    }

    fn cached(&self) -> Option<Token> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_credentials(&self, token: Option<Token>) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Current token from memory, loading it from the store on first use.
    pub async fn credentials(&self) -> Result<Option<Token>, AuthError> {
        if let Some(token) = self.cached() {
            return Ok(Some(token));
        }

        let loaded = self.store.load().await?;
        let mut slot = self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // an exchange may have finished while we were reading the store
        if slot.is_none() {
            *slot = loaded;
        }
        Ok(slot.clone())
    }

    /// Access token for API calls, empty when there are no credentials.
    pub async fn get_access_token(&self) -> String {
        match self.credentials().await {
            Ok(Some(token)) => token.access_token,
            _ => String::new(),
        }
    }

    /// Whether usable credentials exist.
    ///
    /// An expired token that carries a refresh token is refreshed before
    /// answering; a failed refresh reports `false`.
    pub async fn is_logged_in(&self) -> bool {
        let token = match self.credentials().await {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(e) => {
                warning!("Ignoring stored credentials. Err: {}", e);
                return false;
            }
        };

        if token.is_authenticated() {
            return true;
        }

        if token.is_expired() && token.has_refresh_token() {
            return match self.refresh_access_token(&token).await {
                Ok(_) => true,
                Err(e) => {
                    warning!("Failed to refresh access token. Err: {}", e);
                    false
                }
            };
        }

        false
    }

    /// Starts the browser flow unless already logged in.
    ///
    /// When already logged in, `Completed { has_error: false }` is published
    /// right away and [`LoginFlow::AlreadyAuthenticated`] is returned.
    pub async fn login<S: AsRef<str>>(
        self: &Arc<Self>,
        scopes: &[S],
    ) -> Result<LoginFlow, AuthError> {
        if self.is_logged_in().await {
            debug!("already logged in, no authorization flow started");
            self.notify_auth_completed(false);
            return Ok(LoginFlow::AlreadyAuthenticated);
        }

        let scopes = utils::merge_scopes(&[], scopes);
        self.begin_authorization(&scopes).await
    }

    /// Re-runs the browser flow asking for the granted scopes plus `additional`.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotLoggedIn`] without a current session; nothing is
    /// opened or started in that case.
    pub async fn get_more_scopes<S: AsRef<str>>(
        self: &Arc<Self>,
        additional: &[S],
    ) -> Result<LoginFlow, AuthError> {
        if !self.is_logged_in().await {
            return Err(AuthError::NotLoggedIn);
        }

        let granted = self
            .credentials()
            .await?
            .map(|token| token.scopes)
            .unwrap_or_default();
        let scopes = utils::merge_scopes(&granted, additional);
        self.begin_authorization(&scopes).await
    }

    async fn begin_authorization(
        self: &Arc<Self>,
        scopes: &[String],
    ) -> Result<LoginFlow, AuthError> {
        let state = utils::generate_state_key();
        let authorize_url = self.authorize_url(scopes, &state)?;
        *self.state_key.lock().unwrap_or_else(PoisonError::into_inner) = Some(state);

        self.events.publish(AuthEvent::Started);
        if let Err(e) = self.listener.start(Arc::clone(self)).await {
            self.events.publish(AuthEvent::Failed(e.to_string()));
            self.notify_auth_completed(true);
            return Err(e);
        }

        debug!(scopes = %scopes.join(" "), "sending authorization request");
        if self.browser.open(&authorize_url).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                authorize_url
            );
        }

        Ok(LoginFlow::Started { authorize_url })
    }

    /// Builds the provider authorize URL for `scopes` and `state`.
    pub fn authorize_url(&self, scopes: &[String], state: &str) -> Result<String, AuthError> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            &self.settings.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state),
                ("show_dialog", "true"),
            ],
        )
        .map(String::from)
        .map_err(|e| AuthError::InvalidOperation(format!("invalid authorize URL: {}", e)))
    }

    /// Completes the attempt described by a provider redirect.
    ///
    /// Publishes `Success` or `Failed`, then `Completed`, and stops the
    /// listener, whatever the outcome.
    pub async fn handle_redirect(&self, params: CallbackParams) -> Result<(), AuthError> {
        let result = self.complete_redirect(params).await;
        match &result {
            Ok(_) => self.events.publish(AuthEvent::Success),
            Err(e) => self.events.publish(AuthEvent::Failed(e.to_string())),
        }
        self.notify_auth_completed(result.is_err());
        result.map(|_| ())
    }

    async fn complete_redirect(&self, params: CallbackParams) -> Result<Token, AuthError> {
        // one redirect per attempt
        let expected = self
            .state_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(code) = params.code.filter(|code| !code.is_empty()) else {
            let reason = params
                .error
                .unwrap_or_else(|| "redirect carried no authorization code".to_string());
            return Err(AuthError::AuthorizationDenied(reason));
        };

        match (expected, params.state) {
            (Some(expected), Some(state)) if expected == state => {}
            _ => return Err(AuthError::StateMismatch),
        }

        self.exchange_code_for_token(&code).await
    }

    /// Stops the listener and publishes `Completed { has_error }`.
    pub fn notify_auth_completed(&self, has_error: bool) {
        if let Err(e) = self.listener.shutdown() {
            warning!("{}", e);
        }
        self.events.publish(AuthEvent::Completed { has_error });
    }

    /// Exchanges an authorization code for a token and persists it.
    ///
    /// Single shot: a rejected code is reported, never retried.
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<Token, AuthError> {
        debug!("exchanging authorization code for token");
        let response = self
            .client
            .post(&self.settings.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(AuthError::Authentication { status, body });
        }

        let payload = parse_token_body(&body)?;
        let token = Token::from_exchange_response(&payload, Utc::now())?;
        self.store.save(&token).await?;
        self.replace_credentials(Some(token.clone()));
        debug!("security info successfully stored");
        Ok(token)
    }

    /// Obtains a new access token with the refresh token of `current`.
    ///
    /// Spotify usually does not send a new refresh token, so the previous one
    /// is kept when the response has none. Same for `scope`.
    pub async fn refresh_access_token(&self, current: &Token) -> Result<Token, AuthError> {
        if !current.has_refresh_token() {
            return Err(AuthError::InvalidOperation(
                "the current token has no refresh token".to_string(),
            ));
        }

        debug!("refreshing access token");
        let response = self
            .client
            .post(&self.settings.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(AuthError::TokenRefresh { status, body });
        }

        let mut payload = parse_token_body(&body)?;
        let Some(fields) = payload.as_object_mut() else {
            return Err(AuthError::MalformedTokenResponse(
                "expected a JSON object".to_string(),
            ));
        };
        let rotated = fields
            .get("refresh_token")
            .and_then(Value::as_str)
            .is_some_and(|token| !token.is_empty());
        if !rotated {
            fields.insert(
                "refresh_token".to_string(),
                Value::String(current.refresh_token.clone()),
            );
        }
        if !fields.contains_key("scope") {
            fields.insert("scope".to_string(), Value::String(current.scope_string()));
        }

        let token = Token::from_exchange_response(&payload, Utc::now())?;
        self.store.save(&token).await?;
        self.replace_credentials(Some(token.clone()));
        debug!("access token successfully refreshed");
        Ok(token)
    }

    /// Whether the current grant covers `requested`.
    ///
    /// Asking the user for missing scopes is left to the caller, see
    /// [`Authorizer::get_more_scopes`].
    pub async fn check_scopes<I, S>(&self, requested: I) -> Result<bool, AuthError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let token = self.credentials().await?.ok_or(AuthError::NotLoggedIn)?;
        Ok(token.has_scopes(requested))
    }

    /// Guard for API calls: distinguishes "not logged in" from "logged in
    /// without the required scopes".
    pub async fn require_scopes<I, S>(&self, requested: I) -> Result<(), AuthError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.is_logged_in().await {
            return Err(AuthError::NotLoggedIn);
        }

        let token = self.credentials().await?.ok_or(AuthError::NotLoggedIn)?;
        let missing = token.missing_scopes(requested);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuthError::MissingScopes(missing))
        }
    }

    /// Blocks until the running attempt completes and returns its `has_error`.
    ///
    /// Honors the configured login timeout: on expiry the pending `state` is
    /// discarded, `Failed` and `Completed { has_error: true }` are published,
    /// the listener is stopped and [`AuthError::LoginTimeout`] returned.
    pub async fn wait_for_completion(
        &self,
        signal: &mut CompletionSignal,
    ) -> Result<bool, AuthError> {
        match signal.wait(self.settings.login_timeout).await {
            Err(AuthError::LoginTimeout(limit)) => {
                self.state_key
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                let error = AuthError::LoginTimeout(limit);
                self.events.publish(AuthEvent::Failed(error.to_string()));
                self.notify_auth_completed(true);
                // this attempt's completion is reported as the error, not left for the next wait
                signal.drain();
                Err(error)
            }
            other => other,
        }
    }

    /// Forgets the current credentials, in memory and in the store.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.replace_credentials(None);
        self.store.clear().await
    }
}

fn parse_token_body(body: &str) -> Result<Value, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::MalformedTokenResponse(e.to_string()))
}
