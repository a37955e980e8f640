//! Error types for the authorization core and startup configuration.
//!
//! [`AuthError`] covers everything that can go wrong while obtaining, storing,
//! refreshing or using a token. [`ConfigError`] is only produced while reading
//! settings at startup and is always fatal.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the authorization coordinator, the callback listener and
/// the credential store.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider rejected the authorization code exchange.
    #[error("Authorization code not accepted.\nError Code: Http {status}.\nError Message: {body}")]
    Authentication { status: StatusCode, body: String },

    /// The provider rejected the refresh token.
    #[error("Token refresh request failed.\nError Code: Http {status}.\nError Message: {body}")]
    TokenRefresh { status: StatusCode, body: String },

    #[error("Malformed token response: {0}")]
    MalformedTokenResponse(String),

    #[error("Authorization server failed to start: {0}")]
    ListenerStartup(#[source] std::io::Error),

    /// The server task ended before it could receive the shutdown signal.
    #[error("Authorization server at {addr} failed to shutdown: {source}")]
    ListenerShutdown {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("You need to be logged in to execute this command. Use `spt login` to login")]
    NotLoggedIn,

    #[error("The following scopes required to execute the command are missing: {}", .0.join(" "))]
    MissingScopes(Vec<String>),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Login was not completed within {} seconds", .0.as_secs())]
    LoginTimeout(Duration),

    #[error("Redirect state does not match the pending authorization request")]
    StateMismatch,

    #[error("Authorization code not granted: {0}")]
    AuthorizationDenied(String),

    #[error("Stored credentials are corrupt: {0}")]
    CorruptCredentials(String),

    /// A Web API call made with a valid token failed.
    #[error("Spotify API call failed. HTTPStatus = {status}.\n{body}")]
    ApiCall { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while loading settings from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "The following environment variables are missing: {}\nSet them in your shell or in the .env file",
        .0.join(", ")
    )]
    Missing(Vec<String>),

    #[error("Environment variable {name} has an invalid value: {value}")]
    Invalid { name: String, value: String },

    #[error("Cannot load environment file: {0}")]
    Env(String),
}
