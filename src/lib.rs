//! Spotify CLI Library
//!
//! This library implements an OAuth 2.0 Authorization Code Flow client for the
//! Spotify Web API and a handful of read-only commands built on top of it
//! (profile, personalization, library). The interesting part is the login:
//! a transient local HTTP server receives the provider redirect while the
//! command that started the flow waits for it to complete.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints of the local callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error types of the authorization core
//! - `events` - In-process notifications about authorization progress
//! - `management` - Credential persistence
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Authorization coordinator and Web API client
//! - `token` - Token model: expiry and scope checks
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sptcli::{config::{self, Settings}, management::FileCredentialStore, spotify::auth::Authorizer};
//!
//! #[tokio::main]
//! async fn main() -> sptcli::Res<()> {
//!     config::load_env().await?;
//!     let settings = Settings::from_env()?;
//!     let store = Arc::new(FileCredentialStore::new(settings.credentials_path.clone()));
//!     let authorizer = Arc::new(Authorizer::new(settings, store));
//!     println!("logged in: {}", authorizer.is_logged_in().await);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod management;
pub mod server;
pub mod spotify;
pub mod token;
pub mod types;
pub mod utils;

/// Boxed error result used where callers only report failures, e.g. event
/// handlers and `main`-style glue. The authorization core returns
/// [`error::AuthError`] instead.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints a status line prefixed with a blue `o`.
///
/// ```
/// info!("Requesting additional scopes: {}", missing.join(" "));
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a status line prefixed with a green check mark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a red `!` line and exits with status 1.
///
/// Only for failures a command cannot continue from, such as missing client
/// credentials at startup:
///
/// ```
/// let settings = match Settings::from_env() {
///     Ok(settings) => settings,
///     Err(e) => error!("{}", e),
/// };
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a yellow `!` line; the command keeps going.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
