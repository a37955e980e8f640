//! # CLI Module
//!
//! User-facing commands of `spt`. Each command receives the shared
//! [`Authorizer`] built in `main`, calls into [`crate::spotify`] and renders
//! the result as a table, or the full response body as pretty JSON with
//! `--json`.
//!
//! ## Command Categories
//!
//! ### Authentication
//!
//! - [`login`] - Runs the Authorization Code Flow and waits for the browser
//! - [`logout`] - Removes the stored credentials
//! - [`status`] - Shows login state, granted scopes and token expiry
//!
//! ### Web API
//!
//! - [`profile`] - Current user's profile
//! - [`top_artists`] / [`top_tracks`] - Personalization endpoints
//! - [`saved_tracks`] / [`saved_albums`] - Library endpoints
//!
//! ## Missing Scopes
//!
//! When a call needs scopes the current grant lacks, the command offers to
//! request them. Accepting runs the browser flow again with the union of the
//! granted and the missing scopes, then retries the call once.
//!
//! ## Usage Patterns
//!
//! ```bash
//! spt login                              # Authorize with the default scopes
//! spt profile                            # Who am I?
//! spt personalise top-artists --time-range short-term
//! spt library saved-tracks --limit 50 --json
//! ```

use std::{future::Future, sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    error::AuthError,
    events::CompletionSignal,
    info,
    spotify::{
        auth::{Authorizer, LoginFlow},
        request::ApiRequest,
    },
    success, warning,
};

mod auth;
mod library;
mod personalize;
mod profile;

pub use auth::login;
pub use auth::logout;
pub use auth::status;
pub use library::saved_albums;
pub use library::saved_tracks;
pub use personalize::top_artists;
pub use personalize::top_tracks;
pub use profile::profile;

pub(crate) fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub(crate) fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => warning!("Cannot render response as JSON. Err: {}", e),
    }
}

/// Prints the response body of `request` as returned, unmodelled fields included.
pub(crate) async fn print_raw(authorizer: &Arc<Authorizer>, request: ApiRequest) {
    if let Some(body) = run_api_call(authorizer, || request.send::<Value>(authorizer)).await {
        print_json(&body);
    }
}

/// Waits for a started flow to finish. Returns true on success.
pub(crate) async fn await_authorization(
    authorizer: &Authorizer,
    signal: &mut CompletionSignal,
) -> bool {
    info!("Authentication in progress, complete it in your browser.");
    let pb = spinner("Please wait...");
    let result = authorizer.wait_for_completion(signal).await;
    pb.finish_and_clear();
    authorizer.listener().wait_stopped().await;

    match result {
        Ok(false) => {
            success!("Authentication successful!");
            true
        }
        Ok(true) => {
            warning!("Authorization flow completed with errors. Please try again.");
            false
        }
        Err(e) => {
            warning!("{}", e);
            false
        }
    }
}

async fn confirm(question: &str) -> bool {
    info!("{} [y/N]", question);
    let mut answer = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    if stdin.read_line(&mut answer).await.is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes" | "Yes")
}

/// Offers to extend the grant with `missing`. Returns true once granted.
async fn request_missing_scopes(authorizer: &Arc<Authorizer>, missing: &[String]) -> bool {
    if !confirm("Would you like to request the additional scopes?").await {
        return false;
    }

    info!("Requesting additional scopes: {}", missing.join(" "));
    let mut signal = authorizer.events().completion_signal();
    match authorizer.get_more_scopes(missing).await {
        Ok(LoginFlow::Started { .. }) => await_authorization(authorizer, &mut signal).await,
        Ok(LoginFlow::AlreadyAuthenticated) => true,
        Err(e) => {
            warning!("{}", e);
            false
        }
    }
}

/// Runs an API call, offering to request missing scopes and retrying once.
pub(crate) async fn run_api_call<T, F, Fut>(authorizer: &Arc<Authorizer>, call: F) -> Option<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, AuthError>>,
{
    let pb = spinner("Calling the Spotify API...");
    let first = call().await;
    pb.finish_and_clear();

    match first {
        Ok(value) => Some(value),
        Err(AuthError::MissingScopes(missing)) => {
            warning!("{}", AuthError::MissingScopes(missing.clone()));
            if !request_missing_scopes(authorizer, &missing).await {
                return None;
            }
            match call().await {
                Ok(value) => Some(value),
                Err(e) => {
                    warning!("{}", e);
                    None
                }
            }
        }
        Err(e) => {
            warning!("{}", e);
            None
        }
    }
}
