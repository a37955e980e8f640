use std::sync::Arc;

use chrono::Local;

use crate::{
    cli::await_authorization,
    error, info,
    spotify::auth::{Authorizer, LoginFlow},
    success,
    types::scope,
    warning,
};

/// Logs in with `scopes`, or the default scopes when none are given, and
/// blocks until the browser flow has finished.
pub async fn login(authorizer: Arc<Authorizer>, scopes: Vec<String>) {
    info!(
        "Authorization Code Flow initialised at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let scopes: Vec<String> = if scopes.is_empty() {
        scope::DEFAULT.iter().map(|s| s.to_string()).collect()
    } else {
        scopes
    };

    // subscribe before starting so an immediate completion is not lost
    let mut signal = authorizer.events().completion_signal();
    match authorizer.login(&scopes).await {
        Ok(LoginFlow::AlreadyAuthenticated) => success!("Already logged in."),
        Ok(LoginFlow::Started { .. }) => {
            if !await_authorization(&authorizer, &mut signal).await {
                error!("Login failed.");
            }
        }
        Err(e) => error!("Cannot start authorization. Err: {}", e),
    }
}

pub async fn logout(authorizer: Arc<Authorizer>) {
    match authorizer.logout().await {
        Ok(()) => success!("Logged out. Stored credentials removed."),
        Err(e) => error!("Failed to remove stored credentials. Err: {}", e),
    }
}

pub async fn status(authorizer: Arc<Authorizer>) {
    if !authorizer.is_logged_in().await {
        warning!("Not logged in. Use `spt login` to login.");
        return;
    }

    match authorizer.credentials().await {
        Ok(Some(token)) => {
            success!("Logged in.");
            info!("Granted scopes: {}", token.scope_string());
            info!("Access token expires in {} seconds.", token.remaining_secs());
            info!(
                "Can refresh: {}",
                if token.has_refresh_token() { "yes" } else { "no" }
            );
            info!(
                "Credentials stored at {}",
                authorizer.settings().credentials_path.display()
            );
        }
        Ok(None) => warning!("Not logged in. Use `spt login` to login."),
        Err(e) => warning!("Cannot read stored credentials. Err: {}", e),
    }
}
