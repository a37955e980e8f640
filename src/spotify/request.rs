use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{error::AuthError, spotify::auth::Authorizer};

/// A read-only Web API call: path below `api_url`, required scopes and query.
///
/// Endpoints build one of these so the CLI can decode the response into the
/// typed model or keep the full body as [`serde_json::Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub path: &'static str,
    pub scopes: &'static [&'static str],
    pub query: Vec<(&'static str, String)>,
}

impl ApiRequest {
    pub fn new(path: &'static str, scopes: &'static [&'static str]) -> Self {
        Self {
            path,
            scopes,
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query.extend(query);
        self
    }

    pub async fn send<T: DeserializeOwned>(&self, authorizer: &Authorizer) -> Result<T, AuthError> {
        get_json(authorizer, self.path, self.scopes, &self.query).await
    }
}

/// Issues an authorized `GET {api_url}{path}` and decodes the JSON body.
///
/// Checks login state and `scopes` first, so callers see
/// [`AuthError::NotLoggedIn`] or [`AuthError::MissingScopes`] before any
/// request is sent.
pub async fn get_json<T: DeserializeOwned>(
    authorizer: &Authorizer,
    path: &str,
    scopes: &[&str],
    query: &[(&str, String)],
) -> Result<T, AuthError> {
    authorizer.require_scopes(scopes.iter().copied()).await?;

    let url = format!("{}{}", authorizer.settings().api_url, path);
    debug!(%url, "initialising get request");
    let response = authorizer
        .http_client()
        .get(&url)
        .bearer_auth(authorizer.get_access_token().await)
        .query(query)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::ApiCall { status, body });
    }

    debug!(%url, %status, "get request successfully processed");
    Ok(response.json::<T>().await?)
}
