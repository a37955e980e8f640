use std::sync::Arc;

use axum::{
    Extension,
    extract::{Query, rejection::QueryRejection},
    response::Html,
};

use crate::{spotify::auth::Authorizer, types::CallbackParams, warning};

/// Receives the provider redirect and completes the authorization.
///
/// The page only tells the person in front of the browser what happened;
/// the terminal gets the details.
pub async fn callback(
    params: Result<Query<CallbackParams>, QueryRejection>,
    Extension(authorizer): Extension<Arc<Authorizer>>,
) -> Html<&'static str> {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => CallbackParams {
            error: Some(rejection.body_text()),
            ..CallbackParams::default()
        },
    };

    match authorizer.handle_redirect(params).await {
        Ok(()) => Html(
            "<h2>Authorization code granted.</h2><p>You can close this browser window.</p>",
        ),
        Err(e) => {
            warning!("Authorization failed: {}", e);
            Html(
                "<h4>Unexpected authentication error. Please try again later.</h4>\
                 <p>See the terminal for details.</p>",
            )
        }
    }
}
