//! # API Module
//!
//! HTTP endpoints served by the transient authorization server while a login
//! is in progress.
//!
//! ## Endpoints
//!
//! - [`callback`] - `GET /authcallback`, the redirect target registered with
//!   Spotify. Hands the `code`/`state`/`error` parameters to the
//!   [`Authorizer`](crate::spotify::auth::Authorizer), which exchanges the code
//!   and releases whoever waits for the login.
//! - [`health`] - `GET /health`, status and version for quick checks.
//! - [`index`] - `GET /`, placeholder page.
//!
//! The routes are mounted by [`crate::server::CallbackListener`] through
//! [`router`].

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use crate::spotify::auth::Authorizer;

mod callback;
mod health;

pub use callback::callback;
pub use health::{health, index};

pub fn router(authorizer: Arc<Authorizer>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/authcallback", get(callback).layer(Extension(authorizer)))
}
