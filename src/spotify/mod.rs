//! # Spotify Integration Module
//!
//! Authorization against the Spotify accounts service and the read-only Web
//! API calls that consume the resulting token.
//!
//! ## Architecture
//!
//! ```text
//! CLI commands
//!      ↓
//! Spotify Integration Layer
//!     ├── Authorization (Authorization Code Flow, token refresh)
//!     ├── Request guard (login + scope checks, bearer auth)
//!     └── Endpoints (profile, personalization, library)
//!      ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## Core Modules
//!
//! ### Authorization
//!
//! [`auth`] - The [`Authorizer`](auth::Authorizer) coordinates the flow:
//! - **Credential Lifecycle**: loads, refreshes and persists the token
//! - **Browser Integration**: opens the authorize URL, prints it when no browser is available
//! - **Local Callback Server**: starts the listener that receives the redirect
//! - **CSRF Protection**: the `state` sent with the request must come back unchanged
//! - **Completion Events**: notifies waiting commands once the token is stored
//!
//! ### Endpoints
//!
//! - [`profile`] - `GET /me`
//! - [`personalization`] - `GET /me/top/{artists,tracks}`
//! - [`library`] - `GET /me/tracks`, `GET /me/albums`
//!
//! Each endpoint declares the scopes it needs. [`request::get_json`] refuses
//! to call out when the user is not logged in or the grant lacks a scope, so
//! the CLI can offer to request the missing ones.
//!
//! ## Error Types
//!
//! Everything returns [`AuthError`](crate::error::AuthError): provider
//! rejections carry the HTTP status and body for diagnosis. Nothing here
//! retries; a failed call is reported to the command that made it.

pub mod auth;
pub mod library;
pub mod personalization;
pub mod profile;
pub mod request;
