use crate::{
    error::AuthError,
    spotify::{auth::Authorizer, request::ApiRequest},
    types::{UserProfile, scope},
};

pub const REQUIRED_SCOPES: &[&str] = &[scope::READ_EMAIL, scope::READ_PRIVATE];

/// `GET /me`
pub fn current_user_request() -> ApiRequest {
    ApiRequest::new("/me", REQUIRED_SCOPES)
}

pub async fn current_user(authorizer: &Authorizer) -> Result<UserProfile, AuthError> {
    current_user_request().send(authorizer).await
}
