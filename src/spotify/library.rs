use crate::{
    error::AuthError,
    spotify::{auth::Authorizer, personalization::PageParams, request::ApiRequest},
    types::{Paging, SavedAlbum, SavedTrack, scope},
};

pub const REQUIRED_SCOPES: &[&str] = &[scope::READ_LIBRARY];

/// `GET /me/tracks`
pub fn saved_tracks_request(page: PageParams) -> ApiRequest {
    ApiRequest::new("/me/tracks", REQUIRED_SCOPES).with_query(page.query())
}

/// `GET /me/albums`
pub fn saved_albums_request(page: PageParams) -> ApiRequest {
    ApiRequest::new("/me/albums", REQUIRED_SCOPES).with_query(page.query())
}

pub async fn saved_tracks(
    authorizer: &Authorizer,
    page: PageParams,
) -> Result<Paging<SavedTrack>, AuthError> {
    saved_tracks_request(page).send(authorizer).await
}

pub async fn saved_albums(
    authorizer: &Authorizer,
    page: PageParams,
) -> Result<Paging<SavedAlbum>, AuthError> {
    saved_albums_request(page).send(authorizer).await
}
