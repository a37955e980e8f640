use clap::ValueEnum;

use crate::{
    error::AuthError,
    spotify::{auth::Authorizer, request::ApiRequest},
    types::{Artist, Paging, Track, scope},
};

pub const REQUIRED_SCOPES: &[&str] = &[scope::READ_TOP];

/// Affinity window of the top items endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TimeRange {
    /// Several years
    LongTerm,
    /// About 6 months
    #[default]
    MediumTerm,
    /// About 4 weeks
    ShortTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::LongTerm => "long_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::ShortTerm => "short_term",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub limit: u32,
    pub offset: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

impl PageParams {
    /// Query pairs with `limit` clamped to the 1..=50 range the API accepts.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("limit", self.limit.clamp(1, 50).to_string()),
            ("offset", self.offset.to_string()),
        ]
    }
}

fn top_items_request(path: &'static str, time_range: TimeRange, page: PageParams) -> ApiRequest {
    ApiRequest::new(path, REQUIRED_SCOPES)
        .with_query(page.query())
        .with_query(vec![("time_range", time_range.as_str().to_string())])
}

/// `GET /me/top/artists`
pub fn top_artists_request(time_range: TimeRange, page: PageParams) -> ApiRequest {
    top_items_request("/me/top/artists", time_range, page)
}

/// `GET /me/top/tracks`
pub fn top_tracks_request(time_range: TimeRange, page: PageParams) -> ApiRequest {
    top_items_request("/me/top/tracks", time_range, page)
}

pub async fn top_artists(
    authorizer: &Authorizer,
    time_range: TimeRange,
    page: PageParams,
) -> Result<Paging<Artist>, AuthError> {
    top_artists_request(time_range, page).send(authorizer).await
}

pub async fn top_tracks(
    authorizer: &Authorizer,
    time_range: TimeRange,
    page: PageParams,
) -> Result<Paging<Track>, AuthError> {
    top_tracks_request(time_range, page).send(authorizer).await
}
