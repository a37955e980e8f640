use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Scope identifiers used by the commands of this client.
pub mod scope {
    pub const READ_EMAIL: &str = "user-read-email";
    pub const READ_PRIVATE: &str = "user-read-private";
    pub const READ_LIBRARY: &str = "user-library-read";
    pub const READ_TOP: &str = "user-top-read";

    /// Scopes requested by `spt login` when none are given.
    pub const DEFAULT: &[&str] = &[READ_PRIVATE, READ_EMAIL, READ_LIBRARY];
}

/// Token record as written to the credential store.
///
/// `scope` is the space-joined scope list and `last_refreshed` uses the
/// `YYYYMMDD_HH:MM:SS` format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub expires_in: u64,
    pub last_refreshed: String,
}

/// Query parameters of the provider redirect to `/authcallback`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub product: Option<String>,
    pub followers: Option<Followers>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Followers {
    pub total: u64,
}

/// Offset based page returned by the personalization and library endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    pub total: Option<u64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    pub album: Option<Album>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTrack {
    pub added_at: String,
    pub track: Track,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAlbum {
    pub added_at: String,
    pub album: Album,
}

#[derive(Tabled)]
pub struct ArtistTableRow {
    pub rank: usize,
    pub name: String,
    pub genres: String,
    pub popularity: String,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub rank: usize,
    pub name: String,
    pub artists: String,
    pub album: String,
    pub duration: String,
}

#[derive(Tabled)]
pub struct SavedAlbumTableRow {
    pub added: String,
    pub name: String,
    pub artists: String,
    pub released: String,
}
