use std::sync::Arc;

use tabled::Table;

use crate::{
    cli::{print_raw, run_api_call},
    spotify::{self, auth::Authorizer, personalization::PageParams},
    types::{SavedAlbumTableRow, TrackTableRow},
    utils, warning,
};

pub async fn saved_tracks(authorizer: Arc<Authorizer>, page: PageParams, json: bool) {
    if json {
        print_raw(&authorizer, spotify::library::saved_tracks_request(page)).await;
        return;
    }

    let Some(saved) =
        run_api_call(&authorizer, || spotify::library::saved_tracks(&authorizer, page)).await
    else {
        return;
    };

    if saved.items.is_empty() {
        warning!("Your library has no saved tracks.");
        return;
    }

    let rows: Vec<TrackTableRow> = saved
        .items
        .into_iter()
        .enumerate()
        .map(|(i, s)| TrackTableRow {
            rank: page.offset as usize + i + 1,
            artists: utils::join_artist_names(&s.track.artists),
            album: s.track.album.map(|a| a.name).unwrap_or_default(),
            duration: utils::format_duration(s.track.duration_ms),
            name: s.track.name,
        })
        .collect();
    println!("{}", Table::new(rows));
}

pub async fn saved_albums(authorizer: Arc<Authorizer>, page: PageParams, json: bool) {
    if json {
        print_raw(&authorizer, spotify::library::saved_albums_request(page)).await;
        return;
    }

    let Some(saved) =
        run_api_call(&authorizer, || spotify::library::saved_albums(&authorizer, page)).await
    else {
        return;
    };

    if saved.items.is_empty() {
        warning!("Your library has no saved albums.");
        return;
    }

    let rows: Vec<SavedAlbumTableRow> = saved
        .items
        .into_iter()
        .map(|s| SavedAlbumTableRow {
            added: s.added_at.chars().take(10).collect(),
            artists: utils::join_artist_names(&s.album.artists),
            released: s.album.release_date.unwrap_or_default(),
            name: s.album.name,
        })
        .collect();
    println!("{}", Table::new(rows));
}
