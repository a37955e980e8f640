use std::sync::Arc;

use tabled::Table;

use crate::{
    cli::{print_raw, run_api_call},
    info,
    spotify::{
        self,
        auth::Authorizer,
        personalization::{PageParams, TimeRange},
    },
    types::{ArtistTableRow, TrackTableRow},
    utils, warning,
};

pub async fn top_artists(
    authorizer: Arc<Authorizer>,
    time_range: TimeRange,
    page: PageParams,
    json: bool,
) {
    if json {
        let request = spotify::personalization::top_artists_request(time_range, page);
        print_raw(&authorizer, request).await;
        return;
    }

    info!("Finding your top artists..");
    let Some(artists) = run_api_call(&authorizer, || {
        spotify::personalization::top_artists(&authorizer, time_range, page)
    })
    .await
    else {
        return;
    };

    if artists.items.is_empty() {
        warning!("No top artists for this time range.");
        return;
    }

    let rows: Vec<ArtistTableRow> = artists
        .items
        .into_iter()
        .enumerate()
        .map(|(i, a)| ArtistTableRow {
            rank: page.offset as usize + i + 1,
            name: a.name,
            genres: a.genres.iter().take(3).cloned().collect::<Vec<_>>().join(","),
            popularity: a.popularity.map(|p| p.to_string()).unwrap_or_default(),
        })
        .collect();
    println!("{}", Table::new(rows));
}

pub async fn top_tracks(
    authorizer: Arc<Authorizer>,
    time_range: TimeRange,
    page: PageParams,
    json: bool,
) {
    if json {
        let request = spotify::personalization::top_tracks_request(time_range, page);
        print_raw(&authorizer, request).await;
        return;
    }

    info!("Finding your top tracks..");
    let Some(tracks) = run_api_call(&authorizer, || {
        spotify::personalization::top_tracks(&authorizer, time_range, page)
    })
    .await
    else {
        return;
    };

    if tracks.items.is_empty() {
        warning!("No top tracks for this time range.");
        return;
    }

    let rows: Vec<TrackTableRow> = tracks
        .items
        .into_iter()
        .enumerate()
        .map(|(i, t)| TrackTableRow {
            rank: page.offset as usize + i + 1,
            artists: utils::join_artist_names(&t.artists),
            album: t.album.map(|a| a.name).unwrap_or_default(),
            duration: utils::format_duration(t.duration_ms),
            name: t.name,
        })
        .collect();
    println!("{}", Table::new(rows));
}
